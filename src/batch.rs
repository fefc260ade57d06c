//! In-memory tabular result of one extraction window.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// A single materialized value.
///
/// Zoned timestamps are normalized to UTC before they get here, so every
/// date-time is naive.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Arbitrary-precision numeric kept in its canonical text form
    Decimal(String),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Calendar date of the value, truncating any time component.
    ///
    /// Text is accepted when it parses as a date or date-time. Returns
    /// `Ok(None)` for nulls and `Err` for values with no date component.
    pub fn calendar_date(&self) -> Result<Option<NaiveDate>, String> {
        match self {
            Self::Null => Ok(None),
            Self::Date(d) => Ok(Some(*d)),
            Self::DateTime(dt) => Ok(Some(dt.date())),
            Self::Text(s) => parse_text_date(s)
                .map(Some)
                .ok_or_else(|| format!("'{s}' is not a date")),
            other => Err(format!("{other} has no date component")),
        }
    }
}

fn parse_text_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
            .map(|dt| dt.date())
    })
}

/// Renders the value the way it is written to CSV; nulls are empty.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Decimal(s) | Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
        }
    }
}

/// Ordered columns and rows. Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularBatch {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl TabularBatch {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a batch from pre-shaped rows, rejecting rows of the wrong width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, String> {
        let mut batch = Self::new(columns);
        for row in rows {
            batch.push_row(row)?;
        }
        Ok(batch)
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), String> {
        if row.len() != self.columns.len() {
            return Err(format!(
                "row has {} values but batch has {} columns",
                row.len(),
                self.columns.len()
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched case-insensitively as SQL identifiers are.
    /// A qualified name such as `o.created_at` falls back to its last segment,
    /// which is the label the result set carries.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.find_column(name).or_else(|| {
            let (_, column) = name.rsplit_once('.')?;
            self.find_column(column.trim().trim_matches('"'))
        })
    }

    fn find_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
    }

    /// Values of one column in row order
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a CellValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_date_truncates_times() {
        let dt = NaiveDate::from_ymd_opt(2023, 5, 4)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(
            CellValue::DateTime(dt).calendar_date().unwrap(),
            NaiveDate::from_ymd_opt(2023, 5, 4)
        );
        assert_eq!(
            CellValue::Text("2023-05-04 08:00:00".into()).calendar_date().unwrap(),
            NaiveDate::from_ymd_opt(2023, 5, 4)
        );
        assert_eq!(CellValue::Null.calendar_date().unwrap(), None);
        assert!(CellValue::Int(3).calendar_date().is_err());
    }

    #[test]
    fn rows_must_match_column_count() {
        let mut batch = TabularBatch::new(vec!["id".into(), "created_at".into()]);
        assert!(batch.push_row(vec![CellValue::Int(1)]).is_err());
        assert!(batch.push_row(vec![CellValue::Int(1), CellValue::Null]).is_ok());
        assert_eq!(batch.row_count(), 1);
    }

    #[test]
    fn column_lookup_falls_back_to_case_insensitive() {
        let batch = TabularBatch::new(vec!["CreatedAt".into()]);
        assert_eq!(batch.column_index("createdat"), Some(0));
        assert_eq!(batch.column_index("missing"), None);
    }

    #[test]
    fn qualified_column_matches_its_last_segment() {
        let batch = TabularBatch::new(vec!["id".into(), "created_at".into()]);
        assert_eq!(batch.column_index("o.created_at"), Some(1));
        assert_eq!(batch.column_index("sales.orders.created_at"), Some(1));
        assert_eq!(batch.column_index("\"o\".\"Created_At\""), Some(1));
        assert_eq!(batch.column_index("o.shipped_at"), None);
        assert_eq!(batch.column_index("created_at."), None);
    }

    #[test]
    fn exact_qualified_label_wins_over_last_segment() {
        let batch = TabularBatch::new(vec!["created_at".into(), "o.created_at".into()]);
        assert_eq!(batch.column_index("o.created_at"), Some(1));
    }
}
