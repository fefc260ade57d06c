use super::{QueryText, RangeQueryBuilder};
use crate::windowing::Interval;

fn table_reference(table: &str, extra_clause: Option<&str>) -> String {
    match extra_clause.map(str::trim).filter(|c| !c.is_empty()) {
        Some(clause) => format!("{table} {clause}"),
        None => table.to_string(),
    }
}

/// Inlines the window bounds as `'YYYY-MM-DD'` literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralRangeQuery;

impl RangeQueryBuilder for LiteralRangeQuery {
    fn build(
        &self,
        table: &str,
        date_column: &str,
        window: Interval,
        extra_clause: Option<&str>,
    ) -> QueryText {
        let sql = format!(
            "SELECT * FROM {} WHERE {col} >= '{}' AND {col} < '{}'",
            table_reference(table, extra_clause),
            window.start().format("%Y-%m-%d"),
            window.end().format("%Y-%m-%d"),
            col = date_column,
        );
        QueryText::new(sql, Vec::new(), window)
    }
}

/// Passes the window bounds as positional bind parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundRangeQuery;

impl RangeQueryBuilder for BoundRangeQuery {
    fn build(
        &self,
        table: &str,
        date_column: &str,
        window: Interval,
        extra_clause: Option<&str>,
    ) -> QueryText {
        let sql = format!(
            "SELECT * FROM {} WHERE {col} >= $1 AND {col} < $2",
            table_reference(table, extra_clause),
            col = date_column,
        );
        QueryText::new(sql, vec![window.start(), window.end()], window)
    }
}
