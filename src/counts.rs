//! # Per-Date Row Counts
//!
//! Groups one batch's rows by the calendar date of the configured date column
//! and folds the result into a job-wide [`CountLedger`].
//!
//! Merging is summation: feeding the same batch's counts in twice doubles
//! them. The orchestrator therefore merges each batch exactly once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::batch::{CellValue, TabularBatch};
use crate::error::{BackfillError, BackfillResult};

/// Row count for a single calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Count rows per calendar date of `date_column`, sorted by date.
///
/// Null dates are not counted.
pub fn count_by_date(batch: &TabularBatch, date_column: &str) -> BackfillResult<Vec<DailyCount>> {
    let values = batch.column_values(date_column).ok_or_else(|| {
        BackfillError::CountError(format!(
            "date column '{date_column}' not present in batch columns {:?}",
            batch.columns()
        ))
    })?;

    let mut grouped: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for (row, value) in values.enumerate() {
        let date = value.calendar_date().map_err(|reason| {
            BackfillError::CountError(format!("row {row}, column '{date_column}': {reason}"))
        })?;
        if let Some(date) = date {
            *grouped.entry(date).or_insert(0) += 1;
        }
    }

    Ok(grouped
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect())
}

/// Accumulated per-date counts across the whole job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountLedger {
    counts: BTreeMap<NaiveDate, u64>,
}

impl CountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `partial` into the ledger, inserting dates not yet present.
    pub fn merge(&mut self, partial: &[DailyCount]) {
        for entry in partial {
            *self.counts.entry(entry.date).or_insert(0) += entry.count;
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<u64> {
        self.counts.get(&date).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct dates
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = DailyCount> + '_ {
        self.counts
            .iter()
            .map(|(date, count)| DailyCount { date: *date, count: *count })
    }

    /// Ledger as a two-column `date,count` batch ready for staging
    pub fn to_batch(&self) -> TabularBatch {
        let rows = self
            .entries()
            .map(|entry| {
                vec![
                    CellValue::Date(entry.date),
                    CellValue::Int(i64::try_from(entry.count).unwrap_or(i64::MAX)),
                ]
            })
            .collect();
        // Two cells per row always matches the two columns
        TabularBatch::from_rows(vec!["date".to_string(), "count".to_string()], rows)
            .unwrap_or_default()
    }
}
