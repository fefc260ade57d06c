//! # Batch Windowing
//!
//! Partitions the global backfill interval into fixed-size, half-open date
//! windows. The final window is clipped to the global end date.
//!
//! ```text
//! start                                                   end
//!   |-------- step --------|-------- step --------|-- clip --|
//!   [w0.start, w0.end)      [w1.start, w1.end)     [w2.start, end)
//! ```
//!
//! The windower holds no state besides the cursor supplied by the caller, so a
//! sequence can be restarted from any date with [`BatchWindower::windows_from`].

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BackfillError, BackfillResult};

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    start: NaiveDate,
    end: NaiveDate,
}

impl Interval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> BackfillResult<Self> {
        if start > end {
            return Err(BackfillError::ConfigError(format!(
                "interval start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Unit of a batch step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchUnit {
    Days,
    Months,
}

impl fmt::Display for BatchUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days => write!(f, "days"),
            Self::Months => write!(f, "months"),
        }
    }
}

impl std::str::FromStr for BatchUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "days" => Ok(Self::Days),
            "months" => Ok(Self::Months),
            _ => Err(format!("Invalid batch unit: {s}")),
        }
    }
}

/// A validated batch step. `size` is always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchStep {
    unit: BatchUnit,
    size: u32,
}

impl Default for BatchStep {
    fn default() -> Self {
        Self {
            unit: BatchUnit::Months,
            size: 1,
        }
    }
}

impl BatchStep {
    pub fn days(size: u32) -> Self {
        Self::normalized(Some("days"), Some(i64::from(size)))
    }

    pub fn months(size: u32) -> Self {
        Self::normalized(Some("months"), Some(i64::from(size)))
    }

    /// Build a step from raw settings.
    ///
    /// An absent or unrecognized unit falls back to months, an absent size to
    /// one. A non-positive size collapses the whole step to one month, since a
    /// zero step would never advance the cursor.
    pub fn normalized(unit: Option<&str>, size: Option<i64>) -> Self {
        let unit = unit
            .and_then(|u| u.trim().to_ascii_lowercase().parse::<BatchUnit>().ok())
            .unwrap_or(BatchUnit::Months);

        match size {
            None => Self { unit, size: 1 },
            Some(n) if n <= 0 => Self::default(),
            Some(n) => Self {
                unit,
                size: u32::try_from(n).unwrap_or(u32::MAX),
            },
        }
    }

    pub fn unit(&self) -> BatchUnit {
        self.unit
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Advance `date` by one step, or `None` if the result is out of range.
    ///
    /// Month steps clamp to the last day of the target month
    /// (2023-01-31 + 1 month = 2023-02-28).
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self.unit {
            BatchUnit::Days => date.checked_add_days(Days::new(u64::from(self.size))),
            BatchUnit::Months => date.checked_add_months(Months::new(self.size)),
        }
    }
}

impl fmt::Display for BatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.size, self.unit)
    }
}

/// One window handed to the orchestrator, stamped with the time it was
/// generated. The timestamp keeps artifact names unique across reruns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    pub interval: Interval,
    pub generated_at: DateTime<Utc>,
}

impl BatchWindow {
    pub fn new(interval: Interval, generated_at: DateTime<Utc>) -> Self {
        Self {
            interval,
            generated_at,
        }
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.generated_at.timestamp()
    }
}

/// Compute the window starting at `current`, clipped to `limit`.
pub fn next_window(current: NaiveDate, step: BatchStep, limit: NaiveDate) -> Interval {
    let end = match step.advance(current) {
        Some(candidate) if candidate <= limit => candidate,
        _ => limit,
    };
    Interval {
        start: current,
        end: end.max(current),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindower {
    range: Interval,
    step: BatchStep,
}

impl BatchWindower {
    pub fn new(range: Interval, step: BatchStep) -> Self {
        Self { range, step }
    }

    pub fn range(&self) -> Interval {
        self.range
    }

    pub fn step(&self) -> BatchStep {
        self.step
    }

    /// Windows covering the whole configured range.
    pub fn windows(&self) -> Windows {
        self.windows_from(self.range.start)
    }

    /// Windows starting at an arbitrary cursor and ending at the configured
    /// end date.
    pub fn windows_from(&self, cursor: NaiveDate) -> Windows {
        Windows {
            cursor: Some(cursor),
            limit: self.range.end,
            step: self.step,
        }
    }
}

/// Lazy iterator over the windows of a range.
///
/// The cursor always advances by exactly one configured step, never by the
/// length of a clipped window, so once it reaches the limit the sequence ends.
#[derive(Debug, Clone)]
pub struct Windows {
    cursor: Option<NaiveDate>,
    limit: NaiveDate,
    step: BatchStep,
}

impl Windows {
    pub fn cursor(&self) -> Option<NaiveDate> {
        self.cursor
    }
}

impl Iterator for Windows {
    type Item = Interval;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor.filter(|c| *c < self.limit)?;
        let window = next_window(current, self.step, self.limit);
        self.cursor = self.step.advance(current);
        Some(window)
    }
}
