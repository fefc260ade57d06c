//! # Range Query Building
//!
//! Renders the bounded-range query for one window. Construction lives behind
//! the [`RangeQueryBuilder`] trait so the orchestrator never formats SQL
//! itself and a different rendering strategy can be swapped in.
//!
//! - [`LiteralRangeQuery`] - dates inlined as quoted literals (default)
//! - [`BoundRangeQuery`] - dates passed as `$1`/`$2` bind parameters
//!
//! Table names, column names and the extra clause come from trusted
//! configuration and are inserted as-is by both builders.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use historical_backfill::query_builder::{LiteralRangeQuery, RangeQueryBuilder};
//! use historical_backfill::windowing::Interval;
//!
//! let window = Interval::new(
//!     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
//! )
//! .unwrap();
//! let query = LiteralRangeQuery.build("orders", "created_at", window, None);
//! assert_eq!(
//!     query.sql(),
//!     "SELECT * FROM orders WHERE created_at >= '2023-01-01' AND created_at < '2023-02-01'"
//! );
//! ```

pub mod builder;

use chrono::NaiveDate;

use crate::windowing::Interval;

pub use builder::{BoundRangeQuery, LiteralRangeQuery};

/// Rendered query text with its ordered bind parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryText {
    sql: String,
    params: Vec<NaiveDate>,
    window: Interval,
}

impl QueryText {
    pub fn new(sql: String, params: Vec<NaiveDate>, window: Interval) -> Self {
        Self {
            sql,
            params,
            window,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[NaiveDate] {
        &self.params
    }

    /// Window the query was rendered for
    pub fn window(&self) -> Interval {
        self.window
    }
}

impl std::fmt::Display for QueryText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Strategy for rendering `SELECT * FROM table [extra] WHERE col in window`.
pub trait RangeQueryBuilder: Send + Sync {
    fn build(
        &self,
        table: &str,
        date_column: &str,
        window: Interval,
        extra_clause: Option<&str>,
    ) -> QueryText;
}
