//! # Source Database Access
//!
//! Capabilities the extractor needs from the source database, and the
//! PostgreSQL implementation of them.
//!
//! ## Key Components
//!
//! - [`ConnectionProvider`] - opens a scoped, read-only [`SourceConnection`]
//! - [`SourceConnection`] - runs one query and materializes the rows
//! - [`connection`] - SQLx-backed PostgreSQL provider
//! - `decode` - column type to [`CellValue`](crate::batch::CellValue) mapping
//!
//! Connections are opened per window and closed as soon as the query has
//! run. The job is sequential, so a pool would only ever hold one idle
//! connection between windows.

pub mod connection;
mod decode;

use async_trait::async_trait;

use crate::batch::TabularBatch;
use crate::error::BackfillResult;
use crate::query_builder::QueryText;

pub use connection::{PgConnectionProvider, PgSourceConnection};

/// An open, read-only session against the source
#[async_trait]
pub trait SourceConnection: Send {
    /// Execute `query` and materialize every row.
    async fn run_query(&mut self, query: &QueryText) -> BackfillResult<TabularBatch>;

    /// Release the session.
    async fn close(self: Box<Self>) -> BackfillResult<()>;
}

#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self) -> BackfillResult<Box<dyn SourceConnection>>;
}
