//! Runs one window's query against the source and materializes the result.

use std::time::Instant;
use tracing::{info, warn};

use crate::batch::TabularBatch;
use crate::database::ConnectionProvider;
use crate::error::BackfillResult;
use crate::query_builder::QueryText;

/// Scoped extraction: acquire, query, always release.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    /// Execute `query` on a fresh connection from `provider`.
    ///
    /// The connection is closed whether or not the query succeeded. A failure
    /// to close is logged and never replaces the query's own result.
    pub async fn run(
        &self,
        provider: &dyn ConnectionProvider,
        query: &QueryText,
    ) -> BackfillResult<TabularBatch> {
        info!(window = %query.window(), sql = %query.sql(), "Executing extraction query");

        let mut connection = provider.acquire().await?;

        let started = Instant::now();
        let result = connection.run_query(query).await;
        let elapsed = started.elapsed();

        if let Err(e) = connection.close().await {
            warn!(error = %e, "Failed to release source connection");
        } else {
            info!("Closed the source connection");
        }

        let batch = result?;
        info!(
            window = %query.window(),
            rows = batch.row_count(),
            duration_ms = elapsed.as_millis() as u64,
            "Query executed in {:.2} minutes",
            elapsed.as_secs_f64() / 60.0
        );
        Ok(batch)
    }
}
