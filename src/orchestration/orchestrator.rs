use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::BackfillConfig;
use crate::counts::{count_by_date, CountLedger};
use crate::database::ConnectionProvider;
use crate::error::BackfillResult;
use crate::extract::Extractor;
use crate::logging::log_window_operation;
use crate::query_builder::{LiteralRangeQuery, RangeQueryBuilder};
use crate::staging::LocalStager;
use crate::state_machine::{JobEvent, JobState, JobStateMachine};
use crate::storage::{
    cleanup, ledger_object_key, window_file_name, window_object_key, ObjectStore, Publisher,
};
use crate::windowing::{BatchWindow, BatchWindower};

/// Source of window generation timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Windows queried, including empty ones
    pub windows_processed: usize,
    /// Windows that returned no rows and were skipped
    pub empty_windows: usize,
    pub total_rows: u64,
    /// Object keys of the uploaded window artifacts, in window order
    pub published_keys: Vec<String>,
    pub ledger_key: Option<String>,
    pub ledger_total: Option<u64>,
}

impl RunSummary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            windows_processed: 0,
            empty_windows: 0,
            total_rows: 0,
            published_keys: Vec::new(),
            ledger_key: None,
            ledger_total: None,
        }
    }
}

/// Sequential backfill driver.
pub struct BackfillOrchestrator {
    config: Arc<BackfillConfig>,
    connections: Arc<dyn ConnectionProvider>,
    query_builder: Arc<dyn RangeQueryBuilder>,
    extractor: Extractor,
    stager: LocalStager,
    publisher: Publisher,
    clock: Arc<dyn Clock>,
    run_id: Uuid,
    machine: JobStateMachine,
}

impl BackfillOrchestrator {
    pub fn new(
        config: Arc<BackfillConfig>,
        connections: Arc<dyn ConnectionProvider>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let stager = LocalStager::new(config.staging.directory.clone());
        let publisher = Publisher::new(store, config.storage.bucket.clone());
        Self {
            config,
            connections,
            query_builder: Arc::new(LiteralRangeQuery),
            extractor: Extractor,
            stager,
            publisher,
            clock: Arc::new(SystemClock),
            run_id: Uuid::new_v4(),
            machine: JobStateMachine::new(),
        }
    }

    pub fn with_query_builder(mut self, query_builder: Arc<dyn RangeQueryBuilder>) -> Self {
        self.query_builder = query_builder;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> JobState {
        self.machine.current_state()
    }

    /// Message of the error that failed the run, if any
    pub fn failure(&self) -> Option<&str> {
        self.machine.failure()
    }

    /// Run the whole backfill. Any error leaves the job in `Failed` and is
    /// returned unlogged for the caller to report.
    pub async fn run(&mut self) -> BackfillResult<RunSummary> {
        match self.execute().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.machine.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> BackfillResult<RunSummary> {
        let table = &self.config.table;
        let windower = BatchWindower::new(table.range, table.step);
        let mut summary = RunSummary::new(self.run_id);
        let mut ledger = self.config.count_file.enabled.then(CountLedger::new);

        info!(
            run_id = %self.run_id,
            table = %table.table_name,
            range = %table.range,
            step = %table.step,
            count_file = self.config.count_file.enabled,
            "🚀 Starting backfill"
        );

        self.machine.transition(JobEvent::Start)?;

        for interval in windower.windows() {
            let window = BatchWindow::new(interval, self.clock.now());
            self.process_window(&window, ledger.as_mut(), &mut summary)
                .await?;
        }

        self.machine.transition(JobEvent::WindowsExhausted)?;

        if let Some(ledger) = ledger {
            self.flush_ledger(ledger, &mut summary).await?;
        }

        self.machine.transition(JobEvent::Finalized)?;

        info!(
            run_id = %self.run_id,
            windows = summary.windows_processed,
            empty_windows = summary.empty_windows,
            total_rows = summary.total_rows,
            artifacts = summary.published_keys.len(),
            "✅ Backfill complete"
        );
        Ok(summary)
    }

    #[instrument(skip_all, fields(run_id = %self.run_id, window = %window.interval))]
    async fn process_window(
        &self,
        window: &BatchWindow,
        ledger: Option<&mut CountLedger>,
        summary: &mut RunSummary,
    ) -> BackfillResult<()> {
        let table = &self.config.table;
        info!(
            start = %window.interval.start(),
            end = %window.interval.end(),
            "Fetching data for window"
        );

        let query = self.query_builder.build(
            &table.table_name,
            &table.date_column,
            window.interval,
            table.query_param.as_deref(),
        );
        let batch = self
            .extractor
            .run(self.connections.as_ref(), &query)
            .await?;
        summary.windows_processed += 1;

        if batch.is_empty() {
            log_window_operation(
                "extract",
                &window.interval.to_string(),
                Some(0),
                "skipped",
                Some(query.sql()),
            );
            summary.empty_windows += 1;
            return Ok(());
        }

        let row_count = batch.row_count();
        let remote_key = window_object_key(&self.config.storage.path_prefix, window, row_count);
        let artifact = self
            .stager
            .stage(&batch, &window_file_name(window), remote_key)?;

        if let Some(ledger) = ledger {
            match count_by_date(&batch, &table.date_column) {
                Ok(partial) => ledger.merge(&partial),
                Err(e) => {
                    cleanup(&artifact);
                    return Err(e);
                }
            }
        }
        drop(batch);

        self.publisher.publish(&artifact).await?;

        log_window_operation(
            "publish",
            &window.interval.to_string(),
            Some(row_count),
            "published",
            Some(&artifact.remote_key),
        );
        summary.total_rows += row_count as u64;
        summary.published_keys.push(artifact.remote_key);
        Ok(())
    }

    async fn flush_ledger(
        &self,
        ledger: CountLedger,
        summary: &mut RunSummary,
    ) -> BackfillResult<()> {
        info!(dates = ledger.len(), "Total rows in count ledger");
        if ledger.is_empty() {
            info!("No records in the whole job, not creating a count file");
            return Ok(());
        }

        let file_name = &self.config.count_file.file_name;
        let local_name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name);
        let remote_key = ledger_object_key(&self.config.storage.path_prefix, file_name);
        let artifact = self
            .stager
            .stage(&ledger.to_batch(), local_name, remote_key)?;

        self.publisher.publish(&artifact).await?;

        summary.ledger_total = Some(ledger.total());
        summary.ledger_key = Some(artifact.remote_key);
        Ok(())
    }
}
