use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use historical_backfill::batch::TabularBatch;
use historical_backfill::database::{ConnectionProvider, SourceConnection};
use historical_backfill::error::{BackfillError, BackfillResult};
use historical_backfill::orchestration::Clock;
use historical_backfill::query_builder::QueryText;
use historical_backfill::storage::ObjectStore;

/// In-memory source table. Each query returns the rows whose date column
/// falls inside the query's window.
#[derive(Debug)]
pub struct InMemorySource {
    table: TabularBatch,
    date_column: String,
    /// 1-based query number that fails, if any
    fail_on_query: Option<usize>,
    acquired: AtomicUsize,
    closed: AtomicUsize,
    queries: Mutex<Vec<QueryText>>,
}

impl InMemorySource {
    pub fn new(table: TabularBatch, date_column: &str) -> Self {
        Self {
            table,
            date_column: date_column.to_string(),
            fail_on_query: None,
            acquired: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on_query(mut self, query_number: usize) -> Self {
        self.fail_on_query = Some(query_number);
        self
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<QueryText> {
        self.queries.lock().unwrap().clone()
    }

    fn select(&self, query: &QueryText) -> BackfillResult<TabularBatch> {
        let number = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.clone());
            queries.len()
        };
        if self.fail_on_query == Some(number) {
            return Err(BackfillError::ExtractionError(format!(
                "simulated failure on query {number}"
            )));
        }

        let index = self
            .table
            .column_index(&self.date_column)
            .expect("date column present in fixture");
        let window = query.window();
        let rows: Vec<_> = self
            .table
            .rows()
            .iter()
            .filter(|row| match row[index].calendar_date() {
                Ok(Some(date)) => window.contains(date),
                _ => false,
            })
            .cloned()
            .collect();

        if rows.is_empty() {
            return Ok(TabularBatch::default());
        }
        Ok(TabularBatch::from_rows(self.table.columns().to_vec(), rows).unwrap())
    }
}

struct InMemoryConnection {
    source: Arc<InMemorySource>,
}

#[async_trait]
impl SourceConnection for InMemoryConnection {
    async fn run_query(&mut self, query: &QueryText) -> BackfillResult<TabularBatch> {
        self.source.select(query)
    }

    async fn close(self: Box<Self>) -> BackfillResult<()> {
        self.source.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Provider handing out connections to a shared [`InMemorySource`]
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    pub source: Arc<InMemorySource>,
}

impl InMemoryProvider {
    pub fn new(source: InMemorySource) -> Self {
        Self {
            source: Arc::new(source),
        }
    }
}

#[async_trait]
impl ConnectionProvider for InMemoryProvider {
    async fn acquire(&self) -> BackfillResult<Box<dyn SourceConnection>> {
        self.source.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryConnection {
            source: self.source.clone(),
        }))
    }
}

/// Provider whose every acquire fails
#[derive(Debug, Default)]
pub struct UnreachableProvider;

#[async_trait]
impl ConnectionProvider for UnreachableProvider {
    async fn acquire(&self) -> BackfillResult<Box<dyn SourceConnection>> {
        Err(BackfillError::ConnectionError(
            "connection refused".to_string(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub contents: String,
}

/// Object store that keeps uploads in memory
#[derive(Debug, Default)]
pub struct RecordingStore {
    objects: Mutex<Vec<StoredObject>>,
    /// 1-based upload number that fails, if any
    fail_on_upload: Option<usize>,
    attempts: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_upload(upload_number: usize) -> Self {
        Self {
            fail_on_upload: Some(upload_number),
            ..Self::default()
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects().into_iter().map(|o| o.key).collect()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects().into_iter().find(|o| o.key == key)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> BackfillResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_upload == Some(attempt) {
            return Err(BackfillError::publish(bucket, key, "simulated upload failure"));
        }

        let contents = std::fs::read_to_string(local_path)
            .map_err(|e| BackfillError::publish(bucket, key, e))?;
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            contents,
        });
        Ok(())
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
