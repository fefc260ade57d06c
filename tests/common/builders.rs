use chrono::{NaiveDate, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;

use historical_backfill::batch::{CellValue, TabularBatch};
use historical_backfill::config::{BackfillConfig, ConfigManager, CredentialOverrides};
use historical_backfill::orchestration::BackfillOrchestrator;

use super::mocks::{FixedClock, InMemoryProvider, InMemorySource, RecordingStore};

pub const GENERATED_AT_EPOCH: i64 = 1_700_000_000;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Builder for a complete INI job description
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub start: String,
    pub end: String,
    pub batch_type: String,
    pub batch_size: String,
    pub count_file: bool,
    pub count_file_name: String,
    pub path_prefix: String,
    pub query_param: String,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            start: "2023-01-01".to_string(),
            end: "2023-04-01".to_string(),
            batch_type: "months".to_string(),
            batch_size: "1".to_string(),
            count_file: true,
            count_file_name: "counts.csv".to_string(),
            path_prefix: "backfill/orders/".to_string(),
            query_param: "None".to_string(),
        }
    }
}

impl JobSpec {
    pub fn range(mut self, start: &str, end: &str) -> Self {
        self.start = start.to_string();
        self.end = end.to_string();
        self
    }

    pub fn step(mut self, batch_type: &str, size: &str) -> Self {
        self.batch_type = batch_type.to_string();
        self.batch_size = size.to_string();
        self
    }

    pub fn without_count_file(mut self) -> Self {
        self.count_file = false;
        self
    }

    pub fn ini(&self, staging: &Path) -> String {
        format!(
            r#"
[Database]
server = db.internal
database = warehouse
username = reader
password = secret
driver = None

[AWS]
iam_role = None
aws_access_key_id = None
aws_secret_access_key = None
s3_bucket = archive-bucket
s3_path = {prefix}

[TableDetails]
table_name = orders
query_param = {query_param}
date_column_name = created_at
start_date = {start}
end_date = {end}
batch_type = {batch_type}
batch_days_months = {batch_size}

[CountFileDetails]
is_count_file_required = {count_file}
count_file_name = {count_file_name}

[Staging]
directory = {staging}
"#,
            prefix = self.path_prefix,
            query_param = self.query_param,
            start = self.start,
            end = self.end,
            batch_type = self.batch_type,
            batch_size = self.batch_size,
            count_file = self.count_file,
            count_file_name = self.count_file_name,
            staging = staging.display(),
        )
    }

    pub fn config(&self, staging: &Path) -> BackfillConfig {
        ConfigManager::load_from_str(&self.ini(staging), &CredentialOverrides::default())
            .unwrap()
            .into_config()
    }
}

/// An `orders` table with `per_day` rows on each listed date
pub fn orders_table(per_day: &[(NaiveDate, usize)]) -> TabularBatch {
    let mut table = TabularBatch::new(vec![
        "id".to_string(),
        "created_at".to_string(),
        "amount".to_string(),
    ]);
    let mut id = 0;
    for (day, count) in per_day {
        for n in 0..*count {
            id += 1;
            let created_at = day.and_hms_opt(8 + (n as u32 % 12), 30, 0).unwrap();
            table
                .push_row(vec![
                    CellValue::Int(id),
                    CellValue::DateTime(created_at),
                    CellValue::Decimal(format!("{id}.50")),
                ])
                .unwrap();
        }
    }
    table
}

/// Wire an orchestrator over in-memory collaborators with a frozen clock
pub fn orchestrator(
    config: BackfillConfig,
    provider: &InMemoryProvider,
    store: &Arc<RecordingStore>,
) -> BackfillOrchestrator {
    let clock = FixedClock(Utc.timestamp_opt(GENERATED_AT_EPOCH, 0).unwrap());
    BackfillOrchestrator::new(Arc::new(config), Arc::new(provider.clone()), store.clone())
        .with_clock(Arc::new(clock))
}

pub fn provider_for(table: TabularBatch) -> InMemoryProvider {
    InMemoryProvider::new(InMemorySource::new(table, "created_at"))
}
