use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::{debug, info};

use super::decode::{decode_cell, decoder_for, ColumnDecoder};
use super::{ConnectionProvider, SourceConnection};
use crate::batch::{CellValue, TabularBatch};
use crate::config::DatabaseConfig;
use crate::error::{BackfillError, BackfillResult};
use crate::query_builder::QueryText;

const APPLICATION_NAME: &str = "historical-backfill";

/// Opens one PostgreSQL connection per acquisition.
///
/// Sessions start with `default_transaction_read_only=on`, so the backfill
/// cannot modify the source even if the extra clause contains a write.
#[derive(Debug, Clone)]
pub struct PgConnectionProvider {
    options: PgConnectOptions,
    target: String,
}

impl PgConnectionProvider {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        if let Some(driver) = &config.driver {
            debug!(driver = %driver, "Ignoring configured driver; using native PostgreSQL protocol");
        }

        let options = PgConnectOptions::new()
            .host(&config.server)
            .port(config.port)
            .database(&config.database)
            .username(&config.username)
            .password(&config.password)
            .application_name(APPLICATION_NAME)
            .options([("default_transaction_read_only", "on")]);

        Self {
            options,
            target: format!("{}:{}/{}", config.server, config.port, config.database),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl ConnectionProvider for PgConnectionProvider {
    async fn acquire(&self) -> BackfillResult<Box<dyn SourceConnection>> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| BackfillError::ConnectionError(format!("{}: {e}", self.target)))?;

        info!(target_db = %self.target, "Source database connection established");
        Ok(Box::new(PgSourceConnection { conn }))
    }
}

pub struct PgSourceConnection {
    conn: PgConnection,
}

#[async_trait]
impl SourceConnection for PgSourceConnection {
    async fn run_query(&mut self, query: &QueryText) -> BackfillResult<TabularBatch> {
        let mut statement = sqlx::query(query.sql());
        for param in query.params() {
            statement = statement.bind(*param);
        }

        let mut rows = statement.fetch(&mut self.conn);
        let mut batch: Option<(TabularBatch, Vec<ColumnDecoder>)> = None;

        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| BackfillError::ExtractionError(e.to_string()))?
        {
            if batch.is_none() {
                batch = Some((TabularBatch::new(column_names(&row)), column_decoders(&row)?));
            }
            if let Some((batch, decoders)) = batch.as_mut() {
                batch
                    .push_row(decode_row(&row, decoders)?)
                    .map_err(BackfillError::ExtractionError)?;
            }
        }

        // No rows means no column metadata; an empty batch is skipped anyway
        Ok(batch.map(|(batch, _)| batch).unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> BackfillResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| BackfillError::ConnectionError(format!("failed to close connection: {e}")))
    }
}

fn column_names(row: &PgRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Resolve a decoder for every column of the result set.
fn column_decoders(row: &PgRow) -> BackfillResult<Vec<ColumnDecoder>> {
    row.columns()
        .iter()
        .map(|column| {
            let type_info = column.type_info();
            decoder_for(type_info.name(), type_info.kind()).ok_or_else(|| {
                BackfillError::ExtractionError(format!(
                    "column '{}' has unsupported type {}",
                    column.name(),
                    type_info.name()
                ))
            })
        })
        .collect()
}

fn decode_row(row: &PgRow, decoders: &[ColumnDecoder]) -> BackfillResult<Vec<CellValue>> {
    row.columns()
        .iter()
        .zip(decoders)
        .map(|(column, decoder)| {
            decode_cell(row, column.ordinal(), *decoder).map_err(|e| {
                BackfillError::ExtractionError(format!(
                    "failed to decode column '{}': {e}",
                    column.name()
                ))
            })
        })
        .collect()
}
