#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Historical Backfill
//!
//! Windowed export of a date-partitioned source table into S3-compatible
//! object storage.
//!
//! ## Overview
//!
//! A run covers the configured range `[start_date, end_date)` in contiguous
//! windows of a fixed step (days or months). Each window is queried on a
//! fresh read-only connection, staged to a local CSV file, uploaded, and the
//! local file is deleted. An optional count ledger accumulates row counts per
//! calendar date across all windows and is uploaded once at the end.
//!
//! ## Module Organization
//!
//! - [`config`] - INI configuration loading and validation
//! - [`windowing`] - Range partitioning into half-open windows
//! - [`query_builder`] - Per-window range query rendering
//! - [`database`] - Source connections (PostgreSQL)
//! - [`extract`] - Scoped query execution
//! - [`batch`] - In-memory tabular results
//! - [`staging`] - CSV serialization to local storage
//! - [`counts`] - Per-date row counting and the run ledger
//! - [`storage`] - Object storage upload and credential selection
//! - [`state_machine`] - Job lifecycle
//! - [`orchestration`] - The sequential backfill driver
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use historical_backfill::config::{ConfigManager, CredentialOverrides};
//! use historical_backfill::database::PgConnectionProvider;
//! use historical_backfill::orchestration::BackfillOrchestrator;
//! use historical_backfill::storage::S3ObjectStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_file("backfill.ini", &CredentialOverrides::default())?;
//! let config = Arc::new(manager.into_config());
//!
//! let mut orchestrator = BackfillOrchestrator::new(
//!     config.clone(),
//!     Arc::new(PgConnectionProvider::from_config(&config.database)),
//!     Arc::new(S3ObjectStore::from_config(&config.storage, uuid::Uuid::new_v4()).await),
//! );
//! let summary = orchestrator.run().await?;
//! println!("published {} artifacts", summary.published_keys.len());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod counts;
pub mod database;
pub mod error;
pub mod extract;
pub mod logging;
pub mod orchestration;
pub mod query_builder;
pub mod staging;
pub mod state_machine;
pub mod storage;
pub mod windowing;

pub use batch::{CellValue, TabularBatch};
pub use config::{BackfillConfig, ConfigManager, CredentialOverrides};
pub use counts::{CountLedger, DailyCount};
pub use error::{BackfillError, BackfillResult};
pub use orchestration::{BackfillOrchestrator, RunSummary};
pub use state_machine::{JobEvent, JobState};
pub use windowing::{BatchStep, BatchUnit, BatchWindow, BatchWindower, Interval};
