//! # Backfill Orchestration
//!
//! Drives a backfill run from the first window to the final ledger upload.
//!
//! ## Per-window pipeline
//!
//! ```text
//! BatchWindower -> RangeQueryBuilder -> Extractor -+-> LocalStager --+-> Publisher -> cleanup
//!                                                  +-> count_by_date -> CountLedger
//! ```
//!
//! Windows are processed strictly one after another. A window with no rows
//! produces no artifact, no count and no upload. The first error aborts the
//! run and moves the job to [`JobState::Failed`](crate::state_machine::JobState);
//! rerunning starts again from the configured start date.

pub mod orchestrator;

pub use orchestrator::{BackfillOrchestrator, Clock, RunSummary, SystemClock};
