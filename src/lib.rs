//! Callscope — call-center transcript analysis pipeline.
//!
//! Ingests call transcripts from CSV, sends each one through a remote
//! text-analysis service, scores the structured results for completeness,
//! and persists everything in SQLite with upsert-by-`call_id` semantics so
//! reprocessing is idempotent.
//!
//! # Pipeline
//!
//! 1. [`database::Database::import_transcriptions_from_csv`] loads new or
//!    changed transcripts (content-hash change detection).
//! 2. [`worker::BatchOrchestrator`] selects pending work, partitions it
//!    into fixed-size batches, and drives the client one item at a time.
//! 3. [`analysis::AnalysisClient`] paces outbound calls, retries with
//!    backoff, and degrades failures into data instead of errors.
//! 4. [`analysis::score::confidence_score`] rates each parsed result 0–100.
//! 5. Results are upserted (last writer wins per `call_id`) and run-level
//!    statistics are appended once per run.
//!
//! Cancellation is cooperative: a `CancellationToken` is checked between
//! batches, never mid-item.
//!
//! # Modules
//!
//! - [`analysis`]: rate-limited service client, prompt builder, scorer
//! - [`database`]: connection-pooled SQLite store and typed upserts
//! - [`worker`]: batch orchestrator and run statistics
//! - [`export`]: CSV export with backup-before-overwrite
//! - [`text`]: chunking, filename dates, content hashing

pub mod analysis;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod text;
pub mod worker;

pub use analysis::{AnalysisBackend, AnalysisClient, AnalysisOutcome, Analyzer, ClientConfig};
pub use config::AppConfig;
pub use database::{AnalysisRecord, AnalysisStatus, Database, TranscriptionRecord};
pub use error::{AnalysisError, StoreError};
pub use worker::{BatchOrchestrator, OrchestratorConfig, RunSummary};
