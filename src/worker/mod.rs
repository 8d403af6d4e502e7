//! Batch orchestration: selects pending transcriptions, drives the
//! analysis client one item at a time, merges results into the store, and
//! tracks running statistics for the run.
//!
//! Cancellation is cooperative and batch-granular: the token is checked
//! between batches, never mid-item, so an in-flight request always runs to
//! completion (or its own timeout) before the pipeline winds down.

use crate::analysis::Analyzer;
use crate::database::{AnalysisRecord, AnalysisStatus, Database, PendingTranscription, RunStatsRecord};
use crate::error::StoreError;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub batch_size: usize,
    pub model: String,
}

/// Running statistics for one pipeline run. Averages are maintained
/// incrementally per item and flushed to the store once at the end of the
/// run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub total_processed: i64,
    pub successful: i64,
    pub failed: i64,
    pub avg_confidence: f64,
    pub avg_processing_time: f64,
    pub total_tokens: i64,
    pub total_cost: f64,
}

impl RunStats {
    fn record(&mut self, record: &AnalysisRecord, tokens: i64, cost: f64) {
        self.total_processed += 1;
        match record.analysis_status {
            AnalysisStatus::Completed => self.successful += 1,
            _ => self.failed += 1,
        }

        let n = self.total_processed as f64;
        self.avg_confidence =
            (self.avg_confidence * (n - 1.0) + record.confidence_score) / n;
        self.avg_processing_time =
            (self.avg_processing_time * (n - 1.0) + record.processing_time_ms) / n;

        self.total_tokens += tokens;
        self.total_cost += cost;
    }

    fn to_record(&self, model: &str, batch_size: usize) -> RunStatsRecord {
        RunStatsRecord {
            run_date: chrono::Utc::now().to_rfc3339(),
            total_processed: self.total_processed,
            successful: self.successful,
            failed: self.failed,
            avg_confidence: self.avg_confidence,
            avg_processing_time: self.avg_processing_time,
            model: model.to_string(),
            batch_size: batch_size as i64,
            total_tokens: self.total_tokens,
            total_cost: self.total_cost,
        }
    }
}

/// What a finished (or cancelled) run looked like.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    pub batches_run: usize,
    pub cancelled: bool,
    pub elapsed_seconds: f64,
}

pub struct BatchOrchestrator<'a, A> {
    db: &'a Database,
    analyzer: &'a A,
    config: OrchestratorConfig,
    stats: RunStats,
}

impl<'a, A: Analyzer> BatchOrchestrator<'a, A> {
    pub fn new(db: &'a Database, analyzer: &'a A, config: OrchestratorConfig) -> Self {
        Self {
            db,
            analyzer,
            config,
            stats: RunStats::default(),
        }
    }

    /// Run the pipeline over everything that needs analysis.
    ///
    /// Each batch is processed and persisted to completion before the
    /// cancellation token is consulted again. A store failure while
    /// merging stops that batch's merge but the run moves on; run-level
    /// statistics are written exactly once at the end.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
        reanalyze: bool,
    ) -> Result<RunSummary, StoreError> {
        let started = Instant::now();

        if reanalyze {
            log::info!("REANALYSIS MODE: analyzing all calls");
        }

        let pending = self.db.get_transcriptions_for_analysis(reanalyze, None)?;
        let mut batches_run = 0usize;
        let mut cancelled = false;

        if pending.is_empty() {
            log::info!("No transcriptions to analyze");
        } else {
            let batch_size = self.config.batch_size.max(1);
            let total_batches = (pending.len() + batch_size - 1) / batch_size;

            for (index, batch) in pending.chunks(batch_size).enumerate() {
                if cancel.is_cancelled() {
                    log::info!("Cancellation requested, stopping before batch {}", index + 1);
                    cancelled = true;
                    break;
                }

                log::info!(
                    "Processing batch {}/{} ({} items)",
                    index + 1,
                    total_batches,
                    batch.len()
                );

                let records = self.analyze_batch(batch).await;
                batches_run += 1;

                for record in &records {
                    if let Err(e) = self.db.upsert_analysis(record) {
                        // Batch-fatal: stop merging this batch, move on to
                        // the next one.
                        log::error!(
                            "Store failure while merging batch {} (call {}): {}",
                            index + 1,
                            record.call_id,
                            e
                        );
                        break;
                    }
                }
            }
        }

        self.db
            .save_run_stats(&self.stats.to_record(&self.config.model, self.config.batch_size))?;

        Ok(RunSummary {
            stats: self.stats.clone(),
            batches_run,
            cancelled,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        })
    }

    /// Analyze one batch, one item at a time. Items with nothing to
    /// analyze are skipped and do not count toward statistics.
    async fn analyze_batch(&mut self, batch: &[PendingTranscription]) -> Vec<AnalysisRecord> {
        let mut records = Vec::with_capacity(batch.len());

        for (index, item) in batch.iter().enumerate() {
            let transcript = item.transcription.trim();
            if transcript.is_empty() || transcript.starts_with("ERROR:") {
                log::info!("Skipping {}: no usable transcript", item.call_id);
                continue;
            }

            log::info!(
                "Processing item {}/{}: {}",
                index + 1,
                batch.len(),
                item.call_id
            );

            let item_started = Instant::now();
            let outcome = self
                .analyzer
                .analyze(&item.transcription, &item.call_id, item.duration_seconds)
                .await;
            let processing_time_ms = item_started.elapsed().as_secs_f64() * 1000.0;

            let call_date = if item.call_date.is_empty() {
                crate::text::extract_date_from_filename(&item.file_name)
            } else {
                item.call_date.clone()
            };

            let mut record = outcome.to_record(&call_date, &self.config.model);
            record.processing_time_ms = processing_time_ms;

            print_item_status(&record);

            let tokens = outcome.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0);
            self.stats.record(&record, tokens, outcome.cost);
            records.push(record);
        }

        records
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }
}

/// One status line per item, with a confidence indicator.
fn print_item_status(record: &AnalysisRecord) {
    match record.analysis_status {
        AnalysisStatus::Completed => {
            let marker = if record.confidence_score >= 80.0 {
                "+"
            } else if record.confidence_score >= 50.0 {
                "!"
            } else {
                "?"
            };
            let specific: String = record.specific_issue.chars().take(40).collect();
            println!(
                "{} {} analyzed (confidence: {:.1}%) - {}: {}",
                marker,
                record.call_id,
                record.confidence_score,
                if record.primary_issue_category.is_empty() {
                    "Unknown"
                } else {
                    record.primary_issue_category.as_str()
                },
                specific
            );
        }
        AnalysisStatus::Partial => {
            println!(
                "! Partial analysis for {}: service error but some data recovered",
                record.call_id
            );
        }
        AnalysisStatus::Failed => {
            let error: String = record
                .api_error
                .as_deref()
                .unwrap_or("unknown error")
                .chars()
                .take(50)
                .collect();
            println!("x Failed: {} - {}", record.call_id, error);
        }
    }
}
