//! SQLite persistence for transcripts, analysis results, and run
//! statistics.
//!
//! All access goes through a bounded [`pool::ConnectionPool`]; upserts are
//! typed per table (fixed column lists, `ON CONFLICT ... DO UPDATE`), so a
//! renamed field breaks the build instead of silently dropping data.

pub mod models;
pub mod pool;

#[cfg(test)]
mod tests;

use crate::error::StoreError;
use crate::text;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use models::*;
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};

pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        Self::open_with(db_path, PoolConfig::default())
    }

    pub fn open_with(db_path: &Path, pool_config: PoolConfig) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Self {
            pool: ConnectionPool::new(db_path, pool_config)?,
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.pool.acquire()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transcriptions (
                call_id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                call_date TEXT,
                duration_seconds INTEGER,
                transcription TEXT,
                hash_value TEXT,
                import_timestamp TEXT DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_transcriptions_call_date
                ON transcriptions(call_date);
            CREATE INDEX IF NOT EXISTS idx_transcriptions_import
                ON transcriptions(import_timestamp DESC);

            CREATE TABLE IF NOT EXISTS analysis_results (
                call_id TEXT PRIMARY KEY,
                call_date TEXT,
                analysis_status TEXT NOT NULL,
                api_error TEXT,
                primary_issue_category TEXT,
                specific_issue TEXT,
                issue_status TEXT,
                issue_severity TEXT,
                caller_type TEXT,
                experience_level TEXT,
                caller_intent TEXT,
                system_portal TEXT,
                device_information TEXT,
                error_messages TEXT,
                feature_involved TEXT,
                issue_preconditions TEXT,
                action_sequence TEXT,
                failure_point TEXT,
                expected_vs_actual TEXT,
                issue_frequency TEXT,
                attempted_solutions TEXT,
                resolution_steps TEXT,
                knowledge_gap_identified TEXT,
                issue_description_quote TEXT,
                impact_statement_quote TEXT,
                issue_summary TEXT,
                confidence_score REAL,
                analysis_timestamp TEXT DEFAULT (datetime('now')),
                processing_time_ms REAL,
                model TEXT,
                note TEXT,
                FOREIGN KEY (call_id) REFERENCES transcriptions(call_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_analysis_category
                ON analysis_results(primary_issue_category);
            CREATE INDEX IF NOT EXISTS idx_analysis_confidence
                ON analysis_results(confidence_score);

            CREATE TABLE IF NOT EXISTS analysis_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_date TEXT DEFAULT (datetime('now')),
                total_processed INTEGER,
                successful INTEGER,
                failed INTEGER,
                avg_confidence REAL,
                avg_processing_time REAL,
                model TEXT,
                batch_size INTEGER,
                total_tokens INTEGER,
                total_cost REAL
            );
        "#,
        )?;
        log::debug!("Database schema initialized");
        Ok(())
    }

    // =========================================================================
    // Transcriptions
    // =========================================================================

    /// Insert or replace a transcription row. On a `call_id` conflict every
    /// non-key column takes the incoming value (last writer wins).
    pub fn upsert_transcription(&self, record: &TranscriptionRecord) -> Result<(), StoreError> {
        if record.call_id.trim().is_empty() {
            return Err(StoreError::Validation(
                "transcription record is missing call_id".to_string(),
            ));
        }

        let conn = self.pool.acquire()?;
        conn.execute(
            "INSERT INTO transcriptions
                (call_id, file_name, call_date, duration_seconds, transcription, hash_value, import_timestamp)
             VALUES (?, ?, ?, ?, ?, ?, datetime('now'))
             ON CONFLICT(call_id) DO UPDATE SET
                file_name = excluded.file_name,
                call_date = excluded.call_date,
                duration_seconds = excluded.duration_seconds,
                transcription = excluded.transcription,
                hash_value = excluded.hash_value,
                import_timestamp = datetime('now')",
            params![
                record.call_id,
                record.file_name,
                record.call_date,
                record.duration_seconds,
                record.transcription,
                record.hash_value,
            ],
        )?;
        Ok(())
    }

    pub fn get_transcription(&self, call_id: &str) -> Result<Option<TranscriptionRecord>, StoreError> {
        let conn = self.pool.acquire()?;
        let record = conn
            .query_row(
                "SELECT call_id, file_name, call_date, duration_seconds, transcription,
                        hash_value, import_timestamp
                 FROM transcriptions WHERE call_id = ?",
                params![call_id],
                map_transcription_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Derived analyzed flag: a transcription counts as analyzed once a
    /// completed analysis row exists for it.
    pub fn is_analyzed(&self, call_id: &str) -> Result<bool, StoreError> {
        let conn = self.pool.acquire()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM analysis_results
             WHERE call_id = ? AND analysis_status = 'completed'",
            params![call_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Transcriptions that still need analysis, most recently imported
    /// first. In reanalyze mode every non-empty transcription qualifies.
    pub fn get_transcriptions_for_analysis(
        &self,
        reanalyze: bool,
        limit: Option<i64>,
    ) -> Result<Vec<PendingTranscription>, StoreError> {
        let conn = self.pool.acquire()?;

        let base = if reanalyze {
            "SELECT t.call_id, t.file_name, t.call_date, t.duration_seconds, t.transcription
             FROM transcriptions t
             WHERE t.transcription IS NOT NULL AND t.transcription != ''
             ORDER BY t.import_timestamp DESC"
        } else {
            "SELECT t.call_id, t.file_name, t.call_date, t.duration_seconds, t.transcription
             FROM transcriptions t
             LEFT JOIN analysis_results a ON t.call_id = a.call_id
             WHERE t.transcription IS NOT NULL AND t.transcription != ''
               AND (a.call_id IS NULL OR a.analysis_status != 'completed')
             ORDER BY t.import_timestamp DESC"
        };

        let sql = match limit {
            Some(n) => format!("{} LIMIT {}", base, n),
            None => base.to_string(),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PendingTranscription {
                    call_id: row.get(0)?,
                    file_name: row.get(1)?,
                    call_date: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    duration_seconds: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    transcription: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("Found {} transcriptions for analysis", rows.len());
        Ok(rows)
    }

    pub fn transcription_count(&self) -> Result<i64, StoreError> {
        let conn = self.pool.acquire()?;
        let count = conn.query_row("SELECT COUNT(*) FROM transcriptions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a transcription; its analysis row goes with it (cascade).
    pub fn delete_transcription(&self, call_id: &str) -> Result<bool, StoreError> {
        let conn = self.pool.acquire()?;
        let affected = conn.execute(
            "DELETE FROM transcriptions WHERE call_id = ?",
            params![call_id],
        )?;
        Ok(affected > 0)
    }

    // =========================================================================
    // Analysis results
    // =========================================================================

    /// Insert or replace an analysis row keyed by `call_id`. Re-analysis
    /// replaces the row; the store never holds two results for one call.
    pub fn upsert_analysis(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        if record.call_id.trim().is_empty() {
            return Err(StoreError::Validation(
                "analysis record is missing call_id".to_string(),
            ));
        }

        let conn = self.pool.acquire()?;
        conn.execute(
            "INSERT INTO analysis_results
                (call_id, call_date, analysis_status, api_error,
                 primary_issue_category, specific_issue, issue_status, issue_severity,
                 caller_type, experience_level, caller_intent,
                 system_portal, device_information, error_messages, feature_involved,
                 issue_preconditions, action_sequence, failure_point, expected_vs_actual,
                 issue_frequency, attempted_solutions, resolution_steps,
                 knowledge_gap_identified, issue_description_quote, impact_statement_quote,
                 issue_summary, confidence_score, analysis_timestamp, processing_time_ms,
                 model, note)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(call_id) DO UPDATE SET
                call_date = excluded.call_date,
                analysis_status = excluded.analysis_status,
                api_error = excluded.api_error,
                primary_issue_category = excluded.primary_issue_category,
                specific_issue = excluded.specific_issue,
                issue_status = excluded.issue_status,
                issue_severity = excluded.issue_severity,
                caller_type = excluded.caller_type,
                experience_level = excluded.experience_level,
                caller_intent = excluded.caller_intent,
                system_portal = excluded.system_portal,
                device_information = excluded.device_information,
                error_messages = excluded.error_messages,
                feature_involved = excluded.feature_involved,
                issue_preconditions = excluded.issue_preconditions,
                action_sequence = excluded.action_sequence,
                failure_point = excluded.failure_point,
                expected_vs_actual = excluded.expected_vs_actual,
                issue_frequency = excluded.issue_frequency,
                attempted_solutions = excluded.attempted_solutions,
                resolution_steps = excluded.resolution_steps,
                knowledge_gap_identified = excluded.knowledge_gap_identified,
                issue_description_quote = excluded.issue_description_quote,
                impact_statement_quote = excluded.impact_statement_quote,
                issue_summary = excluded.issue_summary,
                confidence_score = excluded.confidence_score,
                analysis_timestamp = excluded.analysis_timestamp,
                processing_time_ms = excluded.processing_time_ms,
                model = excluded.model,
                note = excluded.note",
            params![
                record.call_id,
                record.call_date,
                record.analysis_status.to_string(),
                record.api_error,
                record.primary_issue_category,
                record.specific_issue,
                record.issue_status,
                record.issue_severity,
                record.caller_type,
                record.experience_level,
                record.caller_intent,
                record.system_portal,
                record.device_information,
                record.error_messages,
                record.feature_involved,
                record.issue_preconditions,
                record.action_sequence,
                record.failure_point,
                record.expected_vs_actual,
                record.issue_frequency,
                record.attempted_solutions,
                record.resolution_steps,
                record.knowledge_gap_identified,
                record.issue_description_quote,
                record.impact_statement_quote,
                record.issue_summary,
                record.confidence_score,
                record.analysis_timestamp,
                record.processing_time_ms,
                record.model,
                record.note,
            ],
        )?;
        log::debug!("Saved analysis result for call_id: {}", record.call_id);
        Ok(())
    }

    pub fn get_analysis(&self, call_id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        let conn = self.pool.acquire()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM analysis_results WHERE call_id = ?",
                    ANALYSIS_COLUMNS
                ),
                params![call_id],
                map_analysis_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Filtered query over analysis results, newest analyses first.
    pub fn get_analysis_results(
        &self,
        filter: &AnalysisFilter,
        limit: i64,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let conn = self.pool.acquire()?;

        let mut sql = format!(
            "SELECT {} FROM analysis_results WHERE 1=1",
            ANALYSIS_COLUMNS
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = &filter.status {
            sql.push_str(" AND analysis_status = ?");
            params.push(Box::new(status.to_string()));
        }
        if let Some(category) = &filter.primary_issue_category {
            sql.push_str(" AND primary_issue_category = ?");
            params.push(Box::new(category.clone()));
        }
        if let Some(min) = filter.min_confidence {
            sql.push_str(" AND confidence_score >= ?");
            params.push(Box::new(min));
        }
        sql.push_str(" ORDER BY analysis_timestamp DESC LIMIT ?");
        params.push(Box::new(limit));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), map_analysis_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_all_analysis_results(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM analysis_results ORDER BY call_id",
            ANALYSIS_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_analysis_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Joined transcript/analysis view over a call-date range, for export.
    pub fn get_calls_in_date_range(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<CallDateRangeRow>, StoreError> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT t.call_id, t.call_date, t.duration_seconds,
                    a.primary_issue_category, a.specific_issue, a.issue_status,
                    a.caller_type, a.issue_severity, a.system_portal, a.confidence_score
             FROM transcriptions t
             LEFT JOIN analysis_results a ON t.call_id = a.call_id
             WHERE t.call_date BETWEEN ? AND ?
             ORDER BY t.call_date",
        )?;
        let rows = stmt
            .query_map(params![start_date, end_date], |row| {
                Ok(CallDateRangeRow {
                    call_id: row.get(0)?,
                    call_date: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    duration_seconds: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    primary_issue_category: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    specific_issue: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    issue_status: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    caller_type: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                    issue_severity: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                    system_portal: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                    confidence_score: row.get::<_, Option<f64>>(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // =========================================================================
    // Run statistics
    // =========================================================================

    /// Append one run-stats row. Stats are written once per run, never
    /// updated afterwards.
    pub fn save_run_stats(&self, stats: &RunStatsRecord) -> Result<(), StoreError> {
        let conn = self.pool.acquire()?;
        let run_date = if stats.run_date.is_empty() {
            chrono::Utc::now().to_rfc3339()
        } else {
            stats.run_date.clone()
        };
        conn.execute(
            "INSERT INTO analysis_stats
                (run_date, total_processed, successful, failed, avg_confidence,
                 avg_processing_time, model, batch_size, total_tokens, total_cost)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                run_date,
                stats.total_processed,
                stats.successful,
                stats.failed,
                stats.avg_confidence,
                stats.avg_processing_time,
                stats.model,
                stats.batch_size,
                stats.total_tokens,
                stats.total_cost,
            ],
        )?;
        log::info!("Saved statistics for run on {}", run_date);
        Ok(())
    }

    pub fn get_recent_runs(&self, limit: i64) -> Result<Vec<RunStatsRecord>, StoreError> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn.prepare(
            "SELECT run_date, total_processed, successful, failed, avg_confidence,
                    avg_processing_time, model, batch_size, total_tokens, total_cost
             FROM analysis_stats ORDER BY run_date DESC LIMIT ?",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(RunStatsRecord {
                    run_date: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    total_processed: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    successful: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    failed: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    avg_confidence: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                    avg_processing_time: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                    model: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                    batch_size: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
                    total_tokens: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
                    total_cost: row.get::<_, Option<f64>>(9)?.unwrap_or(0.0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_summary_statistics(&self) -> Result<SummaryStatistics, StoreError> {
        let conn = self.pool.acquire()?;

        let total_transcriptions: i64 =
            conn.query_row("SELECT COUNT(*) FROM transcriptions", [], |row| row.get(0))?;
        let total_analyzed: i64 =
            conn.query_row("SELECT COUNT(*) FROM analysis_results", [], |row| row.get(0))?;
        let completed_analyses: i64 = conn.query_row(
            "SELECT COUNT(*) FROM analysis_results WHERE analysis_status = 'completed'",
            [],
            |row| row.get(0),
        )?;
        let failed_analyses: i64 = conn.query_row(
            "SELECT COUNT(*) FROM analysis_results WHERE analysis_status = 'failed'",
            [],
            |row| row.get(0),
        )?;
        let avg_confidence: Option<f64> = conn.query_row(
            "SELECT AVG(confidence_score) FROM analysis_results",
            [],
            |row| row.get(0),
        )?;
        let avg_processing_time: Option<f64> = conn.query_row(
            "SELECT AVG(processing_time_ms) FROM analysis_results",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT primary_issue_category, COUNT(*) as count
             FROM analysis_results
             WHERE primary_issue_category IS NOT NULL AND primary_issue_category != ''
             GROUP BY primary_issue_category
             ORDER BY count DESC",
        )?;
        let issue_categories = stmt
            .query_map([], |row| {
                Ok(CategoryCount {
                    primary_issue_category: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT issue_severity, COUNT(*) as count
             FROM analysis_results
             WHERE issue_severity IS NOT NULL AND issue_severity != ''
             GROUP BY issue_severity
             ORDER BY count DESC",
        )?;
        let issue_severity = stmt
            .query_map([], |row| {
                Ok(SeverityCount {
                    issue_severity: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SummaryStatistics {
            total_transcriptions,
            total_analyzed,
            completed_analyses,
            failed_analyses,
            avg_confidence,
            avg_processing_time,
            issue_categories,
            issue_severity,
        })
    }

    // =========================================================================
    // CSV import
    // =========================================================================

    /// Import transcriptions from a CSV file with at least `file_name`,
    /// `transcription`, and `duration_seconds` columns.
    ///
    /// Rows whose content hash matches the stored row are skipped, so
    /// re-importing an unchanged file is a no-op. Blank transcripts and
    /// rows marked `ERROR:` (failed ingest upstream) are excluded. Returns
    /// the number of new or changed rows written.
    pub fn import_transcriptions_from_csv(&self, csv_path: &Path) -> Result<usize, StoreError> {
        let mut reader = csv::Reader::from_path(csv_path)?;
        let mut imported = 0usize;

        for row in reader.deserialize::<TranscriptCsvRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    log::warn!("Skipping malformed CSV row: {}", e);
                    continue;
                }
            };

            if row.file_name.trim().is_empty() {
                continue;
            }
            let transcription = row.transcription.trim();
            if transcription.is_empty() || transcription.starts_with("ERROR:") {
                continue;
            }

            let hash_value = text::content_hash(&row.transcription);

            // Unchanged content — skip without touching the row
            if let Some(existing) = self.get_transcription(&row.file_name)? {
                if existing.hash_value == hash_value {
                    continue;
                }
            }

            let record = TranscriptionRecord {
                call_id: row.file_name.clone(),
                call_date: text::extract_date_from_filename(&row.file_name),
                file_name: row.file_name,
                duration_seconds: row.duration_seconds.unwrap_or(0.0).round() as i64,
                transcription: row.transcription,
                hash_value,
                import_timestamp: String::new(),
            };

            self.upsert_transcription(&record)?;
            imported += 1;
        }

        log::info!(
            "Imported {} new/updated transcriptions from {}",
            imported,
            csv_path.display()
        );
        Ok(imported)
    }

    /// Import previously exported analysis rows, e.g. to seed a fresh
    /// database from a CSV produced by an earlier run.
    pub fn import_analysis_results_from_csv(&self, csv_path: &Path) -> Result<usize, StoreError> {
        let mut reader = csv::Reader::from_path(csv_path)?;
        let mut imported = 0usize;

        for row in reader.deserialize::<AnalysisRecord>() {
            let record = match row {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping malformed analysis CSV row: {}", e);
                    continue;
                }
            };
            if record.call_id.trim().is_empty() {
                continue;
            }
            // A row without a matching transcription (foreign key) should
            // not sink the rest of the import
            match self.upsert_analysis(&record) {
                Ok(()) => imported += 1,
                Err(e) => log::warn!("Error importing analysis result {}: {}", record.call_id, e),
            }
        }

        log::info!(
            "Imported {} analysis results from {}",
            imported,
            csv_path.display()
        );
        Ok(imported)
    }
}

/// Minimum CSV contract for transcript input files. Extra columns are
/// ignored.
#[derive(Debug, Deserialize)]
struct TranscriptCsvRow {
    file_name: String,
    #[serde(default)]
    transcription: String,
    #[serde(default)]
    duration_seconds: Option<f64>,
}

/// Joined transcript/analysis row for date-range exports.
#[derive(Debug, Clone, Serialize)]
pub struct CallDateRangeRow {
    pub call_id: String,
    pub call_date: String,
    pub duration_seconds: i64,
    pub primary_issue_category: String,
    pub specific_issue: String,
    pub issue_status: String,
    pub caller_type: String,
    pub issue_severity: String,
    pub system_portal: String,
    pub confidence_score: Option<f64>,
}

const ANALYSIS_COLUMNS: &str = "call_id, call_date, analysis_status, api_error, \
    primary_issue_category, specific_issue, issue_status, issue_severity, \
    caller_type, experience_level, caller_intent, system_portal, \
    device_information, error_messages, feature_involved, issue_preconditions, \
    action_sequence, failure_point, expected_vs_actual, issue_frequency, \
    attempted_solutions, resolution_steps, knowledge_gap_identified, \
    issue_description_quote, impact_statement_quote, issue_summary, \
    confidence_score, analysis_timestamp, processing_time_ms, model, note";

fn map_transcription_row(row: &Row<'_>) -> rusqlite::Result<TranscriptionRecord> {
    Ok(TranscriptionRecord {
        call_id: row.get(0)?,
        file_name: row.get(1)?,
        call_date: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        duration_seconds: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
        transcription: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        hash_value: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        import_timestamp: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    })
}

fn map_analysis_row(row: &Row<'_>) -> rusqlite::Result<AnalysisRecord> {
    fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    }

    Ok(AnalysisRecord {
        call_id: row.get(0)?,
        call_date: text(row, 1)?,
        analysis_status: AnalysisStatus::from(text(row, 2)?),
        api_error: row.get(3)?,
        primary_issue_category: text(row, 4)?,
        specific_issue: text(row, 5)?,
        issue_status: text(row, 6)?,
        issue_severity: text(row, 7)?,
        caller_type: text(row, 8)?,
        experience_level: text(row, 9)?,
        caller_intent: text(row, 10)?,
        system_portal: text(row, 11)?,
        device_information: text(row, 12)?,
        error_messages: text(row, 13)?,
        feature_involved: text(row, 14)?,
        issue_preconditions: text(row, 15)?,
        action_sequence: text(row, 16)?,
        failure_point: text(row, 17)?,
        expected_vs_actual: text(row, 18)?,
        issue_frequency: text(row, 19)?,
        attempted_solutions: text(row, 20)?,
        resolution_steps: text(row, 21)?,
        knowledge_gap_identified: text(row, 22)?,
        issue_description_quote: text(row, 23)?,
        impact_statement_quote: text(row, 24)?,
        issue_summary: text(row, 25)?,
        confidence_score: row.get::<_, Option<f64>>(26)?.unwrap_or(0.0),
        analysis_timestamp: text(row, 27)?,
        processing_time_ms: row.get::<_, Option<f64>>(28)?.unwrap_or(0.0),
        model: text(row, 29)?,
        note: row.get(30)?,
    })
}
