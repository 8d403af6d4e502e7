// Store-level tests: upsert semantics, CSV import idempotence, work
// selection, and run statistics.

use crate::database::{
    AnalysisFilter, AnalysisRecord, AnalysisStatus, Database, RunStatsRecord, TranscriptionRecord,
};
use crate::error::StoreError;
use crate::text;
use tempfile::TempDir;

fn setup_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::open(&db_path).unwrap();
    (db, temp_dir)
}

fn transcription(call_id: &str, text_body: &str) -> TranscriptionRecord {
    TranscriptionRecord {
        call_id: call_id.to_string(),
        file_name: call_id.to_string(),
        call_date: "2024-01-01".to_string(),
        duration_seconds: 120,
        transcription: text_body.to_string(),
        hash_value: text::content_hash(text_body),
        import_timestamp: String::new(),
    }
}

fn analysis(call_id: &str) -> AnalysisRecord {
    AnalysisRecord {
        call_id: call_id.to_string(),
        analysis_status: AnalysisStatus::Completed,
        primary_issue_category: "Technical Issue".to_string(),
        specific_issue: "OTP delivery failure during withdrawal".to_string(),
        issue_severity: "High".to_string(),
        confidence_score: 85.0,
        analysis_timestamp: "2024-01-01 10:00:00".to_string(),
        model: "gpt-4o".to_string(),
        ..Default::default()
    }
}

// =========================================================================
// Upsert semantics
// =========================================================================

#[test]
fn test_upsert_transcription_roundtrip() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("c1", "Customer asked about loan status."))
        .unwrap();

    let stored = db.get_transcription("c1").unwrap().unwrap();
    assert_eq!(stored.call_id, "c1");
    assert_eq!(stored.transcription, "Customer asked about loan status.");
    assert!(!stored.import_timestamp.is_empty());
}

#[test]
fn test_upsert_transcription_last_writer_wins() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("c1", "first version"))
        .unwrap();
    db.upsert_transcription(&transcription("c1", "second version"))
        .unwrap();

    assert_eq!(db.transcription_count().unwrap(), 1);
    let stored = db.get_transcription("c1").unwrap().unwrap();
    assert_eq!(stored.transcription, "second version");
    assert_eq!(stored.hash_value, text::content_hash("second version"));
}

#[test]
fn test_upsert_transcription_missing_call_id_rejected() {
    let (db, _temp) = setup_test_db();
    let record = transcription("  ", "text");
    let err = db.upsert_transcription(&record).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(db.transcription_count().unwrap(), 0);
}

#[test]
fn test_upsert_analysis_replaces_row() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("c1", "transcript"))
        .unwrap();

    db.upsert_analysis(&analysis("c1")).unwrap();

    let mut updated = analysis("c1");
    updated.primary_issue_category = "Process Issue".to_string();
    updated.confidence_score = 40.0;
    db.upsert_analysis(&updated).unwrap();

    let all = db.get_all_analysis_results().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].primary_issue_category, "Process Issue");
    assert_eq!(all[0].confidence_score, 40.0);
}

#[test]
fn test_upsert_analysis_missing_call_id_rejected() {
    let (db, _temp) = setup_test_db();
    let record = AnalysisRecord::default();
    let err = db.upsert_analysis(&record).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(db.get_all_analysis_results().unwrap().is_empty());
}

// =========================================================================
// Work selection
// =========================================================================

#[test]
fn test_pending_selection_excludes_completed() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("done", "analyzed already"))
        .unwrap();
    db.upsert_transcription(&transcription("new", "never analyzed"))
        .unwrap();
    db.upsert_transcription(&transcription("failed", "analysis failed"))
        .unwrap();

    db.upsert_analysis(&analysis("done")).unwrap();
    let mut failed = analysis("failed");
    failed.analysis_status = AnalysisStatus::Failed;
    db.upsert_analysis(&failed).unwrap();

    let pending = db.get_transcriptions_for_analysis(false, None).unwrap();
    let ids: Vec<&str> = pending.iter().map(|p| p.call_id.as_str()).collect();
    assert!(ids.contains(&"new"));
    assert!(ids.contains(&"failed"));
    assert!(!ids.contains(&"done"));
}

#[test]
fn test_reanalyze_selects_everything() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("done", "analyzed already"))
        .unwrap();
    db.upsert_analysis(&analysis("done")).unwrap();

    let pending = db.get_transcriptions_for_analysis(true, None).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].call_id, "done");
}

#[test]
fn test_is_analyzed_reflects_completed_rows_only() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("c1", "t")).unwrap();
    assert!(!db.is_analyzed("c1").unwrap());

    let mut partial = analysis("c1");
    partial.analysis_status = AnalysisStatus::Partial;
    db.upsert_analysis(&partial).unwrap();
    assert!(!db.is_analyzed("c1").unwrap());

    db.upsert_analysis(&analysis("c1")).unwrap();
    assert!(db.is_analyzed("c1").unwrap());
}

// =========================================================================
// Cascade delete
// =========================================================================

#[test]
fn test_delete_transcription_cascades_to_analysis() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("c1", "t")).unwrap();
    db.upsert_analysis(&analysis("c1")).unwrap();

    assert!(db.delete_transcription("c1").unwrap());
    assert!(db.get_transcription("c1").unwrap().is_none());
    assert!(db.get_analysis("c1").unwrap().is_none());
}

#[test]
fn test_delete_missing_transcription_is_noop() {
    let (db, _temp) = setup_test_db();
    assert!(!db.delete_transcription("ghost").unwrap());
}

// =========================================================================
// CSV import
// =========================================================================

fn write_csv(temp: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = temp.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_import_counts_and_skips_invalid_rows() {
    let (db, temp) = setup_test_db();
    let csv_path = write_csv(
        &temp,
        "calls.csv",
        "file_name,transcription,duration_seconds\n\
         call_20240101_a.wav,Customer asked about loan status.,120\n\
         call_20240101_b.wav,ERROR: transcription service unavailable,0\n\
         call_20240101_c.wav,,45\n\
         call_20240102_d.wav,Partner asked about commission payout.,300\n",
    );

    let imported = db.import_transcriptions_from_csv(&csv_path).unwrap();
    assert_eq!(imported, 2);
    assert_eq!(db.transcription_count().unwrap(), 2);

    let stored = db.get_transcription("call_20240101_a.wav").unwrap().unwrap();
    assert_eq!(stored.call_date, "2024-01-01");
    assert_eq!(stored.duration_seconds, 120);
}

#[test]
fn test_reimport_unchanged_rows_is_idempotent() {
    let (db, temp) = setup_test_db();
    let body = "file_name,transcription,duration_seconds\n\
                c1.wav,Customer asked about loan status.,120\n";
    let csv_path = write_csv(&temp, "calls.csv", body);

    assert_eq!(db.import_transcriptions_from_csv(&csv_path).unwrap(), 1);
    // Same key, same content hash — nothing to do
    assert_eq!(db.import_transcriptions_from_csv(&csv_path).unwrap(), 0);
}

#[test]
fn test_reimport_changed_row_updates() {
    let (db, temp) = setup_test_db();
    let first = write_csv(
        &temp,
        "v1.csv",
        "file_name,transcription,duration_seconds\nc1.wav,old text.,120\n",
    );
    let second = write_csv(
        &temp,
        "v2.csv",
        "file_name,transcription,duration_seconds\nc1.wav,new text.,120\n",
    );

    db.import_transcriptions_from_csv(&first).unwrap();
    assert_eq!(db.import_transcriptions_from_csv(&second).unwrap(), 1);

    let stored = db.get_transcription("c1.wav").unwrap().unwrap();
    assert_eq!(stored.transcription, "new text.");
    assert_eq!(db.transcription_count().unwrap(), 1);
}

#[test]
fn test_import_analysis_results_csv() {
    let (db, temp) = setup_test_db();
    db.upsert_transcription(&transcription("c1", "t")).unwrap();
    db.upsert_analysis(&analysis("c1")).unwrap();

    // Round-trip through the exporter's format
    let out = temp.path().join("analysis.csv");
    crate::export::export_analysis_results(&db, &out).unwrap();

    let (db2, _temp2) = setup_test_db();
    db2.upsert_transcription(&transcription("c1", "t")).unwrap();
    assert_eq!(db2.import_analysis_results_from_csv(&out).unwrap(), 1);

    let stored = db2.get_analysis("c1").unwrap().unwrap();
    assert_eq!(stored.primary_issue_category, "Technical Issue");
    assert_eq!(stored.confidence_score, 85.0);
}

// =========================================================================
// Queries and statistics
// =========================================================================

#[test]
fn test_analysis_filter_query() {
    let (db, _temp) = setup_test_db();
    for (id, category, confidence) in [
        ("a", "Technical Issue", 90.0),
        ("b", "Process Issue", 55.0),
        ("c", "Technical Issue", 30.0),
    ] {
        db.upsert_transcription(&transcription(id, "t")).unwrap();
        let mut rec = analysis(id);
        rec.primary_issue_category = category.to_string();
        rec.confidence_score = confidence;
        db.upsert_analysis(&rec).unwrap();
    }

    let filter = AnalysisFilter {
        primary_issue_category: Some("Technical Issue".to_string()),
        min_confidence: Some(50.0),
        ..Default::default()
    };
    let results = db.get_analysis_results(&filter, 100).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].call_id, "a");
}

#[test]
fn test_summary_statistics() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("ok", "t")).unwrap();
    db.upsert_transcription(&transcription("bad", "t")).unwrap();

    db.upsert_analysis(&analysis("ok")).unwrap();
    let mut failed = analysis("bad");
    failed.analysis_status = AnalysisStatus::Failed;
    failed.confidence_score = 0.0;
    db.upsert_analysis(&failed).unwrap();

    let stats = db.get_summary_statistics().unwrap();
    assert_eq!(stats.total_transcriptions, 2);
    assert_eq!(stats.total_analyzed, 2);
    assert_eq!(stats.completed_analyses, 1);
    assert_eq!(stats.failed_analyses, 1);
    assert_eq!(stats.avg_confidence, Some(42.5));
    assert_eq!(stats.issue_categories[0].primary_issue_category, "Technical Issue");
}

#[test]
fn test_run_stats_are_append_only() {
    let (db, _temp) = setup_test_db();
    let stats = RunStatsRecord {
        run_date: "2024-01-01T10:00:00Z".to_string(),
        total_processed: 12,
        successful: 10,
        failed: 2,
        avg_confidence: 76.5,
        avg_processing_time: 1830.0,
        model: "gpt-4o".to_string(),
        batch_size: 10,
        total_tokens: 48_000,
        total_cost: 1.44,
    };
    db.save_run_stats(&stats).unwrap();
    db.save_run_stats(&stats).unwrap();

    let runs = db.get_recent_runs(10).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].total_processed, 12);
    assert_eq!(runs[0].total_tokens, 48_000);
}

#[test]
fn test_date_range_rows_join_analysis() {
    let (db, _temp) = setup_test_db();
    db.upsert_transcription(&transcription("c1", "t")).unwrap();
    db.upsert_analysis(&analysis("c1")).unwrap();
    db.upsert_transcription(&TranscriptionRecord {
        call_date: "2023-06-01".to_string(),
        ..transcription("old", "t")
    })
    .unwrap();

    let rows = db.get_calls_in_date_range("2024-01-01", "2024-12-31").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].call_id, "c1");
    assert_eq!(rows[0].primary_issue_category, "Technical Issue");
    assert_eq!(rows[0].confidence_score, Some(85.0));
}
