//! CSV export for analysis results.
//!
//! Existing output files are copied to a timestamped backup before being
//! replaced, and the new file is written to a temporary sibling and
//! atomically renamed into place so concurrent readers never observe a
//! partial file.

use crate::database::Database;
use crate::error::StoreError;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Export every analysis row to `path`. Returns the number of records
/// written.
pub fn export_analysis_results(db: &Database, path: &Path) -> Result<usize, StoreError> {
    let records = db.get_all_analysis_results()?;
    write_csv_atomically(path, &records)?;
    log::info!("Exported {} analysis results to {}", records.len(), path.display());
    Ok(records.len())
}

/// Export the transcript/analysis join for calls whose `call_date` falls
/// in `[start_date, end_date]`.
pub fn export_date_range(
    db: &Database,
    start_date: &str,
    end_date: &str,
    path: &Path,
) -> Result<usize, StoreError> {
    let rows = db.get_calls_in_date_range(start_date, end_date)?;
    write_csv_atomically(path, &rows)?;
    log::info!(
        "Exported {} calls from {} to {} into {}",
        rows.len(),
        start_date,
        end_date,
        path.display()
    );
    Ok(rows.len())
}

/// A sibling path carrying the current date and time, used for the
/// per-run copy of the results file (`results.csv` →
/// `results_2024-03-15_104500.csv`).
pub fn date_based_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("analysis_results");
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    let now = Local::now();
    let file_name = format!(
        "{}_{}_{}.{}",
        stem,
        now.format("%Y-%m-%d"),
        now.format("%H%M%S"),
        extension
    );
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

fn write_csv_atomically<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    backup_existing(path)?;

    let temp_path = temp_sibling(path);
    {
        let mut writer = csv::Writer::from_path(&temp_path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }

    // Same directory, so the rename cannot cross filesystems
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Copy an existing output file to `<name>.<timestamp>.bak` next to it
/// before it gets replaced. A failed backup aborts the export.
fn backup_existing(path: &Path) -> Result<(), StoreError> {
    if !path.exists() {
        return Ok(());
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("export.csv");
    let backup_name = format!("{}.{}.bak", file_name, timestamp);
    let backup_path = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(backup_name),
        _ => PathBuf::from(backup_name),
    };

    std::fs::copy(path, &backup_path)?;
    log::info!("Created backup at {}", backup_path.display());
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("export.csv");
    let temp_name = format!(".{}.tmp", file_name);
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(temp_name),
        _ => PathBuf::from(temp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{AnalysisRecord, AnalysisStatus, TranscriptionRecord};
    use tempfile::TempDir;

    fn seeded_db(temp: &TempDir) -> Database {
        let db = Database::open(&temp.path().join("export_test.db")).unwrap();
        for id in ["c1", "c2"] {
            db.upsert_transcription(&TranscriptionRecord {
                call_id: id.to_string(),
                file_name: format!("{}.wav", id),
                call_date: "2024-02-01".to_string(),
                duration_seconds: 60,
                transcription: "text.".to_string(),
                hash_value: "h".to_string(),
                import_timestamp: String::new(),
            })
            .unwrap();
            db.upsert_analysis(&AnalysisRecord {
                call_id: id.to_string(),
                analysis_status: AnalysisStatus::Completed,
                primary_issue_category: "Process Issue".to_string(),
                confidence_score: 70.0,
                ..Default::default()
            })
            .unwrap();
        }
        db
    }

    #[test]
    fn test_export_writes_all_rows() {
        let temp = TempDir::new().unwrap();
        let db = seeded_db(&temp);
        let out = temp.path().join("results.csv");

        let count = export_analysis_results(&db, &out).unwrap();
        assert_eq!(count, 2);

        let body = std::fs::read_to_string(&out).unwrap();
        assert!(body.starts_with("call_id,"));
        assert!(body.contains("c1"));
        assert!(body.contains("c2"));
        // No temp file left behind
        assert!(!temp.path().join(".results.csv.tmp").exists());
    }

    #[test]
    fn test_export_backs_up_existing_file() {
        let temp = TempDir::new().unwrap();
        let db = seeded_db(&temp);
        let out = temp.path().join("results.csv");

        std::fs::write(&out, "previous contents").unwrap();
        export_analysis_results(&db, &out).unwrap();

        let backups: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read_to_string(backups[0].path()).unwrap(),
            "previous contents"
        );
    }

    #[test]
    fn test_date_range_export_filters_by_call_date() {
        let temp = TempDir::new().unwrap();
        let db = seeded_db(&temp);
        let out = temp.path().join("range.csv");

        let count = export_date_range(&db, "2024-01-01", "2024-12-31", &out).unwrap();
        assert_eq!(count, 2);
        assert_eq!(export_date_range(&db, "2023-01-01", "2023-12-31", &out).unwrap(), 0);
    }

    #[test]
    fn test_date_based_path_shape() {
        let path = date_based_path(Path::new("/tmp/out/results.csv"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("results_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(path.parent().unwrap(), Path::new("/tmp/out"));
    }
}
