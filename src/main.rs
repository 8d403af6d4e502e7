//! Thin CLI over the analysis pipeline: argument parsing, environment
//! configuration, signal wiring, and the database report surface.

use anyhow::Context;
use callscope::analysis::{AnalysisClient, ClientConfig};
use callscope::config::AppConfig;
use callscope::database::Database;
use callscope::worker::{BatchOrchestrator, OrchestratorConfig};
use callscope::{export, AnalysisBackend};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "callscope")]
#[command(author, version, about = "Call-center transcript analysis pipeline")]
struct Args {
    /// Path to the transcriptions CSV file
    #[arg(long, default_value = "call_transcriptions.csv")]
    transcriptions: PathBuf,

    /// Path for the analysis results CSV file
    #[arg(long, default_value = "call_analysis_results.csv")]
    output: PathBuf,

    /// Database path (overrides CALLSCOPE_DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Analysis model to use
    #[arg(long)]
    model: Option<String>,

    /// Service backend: "chat" or "legacy"
    #[arg(long)]
    backend: Option<String>,

    /// Number of transcripts per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum service retries per item
    #[arg(long)]
    max_retries: Option<u32>,

    /// Outbound request budget in requests per minute
    #[arg(long)]
    rate_limit: Option<u32>,

    /// Reanalyze all calls, including those already processed
    #[arg(long)]
    reanalyze: bool,

    /// Print a report from the database and exit
    #[arg(long)]
    db_report: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    let db = Database::open(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;

    if args.db_report {
        print_db_report(&db)?;
        return Ok(());
    }

    println!("{:=^70}", "");
    println!("{:=^70}", " CALL CENTER TRANSCRIPT ANALYSIS ");
    println!("{:=^70}", "");
    println!("Transcripts: {}", config.transcriptions_csv.display());
    println!("Model:       {}", config.model);
    println!("Batch size:  {}", config.batch_size);
    if args.reanalyze {
        println!("Mode:        REANALYSIS (processing all transcripts)");
    } else {
        println!("Mode:        standard (only new/failed transcripts)");
    }
    println!();

    // Pull new/changed transcripts and any previously exported results in
    // before selecting work.
    if config.transcriptions_csv.exists() {
        let imported = db
            .import_transcriptions_from_csv(&config.transcriptions_csv)
            .context("failed to import transcriptions CSV")?;
        println!("Imported/updated {} transcriptions", imported);
    } else {
        log::warn!(
            "Transcriptions file {} not found; analyzing what is already in the database",
            config.transcriptions_csv.display()
        );
    }
    if config.analysis_csv.exists() {
        let imported = db.import_analysis_results_from_csv(&config.analysis_csv)?;
        log::info!("Imported {} prior analysis results", imported);
    }

    let client = AnalysisClient::new(ClientConfig::from_app_config(&config))?;

    // Set exactly once by Ctrl-C; the orchestrator checks it between
    // batches.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupt received, finishing current batch before exiting...");
                cancel.cancel();
            }
        });
    }

    let mut orchestrator = BatchOrchestrator::new(
        &db,
        &client,
        OrchestratorConfig {
            batch_size: config.batch_size,
            model: config.model.clone(),
        },
    );
    let summary = orchestrator.run(&cancel, args.reanalyze).await?;

    let exported = export::export_analysis_results(&db, &config.analysis_csv)?;
    let date_copy = export::date_based_path(&config.analysis_csv);
    export::export_analysis_results(&db, &date_copy)?;

    let minutes = (summary.elapsed_seconds / 60.0) as u64;
    let seconds = (summary.elapsed_seconds % 60.0) as u64;
    println!();
    println!("{:=^70}", " ANALYSIS COMPLETE ");
    println!(
        "Processed {} calls in {} batches ({} ok, {} failed) in {}m {}s",
        summary.stats.total_processed,
        summary.batches_run,
        summary.stats.successful,
        summary.stats.failed,
        minutes,
        seconds
    );
    if summary.stats.total_processed > 0 {
        println!(
            "Average confidence: {:.1}%  |  tokens: {}  |  est. cost: ${:.4}",
            summary.stats.avg_confidence,
            summary.stats.total_tokens,
            summary.stats.total_cost
        );
    }
    if summary.cancelled {
        println!("Run was cancelled; remaining transcripts stay pending.");
    }
    println!("Results in database: {}", config.db_path.display());
    println!(
        "Exported {} rows to {} (copy: {})",
        exported,
        config.analysis_csv.display(),
        date_copy.display()
    );

    Ok(())
}

fn resolve_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::from_env();

    if let Some(path) = &args.db_path {
        config.db_path = path.clone();
    }
    config.transcriptions_csv = args.transcriptions.clone();
    config.analysis_csv = args.output.clone();
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(backend) = &args.backend {
        config.backend = backend
            .parse::<AnalysisBackend>()
            .map_err(|_| anyhow::anyhow!("unknown backend '{}', expected chat|legacy", backend))?;
    }
    if let Some(size) = args.batch_size {
        config.batch_size = size.max(1);
    }
    if let Some(retries) = args.max_retries {
        config.max_retries = retries;
    }
    if let Some(rpm) = args.rate_limit {
        config.rate_limit_rpm = rpm.max(1);
    }

    Ok(config)
}

fn print_db_report(db: &Database) -> anyhow::Result<()> {
    let stats = db.get_summary_statistics()?;

    println!("{:=^60}", "");
    println!("{:=^60}", " CALL CENTER ANALYSIS REPORT ");
    println!("{:=^60}", "");
    println!();
    println!("Total transcriptions: {}", stats.total_transcriptions);
    println!(
        "Analyzed calls: {} ({} completed, {} failed)",
        stats.total_analyzed, stats.completed_analyses, stats.failed_analyses
    );
    if let Some(avg) = stats.avg_confidence {
        println!("Average confidence score: {:.2}%", avg);
    }
    if let Some(avg) = stats.avg_processing_time {
        println!("Average processing time: {:.0} ms", avg);
    }

    if !stats.issue_categories.is_empty() {
        println!("\nTop Issue Categories:");
        for (i, category) in stats.issue_categories.iter().take(5).enumerate() {
            println!(
                "{}. {}: {} calls",
                i + 1,
                category.primary_issue_category,
                category.count
            );
        }
    }

    if !stats.issue_severity.is_empty() {
        println!("\nSeverity Breakdown:");
        for severity in &stats.issue_severity {
            println!("- {}: {}", severity.issue_severity, severity.count);
        }
    }

    let runs = db.get_recent_runs(5)?;
    if !runs.is_empty() {
        println!("\nRecent Runs:");
        for run in &runs {
            println!(
                "- {}: {} processed ({} ok, {} failed), avg confidence {:.1}%",
                run.run_date, run.total_processed, run.successful, run.failed, run.avg_confidence
            );
        }
    }

    println!();
    println!("{:=^60}", "");
    Ok(())
}
