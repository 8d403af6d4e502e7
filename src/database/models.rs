use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    Partial,
    Failed,
}

impl Default for AnalysisStatus {
    fn default() -> Self {
        Self::Completed
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl From<String> for AnalysisStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "partial" => Self::Partial,
            "failed" => Self::Failed,
            _ => Self::Completed,
        }
    }
}

/// A row of the `transcriptions` table. `call_id` is derived from the
/// source filename and is the stable key everything else hangs off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionRecord {
    pub call_id: String,
    pub file_name: String,
    pub call_date: String,
    pub duration_seconds: i64,
    pub transcription: String,
    pub hash_value: String,
    pub import_timestamp: String,
}

/// A transcription selected for analysis, with its derived analyzed flag.
#[derive(Debug, Clone)]
pub struct PendingTranscription {
    pub call_id: String,
    pub file_name: String,
    pub call_date: String,
    pub duration_seconds: i64,
    pub transcription: String,
}

/// One flattened row of the `analysis_results` table — the canonical
/// representation of a completed (or degraded) analysis. Exactly one row
/// exists per `call_id`; re-analysis replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub call_id: String,
    #[serde(default)]
    pub call_date: String,
    #[serde(default)]
    pub analysis_status: AnalysisStatus,
    #[serde(default)]
    pub api_error: Option<String>,
    #[serde(default)]
    pub primary_issue_category: String,
    #[serde(default)]
    pub specific_issue: String,
    #[serde(default)]
    pub issue_status: String,
    #[serde(default)]
    pub issue_severity: String,
    #[serde(default)]
    pub caller_type: String,
    #[serde(default)]
    pub experience_level: String,
    #[serde(default)]
    pub caller_intent: String,
    #[serde(default)]
    pub system_portal: String,
    #[serde(default)]
    pub device_information: String,
    #[serde(default)]
    pub error_messages: String,
    #[serde(default)]
    pub feature_involved: String,
    #[serde(default)]
    pub issue_preconditions: String,
    #[serde(default)]
    pub action_sequence: String,
    #[serde(default)]
    pub failure_point: String,
    #[serde(default)]
    pub expected_vs_actual: String,
    #[serde(default)]
    pub issue_frequency: String,
    #[serde(default)]
    pub attempted_solutions: String,
    #[serde(default)]
    pub resolution_steps: String,
    #[serde(default)]
    pub knowledge_gap_identified: String,
    #[serde(default)]
    pub issue_description_quote: String,
    #[serde(default)]
    pub impact_statement_quote: String,
    #[serde(default)]
    pub issue_summary: String,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub analysis_timestamp: String,
    #[serde(default)]
    pub processing_time_ms: f64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// One row of the append-only `analysis_stats` table — the totals and
/// running averages of a single pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatsRecord {
    #[serde(default)]
    pub run_date: String,
    pub total_processed: i64,
    pub successful: i64,
    pub failed: i64,
    pub avg_confidence: f64,
    pub avg_processing_time: f64,
    pub model: String,
    pub batch_size: i64,
    pub total_tokens: i64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub primary_issue_category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeverityCount {
    pub issue_severity: String,
    pub count: i64,
}

/// Aggregate view across the whole store, for the `--db-report` surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryStatistics {
    pub total_transcriptions: i64,
    pub total_analyzed: i64,
    pub completed_analyses: i64,
    pub failed_analyses: i64,
    pub avg_confidence: Option<f64>,
    pub avg_processing_time: Option<f64>,
    pub issue_categories: Vec<CategoryCount>,
    pub issue_severity: Vec<SeverityCount>,
}

/// Typed filter for querying analysis results — fixed criteria instead of
/// ad-hoc column/value pairs, so field-name drift fails at compile time.
#[derive(Debug, Clone, Default)]
pub struct AnalysisFilter {
    pub status: Option<AnalysisStatus>,
    pub primary_issue_category: Option<String>,
    pub min_confidence: Option<f64>,
}

// ============================================================================
// Structured analysis response contract
// ============================================================================

/// The JSON object the analysis service is asked to return. Every field is
/// tolerant of omission; whatever the model leaves out simply stays empty
/// and costs confidence score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub issue_classification: IssueClassification,
    #[serde(default)]
    pub caller_information: CallerInformation,
    #[serde(default)]
    pub technical_context: TechnicalContext,
    #[serde(default)]
    pub issue_recreation: IssueRecreation,
    #[serde(default)]
    pub resolution_path: ResolutionPath,
    #[serde(default)]
    pub key_quotes: KeyQuotes,
    #[serde(default)]
    pub issue_summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueClassification {
    #[serde(default)]
    pub primary_category: String,
    #[serde(default)]
    pub specific_issue: String,
    #[serde(default)]
    pub process_stage: String,
    #[serde(default)]
    pub issue_status: String,
    #[serde(default)]
    pub severity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerInformation {
    #[serde(default)]
    pub caller_type: String,
    #[serde(default)]
    pub experience_level: String,
    #[serde(default)]
    pub intent: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalContext {
    #[serde(default)]
    pub system_portal: String,
    #[serde(default)]
    pub device_information: String,
    #[serde(default)]
    pub error_messages: String,
    #[serde(default)]
    pub feature_involved: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueRecreation {
    #[serde(default)]
    pub preconditions: String,
    #[serde(default)]
    pub action_sequence: String,
    #[serde(default)]
    pub workflow_stage: String,
    #[serde(default)]
    pub failure_point: String,
    #[serde(default)]
    pub expected_vs_actual: String,
    #[serde(default)]
    pub frequency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionPath {
    #[serde(default)]
    pub attempted_solutions: String,
    #[serde(default)]
    pub resolution_steps: String,
    #[serde(default)]
    pub knowledge_gap_identified: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyQuotes {
    #[serde(default)]
    pub issue_description: String,
    #[serde(default)]
    pub impact_statement: String,
}
