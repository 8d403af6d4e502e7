//! Rate-limited, retrying client for the remote text-analysis service.
//!
//! The client paces outbound calls to a configured requests-per-minute
//! budget, retries transient failures with exponential backoff, and parses
//! the model's free-form output into the structured response contract.
//! Failures never escape [`AnalysisClient::analyze`]: after the retry
//! budget is spent the error comes back as data on the outcome, so the
//! orchestrator always proceeds to the next item.

pub mod prompt;
pub mod score;

use crate::database::models::{AnalysisRecord, AnalysisResponse, AnalysisStatus};
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fixed delay before retrying after an unparsable (but delivered)
/// response; transient service errors use exponential backoff instead.
const MALFORMED_RETRY_DELAY: Duration = Duration::from_secs(2);

/// How much raw text to keep for manual review when parsing fails on the
/// final attempt.
const RAW_EXCERPT_CHARS: usize = 500;

/// Per-token USD prices (input, output) by model, with a fallback row for
/// unknown models.
const MODEL_COSTS: &[(&str, f64, f64)] = &[
    ("gpt-4o", 0.000_002_5, 0.000_01),
    ("gpt-4o-mini", 0.000_000_15, 0.000_000_6),
    ("gpt-4-turbo", 0.000_01, 0.000_03),
    ("gpt-4", 0.000_03, 0.000_06),
    ("gpt-3.5-turbo", 0.000_001_5, 0.000_002),
];
const DEFAULT_COST: (f64, f64) = (0.000_01, 0.000_03);

/// Which request/response shape to speak to the service. Selected once at
/// startup; there is no runtime fallback between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisBackend {
    /// Chat-style endpoint with a JSON response format hint.
    ChatCompletions,
    /// Older plain-completions endpoint for deployments without the chat
    /// surface.
    LegacyCompletions,
}

impl FromStr for AnalysisBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" | "chat_completions" => Ok(Self::ChatCompletions),
            "legacy" | "legacy_completions" => Ok(Self::LegacyCompletions),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub backend: AnalysisBackend,
    pub max_retries: u32,
    pub rate_limit_rpm: u32,
    pub request_timeout: Duration,
    pub max_transcript_chars: usize,
    pub retry_auth_errors: bool,
}

impl ClientConfig {
    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            backend: config.backend,
            max_retries: config.max_retries,
            rate_limit_rpm: config.rate_limit_rpm,
            request_timeout: config.request_timeout,
            max_transcript_chars: config.max_transcript_chars,
            retry_auth_errors: config.retry_auth_errors,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

/// The result of analyzing one transcript — success or degraded, never an
/// error. `api_error` is populated when the retry budget ran out.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub call_id: String,
    pub status: AnalysisStatus,
    pub response: AnalysisResponse,
    pub api_error: Option<String>,
    pub raw_excerpt: Option<String>,
    /// `Some((used_chars, total_chars))` when the prompt used a truncated
    /// transcript.
    pub truncated: Option<(usize, usize)>,
    pub usage: Option<TokenUsage>,
    pub cost: f64,
}

impl AnalysisOutcome {
    /// Flatten into a storable row. The confidence score is computed here
    /// so every persisted result carries one.
    pub fn to_record(&self, call_date: &str, model: &str) -> AnalysisRecord {
        let r = &self.response;

        let api_error = match (&self.api_error, &self.raw_excerpt) {
            (Some(err), Some(raw)) => Some(format!("{} (raw: {})", err, raw)),
            (Some(err), None) => Some(err.clone()),
            _ => None,
        };

        let issue_summary = if r.issue_summary.is_empty() && self.api_error.is_some() {
            format!(
                "The analysis failed due to a service error: {}. \
                 The transcript may require manual review.",
                self.api_error.as_deref().unwrap_or("unknown")
            )
        } else {
            r.issue_summary.clone()
        };

        let confidence_score = if self.status == AnalysisStatus::Failed {
            0.0
        } else {
            score::confidence_score(r)
        };

        AnalysisRecord {
            call_id: self.call_id.clone(),
            call_date: call_date.to_string(),
            analysis_status: self.status.clone(),
            api_error,
            primary_issue_category: r.issue_classification.primary_category.clone(),
            specific_issue: r.issue_classification.specific_issue.clone(),
            issue_status: r.issue_classification.issue_status.clone(),
            issue_severity: r.issue_classification.severity.clone(),
            caller_type: r.caller_information.caller_type.clone(),
            experience_level: r.caller_information.experience_level.clone(),
            caller_intent: r.caller_information.intent.clone(),
            system_portal: r.technical_context.system_portal.clone(),
            device_information: r.technical_context.device_information.clone(),
            error_messages: r.technical_context.error_messages.clone(),
            feature_involved: r.technical_context.feature_involved.clone(),
            issue_preconditions: r.issue_recreation.preconditions.clone(),
            action_sequence: r.issue_recreation.action_sequence.clone(),
            failure_point: r.issue_recreation.failure_point.clone(),
            expected_vs_actual: r.issue_recreation.expected_vs_actual.clone(),
            issue_frequency: r.issue_recreation.frequency.clone(),
            attempted_solutions: r.resolution_path.attempted_solutions.clone(),
            resolution_steps: r.resolution_path.resolution_steps.clone(),
            knowledge_gap_identified: r.resolution_path.knowledge_gap_identified.clone(),
            issue_description_quote: r.key_quotes.issue_description.clone(),
            impact_statement_quote: r.key_quotes.impact_statement.clone(),
            issue_summary,
            confidence_score,
            analysis_timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            processing_time_ms: 0.0,
            model: model.to_string(),
            note: self.truncated.map(|(used, total)| {
                format!(
                    "Analysis based on partial transcription ({}/{} chars)",
                    used, total
                )
            }),
        }
    }
}

/// The seam between the orchestrator and the analysis service. The real
/// client implements it against HTTP; tests implement it with scripted
/// outcomes.
pub trait Analyzer {
    fn analyze(
        &self,
        transcript: &str,
        call_id: &str,
        duration_seconds: i64,
    ) -> impl Future<Output = AnalysisOutcome> + Send;
}

/// Minimum-interval pacing for outbound calls. The mutex is held across
/// the sleep, so concurrent logical tasks are serialized onto the same
/// budget.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(rate_limit_rpm: u32) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(60.0 / rate_limit_rpm.max(1) as f64),
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sleep out the remainder of the minimum interval, then mark this
    /// moment as the latest call.
    pub async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let delay = self.min_interval - elapsed;
                log::debug!("Rate limiting: waiting {:.2}s", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
            }
        }
        *last = Some(Instant::now());
    }
}

pub struct AnalysisClient {
    http: reqwest::Client,
    config: ClientConfig,
    limiter: RateLimiter,
}

impl AnalysisClient {
    pub fn new(config: ClientConfig) -> Result<Self, anyhow::Error> {
        if config.api_key.is_empty() {
            anyhow::bail!("analysis service API key is required (set CALLSCOPE_API_KEY)");
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let limiter = RateLimiter::new(config.rate_limit_rpm);
        log::info!(
            "Analysis client initialized: model={}, backend={:?}, {} rpm",
            config.model,
            config.backend,
            config.rate_limit_rpm
        );
        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn analyze_inner(
        &self,
        transcript: &str,
        call_id: &str,
        duration_seconds: i64,
    ) -> AnalysisOutcome {
        let prepared = prompt::build_analysis_prompt(
            transcript,
            call_id,
            duration_seconds,
            self.config.max_transcript_chars,
        );

        let mut outcome = AnalysisOutcome {
            call_id: call_id.to_string(),
            status: AnalysisStatus::Failed,
            response: AnalysisResponse::default(),
            api_error: None,
            raw_excerpt: None,
            truncated: prepared.truncated,
            usage: None,
            cost: 0.0,
        };

        let max_retries = self.config.max_retries;
        for attempt in 0..=max_retries {
            self.limiter.pace().await;
            log::info!(
                "Sending analysis request for call {} (attempt {}/{})",
                call_id,
                attempt + 1,
                max_retries + 1
            );

            match self.request_once(&prepared.prompt).await {
                Ok((content, usage)) => {
                    if let Some(u) = &usage {
                        log::info!(
                            "Token usage for {}: {} prompt + {} completion = {} total",
                            call_id,
                            u.prompt_tokens,
                            u.completion_tokens,
                            u.total_tokens
                        );
                        outcome.cost = estimate_cost(&self.config.model, u);
                    }
                    outcome.usage = usage;

                    match parse_response(&content) {
                        Ok(response) => {
                            outcome.status = AnalysisStatus::Completed;
                            outcome.response = response;
                            return outcome;
                        }
                        Err(e) => {
                            if attempt < max_retries {
                                log::warn!(
                                    "Invalid JSON from service for {}, retrying: {}",
                                    call_id,
                                    e
                                );
                                tokio::time::sleep(MALFORMED_RETRY_DELAY).await;
                                continue;
                            }
                            // Exhausted on a delivered-but-unparsable
                            // response: degrade to a partial result with a
                            // raw excerpt for manual review.
                            outcome.status = AnalysisStatus::Partial;
                            outcome.api_error = Some(e.to_string());
                            outcome.raw_excerpt = Some(excerpt(&content));
                            return outcome;
                        }
                    }
                }
                Err(e) => {
                    if e.is_auth() && !self.config.retry_auth_errors {
                        log::error!("Authentication failure for {}, not retrying: {}", call_id, e);
                        outcome.api_error = Some(e.to_string());
                        return outcome;
                    }
                    if attempt < max_retries {
                        let backoff = Duration::from_secs((1 << attempt.min(16)) + 1);
                        log::warn!(
                            "Service error for {} ({}), retrying in {}s ({}/{})",
                            call_id,
                            e,
                            backoff.as_secs(),
                            attempt + 1,
                            max_retries
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    log::error!("Failed after {} attempts for {}: {}", max_retries + 1, call_id, e);
                    outcome.api_error = Some(e.to_string());
                    return outcome;
                }
            }
        }

        outcome.api_error = Some(format!("failed after {} attempts", max_retries + 1));
        outcome
    }

    async fn request_once(
        &self,
        prompt_text: &str,
    ) -> Result<(String, Option<TokenUsage>), AnalysisError> {
        let response = match self.config.backend {
            AnalysisBackend::ChatCompletions => {
                let url = format!("{}/chat/completions", self.config.api_base);
                let request = ChatRequest {
                    model: &self.config.model,
                    messages: vec![
                        ChatMessage {
                            role: "system",
                            content: prompt::SYSTEM_PROMPT,
                        },
                        ChatMessage {
                            role: "user",
                            content: prompt_text,
                        },
                    ],
                    temperature: 0.1,
                    max_tokens: 4000,
                    response_format: ResponseFormat {
                        format_type: "json_object",
                    },
                };
                self.http
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(&request)
                    .send()
                    .await?
            }
            AnalysisBackend::LegacyCompletions => {
                let url = format!("{}/completions", self.config.api_base);
                let request = LegacyRequest {
                    model: &self.config.model,
                    prompt: format!("{}\n\n{}", prompt::SYSTEM_PROMPT, prompt_text),
                    temperature: 0.1,
                    max_tokens: 4000,
                };
                self.http
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(&request)
                    .send()
                    .await?
            }
        };

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AnalysisError::RateLimited);
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(AnalysisError::Auth(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Http(status.as_u16(), excerpt(&body)));
        }

        match self.config.backend {
            AnalysisBackend::ChatCompletions => {
                let parsed: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| AnalysisError::Json(e.to_string()))?;
                let content = parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or(AnalysisError::NoJsonObject)?;
                Ok((content, parsed.usage))
            }
            AnalysisBackend::LegacyCompletions => {
                let parsed: LegacyResponse = response
                    .json()
                    .await
                    .map_err(|e| AnalysisError::Json(e.to_string()))?;
                let content = parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.text)
                    .ok_or(AnalysisError::NoJsonObject)?;
                Ok((content, parsed.usage))
            }
        }
    }
}

impl Analyzer for AnalysisClient {
    fn analyze(
        &self,
        transcript: &str,
        call_id: &str,
        duration_seconds: i64,
    ) -> impl Future<Output = AnalysisOutcome> + Send {
        self.analyze_inner(transcript, call_id, duration_seconds)
    }
}

/// Locate the outermost JSON object in free-form model output and parse it
/// against the response contract.
pub fn parse_response(content: &str) -> Result<AnalysisResponse, AnalysisError> {
    let start = content.find('{').ok_or(AnalysisError::NoJsonObject)?;
    let end = content
        .rfind('}')
        .filter(|e| *e > start)
        .ok_or(AnalysisError::NoJsonObject)?;

    let value: serde_json::Value = serde_json::from_str(&content[start..=end])
        .map_err(|e| AnalysisError::Json(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| AnalysisError::Json("service returned non-object JSON".to_string()))?;

    // The model occasionally returns a valid but unrelated object; require
    // at least one contract key before accepting it.
    let has_contract_key = ["issue_classification", "technical_context", "issue_summary"]
        .iter()
        .any(|key| object.contains_key(*key));
    if !has_contract_key {
        return Err(AnalysisError::Json(
            "response missing critical fields".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| AnalysisError::Json(e.to_string()))
}

/// Estimated cost in USD for one call, by per-model token prices.
pub fn estimate_cost(model: &str, usage: &TokenUsage) -> f64 {
    let (input_rate, output_rate) = MODEL_COSTS
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or(DEFAULT_COST);

    usage.prompt_tokens as f64 * input_rate + usage.completion_tokens as f64 * output_rate
}

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(RAW_EXCERPT_CHARS).collect();
    if text.chars().count() > RAW_EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct LegacyRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct LegacyResponse {
    choices: Vec<LegacyChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct LegacyChoice {
    text: String,
}
