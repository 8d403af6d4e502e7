use std::time::Duration;
use thiserror::Error;

/// Errors raised by the persistence layer.
///
/// Store errors are the only failures the batch orchestrator treats as
/// fatal for a batch: a failed merge stops the current batch, but the run
/// continues with the next one.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("timed out after {0:?} waiting for a database connection")]
    PoolTimeout(Duration),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures from the remote analysis service.
///
/// These never escape `AnalysisClient::analyze` — the final attempt converts
/// them into an `api_error` field on the returned result so the orchestrator
/// can always move on to the next item.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by the analysis service")]
    RateLimited,

    #[error("authentication rejected (status {0})")]
    Auth(u16),

    #[error("service returned status {0}: {1}")]
    Http(u16, String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("JSON parsing error: {0}")]
    Json(String),
}

impl AnalysisError {
    /// Timeouts and explicit rate-limit signals get exponential backoff;
    /// everything else is retried on the same budget unless it is an
    /// authentication failure and fail-fast is configured.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::NoJsonObject | Self::Json(_))
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AnalysisError::Timeout
        } else {
            AnalysisError::Transport(e.to_string())
        }
    }
}
