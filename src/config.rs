//! Runtime configuration.
//!
//! Everything is resolved once at startup from environment variables with
//! CLI overrides layered on top; the rest of the crate takes plain values
//! and never touches the environment.

use crate::analysis::AnalysisBackend;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RATE_LIMIT_RPM: u32 = 20;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 8000;
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub transcriptions_csv: PathBuf,
    pub analysis_csv: PathBuf,
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub backend: AnalysisBackend,
    pub batch_size: usize,
    pub max_retries: u32,
    pub rate_limit_rpm: u32,
    pub request_timeout: Duration,
    pub max_transcript_chars: usize,
    /// Whether authentication failures consume the retry budget. Off by
    /// default: a rejected key will not become valid by waiting.
    pub retry_auth_errors: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            transcriptions_csv: PathBuf::from("call_transcriptions.csv"),
            analysis_csv: PathBuf::from("call_analysis_results.csv"),
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            backend: AnalysisBackend::ChatCompletions,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_transcript_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
            retry_auth_errors: false,
        }
    }
}

impl AppConfig {
    /// Build a configuration from environment variables, starting from the
    /// defaults. CLI flags are applied afterwards by the binary.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CALLSCOPE_DB_PATH") {
            if !path.is_empty() {
                config.db_path = PathBuf::from(path);
            }
        }
        if let Ok(key) = std::env::var("CALLSCOPE_API_KEY") {
            config.api_key = key;
        }
        if let Ok(base) = std::env::var("CALLSCOPE_API_BASE") {
            if !base.is_empty() {
                config.api_base = base;
            }
        }
        if let Ok(model) = std::env::var("CALLSCOPE_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        if let Some(size) = env_parse::<usize>("CALLSCOPE_BATCH_SIZE") {
            config.batch_size = size.max(1);
        }
        if let Some(retries) = env_parse::<u32>("CALLSCOPE_MAX_RETRIES") {
            config.max_retries = retries;
        }
        if let Some(rpm) = env_parse::<u32>("CALLSCOPE_RATE_LIMIT_RPM") {
            config.rate_limit_rpm = rpm.max(1);
        }
        if let Ok(backend) = std::env::var("CALLSCOPE_API_BACKEND") {
            match backend.parse() {
                Ok(b) => config.backend = b,
                Err(_) => log::warn!("Unknown CALLSCOPE_API_BACKEND '{}', using default", backend),
            }
        }
        if let Ok(v) = std::env::var("CALLSCOPE_RETRY_AUTH_ERRORS") {
            config.retry_auth_errors = v == "1" || v.eq_ignore_ascii_case("true");
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring unparsable {}='{}'", name, raw);
            None
        }
    }
}

/// Default database location under the platform data directory, falling
/// back to the working directory when none is available.
fn default_db_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("callscope").join("callscope.db"),
        None => PathBuf::from("callscope.db"),
    }
}
