use std::path::PathBuf;
use tracing::Level;

/// How many numbered `GOOGLE_API_KEY_{i}` slots are probed at startup.
const NUMBERED_KEY_SLOTS: usize = 7;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("No Google API keys found in environment variables")]
    NoCredentials,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Ordered backend credentials, rotated under rate-limiting.
    pub credentials: Vec<String>,
    pub text_model: String,
    pub tts_model: String,
    pub uploads_dir: PathBuf,
    pub max_attempts: u32,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Credentials come from `GOOGLE_API_KEY_1` through `GOOGLE_API_KEY_7`,
    /// collected in slot order with gaps skipped; when none of those are
    /// set, a single `GOOGLE_API_KEY` is accepted instead.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let mut credentials = Vec::new();
        for i in 1..=NUMBERED_KEY_SLOTS {
            if let Ok(key) = std::env::var(format!("GOOGLE_API_KEY_{i}")) {
                if !key.is_empty() {
                    credentials.push(key);
                }
            }
        }
        if credentials.is_empty() {
            if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
                if !key.is_empty() {
                    credentials.push(key);
                }
            }
        }
        if credentials.is_empty() {
            return Err(ConfigError::NoCredentials);
        }

        let text_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string());
        let tts_model =
            std::env::var("TTS_MODEL").unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string());

        let uploads_dir = std::env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let max_attempts_str = std::env::var("MAX_ATTEMPTS").unwrap_or_else(|_| "3".to_string());
        let max_attempts = max_attempts_str.parse::<u32>().map_err(|_| {
            ConfigError::InvalidValue("MAX_ATTEMPTS".to_string(), max_attempts_str.clone())
        })?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            credentials,
            text_model,
            tts_model,
            uploads_dir,
            max_attempts,
            log_level,
        })
    }
}
