use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::analysis::normalizer::{min_budget, InputLimits, MIN_JD_SHARE};
use crate::analysis::orchestrator::{OrchestratorConfig, RetryPolicy};
use crate::session::SessionConfig;

/// Upper bound on backoff between generation attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or budgets are inconsistent.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,

    pub max_resume_chars: usize,
    pub max_jd_chars: usize,
    pub max_combined_chars: usize,
    pub max_chat_message_chars: usize,

    pub generation_timeout_secs: u64,
    pub generation_max_retries: u32,
    pub generation_backoff_ms: u64,

    pub chat_history_window: usize,
    pub session_history_cap: usize,
    pub session_ttl_secs: u64,
    pub session_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds and validates a config from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            gemini_api_key: require(&lookup, "GEMINI_API_KEY")?,
            port: optional(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),

            max_resume_chars: optional(&lookup, "MAX_RESUME_CHARS", 20_000)?,
            max_jd_chars: optional(&lookup, "MAX_JD_CHARS", 10_000)?,
            max_combined_chars: optional(&lookup, "MAX_COMBINED_CHARS", 28_000)?,
            max_chat_message_chars: optional(&lookup, "MAX_CHAT_MESSAGE_CHARS", 2_000)?,

            generation_timeout_secs: optional(&lookup, "GENERATION_TIMEOUT_SECS", 60)?,
            generation_max_retries: optional(&lookup, "GENERATION_MAX_RETRIES", 2)?,
            generation_backoff_ms: optional(&lookup, "GENERATION_BACKOFF_MS", 500)?,

            chat_history_window: optional(&lookup, "CHAT_HISTORY_WINDOW", 10)?,
            session_history_cap: optional(&lookup, "SESSION_HISTORY_CAP", 40)?,
            session_ttl_secs: optional(&lookup, "SESSION_TTL_SECS", 1_800)?,
            session_capacity: optional(&lookup, "SESSION_CAPACITY", 1_000)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let floor = min_budget();
        for (name, value) in [
            ("MAX_RESUME_CHARS", self.max_resume_chars),
            ("MAX_JD_CHARS", self.max_jd_chars),
            ("MAX_CHAT_MESSAGE_CHARS", self.max_chat_message_chars),
        ] {
            if value < floor {
                bail!("{name} must be at least {floor} characters, got {value}");
            }
        }
        if self.max_combined_chars < self.max_resume_chars + MIN_JD_SHARE {
            bail!(
                "MAX_COMBINED_CHARS ({}) must be at least MAX_RESUME_CHARS + {MIN_JD_SHARE} ({})",
                self.max_combined_chars,
                self.max_resume_chars + MIN_JD_SHARE
            );
        }
        for (name, value) in [
            ("CHAT_HISTORY_WINDOW", self.chat_history_window),
            ("SESSION_HISTORY_CAP", self.session_history_cap),
            ("SESSION_CAPACITY", self.session_capacity),
        ] {
            if value == 0 {
                bail!("{name} must be at least 1");
            }
        }
        if self.generation_timeout_secs == 0 {
            bail!("GENERATION_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            limits: InputLimits {
                max_resume_chars: self.max_resume_chars,
                max_jd_chars: self.max_jd_chars,
                max_combined_chars: self.max_combined_chars,
            },
            retry: RetryPolicy {
                max_retries: self.generation_max_retries,
                base_delay: Duration::from_millis(self.generation_backoff_ms),
                max_delay: MAX_BACKOFF,
            },
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            chat_window: self.chat_history_window,
            max_chat_message_chars: self.max_chat_message_chars,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ttl: Duration::from_secs(self.session_ttl_secs),
            capacity: self.session_capacity,
            history_cap: self.session_history_cap,
        }
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("GEMINI_API_KEY", "test-key")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");

        let orch = config.orchestrator_config();
        assert_eq!(orch.limits, InputLimits::default());
        assert_eq!(orch.retry, RetryPolicy::default());
        assert_eq!(orch.generation_timeout, Duration::from_secs(60));
        assert_eq!(orch.chat_window, 10);

        let sessions = config.session_config();
        assert_eq!(sessions.ttl, Duration::from_secs(1_800));
        assert_eq!(sessions.capacity, 1_000);
        assert_eq!(sessions.history_cap, 40);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(load(&[("GEMINI_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = load(&[
            ("GEMINI_API_KEY", "k"),
            ("PORT", "9000"),
            ("GENERATION_MAX_RETRIES", "4"),
            ("SESSION_TTL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.orchestrator_config().retry.max_retries, 4);
        assert_eq!(config.session_config().ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_non_numeric_value_is_an_error() {
        let err = load(&[("GEMINI_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_budget_below_marker_is_rejected() {
        let err = load(&[("GEMINI_API_KEY", "k"), ("MAX_JD_CHARS", "5")]).unwrap_err();
        assert!(err.to_string().contains("MAX_JD_CHARS"));
    }

    #[test]
    fn test_combined_budget_must_leave_room_for_job_description() {
        let err = load(&[
            ("GEMINI_API_KEY", "k"),
            ("MAX_RESUME_CHARS", "20000"),
            ("MAX_COMBINED_CHARS", "20100"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MAX_COMBINED_CHARS"));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(load(&[("GEMINI_API_KEY", "k"), ("SESSION_CAPACITY", "0")]).is_err());
        assert!(load(&[("GEMINI_API_KEY", "k"), ("CHAT_HISTORY_WINDOW", "0")]).is_err());
    }
}
