//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use evaluator_core::WELCOME_DELAY;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Optional on purpose: a missing key is reported when an evaluation is
    /// attempted, not at startup.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Upper bound for one evaluation request, so PROCESSING always ends.
    pub gemini_timeout: Duration,
    pub welcome_delay: Duration,
    /// How long a tab without connections keeps its transient store.
    pub tab_idle_timeout: Duration,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server and Storage Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var_or("DATABASE_URL", "sqlite://./data/evaluator.db?mode=rwc");
        if database_url.trim().is_empty() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Evaluation Backend ---
        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty());
        let gemini_model = var_or("GEMINI_MODEL", "gemini-2.5-flash");
        let gemini_base_url = var_or(
            "GEMINI_BASE_URL",
            "https://generativelanguage.googleapis.com/v1beta",
        )
        .trim_end_matches('/')
        .to_string();

        let gemini_timeout_str = var_or("GEMINI_TIMEOUT_SECS", "120");
        let gemini_timeout = match gemini_timeout_str.parse::<u64>() {
            Ok(0) => {
                return Err(ConfigError::InvalidValue(
                    "GEMINI_TIMEOUT_SECS".to_string(),
                    "must be greater than zero".to_string(),
                ))
            }
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                return Err(ConfigError::InvalidValue(
                    "GEMINI_TIMEOUT_SECS".to_string(),
                    e.to_string(),
                ))
            }
        };

        // --- Client Behaviour ---
        let welcome_delay_str = var_or("WELCOME_DELAY_MS", &WELCOME_DELAY.as_millis().to_string());
        let welcome_delay = welcome_delay_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue("WELCOME_DELAY_MS".to_string(), e.to_string()))?;

        let tab_idle_str = var_or("TAB_IDLE_TIMEOUT_SECS", "1800");
        let tab_idle_timeout = tab_idle_str
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidValue("TAB_IDLE_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            gemini_timeout,
            welcome_delay,
            tab_idle_timeout,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).expect("config");
        assert_eq!(config.bind_address, "0.0.0.0:3000".parse().expect("addr"));
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.welcome_delay, WELCOME_DELAY);
        assert_eq!(config.gemini_timeout, Duration::from_secs(120));
        assert_eq!(config.tab_idle_timeout, Duration::from_secs(1800));
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = load(&[("GEMINI_API_KEY", "  ")]).expect("config");
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn evaluation_timeout_is_configurable() {
        let config = load(&[("GEMINI_TIMEOUT_SECS", "30")]).expect("config");
        assert_eq!(config.gemini_timeout, Duration::from_secs(30));
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = load(&[("GEMINI_BASE_URL", "http://localhost:9000/v1beta/")]).expect("config");
        assert_eq!(config.gemini_base_url, "http://localhost:9000/v1beta");
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            load(&[("BIND_ADDRESS", "nowhere")]),
            Err(ConfigError::InvalidValue(var, _)) if var == "BIND_ADDRESS"
        ));
        assert!(matches!(
            load(&[("RUST_LOG", "chatty")]),
            Err(ConfigError::InvalidValue(var, _)) if var == "RUST_LOG"
        ));
        assert!(matches!(
            load(&[("GEMINI_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidValue(var, _)) if var == "GEMINI_TIMEOUT_SECS"
        ));
        assert!(matches!(
            load(&[("TAB_IDLE_TIMEOUT_SECS", "-1")]),
            Err(ConfigError::InvalidValue(var, _)) if var == "TAB_IDLE_TIMEOUT_SECS"
        ));
        assert!(matches!(
            load(&[("WELCOME_DELAY_MS", "soon")]),
            Err(ConfigError::InvalidValue(var, _)) if var == "WELCOME_DELAY_MS"
        ));
    }
}
