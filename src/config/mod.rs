//! Configuration module for the portal service.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! Whether a value is *required* is decided by the client that needs it, so a
//! missing key disables one feature instead of the whole service.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::AppError;

/// Which AI surface the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiBackendKind {
    /// Intermediary HTTP microservice (`/tutor/...`, `/analysis/...`)
    Service,
    /// OpenAI-compatible chat completions API
    Direct,
}

impl FromStr for AiBackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(AiBackendKind::Service),
            "direct" => Ok(AiBackendKind::Direct),
            other => Err(AppError::Config(format!(
                "SYNCSENTA_AI_BACKEND must be 'service' or 'direct', got '{}'",
                other
            ))),
        }
    }
}

/// Settings for the AI gateway.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub backend: AiBackendKind,
    /// Base URL of the intermediary microservice
    pub service_url: Option<String>,
    /// API key for the direct model API
    pub api_key: Option<String>,
    /// Base URL of the direct model API
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound for any single gateway request
    pub timeout: Duration,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Hosted identity provider base URL
    pub auth_url: Option<String>,
    /// Public (anon) key for the identity provider
    pub auth_anon_key: Option<String>,
    pub ai: AiConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("SYNCSENTA_DB_PATH")
            .unwrap_or_else(|_| "./data/portal.sqlite".to_string())
            .into();

        let bind_addr = parse_var("SYNCSENTA_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("SYNCSENTA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let auth_url = non_empty_var("SYNCSENTA_AUTH_URL");
        let auth_anon_key = non_empty_var("SYNCSENTA_AUTH_ANON_KEY");

        let ai = AiConfig {
            backend: parse_var("SYNCSENTA_AI_BACKEND", "service")?,
            service_url: Some(
                env::var("SYNCSENTA_AI_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:8081/api".to_string()),
            )
            .filter(|s| !s.trim().is_empty()),
            api_key: non_empty_var("SYNCSENTA_AI_API_KEY"),
            base_url: env::var("SYNCSENTA_AI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("SYNCSENTA_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_tokens: parse_var("SYNCSENTA_AI_MAX_TOKENS", "500")?,
            temperature: parse_var("SYNCSENTA_AI_TEMPERATURE", "0.7")?,
            timeout: Duration::from_secs(parse_var("SYNCSENTA_AI_TIMEOUT_SECS", "30")?),
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            auth_url,
            auth_anon_key,
            ai,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, AppError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| AppError::Config(format!("Invalid {} value: '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 13] = [
        "SYNCSENTA_DB_PATH",
        "SYNCSENTA_BIND_ADDR",
        "SYNCSENTA_LOG_LEVEL",
        "SYNCSENTA_AUTH_URL",
        "SYNCSENTA_AUTH_ANON_KEY",
        "SYNCSENTA_AI_BACKEND",
        "SYNCSENTA_AI_SERVICE_URL",
        "SYNCSENTA_AI_API_KEY",
        "SYNCSENTA_AI_BASE_URL",
        "SYNCSENTA_AI_MODEL",
        "SYNCSENTA_AI_MAX_TOKENS",
        "SYNCSENTA_AI_TEMPERATURE",
        "SYNCSENTA_AI_TIMEOUT_SECS",
    ];

    // Both cases share process env, so they run in one test.
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/portal.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(config.auth_url.is_none());
        assert_eq!(config.ai.backend, AiBackendKind::Service);
        assert_eq!(
            config.ai.service_url.as_deref(),
            Some("http://localhost:8081/api")
        );
        assert_eq!(config.ai.timeout, Duration::from_secs(30));

        env::set_var("SYNCSENTA_AI_BACKEND", "carrier-pigeon");
        let err = Config::from_env().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");

        env::set_var("SYNCSENTA_AI_BACKEND", "Direct");
        env::set_var("SYNCSENTA_AI_TIMEOUT_SECS", "soon");
        let err = Config::from_env().unwrap_err();
        assert!(err.message().contains("SYNCSENTA_AI_TIMEOUT_SECS"));

        for var in VARS {
            env::remove_var(var);
        }
    }
}
