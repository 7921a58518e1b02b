//! # Application Configuration
//!
//! This module manages application configuration loaded from environment variables.
//! All configuration is validated on startup to fail fast if misconfigured.
//!
//! ```rust,no_run
//! use lib_core::Config;
//!
//! let config = Config::from_env().expect("invalid environment");
//! config.validate().expect("invalid configuration");
//! ```

use lib_utils::envs::{get_env_or, get_env_parse_opt};
use std::fmt;
use std::str::FromStr;

/// Default OpenRouter chat completions endpoint.
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default completion model.
pub const DEFAULT_AI_MODEL: &str = "x-ai/grok-4-fast:free";

/// Which completion backend answers on behalf of the AI participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AiBackend {
    /// OpenAI-compatible HTTP endpoint (OpenRouter by default)
    OpenRouter,
    /// `genai` multi-provider client (requires the `genai` feature of lib-web)
    GenAi,
}

impl FromStr for AiBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" => Ok(AiBackend::OpenRouter),
            "genai" => Ok(AiBackend::GenAi),
            other => Err(format!("AI_BACKEND must be 'openrouter' or 'genai', got '{}'", other)),
        }
    }
}

impl fmt::Display for AiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiBackend::OpenRouter => write!(f, "openrouter"),
            AiBackend::GenAi => write!(f, "genai"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database connection URL
    pub database_url: String,

    /// Host the HTTP/websocket server binds to
    pub host: String,

    /// Port the HTTP/websocket server binds to
    pub port: u16,

    /// Directory holding `chat.html` and other static assets
    pub static_dir: String,

    /// Completion endpoint (OpenAI-compatible)
    pub openrouter_url: String,

    /// Bearer token for the completion endpoint
    ///
    /// When absent, requests go out without an `Authorization` header.
    pub openrouter_api_key: Option<String>,

    /// Model identifier sent with each completion request
    pub ai_model: String,

    /// Completion backend selection
    pub ai_backend: AiBackend,

    /// Timeout for one completion call, in seconds
    pub ai_timeout_secs: u64,

    /// Number of most recent messages delivered to a client on connect
    pub history_limit: i64,

    /// Optional cap on per-connection conversation memory (turns)
    ///
    /// `None` keeps every turn for the lifetime of the connection.
    pub memory_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/chat.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: "public".to_string(),
            openrouter_url: DEFAULT_OPENROUTER_URL.to_string(),
            openrouter_api_key: None,
            ai_model: DEFAULT_AI_MODEL.to_string(),
            ai_backend: AiBackend::OpenRouter,
            ai_timeout_secs: 60,
            history_limit: 20,
            memory_limit: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let database_url = get_env_or("DATABASE_URL", &defaults.database_url);
        let host = get_env_or("HOST", &defaults.host);
        let static_dir = get_env_or("STATIC_DIR", &defaults.static_dir);
        let openrouter_url = get_env_or("OPENROUTER_URL", &defaults.openrouter_url);
        let ai_model = get_env_or("AI_MODEL", &defaults.ai_model);

        let openrouter_api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let ai_backend = get_env_or("AI_BACKEND", &defaults.ai_backend.to_string()).parse()?;

        let port = get_env_parse_opt("PORT")
            .map_err(|e| format!("PORT must be a valid port number: {}", e))?
            .unwrap_or(defaults.port);

        let ai_timeout_secs = get_env_parse_opt("AI_TIMEOUT_SECS")
            .map_err(|e| format!("AI_TIMEOUT_SECS must be a valid number: {}", e))?
            .unwrap_or(defaults.ai_timeout_secs);

        let history_limit = get_env_parse_opt("HISTORY_LIMIT")
            .map_err(|e| format!("HISTORY_LIMIT must be a valid number: {}", e))?
            .unwrap_or(defaults.history_limit);

        let memory_limit = get_env_parse_opt("AI_MEMORY_LIMIT")
            .map_err(|e| format!("AI_MEMORY_LIMIT must be a valid number: {}", e))?;

        Ok(Self {
            database_url,
            host,
            port,
            static_dir,
            openrouter_url,
            openrouter_api_key,
            ai_model,
            ai_backend,
            ai_timeout_secs,
            history_limit,
            memory_limit,
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.trim().is_empty() {
            return Err("DATABASE_URL cannot be empty".to_string());
        }

        if self.openrouter_url.trim().is_empty() {
            return Err("OPENROUTER_URL cannot be empty".to_string());
        }

        if self.history_limit < 1 {
            return Err("HISTORY_LIMIT must be at least 1".to_string());
        }

        if let Some(limit) = self.memory_limit {
            if limit < 2 {
                return Err("AI_MEMORY_LIMIT must be at least 2 (one user/assistant exchange)".to_string());
            }
        }

        if self.ai_timeout_secs < 1 || self.ai_timeout_secs > 600 {
            return Err("AI_TIMEOUT_SECS must be between 1 and 600".to_string());
        }

        Ok(())
    }

    /// Socket address string the server listens on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_limit, 20);
        assert!(config.memory_limit.is_none());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_memory_limit_too_small() {
        let config = Config {
            memory_limit: Some(1),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_history_limit_must_be_positive() {
        let config = Config {
            history_limit: 0,
            ..Config::default()
        };
        assert_eq!(config.validate().unwrap_err(), "HISTORY_LIMIT must be at least 1");
    }

    #[test]
    fn test_timeout_bounds() {
        let config = Config {
            ai_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ai_backend_parse() {
        assert_eq!("OpenRouter".parse::<AiBackend>().unwrap(), AiBackend::OpenRouter);
        assert_eq!(" genai ".parse::<AiBackend>().unwrap(), AiBackend::GenAi);
        assert!("ollama".parse::<AiBackend>().is_err());
    }
}
