//! Runtime configuration read from the environment (and `.env` via dotenv).

use crate::error::{ArgoError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gemini: GeminiConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual parts.
    pub url: Option<String>,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub query_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// SQL and explanations come from the hosted model.
    Model,
    /// Substring rules and canned templates, no model needed.
    Keyword,
}

impl FromStr for ChatMode {
    type Err = ArgoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "model" | "gemini" | "llm" => Ok(ChatMode::Model),
            "keyword" | "simple" => Ok(ChatMode::Keyword),
            other => Err(ArgoError::Config(format!(
                "CHAT_MODE must be 'model' or 'keyword', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub mode: ChatMode,
    /// Rows returned in the `data` field of a chat response.
    pub max_response_rows: usize,
    /// Rows embedded in the explanation prompt.
    pub prompt_sample_rows: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: ChatMode::Keyword,
            max_response_rows: 50,
            prompt_sample_rows: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

impl GeminiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let gemini = GeminiConfig {
            api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            model: get("GEMINI_MODEL_ID", "gemini-2.5-flash"),
            base_url: get(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            timeout: Duration::from_secs(parse_var(&lookup, "GEMINI_TIMEOUT_SECS", 20)?),
        };

        let mode = match lookup("CHAT_MODE") {
            Some(raw) => raw.parse()?,
            None if gemini.is_configured() => ChatMode::Model,
            None => ChatMode::Keyword,
        };

        Ok(Self {
            server: ServerConfig {
                host: get("HOST", "0.0.0.0"),
                port: parse_var(&lookup, "PORT", 5002)?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL"),
                user: get("DB_USER", "postgres"),
                password: get("DB_PASS", ""),
                host: get("DB_HOST", "localhost"),
                port: parse_var(&lookup, "DB_PORT", 5432)?,
                name: get("DB_NAME", "postgres"),
                max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", 10)?,
                acquire_timeout: Duration::from_secs(30),
                query_timeout: Duration::from_secs(parse_var(&lookup, "DB_QUERY_TIMEOUT_SECS", 30)?),
            },
            gemini,
            chat: ChatConfig {
                mode,
                ..ChatConfig::default()
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ArgoError::Config(format!("{} has an invalid value: '{}'", key, raw))),
        None => Ok(default),
    }
}
