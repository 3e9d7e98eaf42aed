//! Configuration management for Pareto To Do.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `XAI_API_KEY` - Optional. Completion API key used when a request doesn't carry one.
//! - `TODO_LIST_ID` - Optional. To Do list id used when a request doesn't carry one.
//! - `XAI_BASE_URL` - Optional. Chat completions base URL. Defaults to `https://api.x.ai/v1`.
//! - `PARETO_MODEL` - Optional. Completion model. Defaults to `grok-4`.
//! - `PARETO_MAX_TOKENS` - Optional. Maximum output tokens. Defaults to `500`.
//! - `MS_AUTHORITY` - Optional. Identity platform authority for the device-code flow.
//! - `MS_CLIENT_ID` - Optional. Public client id for the device-code flow.
//! - `MS_SCOPE` - Optional. Scope requested for the token.
//! - `GRAPH_BASE_URL` - Optional. Microsoft Graph base URL.
//! - `TODO_TIME_ZONE` - Optional. Time zone label for due/reminder times.
//! - `HTTP_TIMEOUT_SECS` - Optional. Timeout for every outbound request. Defaults to `30`.

use std::time::Duration;
use thiserror::Error;

use crate::llm::{XaiClient, XAI_API_BASE_URL};
use crate::oauth::{DeviceCodeAuthenticator, DEFAULT_AUTHORITY, DEFAULT_CLIENT_ID, DEFAULT_SCOPE};
use crate::todo::{TaskSubmitter, DEFAULT_GRAPH_BASE_URL, DEFAULT_TIME_ZONE};

pub const DEFAULT_MODEL: &str = "grok-4";
pub const DEFAULT_MAX_TOKENS: u64 = 500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Completion service settings.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: XAI_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Identity provider settings for the device-code flow.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub authority: String,
    pub client_id: String,
    pub scope: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

/// Task API settings.
#[derive(Debug, Clone)]
pub struct TodoConfig {
    pub graph_base_url: String,
    pub time_zone: String,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Fallback completion API key
    pub xai_api_key: Option<String>,

    /// Fallback To Do list id
    pub todo_list_id: Option<String>,

    pub completion: CompletionConfig,

    pub identity: IdentityConfig,

    pub todo: TodoConfig,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable doesn't parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("PORT", 3000u16)?;

        let completion = CompletionConfig {
            base_url: env_or("XAI_BASE_URL", XAI_API_BASE_URL),
            model: env_or("PARETO_MODEL", DEFAULT_MODEL),
            max_tokens: parse_env("PARETO_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
        };

        let identity = IdentityConfig {
            authority: env_or("MS_AUTHORITY", DEFAULT_AUTHORITY),
            client_id: env_or("MS_CLIENT_ID", DEFAULT_CLIENT_ID),
            scope: env_or("MS_SCOPE", DEFAULT_SCOPE),
        };

        let todo = TodoConfig {
            graph_base_url: env_or("GRAPH_BASE_URL", DEFAULT_GRAPH_BASE_URL),
            time_zone: env_or("TODO_TIME_ZONE", DEFAULT_TIME_ZONE),
        };

        let http_timeout =
            Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?);

        Ok(Self {
            host,
            port,
            xai_api_key: non_empty_env("XAI_API_KEY"),
            todo_list_id: non_empty_env("TODO_LIST_ID"),
            completion,
            identity,
            todo,
            http_timeout,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            xai_api_key: None,
            todo_list_id: None,
            completion: CompletionConfig::default(),
            identity: IdentityConfig::default(),
            todo: TodoConfig::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Build the shared outbound HTTP client.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }

    /// Completion client for one run's API key.
    pub fn completion_client(&self, client: reqwest::Client, api_key: String) -> XaiClient {
        XaiClient::with_base_url(client, api_key, self.completion.base_url.clone())
    }

    pub fn authenticator(&self, client: reqwest::Client) -> DeviceCodeAuthenticator {
        DeviceCodeAuthenticator::new(
            client,
            &self.identity.authority,
            &self.identity.client_id,
            &self.identity.scope,
        )
    }

    pub fn submitter(&self, client: reqwest::Client) -> TaskSubmitter {
        TaskSubmitter::new(client, &self.todo.graph_base_url, &self.todo.time_zone)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}
