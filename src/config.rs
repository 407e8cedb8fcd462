//! Startup configuration read from the environment.

use crate::error::ConfigError;

pub const BACKEND_URL_VAR: &str = "FEEDBACK_BACKEND_URL";
pub const API_KEY_VAR: &str = "FEEDBACK_API_KEY";
pub const MAX_CONNECTIONS_VAR: &str = "FEEDBACK_MAX_CONNECTIONS";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Direct connection to the hosted Postgres instance.
    Postgres,
    /// The hosted REST query API in front of the same tables.
    Rest,
}

#[derive(Clone)]
pub struct Config {
    pub backend_url: String,
    pub api_key: String,
    pub backend: BackendKind,
    pub max_connections: u32,
}

// The api key stays out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("backend_url", &self.backend_url)
            .field("api_key", &"<redacted>")
            .field("backend", &self.backend)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let backend_url = required(BACKEND_URL_VAR)?;
        let api_key = required(API_KEY_VAR)?;
        let backend = backend_kind(&backend_url)?;

        let max_connections = match lookup(MAX_CONNECTIONS_VAR) {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::Invalid {
                    key: MAX_CONNECTIONS_VAR,
                    value: raw,
                })?,
        };

        Ok(Self {
            backend_url,
            api_key,
            backend,
            max_connections,
        })
    }
}

fn backend_kind(url: &str) -> Result<BackendKind, ConfigError> {
    let scheme = url
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .ok_or_else(|| ConfigError::UnsupportedScheme(BACKEND_URL_VAR.to_string()))?;

    match scheme.as_str() {
        "postgres" | "postgresql" => Ok(BackendKind::Postgres),
        "http" | "https" => Ok(BackendKind::Rest),
        _ => Err(ConfigError::UnsupportedScheme(BACKEND_URL_VAR.to_string())),
    }
}
