//! Server configuration.
//!
//! Loaded from environment variables. TURN secrets and passwords are
//! redacted in Debug output.

use huddle_core::utils::DEFAULT_STUN_SERVERS;
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default lifetime of time-limited TURN credentials (one day).
pub const DEFAULT_TURN_CREDENTIAL_TTL_SECONDS: u64 = 86_400;

/// How TURN credentials are handed out.
#[derive(Clone)]
pub enum TurnCredentials {
    /// coturn REST scheme: HMAC-SHA1 over `"{expiry}:{user_id}"`.
    TimeLimited {
        secret: SecretString,
        ttl_seconds: u64,
    },
    /// Fixed username/password shared by every client.
    Static {
        username: String,
        password: SecretString,
    },
}

impl fmt::Debug for TurnCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnCredentials::TimeLimited { ttl_seconds, .. } => f
                .debug_struct("TimeLimited")
                .field("secret", &"[REDACTED]")
                .field("ttl_seconds", ttl_seconds)
                .finish(),
            TurnCredentials::Static { username, .. } => f
                .debug_struct("Static")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub host: String,
    pub credentials: TurnCredentials,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP/WebSocket listen address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// STUN URLs handed to clients before any TURN entry.
    pub stun_servers: Vec<String>,

    /// Relay configuration; `None` means STUN only.
    pub turn: Option<TurnConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            stun_servers: DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
            turn: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();

        let bind_address =
            non_empty("HUDDLE_BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let stun_servers = match non_empty("STUN_SERVERS") {
            Some(list) => {
                let urls: Vec<String> = list
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if let Some(bad) = urls.iter().find(|u| !u.starts_with("stun:")) {
                    return Err(ConfigError::InvalidValue(format!(
                        "STUN_SERVERS entry must start with 'stun:': {bad}"
                    )));
                }
                urls
            }
            None => DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
        };

        let turn = match non_empty("TURN_SERVER") {
            None => None,
            Some(host) => {
                let credentials = if let Some(secret) = non_empty("TURN_SECRET") {
                    let ttl_seconds = match vars.get("TURN_CREDENTIAL_TTL_SECONDS") {
                        Some(raw) => raw.parse::<u64>().ok().filter(|ttl| *ttl > 0).ok_or_else(
                            || {
                                ConfigError::InvalidValue(format!(
                                    "TURN_CREDENTIAL_TTL_SECONDS must be a positive integer, got '{raw}'"
                                ))
                            },
                        )?,
                        None => DEFAULT_TURN_CREDENTIAL_TTL_SECONDS,
                    };
                    TurnCredentials::TimeLimited {
                        secret: SecretString::from(secret),
                        ttl_seconds,
                    }
                } else {
                    let username = non_empty("TURN_USERNAME")
                        .ok_or_else(|| ConfigError::MissingEnvVar("TURN_USERNAME".to_string()))?;
                    let password = non_empty("TURN_PASSWORD")
                        .ok_or_else(|| ConfigError::MissingEnvVar("TURN_PASSWORD".to_string()))?;
                    TurnCredentials::Static {
                        username,
                        password: SecretString::from(password),
                    }
                };
                Some(TurnConfig { host, credentials })
            }
        };

        Ok(Config {
            bind_address,
            stun_servers,
            turn,
        })
    }
}
