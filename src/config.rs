//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const ENV_ADDRESS: &str = "RUST_ADDRESS";
pub const ENV_PORT: &str = "RUST_PORT";
pub const ENV_PLAYER_ID: &str = "RUST_PLAYER_ID";
pub const ENV_PLAYER_TOKEN: &str = "RUST_PLAYER_TOKEN";
pub const ENV_USE_FACEPUNCH_PROXY: &str = "RUST_USE_FACEPUNCH_PROXY";
pub const ENV_TIMEOUT_MS: &str = "RUST_TIMEOUT_MS";
pub const ENV_RECONNECT_DELAY_MS: &str = "RUST_RECONNECT_DELAY_MS";

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Server address and player credentials. Fixed for the life of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server: String,
    pub port: u16,
    pub player_id: u64,
    pub player_token: i32,
    /// Route through the Facepunch companion relay instead of dialing directly.
    pub use_facepunch_proxy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub credentials: Credentials,
    /// Default deadline for connect attempts and requests.
    pub request_timeout: Duration,
    /// Delay before reconnecting after an unexpected disconnect.
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    /// Build a config with default timeouts.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }

    /// Build typed client config from environment variables.
    ///
    /// Required:
    /// - `RUST_ADDRESS`, `RUST_PORT`, `RUST_PLAYER_ID`, `RUST_PLAYER_TOKEN`
    ///
    /// Optional:
    /// - `RUST_USE_FACEPUNCH_PROXY`: `true` enables relay mode (default false)
    /// - `RUST_TIMEOUT_MS`: default 10000
    /// - `RUST_RECONNECT_DELAY_MS`: default 5000
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required var is missing or unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required var is missing or unparsable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = required(&lookup, ENV_ADDRESS)?;
        let port = parse_required(&lookup, ENV_PORT)?;
        let player_id = parse_required(&lookup, ENV_PLAYER_ID)?;
        let player_token = parse_required(&lookup, ENV_PLAYER_TOKEN)?;
        let use_facepunch_proxy = lookup(ENV_USE_FACEPUNCH_PROXY)
            .is_some_and(|raw| raw.trim().eq_ignore_ascii_case("true"));

        let request_timeout = Duration::from_millis(parse_optional(&lookup, ENV_TIMEOUT_MS, DEFAULT_TIMEOUT_MS)?);
        let reconnect_delay =
            Duration::from_millis(parse_optional(&lookup, ENV_RECONNECT_DELAY_MS, DEFAULT_RECONNECT_DELAY_MS)?);

        Ok(Self {
            credentials: Credentials { server, port, player_id, player_token, use_facepunch_proxy },
            request_timeout,
            reconnect_delay,
        })
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parse_required<F, T>(lookup: &F, var: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = required(lookup, var)?;
    raw.parse::<T>().map_err(|_| ConfigError::Invalid { var, value: raw })
}

fn parse_optional<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).map(|raw| raw.trim().to_owned()).filter(|raw| !raw.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
