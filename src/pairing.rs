//! Pairing helper — write server pairing details into a `.env` file.
//!
//! The companion app's pairing notification carries `ip`, `port`, `playerId`
//! and `playerToken`. Values may arrive as JSON strings or numbers. Applying
//! a pairing upserts the four `RUST_*` variables, leaving comments, blank
//! lines and unrelated keys where they were.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::config::{ENV_ADDRESS, ENV_PLAYER_ID, ENV_PLAYER_TOKEN, ENV_PORT};

#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    #[error("argument is neither a file nor valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("pairing JSON is missing `{0}`")]
    Missing(&'static str),
    #[error("pairing field `{field}` has invalid value {value:?}")]
    Invalid { field: &'static str, value: String },
    #[error("env file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Server address and player credentials from one pairing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub ip: String,
    pub port: u16,
    pub player_id: u64,
    pub player_token: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPairing {
    ip: Option<Value>,
    port: Option<Value>,
    player_id: Option<Value>,
    player_token: Option<Value>,
}

impl Pairing {
    /// Parse an inline JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`PairingError`] for malformed JSON or missing/invalid fields.
    pub fn from_json(text: &str) -> Result<Self, PairingError> {
        let raw: RawPairing = serde_json::from_str(text)?;

        let ip = scalar(raw.ip.as_ref()).ok_or(PairingError::Missing("ip"))?;
        Ok(Self {
            ip,
            port: parse_field(raw.port.as_ref(), "port")?,
            player_id: parse_field(raw.player_id.as_ref(), "playerId")?,
            player_token: parse_field(raw.player_token.as_ref(), "playerToken")?,
        })
    }

    /// Load from a file path if `arg` names an existing file, otherwise parse
    /// `arg` itself as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PairingError`] on read failure or invalid content.
    pub fn load(arg: &str) -> Result<Self, PairingError> {
        let path = Path::new(arg);
        if path.is_file() {
            return Self::from_json(&std::fs::read_to_string(path)?);
        }
        Self::from_json(arg)
    }

    #[must_use]
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENV_ADDRESS, self.ip.clone()),
            (ENV_PORT, self.port.to_string()),
            (ENV_PLAYER_ID, self.player_id.to_string()),
            (ENV_PLAYER_TOKEN, self.player_token.to_string()),
        ]
    }

    /// Upsert this pairing into the env file at `path`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`PairingError::Io`] if the file cannot be read or written.
    pub fn apply_to_env_file(&self, path: &Path) -> Result<(), PairingError> {
        let existing = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(error) => return Err(error.into()),
        };
        std::fs::write(path, upsert_env(&existing, &self.env_pairs()))?;
        Ok(())
    }
}

/// Replace `KEY=...` lines for every key in `pairs`, appending keys that were
/// not present after a blank separator line.
#[must_use]
pub fn upsert_env(existing: &str, pairs: &[(&str, String)]) -> String {
    let mut written = vec![false; pairs.len()];
    let mut out: Vec<String> = Vec::new();

    for line in existing.lines() {
        let index = env_key(line).and_then(|key| pairs.iter().position(|(name, _)| *name == key));
        match index {
            Some(index) => {
                let (name, value) = &pairs[index];
                out.push(format!("{name}={value}"));
                written[index] = true;
            }
            None => out.push(line.to_owned()),
        }
    }

    let missing: Vec<&(&str, String)> = pairs
        .iter()
        .zip(&written)
        .filter(|(_, written)| !**written)
        .map(|(pair, _)| pair)
        .collect();
    if !missing.is_empty() && out.last().is_some_and(|line| !line.trim().is_empty()) {
        out.push(String::new());
    }
    for (name, value) in missing {
        out.push(format!("{name}={value}"));
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn env_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    trimmed.split_once('=').map(|(key, _)| key.trim())
}

// Strings and numbers are both accepted; anything else counts as missing.
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_field<T: std::str::FromStr>(value: Option<&Value>, field: &'static str) -> Result<T, PairingError> {
    let raw = scalar(value).ok_or(PairingError::Missing(field))?;
    raw.parse::<T>().map_err(|_| PairingError::Invalid { field, value: raw })
}

#[cfg(test)]
#[path = "pairing_test.rs"]
mod tests;
