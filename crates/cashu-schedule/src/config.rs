//! Scheduler configuration.
//!
//! Loaded from TOML. Every field has a default except the scheduler
//! service key, which scheduling needs but key generation and inspection
//! do not.
//!
//! ```toml
//! scheduler_pubkey = "npub1..."
//! relays = ["wss://relay.damus.io", "wss://nos.lol"]
//! label = "Scheduled delivery"
//! cipher = "nip44"
//!
//! [publish]
//! timeout_secs = 10
//! ack_timeout_secs = 8
//!
//! [rate_limit]
//! max_attempts = 5
//! window_secs = 600
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cashu_schedule_core::PublicKey;
use cashu_schedule_envelope::{EncryptionFormat, DEFAULT_LABEL};
use cashu_schedule_relay::{RelayUrl, DEFAULT_RELAYS};

/// Errors loading or checking a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid relay url: {0}")]
    InvalidRelay(String),

    #[error("invalid scheduler key: {0}")]
    InvalidSchedulerKey(String),

    #[error("scheduler_pubkey is not set")]
    MissingSchedulerKey,

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Public key of the scheduler service, hex or `npub1…`.
    pub scheduler_pubkey: Option<String>,
    /// Relays the instruction is published to.
    pub relays: Vec<String>,
    /// Label carried in the `name` tag.
    pub label: String,
    /// Cipher for both envelope layers.
    pub cipher: EncryptionFormat,
    pub publish: PublishConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_pubkey: None,
            relays: DEFAULT_RELAYS.iter().map(|url| url.to_string()).collect(),
            label: DEFAULT_LABEL.to_string(),
            cipher: EncryptionFormat::default(),
            publish: PublishConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Overall fan-out timeout.
    pub timeout_secs: u64,
    /// Per-relay acknowledgement timeout.
    pub ack_timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            ack_timeout_secs: 8,
        }
    }
}

impl PublishConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Attempts admitted per window.
    pub max_attempts: usize,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 600,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl SchedulerConfig {
    /// Parse from a TOML string. Missing fields take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML file, then validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check relays, the scheduler key if present, and limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.relay_urls()?;
        if self.scheduler_pubkey.is_some() {
            self.scheduler_key()?;
        }
        if self.publish.timeout_secs == 0 {
            return Err(ConfigError::ZeroLimit("publish.timeout_secs"));
        }
        if self.publish.ack_timeout_secs == 0 {
            return Err(ConfigError::ZeroLimit("publish.ack_timeout_secs"));
        }
        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::ZeroLimit("rate_limit.max_attempts"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::ZeroLimit("rate_limit.window_secs"));
        }
        Ok(())
    }

    /// Parsed relay list.
    pub fn relay_urls(&self) -> Result<Vec<RelayUrl>, ConfigError> {
        self.relays
            .iter()
            .map(|url| RelayUrl::parse(url).map_err(|e| ConfigError::InvalidRelay(e.to_string())))
            .collect()
    }

    /// The scheduler service key. Required for scheduling.
    pub fn scheduler_key(&self) -> Result<PublicKey, ConfigError> {
        let key = self
            .scheduler_pubkey
            .as_deref()
            .ok_or(ConfigError::MissingSchedulerKey)?;
        PublicKey::parse(key).map_err(|e| ConfigError::InvalidSchedulerKey(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCHEDULER_HEX: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::from_toml_str("").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.relay_urls().unwrap().len(), 7);
        assert_eq!(config.cipher, EncryptionFormat::Nip44V2);
        assert_eq!(config.publish.timeout(), Duration::from_secs(10));
        assert_eq!(config.rate_limit.max_attempts, 5);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(600));
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.scheduler_key(),
            Err(ConfigError::MissingSchedulerKey)
        ));
    }

    #[test]
    fn test_full_file() {
        let toml = format!(
            r#"
scheduler_pubkey = "{SCHEDULER_HEX}"
relays = ["wss://nos.lol", "ws://127.0.0.1:7777"]
label = "Birthday"
cipher = "nip04"

[publish]
timeout_secs = 3

[rate_limit]
max_attempts = 2
"#
        );
        let config = SchedulerConfig::from_toml_str(&toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.scheduler_key().unwrap().to_hex(), SCHEDULER_HEX);
        assert_eq!(config.relay_urls().unwrap().len(), 2);
        assert_eq!(config.label, "Birthday");
        assert_eq!(config.cipher, EncryptionFormat::Nip04);
        assert_eq!(config.publish.timeout_secs, 3);
        assert_eq!(config.publish.ack_timeout_secs, 8);
        assert_eq!(config.rate_limit.max_attempts, 2);
        assert_eq!(config.rate_limit.window_secs, 600);
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = SchedulerConfig::default();
        config.relays.push("https://not-a-relay.example".into());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRelay(_))));

        let mut config = SchedulerConfig::default();
        config.scheduler_pubkey = Some("not-a-key".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSchedulerKey(_))
        ));

        let mut config = SchedulerConfig::default();
        config.rate_limit.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLimit(_))));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SchedulerConfig::from_toml_str("cipher = \"rot13\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SchedulerConfig::from_toml_str("relays = 7"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scheduler_pubkey = \"{SCHEDULER_HEX}\"").unwrap();
        writeln!(file, "label = \"From file\"").unwrap();

        let config = SchedulerConfig::load(file.path()).unwrap();
        assert_eq!(config.label, "From file");
        assert!(config.scheduler_key().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SchedulerConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
