//! Relay endpoint addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Relays the instruction is published to when none are configured.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://relay.primal.net",
    "wss://nos.lol",
    "wss://relay.nostr.band",
    "wss://nostr.wine",
    "wss://purplepag.es",
    "wss://relay.snort.social",
];

/// A `ws://` or `wss://` URL with a host. Trailing slashes are dropped so
/// that equal endpoints compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelayUrl(String);

impl RelayUrl {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let rest = input
            .strip_prefix("wss://")
            .or_else(|| input.strip_prefix("ws://"))
            .ok_or_else(|| RelayError::InvalidUrl(format!("{input}: expected ws:// or wss://")))?;

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || host.starts_with(':') || host.chars().any(char::is_whitespace) {
            return Err(RelayError::InvalidUrl(format!("{input}: missing host")));
        }

        Ok(Self(input.trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_secure(&self) -> bool {
        self.0.starts_with("wss://")
    }
}

/// The built-in relay list.
pub fn default_relays() -> Vec<RelayUrl> {
    DEFAULT_RELAYS
        .iter()
        .map(|url| RelayUrl(url.to_string()))
        .collect()
}

impl fmt::Display for RelayUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RelayUrl {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RelayUrl {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RelayUrl> for String {
    fn from(url: RelayUrl) -> Self {
        url.0
    }
}

impl AsRef<str> for RelayUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
