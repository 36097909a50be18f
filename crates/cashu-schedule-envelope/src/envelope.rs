//! The envelope primitive shared by both layers.
//!
//! [`seal`] agrees a key between `secret` and `peer`, then encrypts with the
//! chosen [`EncryptionFormat`]. [`open`] is its inverse and detects the format
//! from the payload, so callers never need to remember which one was used.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use cashu_schedule_core::{Keys, PublicKey};

use crate::crypto::shared_secret;
use crate::error::{EnvelopeError, Result};
use crate::nip04;
use crate::nip44::{self, ConversationKey};

/// Format identifier for envelope payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncryptionFormat {
    /// NIP-44 v2: ChaCha20 + HMAC-SHA256 with padding.
    #[default]
    #[serde(rename = "nip44")]
    Nip44V2,

    /// NIP-04: AES-256-CBC, unauthenticated.
    #[serde(rename = "nip04")]
    Nip04,
}

impl EncryptionFormat {
    /// Guess the format of an existing payload.
    pub fn detect(payload: &str) -> Self {
        if nip04::is_nip04(payload) {
            EncryptionFormat::Nip04
        } else {
            EncryptionFormat::Nip44V2
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            EncryptionFormat::Nip44V2 => "nip44",
            EncryptionFormat::Nip04 => "nip04",
        }
    }
}

impl fmt::Display for EncryptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionFormat {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nip44" | "nip44v2" | "nip44-v2" => Ok(EncryptionFormat::Nip44V2),
            "nip04" => Ok(EncryptionFormat::Nip04),
            other => Err(EnvelopeError::UnknownFormat(other.to_string())),
        }
    }
}

/// Encrypt `plaintext` so that only the holder of `peer`'s secret can read it.
pub fn seal<R>(
    format: EncryptionFormat,
    secret: &Keys,
    peer: &PublicKey,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<String>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let shared = shared_secret(secret, peer)?;
    match format {
        EncryptionFormat::Nip44V2 => {
            let conversation = ConversationKey::from_shared(&shared);
            nip44::encrypt(&conversation, plaintext, rng)
        }
        EncryptionFormat::Nip04 => nip04::encrypt(&shared, plaintext, rng),
    }
}

/// Decrypt a payload produced by [`seal`] on the other side.
pub fn open(secret: &Keys, peer: &PublicKey, payload: &str) -> Result<Vec<u8>> {
    let shared = shared_secret(secret, peer)?;
    match EncryptionFormat::detect(payload) {
        EncryptionFormat::Nip44V2 => {
            let conversation = ConversationKey::from_shared(&shared);
            nip44::decrypt(&conversation, payload)
        }
        EncryptionFormat::Nip04 => nip04::decrypt(&shared, payload),
    }
}
