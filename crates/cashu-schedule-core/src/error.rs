//! Error types for the core crate.

use std::fmt;

use thiserror::Error;

/// Core errors that can occur while handling keys and events.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("invalid bech32 identifier: {0}")]
    InvalidBech32(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("event id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: String, actual: String },

    #[error("no signing key available")]
    MissingSigningKey,

    #[error("signing key does not match event author")]
    KeyMismatch,

    #[error("cryptographic randomness unavailable: {0}")]
    CryptoUnavailable(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Which side of a scheduling request a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySide {
    Sender,
    Recipient,
}

impl fmt::Display for KeySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySide::Sender => f.write_str("sender"),
            KeySide::Recipient => f.write_str("recipient"),
        }
    }
}

/// Policy errors for a scheduling request.
///
/// Variants are listed in the order the validator checks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sender identity and recipient key are both required")]
    MissingIdentity,

    #[error("recipient must differ from the sender identity")]
    SelfDeliveryRejected,

    #[error("malformed {side} key: {reason}")]
    MalformedKey { side: KeySide, reason: String },

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid delay: {0} minutes is outside [1, 525600]")]
    InvalidDelay(i64),
}
