//! Error types for envelope construction and opening.

use cashu_schedule_core::CoreError;
use thiserror::Error;

/// Errors that can occur while sealing or opening envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The entropy source failed. Fatal for the call.
    #[error("cryptographic randomness unavailable: {0}")]
    CryptoUnavailable(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Authentication, padding or key mismatch on open.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// The payload is not a well-formed ciphertext.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The payload names a cipher version this crate does not speak.
    #[error("unsupported payload version: {0}")]
    UnsupportedVersion(u8),

    /// Plaintext outside the cipher's length range.
    #[error("plaintext length {0} is outside [1, 65535]")]
    InvalidPlaintextLength(usize),

    /// Unknown cipher name in configuration.
    #[error("unknown encryption format: {0}")]
    UnknownFormat(String),

    /// The event is not a schedule instruction this scheduler can open.
    #[error("not an instruction: {0}")]
    NotAnInstruction(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for EnvelopeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CryptoUnavailable(reason) => EnvelopeError::CryptoUnavailable(reason),
            other => EnvelopeError::Core(other),
        }
    }
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(err: serde_json::Error) -> Self {
        EnvelopeError::SerializationError(err.to_string())
    }
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
