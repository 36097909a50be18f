//! Error types for scheduling sessions.

use std::time::Duration;

use cashu_schedule_core::{CoreError, KeySide, ValidationError};
use cashu_schedule_envelope::EnvelopeError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors a scheduling call can end with.
///
/// A publish that no relay accepted is not an error; see
/// [`PublishOutcome::DeliveryUncertain`](cashu_schedule_relay::PublishOutcome).
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// No sender identity or no recipient.
    #[error("sender identity and recipient key are both required")]
    MissingIdentity,

    /// The recipient is the sender.
    #[error("recipient must differ from the sender identity")]
    SelfDeliveryRejected,

    /// A key is not 64-hex or bech32 of the right kind.
    #[error("malformed {side} key: {reason}")]
    MalformedKey { side: KeySide, reason: String },

    /// The token fails the length or prefix rule.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The delay is outside the accepted range.
    #[error("invalid delay: {0} minutes is outside [1, 525600]")]
    InvalidDelay(i64),

    /// Too many attempts in the current window.
    #[error("rate limited: retry in {}s", retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },

    /// Entropy could not be drawn or a key could not be used for encryption.
    /// Fatal for the call.
    #[error("cryptography unavailable: {0}")]
    CryptoUnavailable(String),

    /// Signing was attempted without an identity.
    #[error("no signing key available")]
    MissingSigningKey,

    /// An identity could not be loaded.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Signing failed for another reason.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ScheduleError {
    /// Errors that repeat unless the input changes.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ScheduleError::MissingIdentity
                | ScheduleError::SelfDeliveryRejected
                | ScheduleError::MalformedKey { .. }
                | ScheduleError::InvalidToken(_)
                | ScheduleError::InvalidDelay(_)
                | ScheduleError::InvalidIdentity(_)
        )
    }
}

impl From<ValidationError> for ScheduleError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingIdentity => ScheduleError::MissingIdentity,
            ValidationError::SelfDeliveryRejected => ScheduleError::SelfDeliveryRejected,
            ValidationError::MalformedKey { side, reason } => {
                ScheduleError::MalformedKey { side, reason }
            }
            ValidationError::InvalidToken(reason) => ScheduleError::InvalidToken(reason),
            ValidationError::InvalidDelay(minutes) => ScheduleError::InvalidDelay(minutes),
        }
    }
}

impl From<CoreError> for ScheduleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingSigningKey => ScheduleError::MissingSigningKey,
            CoreError::CryptoUnavailable(reason) => ScheduleError::CryptoUnavailable(reason),
            CoreError::InvalidSecretKey
            | CoreError::InvalidPublicKey(_)
            | CoreError::InvalidBech32(_) => ScheduleError::InvalidIdentity(err.to_string()),
            other => ScheduleError::Signing(other.to_string()),
        }
    }
}

// Keys reaching the envelope step are already validated, so any failure
// there is reported as the crypto layer being unusable.
impl From<EnvelopeError> for ScheduleError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::CryptoUnavailable(reason) => ScheduleError::CryptoUnavailable(reason),
            other => ScheduleError::CryptoUnavailable(other.to_string()),
        }
    }
}

/// Result type for scheduling operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;
