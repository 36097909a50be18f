//! Request validation.
//!
//! [`validate_request`] is the only way to obtain a [`ValidatedRequest`], and
//! the envelope builder accepts nothing else. Rules run in a fixed order and
//! the first failure wins.

use std::fmt;

use zeroize::Zeroize;

use crate::crypto::{Keys, PublicKey};
use crate::error::{KeySide, ValidationError};
use crate::nip19;

/// Minimum token length in characters.
pub const TOKEN_MIN_LEN: usize = 20;

/// Maximum token length in characters.
pub const TOKEN_MAX_LEN: usize = 2048;

/// Every token starts with this literal, followed by an alphanumeric.
pub const TOKEN_PREFIX: &str = "cashu";

/// Shortest delay: one minute.
pub const DELAY_MIN_MINUTES: i64 = 1;

/// Longest delay: one year.
pub const DELAY_MAX_MINUTES: i64 = 525_600;

/// An opaque bearer token. Never shown by `Debug`, erased on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken(<{} bytes>)", self.0.len())
    }
}

impl Drop for BearerToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A delivery delay in whole minutes, within the allowed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryDelay(u32);

impl DeliveryDelay {
    pub const fn minutes(&self) -> u32 {
        self.0
    }

    pub const fn as_secs(&self) -> u64 {
        self.0 as u64 * 60
    }
}

/// A scheduling request that passed every rule.
#[derive(Debug)]
pub struct ValidatedRequest<'a> {
    sender: &'a Keys,
    recipient: PublicKey,
    token: BearerToken,
    delay: DeliveryDelay,
}

impl<'a> ValidatedRequest<'a> {
    pub fn sender(&self) -> &'a Keys {
        self.sender
    }

    pub fn recipient(&self) -> PublicKey {
        self.recipient
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    pub fn delay(&self) -> DeliveryDelay {
        self.delay
    }
}

/// Check a scheduling request.
///
/// The recipient is a user-supplied identifier (64-hex or `npub1…`). The
/// token is trimmed of surrounding whitespace before it is checked.
pub fn validate_request<'a>(
    sender: Option<&'a Keys>,
    recipient: Option<&str>,
    token: &str,
    delay_minutes: i64,
) -> Result<ValidatedRequest<'a>, ValidationError> {
    let (sender, recipient_input) = match (sender, recipient) {
        (Some(s), Some(r)) if !r.trim().is_empty() => (s, r.trim()),
        _ => return Err(ValidationError::MissingIdentity),
    };

    let sender_pk = sender.public_key();
    let resolved = PublicKey::parse(recipient_input);

    let same = match &resolved {
        Ok(pk) => *pk == sender_pk,
        Err(_) => recipient_input.eq_ignore_ascii_case(&sender_pk.to_hex()),
    };
    if same {
        return Err(ValidationError::SelfDeliveryRejected);
    }

    check_key_shape(&sender_pk.to_hex(), KeySide::Sender)?;
    check_key_shape(recipient_input, KeySide::Recipient)?;
    let recipient = resolved.map_err(|e| ValidationError::MalformedKey {
        side: KeySide::Recipient,
        reason: e.to_string(),
    })?;

    let token = check_token(token)?;
    let delay = check_delay(delay_minutes)?;

    Ok(ValidatedRequest {
        sender,
        recipient,
        token,
        delay,
    })
}

fn check_key_shape(input: &str, side: KeySide) -> Result<(), ValidationError> {
    if nip19::is_hex_key(input) || nip19::is_npub(input) {
        return Ok(());
    }
    let reason = if input.starts_with(nip19::NPUB_PREFIX) {
        format!(
            "expected a {}-character npub identifier",
            nip19::ENCODED_KEY_LEN
        )
    } else {
        "expected 64 hex characters or an npub identifier".to_string()
    };
    Err(ValidationError::MalformedKey { side, reason })
}

fn check_token(raw: &str) -> Result<BearerToken, ValidationError> {
    let token = raw.trim();
    let len = token.chars().count();
    if !(TOKEN_MIN_LEN..=TOKEN_MAX_LEN).contains(&len) {
        return Err(ValidationError::InvalidToken(format!(
            "length {len} is outside [{TOKEN_MIN_LEN}, {TOKEN_MAX_LEN}]"
        )));
    }
    let has_prefix = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_alphanumeric());
    if !has_prefix {
        return Err(ValidationError::InvalidToken(format!(
            "must start with \"{TOKEN_PREFIX}\" followed by an alphanumeric character"
        )));
    }
    Ok(BearerToken(token.to_string()))
}

fn check_delay(minutes: i64) -> Result<DeliveryDelay, ValidationError> {
    if !(DELAY_MIN_MINUTES..=DELAY_MAX_MINUTES).contains(&minutes) {
        return Err(ValidationError::InvalidDelay(minutes));
    }
    u32::try_from(minutes)
        .map(DeliveryDelay)
        .map_err(|_| ValidationError::InvalidDelay(minutes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "cashuAeyJ0b2tlbiI6W3sibWludCI6Imh0dHBzOi8vbWludC5leGFtcGxlIn1dfQ";

    fn sender() -> Keys {
        Keys::from_secret_bytes(&[0x11; 32]).unwrap()
    }

    fn recipient_hex() -> String {
        Keys::from_secret_bytes(&[0x22; 32])
            .unwrap()
            .public_key()
            .to_hex()
    }

    #[test]
    fn test_valid_request() {
        let keys = sender();
        let recipient = recipient_hex();
        let req = validate_request(Some(&keys), Some(recipient.as_str()), TOKEN, 60).unwrap();
        assert_eq!(req.recipient().to_hex(), recipient);
        assert_eq!(req.token().as_str(), TOKEN);
        assert_eq!(req.delay().minutes(), 60);
        assert_eq!(req.delay().as_secs(), 3600);
        assert_eq!(req.sender().public_key(), keys.public_key());
    }

    #[test]
    fn test_accepts_npub_and_upper_hex() {
        let keys = sender();
        let recipient = PublicKey::from_hex(&recipient_hex()).unwrap();
        let npub = recipient.to_bech32().unwrap();
        let upper = recipient_hex().to_uppercase();
        for input in [npub.as_str(), upper.as_str()] {
            let req = validate_request(Some(&keys), Some(input), TOKEN, 1).unwrap();
            assert_eq!(req.recipient(), recipient);
        }
    }

    #[test]
    fn test_missing_identity() {
        let keys = sender();
        let recipient = recipient_hex();
        assert_eq!(
            validate_request(None, Some(recipient.as_str()), TOKEN, 60).unwrap_err(),
            ValidationError::MissingIdentity
        );
        assert_eq!(
            validate_request(Some(&keys), None, TOKEN, 60).unwrap_err(),
            ValidationError::MissingIdentity
        );
        assert_eq!(
            validate_request(Some(&keys), Some("  "), TOKEN, 60).unwrap_err(),
            ValidationError::MissingIdentity
        );
    }

    #[test]
    fn test_self_delivery_rejected() {
        let keys = sender();
        let own_hex = keys.public_key().to_hex();
        let own_npub = keys.public_key().to_bech32().unwrap();
        for input in [own_hex.clone(), own_hex.to_uppercase(), own_npub] {
            assert_eq!(
                validate_request(Some(&keys), Some(input.as_str()), TOKEN, 60).unwrap_err(),
                ValidationError::SelfDeliveryRejected
            );
        }
    }

    #[test]
    fn test_malformed_recipient() {
        let keys = sender();
        let err = validate_request(Some(&keys), Some("not-a-key"), TOKEN, 60).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedKey {
                side: KeySide::Recipient,
                ..
            }
        ));
    }

    #[test]
    fn test_bech32m_recipient_is_malformed() {
        let keys = sender();
        let recipient = PublicKey::from_hex(&recipient_hex()).unwrap();
        let hrp = bech32::Hrp::parse("npub").unwrap();
        let npub_m = bech32::encode::<bech32::Bech32m>(hrp, recipient.as_bytes()).unwrap();

        let err = validate_request(Some(&keys), Some(npub_m.as_str()), TOKEN, 60).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MalformedKey {
                side: KeySide::Recipient,
                ..
            }
        ));
    }

    #[test]
    fn test_hex_off_curve_is_malformed() {
        // Well-formed hex, but not the x coordinate of any curve point.
        let keys = sender();
        let off_curve = "ff".repeat(32);
        let err =
            validate_request(Some(&keys), Some(off_curve.as_str()), TOKEN, 60).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedKey { .. }));
    }

    #[test]
    fn test_self_delivery_checked_before_token_and_delay() {
        let keys = sender();
        let own_hex = keys.public_key().to_hex();
        assert_eq!(
            validate_request(Some(&keys), Some(own_hex.as_str()), "short", 0).unwrap_err(),
            ValidationError::SelfDeliveryRejected
        );
    }

    #[test]
    fn test_token_length_bounds() {
        let keys = sender();
        let recipient = recipient_hex();

        let too_short = format!("cashuA{}", "x".repeat(13));
        assert_eq!(too_short.len(), 19);
        assert!(matches!(
            validate_request(Some(&keys), Some(recipient.as_str()), &too_short, 60),
            Err(ValidationError::InvalidToken(_))
        ));

        let shortest = format!("cashuA{}", "x".repeat(14));
        assert!(validate_request(Some(&keys), Some(recipient.as_str()), &shortest, 60).is_ok());

        let longest = format!("cashuA{}", "x".repeat(TOKEN_MAX_LEN - 6));
        assert!(validate_request(Some(&keys), Some(recipient.as_str()), &longest, 60).is_ok());

        let too_long = format!("cashuA{}", "x".repeat(TOKEN_MAX_LEN - 5));
        assert!(matches!(
            validate_request(Some(&keys), Some(recipient.as_str()), &too_long, 60),
            Err(ValidationError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_token_prefix() {
        let keys = sender();
        let recipient = recipient_hex();
        for bad in [
            "bitcoinAeyJ0b2tlbiI6W3sibWludCI6",
            "cashu-eyJ0b2tlbiI6W3sibWludCI6Imh0",
            "CASHUAeyJ0b2tlbiI6W3sibWludCI6Imh0",
        ] {
            assert!(matches!(
                validate_request(Some(&keys), Some(recipient.as_str()), bad, 60),
                Err(ValidationError::InvalidToken(_))
            ));
        }
    }

    #[test]
    fn test_token_is_trimmed() {
        let keys = sender();
        let recipient = recipient_hex();
        let padded = format!("  {TOKEN}\n");
        let req = validate_request(Some(&keys), Some(recipient.as_str()), &padded, 60).unwrap();
        assert_eq!(req.token().as_str(), TOKEN);
    }

    #[test]
    fn test_delay_bounds() {
        let keys = sender();
        let recipient = recipient_hex();
        for bad in [0, -5, DELAY_MAX_MINUTES + 1] {
            assert_eq!(
                validate_request(Some(&keys), Some(recipient.as_str()), TOKEN, bad).unwrap_err(),
                ValidationError::InvalidDelay(bad)
            );
        }
        for good in [DELAY_MIN_MINUTES, DELAY_MAX_MINUTES] {
            assert!(validate_request(Some(&keys), Some(recipient.as_str()), TOKEN, good).is_ok());
        }
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let keys = sender();
        let recipient = recipient_hex();
        let req = validate_request(Some(&keys), Some(recipient.as_str()), TOKEN, 60).unwrap();
        let debug = format!("{:?}", req);
        assert!(!debug.contains(TOKEN));
    }
}
