//! NIP-19 bech32 encoding of raw keys (`npub1…`, `nsec1…`).

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};

use crate::error::CoreError;

/// Prefix of an encoded public key, including the bech32 separator.
pub const NPUB_PREFIX: &str = "npub1";

/// Prefix of an encoded secret key, including the bech32 separator.
pub const NSEC_PREFIX: &str = "nsec1";

/// Total length of an encoded 32-byte key.
pub const ENCODED_KEY_LEN: usize = 63;

const NPUB_HRP: Hrp = Hrp::parse_unchecked("npub");
const NSEC_HRP: Hrp = Hrp::parse_unchecked("nsec");

/// Encode a public key as `npub1…`.
pub fn encode_npub(bytes: &[u8; 32]) -> Result<String, CoreError> {
    encode(NPUB_HRP, bytes)
}

/// Encode a secret key as `nsec1…`.
pub fn encode_nsec(bytes: &[u8; 32]) -> Result<String, CoreError> {
    encode(NSEC_HRP, bytes)
}

/// Decode an `npub1…` string to raw key bytes.
pub fn decode_npub(s: &str) -> Result<[u8; 32], CoreError> {
    decode_key(NPUB_HRP, s)
}

/// Decode an `nsec1…` string to raw key bytes.
pub fn decode_nsec(s: &str) -> Result<[u8; 32], CoreError> {
    decode_key(NSEC_HRP, s)
}

/// True if `s` is a 64-character hex identifier.
pub fn is_hex_key(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// True if `s` has the shape of an `npub1…` identifier and decodes to 32 bytes.
pub fn is_npub(s: &str) -> bool {
    s.len() == ENCODED_KEY_LEN && s.starts_with(NPUB_PREFIX) && decode_npub(s).is_ok()
}

fn encode(hrp: Hrp, data: &[u8; 32]) -> Result<String, CoreError> {
    bech32::encode::<Bech32>(hrp, data).map_err(|e| CoreError::EncodingError(e.to_string()))
}

fn decode_key(expected: Hrp, s: &str) -> Result<[u8; 32], CoreError> {
    // Keys use the original bech32 checksum only; bech32m strings are rejected.
    let checked = CheckedHrpstring::new::<Bech32>(s)
        .map_err(|e| CoreError::InvalidBech32(e.to_string()))?;
    let hrp = checked.hrp();
    if hrp != expected {
        return Err(CoreError::InvalidBech32(format!(
            "expected prefix {expected}, got {hrp}"
        )));
    }
    let data: Vec<u8> = checked.byte_iter().collect();
    let len = data.len();
    data.try_into()
        .map_err(|_| CoreError::InvalidBech32(format!("expected 32 bytes, got {len}")))
}
