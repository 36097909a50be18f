//! NIP-04 payload encryption (legacy).
//!
//! AES-256-CBC keyed directly by the shared x coordinate, PKCS#7 padding and
//! a random 16-byte IV. The payload is `base64(ciphertext) + "?iv=" + base64(iv)`.
//! Not authenticated; kept for clients that only read kind 4 this way.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{CryptoRng, RngCore};

use cashu_schedule_core::fill_random;

use crate::crypto::SharedSecret;
use crate::error::{EnvelopeError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Separates the ciphertext from the IV in a payload.
pub const IV_SEPARATOR: &str = "?iv=";

/// True if the payload has the NIP-04 shape.
pub fn is_nip04(payload: &str) -> bool {
    payload.contains(IV_SEPARATOR)
}

/// Encrypt with a random IV drawn from `rng`.
pub fn encrypt<R>(shared: &SharedSecret, plaintext: &[u8], rng: &mut R) -> Result<String>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut iv = [0u8; 16];
    fill_random(rng, &mut iv)?;
    let ciphertext = Aes256CbcEnc::new_from_slices(shared.as_bytes(), &iv)
        .map_err(|e| EnvelopeError::EncryptionError(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    Ok(format!(
        "{}{IV_SEPARATOR}{}",
        STANDARD.encode(ciphertext),
        STANDARD.encode(iv)
    ))
}

/// Decrypt a payload.
pub fn decrypt(shared: &SharedSecret, payload: &str) -> Result<Vec<u8>> {
    let (ciphertext, iv) = payload
        .split_once(IV_SEPARATOR)
        .ok_or_else(|| EnvelopeError::InvalidPayload("missing ?iv= separator".into()))?;
    let ciphertext = STANDARD
        .decode(ciphertext)
        .map_err(|e| EnvelopeError::InvalidPayload(e.to_string()))?;
    let iv = STANDARD
        .decode(iv)
        .map_err(|e| EnvelopeError::InvalidPayload(e.to_string()))?;
    let iv: [u8; 16] = iv.as_slice().try_into().map_err(|_| {
        EnvelopeError::InvalidPayload(format!("iv must be 16 bytes, got {}", iv.len()))
    })?;

    Aes256CbcDec::new_from_slices(shared.as_bytes(), &iv)
        .map_err(|e| EnvelopeError::DecryptionFailed(e.to_string()))?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| EnvelopeError::DecryptionFailed("invalid padding".into()))
}
