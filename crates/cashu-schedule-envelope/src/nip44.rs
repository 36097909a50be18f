//! NIP-44 version 2 payload encryption.
//!
//! ```text
//! conversation_key = HKDF-extract(salt = "nip44-v2", ikm = shared_x)
//! (chacha_key, chacha_nonce, hmac_key) = HKDF-expand(conversation_key, nonce, 76)
//! payload = base64(0x02 || nonce || chacha20(pad(plaintext)) || hmac(nonce || ciphertext))
//! ```
//!
//! Padding hides the exact plaintext length: a big-endian u16 length prefix,
//! then zeros up to [`calc_padded_len`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroize;

use cashu_schedule_core::fill_random;

use crate::crypto::SharedSecret;
use crate::error::{EnvelopeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Version byte of the only supported payload format.
pub const VERSION: u8 = 2;

/// Shortest plaintext that can be encrypted.
pub const MIN_PLAINTEXT_LEN: usize = 1;

/// Longest plaintext that can be encrypted.
pub const MAX_PLAINTEXT_LEN: usize = 65535;

const SALT: &[u8] = b"nip44-v2";
const NONCE_LEN: usize = 32;
const MAC_LEN: usize = 32;
const MIN_PAYLOAD_LEN: usize = 132;
const MAX_PAYLOAD_LEN: usize = 87472;
const MIN_DECODED_LEN: usize = 99;
const MAX_DECODED_LEN: usize = 65603;

/// Long-lived key for one pair of parties. Erased on drop.
pub struct ConversationKey([u8; 32]);

impl ConversationKey {
    /// Derive from an ECDH shared secret.
    pub fn from_shared(shared: &SharedSecret) -> Self {
        let (prk, _) = Hkdf::<Sha256>::extract(Some(SALT), shared.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&prk);
        Self(key)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for ConversationKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

struct MessageKeys {
    chacha_key: [u8; 32],
    chacha_nonce: [u8; 12],
    hmac_key: [u8; 32],
}

impl MessageKeys {
    fn derive(conversation: &ConversationKey, nonce: &[u8; NONCE_LEN]) -> Result<Self> {
        let hk = Hkdf::<Sha256>::from_prk(conversation.as_bytes())
            .map_err(|e| EnvelopeError::EncryptionError(e.to_string()))?;
        let mut okm = [0u8; 76];
        hk.expand(nonce, &mut okm)
            .map_err(|e| EnvelopeError::EncryptionError(e.to_string()))?;

        let mut keys = Self {
            chacha_key: [0u8; 32],
            chacha_nonce: [0u8; 12],
            hmac_key: [0u8; 32],
        };
        keys.chacha_key.copy_from_slice(&okm[0..32]);
        keys.chacha_nonce.copy_from_slice(&okm[32..44]);
        keys.hmac_key.copy_from_slice(&okm[44..76]);
        okm.zeroize();
        Ok(keys)
    }

    fn apply_keystream(&self, buf: &mut [u8]) {
        let mut cipher = ChaCha20::new(&self.chacha_key.into(), &self.chacha_nonce.into());
        cipher.apply_keystream(buf);
    }

    fn mac(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.hmac_key)
            .map_err(|e| EnvelopeError::EncryptionError(e.to_string()))?;
        mac.update(nonce);
        mac.update(ciphertext);
        Ok(mac)
    }
}

impl Drop for MessageKeys {
    fn drop(&mut self) {
        self.chacha_key.zeroize();
        self.chacha_nonce.zeroize();
        self.hmac_key.zeroize();
    }
}

/// Padded length (without the 2-byte prefix) for a plaintext of `len` bytes.
pub fn calc_padded_len(len: usize) -> usize {
    if len <= 32 {
        return 32;
    }
    let next_power = 1usize << (usize::BITS - (len - 1).leading_zeros());
    let chunk = if next_power <= 256 { 32 } else { next_power / 8 };
    chunk * ((len - 1) / chunk + 1)
}

fn pad(plaintext: &[u8]) -> Result<Vec<u8>> {
    let len = plaintext.len();
    if len < MIN_PLAINTEXT_LEN {
        return Err(EnvelopeError::InvalidPlaintextLength(len));
    }
    let prefix = u16::try_from(len).map_err(|_| EnvelopeError::InvalidPlaintextLength(len))?;

    let total = 2 + calc_padded_len(len);
    let mut padded = Vec::with_capacity(total);
    padded.extend_from_slice(&prefix.to_be_bytes());
    padded.extend_from_slice(plaintext);
    padded.resize(total, 0);
    Ok(padded)
}

fn unpad(padded: &[u8]) -> Result<Vec<u8>> {
    if padded.len() < 2 {
        return Err(EnvelopeError::DecryptionFailed("invalid padding".into()));
    }
    let len = u16::from_be_bytes([padded[0], padded[1]]) as usize;
    if len == 0 || padded.len() != 2 + calc_padded_len(len) {
        return Err(EnvelopeError::DecryptionFailed("invalid padding".into()));
    }
    Ok(padded[2..2 + len].to_vec())
}

/// Encrypt with a random nonce drawn from `rng`.
pub fn encrypt<R>(conversation: &ConversationKey, plaintext: &[u8], rng: &mut R) -> Result<String>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut nonce = [0u8; NONCE_LEN];
    fill_random(rng, &mut nonce)?;
    encrypt_with_nonce(conversation, plaintext, &nonce)
}

/// Encrypt with a caller-chosen nonce. Reusing a nonce leaks plaintext.
pub fn encrypt_with_nonce(
    conversation: &ConversationKey,
    plaintext: &[u8],
    nonce: &[u8; NONCE_LEN],
) -> Result<String> {
    let keys = MessageKeys::derive(conversation, nonce)?;
    let mut buf = pad(plaintext)?;
    keys.apply_keystream(&mut buf);
    let tag = keys.mac(nonce, &buf)?.finalize().into_bytes();

    let mut payload = Vec::with_capacity(1 + NONCE_LEN + buf.len() + MAC_LEN);
    payload.push(VERSION);
    payload.extend_from_slice(nonce);
    payload.extend_from_slice(&buf);
    payload.extend_from_slice(&tag);
    Ok(STANDARD.encode(payload))
}

/// Authenticate and decrypt a payload.
pub fn decrypt(conversation: &ConversationKey, payload: &str) -> Result<Vec<u8>> {
    if payload.starts_with('#') {
        return Err(EnvelopeError::InvalidPayload(
            "unknown encryption version marker".into(),
        ));
    }
    if !(MIN_PAYLOAD_LEN..=MAX_PAYLOAD_LEN).contains(&payload.len()) {
        return Err(EnvelopeError::InvalidPayload(format!(
            "payload length {} is out of range",
            payload.len()
        )));
    }
    let data = STANDARD
        .decode(payload)
        .map_err(|e| EnvelopeError::InvalidPayload(e.to_string()))?;
    if !(MIN_DECODED_LEN..=MAX_DECODED_LEN).contains(&data.len()) {
        return Err(EnvelopeError::InvalidPayload(format!(
            "decoded length {} is out of range",
            data.len()
        )));
    }
    if data[0] != VERSION {
        return Err(EnvelopeError::UnsupportedVersion(data[0]));
    }

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[1..1 + NONCE_LEN]);
    let (ciphertext, tag) = data[1 + NONCE_LEN..].split_at(data.len() - 1 - NONCE_LEN - MAC_LEN);

    let keys = MessageKeys::derive(conversation, &nonce)?;
    keys.mac(&nonce, ciphertext)?
        .verify_slice(tag)
        .map_err(|_| EnvelopeError::DecryptionFailed("invalid MAC".into()))?;

    let mut buf = ciphertext.to_vec();
    keys.apply_keystream(&mut buf);
    let plaintext = unpad(&buf);
    buf.zeroize();
    plaintext
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::shared_secret;
    use cashu_schedule_core::Keys;
    use proptest::prelude::*;
    use rand::rngs::OsRng;

    fn secret(n: u8) -> Keys {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        Keys::from_secret_bytes(&bytes).unwrap()
    }

    fn conversation(a: &Keys, b: &Keys) -> ConversationKey {
        ConversationKey::from_shared(&shared_secret(a, &b.public_key()).unwrap())
    }

    #[test]
    fn test_conversation_key_vector() {
        let key = conversation(&secret(1), &secret(2));
        assert_eq!(
            hex::encode(key.as_bytes()),
            "c41c775356fd92eadc63ff5a0dc1da211b268cbea22316767095b2871ea1412d"
        );
    }

    #[test]
    fn test_conversation_key_is_symmetric() {
        let a = Keys::generate().unwrap();
        let b = Keys::generate().unwrap();
        assert_eq!(
            conversation(&a, &b).as_bytes(),
            conversation(&b, &a).as_bytes()
        );
    }

    #[test]
    fn test_padded_lengths() {
        for (len, padded) in [
            (1, 32),
            (32, 32),
            (33, 64),
            (65, 96),
            (100, 128),
            (200, 224),
            (320, 320),
            (515, 640),
            (65535, 65536),
        ] {
            assert_eq!(calc_padded_len(len), padded, "len {len}");
        }
    }

    #[test]
    fn test_payload_layout() {
        let key = conversation(&secret(1), &secret(2));
        let mut nonce = [0u8; 32];
        nonce[31] = 1;
        let payload = encrypt_with_nonce(&key, b"a", &nonce).unwrap();

        // 1 version + 32 nonce + 34 padded ciphertext + 32 mac = 99 bytes.
        assert_eq!(payload.len(), 132);
        assert_eq!(
            payload,
            "AgAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABee0G5VSK0/9YypIObAtDKfYEAjD35uVkHyB0F4DwrcNaCXlCWZKaArsGrY6M9wnuTMxWfp1RTN9Xga8no+kF5Vsb"
        );
        assert_eq!(decrypt(&key, &payload).unwrap(), b"a");
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = conversation(&Keys::generate().unwrap(), &Keys::generate().unwrap());
        let plaintext = "hello, encrypted world! ünïcödé".as_bytes();
        let payload = encrypt(&key, plaintext, &mut OsRng).unwrap();
        assert_eq!(decrypt(&key, &payload).unwrap(), plaintext);
    }

    #[test]
    fn test_random_nonce_differs() {
        let key = conversation(&Keys::generate().unwrap(), &Keys::generate().unwrap());
        let a = encrypt(&key, b"same", &mut OsRng).unwrap();
        let b = encrypt(&key, b"same", &mut OsRng).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = conversation(&Keys::generate().unwrap(), &Keys::generate().unwrap());
        let key2 = conversation(&Keys::generate().unwrap(), &Keys::generate().unwrap());
        let payload = encrypt(&key1, b"secret", &mut OsRng).unwrap();
        assert!(matches!(
            decrypt(&key2, &payload),
            Err(EnvelopeError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = conversation(&Keys::generate().unwrap(), &Keys::generate().unwrap());
        let payload = encrypt(&key, b"secret", &mut OsRng).unwrap();
        let mut data = STANDARD.decode(&payload).unwrap();
        data[40] ^= 0x01;
        let tampered = STANDARD.encode(data);
        assert!(matches!(
            decrypt(&key, &tampered),
            Err(EnvelopeError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let key = conversation(&Keys::generate().unwrap(), &Keys::generate().unwrap());
        let payload = encrypt(&key, b"secret", &mut OsRng).unwrap();
        let mut data = STANDARD.decode(&payload).unwrap();
        data[0] = 1;
        assert!(matches!(
            decrypt(&key, &STANDARD.encode(data)),
            Err(EnvelopeError::UnsupportedVersion(1))
        ));
        assert!(decrypt(&key, "#not-supported").is_err());
    }

    #[test]
    fn test_empty_and_oversized_plaintext_rejected() {
        let key = conversation(&Keys::generate().unwrap(), &Keys::generate().unwrap());
        assert!(matches!(
            encrypt(&key, b"", &mut OsRng),
            Err(EnvelopeError::InvalidPlaintextLength(0))
        ));
        let big = vec![b'x'; MAX_PLAINTEXT_LEN + 1];
        assert!(matches!(
            encrypt(&key, &big, &mut OsRng),
            Err(EnvelopeError::InvalidPlaintextLength(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_padding_covers_plaintext(len in 1usize..=MAX_PLAINTEXT_LEN) {
            let padded = calc_padded_len(len);
            prop_assert!(padded >= len);
            prop_assert!(padded >= 32);
            prop_assert_eq!(calc_padded_len(padded), padded);
        }
    }
}
