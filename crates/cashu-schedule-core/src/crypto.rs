//! Cryptographic primitives for Nostr identities.
//!
//! Wraps secp256k1 BIP-340 Schnorr signing and SHA-256 hashing with strong types.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use secp256k1::{schnorr, Keypair, Message, Parity, SecretKey, XOnlyPublicKey, SECP256K1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroize;

use crate::error::CoreError;
use crate::nip19;

/// Attempts at drawing a valid secret scalar before giving up on the RNG.
const MAX_KEYGEN_ATTEMPTS: usize = 8;

/// Fill `buf` from a cryptographically strong RNG.
///
/// Uses the fallible RNG path so an exhausted or broken entropy source
/// becomes [`CoreError::CryptoUnavailable`].
pub fn fill_random<R>(rng: &mut R, buf: &mut [u8]) -> Result<(), CoreError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    rng.try_fill_bytes(buf)
        .map_err(|e| CoreError::CryptoUnavailable(e.to_string()))
}

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHA256({}...)", &self.to_hex()[..8])
    }
}

/// A 32-byte x-only secp256k1 public key.
///
/// Always a valid curve point: every constructor checks it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create from raw bytes, checking that they encode a curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CoreError> {
        XOnlyPublicKey::from_slice(&bytes)
            .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string (either case).
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        if s.len() != 64 {
            return Err(CoreError::InvalidPublicKey(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr)
            .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(arr)
    }

    /// Encode as `npub1…`.
    pub fn to_bech32(&self) -> Result<String, CoreError> {
        nip19::encode_npub(&self.0)
    }

    /// Decode from `npub1…`.
    pub fn from_bech32(s: &str) -> Result<Self, CoreError> {
        Self::from_bytes(nip19::decode_npub(s)?)
    }

    /// Resolve a user-supplied identifier: `npub1…` or 64-hex.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let input = input.trim();
        if input.starts_with(nip19::NPUB_PREFIX) {
            Self::from_bech32(input)
        } else {
            Self::from_hex(input)
        }
    }

    /// The x-only key as used by BIP-340.
    pub fn to_x_only(&self) -> Result<XOnlyPublicKey, CoreError> {
        XOnlyPublicKey::from_slice(&self.0).map_err(|e| CoreError::InvalidPublicKey(e.to_string()))
    }

    /// The full curve point with even y, as used for ECDH.
    pub fn to_point(&self) -> Result<secp256k1::PublicKey, CoreError> {
        Ok(self.to_x_only()?.public_key(Parity::Even))
    }

    /// Verify a BIP-340 signature over a 32-byte digest.
    pub fn verify(&self, digest: &[u8; 32], signature: &Signature) -> Result<(), CoreError> {
        let key = self.to_x_only()?;
        let sig = schnorr::Signature::from_slice(&signature.0)
            .map_err(|_| CoreError::InvalidSignature)?;
        let msg = Message::from_digest(*digest);
        SECP256K1
            .verify_schnorr(&sig, &msg, &key)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 64-byte BIP-340 Schnorr signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 128-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut arr = [0u8; 64];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({}...)", &self.to_hex()[..8])
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A secp256k1 identity: secret scalar plus derived x-only public key.
///
/// The public key is a pure function of the secret. Secret material is
/// erased when the value is dropped and never shown by `Debug`.
#[derive(Clone)]
pub struct Keys {
    keypair: Keypair,
    public_key: PublicKey,
}

impl Keys {
    /// Generate a new random identity from the operating system RNG.
    pub fn generate() -> Result<Self, CoreError> {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a new random identity from the given CSPRNG.
    pub fn generate_with<R>(rng: &mut R) -> Result<Self, CoreError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let mut bytes = [0u8; 32];
        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            fill_random(rng, &mut bytes)?;
            if let Ok(secret) = SecretKey::from_slice(&bytes) {
                bytes.zeroize();
                return Ok(Self::from_secret_key(secret));
            }
        }
        bytes.zeroize();
        Err(CoreError::CryptoUnavailable(
            "entropy source produced no valid secret scalar".into(),
        ))
    }

    /// Create from 32 secret bytes.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CoreError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Self::from_secret_key(secret))
    }

    /// Parse from a 64-character hex secret.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let mut bytes = [0u8; 32];
        let decoded = hex::decode_to_slice(s, &mut bytes).map_err(|_| CoreError::InvalidSecretKey);
        let keys = decoded.and_then(|_| Self::from_secret_bytes(&bytes));
        bytes.zeroize();
        keys
    }

    /// Decode from `nsec1…`.
    pub fn from_bech32(s: &str) -> Result<Self, CoreError> {
        let mut bytes = nip19::decode_nsec(s)?;
        let keys = Self::from_secret_bytes(&bytes);
        bytes.zeroize();
        keys
    }

    /// Load a portable secret: `nsec1…` or 64-hex.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let input = input.trim();
        if input.starts_with(nip19::NSEC_PREFIX) {
            Self::from_bech32(input)
        } else {
            Self::from_hex(input)
        }
    }

    fn from_secret_key(secret: SecretKey) -> Self {
        let keypair = Keypair::from_secret_key(SECP256K1, &secret);
        let (x_only, _parity) = keypair.x_only_public_key();
        Self {
            keypair,
            public_key: PublicKey(x_only.serialize()),
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// The secret scalar, for key agreement.
    pub fn secret_key(&self) -> SecretKey {
        SecretKey::from_keypair(&self.keypair)
    }

    /// Raw secret bytes. The caller is responsible for erasing them.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.keypair.secret_bytes()
    }

    /// Lowercase hex of the secret scalar, no prefix.
    pub fn secret_hex(&self) -> String {
        let mut bytes = self.secret_bytes();
        let encoded = hex::encode(bytes);
        bytes.zeroize();
        encoded
    }

    /// Encode the secret as `nsec1…`.
    pub fn to_bech32(&self) -> Result<String, CoreError> {
        let mut bytes = self.secret_bytes();
        let encoded = nip19::encode_nsec(&bytes);
        bytes.zeroize();
        encoded
    }

    /// Produce a BIP-340 signature over a 32-byte digest.
    ///
    /// Auxiliary randomness is drawn from `rng`.
    pub fn sign_digest<R>(&self, digest: &[u8; 32], rng: &mut R) -> Result<Signature, CoreError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let mut aux = [0u8; 32];
        fill_random(rng, &mut aux)?;
        let msg = Message::from_digest(*digest);
        let sig = SECP256K1.sign_schnorr_with_aux_rand(&msg, &self.keypair, &aux);
        Ok(Signature(sig.serialize()))
    }
}

impl Drop for Keys {
    fn drop(&mut self) {
        self.keypair.non_secure_erase();
    }
}

impl PartialEq for Keys {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for Keys {}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keys({:?})", self.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // x coordinate of the secp256k1 generator, i.e. the public key of secret 1.
    const G_X: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn secret_one() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        bytes
    }

    struct EmptyRng;

    impl RngCore for EmptyRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!("only the fallible path is used")
        }
        fn next_u64(&mut self) -> u64 {
            unreachable!("only the fallible path is used")
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!("only the fallible path is used")
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other("entropy exhausted")))
        }
    }

    impl CryptoRng for EmptyRng {}

    #[test]
    fn test_public_key_of_secret_one_is_generator() {
        let keys = Keys::from_secret_bytes(&secret_one()).unwrap();
        assert_eq!(keys.public_key().to_hex(), G_X);
    }

    #[test]
    fn test_sign_verify() {
        let keys = Keys::generate().unwrap();
        let digest = Sha256Hash::hash(b"hello world").0;
        let signature = keys.sign_digest(&digest, &mut OsRng).unwrap();

        keys.public_key().verify(&digest, &signature).unwrap();

        let tampered = Sha256Hash::hash(b"hello worlD").0;
        assert!(keys.public_key().verify(&tampered, &signature).is_err());
    }

    #[test]
    fn test_deterministic_from_secret() {
        let k1 = Keys::from_secret_bytes(&[0x42; 32]).unwrap();
        let k2 = Keys::from_secret_bytes(&[0x42; 32]).unwrap();
        assert_eq!(k1.public_key(), k2.public_key());
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(matches!(
            Keys::from_secret_bytes(&[0u8; 32]),
            Err(CoreError::InvalidSecretKey)
        ));
    }

    #[test]
    fn test_generate_reports_entropy_failure() {
        let result = Keys::generate_with(&mut EmptyRng);
        assert!(matches!(result, Err(CoreError::CryptoUnavailable(_))));
    }

    #[test]
    fn test_secret_hex_roundtrip() {
        let keys = Keys::generate().unwrap();
        let hex = keys.secret_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex, hex.to_lowercase());
        let recovered = Keys::from_hex(&hex).unwrap();
        assert_eq!(keys.public_key(), recovered.public_key());
    }

    #[test]
    fn test_nsec_roundtrip() {
        let keys = Keys::generate().unwrap();
        let nsec = keys.to_bech32().unwrap();
        assert!(nsec.starts_with("nsec1"));
        let recovered = Keys::parse(&nsec).unwrap();
        assert_eq!(keys, recovered);
    }

    #[test]
    fn test_public_key_parse_accepts_upper_hex() {
        let pk = PublicKey::parse(&G_X.to_uppercase()).unwrap();
        assert_eq!(pk.to_hex(), G_X);
    }

    #[test]
    fn test_public_key_parse_npub() {
        let keys = Keys::generate().unwrap();
        let npub = keys.public_key().to_bech32().unwrap();
        assert_eq!(npub.len(), 63);
        assert_eq!(PublicKey::parse(&npub).unwrap(), keys.public_key());
    }

    #[test]
    fn test_public_key_rejects_garbage() {
        assert!(PublicKey::parse("not-a-key").is_err());
        assert!(PublicKey::parse(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let keys = Keys::from_secret_bytes(&[0x42; 32]).unwrap();
        let debug = format!("{:?}", keys);
        assert!(!debug.contains(&keys.secret_hex()));
        assert!(debug.starts_with("Keys(PublicKey("));
    }

    #[test]
    fn test_sha256_hash() {
        let h1 = Sha256Hash::hash(b"test");
        let h2 = Sha256Hash::hash(b"test");
        assert_eq!(h1, h2);
        assert_ne!(h1, Sha256Hash::hash(b"different"));
    }
}
