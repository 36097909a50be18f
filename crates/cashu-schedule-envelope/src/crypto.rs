//! secp256k1 key agreement.
//!
//! Both envelope layers start from the same primitive: the x coordinate of
//! `secret · peer`, where the peer's x-only key is lifted to the point with
//! even y. Either side computes the same value from its own secret and the
//! other side's public key.

use secp256k1::ecdh::shared_secret_point;
use zeroize::Zeroize;

use cashu_schedule_core::{Keys, PublicKey};

use crate::error::Result;

/// The 32-byte x coordinate of an ECDH shared point. Erased on drop.
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Perform key agreement between our secret and a peer's public key.
pub fn shared_secret(secret: &Keys, peer: &PublicKey) -> Result<SharedSecret> {
    let point = peer.to_point()?;
    let mut scalar = secret.secret_key();
    let mut xy = shared_secret_point(&point, &scalar);
    scalar.non_secure_erase();

    let mut x = [0u8; 32];
    x.copy_from_slice(&xy[..32]);
    xy.zeroize();
    Ok(SharedSecret(x))
}
