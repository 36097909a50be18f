//! The signing step of the scheduling pipeline.

use rand::{CryptoRng, RngCore};

use crate::crypto::Keys;
use crate::error::CoreError;
use crate::event::{Event, UnsignedEvent};

/// Sign an event with the session identity, if there is one.
///
/// The id is computed from the canonical form, so signing the same fields
/// twice always yields the same id (signatures differ by aux randomness).
pub fn sign_event<R>(
    unsigned: UnsignedEvent,
    signer: Option<&Keys>,
    rng: &mut R,
) -> Result<Event, CoreError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let keys = signer.ok_or(CoreError::MissingSigningKey)?;
    unsigned.sign_with(keys, rng)
}
