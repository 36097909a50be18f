//! # Cashu Schedule Core
//!
//! Pure primitives for scheduled Cashu delivery over Nostr: keys, events,
//! canonical event ids, signing and request validation.
//!
//! This crate contains no I/O, no storage, no networking. Randomness is
//! always drawn through a caller-supplied (or OS) CSPRNG so that entropy
//! failure surfaces as [`CoreError::CryptoUnavailable`] instead of a panic.
//!
//! ## Key Types
//!
//! - [`Keys`] - A secp256k1 identity (secret scalar + x-only public key)
//! - [`PublicKey`] - A 32-byte x-only public key (hex or `npub1…`)
//! - [`UnsignedEvent`] / [`Event`] - NIP-01 events before and after signing
//! - [`EventId`] - Content-addressed identifier (SHA-256 of the canonical form)
//! - [`ValidatedRequest`] - A scheduling request that passed every policy rule
//!
//! ## Canonicalization
//!
//! Event ids follow NIP-01. See the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod nip19;
pub mod signer;
pub mod types;
pub mod validation;

pub use canonical::{canonical_event_json, compute_event_id};
pub use crypto::{fill_random, Keys, PublicKey, Sha256Hash, Signature};
pub use error::{CoreError, KeySide, ValidationError};
pub use event::{Event, EventBuilder, Tag, UnsignedEvent};
pub use signer::sign_event;
pub use types::{EventId, Kind, Timestamp};
pub use validation::{
    validate_request, BearerToken, DeliveryDelay, ValidatedRequest, DELAY_MAX_MINUTES,
    DELAY_MIN_MINUTES, TOKEN_MAX_LEN, TOKEN_MIN_LEN, TOKEN_PREFIX,
};
