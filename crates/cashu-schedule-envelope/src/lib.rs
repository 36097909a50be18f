//! # Cashu Schedule Envelope
//!
//! Two-layer encryption for scheduled token delivery.
//!
//! ## Overview
//!
//! An instruction event carries two envelopes, one inside the other:
//!
//! 1. **Inner**: the token, sealed from a one-time ephemeral identity to the
//!    recipient. Only the recipient can open it.
//! 2. **Outer**: the instruction (target time, inner message, ephemeral
//!    secret), sealed from the sender to the scheduler service. Only the
//!    scheduler can open it.
//!
//! The scheduler learns the ephemeral secret so it can sign the inner message
//! at delivery time, but that secret alone cannot open the inner layer: the
//! key is agreed between the ephemeral identity and the recipient.
//!
//! Both layers use the same [`seal`] / [`open`] pair: secp256k1 ECDH, then
//! NIP-44 v2 (default) or NIP-04.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cashu_schedule_core::{validate_request, Keys};
//! use cashu_schedule_envelope::{open_instruction, EnvelopeBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sender = Keys::generate()?;
//! let scheduler = Keys::generate()?;
//! let recipient = Keys::generate()?.public_key().to_hex();
//!
//! let request = validate_request(Some(&sender), Some(recipient.as_str()), "cashuA...token...", 60)?;
//! let sealed = EnvelopeBuilder::new(scheduler.public_key()).build(&request)?;
//! let event = sealed.event.sign_with(&sender, &mut rand::rngs::OsRng)?;
//!
//! let instruction = open_instruction(&event, &scheduler)?;
//! println!("deliver at {}", instruction.target());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod message;
pub mod nip04;
pub mod nip44;

pub use builder::{
    open_instruction, EnvelopeBuilder, SealedEnvelope, DEFAULT_LABEL, INSTRUCTION_TOPIC,
};
pub use crypto::{shared_secret, SharedSecret};
pub use envelope::{open, seal, EncryptionFormat};
pub use error::{EnvelopeError, Result};
pub use message::{InnerMessage, Instruction, INNER_CREATED_AT};
pub use nip44::ConversationKey;
