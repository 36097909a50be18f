//! Building and opening schedule instruction events.
//!
//! ## Construction
//!
//! 1. Draw a fresh ephemeral identity.
//! 2. Seal the token from the ephemeral identity to the recipient.
//! 3. target = now + delay.
//! 4. Instruction = {target, inner message JSON, ephemeral secret hex}.
//! 5. Seal the instruction from the sender to the scheduler service.
//! 6. Tag the outer event with a fresh request id, label, target, scheduler
//!    and topic.
//!
//! The result is unsigned; signing is a separate step. Either a complete
//! event comes back or nothing does.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::debug;
use uuid::Uuid;

use cashu_schedule_core::{
    fill_random, Event, EventBuilder, Keys, Kind, PublicKey, Tag, Timestamp, UnsignedEvent,
    ValidatedRequest,
};

use crate::envelope::{open, seal, EncryptionFormat};
use crate::error::{EnvelopeError, Result};
use crate::message::{InnerMessage, Instruction};

/// Topic tag value identifying schedule instructions.
pub const INSTRUCTION_TOPIC: &str = "cashu_schedule_instruction_nip52_v1";

/// Label used when none is configured.
pub const DEFAULT_LABEL: &str = "Scheduled delivery";

/// An instruction event ready for signing.
#[derive(Debug, Clone)]
pub struct SealedEnvelope {
    /// The outer event, authored by the sender.
    pub event: UnsignedEvent,

    /// The `d` tag value.
    pub request_id: Uuid,

    /// When the scheduler service should publish the inner message.
    pub target: Timestamp,

    /// Public half of the one-time identity. The secret half exists only
    /// inside the sealed content.
    pub ephemeral_pubkey: PublicKey,
}

/// Builds instruction events addressed to one scheduler service.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    scheduler: PublicKey,
    label: String,
    format: EncryptionFormat,
}

impl EnvelopeBuilder {
    pub fn new(scheduler: PublicKey) -> Self {
        Self {
            scheduler,
            label: DEFAULT_LABEL.to_string(),
            format: EncryptionFormat::default(),
        }
    }

    /// Set the human label carried in the `name` tag.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the cipher used for both layers.
    pub fn format(mut self, format: EncryptionFormat) -> Self {
        self.format = format;
        self
    }

    pub fn scheduler(&self) -> PublicKey {
        self.scheduler
    }

    /// Build with the current time and the operating system RNG.
    pub fn build(&self, request: &ValidatedRequest<'_>) -> Result<SealedEnvelope> {
        self.build_with(request, Timestamp::now(), &mut OsRng)
    }

    /// Build with an explicit clock reading and entropy source.
    pub fn build_with<R>(
        &self,
        request: &ValidatedRequest<'_>,
        now: Timestamp,
        rng: &mut R,
    ) -> Result<SealedEnvelope>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let ephemeral = Keys::generate_with(rng)?;
        debug!(ephemeral = ?ephemeral.public_key(), "generated ephemeral identity");

        let inner = InnerMessage::seal(
            &ephemeral,
            &request.recipient(),
            request.token(),
            self.format,
            rng,
        )?;

        let target = now.add_secs(request.delay().as_secs());
        let instruction = Instruction::new(target, &inner, &ephemeral)?;
        let plaintext = instruction.to_json()?;

        let sender = request.sender();
        let content = seal(
            self.format,
            sender,
            &self.scheduler,
            plaintext.as_bytes(),
            rng,
        )?;

        let request_id = new_request_id(rng)?;
        let event = EventBuilder::new(Kind::SCHEDULE_INSTRUCTION, content)
            .created_at(now)
            .tags([
                Tag::identifier(request_id.to_string()),
                Tag::new("name", [self.label.as_str()]),
                Tag::new("start", [target.to_string()]),
                Tag::public_key(&self.scheduler),
                Tag::hashtag(INSTRUCTION_TOPIC),
            ])
            .build(sender.public_key());

        debug!(
            request_id = %request_id,
            target = %target,
            format = %self.format,
            "sealed instruction"
        );

        Ok(SealedEnvelope {
            event,
            request_id,
            target,
            ephemeral_pubkey: ephemeral.public_key(),
        })
    }
}

fn new_request_id<R>(rng: &mut R) -> Result<Uuid>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut bytes = [0u8; 16];
    fill_random(rng, &mut bytes)?;
    Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
}

/// Decrypt an instruction event with the scheduler service's keys.
///
/// Checks kind, topic, signature and addressee before decrypting.
pub fn open_instruction(event: &Event, scheduler: &Keys) -> Result<Instruction> {
    if event.kind != Kind::SCHEDULE_INSTRUCTION {
        return Err(EnvelopeError::NotAnInstruction(format!(
            "kind {}",
            event.kind.as_u16()
        )));
    }
    if event.tag_value("t") != Some(INSTRUCTION_TOPIC) {
        return Err(EnvelopeError::NotAnInstruction("missing topic tag".into()));
    }
    event.verify()?;

    let addressee = event.tag_value("p").unwrap_or_default();
    if !addressee.eq_ignore_ascii_case(&scheduler.public_key().to_hex()) {
        return Err(EnvelopeError::NotAnInstruction(
            "addressed to a different scheduler".into(),
        ));
    }

    let plaintext = zeroize::Zeroizing::new(open(scheduler, &event.pubkey, &event.content)?);
    let json = std::str::from_utf8(&plaintext)
        .map_err(|e| EnvelopeError::InvalidPayload(e.to_string()))?;
    Instruction::from_json(json)
}
