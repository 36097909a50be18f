//! The two plaintexts inside an instruction event.
//!
//! An [`InnerMessage`] is the unsigned kind-4 direct message the scheduler
//! service will eventually sign and publish. Its content is the token sealed
//! from the ephemeral identity to the recipient, so the scheduler can carry it
//! but never read it.
//!
//! An [`Instruction`] is what the scheduler service decrypts: when to deliver,
//! the inner message, and the ephemeral secret needed to sign it.

use std::fmt;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use cashu_schedule_core::{
    BearerToken, EventBuilder, Keys, Kind, PublicKey, Tag, Timestamp, UnsignedEvent,
};

use crate::envelope::{open, seal, EncryptionFormat};
use crate::error::{EnvelopeError, Result};

/// The inner message's `created_at`. Fixed so the recipient layer does not
/// reveal when the instruction was built.
pub const INNER_CREATED_AT: Timestamp = Timestamp::ZERO;

/// Unsigned kind-4 message from the ephemeral identity to the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InnerMessage(UnsignedEvent);

impl InnerMessage {
    /// Seal `token` from `ephemeral` to `recipient`.
    pub fn seal<R>(
        ephemeral: &Keys,
        recipient: &PublicKey,
        token: &BearerToken,
        format: EncryptionFormat,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let content = seal(format, ephemeral, recipient, token.as_str().as_bytes(), rng)?;
        let event = EventBuilder::new(Kind::ENCRYPTED_DIRECT_MESSAGE, content)
            .created_at(INNER_CREATED_AT)
            .tag(Tag::public_key(recipient))
            .build(ephemeral.public_key());
        Ok(Self(event))
    }

    /// The ephemeral public key the message is authored by.
    pub fn sender(&self) -> PublicKey {
        self.0.pubkey
    }

    /// The recipient named by the `p` tag.
    pub fn recipient(&self) -> Result<PublicKey> {
        let hex = self
            .0
            .tag_value("p")
            .ok_or_else(|| EnvelopeError::InvalidPayload("inner message has no p tag".into()))?;
        Ok(PublicKey::from_hex(hex)?)
    }

    pub fn content(&self) -> &str {
        &self.0.content
    }

    pub fn as_unsigned(&self) -> &UnsignedEvent {
        &self.0
    }

    pub fn into_unsigned(self) -> UnsignedEvent {
        self.0
    }

    /// Decrypt the token with the recipient's keys.
    pub fn open_token(&self, recipient: &Keys) -> Result<Zeroizing<String>> {
        let bytes = Zeroizing::new(open(recipient, &self.0.pubkey, &self.0.content)?);
        let token = std::str::from_utf8(&bytes)
            .map_err(|e| EnvelopeError::InvalidPayload(e.to_string()))?;
        Ok(Zeroizing::new(token.to_string()))
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Parse from JSON, checking that it is a kind-4 message.
    pub fn from_json(json: &str) -> Result<Self> {
        let event: UnsignedEvent = serde_json::from_str(json)?;
        if event.kind != Kind::ENCRYPTED_DIRECT_MESSAGE {
            return Err(EnvelopeError::InvalidPayload(format!(
                "inner message must be kind 4, got {}",
                event.kind.as_u16()
            )));
        }
        Ok(Self(event))
    }
}

/// The scheduler-facing plaintext.
///
/// Holds an ephemeral secret key: erased on drop, hidden from `Debug`, and
/// only ever serialized to be sealed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Unix seconds at which the inner message should be published.
    pub target_send_timestamp: u64,

    /// JSON of the [`InnerMessage`].
    pub unsigned_dm_json: String,

    /// Lowercase hex of the ephemeral secret key, no prefix.
    pub ephemeral_nsec_hex: String,
}

impl Instruction {
    pub fn new(target: Timestamp, inner: &InnerMessage, ephemeral: &Keys) -> Result<Self> {
        Ok(Self {
            target_send_timestamp: target.as_secs(),
            unsigned_dm_json: inner.to_json()?,
            ephemeral_nsec_hex: ephemeral.secret_hex(),
        })
    }

    pub fn target(&self) -> Timestamp {
        Timestamp(self.target_send_timestamp)
    }

    /// Parse the embedded inner message.
    pub fn inner_message(&self) -> Result<InnerMessage> {
        InnerMessage::from_json(&self.unsigned_dm_json)
    }

    /// Rebuild the ephemeral identity, which the scheduler uses to sign the
    /// inner message at delivery time.
    pub fn ephemeral_keys(&self) -> Result<Keys> {
        Ok(Keys::from_hex(&self.ephemeral_nsec_hex)?)
    }

    /// Serialize to compact JSON. The buffer is erased when dropped.
    pub fn to_json(&self) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(serde_json::to_string(self)?))
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("target_send_timestamp", &self.target_send_timestamp)
            .field("unsigned_dm_json", &self.unsigned_dm_json)
            .field("ephemeral_nsec_hex", &"<redacted>")
            .finish()
    }
}

impl Drop for Instruction {
    fn drop(&mut self) {
        self.ephemeral_nsec_hex.zeroize();
    }
}
