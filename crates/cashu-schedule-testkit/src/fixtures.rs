//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use cashu_schedule_core::{
    validate_request, Keys, PublicKey, ValidatedRequest, ValidationError,
};
use cashu_schedule_envelope::{open_instruction, EnvelopeError, Instruction};
use cashu_schedule_relay::{MemoryRelayPool, RelayBehaviour, RelayUrl};

/// A syntactically valid token. Never redeemable.
pub const SAMPLE_TOKEN: &str =
    "cashuAeyJ0b2tlbiI6W3sibWludCI6Imh0dHBzOi8vbWludC5leGFtcGxlIiwicHJvb2ZzIjpbXX1dfQ";

/// The three parties of a scheduling request.
pub struct TestFixture {
    pub sender: Keys,
    pub recipient: Keys,
    pub scheduler: Keys,
}

impl TestFixture {
    /// Fresh random identities.
    pub fn new() -> Self {
        Self::try_new().expect("operating system RNG available")
    }

    fn try_new() -> Result<Self, cashu_schedule_core::CoreError> {
        Ok(Self {
            sender: Keys::generate()?,
            recipient: Keys::generate()?,
            scheduler: Keys::generate()?,
        })
    }

    /// Deterministic identities with secrets 1, 2 and 3.
    pub fn deterministic() -> Self {
        Self {
            sender: small_secret(1),
            recipient: small_secret(2),
            scheduler: small_secret(3),
        }
    }

    pub fn recipient_hex(&self) -> String {
        self.recipient.public_key().to_hex()
    }

    pub fn scheduler_key(&self) -> PublicKey {
        self.scheduler.public_key()
    }

    /// A validated request for [`SAMPLE_TOKEN`].
    pub fn request(&self, delay_minutes: i64) -> Result<ValidatedRequest<'_>, ValidationError> {
        validate_request(
            Some(&self.sender),
            Some(self.recipient_hex().as_str()),
            SAMPLE_TOKEN,
            delay_minutes,
        )
    }

    /// Open an instruction event the way the scheduler service does.
    pub fn open(
        &self,
        event: &cashu_schedule_core::Event,
    ) -> Result<Instruction, EnvelopeError> {
        open_instruction(event, &self.scheduler)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys whose secret scalar is the integer `n`.
pub fn small_secret(n: u8) -> Keys {
    let mut bytes = [0u8; 32];
    bytes[31] = n.max(1);
    Keys::from_secret_bytes(&bytes).expect("small non-zero scalar is a valid secret")
}

/// An in-memory relay per behaviour, with URLs `wss://relay{i}.test`.
pub async fn relay_pool(behaviours: &[RelayBehaviour]) -> (MemoryRelayPool, Vec<RelayUrl>) {
    let pool = MemoryRelayPool::new();
    let mut urls = Vec::with_capacity(behaviours.len());
    for (i, behaviour) in behaviours.iter().enumerate() {
        let url = RelayUrl::parse(&format!("wss://relay{i}.test")).expect("valid test relay url");
        pool.add_relay(url.clone(), behaviour.clone()).await;
        urls.push(url);
    }
    (pool, urls)
}
