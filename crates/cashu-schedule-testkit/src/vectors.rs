//! Golden test vectors for deterministic verification.
//!
//! Key encodings, event ids and NIP-44 payloads that any Nostr
//! implementation must reproduce byte for byte.

use cashu_schedule_core::{compute_event_id, nip19, Kind, PublicKey, Tag, Timestamp};
use cashu_schedule_envelope::nip44::{encrypt_with_nonce, ConversationKey};
use cashu_schedule_envelope::shared_secret;

use crate::fixtures::small_secret;

/// Secret scalar to x-only public key.
#[derive(Debug, Clone)]
pub struct KeyVector {
    pub name: &'static str,
    pub secret: u8,
    pub public_hex: &'static str,
}

/// Hex key to bech32 identifier.
#[derive(Debug, Clone)]
pub struct Nip19Vector {
    pub name: &'static str,
    /// `"npub"` or `"nsec"`.
    pub hrp: &'static str,
    pub hex: &'static str,
    pub bech32: &'static str,
}

/// Event fields to expected id.
#[derive(Debug, Clone)]
pub struct EventIdVector {
    pub name: &'static str,
    pub pubkey: &'static str,
    pub created_at: u64,
    pub kind: u16,
    pub tags: &'static [&'static [&'static str]],
    pub content: &'static str,
    pub expected_id: &'static str,
}

/// Conversation between two small secrets, fixed nonce.
#[derive(Debug, Clone)]
pub struct Nip44Vector {
    pub name: &'static str,
    pub sender_secret: u8,
    pub recipient_secret: u8,
    pub conversation_key: &'static str,
    pub nonce: [u8; 32],
    pub plaintext: &'static str,
    pub payload: &'static str,
}

const G_X: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
const TWO_G_X: &str = "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

pub fn key_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "secret 1 is the generator",
            secret: 1,
            public_hex: G_X,
        },
        KeyVector {
            name: "secret 2",
            secret: 2,
            public_hex: TWO_G_X,
        },
    ]
}

pub fn nip19_vectors() -> Vec<Nip19Vector> {
    vec![
        Nip19Vector {
            name: "NIP-19 npub example",
            hrp: "npub",
            hex: "7e7e9c42a91bfef19fa929e5fda1b72e0ebc1a4c1141673e2794234d86addf4e",
            bech32: "npub10elfcs4fr0l0r8af98jlmgdh9c8tcxjvz9qkw038js35mp4dma8qzvjptg",
        },
        Nip19Vector {
            name: "NIP-19 nsec example",
            hrp: "nsec",
            hex: "67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa",
            bech32: "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5",
        },
        Nip19Vector {
            name: "generator npub",
            hrp: "npub",
            hex: G_X,
            bech32: "npub10xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqpkge6d",
        },
        Nip19Vector {
            name: "secret 1 nsec",
            hrp: "nsec",
            hex: "0000000000000000000000000000000000000000000000000000000000000001",
            bech32: "nsec1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqsmhltgl",
        },
    ]
}

pub fn event_id_vectors() -> Vec<EventIdVector> {
    vec![
        EventIdVector {
            name: "plain note",
            pubkey: G_X,
            created_at: 1_736_870_400,
            kind: 1,
            tags: &[],
            content: "hello",
            expected_id: "8e56558c8d141f05aff39d05f7803d0d4ef53f59193afe3f27511df6affe6e59",
        },
        EventIdVector {
            name: "inner message shape with escaped content",
            pubkey: G_X,
            created_at: 0,
            kind: 4,
            tags: &[&["p", TWO_G_X]],
            content: "line1\nline2 \"quoted\" \\ é",
            expected_id: "cb633609b2597b77d0262aca3ba1e507d4d0f91c72dc2b1f9f00a94c701a10bb",
        },
        EventIdVector {
            name: "instruction tag layout",
            pubkey: G_X,
            created_at: 1_736_870_400,
            kind: 31923,
            tags: &[
                &["d", "00000000-0000-4000-8000-000000000000"],
                &["name", "Scheduled delivery"],
                &["start", "1736874000"],
                &["p", TWO_G_X],
                &["t", "cashu_schedule_instruction_nip52_v1"],
            ],
            content: "sealed",
            expected_id: "f84ab89793a0452c0220fc2ed326f43a5e499a673129bd65f5f071d56908b68a",
        },
    ]
}

pub fn nip44_vectors() -> Vec<Nip44Vector> {
    let mut nonce = [0u8; 32];
    nonce[31] = 1;
    vec![Nip44Vector {
        name: "single byte between secrets 1 and 2",
        sender_secret: 1,
        recipient_secret: 2,
        conversation_key: "c41c775356fd92eadc63ff5a0dc1da211b268cbea22316767095b2871ea1412d",
        nonce,
        plaintext: "a",
        payload: "AgAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABee0G5VSK0/9YypIObAtDKfYEAjD35uVkHyB0F4DwrcNaCXlCWZKaArsGrY6M9wnuTMxWfp1RTN9Xga8no+kF5Vsb",
    }]
}

impl EventIdVector {
    pub fn compute(&self) -> Option<String> {
        let pubkey = PublicKey::from_hex(self.pubkey).ok()?;
        let tags: Vec<Tag> = self
            .tags
            .iter()
            .filter_map(|tag| {
                let (name, values) = tag.split_first()?;
                Some(Tag::new(name, values.iter().copied()))
            })
            .collect();
        let id = compute_event_id(
            &pubkey,
            Timestamp(self.created_at),
            Kind(self.kind),
            &tags,
            self.content,
        );
        Some(id.to_hex())
    }
}

impl Nip44Vector {
    pub fn conversation(&self) -> Option<ConversationKey> {
        let sender = small_secret(self.sender_secret);
        let recipient = small_secret(self.recipient_secret);
        let shared = shared_secret(&sender, &recipient.public_key()).ok()?;
        Some(ConversationKey::from_shared(&shared))
    }

    pub fn compute(&self) -> Option<String> {
        let conversation = self.conversation()?;
        encrypt_with_nonce(&conversation, self.plaintext.as_bytes(), &self.nonce).ok()
    }
}

/// Check every vector. Returns `(name, matches, actual)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let mut results = Vec::new();

    for v in key_vectors() {
        let actual = small_secret(v.secret).public_key().to_hex();
        results.push((v.name.to_string(), actual == v.public_hex, actual));
    }

    for v in nip19_vectors() {
        let mut bytes = [0u8; 32];
        let actual = hex::decode_to_slice(v.hex, &mut bytes)
            .ok()
            .and_then(|_| match v.hrp {
                "npub" => nip19::encode_npub(&bytes).ok(),
                _ => nip19::encode_nsec(&bytes).ok(),
            })
            .unwrap_or_default();
        results.push((v.name.to_string(), actual == v.bech32, actual));
    }

    for v in event_id_vectors() {
        let actual = v.compute().unwrap_or_default();
        results.push((v.name.to_string(), actual == v.expected_id, actual));
    }

    for v in nip44_vectors() {
        let key = v
            .conversation()
            .map(|k| hex::encode(k.as_bytes()))
            .unwrap_or_default();
        let payload = v.compute().unwrap_or_default();
        let ok = key == v.conversation_key && payload == v.payload;
        results.push((v.name.to_string(), ok, payload));
    }

    results
}
