//! Canonical event serialization for content addressing.
//!
//! An event id is SHA-256 over the UTF-8 bytes of the compact JSON array
//!
//! ```text
//! [0, <pubkey hex>, <created_at>, <kind>, <tags>, <content>]
//! ```
//!
//! with no whitespace and NIP-01 string escaping. `serde_json` emits exactly
//! that form for a `Value`, so the array is built as a `Value` and printed.
//!
//! **CRITICAL**: Changing this layout changes every event id and breaks
//! every signature relays have already seen.

use serde_json::Value;

use crate::crypto::{PublicKey, Sha256Hash};
use crate::event::Tag;
use crate::types::{EventId, Kind, Timestamp};

/// Encode the signed fields of an event to its canonical JSON string.
pub fn canonical_event_json(
    pubkey: &PublicKey,
    created_at: Timestamp,
    kind: Kind,
    tags: &[Tag],
    content: &str,
) -> String {
    let tags = tags
        .iter()
        .map(|tag| {
            Value::Array(
                tag.as_slice()
                    .iter()
                    .map(|s| Value::String(s.clone()))
                    .collect(),
            )
        })
        .collect();

    let value = Value::Array(vec![
        Value::from(0u8),
        Value::String(pubkey.to_hex()),
        Value::from(created_at.as_secs()),
        Value::from(kind.as_u16()),
        Value::Array(tags),
        Value::String(content.to_string()),
    ]);

    value.to_string()
}

/// Compute the content-addressed id of an event.
pub fn compute_event_id(
    pubkey: &PublicKey,
    created_at: Timestamp,
    kind: Kind,
    tags: &[Tag],
    content: &str,
) -> EventId {
    let json = canonical_event_json(pubkey, created_at, kind, tags, content);
    EventId(Sha256Hash::hash(json.as_bytes()).0)
}
