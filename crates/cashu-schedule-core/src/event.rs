//! Events: the unit that travels over relays.
//!
//! An [`UnsignedEvent`] carries every field covered by the id. Signing turns
//! it into an [`Event`], which is immutable: any change produces a new id.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_event_json, compute_event_id};
use crate::crypto::{Keys, PublicKey, Signature};
use crate::error::CoreError;
use crate::types::{EventId, Kind, Timestamp};

/// An ordered list of strings; the first element names the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Vec<String>);

impl Tag {
    /// Build a tag from its name and values.
    pub fn new<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = vec![name.to_string()];
        fields.extend(values.into_iter().map(Into::into));
        Self(fields)
    }

    /// `["d", <identifier>]`
    pub fn identifier(id: impl Into<String>) -> Self {
        Self::new("d", [id.into()])
    }

    /// `["p", <pubkey hex>]`
    pub fn public_key(pubkey: &PublicKey) -> Self {
        Self::new("p", [pubkey.to_hex()])
    }

    /// `["t", <topic>]`
    pub fn hashtag(topic: impl Into<String>) -> Self {
        Self::new("t", [topic.into()])
    }

    /// The tag name (first element).
    pub fn name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// The first value (second element).
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// An event with every id-covered field, not yet signed.
///
/// Field order matches the wire JSON: pubkey, kind, created_at, tags, content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: PublicKey,
    pub kind: Kind,
    pub created_at: Timestamp,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    /// Compute the content-addressed id.
    pub fn compute_id(&self) -> EventId {
        compute_event_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    /// The canonical string the id is computed over.
    pub fn canonical_json(&self) -> String {
        canonical_event_json(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    /// Value of the first tag with the given name.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        find_tag(&self.tags, name)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// Sign with the author's keys, drawing auxiliary randomness from `rng`.
    pub fn sign_with<R>(self, keys: &Keys, rng: &mut R) -> Result<Event, CoreError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        if keys.public_key() != self.pubkey {
            return Err(CoreError::KeyMismatch);
        }
        let id = self.compute_id();
        let sig = keys.sign_digest(id.as_bytes(), rng)?;
        Ok(Event {
            id,
            pubkey: self.pubkey,
            kind: self.kind,
            created_at: self.created_at,
            tags: self.tags,
            content: self.content,
            sig,
        })
    }
}

/// A signed event in its network wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub pubkey: PublicKey,
    pub kind: Kind,
    pub created_at: Timestamp,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: Signature,
}

impl Event {
    /// Check that the id matches the content and the signature matches the id.
    pub fn verify(&self) -> Result<(), CoreError> {
        let computed = compute_event_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        );
        if computed != self.id {
            return Err(CoreError::IdMismatch {
                expected: computed.to_hex(),
                actual: self.id.to_hex(),
            });
        }
        self.pubkey.verify(self.id.as_bytes(), &self.sig)
    }

    /// Value of the first tag with the given name.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        find_tag(&self.tags, name)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Parse from JSON. Does not verify; call [`Event::verify`].
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

fn find_tag<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.name() == Some(name))
        .and_then(Tag::value)
}

/// Builder for creating events.
pub struct EventBuilder {
    kind: Kind,
    created_at: Option<Timestamp>,
    tags: Vec<Tag>,
    content: String,
}

impl EventBuilder {
    /// Start building an event.
    pub fn new(kind: Kind, content: impl Into<String>) -> Self {
        Self {
            kind,
            created_at: None,
            tags: Vec::new(),
            content: content.into(),
        }
    }

    /// Set created_at. Defaults to the current time.
    pub fn created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Append a tag.
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Append several tags in order.
    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Finish with the given author.
    pub fn build(self, pubkey: PublicKey) -> UnsignedEvent {
        UnsignedEvent {
            pubkey,
            kind: self.kind,
            created_at: self.created_at.unwrap_or_else(Timestamp::now),
            tags: self.tags,
            content: self.content,
        }
    }
}
