//! Relay transport abstraction.
//!
//! A [`RelayClient`] hands one event to one relay and reports the relay's
//! answer. [`WebSocketRelayClient`] speaks NIP-01 over WebSockets; the
//! [`memory`] module provides an in-process relay set for tests and dry runs.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::time::{timeout_at, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use cashu_schedule_core::Event;

use crate::error::{RelayError, Result};
use crate::messages::{ClientMessage, RelayMessage};
use crate::url::RelayUrl;

/// A relay's answer to a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAck {
    pub accepted: bool,
    pub message: String,
}

impl RelayAck {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
        }
    }
}

/// Sends events to individual relays.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Send `event` to `relay` and wait for its acknowledgement.
    async fn send_event(&self, relay: &RelayUrl, event: &Event) -> Result<RelayAck>;
}

/// NIP-01 client over WebSockets. Opens one connection per send.
#[derive(Debug, Clone)]
pub struct WebSocketRelayClient {
    ack_timeout: Duration,
}

impl WebSocketRelayClient {
    pub fn new(ack_timeout: Duration) -> Self {
        Self { ack_timeout }
    }
}

impl Default for WebSocketRelayClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(8))
    }
}

#[async_trait]
impl RelayClient for WebSocketRelayClient {
    async fn send_event(&self, relay: &RelayUrl, event: &Event) -> Result<RelayAck> {
        let deadline = Instant::now() + self.ack_timeout;

        let (mut ws, _) = timeout_at(deadline, connect_async(relay.as_str()))
            .await
            .map_err(|_| RelayError::Timeout(format!("connecting to {relay}")))?
            .map_err(|e| RelayError::ConnectionFailed {
                url: relay.to_string(),
                reason: e.to_string(),
            })?;

        let frame = ClientMessage::Event(event).to_json()?;
        ws.send(Message::Text(frame))
            .await
            .map_err(|e| RelayError::TransportError(e.to_string()))?;

        let result = loop {
            let message = match timeout_at(deadline, ws.next()).await {
                Err(_) => break Err(RelayError::Timeout(format!("no OK from {relay}"))),
                Ok(None) => break Err(RelayError::TransportError("connection closed".into())),
                Ok(Some(Err(e))) => break Err(RelayError::TransportError(e.to_string())),
                Ok(Some(Ok(message))) => message,
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => {
                    break Err(RelayError::TransportError("relay closed connection".into()))
                }
                _ => continue,
            };

            match RelayMessage::from_json(&text) {
                Ok(RelayMessage::Ok {
                    event_id,
                    accepted,
                    message,
                }) if event_id == event.id => break Ok(RelayAck { accepted, message }),
                Ok(RelayMessage::Notice(notice)) => {
                    debug!(relay = %relay, notice = %notice, "relay notice");
                }
                Ok(_) => {}
                Err(e) => debug!(relay = %relay, error = %e, "ignoring unparseable frame"),
            }
        };

        let _ = ws.close(None).await;
        result
    }
}

/// In-memory relays for testing.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use cashu_schedule_core::EventId;

    /// How a simulated relay answers.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RelayBehaviour {
        /// Store the event and answer OK true.
        Accept,
        /// Answer OK false with this message.
        Reject(String),
        /// Never answer.
        Silent,
        /// Refuse the connection.
        Unreachable,
    }

    #[derive(Debug)]
    struct MemoryRelay {
        behaviour: RelayBehaviour,
        events: Vec<Event>,
    }

    /// A set of simulated relays keyed by URL.
    ///
    /// Clones share state, so a pool can be handed to a publisher and
    /// inspected afterwards.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryRelayPool {
        relays: Arc<RwLock<HashMap<RelayUrl, MemoryRelay>>>,
    }

    impl MemoryRelayPool {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add (or replace) a relay.
        pub async fn add_relay(&self, url: RelayUrl, behaviour: RelayBehaviour) {
            self.relays.write().await.insert(
                url,
                MemoryRelay {
                    behaviour,
                    events: Vec::new(),
                },
            );
        }

        /// Change how an existing relay answers.
        pub async fn set_behaviour(&self, url: &RelayUrl, behaviour: RelayBehaviour) {
            if let Some(relay) = self.relays.write().await.get_mut(url) {
                relay.behaviour = behaviour;
            }
        }

        /// Events a relay has stored.
        pub async fn events(&self, url: &RelayUrl) -> Vec<Event> {
            self.relays
                .read()
                .await
                .get(url)
                .map(|relay| relay.events.clone())
                .unwrap_or_default()
        }

        /// Number of relays holding an event.
        pub async fn holders(&self, id: &EventId) -> usize {
            self.relays
                .read()
                .await
                .values()
                .filter(|relay| relay.events.iter().any(|e| &e.id == id))
                .count()
        }
    }

    #[async_trait]
    impl RelayClient for MemoryRelayPool {
        async fn send_event(&self, relay: &RelayUrl, event: &Event) -> Result<RelayAck> {
            let behaviour = {
                let mut relays = self.relays.write().await;
                let entry = relays.get_mut(relay).ok_or_else(|| RelayError::ConnectionFailed {
                    url: relay.to_string(),
                    reason: "no such relay".into(),
                })?;

                if entry.behaviour == RelayBehaviour::Accept {
                    if entry.events.iter().any(|e| e.id == event.id) {
                        return Ok(RelayAck::accepted("duplicate: already have this event"));
                    }
                    if event.verify().is_err() {
                        return Ok(RelayAck::rejected("invalid: bad id or signature"));
                    }
                    entry.events.push(event.clone());
                }
                entry.behaviour.clone()
            };

            match behaviour {
                RelayBehaviour::Accept => Ok(RelayAck::accepted("")),
                RelayBehaviour::Reject(message) => Ok(RelayAck::rejected(message)),
                RelayBehaviour::Silent => std::future::pending().await,
                RelayBehaviour::Unreachable => Err(RelayError::ConnectionFailed {
                    url: relay.to_string(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }
}
