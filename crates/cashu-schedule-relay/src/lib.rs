//! # Cashu Schedule Relay
//!
//! Publishing signed instruction events to Nostr relays.
//!
//! ## Overview
//!
//! A [`Publisher`] fans one event out to a set of relay endpoints and
//! reports how many accepted it. The fan-out is concurrent and bounded by a
//! single timeout; endpoints complete independently and out of order.
//!
//! ## Outcomes
//!
//! - **Delivered**: every endpoint accepted
//! - **Degraded**: at least one, but not every, endpoint accepted
//! - **DeliveryUncertain**: none accepted in time; a warning, not an error
//!
//! Event ids are fixed once signed, so republishing the same event is the
//! retry path and is idempotent on relays.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cashu_schedule_relay::{
//!     default_relays, FanoutPublisher, Publisher, WebSocketRelayClient,
//! };
//!
//! async fn example(event: cashu_schedule_core::Event) {
//!     let publisher = FanoutPublisher::new(WebSocketRelayClient::default());
//!     let report = publisher.publish(&event, &default_relays()).await;
//!     println!("{:?}", report.outcome());
//! }
//! ```

pub mod error;
pub mod messages;
pub mod publisher;
pub mod transport;
pub mod url;

pub use error::{RelayError, Result};
pub use messages::{ClientMessage, RelayMessage};
pub use publisher::{
    FanoutPublisher, PublishOutcome, PublishReport, Publisher, DEFAULT_PUBLISH_TIMEOUT,
};
pub use transport::{
    memory::MemoryRelayPool, memory::RelayBehaviour, RelayAck, RelayClient, WebSocketRelayClient,
};
pub use url::{default_relays, RelayUrl, DEFAULT_RELAYS};
