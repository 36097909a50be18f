//! # Cashu Schedule
//!
//! Schedule the delivery of a Cashu bearer token to a Nostr recipient at a
//! future time, without the sender staying online.
//!
//! ## Overview
//!
//! The token is sealed twice:
//!
//! - **Inner message**: a kind-4 direct message from a one-time ephemeral
//!   identity to the recipient, carrying the encrypted token
//! - **Instruction**: the inner message, the target time and the ephemeral
//!   secret, encrypted from the sender to a scheduler service
//!
//! The instruction travels in a signed kind-31923 calendar event published
//! to public relays. At the target time the scheduler service signs the
//! inner message with the ephemeral key and publishes it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cashu_schedule::{Scheduler, SchedulerConfig};
//!
//! async fn example() -> cashu_schedule::Result<()> {
//!     let config = SchedulerConfig::load("cashu-schedule.toml")?;
//!     let mut scheduler = Scheduler::connect(config)?;
//!
//!     scheduler.load_identity("nsec1...")?;
//!     scheduler.set_recipient("npub1...");
//!
//!     let receipt = scheduler.schedule("cashuAeyJ0b2tlbiI6...", 60).await?;
//!     if !receipt.outcome().is_success() {
//!         // Same event, same id.
//!         scheduler.republish(receipt.event()).await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cashu_schedule::core` - keys, events, signing, validation
//! - `cashu_schedule::envelope` - the two sealed layers and the instruction opener
//! - `cashu_schedule::relay` - publishing to relays

pub mod config;
pub mod error;
pub mod rate_limiter;
pub mod scheduler;

// Re-export component crates
pub use cashu_schedule_core as core;
pub use cashu_schedule_envelope as envelope;
pub use cashu_schedule_relay as relay;

pub use config::{ConfigError, PublishConfig, RateLimitConfig, SchedulerConfig};
pub use error::{Result, ScheduleError};
pub use rate_limiter::RateLimiter;
pub use scheduler::{ScheduleReceipt, ScheduledEvent, Scheduler};

// Commonly used types
pub use cashu_schedule_core::{Event, EventId, KeySide, Keys, PublicKey, Timestamp};
pub use cashu_schedule_envelope::{open_instruction, EncryptionFormat, InnerMessage, Instruction};
pub use cashu_schedule_relay::{
    FanoutPublisher, MemoryRelayPool, PublishOutcome, PublishReport, Publisher, RelayBehaviour,
    RelayUrl,
};
