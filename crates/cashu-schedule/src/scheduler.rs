//! The scheduling session.
//!
//! A [`Scheduler`] owns everything one user session needs: the active
//! sender identity, the active recipient, the rate-limiter window, the
//! envelope builder and a publisher. Scheduling takes `&mut self`, so one
//! request completes before the next begins.
//!
//! Pipeline: rate limit → validate → seal → sign → publish.

use std::time::Instant;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use cashu_schedule_core::{
    sign_event, validate_request, Event, EventId, Keys, PublicKey, Timestamp,
};
use cashu_schedule_envelope::EnvelopeBuilder;
use cashu_schedule_relay::{
    FanoutPublisher, PublishOutcome, PublishReport, Publisher, RelayUrl, WebSocketRelayClient,
};

use crate::config::SchedulerConfig;
use crate::error::{Result, ScheduleError};
use crate::rate_limiter::RateLimiter;

/// A signed instruction event, not yet published.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub event: Event,
    /// The `d` tag value.
    pub request_id: Uuid,
    /// When the scheduler service will release the inner message.
    pub target: Timestamp,
    /// Public half of the one-time identity that authored the inner message.
    pub ephemeral_pubkey: PublicKey,
}

impl ScheduledEvent {
    pub fn id(&self) -> EventId {
        self.event.id
    }
}

/// A scheduled event together with how publishing went.
#[derive(Debug, Clone)]
pub struct ScheduleReceipt {
    pub scheduled: ScheduledEvent,
    pub report: PublishReport,
}

impl ScheduleReceipt {
    pub fn outcome(&self) -> PublishOutcome {
        self.report.outcome()
    }

    pub fn event(&self) -> &Event {
        &self.scheduled.event
    }
}

/// Scheduler session over a [`Publisher`].
pub struct Scheduler<P: Publisher> {
    /// Active sender identity.
    identity: Option<Keys>,
    /// Active recipient, as the user entered it.
    recipient: Option<String>,
    builder: EnvelopeBuilder,
    relays: Vec<RelayUrl>,
    limiter: RateLimiter,
    publisher: P,
    config: SchedulerConfig,
}

impl Scheduler<FanoutPublisher<WebSocketRelayClient>> {
    /// Create a session that publishes over WebSockets with the configured
    /// timeouts.
    pub fn connect(config: SchedulerConfig) -> Result<Self> {
        let client = WebSocketRelayClient::new(config.publish.ack_timeout());
        let publisher = FanoutPublisher::new(client).with_timeout(config.publish.timeout());
        Self::new(config, publisher)
    }
}

impl<P: Publisher> Scheduler<P> {
    /// Create a session. The configuration must name a scheduler service.
    pub fn new(config: SchedulerConfig, publisher: P) -> Result<Self> {
        config.validate()?;
        let scheduler = config.scheduler_key()?;
        let relays = config.relay_urls()?;

        let builder = EnvelopeBuilder::new(scheduler)
            .label(config.label.clone())
            .format(config.cipher);

        Ok(Self {
            identity: None,
            recipient: None,
            builder,
            relays,
            limiter: RateLimiter::from_config(&config.rate_limit),
            publisher,
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn relays(&self) -> &[RelayUrl] {
        &self.relays
    }

    /// The scheduler service this session addresses.
    pub fn scheduler_key(&self) -> PublicKey {
        self.builder.scheduler()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session State
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the active identity. The previous one is dropped and erased.
    pub fn set_identity(&mut self, keys: Keys) {
        debug!(pubkey = %keys.public_key(), "identity set");
        self.identity = Some(keys);
    }

    /// Generate and activate a fresh identity.
    pub fn generate_identity(&mut self) -> Result<PublicKey> {
        let keys = Keys::generate()?;
        let public_key = keys.public_key();
        self.set_identity(keys);
        Ok(public_key)
    }

    /// Load and activate an identity from `nsec1…` or 64-hex.
    pub fn load_identity(&mut self, secret: &str) -> Result<PublicKey> {
        let keys = Keys::parse(secret)?;
        let public_key = keys.public_key();
        self.set_identity(keys);
        Ok(public_key)
    }

    pub fn identity(&self) -> Option<&Keys> {
        self.identity.as_ref()
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        self.identity.as_ref().map(Keys::public_key)
    }

    /// Set the recipient, `npub1…` or 64-hex. Checked when scheduling.
    pub fn set_recipient(&mut self, recipient: impl Into<String>) {
        let recipient = recipient.into();
        debug!(recipient = %recipient, "recipient set");
        self.recipient = Some(recipient);
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scheduling
    // ─────────────────────────────────────────────────────────────────────────

    /// Build and sign an instruction event without publishing it.
    pub fn prepare(&mut self, token: &str, delay_minutes: i64) -> Result<ScheduledEvent> {
        self.prepare_with(
            token,
            delay_minutes,
            Timestamp::now(),
            Instant::now(),
            &mut OsRng,
        )
    }

    /// [`prepare`](Self::prepare) with explicit clock readings and entropy
    /// source. `now` dates the event and its target; `instant` is what the
    /// rate-limiter window is measured against.
    pub fn prepare_with<R>(
        &mut self,
        token: &str,
        delay_minutes: i64,
        now: Timestamp,
        instant: Instant,
        rng: &mut R,
    ) -> Result<ScheduledEvent>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        if let Err(retry_after) = self.limiter.try_acquire_at(instant) {
            warn!(retry_after_secs = retry_after.as_secs(), "rate limited");
            return Err(ScheduleError::RateLimited { retry_after });
        }

        let request = validate_request(
            self.identity.as_ref(),
            self.recipient.as_deref(),
            token,
            delay_minutes,
        )?;

        let sealed = self.builder.build_with(&request, now, rng)?;
        let event = sign_event(sealed.event, self.identity.as_ref(), rng)?;

        info!(
            event_id = %event.id,
            request_id = %sealed.request_id,
            target = %sealed.target,
            "instruction prepared"
        );

        Ok(ScheduledEvent {
            event,
            request_id: sealed.request_id,
            target: sealed.target,
            ephemeral_pubkey: sealed.ephemeral_pubkey,
        })
    }

    /// Prepare an instruction event and publish it to the configured relays.
    ///
    /// A publish that no relay accepts still returns `Ok`; check
    /// [`ScheduleReceipt::outcome`] and [`republish`](Self::republish) the
    /// same event to retry.
    pub async fn schedule(&mut self, token: &str, delay_minutes: i64) -> Result<ScheduleReceipt> {
        let scheduled = self.prepare(token, delay_minutes)?;
        let report = self.publish(&scheduled.event).await;
        Ok(ScheduleReceipt { scheduled, report })
    }

    /// Publish an already signed event again. Its id does not change.
    pub async fn republish(&self, event: &Event) -> PublishReport {
        debug!(event_id = %event.id, "republishing");
        self.publish(event).await
    }

    async fn publish(&self, event: &Event) -> PublishReport {
        self.publisher.publish(event, &self.relays).await
    }
}
