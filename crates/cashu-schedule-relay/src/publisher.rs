//! Fan-out publishing.
//!
//! An event goes to every endpoint at once. Publishing ends when every
//! endpoint has answered or the overall timeout elapses, whichever comes
//! first; endpoints still pending at that point count as not accepted.
//!
//! The outcome never fails the call. Partial acceptance is degraded success,
//! and zero acceptance is a warning: the event is already signed and can be
//! published again unchanged.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use cashu_schedule_core::{Event, EventId};

use crate::transport::RelayClient;
use crate::url::RelayUrl;

/// Default overall publish timeout.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// How a publish ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Every endpoint accepted.
    Delivered { accepted: usize },
    /// Some, but not all, endpoints accepted.
    Degraded { accepted: usize, total: usize },
    /// No endpoint accepted in time. Not an error: republish the same event.
    DeliveryUncertain { total: usize },
}

impl PublishOutcome {
    pub fn accepted(&self) -> usize {
        match self {
            PublishOutcome::Delivered { accepted } | PublishOutcome::Degraded { accepted, .. } => {
                *accepted
            }
            PublishOutcome::DeliveryUncertain { .. } => 0,
        }
    }

    /// True if at least one endpoint holds the event.
    pub fn is_success(&self) -> bool {
        !matches!(self, PublishOutcome::DeliveryUncertain { .. })
    }
}

/// Per-endpoint results of one publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// The published event.
    pub event_id: EventId,
    /// Number of endpoints targeted.
    pub total: usize,
    /// Endpoints that answered OK true.
    pub accepted: Vec<RelayUrl>,
    /// Endpoints that answered OK false, with their reason.
    pub rejected: Vec<(RelayUrl, String)>,
    /// Endpoints that could not be reached or errored.
    pub failed: Vec<(RelayUrl, String)>,
    /// Endpoints that had not answered when the timeout elapsed.
    pub timed_out: Vec<RelayUrl>,
}

impl PublishReport {
    fn new(event_id: EventId, total: usize) -> Self {
        Self {
            event_id,
            total,
            accepted: Vec::new(),
            rejected: Vec::new(),
            failed: Vec::new(),
            timed_out: Vec::new(),
        }
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn outcome(&self) -> PublishOutcome {
        let accepted = self.accepted_count();
        if accepted == 0 {
            PublishOutcome::DeliveryUncertain { total: self.total }
        } else if accepted >= self.total {
            PublishOutcome::Delivered { accepted }
        } else {
            PublishOutcome::Degraded {
                accepted,
                total: self.total,
            }
        }
    }
}

/// Broadcasts a signed event to a set of endpoints.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: &Event, endpoints: &[RelayUrl]) -> PublishReport;
}

/// Sends to all endpoints concurrently through a [`RelayClient`].
#[derive(Debug, Clone)]
pub struct FanoutPublisher<C: RelayClient> {
    client: C,
    timeout: Duration,
}

impl<C: RelayClient> FanoutPublisher<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Set the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: RelayClient> Publisher for FanoutPublisher<C> {
    async fn publish(&self, event: &Event, endpoints: &[RelayUrl]) -> PublishReport {
        let unique: Vec<&RelayUrl> = {
            let mut seen = HashSet::new();
            endpoints.iter().filter(|url| seen.insert(*url)).collect()
        };
        let mut report = PublishReport::new(event.id, unique.len());
        let deadline = Instant::now() + self.timeout;

        let mut pending: FuturesUnordered<_> = unique
            .iter()
            .copied()
            .map(|url| async move { (url, self.client.send_event(url, event).await) })
            .collect();

        let mut answered: HashSet<&RelayUrl> = HashSet::new();
        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some((url, result))) => {
                    answered.insert(url);
                    match result {
                        Ok(ack) if ack.accepted => {
                            debug!(relay = %url, "accepted");
                            report.accepted.push(url.clone());
                        }
                        Ok(ack) => {
                            debug!(relay = %url, reason = %ack.message, "rejected");
                            report.rejected.push((url.clone(), ack.message));
                        }
                        Err(e) => {
                            debug!(relay = %url, error = %e, "failed");
                            report.failed.push((url.clone(), e.to_string()));
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    debug!(pending = pending.len(), "publish timeout elapsed");
                    break;
                }
            }
        }

        report.timed_out = unique
            .into_iter()
            .filter(|url| !answered.contains(url))
            .cloned()
            .collect();

        match report.outcome() {
            PublishOutcome::Delivered { accepted } => {
                info!(event_id = %event.id, accepted, "published")
            }
            PublishOutcome::Degraded { accepted, total } => {
                warn!(event_id = %event.id, accepted, total, "published to some relays only")
            }
            PublishOutcome::DeliveryUncertain { total } => {
                warn!(event_id = %event.id, total, "no relay accepted the event")
            }
        }

        report
    }
}
