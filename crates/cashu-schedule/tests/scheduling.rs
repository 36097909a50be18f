//! End-to-end scheduling through a [`Scheduler`] and in-memory relays.

use std::time::Duration;

use cashu_schedule::core::KeySide;
use cashu_schedule::{
    open_instruction, FanoutPublisher, MemoryRelayPool, PublishOutcome, RelayBehaviour,
    ScheduleError, Scheduler, SchedulerConfig, Timestamp,
};
use cashu_schedule_testkit::{relay_pool, TestFixture, SAMPLE_TOKEN};

type MemoryScheduler = Scheduler<FanoutPublisher<MemoryRelayPool>>;

async fn session(
    fixture: &TestFixture,
    behaviours: &[RelayBehaviour],
) -> (MemoryScheduler, MemoryRelayPool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("cashu_schedule=debug")
        .with_test_writer()
        .try_init();

    let (pool, urls) = relay_pool(behaviours).await;
    let config = SchedulerConfig {
        scheduler_pubkey: Some(fixture.scheduler_key().to_bech32().unwrap()),
        relays: urls.iter().map(ToString::to_string).collect(),
        ..SchedulerConfig::default()
    };
    let publisher = FanoutPublisher::new(pool.clone()).with_timeout(Duration::from_millis(200));

    let mut scheduler = Scheduler::new(config, publisher).unwrap();
    scheduler.set_identity(fixture.sender.clone());
    scheduler.set_recipient(fixture.recipient.public_key().to_bech32().unwrap());
    (scheduler, pool)
}

#[tokio::test]
async fn test_recipient_recovers_token() {
    let fixture = TestFixture::new();
    let (mut scheduler, pool) = session(&fixture, &[RelayBehaviour::Accept]).await;

    let receipt = scheduler.schedule(SAMPLE_TOKEN, 30).await.unwrap();
    assert_eq!(receipt.outcome(), PublishOutcome::Delivered { accepted: 1 });

    // What the relay holds is what the scheduler service will read.
    let stored = pool.events(&scheduler.relays()[0]).await;
    let instruction = open_instruction(&stored[0], &fixture.scheduler).unwrap();
    let inner = instruction.inner_message().unwrap();

    assert_eq!(inner.recipient().unwrap(), fixture.recipient.public_key());
    let token = inner.open_token(&fixture.recipient).unwrap();
    assert_eq!(token.as_str(), SAMPLE_TOKEN);
}

#[tokio::test]
async fn test_instruction_target_and_ephemeral_key() {
    let fixture = TestFixture::new();
    let (mut scheduler, _pool) = session(&fixture, &[RelayBehaviour::Accept]).await;

    let before = Timestamp::now();
    let scheduled = scheduler.prepare(SAMPLE_TOKEN, 90).unwrap();
    let after = Timestamp::now();

    let instruction = fixture.open(&scheduled.event).unwrap();
    let target = instruction.target_send_timestamp;
    assert!(target >= before.as_secs() + 90 * 60);
    assert!(target <= after.as_secs() + 90 * 60 + 1);
    assert_eq!(Timestamp(target), scheduled.target);
    assert_eq!(
        scheduled.event.tag_value("start"),
        Some(target.to_string().as_str())
    );

    let ephemeral = instruction.ephemeral_keys().unwrap();
    let inner = instruction.inner_message().unwrap();
    assert_eq!(ephemeral.public_key(), inner.sender());
    assert_eq!(ephemeral.public_key(), scheduled.ephemeral_pubkey);
    assert_ne!(ephemeral.public_key(), fixture.sender.public_key());
    assert_eq!(inner.as_unsigned().created_at, Timestamp::ZERO);
}

#[tokio::test]
async fn test_identical_inputs_produce_distinct_events() {
    let fixture = TestFixture::new();
    let (mut scheduler, _pool) = session(&fixture, &[RelayBehaviour::Accept]).await;

    let first = scheduler.prepare(SAMPLE_TOKEN, 10).unwrap();
    let second = scheduler.prepare(SAMPLE_TOKEN, 10).unwrap();

    assert_ne!(first.id(), second.id());
    assert_ne!(first.request_id, second.request_id);
    assert_ne!(first.ephemeral_pubkey, second.ephemeral_pubkey);
}

#[tokio::test]
async fn test_validation_failures_surface() {
    let fixture = TestFixture::new();
    let (mut scheduler, _pool) = session(&fixture, &[RelayBehaviour::Accept]).await;

    let short = "cashuA1234567890abcd";
    assert_eq!(short.len(), 20);
    assert!(matches!(
        scheduler.prepare(&short[..19], 10),
        Err(ScheduleError::InvalidToken(_))
    ));
    assert!(matches!(
        scheduler.prepare(SAMPLE_TOKEN, 0),
        Err(ScheduleError::InvalidDelay(0))
    ));
    assert!(matches!(
        scheduler.prepare(SAMPLE_TOKEN, 525_601),
        Err(ScheduleError::InvalidDelay(525_601))
    ));

    scheduler.set_recipient("not-a-key");
    assert!(matches!(
        scheduler.prepare(SAMPLE_TOKEN, 10),
        Err(ScheduleError::MalformedKey {
            side: KeySide::Recipient,
            ..
        })
    ));

    // Fresh session so the attempts above do not count against its limit.
    let mut fresh = session(&fixture, &[RelayBehaviour::Accept]).await.0;
    fresh.set_recipient(fixture.sender.public_key().to_hex());
    assert!(matches!(
        fresh.prepare(SAMPLE_TOKEN, 10),
        Err(ScheduleError::SelfDeliveryRejected)
    ));
}

#[tokio::test]
async fn test_sixth_attempt_is_rate_limited() {
    let fixture = TestFixture::new();
    let (mut scheduler, _pool) = session(&fixture, &[RelayBehaviour::Accept]).await;

    for _ in 0..5 {
        scheduler.prepare(SAMPLE_TOKEN, 10).unwrap();
    }
    match scheduler.prepare(SAMPLE_TOKEN, 10) {
        Err(ScheduleError::RateLimited { retry_after }) => {
            assert!(retry_after > Duration::from_secs(590));
            assert!(retry_after <= Duration::from_secs(600));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_degraded_publish() {
    let fixture = TestFixture::new();
    let (mut scheduler, pool) = session(
        &fixture,
        &[
            RelayBehaviour::Accept,
            RelayBehaviour::Reject("blocked".into()),
            RelayBehaviour::Accept,
            RelayBehaviour::Silent,
            RelayBehaviour::Unreachable,
            RelayBehaviour::Reject("auth-required: no".into()),
            RelayBehaviour::Accept,
        ],
    )
    .await;

    let receipt = scheduler.schedule(SAMPLE_TOKEN, 5).await.unwrap();
    assert_eq!(
        receipt.outcome(),
        PublishOutcome::Degraded {
            accepted: 3,
            total: 7
        }
    );
    assert_eq!(pool.holders(&receipt.event().id).await, 3);
}

#[tokio::test]
async fn test_uncertain_publish_then_republish() {
    let fixture = TestFixture::new();
    let behaviours = vec![RelayBehaviour::Unreachable; 7];
    let (mut scheduler, pool) = session(&fixture, &behaviours).await;

    let receipt = scheduler.schedule(SAMPLE_TOKEN, 5).await.unwrap();
    assert_eq!(
        receipt.outcome(),
        PublishOutcome::DeliveryUncertain { total: 7 }
    );

    for url in scheduler.relays() {
        pool.set_behaviour(url, RelayBehaviour::Accept).await;
    }
    let report = scheduler.republish(receipt.event()).await;
    assert_eq!(report.event_id, receipt.event().id);
    assert_eq!(report.outcome(), PublishOutcome::Delivered { accepted: 7 });
}
