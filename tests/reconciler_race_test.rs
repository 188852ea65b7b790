//! Out-of-order lifecycle delivery: the reconciler converges through
//! deferred retries on the tracking queue.

mod common;

use chrono::{Duration, Utc};
use common::*;
use dmq_core::config::{DmqConfig, ReconcilerConfig};
use dmq_core::store::TrackedJobStore;
use dmq_core::tracking::{
    EventDeliveryPolicy, JobEventEmitter, JobEventKind, ReconcileError, ReconcileOutcome,
    TrackedJobReconciler,
};

fn config() -> DmqConfig {
    DmqConfig {
        namespace_suffix: "race".to_string(),
        ..DmqConfig::default()
    }
}

fn wire(harness: &TestHarness) -> (JobEventEmitter, TrackedJobReconciler) {
    let config = config();
    (
        JobEventEmitter::from_config(harness.broker.clone(), &config),
        TrackedJobReconciler::from_config(harness.store.clone(), harness.broker.clone(), &config),
    )
}

#[tokio::test]
async fn test_completed_before_active_converges() {
    let harness = TestHarness::new();
    let (emitter, reconciler) = wire(&harness);
    let job = JobBuilder::new("job-42").queue("orders-race").build();

    let completed = emitter.emit(JobEventKind::Completed, &job).await.unwrap();
    let active = emitter.emit(JobEventKind::Active, &job).await.unwrap();

    // completed overtakes active
    let outcome = reconciler.handle_event(completed).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Deferred { attempt: 1, .. }));
    assert_eq!(harness.store.tracked_job_count(), 0);

    let created = reconciler.handle_event(active).await.unwrap();
    assert_eq!(created.tracked_job().unwrap().state, "active");

    let later = Utc::now() + Duration::seconds(6);
    let mut applied = None;
    for queued in harness.broker.take_due(reconciler.tracking_queue(), later).await {
        let outcome = reconciler.handle_job(&queued).await.unwrap();
        if queued.data["attempt"] == 1 {
            applied = Some(outcome);
        }
    }

    let tracked = applied.and_then(|outcome| outcome.tracked_job().cloned()).unwrap();
    assert_eq!(tracked.state, "completed");
    assert_eq!(tracked.queue_id, "orders");

    let events = harness.store.list_tracked_job_events(tracked.id).await.unwrap();
    let kinds: Vec<&str> = events.iter().map(|event| event.event.as_str()).collect();
    assert_eq!(kinds, vec!["active", "completed"]);
    assert_eq!(events[1].state_prev.as_deref(), Some("active"));
    assert!(events[0].sort_key < events[1].sort_key);
}

#[tokio::test]
async fn test_tracking_queue_drains_through_handle_job() {
    let harness = TestHarness::new();
    let (emitter, reconciler) = wire(&harness);
    let job = JobBuilder::new("job-7").queue("orders-race").progress(serde_json::json!(25)).build();

    emitter.emit(JobEventKind::Active, &job).await.unwrap();
    emitter.emit(JobEventKind::Progress, &job).await.unwrap();

    let later = Utc::now() + Duration::seconds(2);
    let queued = harness.broker.take_due(reconciler.tracking_queue(), later).await;
    // active is delivered first thanks to its priority
    assert_eq!(queued[0].name, "active");

    let mut last = None;
    for job in &queued {
        last = Some(reconciler.handle_job(job).await.unwrap());
    }

    let tracked = last.and_then(|outcome| outcome.tracked_job().cloned()).unwrap();
    assert_eq!(tracked.metadata["progress"], 0.25);
    assert_eq!(tracked.state, "active");
}

#[tokio::test]
async fn test_uniform_policy_can_be_injected() {
    let harness = TestHarness::new();
    let policy = EventDeliveryPolicy::Uniform {
        delivery: dmq_core::tracking::Delivery {
            priority: 2,
            delay_ms: 0,
        },
    };
    let emitter = JobEventEmitter::new(harness.broker.clone(), "events").with_policy(policy);
    let job = JobBuilder::new("job-9").build();

    emitter.emit(JobEventKind::Failed, &job).await.unwrap();
    let due = harness.broker.take_due("events", Utc::now()).await;
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].priority, 2);
}

#[tokio::test]
async fn test_missing_job_is_abandoned_after_cap() {
    let harness = TestHarness::new();
    let reconciler = TrackedJobReconciler::new(harness.store.clone(), harness.broker.clone(), "events")
        .with_reconciler_config(ReconcilerConfig {
            retry_delay_ms: 100,
            max_attempts: 2,
        });
    let emitter = JobEventEmitter::new(harness.broker.clone(), "producer-events");
    let job = JobBuilder::new("ghost").build();
    let failed = emitter.emit(JobEventKind::Failed, &job).await.unwrap();

    assert!(reconciler.handle_event(failed).await.unwrap().is_deferred());

    let mut now = Utc::now();
    let mut terminal = None;
    for _ in 0..5 {
        now += Duration::seconds(1);
        for queued in harness.broker.take_due("events", now).await {
            match reconciler.handle_job(&queued).await {
                Ok(outcome) => assert!(outcome.is_deferred()),
                Err(error) => terminal = Some(error),
            }
        }
    }

    assert!(matches!(
        terminal,
        Some(ReconcileError::RetriesExhausted { attempts: 2, .. })
    ));
    assert_eq!(harness.store.tracked_job_count(), 0);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let harness = TestHarness::new();
    let (emitter, reconciler) = wire(&harness);

    for tenant in ["tenant-a", "tenant-b"] {
        let job = JobBuilder::new("shared-id").tenant(tenant).build();
        let active = emitter.emit(JobEventKind::Active, &job).await.unwrap();
        reconciler.handle_event(active).await.unwrap();
    }

    assert_eq!(harness.store.tracked_job_count(), 2);
    let a = harness.store.find_tracked_job("tenant-a", "shared-id").await.unwrap().unwrap();
    let b = harness.store.find_tracked_job("tenant-b", "shared-id").await.unwrap().unwrap();
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn test_late_stalled_event_keeps_completed_state() {
    let harness = TestHarness::new();
    let (emitter, reconciler) = wire(&harness);
    let job = JobBuilder::new("job-late").queue("orders-race").build();

    for kind in [JobEventKind::Active, JobEventKind::Completed, JobEventKind::Stalled] {
        let event = emitter.emit(kind, &job).await.unwrap();
        reconciler.handle_event(event).await.unwrap();
    }

    let tracked = harness
        .store
        .find_tracked_job(TENANT, "job-late")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tracked.state, "completed");

    let events = harness.store.list_tracked_job_events(tracked.id).await.unwrap();
    let kinds: Vec<&str> = events.iter().map(|event| event.event.as_str()).collect();
    assert_eq!(kinds, vec!["active", "completed", "stalled"]);
    assert_eq!(events[2].state, "completed");
}

#[tokio::test]
async fn test_deferred_retry_yields_to_active_events() {
    let harness = TestHarness::new();
    let (emitter, reconciler) = wire(&harness);
    let config = config();
    let job = JobBuilder::new("job-slow").queue("orders-race").build();

    let completed = emitter.emit(JobEventKind::Completed, &job).await.unwrap();
    let retry_id = format!("{}-retry-1", completed.job_event_id);
    assert!(reconciler.handle_event(completed).await.unwrap().is_deferred());
    emitter.emit(JobEventKind::Active, &job).await.unwrap();

    let later = Utc::now() + Duration::seconds(6);
    let queued = harness.broker.take_due(reconciler.tracking_queue(), later).await;
    assert_eq!(queued.len(), 3);
    assert_eq!(queued[0].name, "active");
    assert_eq!(queued[0].priority, config.delivery.active_priority);

    let retry = queued.iter().find(|queued| queued.id == retry_id).unwrap();
    assert_eq!(retry.name, "completed");
    assert_eq!(retry.priority, config.delivery.standard_priority);
}
