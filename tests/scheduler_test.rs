//! Recurring task scheduling against the in-memory broker.

mod common;

use std::sync::Arc;

use common::*;
use dmq_core::broker::{Broker, InMemoryBroker, RepeatSpec};
use dmq_core::config::DmqConfig;
use dmq_core::scheduler::{ScheduleOptions, SchedulerError, TaskScheduler};

fn scheduler(broker: Arc<InMemoryBroker>) -> TaskScheduler {
    let config = DmqConfig {
        namespace_suffix: "test".to_string(),
        ..DmqConfig::default()
    };
    TaskScheduler::from_config(broker, &config)
}

#[tokio::test]
async fn test_scheduling_same_payload_twice_leaves_one_registration() {
    let broker = Arc::new(InMemoryBroker::new());
    let scheduler = scheduler(broker.clone());
    let task = report_task("daily");
    let options = ScheduleOptions::cron("0 6 * * *").with_time_zone("UTC");

    scheduler.schedule_every(task.envelope(), &options).await.unwrap();
    scheduler.schedule_every(task.envelope(), &options).await.unwrap();

    let registrations = broker
        .list_recurring_registrations(scheduler.queue())
        .await
        .unwrap();
    assert_eq!(scheduler.queue(), "dmq-tasks-test");
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].pattern(), Some("0 6 * * *"));
}

#[tokio::test]
async fn test_rebuilt_task_reuses_its_slot() {
    let broker = Arc::new(InMemoryBroker::new());
    let scheduler = scheduler(broker);

    // a rebuilt envelope has a new id and time but identical content
    let first = scheduler
        .schedule_every(report_task("weekly").envelope(), &ScheduleOptions::every("P1W"))
        .await
        .unwrap();
    let second = scheduler
        .schedule_every(report_task("weekly").envelope(), &ScheduleOptions::every("P1W"))
        .await
        .unwrap();

    assert_eq!(first.dedup_id, second.dedup_id);
    assert_eq!(second.replaced.len(), 1);
    assert_eq!(second.repeat, RepeatSpec::every(7 * 24 * 60 * 60 * 1_000));

    let schedules = scheduler.list_schedules().await.unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].interval_ms(), Some(604_800_000));
    assert_eq!(schedules[0].name, format!("{REPORT_TASK}:P1W"));
}

#[tokio::test]
async fn test_same_name_replaces_different_payload() {
    let broker = Arc::new(InMemoryBroker::new());
    let scheduler = scheduler(broker);
    let options = ScheduleOptions::every("PT30M").with_name("report-refresh");

    scheduler
        .schedule_every(report_task("v1").envelope(), &options)
        .await
        .unwrap();
    let current = scheduler
        .schedule_every(report_task("v2").envelope(), &options)
        .await
        .unwrap();

    let schedules = scheduler.list_schedules().await.unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].job_id, current.dedup_id);
}

#[tokio::test]
async fn test_violations_are_collected_and_nothing_is_installed() {
    let broker = Arc::new(InMemoryBroker::new());
    let scheduler = scheduler(broker);
    let options = ScheduleOptions {
        frequency: Some("PT5M".to_string()),
        time_zone: Some("Europe/Paris".to_string()),
        end_at: Some("soon".to_string()),
        ..ScheduleOptions::default()
    };

    let error = scheduler
        .schedule_every(report_task("daily").envelope(), &options)
        .await
        .unwrap_err();

    let SchedulerError::ScheduleViolations { violations } = &error else {
        panic!("expected schedule violations, got {error:?}");
    };
    assert!(violations.has_rule("timeZone", "pattern_only"));
    assert!(violations.has_rule("endAt", "pattern_only"));
    assert!(violations.has_rule("endAt", "format"));
    assert!(error.to_string().contains("; "));
    assert!(scheduler.list_schedules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cron_window_and_time_zone() {
    let broker = Arc::new(InMemoryBroker::new());
    let scheduler = scheduler(broker);
    let options = ScheduleOptions::cron("30 8 * * *")
        .with_time_zone("America/New_York")
        .with_start_at("2031-01-01T00:00:00Z")
        .with_end_at("2031-12-31T00:00:00Z");

    let scheduled = scheduler
        .schedule_every(report_task("morning").envelope(), &options)
        .await
        .unwrap();

    match &scheduled.repeat {
        RepeatSpec::Cron { tz, start_date, end_date, .. } => {
            assert_eq!(tz, "America/New_York");
            assert!(start_date.is_some());
            assert!(end_date.is_some());
        }
        other => panic!("expected cron repeat, got {other:?}"),
    }
    assert!(scheduled.name.starts_with(&format!("{REPORT_TASK}:30 8 * * * E")));
    let next = scheduled.next_fire_time.unwrap();
    assert_eq!(next.to_rfc3339(), "2031-01-01T13:30:00+00:00");
}

#[tokio::test]
async fn test_frequency_beyond_calendar_range_is_rejected_not_installed() {
    let broker = Arc::new(InMemoryBroker::new());
    let scheduler = scheduler(broker);

    let error = scheduler
        .schedule_every(report_task("forever").envelope(), &ScheduleOptions::every("P1000000Y"))
        .await
        .unwrap_err();

    let SchedulerError::ScheduleViolations { violations } = &error else {
        panic!("expected schedule violations, got {error:?}");
    };
    assert!(violations.has_rule("frequency", "range"));
    assert!(scheduler.list_schedules().await.unwrap().is_empty());
}
