//! Tests for the instance lifecycle service: creation, activation polling,
//! lookup by address, teardown and firewall removal.

#![allow(clippy::expect_used)]

use std::time::Duration;

use dotd_cli::application::services::instance::{
    CleanupOutcome, await_active, create, find_by_address, remove_firewall, sweep_firewalls,
    teardown, teardown_by_tag,
};
use dotd_cli::domain::{Instance, InstanceSpec, InstanceStatus, RetryPolicy};

use crate::mocks::{FakeCloud, RecordingReporter, ScriptedPrompt, running};

const FAST_ACTIVE: RetryPolicy = RetryPolicy::INSTANCE_ACTIVE.with_interval(Duration::ZERO);

fn spec() -> InstanceSpec {
    InstanceSpec {
        size: "s-1vcpu-1gb".into(),
        image: "docker-20-04".into(),
        name: "box".into(),
        region: "fra1".into(),
        ssh_key: "laptop".into(),
        tag: "dotd".into(),
    }
}

fn pending(id: u64) -> Instance {
    Instance::new(id, "box", InstanceStatus::New, None)
}

// ── create / await_active ─────────────────────────────────────────────────────

#[tokio::test]
async fn create_resolves_key_before_submitting() {
    let cloud = FakeCloud::default();
    let inst = create(&cloud, &spec(), &RecordingReporter::default())
        .await
        .expect("created");
    assert_eq!(inst.status(), InstanceStatus::New);
    let created = cloud.created.borrow();
    assert_eq!(created[0].1, "fp:laptop");
    assert_eq!(created[0].0.tag, "dotd");
}

#[tokio::test]
async fn create_fails_on_unknown_key() {
    let cloud = FakeCloud::default();
    let spec = InstanceSpec {
        ssh_key: "missing".into(),
        ..spec()
    };
    let err = create(&cloud, &spec, &RecordingReporter::default())
        .await
        .expect_err("unknown key");
    assert!(format!("{err:#}").contains("missing"));
    assert!(cloud.created.borrow().is_empty());
}

#[tokio::test]
async fn await_active_stops_on_first_active() {
    let cloud = FakeCloud::default();
    cloud.status_script.borrow_mut().extend([
        InstanceStatus::New,
        InstanceStatus::New,
        InstanceStatus::Active,
        InstanceStatus::Active,
    ]);
    let reporter = RecordingReporter::default();
    let inst = await_active(&cloud, pending(42), FAST_ACTIVE, Duration::ZERO, &reporter).await;
    assert!(inst.is_active());
    assert_eq!(cloud.status_script.borrow().len(), 1);
}

#[tokio::test]
async fn await_active_exhaustion_returns_last_observation() {
    let cloud = FakeCloud::default();
    let reporter = RecordingReporter::default();
    let inst = await_active(&cloud, pending(42), FAST_ACTIVE, Duration::ZERO, &reporter).await;
    assert_eq!(inst.id(), 42);
    assert!(!inst.is_active());
    assert!(reporter.saw("not active after 30 checks"));
}

// ── find_by_address ───────────────────────────────────────────────────────────

#[tokio::test]
async fn find_by_address_walks_pages() {
    let cloud = FakeCloud::with_instances(vec![
        running(1, "10.0.0.1"),
        running(2, "10.0.0.2"),
        running(3, "10.0.0.3"),
    ]);
    cloud.page_size.set(1);
    let found = find_by_address(&cloud, "10.0.0.3").await.expect("listing");
    assert_eq!(found.map(|i| i.id()), Some(3));
}

#[tokio::test]
async fn find_by_address_absent_is_none() {
    let cloud = FakeCloud::with_instances(vec![running(1, "10.0.0.1")]);
    let found = find_by_address(&cloud, "192.0.2.1").await.expect("listing");
    assert!(found.is_none());
}

// ── teardown ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn teardown_swallows_errors() {
    let cloud = FakeCloud::default();
    cloud.fail_deletes.set(true);
    let reporter = RecordingReporter::default();
    teardown(&cloud, 999, &reporter).await;
    assert!(reporter.saw("could not delete droplet 999"));
}

#[tokio::test]
async fn remove_firewall_deletes_by_id() {
    let cloud = FakeCloud::default().with_firewall("fw-1", "dotd-1", &[1]);
    remove_firewall(&cloud, "fw-1", &RecordingReporter::default()).await;
    assert!(cloud.firewalls.borrow().is_empty());
    assert_eq!(*cloud.removed_firewalls.borrow(), vec!["fw-1".to_string()]);
}

#[tokio::test]
async fn remove_firewall_swallows_errors() {
    let cloud = FakeCloud::default().with_firewall("fw-1", "dotd-1", &[1]);
    cloud.fail_deletes.set(true);
    let reporter = RecordingReporter::default();
    remove_firewall(&cloud, "fw-1", &reporter).await;
    assert!(reporter.saw("could not delete firewall fw-1"));
    assert_eq!(cloud.firewall_ids(), vec!["fw-1".to_string()]);
}

#[tokio::test]
async fn sweep_removes_only_our_stale_firewalls() {
    let cloud = FakeCloud::default()
        .with_firewall("fw-1", "dotd-1", &[1])
        .with_firewall("fw-2", "dotd-2", &[2])
        .with_firewall("fw-3", "dotd-3", &[])
        .with_firewall("fw-office", "office", &[]);
    let reporter = RecordingReporter::default();
    let swept = sweep_firewalls(&cloud, &[1], &reporter).await;
    assert_eq!(swept, 2);
    assert_eq!(
        cloud.firewall_ids(),
        vec!["fw-2".to_string(), "fw-office".to_string()]
    );
    assert!(reporter.saw("deleted 2 firewall(s)"));
}

#[tokio::test]
async fn sweep_listing_failure_is_reported_not_fatal() {
    let cloud = FakeCloud::default();
    cloud.fail_firewalls.set(true);
    let reporter = RecordingReporter::default();
    assert_eq!(sweep_firewalls(&cloud, &[1], &reporter).await, 0);
    assert!(reporter.saw("could not list firewalls"));
}

// ── teardown_by_tag ───────────────────────────────────────────────────────────

#[tokio::test]
async fn teardown_by_tag_without_tag_does_nothing() {
    let cloud = FakeCloud::with_instances(vec![running(1, "10.0.0.1")]);
    let prompt = ScriptedPrompt::new(&["yes"]);
    let out = teardown_by_tag(&cloud, "", &prompt, &RecordingReporter::default())
        .await
        .expect("cleanup");
    assert_eq!(out, CleanupOutcome::NoTag);
    assert_eq!(prompt.asked.get(), 0);
    assert!(cloud.deleted.borrow().is_empty());
}

#[tokio::test]
async fn teardown_by_tag_with_no_matches_never_prompts() {
    let cloud = FakeCloud::default();
    let prompt = ScriptedPrompt::new(&["yes"]);
    let out = teardown_by_tag(&cloud, "dotd", &prompt, &RecordingReporter::default())
        .await
        .expect("cleanup");
    assert_eq!(out, CleanupOutcome::NoneFound);
    assert_eq!(prompt.asked.get(), 0);
}

#[tokio::test]
async fn teardown_by_tag_declined_deletes_nothing() {
    let cloud = FakeCloud::with_instances(vec![running(1, "10.0.0.1")])
        .with_firewall("fw-1", "dotd-1", &[1]);
    let prompt = ScriptedPrompt::new(&["maybe", "n"]);
    let out = teardown_by_tag(&cloud, "dotd", &prompt, &RecordingReporter::default())
        .await
        .expect("cleanup");
    assert_eq!(out, CleanupOutcome::Aborted);
    assert_eq!(prompt.asked.get(), 2);
    assert!(cloud.deleted.borrow().is_empty());
    assert_eq!(cloud.firewall_ids(), vec!["fw-1".to_string()]);
}

#[tokio::test]
async fn teardown_by_tag_prompt_failure_aborts() {
    let cloud = FakeCloud::with_instances(vec![running(1, "10.0.0.1")]);
    let prompt = ScriptedPrompt::new(&[]);
    let out = teardown_by_tag(&cloud, "dotd", &prompt, &RecordingReporter::default())
        .await
        .expect("cleanup");
    assert_eq!(out, CleanupOutcome::Aborted);
    assert!(cloud.deleted.borrow().is_empty());
}

#[tokio::test]
async fn teardown_by_tag_confirmed_deletes_all_pages() {
    let cloud = FakeCloud::with_instances(vec![
        running(1, "10.0.0.1"),
        running(2, "10.0.0.2"),
        running(3, "10.0.0.3"),
    ]);
    cloud.page_size.set(2);
    let prompt = ScriptedPrompt::new(&["YES"]);
    let out = teardown_by_tag(&cloud, "dotd", &prompt, &RecordingReporter::default())
        .await
        .expect("cleanup");
    assert_eq!(
        out,
        CleanupOutcome::Deleted {
            deleted: 3,
            failed: 0
        }
    );
    assert_eq!(*cloud.deleted.borrow(), vec![1, 2, 3]);
}

#[tokio::test]
async fn teardown_by_tag_removes_firewalls_of_deleted_droplets() {
    let cloud = FakeCloud::with_instances(vec![running(1, "10.0.0.1"), running(2, "10.0.0.2")])
        .with_firewall("fw-1", "dotd-1", &[1])
        .with_firewall("fw-2", "dotd-2", &[2])
        .with_firewall("fw-9", "dotd-9", &[])
        .with_firewall("fw-office", "office", &[7]);
    let prompt = ScriptedPrompt::new(&["y"]);
    let reporter = RecordingReporter::default();
    teardown_by_tag(&cloud, "dotd", &prompt, &reporter)
        .await
        .expect("cleanup");
    assert_eq!(cloud.firewall_ids(), vec!["fw-office".to_string()]);
    assert!(reporter.saw("deleted 3 firewall(s)"));
}

#[tokio::test]
async fn teardown_by_tag_counts_failed_deletions() {
    let cloud = FakeCloud::with_instances(vec![running(1, "10.0.0.1")])
        .with_firewall("fw-1", "dotd-1", &[1]);
    cloud.fail_deletes.set(true);
    let prompt = ScriptedPrompt::new(&["y"]);
    let out = teardown_by_tag(&cloud, "dotd", &prompt, &RecordingReporter::default())
        .await
        .expect("cleanup");
    assert_eq!(
        out,
        CleanupOutcome::Deleted {
            deleted: 0,
            failed: 1
        }
    );
    assert_eq!(cloud.firewall_ids(), vec!["fw-1".to_string()]);
}
