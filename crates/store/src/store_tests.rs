// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drip_core::test_support::{email_step, t0, WorkflowBuilder};
use drip_core::{FakeClock, StepId, Subscriber, TenantId, Throttle};
use tempfile::tempdir;

struct Fixture {
    store: Store<FakeClock>,
    clock: FakeClock,
    workflow: Workflow,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    fixture_with(|builder| builder)
}

fn fixture_with(customize: impl FnOnce(drip_core::test_support::WorkflowBuilder) -> drip_core::test_support::WorkflowBuilder) -> Fixture {
    let dir = tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let clock = FakeClock::at(t0());
    let store = Store::open(dir.path(), clock.clone()).unwrap_or_else(|e| panic!("open: {e}"));
    let workflow = customize(WorkflowBuilder::default().step(email_step("s1", 0, "Hi"))).build();
    store.insert_workflow(workflow.clone()).unwrap_or_else(|e| panic!("insert: {e}"));
    Fixture { store, clock, workflow, _dir: dir }
}

fn enrolled(fixture: &Fixture, email: &str) -> (Subscriber, QueueItem) {
    let sub = Subscriber::new(
        fixture.workflow.id.clone(),
        TenantId::new("acme"),
        email,
        1,
        t0(),
    );
    let item = QueueItem::new(
        fixture.workflow.id.clone(),
        sub.id.clone(),
        "s1".into(),
        StepKindTag::SendEmail,
        t0(),
    );
    fixture
        .store
        .enroll(sub.clone(), item.clone(), None)
        .unwrap_or_else(|e| panic!("enroll: {e}"));
    (sub, item)
}

fn lease_opts() -> LeaseOptions {
    LeaseOptions {
        worker: "w1".to_string(),
        max_items: 10,
        lease_duration: Duration::seconds(60),
    }
}

#[test]
fn enroll_rejects_second_active_subscriber() {
    let fx = fixture();
    let (_sub, _item) = enrolled(&fx, "alice@x.test");

    let dup = Subscriber::new(fx.workflow.id.clone(), TenantId::new("acme"), "alice@x.test", 2, t0());
    let item = QueueItem::new(
        fx.workflow.id.clone(),
        dup.id.clone(),
        "s1".into(),
        StepKindTag::SendEmail,
        t0(),
    );
    let err = fx.store.enroll(dup, item, None).unwrap_err();
    assert!(matches!(err, StoreError::ActiveSubscriberExists { .. }));
}

#[test]
fn enqueue_enforces_one_live_item_per_subscriber() {
    let fx = fixture();
    let (sub, _item) = enrolled(&fx, "alice@x.test");

    let second = QueueItem::new(
        fx.workflow.id.clone(),
        sub.id.clone(),
        "s1".into(),
        StepKindTag::Wait,
        t0(),
    );
    let err = fx.store.enqueue(second).unwrap_err();
    assert!(matches!(err, StoreError::LiveItemExists(_)));
}

#[test]
fn lease_returns_due_items_in_order() {
    let fx = fixture();
    let (_s1, item1) = enrolled(&fx, "a@x.test");
    fx.clock.advance(Duration::seconds(1));
    let (_s2, item2) = enrolled(&fx, "b@x.test");
    fx.clock.advance(Duration::seconds(1));

    let leased = fx.store.lease(&lease_opts()).unwrap();
    let ids: Vec<_> = leased.iter().map(|i| i.id.clone()).collect();
    assert_eq!(ids, vec![item1.id.clone(), item2.id.clone()]);
    for item in &leased {
        assert_eq!(item.status, QueueItemStatus::Processing);
        assert_eq!(item.attempts, 1);
        assert_eq!(item.lease_owner.as_deref(), Some("w1"));
    }
}

#[test]
fn lease_skips_future_items() {
    let fx = fixture();
    let (sub, _) = enrolled(&fx, "a@x.test");
    fx.store.complete(&fx.store.live_item_for(&sub.id).unwrap().id, None).unwrap();

    let mut future = QueueItem::new(
        fx.workflow.id.clone(),
        sub.id.clone(),
        "s1".into(),
        StepKindTag::Wait,
        t0() + Duration::hours(2),
    );
    future.attempt_epoch = 1;
    fx.store.enqueue(future).unwrap();

    assert!(fx.store.lease(&lease_opts()).unwrap().is_empty());
    fx.clock.advance(Duration::hours(2));
    assert_eq!(fx.store.lease(&lease_opts()).unwrap().len(), 1);
}

#[test]
fn transient_fail_reschedules_with_backoff() {
    let fx = fixture();
    let (_sub, item) = enrolled(&fx, "a@x.test");
    fx.store.lease(&lease_opts()).unwrap();

    let err = StepError::transient("esp timeout");
    let decision = fx.store.fail(&item.id, &err, &RetryPolicy::default()).unwrap();
    assert!(!decision.dead);
    let retry_at = decision.retry_at.unwrap();
    // base 30s ± 20% jitter
    assert!(retry_at >= t0() + Duration::seconds(24));
    assert!(retry_at <= t0() + Duration::seconds(36));

    let stored = fx.store.queue_item(&item.id).unwrap();
    assert_eq!(stored.status, QueueItemStatus::Pending);
    assert_eq!(stored.scheduled_for, retry_at);

    // Second lease after the backoff elapses carries attempts=2
    fx.clock.advance(Duration::seconds(40));
    let leased = fx.store.lease(&lease_opts()).unwrap();
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].attempts, 2);
}

#[test]
fn permanent_fail_dead_letters() {
    let fx = fixture();
    let (sub, item) = enrolled(&fx, "a@x.test");
    fx.store.lease(&lease_opts()).unwrap();

    let err = StepError::permanent("invalid address");
    let decision = fx.store.fail(&item.id, &err, &RetryPolicy::default()).unwrap();
    assert!(decision.dead);
    assert_eq!(fx.store.queue_item(&item.id).unwrap().status, QueueItemStatus::Failed);
    assert!(fx.store.live_item_for(&sub.id).is_none());
}

#[test]
fn reclaim_expired_returns_items_to_pending() {
    let fx = fixture();
    let (_sub, item) = enrolled(&fx, "a@x.test");
    fx.store.lease(&lease_opts()).unwrap();

    // Lease is 60s; nothing to reclaim before expiry
    assert_eq!(fx.store.reclaim_expired().unwrap(), 0);
    fx.clock.advance(Duration::seconds(61));
    assert_eq!(fx.store.reclaim_expired().unwrap(), 1);

    let stored = fx.store.queue_item(&item.id).unwrap();
    assert_eq!(stored.status, QueueItemStatus::Pending);
    assert!(stored.lease_owner.is_none());
}

#[test]
fn cancel_pending_for_workflow_leaves_processing() {
    let fx = fixture();
    let (_s1, item1) = enrolled(&fx, "a@x.test");
    let (_s2, item2) = enrolled(&fx, "b@x.test");

    // Lease exactly one so the other stays pending
    let leased = fx
        .store
        .lease(&LeaseOptions { max_items: 1, ..lease_opts() })
        .unwrap();
    assert_eq!(leased.len(), 1);

    let cancelled = fx.store.cancel_pending_for_workflow(&fx.workflow.id).unwrap();
    assert_eq!(cancelled, 1);
    let statuses = [
        fx.store.queue_item(&item1.id).unwrap().status,
        fx.store.queue_item(&item2.id).unwrap().status,
    ];
    assert!(statuses.contains(&QueueItemStatus::Processing));
    assert!(statuses.contains(&QueueItemStatus::Cancelled));
}

#[test]
fn throttle_defers_send_email_past_cap() {
    let fx = fixture_with(|b| b.throttle(Throttle { max_sends_per_hour: 1, max_sends_per_day: 0 }));
    let (_s1, item1) = enrolled(&fx, "a@x.test");
    let (_s2, item2) = enrolled(&fx, "b@x.test");

    let leased = fx.store.lease(&lease_opts()).unwrap();
    // First send consumes the hourly token; second is deferred, not leased
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].id, item1.id);

    let deferred = fx.store.queue_item(&item2.id).unwrap();
    assert_eq!(deferred.status, QueueItemStatus::Pending);
    assert_eq!(deferred.scheduled_for, t0() + Duration::hours(1));

    // After the window boundary the deferred item leases normally
    fx.clock.advance(Duration::hours(1));
    let leased = fx.store.lease(&lease_opts()).unwrap();
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].id, item2.id);
}

#[test]
fn lease_skips_paused_workflow_items() {
    let fx = fixture();
    let (_sub, item) = enrolled(&fx, "a@x.test");
    fx.store.commit(&[Event::WorkflowPaused { id: fx.workflow.id.clone() }]).unwrap();

    assert!(fx.store.lease(&lease_opts()).unwrap().is_empty());
    assert_eq!(fx.store.queue_item(&item.id).unwrap().status, QueueItemStatus::Pending);
}

#[test]
fn commit_transition_suppressed_after_archive() {
    let fx = fixture();
    let (sub, item) = enrolled(&fx, "a@x.test");
    fx.store.lease(&lease_opts()).unwrap();
    fx.store.commit(&[Event::WorkflowArchived { id: fx.workflow.id.clone() }]).unwrap();

    let outcome = fx
        .store
        .commit_transition(
            &fx.workflow.id,
            &sub.id,
            &item.id,
            &[Event::QueueCompleted { id: item.id.clone(), result: None }],
        )
        .unwrap();
    assert_eq!(outcome, CommitOutcome::Suppressed);
    assert_eq!(fx.store.queue_item(&item.id).unwrap().status, QueueItemStatus::Cancelled);
}

#[test]
fn store_survives_reopen() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::at(t0());
    let workflow = WorkflowBuilder::default().step(email_step("s1", 0, "Hi")).build();
    let sub = Subscriber::new(workflow.id.clone(), TenantId::new("acme"), "a@x.test", 1, t0());
    let item = QueueItem::new(
        workflow.id.clone(),
        sub.id.clone(),
        "s1".into(),
        StepKindTag::SendEmail,
        t0(),
    );

    {
        let store = Store::open(dir.path(), clock.clone()).unwrap();
        store.insert_workflow(workflow.clone()).unwrap();
        store.enroll(sub.clone(), item.clone(), None).unwrap();
    }

    let store = Store::open(dir.path(), clock).unwrap();
    assert_eq!(store.workflow(&workflow.id).unwrap().stats.total_entered, 1);
    assert!(store.active_subscriber(&workflow.id, "a@x.test").is_some());
    let leased = store.lease(&lease_opts()).unwrap();
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].id, item.id);
}

#[test]
fn checkpoint_compacts_and_reopens() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::at(t0());
    let workflow = WorkflowBuilder::default().step(email_step("s1", 0, "Hi")).build();

    {
        let store = Store::open(dir.path(), clock.clone()).unwrap();
        store.insert_workflow(workflow.clone()).unwrap();
        store.checkpoint().unwrap();
        // Post-checkpoint commits land in the fresh wal
        store.commit(&[Event::WorkflowActivated { id: workflow.id.clone() }]).unwrap();
    }

    let store = Store::open(dir.path(), clock).unwrap();
    let loaded = store.workflow(&workflow.id).unwrap();
    assert_eq!(loaded.status, WorkflowStatus::Active);
}
