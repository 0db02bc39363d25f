// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 6 (§8): a fresh engine restored from the snapshot store picks
//! up exactly where the previous process left off, including re-arming
//! pending `timeout` transitions — the "Snapshot round-trip" property.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fsm_core::test_support::{component, machine, state, transition};
use fsm_core::{FakeClock, IncomingEvent, StateKind};
use fsm_engine::{Engine, HookRegistry};
use fsm_storage::{PersistenceConfig, PersistenceManager};
use fsm_timer::TimerService;

use crate::support;

fn simple_flow() -> fsm_core::Component {
    component("Orders")
        .machine(
            machine("SimpleFlow", "Start")
                .state(state("Start", StateKind::Entry))
                .state(state("Processing", StateKind::Regular))
                .state(state("Success", StateKind::Final))
                .transition(transition("Start", "Processing", "BEGIN"))
                .transition(transition("Processing", "Success", "COMPLETE").guard_keys(["result"]))
                .build(),
        )
        .machine(
            machine("TimedFlow", "Start")
                .state(state("Start", StateKind::Entry))
                .state(state("Waiting", StateKind::Regular))
                .state(state("Expired", StateKind::Final))
                .transition(transition("Start", "Waiting", "BEGIN"))
                .transition(transition("Waiting", "Expired", "EXPIRE").timeout_ms(1_000))
                .build(),
        )
        .build()
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn restored_instances_resume_from_their_last_snapshot() {
    let config = PersistenceConfig { snapshot_interval: 1 };
    let harness = support::build_with_config(simple_flow(), config).expect("engine builds");
    let engine = harness.engine;

    let surviving = engine.create_instance("SimpleFlow", serde_json::json!({})).await.expect("create surviving");
    let finishing = engine.create_instance("SimpleFlow", serde_json::json!({})).await.expect("create finishing");
    engine.send_event(surviving, IncomingEvent::empty("BEGIN", 0)).await.expect("begin surviving");
    engine.send_event(finishing, IncomingEvent::empty("BEGIN", 0)).await.expect("begin finishing");

    // Armed while the clock reads its starting epoch: due 1_000ms later.
    let expiring = engine.create_instance("TimedFlow", serde_json::json!({})).await.expect("create expiring");
    engine.send_event(expiring, IncomingEvent::empty("BEGIN", 0)).await.expect("begin expiring");

    // Armed 500ms later: still has 500ms left when the process "restarts".
    harness.clock.advance(Duration::from_millis(500));
    let not_yet = engine.create_instance("TimedFlow", serde_json::json!({})).await.expect("create not_yet");
    engine.send_event(not_yet, IncomingEvent::empty("BEGIN", 0)).await.expect("begin not_yet");

    // Simulate process restart: a fresh engine sharing the same backing stores.
    // The new clock is set 1_200ms past its start, i.e. 700ms of "downtime" —
    // `expiring`'s timer (due at +1_000ms) has elapsed, `not_yet`'s (due at
    // +1_500ms) has not.
    let clock = FakeClock::new();
    clock.set_epoch_ms(clock.epoch_ms() + 1_200);
    let events = harness.events.clone();
    let snapshots = harness.snapshots.clone();
    let persistence_for_restore = Arc::new(PersistenceManager::new(clock.clone(), config, events.clone(), snapshots.clone()));
    let (timers, fired_rx) = TimerService::new(clock.clone());
    let restarted = Arc::new(
        Engine::new(simple_flow(), clock.clone(), persistence_for_restore.clone(), Arc::new(timers), HookRegistry::new(), None)
            .expect("engine rebuilds"),
    );
    restarted.spawn_timer_pump(fired_rx);

    let known_machines: HashSet<String> = restarted.declared_machine_names().into_iter().collect();
    let restore_result = persistence_for_restore.restore(&known_machines).await.expect("restore");
    assert_eq!(restore_result.restored.len(), 4);
    assert_eq!(restore_result.failed, 0);

    let resync = restarted.restore_and_resync(restore_result.restored).await;
    assert_eq!(resync.expired, 1, "expiring's elapsed timer fires immediately");
    assert_eq!(resync.synced, 1, "not_yet's timer is still live and gets rearmed");

    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert!(restarted.get_instance(expiring).await.is_none(), "already-elapsed timeout fires on restore");

    assert_eq!(restarted.get_instance(surviving).await.expect("surviving present").current_state, "Processing");
    assert_eq!(restarted.get_instance(finishing).await.expect("finishing present").current_state, "Processing");
    assert_eq!(restarted.get_instance(not_yet).await.expect("not_yet still armed").current_state, "Waiting");

    clock.advance(Duration::from_millis(300));
    tokio::time::advance(Duration::from_millis(300)).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert!(restarted.get_instance(not_yet).await.is_none(), "rearmed timeout fires once its deadline passes");

    restarted
        .send_event(finishing, IncomingEvent::new("COMPLETE", serde_json::json!({"result": "ok"}), 0))
        .await
        .expect("complete after restart");

    assert!(restarted.get_instance(finishing).await.is_none(), "final state disposes the instance");
    assert_eq!(restarted.get_instance(surviving).await.expect("surviving still present").current_state, "Processing");
}
