// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 2 (§8): a guard that doesn't hold emits `guard_failed` and
//! leaves the instance untouched — not an error (§7 point 3).

use fsm_core::test_support::{component, machine, state, transition};
use fsm_core::{EngineEvent, IncomingEvent, StateKind};

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
        .build()
}

#[tokio::test]
async fn missing_guard_key_emits_guard_failed_and_stays_put() {
    let harness = support::build(simple_flow()).expect("engine builds");
    let engine = harness.engine;
    let mut events = engine.subscribe();

    let id = engine.create_instance("SimpleFlow", serde_json::json!({})).await.expect("create");
    engine.send_event(id, IncomingEvent::empty("BEGIN", 0)).await.expect("begin");

    engine.send_event(id, IncomingEvent::empty("COMPLETE", 0)).await.expect("complete is not an error");

    let instance = engine.get_instance(id).await.expect("instance still present");
    assert_eq!(instance.current_state, "Processing");

    let mut saw_guard_failed = false;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::GuardFailed { state, event: ev, .. } = event {
            assert_eq!(state, "Processing");
            assert_eq!(ev, "COMPLETE");
            saw_guard_failed = true;
        }
    }
    assert!(saw_guard_failed, "expected a guard_failed event");
}
