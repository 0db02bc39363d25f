// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 1 (§8): `SimpleFlow` walks `Start -> Processing -> Success`
//! and disposes on reaching the final state.

use fsm_core::test_support::{component, machine, state, transition};
use fsm_core::{IncomingEvent, StateKind, INSTANCE_CREATED};
use fsm_storage::get_instance_history;

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
async fn linear_path_disposes_on_final_state() {
    let harness = support::build(simple_flow()).expect("engine builds");
    let engine = harness.engine;

    let id = engine.create_instance("SimpleFlow", serde_json::json!({})).await.expect("create");
    engine.send_event(id, IncomingEvent::empty("BEGIN", 0)).await.expect("begin");
    engine
        .send_event(id, IncomingEvent::new("COMPLETE", serde_json::json!({"result": "ok"}), 0))
        .await
        .expect("complete");

    assert!(engine.get_instance(id).await.is_none(), "final state disposes the instance");

    let history = get_instance_history(harness.events.as_ref(), id).await.expect("history");
    assert_eq!(history.len(), 3);
    assert!(history[0].is_instance_created());
    assert_eq!(history[0].event.event_type, INSTANCE_CREATED);
    assert_eq!(history[0].state_after, "Start");

    assert_eq!(history[1].event.event_type, "BEGIN");
    assert_eq!(history[1].state_before, "Start");
    assert_eq!(history[1].state_after, "Processing");

    assert_eq!(history[2].event.event_type, "COMPLETE");
    assert_eq!(history[2].state_before, "Processing");
    assert_eq!(history[2].state_after, "Success");
}
