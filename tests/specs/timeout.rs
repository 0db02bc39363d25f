// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 3 (§8): a `timeout` transition fires after its deadline and
//! disposes the instance into an error state.

use std::time::Duration;

use fsm_core::test_support::{component, machine, state, transition};
use fsm_core::{IncomingEvent, StateKind};

use crate::support;

fn timeout_flow() -> fsm_core::Component {
    component("Orders")
        .machine(
            machine("SimpleFlow", "Start")
                .state(state("Start", StateKind::Entry))
                .state(state("Processing", StateKind::Regular))
                .state(state("Failed", StateKind::Error))
                .transition(transition("Start", "Processing", "BEGIN"))
                .transition(transition("Processing", "Failed", "TIMEOUT").timeout_ms(1_000))
                .build(),
        )
        .build()
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn unacknowledged_processing_times_out() {
    let harness = support::build(timeout_flow()).expect("engine builds");
    let engine = harness.engine;

    let id = engine.create_instance("SimpleFlow", serde_json::json!({})).await.expect("create");
    engine.send_event(id, IncomingEvent::empty("BEGIN", 0)).await.expect("begin");

    harness.clock.advance(Duration::from_millis(1_100));
    tokio::time::advance(Duration::from_millis(1_100)).await;
    // Let the spawned timer task and its pumped dispatch settle.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert!(engine.get_instance(id).await.is_none(), "instance disposed after timeout");

    let history = fsm_storage::get_instance_history(harness.events.as_ref(), id).await.expect("history");
    let last = history.last().expect("at least one event");
    assert_eq!(last.event.event_type, "TIMEOUT");
    assert_eq!(last.state_after, "Failed");
}
