// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 4 (§8): broadcasting an event to a state processes only the
//! instances whose matching rule accepts the event's payload.

use fsm_core::test_support::{component, machine, state, transition};
use fsm_core::{MatchOperator, StateKind};

use crate::support;

fn order_flow() -> fsm_core::Component {
    component("Orders")
        .machine(
            machine("Order", "Pending")
                .public_member_type("Order")
                .state(state("Pending", StateKind::Entry))
                .state(state("Executing", StateKind::Regular))
                .transition(
                    transition("Pending", "Executing", "ExecutionInput")
                        .matching_rule("OrderId", "Id", MatchOperator::Eq),
                )
                .build(),
        )
        .build()
}

#[tokio::test]
async fn broadcast_processes_only_the_matching_instance() {
    let harness = support::build(order_flow()).expect("engine builds");
    let engine = harness.engine;

    let mut ids = vec![];
    for n in [1, 2, 3] {
        let id = engine.create_instance("Order", serde_json::json!({"Id": n})).await.expect("create");
        ids.push(id);
    }

    let processed = engine
        .broadcast_event(
            "Order",
            "Pending",
            fsm_core::IncomingEvent::new("ExecutionInput", serde_json::json!({"OrderId": 2}), 0),
        )
        .await
        .expect("broadcast");

    assert_eq!(processed, 1);

    let mut states = vec![];
    for id in &ids {
        states.push(engine.get_instance(*id).await.map(|i| i.current_state));
    }
    assert_eq!(states.iter().filter(|s| s.as_deref() == Some("Executing")).count(), 1);
    assert_eq!(states.iter().filter(|s| s.as_deref() == Some("Pending")).count(), 2);
}
