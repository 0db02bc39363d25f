// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 5 (§8): a cascading rule on `Order`'s `Confirmed` state
//! auto-emits `START_SHIPMENT` to the `Shipment` machine in the same
//! component; the causality trace connects the two events.

use fsm_core::test_support::{cascade_with_payload, component, machine, state, transition};
use fsm_core::{IncomingEvent, MatchOperator, StateKind};
use fsm_storage::{get_instance_history, trace_event_causality};

use crate::support;

fn order_and_shipment() -> fsm_core::Component {
    component("Orders")
        .machine(
            machine("Order", "Pending")
                .public_member_type("Order")
                .state(state("Pending", StateKind::Entry))
                .state(
                    state("Confirmed", StateKind::Regular)
                        .cascade(cascade_with_payload("Shipment", "Idle", "START_SHIPMENT", serde_json::json!({"orderId": "{{Id}}"}))),
                )
                .transition(transition("Pending", "Confirmed", "CONFIRM"))
                .build(),
        )
        .machine(
            machine("Shipment", "Idle")
                .public_member_type("Shipment")
                .state(state("Idle", StateKind::Entry))
                .state(state("Preparing", StateKind::Regular))
                .transition(
                    transition("Idle", "Preparing", "START_SHIPMENT")
                        .matching_rule("orderId", "orderId", MatchOperator::Eq),
                )
                .build(),
        )
        .build()
}

#[tokio::test]
async fn confirming_an_order_cascades_into_shipment_preparation() {
    let harness = support::build(order_and_shipment()).expect("engine builds");
    let engine = harness.engine;

    let shipment_id = engine.create_instance("Shipment", serde_json::json!({"orderId": "1"})).await.expect("create shipment");
    let order_id = engine.create_instance("Order", serde_json::json!({"Id": 1})).await.expect("create order");

    engine.send_event(order_id, IncomingEvent::empty("CONFIRM", 0)).await.expect("confirm");

    let shipment = engine.get_instance(shipment_id).await.expect("shipment still active");
    assert_eq!(shipment.current_state, "Preparing");

    let order_history = get_instance_history(harness.events.as_ref(), order_id).await.expect("order history");
    let confirm_event = order_history.iter().find(|e| e.event.event_type == "CONFIRM").expect("confirm recorded");

    let trace = trace_event_causality(harness.events.as_ref(), confirm_event.id).await.expect("trace");
    assert!(trace.iter().any(|e| e.id == confirm_event.id));
    let shipment_event = trace.iter().find(|e| e.event.event_type == "START_SHIPMENT").expect("shipment event reached");
    assert_eq!(shipment_event.caused_by, vec![confirm_event.id]);
}
