// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-backed `CrossComponent` (§4.4): routes a hook's cross-component
//! send/broadcast/create through the local `Registry` when the target
//! component lives in this process, falling back to a broker publish on
//! its command channel when it doesn't. `fsm-engine` calls the same trait
//! either way, never knowing which path a given target took.

use std::sync::Arc;

use async_trait::async_trait;
use fsm_core::{DispatchError, IncomingEvent, InstanceId};
use fsm_engine::CrossComponent;
use fsm_registry::Registry;
use serde_json::{json, Value};
use tracing::debug;

use crate::broker::Broker;
use crate::channels;

/// Pairs a process-local registry with a broker connection. §4.4:
/// "When the broadcaster is enabled, cross-component operations are
/// published on the broker instead of requiring the target runtime to
/// live in the same process; identical semantics apply."
pub struct BrokerCrossComponent {
    registry: Arc<Registry>,
    broker: Arc<dyn Broker>,
}

impl BrokerCrossComponent {
    pub fn new(registry: Arc<Registry>, broker: Arc<dyn Broker>) -> Self {
        Self { registry, broker }
    }
}

#[async_trait]
impl CrossComponent for BrokerCrossComponent {
    async fn send_event_to_component(
        &self,
        component: &str,
        instance_id: InstanceId,
        event: IncomingEvent,
    ) -> Result<(), DispatchError> {
        if self.registry.has(component) {
            return <Registry as CrossComponent>::send_event_to_component(&self.registry, component, instance_id, event)
                .await;
        }
        let message = json!({
            "command": "sendEvent",
            "instanceId": instance_id.to_string(),
            "eventType": event.event_type,
            "payload": event.payload,
            "occurredAtMs": event.occurred_at_ms,
        });
        self.broker
            .publish(&channels::commands(component), message)
            .await
            .map_err(|err| DispatchError::Internal(err.to_string()))
    }

    async fn broadcast_to_component(
        &self,
        component: &str,
        machine: &str,
        state: &str,
        event: IncomingEvent,
    ) -> Result<usize, DispatchError> {
        if self.registry.has(component) {
            return <Registry as CrossComponent>::broadcast_to_component(&self.registry, component, machine, state, event)
                .await;
        }
        let message = json!({
            "command": "broadcast",
            "machine": machine,
            "state": state,
            "eventType": event.event_type,
            "payload": event.payload,
            "occurredAtMs": event.occurred_at_ms,
        });
        self.broker
            .publish(&channels::component_channel(component), message)
            .await
            .map_err(|err| DispatchError::Internal(err.to_string()))?;
        // A broker publish is fire-and-forget (§5): there is no reply
        // channel to learn how many instances a remote component actually
        // matched, unlike the same-process path above.
        debug!(component, "broadcast routed over broker, processed count unknown");
        Ok(0)
    }

    async fn create_instance_in_component(
        &self,
        component: &str,
        id: InstanceId,
        machine: &str,
        payload: Value,
    ) -> Result<(), DispatchError> {
        if self.registry.has(component) {
            return <Registry as CrossComponent>::create_instance_in_component(&self.registry, component, id, machine, payload)
                .await;
        }
        let message = json!({
            "command": "createInstance",
            "instanceId": id.to_string(),
            "machine": machine,
            "payload": payload,
        });
        self.broker
            .publish(&channels::commands(component), message)
            .await
            .map_err(|err| DispatchError::Internal(err.to_string()))
    }
}
