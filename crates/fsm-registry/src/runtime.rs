// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Type-erased view of an `Engine<C>` the registry can hold regardless of
//! which `Clock` it was built with. `Engine<C>` itself can't go in a
//! `HashMap<String, _>` alongside engines built with a different `C`, so
//! the registry only ever sees this trait object.

use std::sync::Arc;

use async_trait::async_trait;
use fsm_core::{EngineEvent, IncomingEvent, Instance, InstanceId};
use fsm_storage::EventStore;
use serde_json::Value;
use tokio::sync::broadcast;

use fsm_engine::{Engine, EngineError};

#[async_trait]
pub trait Runtime: Send + Sync {
    fn component_name(&self) -> &str;

    fn machine_names(&self) -> Vec<String>;

    /// Mirrors `Engine::subscribe` — the broadcaster listens here to
    /// fan engine events out onto the broker (§4.5).
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;

    async fn send_event(&self, instance_id: InstanceId, event: IncomingEvent) -> Result<(), EngineError>;

    async fn broadcast_event(&self, machine: &str, state: &str, event: IncomingEvent) -> Result<usize, EngineError>;

    async fn create_instance_with_id(
        &self,
        machine: &str,
        id: InstanceId,
        payload: Value,
    ) -> Result<(), EngineError>;

    async fn get_instance(&self, instance_id: InstanceId) -> Option<Instance>;

    fn event_store(&self) -> &Arc<dyn EventStore>;
}

#[async_trait]
impl<C: fsm_core::Clock> Runtime for Engine<C> {
    fn component_name(&self) -> &str {
        Engine::component_name(self)
    }

    fn machine_names(&self) -> Vec<String> {
        // `Engine` doesn't expose its machine map directly; `machine()` lookups
        // cover every declared name, so announcing needs them enumerated once
        // at registration rather than on every `announce`.
        self.declared_machine_names()
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        Engine::subscribe(self)
    }

    async fn send_event(&self, instance_id: InstanceId, event: IncomingEvent) -> Result<(), EngineError> {
        Engine::send_event(self, instance_id, event).await
    }

    async fn broadcast_event(&self, machine: &str, state: &str, event: IncomingEvent) -> Result<usize, EngineError> {
        Engine::broadcast_event(self, machine, state, event).await
    }

    async fn create_instance_with_id(
        &self,
        machine: &str,
        id: InstanceId,
        payload: Value,
    ) -> Result<(), EngineError> {
        Engine::create_instance_with_id(self, machine, id, payload).await
    }

    async fn get_instance(&self, instance_id: InstanceId) -> Option<Instance> {
        Engine::get_instance(self, instance_id).await
    }

    fn event_store(&self) -> &Arc<dyn EventStore> {
        Engine::event_store(self)
    }
}
