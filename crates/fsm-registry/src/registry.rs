// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The component registry (§4.4): the process-wide directory of running
//! components a hook's `Sender` reaches through when it targets another
//! component by name. Holds no state of its own beyond the directory —
//! every instance mutation still goes through the owning `Engine`.

use std::sync::Arc;

use async_trait::async_trait;
use fsm_core::{DispatchError, EngineEvent, EventId, IncomingEvent, Instance, InstanceId, PersistedEvent};
use fsm_engine::CrossComponent;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::RegistryError;
use crate::runtime::Runtime;

/// Machine names and identity of one registered component, returned by
/// `info()` for dashboards and the `fsm:registry:announce` channel.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub name: String,
    pub machines: Vec<String>,
}

/// Result of `findInstance`: the instance plus which component it lives in.
#[derive(Debug, Clone)]
pub struct FoundInstance {
    pub instance: Instance,
    pub component_name: String,
}

/// The registry owns the set of components and their runtimes inside one
/// process (§4.4). `register`/`unregister` write-lock the directory;
/// routing calls only read-lock it, so dispatch on one component never
/// blocks registration of another.
pub struct Registry {
    components: RwLock<IndexMap<String, Arc<dyn Runtime>>>,
    events_tx: broadcast::Sender<EngineEvent>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(1024);
        Self { components: RwLock::new(IndexMap::new()), events_tx }
    }

    /// Registry-level events (`broadcast_error`, `broker_disconnected`) not
    /// tied to a single component's own event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    pub fn register(&self, runtime: Arc<dyn Runtime>) -> Result<(), RegistryError> {
        let name = runtime.component_name().to_string();
        let mut components = self.components.write();
        if components.contains_key(&name) {
            return Err(RegistryError::DuplicateComponent(name));
        }
        components.insert(name, runtime);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        self.components
            .write()
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::UnknownComponent(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.components.read().contains_key(name)
    }

    pub fn info(&self, name: &str) -> Option<ComponentInfo> {
        self.components
            .read()
            .get(name)
            .map(|rt| ComponentInfo { name: rt.component_name().to_string(), machines: rt.machine_names() })
    }

    fn runtime(&self, name: &str) -> Result<Arc<dyn Runtime>, RegistryError> {
        self.components
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownComponent(name.to_string()))
    }

    pub async fn send_event_to_component(
        &self,
        component: &str,
        instance_id: InstanceId,
        event: IncomingEvent,
    ) -> Result<(), RegistryError> {
        self.runtime(component)?.send_event(instance_id, event).await.map_err(RegistryError::Runtime)
    }

    pub async fn broadcast_to_component(
        &self,
        component: &str,
        machine: &str,
        state: &str,
        event: IncomingEvent,
    ) -> Result<usize, RegistryError> {
        self.runtime(component)?.broadcast_event(machine, state, event).await.map_err(RegistryError::Runtime)
    }

    /// Iterates every registered component in registration order; a
    /// component that errors reports `broadcast_error` and is skipped,
    /// never aborting the remaining components.
    pub async fn broadcast_to_all(&self, machine: &str, state: &str, event: IncomingEvent) -> usize {
        let runtimes: Vec<Arc<dyn Runtime>> = self.components.read().values().cloned().collect();
        let mut processed = 0usize;
        for rt in runtimes {
            match rt.broadcast_event(machine, state, event.clone()).await {
                Ok(count) => processed += count,
                Err(err) => {
                    let component_name = rt.component_name().to_string();
                    warn!(component = %component_name, error = %err, "broadcastToAll: component failed");
                    let _ = self.events_tx.send(EngineEvent::BroadcastError {
                        component_name,
                        message: err.to_string(),
                    });
                }
            }
        }
        processed
    }

    pub async fn create_instance_in_component(
        &self,
        component: &str,
        id: InstanceId,
        machine: &str,
        payload: Value,
    ) -> Result<(), RegistryError> {
        self.runtime(component)?.create_instance_with_id(machine, id, payload).await.map_err(RegistryError::Runtime)
    }

    /// Scans every registered component until one holds a matching
    /// instance id. Returns nothing if no component has it.
    pub async fn find_instance(&self, id: InstanceId) -> Option<FoundInstance> {
        let runtimes: Vec<Arc<dyn Runtime>> = self.components.read().values().cloned().collect();
        for rt in runtimes {
            if let Some(instance) = rt.get_instance(id).await {
                return Some(FoundInstance { instance, component_name: rt.component_name().to_string() });
            }
        }
        None
    }

    /// Every persisted event across every registered component's store,
    /// merged and sorted by `persisted_at`.
    pub async fn get_all_persisted_events(&self) -> Result<Vec<PersistedEvent>, RegistryError> {
        let runtimes: Vec<Arc<dyn Runtime>> = self.components.read().values().cloned().collect();
        let mut all = Vec::new();
        for rt in runtimes {
            all.extend(rt.event_store().all().await?);
        }
        all.sort_by_key(|e| e.persisted_at);
        Ok(all)
    }

    /// Topological causality chain starting at `event_id`, resolved over
    /// the union of every registered component's store — cross-component
    /// transitions stamp `source_component_name`/`target_component_name`
    /// but `caused`/`causedBy` ids are globally unique, so one merged set
    /// is enough to follow the chain across component boundaries.
    pub async fn trace_event_across_components(&self, event_id: EventId) -> Result<Vec<PersistedEvent>, RegistryError> {
        let all = self.get_all_persisted_events().await?;
        let by_id: std::collections::HashMap<EventId, &PersistedEvent> = all.iter().map(|e| (e.id, e)).collect();

        let mut ordered = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(event_id);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(event) = by_id.get(&id) {
                ordered.push((*event).clone());
                for caused_id in &event.caused {
                    queue.push_back(*caused_id);
                }
            }
        }
        Ok(ordered)
    }

    /// Full per-instance log. Only the component actually holding
    /// `instance_id`'s store will have entries; scanning all of them
    /// keeps this correct regardless of which component the caller
    /// believes owns the instance.
    pub async fn get_instance_history(&self, instance_id: InstanceId) -> Result<Vec<PersistedEvent>, RegistryError> {
        let runtimes: Vec<Arc<dyn Runtime>> = self.components.read().values().cloned().collect();
        let mut events = Vec::new();
        for rt in runtimes {
            events.extend(rt.event_store().by_instance(instance_id).await?);
        }
        events.sort_by_key(|e| e.persisted_at);
        Ok(events)
    }
}

fn to_dispatch_error(err: RegistryError) -> DispatchError {
    match err {
        RegistryError::Runtime(fsm_engine::EngineError::Dispatch(d)) => d,
        other => DispatchError::Internal(other.to_string()),
    }
}

/// The seam `fsm-engine` dispatches cross-component hook effects through,
/// without itself depending on `fsm-registry` (§9's cycle resolved by
/// injection — the registry implements the trait the engine defines).
#[async_trait]
impl CrossComponent for Registry {
    async fn send_event_to_component(
        &self,
        component: &str,
        instance_id: InstanceId,
        event: IncomingEvent,
    ) -> Result<(), DispatchError> {
        Registry::send_event_to_component(self, component, instance_id, event).await.map_err(to_dispatch_error)
    }

    async fn broadcast_to_component(
        &self,
        component: &str,
        machine: &str,
        state: &str,
        event: IncomingEvent,
    ) -> Result<usize, DispatchError> {
        Registry::broadcast_to_component(self, component, machine, state, event).await.map_err(to_dispatch_error)
    }

    async fn create_instance_in_component(
        &self,
        component: &str,
        id: InstanceId,
        machine: &str,
        payload: Value,
    ) -> Result<(), DispatchError> {
        Registry::create_instance_in_component(self, component, id, machine, payload).await.map_err(to_dispatch_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsm_core::test_support::{component, machine, state, transition};
    use fsm_core::{FakeClock, StateKind};
    use fsm_engine::{Engine, HookRegistry};
    use fsm_storage::{InMemoryEventStore, InMemorySnapshotStore, PersistenceConfig};
    use fsm_timer::TimerService;

    fn runtime_for(name: &str, clock: FakeClock) -> Arc<dyn Runtime> {
        runtime_with_machine(
            name,
            clock,
            machine("Order", "Pending")
                .state(state("Pending", StateKind::Entry))
                .state(state("Active", StateKind::Regular))
                .transition(transition("Pending", "Active", "GO"))
                .build(),
        )
    }

    fn runtime_with_machine(name: &str, clock: FakeClock, order_machine: fsm_core::StateMachine) -> Arc<dyn Runtime> {
        let comp = component(name).machine(order_machine).build();
        let events: Arc<dyn fsm_storage::EventStore> = Arc::new(InMemoryEventStore::new());
        let snapshots: Arc<dyn fsm_storage::SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
        let persistence = Arc::new(fsm_storage::PersistenceManager::new(
            clock.clone(),
            PersistenceConfig::default(),
            events,
            snapshots,
        ));
        let (timers, _fire_rx) = TimerService::new(clock.clone());
        Arc::new(Engine::new(comp, clock, persistence, Arc::new(timers), HookRegistry::new(), None).expect("valid"))
    }

    #[tokio::test]
    async fn register_then_find_instance_across_components() {
        let registry = Registry::new();
        let clock = FakeClock::new();
        let a = runtime_for("A", clock.clone());
        let b = runtime_for("B", clock.clone());
        registry.register(a.clone()).expect("register a");
        registry.register(b.clone()).expect("register b");

        assert!(registry.has("A"));
        assert!(registry.has("B"));
        assert!(!registry.has("C"));

        let id = InstanceId::new();
        a.create_instance_with_id("Order", id, serde_json::json!({})).await.expect("create");

        let found = registry.find_instance(id).await.expect("found somewhere");
        assert_eq!(found.component_name, "A");
    }

    #[tokio::test]
    async fn duplicate_registration_rejected() {
        let registry = Registry::new();
        let clock = FakeClock::new();
        let a = runtime_for("A", clock);
        registry.register(a.clone()).expect("first register");
        assert!(matches!(registry.register(a).unwrap_err(), RegistryError::DuplicateComponent(_)));
    }

    #[tokio::test]
    async fn broadcast_to_all_reports_per_component_failure_without_aborting() {
        let registry = Registry::new();
        let clock = FakeClock::new();
        let broken = runtime_with_machine(
            "Broken",
            clock.clone(),
            machine("Order", "Pending")
                .state(state("Pending", StateKind::Entry))
                .state(state("Active", StateKind::Regular))
                .transition(transition("Pending", "Active", "GO").specific_triggering_rule("!!! not an expression"))
                .build(),
        );
        registry.register(broken.clone()).expect("register broken");
        broken
            .create_instance_with_id("Order", InstanceId::new(), serde_json::json!({}))
            .await
            .expect("create");

        let mut events = registry.subscribe();
        let processed =
            registry.broadcast_to_all("Order", "Pending", IncomingEvent::empty("GO", 0)).await;
        assert_eq!(processed, 0);

        let event = events.recv().await.expect("broadcast_error");
        assert!(matches!(event, EngineEvent::BroadcastError { .. }));
    }

    #[tokio::test]
    async fn unregistered_component_routing_fails() {
        let registry = Registry::new();
        let result = registry.send_event_to_component("Ghost", InstanceId::new(), IncomingEvent::empty("GO", 0)).await;
        assert!(matches!(result.unwrap_err(), RegistryError::UnknownComponent(_)));
    }
}
