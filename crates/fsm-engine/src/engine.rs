// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher (§4.1): the single commit point every instance mutation
//! passes through. Structurally this is the teacher's `Mutex<HashMap<..>>`
//! `MaterializedState` pattern from `daemon/src/engine/runtime/mod.rs`,
//! generalized from one job queue to the state machines of a component —
//! one global lock serializes every mutation of any instance, which is the
//! simplest implementation of "a single logical dispatcher per runtime"
//! the concurrency model allows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fsm_core::{
    validate_component, Clock, Component, DeclarationError, DispatchError, EngineEvent, EventId,
    IncomingEvent, Instance, InstanceId, MatchingRule, PendingTimeout, PersistedEvent, PublicMember,
    Snapshot, State, StateMachine, Transition, TransitionKind, INSTANCE_CREATED,
};
use fsm_storage::{EventStore, PersistenceManager};
use fsm_timer::{resynchronize, ResyncResult, TimerFired, TimerService, TimerSlot};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::cascade::cascade_event;
use crate::error::EngineError;
use crate::hook::{HookContext, HookOutput, HookRegistry};
use crate::sender::{CrossComponent, PendingAction, Sender};
use crate::select::{self, SkipReason};

/// Result of `dispatch`, used internally to decide whether a broadcast
/// counts an instance as processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchOutcome {
    Unhandled,
    Internal,
    Committed,
}

/// Outcome of `simulate_path` (§4.1 `simulatePath`): a pure walk over the
/// declared machine with no side effects on the live registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationResult {
    Completed { visited: Vec<String> },
    Failed { visited: Vec<String>, stuck_at: String, event: String },
}

/// One running component's worth of state machines, instances, hooks, and
/// injected collaborators (persistence, timers, cross-component routing).
pub struct Engine<C: Clock> {
    component_name: String,
    clock: C,
    machines: HashMap<String, StateMachine>,
    instances: Mutex<HashMap<InstanceId, Instance>>,
    hooks: HookRegistry,
    persistence: Arc<PersistenceManager<C>>,
    timers: Arc<TimerService<C>>,
    events_tx: broadcast::Sender<EngineEvent>,
    cross_component: Option<Arc<dyn CrossComponent>>,
}

impl<C: Clock> Engine<C> {
    pub fn new(
        component: Component,
        clock: C,
        persistence: Arc<PersistenceManager<C>>,
        timers: Arc<TimerService<C>>,
        hooks: HookRegistry,
        cross_component: Option<Arc<dyn CrossComponent>>,
    ) -> Result<Self, EngineError> {
        let mut errors = validate_component(&component).err().unwrap_or_default();
        for machine in &component.state_machines {
            for transition in &machine.transitions {
                if transition.kind != TransitionKind::InterMachine {
                    continue;
                }
                if let Some(target) = &transition.target_machine {
                    if !component.has_machine(target) {
                        errors.push(DeclarationError::UnknownTargetMachine {
                            machine: machine.name.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        if !errors.is_empty() {
            return Err(EngineError::Declaration(errors));
        }

        let machines = component.state_machines.into_iter().map(|m| (m.name.clone(), m)).collect();
        let (events_tx, _) = broadcast::channel(1024);

        Ok(Self {
            component_name: component.name,
            clock,
            machines,
            instances: Mutex::new(HashMap::new()),
            hooks,
            persistence,
            timers,
            events_tx,
            cross_component,
        })
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn machine(&self, name: &str) -> Option<&StateMachine> {
        self.machines.get(name)
    }

    /// Every machine name this component declares, for registry
    /// announcements (`fsm:registry:announce`).
    pub fn declared_machine_names(&self) -> Vec<String> {
        self.machines.keys().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// Pump `TimerFired` notifications back into the dispatcher as regular
    /// `sendEvent` calls. Requires `Arc<Self>` since the spawned task must
    /// outlive the call that started it.
    pub fn spawn_timer_pump(self: &Arc<Self>, mut fired_rx: mpsc::UnboundedReceiver<TimerFired>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(fired) = fired_rx.recv().await {
                let event = IncomingEvent::empty(fired.event.clone(), engine.clock.epoch_ms());
                if let Err(err) = engine.send_event(fired.instance_id, event).await {
                    warn!(instance_id = %fired.instance_id, error = %err, "timer-fired dispatch failed");
                }
            }
        })
    }

    // ---- public operations (§4.1) ----

    pub async fn create_instance(&self, machine_name: &str, init_payload: Value) -> Result<InstanceId, EngineError> {
        let machine = self
            .machines
            .get(machine_name)
            .ok_or_else(|| DispatchError::UnknownMachine(machine_name.to_string()))?;
        let id = InstanceId::new();
        self.materialize_instance(machine, id, init_payload, vec![]).await?;
        Ok(id)
    }

    /// Like [`Engine::create_instance`], but under a pre-allocated id —
    /// the shape `createInstanceInComponent` needs, since the id handed
    /// back to a hook's `Sender::create_instance_in_component` call is
    /// minted before the cross-component delivery even runs.
    pub async fn create_instance_with_id(
        &self,
        machine_name: &str,
        id: InstanceId,
        init_payload: Value,
    ) -> Result<(), EngineError> {
        let machine = self
            .machines
            .get(machine_name)
            .ok_or_else(|| DispatchError::UnknownMachine(machine_name.to_string()))?;
        self.materialize_instance(machine, id, init_payload, vec![]).await
    }

    /// The component's backing event store, for cross-component history
    /// and causality queries (`fsm-registry`'s `getAllPersistedEvents`,
    /// `traceEventAcrossComponents`, `getInstanceHistory`).
    pub fn event_store(&self) -> &Arc<dyn EventStore> {
        self.persistence.events()
    }

    pub async fn send_event(&self, instance_id: InstanceId, event: IncomingEvent) -> Result<(), EngineError> {
        self.dispatch(instance_id, event, vec![]).await?;
        Ok(())
    }

    pub async fn broadcast_event(
        &self,
        machine_name: &str,
        state: &str,
        event: IncomingEvent,
    ) -> Result<usize, EngineError> {
        self.broadcast_internal(machine_name, state, event, &[], vec![]).await
    }

    pub async fn get_instance(&self, instance_id: InstanceId) -> Option<Instance> {
        self.instances.lock().await.get(&instance_id).cloned()
    }

    pub async fn get_instances_by_machine(&self, machine_name: &str) -> Vec<Instance> {
        self.instances.lock().await.values().filter(|i| i.machine_name == machine_name).cloned().collect()
    }

    pub async fn get_all_instances(&self) -> Vec<Instance> {
        self.instances.lock().await.values().cloned().collect()
    }

    /// Insert a rehydrated instance directly into the registry, bypassing
    /// `INSTANCE_CREATED` persistence (already on the log) — used by the
    /// restart path after `PersistenceManager::restore`.
    pub async fn reinstate(&self, instance: Instance) {
        self.instances.lock().await.insert(instance.id, instance);
    }

    /// Reinstate every restored snapshot and re-arm its pending `timeout`/
    /// `auto` timers (§4.2, §4.3). A timer whose `dueAt` already elapsed
    /// fires immediately through the same `TimerFired` channel a live
    /// timer uses, so the caller only needs `spawn_timer_pump` running.
    pub async fn restore_and_resync(&self, snapshots: Vec<Snapshot>) -> ResyncResult {
        let mut pending = Vec::new();
        for snapshot in &snapshots {
            let instance = &snapshot.instance;
            let Some(machine) = self.machines.get(&instance.machine_name) else { continue };
            for timeout in &snapshot.pending_timeouts {
                if let Some(slot) = classify_timer_slot(machine, timeout) {
                    pending.push((instance.id, timeout.clone(), slot));
                }
            }
        }
        for snapshot in snapshots {
            self.reinstate(snapshot.instance).await;
        }
        resynchronize(&self.timers, pending)
    }

    /// Pure walk over the declared machine from `initialState`: no
    /// registry, persistence, or timer side effects.
    pub fn simulate_path(&self, machine_name: &str, events: &[IncomingEvent]) -> Result<SimulationResult, EngineError> {
        let machine = self
            .machines
            .get(machine_name)
            .ok_or_else(|| DispatchError::UnknownMachine(machine_name.to_string()))?;
        let mut instance = Instance::new(InstanceId::new(), machine_name, machine.initial_state.clone(), 0);
        let mut visited = vec![instance.current_state.clone()];
        for event in events {
            match select::select_transition(machine, &instance.current_state, event, &instance)? {
                Some(transition) => {
                    instance.current_state = transition.to.clone();
                    visited.push(instance.current_state.clone());
                    if machine.state(&transition.to).map(State::is_terminal).unwrap_or(false) {
                        break;
                    }
                }
                None => {
                    return Ok(SimulationResult::Failed {
                        visited,
                        stuck_at: instance.current_state.clone(),
                        event: event.event_type.clone(),
                    });
                }
            }
        }
        Ok(SimulationResult::Completed { visited })
    }

    // ---- internals ----

    fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }

    async fn run_hook(
        &self,
        hook_name: Option<&str>,
        instance: &Instance,
        event: &IncomingEvent,
        sender: &Sender,
    ) -> HookOutput {
        let Some(name) = hook_name else { return HookOutput::new() };
        let Some(hook) = self.hooks.get(name).cloned() else { return HookOutput::new() };
        let ctx = HookContext {
            instance_id: instance.id,
            machine_name: &instance.machine_name,
            state: &instance.current_state,
            event,
            instance,
            sender,
        };
        match hook(ctx).await {
            Ok(patch) => patch,
            Err(message) => {
                self.emit(EngineEvent::HookError { instance_id: instance.id, hook: name.to_string(), message });
                HookOutput::new()
            }
        }
    }

    async fn run_pending(&self, sender: &Sender) -> Result<(), EngineError> {
        for action in sender.drain() {
            match action {
                PendingAction::SendToSelf(event) => {
                    self.drop_instance_not_found(self.send_event(sender.self_instance_id(), event).await)?;
                }
                PendingAction::SendTo { instance_id, event } => {
                    self.drop_instance_not_found(self.send_event(instance_id, event).await)?;
                }
                PendingAction::Broadcast { machine, state, event } => {
                    self.broadcast_event(&machine, &state, event).await?;
                }
                PendingAction::CreateInstance { id, machine, payload } => match self.machines.get(&machine) {
                    Some(target) => self.materialize_instance(target, id, payload, vec![]).await?,
                    None => warn!(%machine, "pending createInstance references unknown machine"),
                },
                PendingAction::SendToComponent { component, instance_id, event } => {
                    if let Some(cross) = sender.cross_component() {
                        cross.send_event_to_component(&component, instance_id, event).await?;
                    }
                }
                PendingAction::BroadcastToComponent { component, machine, state, event } => {
                    if let Some(cross) = sender.cross_component() {
                        cross.broadcast_to_component(&component, &machine, &state, event).await?;
                    }
                }
                PendingAction::CreateInstanceInComponent { id, component, machine, payload } => {
                    if let Some(cross) = sender.cross_component() {
                        cross.create_instance_in_component(&component, id, &machine, payload).await?;
                    }
                }
            }
        }
        Ok(())
    }

    fn drop_instance_not_found(&self, result: Result<(), EngineError>) -> Result<(), EngineError> {
        match result {
            Err(EngineError::Dispatch(DispatchError::InstanceNotFound(_))) => Ok(()),
            other => other,
        }
    }

    async fn materialize_instance(
        &self,
        machine: &StateMachine,
        id: InstanceId,
        init_payload: Value,
        caused_by: Vec<EventId>,
    ) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        let mut instance = Instance::new(id, machine.name.clone(), machine.initial_state.clone(), now);
        if let Some(type_name) = &machine.public_member_type {
            instance.public_member = Some(PublicMember::new(type_name.clone(), init_payload));
        } else if let Value::Object(map) = init_payload {
            instance.context = map.into_iter().collect();
        }

        let append_result = self
            .persistence
            .append(|event_id, persisted_at| PersistedEvent {
                id: event_id,
                instance_id: id,
                component_name: self.component_name.clone(),
                machine_name: machine.name.clone(),
                event: IncomingEvent::empty(INSTANCE_CREATED, now),
                state_before: instance.current_state.clone(),
                state_after: instance.current_state.clone(),
                persisted_at,
                caused_by: caused_by.clone(),
                caused: vec![],
                source_component_name: None,
                target_component_name: None,
            })
            .await;
        // Nothing has been inserted into the registry yet, so a failed
        // append here leaves no state to roll back — surface the failure
        // as an `error` event and propagate it rather than pretending the
        // instance exists.
        let persisted = match append_result {
            Ok(p) => p,
            Err(err) => {
                self.emit(EngineEvent::Error { instance_id: Some(id), message: err.to_string() });
                return Err(EngineError::Storage(err));
            }
        };
        for parent in &caused_by {
            let _ = self.persistence.record_caused(*parent, persisted.id).await;
        }

        self.emit(EngineEvent::InstanceCreated {
            instance_id: id,
            machine_name: machine.name.clone(),
            state: instance.current_state.clone(),
        });

        self.instances.lock().await.insert(id, instance.clone());

        if let Some(state_decl) = machine.state(&instance.current_state) {
            self.schedule_timers(machine, state_decl, &instance);
            self.process_cascades(state_decl, &instance, Some(persisted.id)).await?;
        }

        Ok(())
    }

    async fn broadcast_internal(
        &self,
        machine_name: &str,
        state: &str,
        event: IncomingEvent,
        extra_rules: &[MatchingRule],
        caused_by: Vec<EventId>,
    ) -> Result<usize, EngineError> {
        let candidates: Vec<InstanceId> = {
            let guard = self.instances.lock().await;
            guard
                .values()
                .filter(|i| i.machine_name == machine_name && i.current_state == state)
                .filter(|i| select::matching_rules_hold(extra_rules, &event, i))
                .map(|i| i.id)
                .collect()
        };
        let mut processed = 0usize;
        for id in candidates {
            match self.dispatch(id, event.clone(), caused_by.clone()).await {
                Ok(DispatchOutcome::Unhandled) => {}
                Ok(_) => processed += 1,
                Err(EngineError::Dispatch(DispatchError::InstanceNotFound(_))) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(processed)
    }

    fn schedule_timers(&self, machine: &StateMachine, state_decl: &State, instance: &Instance) {
        for transition in machine.transitions_from(&state_decl.name) {
            let slot = match transition.kind {
                TransitionKind::Timeout => TimerSlot::Timeout,
                TransitionKind::Auto => TimerSlot::Auto,
                _ => continue,
            };
            let delay = Duration::from_millis(transition.timeout_ms.unwrap_or(0));
            self.timers.schedule(instance.id, slot, state_decl.name.clone(), transition.event.clone(), delay);
        }
    }

    async fn process_cascades(
        &self,
        state_decl: &State,
        instance: &Instance,
        source_event_id: Option<EventId>,
    ) -> Result<(), EngineError> {
        if state_decl.cascading_rules.is_empty() {
            return Ok(());
        }
        let source_value = instance.properties();
        let now = self.clock.epoch_ms();
        let mut processed = 0usize;
        for rule in &state_decl.cascading_rules {
            let event = cascade_event(rule, &source_value, now);
            let caused_by = source_event_id.into_iter().collect::<Vec<_>>();
            processed += self
                .broadcast_internal(&rule.target_machine, &rule.target_state, event, &rule.matching_rules, caused_by)
                .await?;
        }
        self.emit(EngineEvent::CascadeCompleted {
            instance_id: instance.id,
            source_event_id,
            processed_count: processed,
        });
        Ok(())
    }

    async fn spawn_inter_machine(
        &self,
        transition: &Transition,
        source: &Instance,
        source_event_id: EventId,
    ) -> Result<(), EngineError> {
        let Some(target_name) = &transition.target_machine else { return Ok(()) };
        let target_machine = self
            .machines
            .get(target_name)
            .ok_or_else(|| DispatchError::UnknownMachine(target_name.clone()))?;

        let init_payload = match &transition.context_mapping {
            Some(mapping) => {
                let source_props = source.properties();
                let mut obj = serde_json::Map::new();
                for (target_key, source_key) in mapping {
                    if let Some(v) = fsm_core::json_path::get(&source_props, source_key) {
                        obj.insert(target_key.clone(), v.clone());
                    }
                }
                Value::Object(obj)
            }
            None => source.properties(),
        };

        let new_id = InstanceId::new();
        self.materialize_instance(target_machine, new_id, init_payload, vec![source_event_id]).await
    }

    /// §7 point 5: a failed append rolls the state change back entirely —
    /// the registry keeps the pre-transition instance, no hooks' effects
    /// are kept, and the event is reported the same as an unmatched one,
    /// plus an `error` event naming the storage failure.
    fn rollback_persistence_failure(
        &self,
        guard: MutexGuard<'_, HashMap<InstanceId, Instance>>,
        instance_id: InstanceId,
        instance: &Instance,
        event: &IncomingEvent,
        err: fsm_storage::StorageError,
    ) -> DispatchOutcome {
        drop(guard);
        self.emit(EngineEvent::Error { instance_id: Some(instance_id), message: err.to_string() });
        self.emit(EngineEvent::EventUnhandled {
            instance_id,
            machine_name: instance.machine_name.clone(),
            state: instance.current_state.clone(),
            event: event.event_type.clone(),
        });
        DispatchOutcome::Unhandled
    }

    /// The commit protocol (§4.1 "Commit protocol for a firing transition").
    /// Holds the single instance-map lock for the whole sequence; cascades
    /// and pending hook actions run only after it is released, since both
    /// re-enter `dispatch`/`send_event` and would deadlock otherwise.
    async fn dispatch(
        &self,
        instance_id: InstanceId,
        event: IncomingEvent,
        caused_by: Vec<EventId>,
    ) -> Result<DispatchOutcome, EngineError> {
        let mut guard = self.instances.lock().await;
        let instance = guard.get(&instance_id).cloned().ok_or(DispatchError::InstanceNotFound(instance_id))?;
        let machine = self
            .machines
            .get(&instance.machine_name)
            .ok_or_else(|| DispatchError::UnknownMachine(instance.machine_name.clone()))?;

        let transition = match select::select_transition(machine, &instance.current_state, &event, &instance)? {
            Some(t) => t,
            None => {
                let skip = select::first_rejected_candidate(machine, &instance.current_state, &event, &instance)?;
                drop(guard);
                if let Some((_, reason)) = skip {
                    let reason = match reason {
                        SkipReason::Guard(reason) => reason,
                        SkipReason::MatchingRule => "matching rule not satisfied".to_string(),
                        SkipReason::SpecificTriggeringRule => "specific triggering rule not satisfied".to_string(),
                    };
                    self.emit(EngineEvent::GuardFailed {
                        instance_id,
                        machine_name: instance.machine_name.clone(),
                        state: instance.current_state.clone(),
                        event: event.event_type.clone(),
                        reason,
                    });
                }
                self.emit(EngineEvent::EventUnhandled {
                    instance_id,
                    machine_name: instance.machine_name.clone(),
                    state: instance.current_state.clone(),
                    event: event.event_type.clone(),
                });
                return Ok(DispatchOutcome::Unhandled);
            }
        };

        let sender = Sender::new(instance_id, self.cross_component.clone());

        if transition.kind == TransitionKind::Internal {
            let patch = self.run_hook(transition.triggered_method.as_deref(), &instance, &event, &sender).await;
            let mut updated = instance.clone();
            updated.context.extend(patch);
            updated.updated_at = self.clock.epoch_ms();

            let append_result = self
                .persistence
                .append(|event_id, persisted_at| PersistedEvent {
                    id: event_id,
                    instance_id,
                    component_name: self.component_name.clone(),
                    machine_name: updated.machine_name.clone(),
                    event: event.clone(),
                    state_before: updated.current_state.clone(),
                    state_after: updated.current_state.clone(),
                    persisted_at,
                    caused_by: caused_by.clone(),
                    caused: vec![],
                    source_component_name: None,
                    target_component_name: None,
                })
                .await;
            let persisted = match append_result {
                Ok(p) => p,
                Err(err) => return Ok(self.rollback_persistence_failure(guard, instance_id, &instance, &event, err)),
            };
            for parent in &caused_by {
                let _ = self.persistence.record_caused(*parent, persisted.id).await;
            }
            self.persistence
                .maybe_snapshot(&updated, Some(persisted.id), self.timers.snapshot_pending(instance_id))
                .await;

            guard.insert(instance_id, updated);
            drop(guard);
            self.run_pending(&sender).await?;
            return Ok(DispatchOutcome::Internal);
        }

        let from_state = machine.state(&instance.current_state);
        let exit_patch = self.run_hook(from_state.and_then(|s| s.on_exit.as_deref()), &instance, &event, &sender).await;

        let mut updated = instance.clone();
        updated.context.extend(exit_patch);
        let state_before = updated.current_state.clone();
        updated.current_state = transition.to.clone();
        updated.updated_at = self.clock.epoch_ms();

        let preserve_timer = transition.is_self_loop() && !transition.reset_on_self_loop;
        if !preserve_timer {
            // Not re-armed on rollback below: a failed append here also
            // loses whatever timer the old state had pending.
            self.timers.cancel_all(instance_id);
        }

        let append_result = self
            .persistence
            .append(|event_id, persisted_at| PersistedEvent {
                id: event_id,
                instance_id,
                component_name: self.component_name.clone(),
                machine_name: updated.machine_name.clone(),
                event: event.clone(),
                state_before: state_before.clone(),
                state_after: updated.current_state.clone(),
                persisted_at,
                caused_by: caused_by.clone(),
                caused: vec![],
                source_component_name: None,
                target_component_name: None,
            })
            .await;
        let persisted = match append_result {
            Ok(p) => p,
            Err(err) => return Ok(self.rollback_persistence_failure(guard, instance_id, &instance, &event, err)),
        };
        for parent in &caused_by {
            let _ = self.persistence.record_caused(*parent, persisted.id).await;
        }

        let triggered_patch = self.run_hook(transition.triggered_method.as_deref(), &updated, &event, &sender).await;
        updated.context.extend(triggered_patch);

        self.emit(EngineEvent::StateChange {
            instance_id,
            machine_name: updated.machine_name.clone(),
            from: state_before.clone(),
            to: updated.current_state.clone(),
            event: event.event_type.clone(),
        });

        let to_state = machine.state(&updated.current_state);
        let entry_patch = self.run_hook(to_state.and_then(|s| s.on_entry.as_deref()), &updated, &event, &sender).await;
        updated.context.extend(entry_patch);

        if !preserve_timer {
            if let Some(state_decl) = to_state {
                self.schedule_timers(machine, state_decl, &updated);
            }
        }

        if transition.kind == TransitionKind::InterMachine {
            self.spawn_inter_machine(transition, &updated, persisted.id).await?;
        }

        let disposed = to_state.map(State::is_terminal).unwrap_or(false);
        if disposed {
            self.timers.cancel_all(instance_id);
            guard.remove(&instance_id);
        } else {
            self.persistence
                .maybe_snapshot(&updated, Some(persisted.id), self.timers.snapshot_pending(instance_id))
                .await;
            guard.insert(instance_id, updated.clone());
        }
        drop(guard);

        if disposed {
            self.emit(EngineEvent::InstanceDisposed {
                instance_id,
                machine_name: updated.machine_name.clone(),
                final_state: updated.current_state.clone(),
            });
        }
        if let Some(state_decl) = to_state {
            self.process_cascades(state_decl, &updated, Some(persisted.id)).await?;
        }

        self.run_pending(&sender).await?;

        Ok(DispatchOutcome::Committed)
    }
}

/// Which timer slot a restored `PendingTimeout` belongs to: the declared
/// transition leaving `timeout.state` on `timeout.fires_event` names it.
fn classify_timer_slot(machine: &StateMachine, timeout: &PendingTimeout) -> Option<TimerSlot> {
    machine.transitions_from(&timeout.state).find_map(|t| {
        if t.event != timeout.fires_event {
            return None;
        }
        match t.kind {
            TransitionKind::Timeout => Some(TimerSlot::Timeout),
            TransitionKind::Auto => Some(TimerSlot::Auto),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsm_core::test_support::{cascade_with_payload, component, machine, state, transition};
    use fsm_core::{FakeClock, MatchOperator, StateKind};
    use fsm_storage::{InMemoryEventStore, InMemorySnapshotStore, PersistenceConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine_for(component: Component, clock: FakeClock) -> Engine<FakeClock> {
        let events: Arc<dyn fsm_storage::EventStore> = Arc::new(InMemoryEventStore::new());
        let snapshots: Arc<dyn fsm_storage::SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
        let persistence =
            Arc::new(PersistenceManager::new(clock.clone(), PersistenceConfig::default(), events, snapshots));
        let (timers, _fire_rx) = TimerService::new(clock.clone());
        Engine::new(component, clock, persistence, Arc::new(timers), HookRegistry::new(), None).expect("valid component")
    }

    fn order_component() -> Component {
        component("Orders")
            .machine(
                machine("Order", "Pending")
                    .state(state("Pending", StateKind::Entry))
                    .state(state("Shipped", StateKind::Regular))
                    .state(state("Done", StateKind::Final))
                    .transition(transition("Pending", "Shipped", "SHIP").guard_keys(["carrier"]))
                    .transition(transition("Shipped", "Done", "DELIVER"))
                    .build(),
            )
            .build()
    }

    #[tokio::test]
    async fn linear_path_commits_and_disposes() {
        let engine = engine_for(order_component(), FakeClock::new());
        let id = engine.create_instance("Order", serde_json::json!({})).await.expect("create");

        engine
            .send_event(id, IncomingEvent::new("SHIP", serde_json::json!({"carrier": "UPS"}), 0))
            .await
            .expect("ship");
        let after_ship = engine.get_instance(id).await.expect("still alive");
        assert_eq!(after_ship.current_state, "Shipped");

        engine.send_event(id, IncomingEvent::empty("DELIVER", 0)).await.expect("deliver");
        assert!(engine.get_instance(id).await.is_none(), "terminal state disposes the instance");
    }

    #[tokio::test]
    async fn missing_guard_key_surfaces_guard_failed_and_stays_put() {
        let engine = engine_for(order_component(), FakeClock::new());
        let id = engine.create_instance("Order", serde_json::json!({})).await.expect("create");
        let mut events = engine.subscribe();

        engine.send_event(id, IncomingEvent::empty("SHIP", 0)).await.expect("dispatch does not error");

        let first = events.recv().await.expect("guard_failed");
        assert!(matches!(first, EngineEvent::GuardFailed { .. }));
        let second = events.recv().await.expect("event_unhandled");
        assert!(matches!(second, EngineEvent::EventUnhandled { .. }));
        assert_eq!(engine.get_instance(id).await.expect("unchanged").current_state, "Pending");
    }

    #[tokio::test]
    async fn matching_rule_mismatch_also_surfaces_guard_failed() {
        let component = component("Orders")
            .machine(
                machine("Order", "Pending")
                    .state(state("Pending", StateKind::Entry))
                    .state(state("Active", StateKind::Regular))
                    .transition(transition("Pending", "Active", "EXEC").matching_rule("OrderId", "Id", MatchOperator::Eq))
                    .build(),
            )
            .build();
        let engine = engine_for(component, FakeClock::new());
        let id = engine.create_instance("Order", serde_json::json!({})).await.expect("create");
        let mut events = engine.subscribe();

        engine
            .send_event(id, IncomingEvent::new("EXEC", serde_json::json!({"OrderId": 7}), 0))
            .await
            .expect("dispatch does not error");

        let first = events.recv().await.expect("guard_failed");
        assert!(matches!(first, EngineEvent::GuardFailed { .. }));
        let second = events.recv().await.expect("event_unhandled");
        assert!(matches!(second, EngineEvent::EventUnhandled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_transition_fires_after_delay() {
        let clock = FakeClock::new();
        let component = component("Orders")
            .machine(
                machine("Order", "Pending")
                    .state(state("Pending", StateKind::Entry))
                    .state(state("Expired", StateKind::Final))
                    .transition(transition("Pending", "Expired", "TIMEOUT").timeout_ms(50))
                    .build(),
            )
            .build();
        let events: Arc<dyn fsm_storage::EventStore> = Arc::new(InMemoryEventStore::new());
        let snapshots: Arc<dyn fsm_storage::SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
        let persistence =
            Arc::new(PersistenceManager::new(clock.clone(), PersistenceConfig::default(), events, snapshots));
        let (timers, fire_rx) = TimerService::new(clock.clone());
        let engine = Arc::new(
            Engine::new(component, clock.clone(), persistence, Arc::new(timers), HookRegistry::new(), None)
                .expect("valid component"),
        );
        let _pump = engine.spawn_timer_pump(fire_rx);

        let id = engine.create_instance("Order", serde_json::json!({})).await.expect("create");
        clock.advance(Duration::from_millis(60));
        tokio::time::advance(Duration::from_millis(60)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(engine.get_instance(id).await.is_none(), "timeout disposed the instance");
    }

    #[tokio::test]
    async fn cascading_rule_starts_the_downstream_machine() {
        let component = component("Orders")
            .machine(
                machine("Order", "Pending")
                    .state(
                        state("Pending", StateKind::Entry)
                            .cascade(cascade_with_payload("Shipment", "Idle", "START", serde_json::json!({"orderId": "{{Id}}"}))),
                    )
                    .build(),
            )
            .machine(
                machine("Shipment", "Idle")
                    .state(state("Idle", StateKind::Entry))
                    .state(state("Active", StateKind::Regular))
                    .transition(transition("Idle", "Active", "START"))
                    .build(),
            )
            .build();
        let engine = engine_for(component, FakeClock::new());

        let shipment_id = engine.create_instance("Shipment", serde_json::json!({})).await.expect("create shipment");
        let mut events = engine.subscribe();

        engine.create_instance("Order", serde_json::json!({"Id": "42"})).await.expect("create order");

        let shipment = engine.get_instance(shipment_id).await.expect("alive");
        assert_eq!(shipment.current_state, "Active");

        let processed = AtomicUsize::new(0);
        while let Ok(e) = events.try_recv() {
            if let EngineEvent::CascadeCompleted { processed_count, .. } = e {
                processed.store(processed_count, Ordering::SeqCst);
            }
        }
        assert_eq!(processed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn broadcast_only_reaches_matching_instances() {
        let component = component("Orders")
            .machine(
                machine("Order", "Pending")
                    .state(state("Pending", StateKind::Entry))
                    .state(state("Active", StateKind::Regular))
                    .transition(
                        transition("Pending", "Active", "ACTIVATE")
                            .matching_rule("OrderId", "Id", MatchOperator::Eq),
                    )
                    .build(),
            )
            .build();
        let engine = engine_for(component, FakeClock::new());
        let a = engine.create_instance("Order", serde_json::json!({"Id": 1})).await.expect("a");
        let b = engine.create_instance("Order", serde_json::json!({"Id": 2})).await.expect("b");

        let processed = engine
            .broadcast_event("Order", "Pending", IncomingEvent::new("ACTIVATE", serde_json::json!({"OrderId": 2}), 0))
            .await
            .expect("broadcast");

        assert_eq!(processed, 1);
        assert_eq!(engine.get_instance(a).await.expect("a").current_state, "Pending");
        assert_eq!(engine.get_instance(b).await.expect("b").current_state, "Active");
    }
}
