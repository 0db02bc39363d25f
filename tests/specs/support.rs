// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the end-to-end scenario specs (§8). Builds a single
//! component's engine against in-memory persistence and a real timer
//! service, wired the same way a production runtime wires them, just with
//! a `FakeClock` underneath so timeouts are deterministic.

use std::sync::Arc;

use fsm_core::{Component, FakeClock};
use fsm_engine::{Engine, EngineError, HookRegistry};
use fsm_storage::{InMemoryEventStore, InMemorySnapshotStore, PersistenceConfig, PersistenceManager};
use fsm_timer::TimerService;

pub struct Harness {
    pub engine: Arc<Engine<FakeClock>>,
    pub clock: FakeClock,
    pub events: Arc<dyn fsm_storage::EventStore>,
    pub snapshots: Arc<dyn fsm_storage::SnapshotStore>,
}

pub fn build(component: Component) -> Result<Harness, EngineError> {
    build_with_config(component, PersistenceConfig::default())
}

pub fn build_with_config(component: Component, config: PersistenceConfig) -> Result<Harness, EngineError> {
    let clock = FakeClock::new();
    let events: Arc<dyn fsm_storage::EventStore> = Arc::new(InMemoryEventStore::new());
    let snapshots: Arc<dyn fsm_storage::SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
    let persistence = Arc::new(PersistenceManager::new(clock.clone(), config, events.clone(), snapshots.clone()));
    let (timers, fired_rx) = TimerService::new(clock.clone());
    let engine = Arc::new(Engine::new(component, clock.clone(), persistence, Arc::new(timers), HookRegistry::new(), None)?);
    engine.spawn_timer_pump(fired_rx);
    Ok(Harness { engine, clock, events, snapshots })
}
