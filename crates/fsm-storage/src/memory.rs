// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `EventStore`/`SnapshotStore` — backs the core engine in
//! monolith mode and every test in this workspace.

use async_trait::async_trait;
use fsm_core::{EventId, InstanceId, PersistedEvent, Snapshot};
use parking_lot::Mutex;

use crate::error::StorageError;
use crate::traits::{EventStore, SnapshotStore};

#[derive(Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<PersistedEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: PersistedEvent) -> Result<(), StorageError> {
        self.events.lock().push(event);
        Ok(())
    }

    async fn by_instance(&self, id: InstanceId) -> Result<Vec<PersistedEvent>, StorageError> {
        Ok(self.events.lock().iter().filter(|e| e.instance_id == id).cloned().collect())
    }

    async fn by_time_range(&self, lo: u64, hi: u64) -> Result<Vec<PersistedEvent>, StorageError> {
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.persisted_at >= lo && e.persisted_at <= hi)
            .cloned()
            .collect())
    }

    async fn caused_by(&self, id: EventId) -> Result<Vec<PersistedEvent>, StorageError> {
        Ok(self.events.lock().iter().filter(|e| e.caused_by.contains(&id)).cloned().collect())
    }

    async fn all(&self) -> Result<Vec<PersistedEvent>, StorageError> {
        Ok(self.events.lock().clone())
    }

    async fn record_caused(&self, parent_id: EventId, child_id: EventId) -> Result<(), StorageError> {
        let mut events = self.events.lock();
        let parent = events
            .iter_mut()
            .find(|e| e.id == parent_id)
            .ok_or(StorageError::EventNotFound(parent_id))?;
        if !parent.caused.contains(&child_id) {
            parent.caused.push(child_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<std::collections::HashMap<InstanceId, Snapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: Snapshot) -> Result<(), StorageError> {
        self.snapshots.lock().insert(snapshot.instance.id, snapshot);
        Ok(())
    }

    async fn get(&self, instance_id: InstanceId) -> Result<Option<Snapshot>, StorageError> {
        Ok(self.snapshots.lock().get(&instance_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Snapshot>, StorageError> {
        Ok(self.snapshots.lock().values().cloned().collect())
    }

    async fn delete(&self, instance_id: InstanceId) -> Result<(), StorageError> {
        self.snapshots.lock().remove(&instance_id);
        Ok(())
    }
}
