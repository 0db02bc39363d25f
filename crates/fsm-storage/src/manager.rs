// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistence manager: ties an `EventStore` and `SnapshotStore`
//! together with id generation, the snapshot interval, and restart
//! restore (§4.3).

use std::collections::HashSet;
use std::sync::Arc;

use fsm_core::{Clock, EventId, Instance, InstanceId, PersistedEvent, Snapshot};
use parking_lot::Mutex;
use tracing::warn;

use crate::error::StorageError;
use crate::id_gen::EventIdGenerator;
use crate::traits::{EventStore, SnapshotStore};

/// Tunable engine-level settings, the workspace's equivalent of the
/// teacher's plain `RuntimeConfig` struct: no file-based loader, just a
/// struct constructed by the embedder.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceConfig {
    /// Write a snapshot every N transitions for a given instance. `0` disables snapshotting.
    pub snapshot_interval: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { snapshot_interval: 0 }
    }
}

/// Result of `restore()` (§4.3): instances successfully rehydrated vs.
/// instances whose machine is absent from the current declaration.
#[derive(Debug, Clone, Default)]
pub struct RestoreResult {
    pub restored: Vec<Snapshot>,
    pub failed: usize,
}

pub struct PersistenceManager<C: Clock> {
    clock: C,
    config: PersistenceConfig,
    events: Arc<dyn EventStore>,
    snapshots: Arc<dyn SnapshotStore>,
    id_gen: EventIdGenerator,
    transitions_since_snapshot: Mutex<std::collections::HashMap<InstanceId, u32>>,
}

impl<C: Clock> PersistenceManager<C> {
    pub fn new(
        clock: C,
        config: PersistenceConfig,
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            clock,
            config,
            events,
            snapshots,
            id_gen: EventIdGenerator::new(),
            transitions_since_snapshot: Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn events(&self) -> &Arc<dyn EventStore> {
        &self.events
    }

    pub fn snapshot_store(&self) -> &Arc<dyn SnapshotStore> {
        &self.snapshots
    }

    /// Allocate the next monotonic event id and stamp `persisted_at` from
    /// the clock, then append. One call == one commit (§4.1 step 4).
    pub async fn append(
        &self,
        build: impl FnOnce(EventId, u64) -> PersistedEvent,
    ) -> Result<PersistedEvent, StorageError> {
        let id = self.id_gen.next();
        let persisted_at = self.clock.epoch_ms();
        let event = build(id, persisted_at);
        self.events.append(event.clone()).await?;
        Ok(event)
    }

    /// Append `child_id` to `parent_id`'s `caused[]`, the other half of a
    /// causality link alongside the child's own `caused_by`.
    pub async fn record_caused(&self, parent_id: EventId, child_id: EventId) -> Result<(), StorageError> {
        self.events.record_caused(parent_id, child_id).await
    }

    /// Bump the per-instance transition counter and, if `snapshotInterval`
    /// transitions have elapsed, write a snapshot. Snapshot failures are
    /// logged and retried on the next interval, not surfaced to the caller.
    pub async fn maybe_snapshot(&self, instance: &Instance, last_event_id: Option<EventId>, pending_timeouts: Vec<fsm_core::PendingTimeout>) {
        if self.config.snapshot_interval == 0 {
            return;
        }

        let due = {
            let mut counters = self.transitions_since_snapshot.lock();
            let counter = counters.entry(instance.id).or_insert(0);
            *counter += 1;
            if *counter >= self.config.snapshot_interval {
                *counter = 0;
                true
            } else {
                false
            }
        };

        if !due {
            return;
        }

        let snapshot = Snapshot {
            instance: instance.clone(),
            snapshot_at: self.clock.epoch_ms(),
            last_event_id,
            pending_timeouts,
        };

        if let Err(err) = self.snapshots.save(snapshot).await {
            warn!(instance_id = %instance.id, error = %err, "snapshot write failed, will retry next interval");
        }
    }

    /// Rehydrate every snapshot whose machine is present in
    /// `known_machines`; anything else counts as `failed` (machine schema
    /// drift is not auto-reconciled, the log is preserved regardless).
    pub async fn restore(&self, known_machines: &HashSet<String>) -> Result<RestoreResult, StorageError> {
        let mut result = RestoreResult::default();
        for snapshot in self.snapshots.all().await? {
            if known_machines.contains(&snapshot.instance.machine_name) {
                result.restored.push(snapshot);
            } else {
                warn!(
                    instance_id = %snapshot.instance.id,
                    machine = %snapshot.instance.machine_name,
                    "restore skipped: machine absent from current declaration"
                );
                result.failed += 1;
            }
        }
        Ok(result)
    }
}
