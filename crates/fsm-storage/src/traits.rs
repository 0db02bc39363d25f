// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Injectable store contracts (§4.3). In-memory implementations back the
//! core and the tests; a relational or document driver satisfies the same
//! contract with durable backing and indexes on `instance_id`,
//! `persisted_at`, and `caused_by`.

use async_trait::async_trait;
use fsm_core::{EventId, InstanceId, PersistedEvent, Snapshot};

use crate::error::StorageError;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event. Synchronous from the caller's viewpoint: the
    /// commit does not return to the caller until this resolves (§4.3).
    async fn append(&self, event: PersistedEvent) -> Result<(), StorageError>;

    async fn by_instance(&self, id: InstanceId) -> Result<Vec<PersistedEvent>, StorageError>;

    async fn by_time_range(&self, lo: u64, hi: u64) -> Result<Vec<PersistedEvent>, StorageError>;

    /// Events produced because of `id` — i.e. events whose `causedBy` lists it.
    async fn caused_by(&self, id: EventId) -> Result<Vec<PersistedEvent>, StorageError>;

    async fn all(&self) -> Result<Vec<PersistedEvent>, StorageError>;

    /// Append `child_id` to `parent_id`'s `caused[]` as the cascade that
    /// produced it completes. `caused` grows after the initial append.
    async fn record_caused(&self, parent_id: EventId, child_id: EventId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: Snapshot) -> Result<(), StorageError>;

    async fn get(&self, instance_id: InstanceId) -> Result<Option<Snapshot>, StorageError>;

    async fn all(&self) -> Result<Vec<Snapshot>, StorageError>;

    async fn delete(&self, instance_id: InstanceId) -> Result<(), StorageError>;
}
