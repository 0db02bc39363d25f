// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot of materialized instance state, sufficient for warm restart
//! without replaying the full event log.

use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::persisted::EventId;

/// A single armed timer, serialized as an absolute fire time so it survives
/// a restart without reference to any live task handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTimeout {
    pub state: String,
    pub due_at_ms: u64,
    /// Event type synthesized when the timer fires (the transition's `event`).
    pub fires_event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub instance: Instance,
    pub snapshot_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_id: Option<EventId>,
    #[serde(default)]
    pub pending_timeouts: Vec<PendingTimeout>,
}
