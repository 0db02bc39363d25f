// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire shapes for instance state and snapshots (§4.3, §6).

use std::collections::HashMap;

use fsm_core::{EventId, Instance, InstanceId, InstanceStatus, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingTimeoutDto {
    pub state: String,
    pub due_at_ms: u64,
    pub fires_event: String,
}

/// Full instance state, as returned by a `getInstance` style query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDetail {
    pub id: InstanceId,
    pub machine_name: String,
    pub current_state: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_member: Option<Value>,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default)]
    pub pending_timeouts: HashMap<String, PendingTimeoutDto>,
}

impl From<&Instance> for InstanceDetail {
    fn from(instance: &Instance) -> Self {
        Self {
            id: instance.id,
            machine_name: instance.machine_name.clone(),
            current_state: instance.current_state.clone(),
            status: instance.status,
            context: instance.context.clone(),
            public_member: instance.public_member.as_ref().map(|pm| pm.value.clone()),
            created_at: instance.created_at,
            updated_at: instance.updated_at,
            pending_timeouts: instance
                .pending_timeouts
                .iter()
                .map(|(state, t)| {
                    (
                        state.clone(),
                        PendingTimeoutDto { state: t.state.clone(), due_at_ms: t.due_at_ms, fires_event: t.fires_event.clone() },
                    )
                })
                .collect(),
        }
    }
}

/// Row shape for a listing (`getAllInstances`, `getInstancesByMachine`,
/// dashboard instance tables) — lighter than [`InstanceDetail`], no context
/// dump.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub id: InstanceId,
    pub machine_name: String,
    pub current_state: String,
    pub status: InstanceStatus,
    pub updated_at: u64,
}

impl From<&Instance> for InstanceSummary {
    fn from(instance: &Instance) -> Self {
        Self {
            id: instance.id,
            machine_name: instance.machine_name.clone(),
            current_state: instance.current_state.clone(),
            status: instance.status,
            updated_at: instance.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub instance: InstanceDetail,
    pub snapshot_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_id: Option<EventId>,
    #[serde(default)]
    pub pending_timeouts: Vec<PendingTimeoutDto>,
}

impl From<&Snapshot> for SnapshotDto {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            instance: InstanceDetail::from(&snapshot.instance),
            snapshot_at: snapshot.snapshot_at,
            last_event_id: snapshot.last_event_id,
            pending_timeouts: snapshot
                .pending_timeouts
                .iter()
                .map(|t| PendingTimeoutDto { state: t.state.clone(), due_at_ms: t.due_at_ms, fires_event: t.fires_event.clone() })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_summary_omits_context() {
        let instance = Instance::new(InstanceId::new(), "Order", "Pending", 0);
        let json = serde_json::to_value(InstanceSummary::from(&instance)).expect("serialize");
        assert_eq!(json["currentState"], "Pending");
        assert!(json.get("context").is_none());
    }
}
