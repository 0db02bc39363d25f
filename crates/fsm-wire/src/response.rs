// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dashboard / REST response shapes (§6). Types only — no HTTP server is
//! built here; a façade crate would serialize these directly.

use fsm_core::{EventId, InstanceId};
use serde::{Deserialize, Serialize};

use crate::event::PersistedEventDto;
use crate::instance::InstanceSummary;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub components_registered: usize,
}

/// One registered component, as listed by a dashboard's component directory
/// view. Mirrors `fsm-registry::ComponentInfo` but on the wire side of the
/// crate boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSummary {
    pub name: String,
    pub machines: Vec<String>,
    pub instance_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentListResponse {
    pub components: Vec<ComponentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceListResponse {
    pub instances: Vec<InstanceSummary>,
}

/// Response for `getInstanceHistory` (§4.4): every persisted event touching
/// one instance, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHistoryResponse {
    pub instance_id: InstanceId,
    pub events: Vec<PersistedEventDto>,
}

/// Response for `traceEventAcrossComponents` (§4.4): the causal chain
/// reachable from one event, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CausalityTraceResponse {
    pub root_event_id: EventId,
    pub events: Vec<PersistedEventDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_uses_camel_case_fields() {
        let health = HealthResponse { status: "ok".to_string(), uptime_secs: 42, components_registered: 3 };
        let json = serde_json::to_value(&health).expect("serialize");
        assert_eq!(json["uptimeSecs"], 42);
        assert_eq!(json["componentsRegistered"], 3);
    }
}
