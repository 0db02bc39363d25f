// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire shapes for the event log (§4.3, §6): `camelCase` JSON, decoupled
//! from `fsm-core`'s internal `snake_case` representation so persistence
//! drivers and dashboards see a stable external schema.

use fsm_core::{EventId, IncomingEvent, InstanceId, PersistedEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncomingEventDto {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    pub occurred_at_ms: u64,
}

impl From<&IncomingEvent> for IncomingEventDto {
    fn from(e: &IncomingEvent) -> Self {
        Self { event_type: e.event_type.clone(), payload: e.payload.clone(), occurred_at_ms: e.occurred_at_ms }
    }
}

impl From<IncomingEventDto> for IncomingEvent {
    fn from(dto: IncomingEventDto) -> Self {
        IncomingEvent::new(dto.event_type, dto.payload, dto.occurred_at_ms)
    }
}

/// One committed log entry, as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEventDto {
    pub id: EventId,
    pub instance_id: InstanceId,
    pub component_name: String,
    pub machine_name: String,
    pub event: IncomingEventDto,
    pub state_before: String,
    pub state_after: String,
    pub persisted_at: u64,
    #[serde(default)]
    pub caused_by: Vec<EventId>,
    #[serde(default)]
    pub caused: Vec<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_component_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_component_name: Option<String>,
}

impl From<&PersistedEvent> for PersistedEventDto {
    fn from(e: &PersistedEvent) -> Self {
        Self {
            id: e.id,
            instance_id: e.instance_id,
            component_name: e.component_name.clone(),
            machine_name: e.machine_name.clone(),
            event: IncomingEventDto::from(&e.event),
            state_before: e.state_before.clone(),
            state_after: e.state_after.clone(),
            persisted_at: e.persisted_at,
            caused_by: e.caused_by.clone(),
            caused: e.caused.clone(),
            source_component_name: e.source_component_name.clone(),
            target_component_name: e.target_component_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_event_dto_round_trips_through_json() {
        let event = PersistedEvent {
            id: EventId::new(),
            instance_id: InstanceId::new(),
            component_name: "Orders".to_string(),
            machine_name: "Order".to_string(),
            event: IncomingEvent::empty("GO", 1_000),
            state_before: "Pending".to_string(),
            state_after: "Active".to_string(),
            persisted_at: 1_000,
            caused_by: vec![],
            caused: vec![],
            source_component_name: None,
            target_component_name: None,
        };
        let dto = PersistedEventDto::from(&event);
        let json = serde_json::to_value(&dto).expect("serialize");
        assert_eq!(json["machineName"], "Order");
        assert_eq!(json["stateAfter"], "Active");

        let round_tripped: PersistedEventDto = serde_json::from_value(json).expect("deserialize");
        assert_eq!(round_tripped, dto);
    }
}
