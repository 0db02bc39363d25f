// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The incoming event shape and the append-only persisted event log entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::define_id;
use crate::instance::InstanceId;

define_id! {
    /// Unique identifier for a persisted event.
    ///
    /// Generated in monotonically increasing order by the persistence
    /// manager so append-order and id-order coincide, which is what lets
    /// `traceEventCausality` treat `caused`/`causedBy` as acyclic.
    pub struct EventId("evt-");
}

/// The special event type recorded when an instance is first created.
pub const INSTANCE_CREATED: &str = "INSTANCE_CREATED";

/// An event as delivered to the dispatcher: a type tag, a payload, and the
/// wall-clock time it arrived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    pub occurred_at_ms: u64,
}

impl IncomingEvent {
    pub fn new(event_type: impl Into<String>, payload: Value, occurred_at_ms: u64) -> Self {
        Self { event_type: event_type.into(), payload, occurred_at_ms }
    }

    pub fn empty(event_type: impl Into<String>, occurred_at_ms: u64) -> Self {
        Self::new(event_type, Value::Null, occurred_at_ms)
    }
}

/// Immutable append-only log entry describing one committed state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEvent {
    pub id: EventId,
    pub instance_id: InstanceId,
    pub component_name: String,
    pub machine_name: String,
    pub event: IncomingEvent,
    pub state_before: String,
    pub state_after: String,
    pub persisted_at: u64,
    #[serde(default)]
    pub caused_by: Vec<EventId>,
    #[serde(default)]
    pub caused: Vec<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_component_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_component_name: Option<String>,
}

impl PersistedEvent {
    pub fn is_instance_created(&self) -> bool {
        self.event.event_type == INSTANCE_CREATED
    }
}
