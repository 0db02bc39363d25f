// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The internal engine event bus: what the dispatcher emits around every
//! operation, independent of the `IncomingEvent`s instances receive.

use serde::{Deserialize, Serialize};

use crate::instance::InstanceId;
use crate::persisted::EventId;

/// One emission on the engine's internal pub/sub stream. The broadcaster
/// mirrors these onto broker channels (§4.5); tests assert on them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    #[serde(rename = "instance_created")]
    InstanceCreated {
        instance_id: InstanceId,
        machine_name: String,
        state: String,
    },

    #[serde(rename = "state_change")]
    StateChange {
        instance_id: InstanceId,
        machine_name: String,
        from: String,
        to: String,
        event: String,
    },

    #[serde(rename = "event_unhandled")]
    EventUnhandled {
        instance_id: InstanceId,
        machine_name: String,
        state: String,
        event: String,
    },

    #[serde(rename = "guard_failed")]
    GuardFailed {
        instance_id: InstanceId,
        machine_name: String,
        state: String,
        event: String,
        reason: String,
    },

    #[serde(rename = "hook_error")]
    HookError {
        instance_id: InstanceId,
        hook: String,
        message: String,
    },

    #[serde(rename = "cascade_completed")]
    CascadeCompleted {
        instance_id: InstanceId,
        source_event_id: Option<EventId>,
        processed_count: usize,
    },

    #[serde(rename = "instance_disposed")]
    InstanceDisposed {
        instance_id: InstanceId,
        machine_name: String,
        final_state: String,
    },

    #[serde(rename = "broadcast_error")]
    BroadcastError { component_name: String, message: String },

    #[serde(rename = "broker_disconnected")]
    BrokerDisconnected { reason: String },

    /// A commit-time failure (persistence append failed, its state change
    /// rolled back). Not raised for guard/matching misses — see `guard_failed`.
    #[serde(rename = "error")]
    Error {
        instance_id: Option<InstanceId>,
        message: String,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::InstanceCreated { .. } => "instance_created",
            EngineEvent::StateChange { .. } => "state_change",
            EngineEvent::EventUnhandled { .. } => "event_unhandled",
            EngineEvent::GuardFailed { .. } => "guard_failed",
            EngineEvent::HookError { .. } => "hook_error",
            EngineEvent::CascadeCompleted { .. } => "cascade_completed",
            EngineEvent::InstanceDisposed { .. } => "instance_disposed",
            EngineEvent::BroadcastError { .. } => "broadcast_error",
            EngineEvent::BrokerDisconnected { .. } => "broker_disconnected",
            EngineEvent::Error { .. } => "error",
        }
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        match self {
            EngineEvent::InstanceCreated { instance_id, .. }
            | EngineEvent::StateChange { instance_id, .. }
            | EngineEvent::EventUnhandled { instance_id, .. }
            | EngineEvent::GuardFailed { instance_id, .. }
            | EngineEvent::HookError { instance_id, .. }
            | EngineEvent::CascadeCompleted { instance_id, .. }
            | EngineEvent::InstanceDisposed { instance_id, .. } => Some(*instance_id),
            EngineEvent::Error { instance_id, .. } => *instance_id,
            EngineEvent::BroadcastError { .. } | EngineEvent::BrokerDisconnected { .. } => None,
        }
    }
}
