// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime-owned instance state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::define_id;
use crate::snapshot::PendingTimeout;

define_id! {
    /// Opaque identifier for a running state machine instance.
    pub struct InstanceId("ist-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Active,
    Completed,
    Error,
}

crate::simple_display! {
    InstanceStatus {
        Active => "active",
        Completed => "completed",
        Error => "error",
    }
}

/// The business object a machine uses in place of `context` when it
/// declares a `publicMemberType`. Kept as a tagged JSON value so
/// implementations that want strong typing can match on `type_name`
/// and deserialize `value` into their own struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMember {
    pub type_name: String,
    pub value: Value,
}

impl PublicMember {
    pub fn new(type_name: impl Into<String>, value: Value) -> Self {
        Self { type_name: type_name.into(), value }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub machine_name: String,
    pub current_state: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    /// Present iff the owning machine declares `publicMemberType`. Treated
    /// as read-only by the engine after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_member: Option<PublicMember>,
    pub created_at: u64,
    pub updated_at: u64,
    /// At most one pending timer per state currently occupied, by state name.
    #[serde(default)]
    pub pending_timeouts: HashMap<String, PendingTimeout>,
}

impl Instance {
    pub fn new(
        id: InstanceId,
        machine_name: impl Into<String>,
        initial_state: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            machine_name: machine_name.into(),
            current_state: initial_state.into(),
            status: InstanceStatus::Active,
            context: HashMap::new(),
            public_member: None,
            created_at: now_ms,
            updated_at: now_ms,
            pending_timeouts: HashMap::new(),
        }
    }

    /// `publicMember` when present, else `context` rendered as a JSON object —
    /// the property source matching rules and templates read from (§3, §9).
    pub fn properties(&self) -> Value {
        match &self.public_member {
            Some(pm) => pm.value.clone(),
            None => serde_json::to_value(&self.context).unwrap_or(Value::Null),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, InstanceStatus::Completed | InstanceStatus::Error)
    }
}
