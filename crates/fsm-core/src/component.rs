// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component and state machine declarations (immutable once constructed).

use serde::{Deserialize, Serialize};

use crate::transition::{MatchingRule, Transition};

/// Top-level named container of machines. Identifies a deployable unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_machine: Option<String>,
    pub state_machines: Vec<StateMachine>,
}

impl Component {
    pub fn machine(&self, name: &str) -> Option<&StateMachine> {
        self.state_machines.iter().find(|m| m.name == name)
    }

    pub fn has_machine(&self, name: &str) -> bool {
        self.machine(name).is_some()
    }
}

/// Named FSM declaration within a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMachine {
    pub name: String,
    pub initial_state: String,
    /// When set, instances of this machine carry a [`crate::instance::PublicMember`]
    /// (the business object) instead of a free-form context map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_member_type: Option<String>,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
    /// Informational only; consumed by the dashboard, not evaluated here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_schema: Option<serde_json::Value>,
}

impl StateMachine {
    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Transitions declared `from == state`, in declaration order —
    /// the order `sendEvent` must respect for deterministic selection.
    pub fn transitions_from<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.from == state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Entry,
    Regular,
    Final,
    Error,
}

impl Default for StateKind {
    fn default() -> Self {
        StateKind::Regular
    }
}

crate::simple_display! {
    StateKind {
        Entry => "entry",
        Regular => "regular",
        Final => "final",
        Error => "error",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: StateKind,
    #[serde(default, alias = "entryMethod", skip_serializing_if = "Option::is_none")]
    pub on_entry: Option<String>,
    #[serde(default, alias = "exitMethod", skip_serializing_if = "Option::is_none")]
    pub on_exit: Option<String>,
    #[serde(default)]
    pub cascading_rules: Vec<CascadingRule>,
}

impl State {
    /// Reaching this state atomically disposes the owning instance.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StateKind::Final | StateKind::Error)
    }
}

/// Auto-emitted outbound event fired when a state becomes active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadingRule {
    pub target_machine: String,
    pub target_state: String,
    pub event: String,
    #[serde(default)]
    pub matching_rules: Vec<MatchingRule>,
    /// String-template payload, resolved with `{{path.to.field}}` substitution
    /// against the firing instance's `publicMember`/`context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}
