// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition declarations: the edges of a state machine.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Regular,
    Auto,
    Timeout,
    #[serde(rename = "inter_machine")]
    InterMachine,
    Internal,
}

impl Default for TransitionKind {
    fn default() -> Self {
        TransitionKind::Regular
    }
}

crate::simple_display! {
    TransitionKind {
        Regular => "regular",
        Auto => "auto",
        Timeout => "timeout",
        InterMachine => "inter_machine",
        Internal => "internal",
    }
}

impl TransitionKind {
    pub fn schedules_timer(self) -> bool {
        matches!(self, TransitionKind::Timeout | TransitionKind::Auto)
    }
}

/// Comparison applied between an event field and an instance field by a
/// [`MatchingRule`]. Defaults to `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl Default for MatchOperator {
    fn default() -> Self {
        MatchOperator::Eq
    }
}

/// Predicate pairing an event field against an instance field to route
/// broadcasts and gate transitions. Both sides support dotted paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingRule {
    pub event_property: String,
    pub instance_property: String,
    #[serde(default)]
    pub operator: MatchOperator,
}

/// Predicate gating a transition after matching rules and the specific
/// triggering rule both hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Guard {
    Keys {
        keys: Vec<String>,
    },
    Expression {
        #[serde(alias = "customFunction")]
        expression: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub event: String,
    #[serde(default, rename = "type")]
    pub kind: TransitionKind,
    #[serde(default)]
    pub guards: Vec<Guard>,
    #[serde(default)]
    pub matching_rules: Vec<MatchingRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_triggering_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub reset_on_self_loop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_machine: Option<String>,
    /// `targetKey -> sourceKey` projection; `None` copies the full context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_mapping: Option<IndexMap<String, String>>,
}

impl Transition {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}
