// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire shapes for component declarations (§3, §6). `fsm-core`'s
//! `Component`/`StateMachine`/`State`/`Transition` types already carry the
//! serde renames a JSON/YAML declaration needs (`type`, `entryMethod`,
//! `customFunction`, …), so this module re-exports them as the contract a
//! declarative loader implements against, plus the envelope a bundle of
//! components is shipped under.

pub use fsm_core::{CascadingRule, Component, Guard, MatchOperator, MatchingRule, State, StateKind, StateMachine, Transition, TransitionKind};

use serde::{Deserialize, Serialize};

/// One or more component declarations plus the format version a loader
/// should check before accepting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationBundle {
    pub schema_version: u32,
    pub components: Vec<Component>,
}

impl DeclarationBundle {
    pub const CURRENT_SCHEMA_VERSION: u32 = 1;

    pub fn new(components: Vec<Component>) -> Self {
        Self { schema_version: Self::CURRENT_SCHEMA_VERSION, components }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_serializes_schema_version_in_camel_case() {
        let bundle = DeclarationBundle::new(vec![]);
        let json = serde_json::to_value(&bundle).expect("serialize");
        assert_eq!(json["schemaVersion"], 1);
    }
}
