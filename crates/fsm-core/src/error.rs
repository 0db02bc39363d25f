// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by declaration-time validation and dispatch.

use thiserror::Error;

use crate::instance::InstanceId;

/// Detected on runtime construction; construction fails immediately.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("machine {machine:?} declares no states")]
    NoStates { machine: String },
    #[error("machine {machine:?} has no state named {state:?} for its initialState")]
    UnknownInitialState { machine: String, state: String },
    #[error("duplicate state name {state:?} in machine {machine:?}")]
    DuplicateState { machine: String, state: String },
    #[error("transition in machine {machine:?} references unknown state {state:?} ({role})")]
    DanglingTransition { machine: String, state: String, role: &'static str },
    #[error("transition in machine {machine:?} targets unknown machine {target:?}")]
    UnknownTargetMachine { machine: String, target: String },
    #[error("component {component:?} declares entryMachine {entry:?} which is not one of its machines")]
    UnknownEntryMachine { component: String, entry: String },
    #[error("duplicate machine name {machine:?} in component {component:?}")]
    DuplicateMachine { component: String, machine: String },
}

/// Errors surfaced by the dispatcher and registry at routing time.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no instance with id {0}")]
    InstanceNotFound(InstanceId),
    #[error("no machine named {0} in this runtime")]
    UnknownMachine(String),
    #[error("cross-component operation attempted without a registry")]
    CrossComponentUnavailable,
    #[error("persistence append failed: {0}")]
    PersistenceFailed(String),
    #[error("runtime error: {0}")]
    Internal(String),
}
