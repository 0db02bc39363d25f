// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declaration-time validation (§7 "Declaration errors"). Runs once, at
//! runtime construction; anything caught here never reaches the dispatcher.
//!
//! Cross-component concerns (an unknown `targetMachine` belonging to a
//! *different* component) are out of scope here — that check runs in
//! `fsm-engine` once the full registry of components is known.

use std::collections::HashSet;

use crate::component::{Component, StateMachine};
use crate::error::DeclarationError;

pub fn validate_component(component: &Component) -> Result<(), Vec<DeclarationError>> {
    let mut errors = Vec::new();
    let mut seen_machines = HashSet::new();

    for machine in &component.state_machines {
        if !seen_machines.insert(machine.name.as_str()) {
            errors.push(DeclarationError::DuplicateMachine {
                component: component.name.clone(),
                machine: machine.name.clone(),
            });
        }
        validate_machine(machine, &mut errors);
    }

    if let Some(entry) = &component.entry_machine {
        if !component.has_machine(entry) {
            errors.push(DeclarationError::UnknownEntryMachine {
                component: component.name.clone(),
                entry: entry.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_machine(machine: &StateMachine, errors: &mut Vec<DeclarationError>) {
    if machine.states.is_empty() {
        errors.push(DeclarationError::NoStates { machine: machine.name.clone() });
        return;
    }

    let mut seen_states = HashSet::new();
    for state in &machine.states {
        if !seen_states.insert(state.name.as_str()) {
            errors.push(DeclarationError::DuplicateState {
                machine: machine.name.clone(),
                state: state.name.clone(),
            });
        }
    }

    if machine.state(&machine.initial_state).is_none() {
        errors.push(DeclarationError::UnknownInitialState {
            machine: machine.name.clone(),
            state: machine.initial_state.clone(),
        });
    }

    for transition in &machine.transitions {
        if machine.state(&transition.from).is_none() {
            errors.push(DeclarationError::DanglingTransition {
                machine: machine.name.clone(),
                state: transition.from.clone(),
                role: "from",
            });
        }
        if machine.state(&transition.to).is_none() {
            errors.push(DeclarationError::DanglingTransition {
                machine: machine.name.clone(),
                state: transition.to.clone(),
                role: "to",
            });
        }
    }
}
