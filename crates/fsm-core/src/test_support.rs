// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fluent builders for constructing component declarations in tests.
//! Exposed behind `test-support` so downstream crates' test suites can
//! build fixtures without hand-writing the full declaration structs.

use serde_json::Value;

use crate::component::{CascadingRule, Component, State, StateKind, StateMachine};
use crate::transition::{Guard, MatchOperator, MatchingRule, Transition, TransitionKind};

pub struct ComponentBuilder {
    name: String,
    entry_machine: Option<String>,
    state_machines: Vec<StateMachine>,
}

pub fn component(name: impl Into<String>) -> ComponentBuilder {
    ComponentBuilder { name: name.into(), entry_machine: None, state_machines: Vec::new() }
}

impl ComponentBuilder {
    pub fn entry_machine(mut self, name: impl Into<String>) -> Self {
        self.entry_machine = Some(name.into());
        self
    }

    pub fn machine(mut self, machine: StateMachine) -> Self {
        self.state_machines.push(machine);
        self
    }

    pub fn build(self) -> Component {
        Component {
            name: self.name,
            entry_machine: self.entry_machine,
            state_machines: self.state_machines,
        }
    }
}

pub struct MachineBuilder {
    name: String,
    initial_state: String,
    public_member_type: Option<String>,
    states: Vec<State>,
    transitions: Vec<Transition>,
}

pub fn machine(name: impl Into<String>, initial_state: impl Into<String>) -> MachineBuilder {
    MachineBuilder {
        name: name.into(),
        initial_state: initial_state.into(),
        public_member_type: None,
        states: Vec::new(),
        transitions: Vec::new(),
    }
}

impl MachineBuilder {
    pub fn public_member_type(mut self, type_name: impl Into<String>) -> Self {
        self.public_member_type = Some(type_name.into());
        self
    }

    pub fn state(mut self, state: impl Into<State>) -> Self {
        self.states.push(state.into());
        self
    }

    pub fn transition(mut self, transition: impl Into<Transition>) -> Self {
        self.transitions.push(transition.into());
        self
    }

    pub fn build(self) -> StateMachine {
        StateMachine {
            name: self.name,
            initial_state: self.initial_state,
            public_member_type: self.public_member_type,
            states: self.states,
            transitions: self.transitions,
            context_schema: None,
        }
    }
}

pub fn state(name: impl Into<String>, kind: StateKind) -> StateBuilder {
    StateBuilder {
        name: name.into(),
        kind,
        on_entry: None,
        on_exit: None,
        cascading_rules: Vec::new(),
    }
}

pub struct StateBuilder {
    name: String,
    kind: StateKind,
    on_entry: Option<String>,
    on_exit: Option<String>,
    cascading_rules: Vec<CascadingRule>,
}

impl StateBuilder {
    pub fn on_entry(mut self, hook: impl Into<String>) -> Self {
        self.on_entry = Some(hook.into());
        self
    }

    pub fn on_exit(mut self, hook: impl Into<String>) -> Self {
        self.on_exit = Some(hook.into());
        self
    }

    pub fn cascade(mut self, rule: CascadingRule) -> Self {
        self.cascading_rules.push(rule);
        self
    }

    pub fn build(self) -> State {
        State {
            name: self.name,
            kind: self.kind,
            on_entry: self.on_entry,
            on_exit: self.on_exit,
            cascading_rules: self.cascading_rules,
        }
    }
}

impl From<StateBuilder> for State {
    fn from(b: StateBuilder) -> Self {
        b.build()
    }
}

pub struct TransitionBuilder {
    inner: Transition,
}

pub fn transition(from: impl Into<String>, to: impl Into<String>, event: impl Into<String>) -> TransitionBuilder {
    TransitionBuilder {
        inner: Transition {
            from: from.into(),
            to: to.into(),
            event: event.into(),
            kind: TransitionKind::Regular,
            guards: Vec::new(),
            matching_rules: Vec::new(),
            specific_triggering_rule: None,
            triggered_method: None,
            timeout_ms: None,
            reset_on_self_loop: false,
            target_machine: None,
            context_mapping: None,
        },
    }
}

impl TransitionBuilder {
    pub fn kind(mut self, kind: TransitionKind) -> Self {
        self.inner.kind = kind;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.inner.kind = TransitionKind::Timeout;
        self.inner.timeout_ms = Some(ms);
        self
    }

    pub fn auto(mut self) -> Self {
        self.inner.kind = TransitionKind::Auto;
        self.inner.timeout_ms = Some(0);
        self
    }

    pub fn reset_on_self_loop(mut self, reset: bool) -> Self {
        self.inner.reset_on_self_loop = reset;
        self
    }

    pub fn guard_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inner.guards.push(Guard::Keys { keys: keys.into_iter().map(Into::into).collect() });
        self
    }

    pub fn guard_expression(mut self, expression: impl Into<String>) -> Self {
        self.inner.guards.push(Guard::Expression { expression: expression.into() });
        self
    }

    pub fn matching_rule(
        mut self,
        event_property: impl Into<String>,
        instance_property: impl Into<String>,
        operator: MatchOperator,
    ) -> Self {
        self.inner.matching_rules.push(MatchingRule {
            event_property: event_property.into(),
            instance_property: instance_property.into(),
            operator,
        });
        self
    }

    pub fn specific_triggering_rule(mut self, expression: impl Into<String>) -> Self {
        self.inner.specific_triggering_rule = Some(expression.into());
        self
    }

    pub fn triggered_method(mut self, hook: impl Into<String>) -> Self {
        self.inner.triggered_method = Some(hook.into());
        self
    }

    pub fn target_machine(mut self, machine: impl Into<String>) -> Self {
        self.inner.kind = TransitionKind::InterMachine;
        self.inner.target_machine = Some(machine.into());
        self
    }

    pub fn build(self) -> Transition {
        self.inner
    }
}

impl From<TransitionBuilder> for Transition {
    fn from(b: TransitionBuilder) -> Self {
        b.build()
    }
}

pub fn cascade(target_machine: impl Into<String>, target_state: impl Into<String>, event: impl Into<String>) -> CascadingRule {
    CascadingRule {
        target_machine: target_machine.into(),
        target_state: target_state.into(),
        event: event.into(),
        matching_rules: Vec::new(),
        payload: None,
    }
}

pub fn cascade_with_payload(
    target_machine: impl Into<String>,
    target_state: impl Into<String>,
    event: impl Into<String>,
    payload: Value,
) -> CascadingRule {
    CascadingRule { payload: Some(payload), ..cascade(target_machine, target_state, event) }
}
