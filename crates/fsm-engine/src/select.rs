// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition selection (§4.1 steps 1-5): gather candidates in declaration
//! order, filter by matching rules, the specific triggering rule, then
//! guards. First survivor wins.

use fsm_core::{Guard, IncomingEvent, Instance, MatchOperator, MatchingRule, StateMachine, Transition};
use fsm_expr::Environment;
use serde_json::Value;

use crate::error::EngineError;

/// Why a transition was skipped, surfaced for `guard_failed` diagnostics
/// only on the sole candidate that matched up through matching rules.
#[derive(Debug)]
pub enum SkipReason {
    MatchingRule,
    SpecificTriggeringRule,
    Guard(String),
}

pub fn select_transition<'a>(
    machine: &'a StateMachine,
    state: &str,
    event: &IncomingEvent,
    instance: &Instance,
) -> Result<Option<&'a Transition>, EngineError> {
    for transition in machine.transitions_from(state) {
        if transition.event != event.event_type {
            continue;
        }
        if !matching_rules_hold(&transition.matching_rules, event, instance) {
            continue;
        }
        if let Some(rule) = &transition.specific_triggering_rule {
            if !eval_expression(rule, event, instance, "specificTriggeringRule")? {
                continue;
            }
        }
        if !guards_hold(&transition.guards, event, instance)? {
            continue;
        }
        return Ok(Some(transition));
    }
    Ok(None)
}

/// First candidate whose event matches, reporting whichever selection
/// layer (§4.1 step 5) rejected it first — matching rules, the specific
/// triggering rule, or a guard — for the `guard_failed` diagnostic (§7
/// point 3, §8 scenario 2). Does not affect selection.
pub fn first_rejected_candidate<'a>(
    machine: &'a StateMachine,
    state: &str,
    event: &IncomingEvent,
    instance: &Instance,
) -> Result<Option<(&'a Transition, SkipReason)>, EngineError> {
    for transition in machine.transitions_from(state) {
        if transition.event != event.event_type {
            continue;
        }
        if !matching_rules_hold(&transition.matching_rules, event, instance) {
            return Ok(Some((transition, SkipReason::MatchingRule)));
        }
        if let Some(rule) = &transition.specific_triggering_rule {
            if !eval_expression(rule, event, instance, "specificTriggeringRule")? {
                return Ok(Some((transition, SkipReason::SpecificTriggeringRule)));
            }
        }
        if let Some(reason) = first_failing_guard(&transition.guards, event, instance)? {
            return Ok(Some((transition, SkipReason::Guard(reason))));
        }
    }
    Ok(None)
}

pub(crate) fn matching_rules_hold(rules: &[MatchingRule], event: &IncomingEvent, instance: &Instance) -> bool {
    let props = instance.properties();
    rules.iter().all(|rule| matching_rule_holds(rule, &event.payload, &props))
}

fn matching_rule_holds(rule: &MatchingRule, payload: &Value, props: &Value) -> bool {
    let lhs = fsm_core::json_path::get(payload, &rule.event_property);
    let rhs = fsm_core::json_path::get(props, &rule.instance_property);
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => compare_operator(rule.operator, lhs, rhs),
        _ => false,
    }
}

fn compare_operator(operator: MatchOperator, lhs: &Value, rhs: &Value) -> bool {
    match operator {
        MatchOperator::Eq => values_eq(lhs, rhs),
        MatchOperator::Ne => !values_eq(lhs, rhs),
        MatchOperator::Gt => numeric_cmp(lhs, rhs).map(|o| o.is_gt()).unwrap_or(false),
        MatchOperator::Lt => numeric_cmp(lhs, rhs).map(|o| o.is_lt()).unwrap_or(false),
        MatchOperator::Ge => numeric_cmp(lhs, rhs).map(|o| o.is_ge()).unwrap_or(false),
        MatchOperator::Le => numeric_cmp(lhs, rhs).map(|o| o.is_le()).unwrap_or(false),
    }
}

fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn guards_hold(guards: &[Guard], event: &IncomingEvent, instance: &Instance) -> Result<bool, EngineError> {
    for guard in guards {
        if !guard_holds(guard, event, instance)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn first_failing_guard(
    guards: &[Guard],
    event: &IncomingEvent,
    instance: &Instance,
) -> Result<Option<String>, EngineError> {
    for guard in guards {
        if !guard_holds(guard, event, instance)? {
            return Ok(Some(guard_description(guard)));
        }
    }
    Ok(None)
}

fn guard_description(guard: &Guard) -> String {
    match guard {
        Guard::Keys { keys } => format!("missing required key(s): {}", keys.join(", ")),
        Guard::Expression { expression } => format!("expression not satisfied: {expression}"),
    }
}

fn guard_holds(guard: &Guard, event: &IncomingEvent, instance: &Instance) -> Result<bool, EngineError> {
    match guard {
        Guard::Keys { keys } => Ok(keys.iter().all(|key| {
            event.payload.get(key).map(|v| !v.is_null()).unwrap_or(false)
        })),
        Guard::Expression { expression } => eval_expression(expression, event, instance, "guard"),
    }
}

fn eval_expression(
    expression: &str,
    event: &IncomingEvent,
    instance: &Instance,
    context: &str,
) -> Result<bool, EngineError> {
    let context_value = serde_json::to_value(&instance.context).unwrap_or(Value::Null);
    let public_member = instance.public_member.as_ref().map(|pm| pm.value.clone()).unwrap_or(Value::Null);
    let env = Environment::new(&event.payload, &context_value, &public_member);
    fsm_expr::eval_str(expression, &env)
        .map_err(|source| EngineError::Expression { context: context.to_string(), source })
}
