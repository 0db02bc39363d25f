// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cascading rule resolution (§4.1 "Cascading rules"): template
//! substitution of a rule's `payload` against the firing instance's
//! properties, ready to hand to a `broadcastEvent`-equivalent call.

use fsm_core::json_path::render_template;
use fsm_core::{CascadingRule, IncomingEvent};
use serde_json::Value;

/// Resolve every `{{path}}` template in `payload`'s string leaves against
/// `source` (the firing instance's `publicMember`/`context`). Non-string
/// leaves pass through unchanged.
pub fn resolve_payload(payload: &Value, source: &Value) -> Value {
    match payload {
        Value::String(s) => Value::String(render_template(s, source)),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_payload(v, source)).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), resolve_payload(v, source))).collect())
        }
        other => other.clone(),
    }
}

/// Build the `IncomingEvent` a cascading rule delivers to `targetMachine`/
/// `targetState`, with `payload` resolved against `source`.
pub fn cascade_event(rule: &CascadingRule, source: &Value, occurred_at_ms: u64) -> IncomingEvent {
    let payload = rule.payload.as_ref().map(|p| resolve_payload(p, source)).unwrap_or(Value::Null);
    IncomingEvent::new(rule.event.clone(), payload, occurred_at_ms)
}
