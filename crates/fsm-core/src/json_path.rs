// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotted-path field access over `serde_json::Value`.
//!
//! Matching rules, guard expressions, and cascading-rule templates all
//! address fields by dotted path (`order.id`) rather than requiring a
//! schema. Resolution is manual string splitting, not a new dependency.

use serde_json::Value;

/// Resolve a dotted path such as `order.id` against a JSON value.
/// An empty path returns the value itself.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |acc, segment| acc.get(segment))
}

/// Render `{{path.to.field}}` templates against a JSON value.
///
/// A path that resolves to nothing is preserved as the literal string
/// `undefined`, per the cascading-rule payload contract.
pub fn render_template(template: &str, value: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let path = after[..end].trim();
                let resolved = get(value, path)
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "undefined".to_string());
                out.push_str(&resolved);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_path() {
        let v = json!({"order": {"id": 7}});
        assert_eq!(get(&v, "order.id"), Some(&json!(7)));
    }

    #[test]
    fn missing_path_is_none() {
        let v = json!({"order": {}});
        assert_eq!(get(&v, "order.missing"), None);
    }

    #[test]
    fn template_substitutes_known_paths() {
        let v = json!({"Id": "42"});
        assert_eq!(render_template("orderId: {{Id}}", &v), "orderId: 42");
    }

    #[test]
    fn template_preserves_undefined_for_missing_paths() {
        let v = json!({});
        assert_eq!(render_template("{{missing}}", &v), "undefined");
    }
}
