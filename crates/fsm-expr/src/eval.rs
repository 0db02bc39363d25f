// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluator over the fixed `{event, context, publicMember}` environment
//! (§9). Deliberately narrow: no function calls, no loops, no host
//! language escape hatch — only field access, arithmetic, and boolean
//! and comparison operators.

use fsm_core::{BinaryOp, Expr};
use serde_json::Value;

use crate::error::{ExprError, Result};

/// The three root bindings every guard / `specificTriggeringRule`
/// expression is evaluated against.
pub struct Environment<'a> {
    event: &'a Value,
    context: &'a Value,
    public_member: &'a Value,
}

impl<'a> Environment<'a> {
    pub fn new(event: &'a Value, context: &'a Value, public_member: &'a Value) -> Self {
        Self { event, context, public_member }
    }

    fn resolve(&self, segments: &[String]) -> Option<&'a Value> {
        let (root, rest) = segments.split_first()?;
        let base = match root.as_str() {
            "event" => self.event,
            "context" => self.context,
            "publicMember" => self.public_member,
            _ => return None,
        };
        if rest.is_empty() {
            Some(base)
        } else {
            fsm_core::json_path::get(base, &rest.join("."))
        }
    }
}

/// Parse and evaluate `src` as a boolean expression. The single entry
/// point guards and `specificTriggeringRule` call through.
pub fn eval_str(src: &str, env: &Environment) -> Result<bool> {
    let tokens = crate::lexer::lex(src)?;
    let expr = crate::parser::parse(&tokens)?;
    evaluate_bool(&expr, env)
}

pub fn evaluate_bool(expr: &Expr, env: &Environment) -> Result<bool> {
    as_bool(&evaluate(expr, env)?)
}

pub fn evaluate(expr: &Expr, env: &Environment) -> Result<Value> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => Ok(serde_json::json!(*n)),
        Expr::String(s) => Ok(Value::String(s.clone())),
        Expr::Path(segments) => Ok(env.resolve(segments).cloned().unwrap_or(Value::Null)),
        Expr::Not(inner) => Ok(Value::Bool(!as_bool(&evaluate(inner, env)?)?)),
        Expr::Neg(inner) => Ok(serde_json::json!(-as_number(&evaluate(inner, env)?)?)),
        Expr::Binary { op, lhs, rhs } => evaluate_binary(*op, lhs, rhs, env),
    }
}

fn evaluate_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &Environment) -> Result<Value> {
    match op {
        BinaryOp::And => {
            if !as_bool(&evaluate(lhs, env)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(as_bool(&evaluate(rhs, env)?)?))
        }
        BinaryOp::Or => {
            if as_bool(&evaluate(lhs, env)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(as_bool(&evaluate(rhs, env)?)?))
        }
        BinaryOp::Eq => Ok(Value::Bool(values_eq(&evaluate(lhs, env)?, &evaluate(rhs, env)?))),
        BinaryOp::Ne => Ok(Value::Bool(!values_eq(&evaluate(lhs, env)?, &evaluate(rhs, env)?))),
        BinaryOp::Gt | BinaryOp::Lt | BinaryOp::Ge | BinaryOp::Le => {
            let ordering = compare(&evaluate(lhs, env)?, &evaluate(rhs, env)?)?;
            let result = match op {
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Ge => ordering.is_ge(),
                BinaryOp::Le => ordering.is_le(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let a = as_number(&evaluate(lhs, env)?)?;
            let b = as_number(&evaluate(rhs, env)?)?;
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    a / b
                }
                _ => unreachable!(),
            };
            Ok(serde_json::json!(result))
        }
    }
}

fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Result<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y).ok_or_else(|| ExprError::TypeMismatch("NaN is unordered".into()))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(ExprError::TypeMismatch(format!("cannot order {a} and {b}"))),
    }
}

fn as_bool(v: &Value) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(ExprError::TypeMismatch(format!("expected boolean, got {other}"))),
    }
}

fn as_number(v: &Value) -> Result<f64> {
    match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| ExprError::TypeMismatch(format!("not a finite number: {n}"))),
        other => Err(ExprError::TypeMismatch(format!("expected number, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_dotted_path_equality() {
        let event = json!({"OrderId": 2});
        let context = json!({});
        let public_member = json!({"Id": 2});
        let env = Environment::new(&event, &context, &public_member);
        assert!(eval_str("event.OrderId == publicMember.Id", &env).expect("eval"));
    }

    #[test]
    fn integer_and_float_literals_compare_equal() {
        let event = json!({});
        let context = json!({});
        let public_member = json!({});
        let env = Environment::new(&event, &context, &public_member);
        assert!(eval_str("2 == 2.0", &env).expect("eval"));
    }

    #[test]
    fn short_circuits_or() {
        let event = json!({});
        let context = json!({});
        let public_member = json!({});
        let env = Environment::new(&event, &context, &public_member);
        // rhs is not a boolean; if `||` didn't short-circuit this would error.
        assert!(eval_str("true || (1 / 0 == 0)", &env).expect("eval"));
    }

    #[test]
    fn division_by_zero_errors() {
        let event = json!({});
        let context = json!({});
        let public_member = json!({});
        let env = Environment::new(&event, &context, &public_member);
        let err = eval_str("false || (1 / 0 == 0)", &env).unwrap_err();
        assert_eq!(err, ExprError::DivisionByZero);
    }

    #[test]
    fn missing_path_resolves_to_null_not_error() {
        let event = json!({});
        let context = json!({});
        let public_member = json!({});
        let env = Environment::new(&event, &context, &public_member);
        assert!(eval_str("event.missing == null", &env).expect("eval"));
    }
}
