//! Binary Operators
//!
//! Semantics of the arithmetic, equality and ordering operators. `&&` and
//! `||` short-circuit and are handled by the evaluator before reaching here.
//!
//! Arithmetic rules:
//! - bool operands are rejected
//! - an array, object or function operand is passed through unchanged
//! - a string operand makes `+` concatenate and every other operator fail
//! - numbers are computed as f64; int with int is truncated back to int,
//!   anything with a float stays a float
//! - division by zero yields 0

use std::cmp::Ordering;

use crate::ast::types::BinaryOperator;
use crate::interpreter::errors::{IllegalOperationError, InterpreterError};
use crate::interpreter::types::Value;

/// Pick the operand an arithmetic operator returns untouched: the left one
/// if it is not a scalar, else the right one if that is not a scalar.
pub fn pass_through_operand(left: &Value, right: &Value) -> Option<Value> {
    if !left.is_scalar() {
        return Some(left.clone());
    }
    if !right.is_scalar() {
        return Some(right.clone());
    }
    None
}

pub fn evaluate_binary(op: BinaryOperator, left: Value, right: Value, line: usize) -> Result<Value, InterpreterError> {
    match op {
        BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div => {
            arithmetic(op, left, right, line)
        }
        BinaryOperator::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOperator::NotEq => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOperator::Lt | BinaryOperator::Gt | BinaryOperator::LtEq | BinaryOperator::GtEq => {
            let ordering = compare(op, &left, &right, line)?;
            let result = match op {
                BinaryOperator::Lt => ordering == Ordering::Less,
                BinaryOperator::Gt => ordering == Ordering::Greater,
                BinaryOperator::LtEq => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOperator::And | BinaryOperator::Or => match (left, right) {
            (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(if op == BinaryOperator::And { l && r } else { l || r })),
            (l, r) => Err(illegal(op, format!("expected bool operands, got {} and {}", l.type_name(), r.type_name()), line)),
        },
    }
}

fn arithmetic(op: BinaryOperator, left: Value, right: Value, line: usize) -> Result<Value, InterpreterError> {
    if matches!(left, Value::Bool(_)) || matches!(right, Value::Bool(_)) {
        return Err(illegal(op, "cannot apply to bool", line));
    }
    if let Some(value) = pass_through_operand(&left, &right) {
        return Ok(value);
    }

    if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        if op != BinaryOperator::Add {
            return Err(illegal(op, "cannot apply to string", line));
        }
        let mut text = left.to_text();
        text.push_str(&right.to_text());
        return Ok(Value::Str(text));
    }

    let floating = matches!(left, Value::Float(_)) || matches!(right, Value::Float(_));
    let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
        return Err(illegal(op, format!("cannot apply to {} and {}", left.type_name(), right.type_name()), line));
    };
    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Sub => l - r,
        BinaryOperator::Mul => l * r,
        _ if r == 0.0 => return Ok(Value::Int(0)),
        _ => l / r,
    };
    if floating {
        Ok(Value::Float(result))
    } else {
        // Saturates outside the i64 range.
        Ok(Value::Int(result.trunc() as i64))
    }
}

/// Numbers compare by value across int and float; everything else
/// structurally.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn compare(op: BinaryOperator, left: &Value, right: &Value, line: usize) -> Result<Ordering, InterpreterError> {
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l
            .partial_cmp(&r)
            .ok_or_else(|| illegal(op, "cannot compare NaN", line));
    }
    match (left, right) {
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        _ => Err(illegal(
            op,
            format!("cannot compare {} with {}", left.type_name(), right.type_name()),
            line,
        )),
    }
}

fn illegal(op: BinaryOperator, message: impl Into<String>, line: usize) -> InterpreterError {
    IllegalOperationError::new(op.as_str(), message, line).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn eval(op: &str, left: Value, right: Value) -> Result<Value, InterpreterError> {
        let op = BinaryOperator::from_symbol(op).unwrap();
        evaluate_binary(op, left, right, 1)
    }

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(eval("+", Value::Int(2), Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(eval("-", Value::Int(2), Value::Int(3)).unwrap(), Value::Int(-1));
        assert_eq!(eval("*", Value::Int(4), Value::Int(3)).unwrap(), Value::Int(12));
        assert_eq!(eval("/", Value::Int(7), Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!(eval("/", Value::Int(-7), Value::Int(2)).unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(eval("/", Value::Float(7.0), Value::Int(2)).unwrap(), Value::Float(3.5));
        assert_eq!(eval("+", Value::Int(1), Value::Float(0.5)).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        assert_eq!(eval("/", Value::Int(5), Value::Int(0)).unwrap(), Value::Int(0));
        assert_eq!(eval("/", Value::Float(5.0), Value::Float(0.0)).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval("+", s("3"), Value::Int(4)).unwrap(), s("34"));
        assert_eq!(eval("+", Value::Float(1.5), s("x")).unwrap(), s("1.5x"));
        assert_eq!(eval("+", s("a"), s("b")).unwrap(), s("ab"));
    }

    #[test]
    fn test_string_rejects_other_arithmetic() {
        let err = eval("-", s("3"), Value::Int(4)).unwrap_err();
        assert!(matches!(err, InterpreterError::IllegalOperation(_)));
        assert_eq!(err.to_string(), "line 1: invalid operation `-`: cannot apply to string");
    }

    #[test]
    fn test_bool_rejected_in_arithmetic() {
        let err = eval("+", Value::Bool(true), Value::Int(1)).unwrap_err();
        assert!(matches!(err, InterpreterError::IllegalOperation(_)));
    }

    #[test]
    fn test_pass_through_non_scalar() {
        let array = Value::Array(vec![Value::Int(1)]);
        assert_eq!(eval("+", array.clone(), Value::Int(2)).unwrap(), array);
        assert_eq!(eval("*", Value::Int(2), array.clone()).unwrap(), array);
        assert_eq!(eval("-", s("x"), array.clone()).unwrap(), array);
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval("==", Value::Int(1), Value::Float(1.0)).unwrap(), Value::Bool(true));
        assert_eq!(eval("==", s("1"), Value::Int(1)).unwrap(), Value::Bool(false));
        assert_eq!(eval("!=", s("a"), s("b")).unwrap(), Value::Bool(true));
        let a = Value::Array(vec![Value::Int(1), s("x")]);
        assert_eq!(eval("==", a.clone(), a).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(eval("<", Value::Int(1), Value::Float(1.5)).unwrap(), Value::Bool(true));
        assert_eq!(eval(">=", Value::Int(2), Value::Int(2)).unwrap(), Value::Bool(true));
        assert_eq!(eval("<", s("abc"), s("abd")).unwrap(), Value::Bool(true));
        let err = eval("<", s("a"), Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "line 1: invalid operation `<`: cannot compare string with int");
    }

    proptest! {
        #[test]
        fn prop_int_arithmetic_truncates(a in -1_000_000i64..1_000_000, b in 1i64..1000) {
            prop_assert_eq!(eval("+", Value::Int(a), Value::Int(b)).unwrap(), Value::Int(a + b));
            prop_assert_eq!(eval("/", Value::Int(a), Value::Int(b)).unwrap(), Value::Int(a / b));
        }

        #[test]
        fn prop_ordering_is_antisymmetric(a in -1000i64..1000, b in -1000i64..1000) {
            let lt = eval("<", Value::Int(a), Value::Int(b)).unwrap();
            let gt = eval(">", Value::Int(b), Value::Int(a)).unwrap();
            prop_assert_eq!(lt, gt);
        }
    }
}
