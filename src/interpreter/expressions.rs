//! Expression Evaluation
//!
//! Turns expression nodes into values. Binary operator semantics live in
//! `binary_expression`; calls in `functions`.

use indexmap::IndexMap;

use crate::ast::types::*;
use crate::interpreter::binary_expression::evaluate_binary;
use crate::interpreter::command_substitution::strip_trailing_newline;
use crate::interpreter::errors::{IllegalOperationError, InterpreterError, RuntimeError};
use crate::interpreter::interpreter::Interpreter;
use crate::interpreter::stack::ensure_sufficient_stack;
use crate::interpreter::types::Value;

impl<'a> Interpreter<'a> {
    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value, InterpreterError> {
        ensure_sufficient_stack(|| self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Expression) -> Result<Value, InterpreterError> {
        match expr {
            Expression::NumberLiteral(n) => Ok(Value::from(n.value)),
            Expression::StringLiteral(s) => match &s.template {
                Some(parts) => self.evaluate_template(parts),
                None => Ok(Value::Str(s.value.clone())),
            },
            Expression::BooleanLiteral(b) => Ok(Value::Bool(b.value)),
            Expression::Identifier(id) => {
                let info = self.state.symbols.resolve(&id.name, id.span.line)?;
                Ok(info.value.clone())
            }
            Expression::MemberExpression(member) => {
                let object = self.evaluate(&member.object)?;
                let key = if member.computed {
                    self.evaluate(&member.property)?
                } else {
                    match member.property.as_ref() {
                        Expression::Identifier(id) => Value::Str(id.name.clone()),
                        other => self.evaluate(other)?,
                    }
                };
                member_access(object, &key, member.span.line)
            }
            Expression::CallExpression(call) => match self.evaluate_call(call)? {
                Some(value) => Ok(value),
                None => Err(RuntimeError::new(
                    format!("`{}` did not return a value", call.callee),
                    call.span.line,
                )
                .into()),
            },
            Expression::SubShell(sub) => {
                let stdout = self.run_command(&sub.command, sub.span.line)?;
                Ok(Value::Str(strip_trailing_newline(stdout)))
            }
            Expression::BinaryExpression(bin) => self.evaluate_binary_expression(bin),
            Expression::ArrayExpression(array) => {
                let mut items = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::Array(items))
            }
            Expression::ObjectExpression(object) => {
                let mut map = IndexMap::with_capacity(object.properties.len());
                for property in &object.properties {
                    let value = self.evaluate(&property.value)?;
                    map.insert(property.key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            Expression::FunctionExpression(func) => Ok(self.make_function(func)),
        }
    }

    fn evaluate_template(&mut self, parts: &[TemplatePart]) -> Result<Value, InterpreterError> {
        let mut text = String::new();
        for part in parts {
            match part {
                TemplatePart::Text { value } => text.push_str(value),
                TemplatePart::Expression { expression } => text.push_str(&self.evaluate(expression)?.to_text()),
            }
        }
        Ok(Value::Str(text))
    }

    fn evaluate_binary_expression(&mut self, bin: &BinaryExpression) -> Result<Value, InterpreterError> {
        let line = bin.span.line;
        match bin.operator {
            BinaryOperator::And | BinaryOperator::Or => {
                let left = self.expect_bool(bin.operator, &bin.left, line)?;
                let decided = match bin.operator {
                    BinaryOperator::And => !left,
                    _ => left,
                };
                if decided {
                    return Ok(Value::Bool(left));
                }
                Ok(Value::Bool(self.expect_bool(bin.operator, &bin.right, line)?))
            }
            op => {
                let left = self.evaluate(&bin.left)?;
                let right = self.evaluate(&bin.right)?;
                evaluate_binary(op, left, right, line)
            }
        }
    }

    fn expect_bool(&mut self, op: BinaryOperator, operand: &Expression, line: usize) -> Result<bool, InterpreterError> {
        match self.evaluate(operand)? {
            Value::Bool(b) => Ok(b),
            other => Err(IllegalOperationError::new(
                op.as_str(),
                format!("expected bool operands, got {}", other.type_name()),
                line,
            )
            .into()),
        }
    }
}

/// `object.key`, `object["key"]`, `array[i]`, `string[i]` and `.length`.
pub fn member_access(object: Value, key: &Value, line: usize) -> Result<Value, InterpreterError> {
    match (object, key) {
        (Value::Object(mut map), Value::Str(name)) => match map.swap_remove(name.as_str()) {
            Some(value) => Ok(value),
            None if name == "length" => Ok(Value::Int(map.len() as i64)),
            None => Err(RuntimeError::new(format!("property `{}` does not exist", name), line).into()),
        },
        (Value::Array(items), Value::Int(index)) => {
            let len = items.len();
            usize::try_from(*index)
                .ok()
                .and_then(|i| items.into_iter().nth(i))
                .ok_or_else(|| RuntimeError::new(format!("index {} out of range for array of length {}", index, len), line).into())
        }
        (Value::Array(items), Value::Str(name)) if name == "length" => Ok(Value::Int(items.len() as i64)),
        (Value::Str(s), Value::Int(index)) => {
            let len = s.chars().count();
            usize::try_from(*index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| RuntimeError::new(format!("index {} out of range for string of length {}", index, len), line).into())
        }
        (Value::Str(s), Value::Str(name)) if name == "length" => Ok(Value::Int(s.chars().count() as i64)),
        (object, key) => Err(RuntimeError::new(
            format!("cannot access `{}` on {}", key, object.type_name()),
            line,
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::testing::{run_script, RecordingRunner, TestRun};
    use pretty_assertions::assert_eq;

    fn value_of(source: &str) -> Value {
        let run = run_script(&format!("var result = {}", source));
        if let Err(e) = &run.result {
            panic!("evaluation of {:?} failed: {}", source, e);
        }
        run.global("result").unwrap()
    }

    fn error_of(source: &str) -> InterpreterError {
        run_script(source).result.unwrap_err()
    }

    #[test]
    fn test_literals() {
        assert_eq!(value_of("42"), Value::Int(42));
        assert_eq!(value_of("-1.5"), Value::Float(-1.5));
        assert_eq!(value_of("\"hi\""), Value::Str("hi".into()));
        assert_eq!(value_of("true"), Value::Bool(true));
    }

    #[test]
    fn test_precedence_evaluates() {
        assert_eq!(value_of("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(value_of("1 + 2 * 3"), Value::Int(7));
    }

    #[test]
    fn test_arithmetic_rules_end_to_end() {
        assert_eq!(value_of("5 / 0"), Value::Int(0));
        assert_eq!(value_of("7 / 2"), Value::Int(3));
        assert_eq!(value_of("1.5 * 2"), Value::Float(3.0));
        assert_eq!(value_of("\"3\" + 4"), Value::Str("34".into()));
        assert_eq!(
            error_of("var r = \"3\" - 4").to_string(),
            "line 1: invalid operation `-`: cannot apply to string"
        );
    }

    #[test]
    fn test_array_and_object() {
        let v = value_of("{name: \"gosh\", tags: [1, 2]}");
        let Value::Object(map) = v else { panic!("expected object") };
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, vec!["name", "tags"]);
        assert_eq!(map["tags"], Value::Array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_member_access() {
        let run = run_script("var o = {a: {b: [10, 20]}}\nvar x = o.a.b[1]\nvar y = o[\"a\"].b.length\nvar h = \"héllo\"\nvar s = h[1]");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("x"), Some(Value::Int(20)));
        assert_eq!(run.global("y"), Some(Value::Int(2)));
        assert_eq!(run.global("s"), Some(Value::Str("é".into())));
    }

    #[test]
    fn test_member_access_errors() {
        assert_eq!(
            error_of("var a = [1]\nvar b = a[1]").to_string(),
            "line 2: index 1 out of range for array of length 1"
        );
        assert_eq!(
            error_of("var a = [1]\nvar b = a[-1]").to_string(),
            "line 2: index -1 out of range for array of length 1"
        );
        assert_eq!(error_of("var o = {}\nvar b = o.nope").to_string(), "line 2: property `nope` does not exist");
        assert_eq!(error_of("var n = 1\nvar b = n.x").to_string(), "line 2: cannot access `x` on int");
    }

    #[test]
    fn test_template_interpolation() {
        let run = run_script("var name = \"world\"\nvar n = 2\nvar s = `hello $name, ${n * 3}!`");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("s"), Some(Value::Str("hello world, 6!".into())));
    }

    #[test]
    fn test_subshell_strips_one_newline() {
        let runner = RecordingRunner::new().respond("whoami", "root\n").respond("printf", "a\n\n");
        let run = TestRun::new("var u = $(whoami)\nvar p = $(printf)").runner(runner).run();
        run.result.as_ref().unwrap();
        assert_eq!(run.global("u"), Some(Value::Str("root".into())));
        assert_eq!(run.global("p"), Some(Value::Str("a\n".into())));
    }

    #[test]
    fn test_subshell_interpolates_bindings() {
        let run = run_script("var dir = \"/tmp\"\nvar out = $(ls $dir ${dir}/x $HOME)");
        run.result.as_ref().unwrap();
        assert_eq!(run.commands, vec!["ls /tmp /tmp/x $HOME".to_string()]);
    }

    #[test]
    fn test_logical_short_circuit() {
        // `missing` is never evaluated
        assert_eq!(value_of("false && missing"), Value::Bool(false));
        assert_eq!(value_of("true || missing"), Value::Bool(true));
        assert_eq!(value_of("true && 1 < 2"), Value::Bool(true));
        assert!(matches!(error_of("var x = 1 && true"), InterpreterError::IllegalOperation(_)));
    }

    #[test]
    fn test_call_without_return_value() {
        let err = error_of("func f() { var a = 1 }\nvar x = f()");
        assert_eq!(err.to_string(), "line 2: `f` did not return a value");
        // As a statement the missing value is fine
        run_script("func f() { var a = 1 }\nf()").result.unwrap();
    }

    #[test]
    fn test_function_literal_is_callable() {
        let run = run_script("var sq = func(n) { return n * n }\nvar r = sq(7)");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("r"), Some(Value::Int(49)));
    }
}
