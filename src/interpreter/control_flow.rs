//! Control Flow Execution
//!
//! Handles control flow constructs:
//! - if/else if/else
//! - while loops
//! - for-in loops over arrays, object keys and string characters
//! - break/continue (caught here, raised by the statement executor)

use crate::ast::types::*;
use crate::interpreter::errors::{ExecutionLimitError, InterpreterError, LimitType, RuntimeError};
use crate::interpreter::interpreter::Interpreter;
use crate::interpreter::scope::{SymbolInfo, SymbolKind};
use crate::interpreter::types::Value;

/// What a loop does after one pass of its body.
enum LoopAction {
    Next,
    Exit,
}

/// Map the body's result onto the loop: `continue` moves on, `break`
/// exits, anything else propagates.
fn loop_action(result: Result<(), InterpreterError>) -> Result<LoopAction, InterpreterError> {
    match result {
        Ok(()) | Err(InterpreterError::Continue(_)) => Ok(LoopAction::Next),
        Err(InterpreterError::Break(_)) => Ok(LoopAction::Exit),
        Err(e) => Err(e),
    }
}

impl<'a> Interpreter<'a> {
    pub(crate) fn execute_if(&mut self, stmt: &IfStatement) -> Result<(), InterpreterError> {
        if self.evaluate_condition(&stmt.condition)? {
            self.execute_block(&stmt.consequent)
        } else if let Some(alternate) = &stmt.alternate {
            self.execute_block(alternate)
        } else {
            Ok(())
        }
    }

    pub(crate) fn execute_while(&mut self, stmt: &WhileStatement) -> Result<(), InterpreterError> {
        let max_iterations = self.ctx.limits.max_loop_iterations;
        let mut iterations: u64 = 0;

        while self.evaluate_condition(&stmt.condition)? {
            iterations += 1;
            if iterations > max_iterations {
                return Err(ExecutionLimitError::new(
                    format!("while: too many iterations ({}), increase max_loop_iterations", max_iterations),
                    LimitType::LoopIterations,
                    stmt.span.line,
                )
                .into());
            }

            match loop_action(self.execute_block(&stmt.body))? {
                LoopAction::Next => {}
                LoopAction::Exit => break,
            }
        }
        Ok(())
    }

    pub(crate) fn execute_for(&mut self, stmt: &ForStatement) -> Result<(), InterpreterError> {
        let line = stmt.span.line;
        let items: Vec<Value> = match self.evaluate(&stmt.iterable)? {
            Value::Array(items) => items,
            Value::Object(map) => map.into_keys().map(Value::Str).collect(),
            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            other => {
                return Err(RuntimeError::new(format!("cannot iterate over {}", other.type_name()), line).into());
            }
        };

        for item in items {
            self.state.symbols.push_frame();
            self.state.symbols.insert(
                stmt.binding.name.clone(),
                SymbolInfo::new(SymbolKind::Variable, item, line),
            );
            let result = self.execute_statements(&stmt.body);
            self.state.symbols.pop_frame();

            match loop_action(result)? {
                LoopAction::Next => {}
                LoopAction::Exit => break,
            }
        }
        Ok(())
    }

    fn evaluate_condition(&mut self, condition: &Expression) -> Result<bool, InterpreterError> {
        match self.evaluate(condition)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::new(
                format!("condition must be a bool, got {}", other.type_name()),
                condition.line(),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::errors::{ExecutionLimitError, InterpreterError, LimitType};
    use crate::interpreter::testing::{run_script, TestRun};
    use crate::interpreter::types::{ExecutionLimits, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_if_else_chain() {
        let src = "var n = 15\nvar r = \"\"\nif n < 10 {\n  r = \"small\"\n} else if n < 20 {\n  r = \"medium\"\n} else {\n  r = \"large\"\n}";
        let run = run_script(src);
        run.result.as_ref().unwrap();
        assert_eq!(run.global("r"), Some(Value::Str("medium".into())));
    }

    #[test]
    fn test_if_requires_bool() {
        let err = run_script("if 1 { var a = 1 }").result.unwrap_err();
        assert_eq!(err.to_string(), "line 1: condition must be a bool, got int");
    }

    #[test]
    fn test_block_bindings_are_scoped() {
        let run = run_script("if true { var inner = 1 }");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("inner"), None);
    }

    #[test]
    fn test_while_with_break_and_continue() {
        let src = "var i = 0\nvar sum = 0\nwhile true {\n  i = i + 1\n  if i > 10 { break }\n  if i == 3 { continue }\n  sum = sum + i\n}";
        let run = run_script(src);
        run.result.as_ref().unwrap();
        assert_eq!(run.global("sum"), Some(Value::Int(52)));
    }

    #[test]
    fn test_while_iteration_limit() {
        let limits = ExecutionLimits {
            max_loop_iterations: 5,
            ..ExecutionLimits::default()
        };
        let err = TestRun::new("var i = 0\nwhile true { i = i + 1 }").limits(limits).run().result.unwrap_err();
        assert!(matches!(
            err,
            InterpreterError::ExecutionLimit(ExecutionLimitError {
                limit_type: LimitType::LoopIterations,
                line: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_for_over_array_object_and_string() {
        let src = "var total = 0\nfor n in [1, 2, 3] { total = total + n }\nvar keys = \"\"\nfor k in {a: 1, b: 2} { keys = keys + k }\nvar chars = 0\nfor c in \"héllo\" { chars = chars + 1 }";
        let run = run_script(src);
        run.result.as_ref().unwrap();
        assert_eq!(run.global("total"), Some(Value::Int(6)));
        assert_eq!(run.global("keys"), Some(Value::Str("ab".into())));
        assert_eq!(run.global("chars"), Some(Value::Int(5)));
    }

    #[test]
    fn test_for_binding_does_not_leak() {
        let run = run_script("for x in [1] { var y = x }");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("x"), None);
        assert_eq!(run.global("y"), None);
    }

    #[test]
    fn test_for_rejects_scalars() {
        let err = run_script("for x in 5 { }").result.unwrap_err();
        assert_eq!(err.to_string(), "line 1: cannot iterate over int");
    }

    #[test]
    fn test_return_from_inside_loop() {
        let run = run_script("func first(xs) {\n  for x in xs { if x > 1 { return x } }\n  return 0\n}\nvar r = first([1, 5, 9])");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("r"), Some(Value::Int(5)));
    }
}
