//! Function Handling
//!
//! Handles function values and invocation:
//! - Turning declarations into callable values (tagged with their file)
//! - Calls (arity and type checks, a fresh frame, the call stack)
//! - The `init` checks performed before a program runs

use std::rc::Rc;

use crate::ast::types::*;
use crate::interpreter::errors::{ExecutionLimitError, InterpreterError, LimitType, RuntimeError};
use crate::interpreter::interpreter::Interpreter;
use crate::interpreter::scope::{SymbolInfo, SymbolKind};
use crate::interpreter::types::{FunctionValue, StackEntry, Value};

/// Name of the function run automatically after the top-level statements.
pub const INIT_FUNCTION: &str = "init";

/// State saved by `setup_function_call` and restored by
/// `cleanup_function_call`.
struct FunctionCallContext {
    saved_file: String,
}

impl<'a> Interpreter<'a> {
    /// Build a function value declared in the file currently executing.
    pub(crate) fn make_function(&self, decl: &FunctionDeclaration) -> Value {
        Value::Function(Rc::new(FunctionValue {
            declaration: decl.clone(),
            file: self.state.current_file.clone(),
        }))
    }

    /// Evaluate a call expression. `None` means the function finished
    /// without returning a value.
    pub(crate) fn evaluate_call(&mut self, call: &CallExpression) -> Result<Option<Value>, InterpreterError> {
        let line = call.span.line;
        let func = match self.evaluate(&call.callee)? {
            Value::Function(func) => func,
            other => {
                return Err(RuntimeError::new(
                    format!("`{}` is not a function, got {}", call.callee, other.type_name()),
                    line,
                )
                .into())
            }
        };

        let mut args = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            args.push(self.evaluate(arg)?);
        }
        self.call_function(&func, args, line)
    }

    pub(crate) fn call_function(
        &mut self,
        func: &Rc<FunctionValue>,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Option<Value>, InterpreterError> {
        let decl = &func.declaration;
        if args.len() != decl.parameters.len() {
            return Err(RuntimeError::new(
                format!(
                    "function `{}` expects {} argument(s), got {}",
                    func.name(),
                    decl.parameters.len(),
                    args.len()
                ),
                line,
            )
            .into());
        }

        for (param, arg) in decl.parameters.iter().zip(&args) {
            if let Some(annotation) = param.type_annotation {
                if !arg.matches_type(annotation) {
                    return Err(RuntimeError::new(
                        format!(
                            "argument `{}` of `{}` must be {}, got {}",
                            param.name.name,
                            func.name(),
                            annotation,
                            arg.type_name()
                        ),
                        line,
                    )
                    .into());
                }
            }
        }

        let call = self.setup_function_call(func, line)?;
        for (param, arg) in decl.parameters.iter().zip(args) {
            self.state.symbols.insert(
                param.name.name.clone(),
                SymbolInfo::new(SymbolKind::Variable, arg, param.name.span.line).with_type(param.type_annotation),
            );
        }
        tracing::trace!(function = func.name(), depth = self.state.call_depth, "enter function");

        let result = self.execute_statements(&decl.body);
        self.cleanup_function_call(call);
        tracing::trace!(function = func.name(), depth = self.state.call_depth, "exit function");

        match result {
            Ok(()) => Ok(None),
            Err(InterpreterError::Return(ret)) => Ok(ret.value),
            Err(e) => Err(e.into_escaped()),
        }
    }

    /// Push the call onto the stack and open the function's frame.
    fn setup_function_call(&mut self, func: &FunctionValue, line: usize) -> Result<FunctionCallContext, InterpreterError> {
        let max_call_depth = self.ctx.limits.max_call_depth;
        if self.state.call_depth >= max_call_depth {
            return Err(ExecutionLimitError::new(
                format!(
                    "{}: maximum call depth ({}) exceeded",
                    func.name(),
                    max_call_depth
                ),
                LimitType::CallDepth,
                line,
            )
            .into());
        }

        self.state.call_stack.push(StackEntry {
            function: func.name().to_string(),
            line,
            file: self.state.current_file.clone(),
        });
        self.state.call_depth += 1;
        self.state.symbols.push_frame();
        let saved_file = std::mem::replace(&mut self.state.current_file, func.file.clone());
        Ok(FunctionCallContext { saved_file })
    }

    fn cleanup_function_call(&mut self, call: FunctionCallContext) {
        self.state.current_file = call.saved_file;
        self.state.symbols.pop_frame();
        self.state.call_depth -= 1;
        self.state.call_stack.pop();
    }
}

// ============================================================================
// Pre-execution checks
// ============================================================================

/// Reject an `init` declared with parameters anywhere in `statements`,
/// including nested blocks and function literals.
pub fn validate_functions(statements: &[Statement]) -> Result<(), InterpreterError> {
    statements.iter().try_for_each(validate_statement)
}

fn validate_statement(stmt: &Statement) -> Result<(), InterpreterError> {
    match stmt {
        Statement::FunctionDeclaration(decl) => validate_declaration(decl),
        Statement::VariableDeclaration(decl) => validate_expression(&decl.init),
        Statement::AssignmentExpression(assign) => validate_expression(&assign.expression),
        Statement::If(stmt) => {
            validate_expression(&stmt.condition)?;
            validate_functions(&stmt.consequent)?;
            match &stmt.alternate {
                Some(alternate) => validate_functions(alternate),
                None => Ok(()),
            }
        }
        Statement::While(stmt) => {
            validate_expression(&stmt.condition)?;
            validate_functions(&stmt.body)
        }
        Statement::For(stmt) => {
            validate_expression(&stmt.iterable)?;
            validate_functions(&stmt.body)
        }
        Statement::Return(ret) => match &ret.argument {
            Some(arg) => validate_expression(arg),
            None => Ok(()),
        },
        Statement::Expression(expr) => validate_expression(&expr.expression),
        Statement::SourceDeclaration(_)
        | Statement::ShellExpression(_)
        | Statement::Break(_)
        | Statement::Continue(_) => Ok(()),
    }
}

fn validate_declaration(decl: &FunctionDeclaration) -> Result<(), InterpreterError> {
    let is_init = decl.name.as_ref().is_some_and(|n| n.name == INIT_FUNCTION);
    if is_init && !decl.parameters.is_empty() {
        return Err(RuntimeError::new(
            format!("function `{}` must not take parameters", INIT_FUNCTION),
            decl.span.line,
        )
        .into());
    }
    validate_functions(&decl.body)
}

fn validate_expression(expr: &Expression) -> Result<(), InterpreterError> {
    match expr {
        Expression::FunctionExpression(decl) => validate_declaration(decl),
        Expression::MemberExpression(member) => {
            validate_expression(&member.object)?;
            validate_expression(&member.property)
        }
        Expression::CallExpression(call) => {
            validate_expression(&call.callee)?;
            call.arguments.iter().try_for_each(validate_expression)
        }
        Expression::BinaryExpression(bin) => {
            validate_expression(&bin.left)?;
            validate_expression(&bin.right)
        }
        Expression::ArrayExpression(array) => array.elements.iter().try_for_each(validate_expression),
        Expression::ObjectExpression(object) => object
            .properties
            .iter()
            .try_for_each(|p| validate_expression(&p.value)),
        Expression::StringLiteral(s) => match &s.template {
            Some(parts) => parts.iter().try_for_each(|part| match part {
                TemplatePart::Expression { expression } => validate_expression(expression),
                TemplatePart::Text { .. } => Ok(()),
            }),
            None => Ok(()),
        },
        Expression::NumberLiteral(_)
        | Expression::BooleanLiteral(_)
        | Expression::Identifier(_)
        | Expression::SubShell(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::testing::{run_script, TestRun};
    use crate::interpreter::types::ExecutionLimits;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recursion() {
        let run = run_script("func fact(n) {\n  if n <= 1 { return 1 }\n  return n * fact(n - 1)\n}\nvar r = fact(10)");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("r"), Some(Value::Int(3628800)));
    }

    #[test]
    fn test_deep_recursion_below_call_depth_limit() {
        let run = run_script("func down(n) {\n  if n == 0 { return 0 }\n  return 1 + down(n - 1)\n}\nvar r = down(900)");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("r"), Some(Value::Int(900)));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = run_script("func add(a, b) { return a + b }\nvar r = add(1)").result.unwrap_err();
        assert_eq!(err.to_string(), "line 2: function `add` expects 2 argument(s), got 1");
    }

    #[test]
    fn test_parameter_types_checked() {
        let err = run_script("func f(n: int) { return n }\nvar r = f(\"x\")").result.unwrap_err();
        assert_eq!(err.to_string(), "line 2: argument `n` of `f` must be int, got string");
    }

    #[test]
    fn test_calling_non_function() {
        let err = run_script("var x = 1\nx()").result.unwrap_err();
        assert_eq!(err.to_string(), "line 2: `x` is not a function, got int");
    }

    #[test]
    fn test_call_depth_limit() {
        let limits = ExecutionLimits {
            max_call_depth: 10,
            ..ExecutionLimits::default()
        };
        let run = TestRun::new("func down(n) { return down(n + 1) }\ndown(0)").limits(limits).run();
        let err = run.result.unwrap_err();
        assert!(matches!(
            err,
            InterpreterError::ExecutionLimit(ExecutionLimitError {
                limit_type: LimitType::CallDepth,
                ..
            })
        ));
    }

    #[test]
    fn test_frames_restored_after_error() {
        let run = run_script("func bad() { var local = 1; return 1 - \"x\" }\nvar r = bad()");
        assert!(run.result.is_err());
        assert_eq!(run.global("local"), None);
    }

    #[test]
    fn test_callee_sees_caller_bindings() {
        let run = run_script("func show() { return who }\nfunc caller() { var who = \"caller\"; return show() }\nvar r = caller()");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("r"), Some(Value::Str("caller".into())));
    }

    #[test]
    fn test_break_inside_function_does_not_leak() {
        let err = run_script("func f() { break }\nwhile true { f() }").result.unwrap_err();
        assert_eq!(err.to_string(), "line 1: break outside of a loop");
    }

    #[test]
    fn test_validate_finds_nested_init() {
        let program = parse("var f = func() {\n  func init(a) {}\n}", "main.gosh").unwrap();
        let err = validate_functions(&program.body).unwrap_err();
        assert_eq!(err.to_string(), "line 2: function `init` must not take parameters");

        let program = parse("func init() {}\nfunc other(a) {}", "main.gosh").unwrap();
        assert!(validate_functions(&program.body).is_ok());
    }
}
