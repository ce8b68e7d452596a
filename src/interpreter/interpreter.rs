//! Interpreter - AST Execution Engine
//!
//! Tree-walking execution of a parsed `Program`. The interpreter owns the
//! symbol table and call stack for one run; everything it needs from the
//! outside (file system, command runner, output sink, limits) comes in
//! through `InterpreterContext`.
//!
//! Delegates to specialized modules for:
//! - Expression evaluation (expressions.rs, binary_expression.rs)
//! - Calls and hoisting checks (functions.rs)
//! - Conditionals and loops (control_flow.rs)
//! - `source` and shell lines (builtins/)

use std::io::Write;

use crate::ast::types::*;
use crate::fs::FileSystem;
use crate::interpreter::command_substitution::CommandRunner;
use crate::interpreter::errors::{BreakSignal, ContinueSignal, InterpreterError, ReturnSignal, RuntimeError};
use crate::interpreter::functions::validate_functions;
use crate::interpreter::scope::{SymbolInfo, SymbolKind, SymbolTable};
use crate::interpreter::types::{ExecutionLimits, StackEntry, Value};

/// Interpreter context passed to execution functions.
///
/// Contains all the dependencies needed for script execution.
pub struct InterpreterContext<'a> {
    /// Execution limits
    pub limits: &'a ExecutionLimits,
    /// Loads `source`d files
    pub fs: &'a dyn FileSystem,
    /// Runs subshells and shell lines
    pub runner: &'a dyn CommandRunner,
    /// Receives the output of shell lines
    pub out: &'a mut dyn Write,
    /// Directory relative `source` paths are resolved against
    pub base_dir: String,
}

/// Mutable state of one run.
#[derive(Debug, Default)]
pub struct InterpreterState {
    pub symbols: SymbolTable,
    pub call_depth: usize,
    pub source_depth: usize,
    /// Name of the program being run; sourced files are parsed under it
    pub entry_point: String,
    /// File whose statements are currently executing
    pub current_file: String,
    pub call_stack: Vec<StackEntry>,
    /// Call stack captured where the first error was raised
    pub error_trace: Option<Vec<StackEntry>>,
    /// File the first error was raised in
    pub error_file: Option<String>,
}

pub struct Interpreter<'a> {
    pub ctx: InterpreterContext<'a>,
    pub state: InterpreterState,
}

impl<'a> Interpreter<'a> {
    pub fn new(ctx: InterpreterContext<'a>) -> Self {
        Self {
            ctx,
            state: InterpreterState::default(),
        }
    }

    /// Run a whole program: check hoisted functions, execute the top-level
    /// statements in order, then call `init` if the program defines one.
    pub fn interpret(&mut self, program: &Program) -> Result<(), InterpreterError> {
        self.state.entry_point = program.entry_point.clone();
        self.state.current_file = program.entry_point.clone();
        validate_functions(&program.body)?;

        match self.execute_statements(&program.body) {
            Ok(()) => {}
            // A top-level `return` ends the script.
            Err(InterpreterError::Return(_)) => return Ok(()),
            Err(e) => return Err(e.into_escaped()),
        }

        let init = match self.state.symbols.lookup("init") {
            Some(SymbolInfo {
                kind: SymbolKind::Function,
                value: Value::Function(func),
                line,
                ..
            }) => Some((func.clone(), *line)),
            _ => None,
        };
        if let Some((func, line)) = init {
            tracing::debug!("calling init");
            self.call_function(&func, Vec::new(), line)?;
        }
        Ok(())
    }

    /// Execute a statement list in the current frame. Named functions in
    /// the list are bound before the first statement runs.
    pub(crate) fn execute_statements(&mut self, statements: &[Statement]) -> Result<(), InterpreterError> {
        self.hoist_functions(statements);
        for stmt in statements {
            self.execute_statement(stmt)?;
        }
        Ok(())
    }

    /// Execute a block in its own frame.
    pub(crate) fn execute_block(&mut self, statements: &[Statement]) -> Result<(), InterpreterError> {
        self.state.symbols.push_frame();
        let result = self.execute_statements(statements);
        self.state.symbols.pop_frame();
        result
    }

    fn hoist_functions(&mut self, statements: &[Statement]) {
        for stmt in statements {
            if let Statement::FunctionDeclaration(decl) = stmt {
                if let Some(name) = &decl.name {
                    let value = self.make_function(decl);
                    self.state
                        .symbols
                        .insert(name.name.clone(), SymbolInfo::new(SymbolKind::Function, value, decl.span.line));
                }
            }
        }
    }

    pub(crate) fn execute_statement(&mut self, stmt: &Statement) -> Result<(), InterpreterError> {
        tracing::trace!(kind = stmt.kind_name(), line = stmt.line(), "execute statement");
        let result = self.dispatch_statement(stmt);
        if let Err(ref e) = result {
            self.record_error_site(e);
        }
        result
    }

    /// Remember where the first real error happened. Signals are not errors.
    pub(crate) fn record_error_site(&mut self, error: &InterpreterError) {
        if error.is_scope_exit() || self.state.error_file.is_some() {
            return;
        }
        self.state.error_file = Some(self.state.current_file.clone());
        self.state.error_trace = Some(self.state.call_stack.clone());
    }

    fn dispatch_statement(&mut self, stmt: &Statement) -> Result<(), InterpreterError> {
        match stmt {
            Statement::VariableDeclaration(decl) => self.execute_declaration(decl),
            Statement::AssignmentExpression(assign) => {
                let value = self.evaluate(&assign.expression)?;
                self.state
                    .symbols
                    .assign(&assign.identifier.name, value, assign.span.line)
            }
            // Bound by `hoist_functions`
            Statement::FunctionDeclaration(_) => Ok(()),
            Statement::SourceDeclaration(decl) => self.execute_source(decl),
            Statement::ShellExpression(shell) => self.execute_shell(shell),
            Statement::If(stmt) => self.execute_if(stmt),
            Statement::While(stmt) => self.execute_while(stmt),
            Statement::For(stmt) => self.execute_for(stmt),
            Statement::Return(ret) => {
                let value = match &ret.argument {
                    Some(arg) => Some(self.evaluate(arg)?),
                    None => None,
                };
                Err(ReturnSignal {
                    value,
                    line: ret.span.line,
                }
                .into())
            }
            Statement::Break(b) => Err(BreakSignal { line: b.span.line }.into()),
            Statement::Continue(c) => Err(ContinueSignal { line: c.span.line }.into()),
            Statement::Expression(expr) => self.execute_expression_statement(&expr.expression),
        }
    }

    fn execute_declaration(&mut self, decl: &VariableDeclaration) -> Result<(), InterpreterError> {
        let value = self.evaluate(&decl.init)?;
        let line = decl.span.line;
        if let Some(annotation) = decl.type_annotation {
            if !value.matches_type(annotation) {
                return Err(RuntimeError::new(
                    format!(
                        "cannot assign {} to `{}` declared as {}",
                        value.type_name(),
                        decl.name.name,
                        annotation
                    ),
                    line,
                )
                .into());
            }
        }

        let kind = match decl.kind {
            DeclarationKind::Var => SymbolKind::Variable,
            DeclarationKind::Const => SymbolKind::Constant,
        };
        self.state.symbols.insert(
            decl.name.name.clone(),
            SymbolInfo::new(kind, value, line).with_type(decl.type_annotation),
        );
        Ok(())
    }

    /// Bare expressions: calls may return nothing, a subshell's output is
    /// printed, anything else is evaluated for its side effects.
    fn execute_expression_statement(&mut self, expr: &Expression) -> Result<(), InterpreterError> {
        match expr {
            Expression::CallExpression(call) => {
                self.evaluate_call(call)?;
            }
            Expression::SubShell(sub) => {
                let stdout = self.run_command(&sub.command, sub.span.line)?;
                self.write_output(&stdout, sub.span.line)?;
            }
            other => {
                self.evaluate(other)?;
            }
        }
        Ok(())
    }

    pub(crate) fn write_output(&mut self, text: &str, line: usize) -> Result<(), InterpreterError> {
        self.ctx
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.ctx.out.flush())
            .map_err(|e| RuntimeError::new(format!("failed to write output: {}", e), line).into())
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::errors::InterpreterError;
    use crate::interpreter::testing::{run_script, RecordingRunner, TestRun};
    use crate::interpreter::types::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_statements_run_in_order() {
        let run = run_script("var a = 1\nvar b = a + 1\na = b * 10");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("a"), Some(Value::Int(20)));
        assert_eq!(run.global("b"), Some(Value::Int(2)));
    }

    #[test]
    fn test_shadowing_in_function() {
        let run = run_script("var x = 1\nfunc f() { var x = 2; return x }\nvar y = f()");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("y"), Some(Value::Int(2)));
        assert_eq!(run.global("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_functions_are_hoisted() {
        let run = run_script("var y = twice(4)\nfunc twice(n) { return n * 2 }");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("y"), Some(Value::Int(8)));
    }

    #[test]
    fn test_init_with_parameters_rejected_before_execution() {
        let runner = RecordingRunner::new();
        let run = TestRun::new("echo first\nfunc init(a) {}").runner(runner).run();
        let err = run.result.unwrap_err();
        assert!(matches!(err, InterpreterError::Runtime(_)));
        assert_eq!(err.line(), 2);
        assert!(run.commands.is_empty());
        assert_eq!(run.output, "");
    }

    #[test]
    fn test_nested_init_with_parameters_rejected() {
        let run = run_script("var a = 1\nif true {\n  func init(x) {}\n}");
        assert!(matches!(run.result, Err(InterpreterError::Runtime(_))));
        assert_eq!(run.global("a"), None);
    }

    #[test]
    fn test_init_runs_after_top_level() {
        let run = run_script("func init() { echo init $x }\nvar x = 5\necho top");
        run.result.as_ref().unwrap();
        assert_eq!(run.output, "top\ninit 5\n");
    }

    #[test]
    fn test_top_level_return_ends_script() {
        let run = run_script("echo one\nreturn\necho two\nfunc init() { echo init }");
        run.result.as_ref().unwrap();
        assert_eq!(run.output, "one\n");
    }

    #[test]
    fn test_break_outside_loop() {
        let run = run_script("break");
        let err = run.result.unwrap_err();
        assert_eq!(err.to_string(), "line 1: break outside of a loop");
    }

    #[test]
    fn test_declared_type_checked() {
        let run = run_script("var n: int = \"x\"");
        let err = run.result.unwrap_err();
        assert_eq!(err.to_string(), "line 1: cannot assign string to `n` declared as int");

        let run = run_script("var f: float64 = 3\nf = 2.5");
        run.result.as_ref().unwrap();
        assert_eq!(run.global("f"), Some(Value::Float(2.5)));
    }

    #[test]
    fn test_constants_cannot_be_reassigned() {
        let run = run_script("const c = 1\nc = 2");
        assert_eq!(run.result.unwrap_err().to_string(), "line 2: cannot assign to constant `c`");
    }

    #[test]
    fn test_unresolved_identifier() {
        let run = run_script("var a = 1\nvar b = missing + a");
        let err = run.result.unwrap_err();
        assert!(matches!(err, InterpreterError::UnresolvedIdentifier(_)));
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_subshell_statement_prints_output() {
        let runner = RecordingRunner::new().respond("date", "Mon\n");
        let run = TestRun::new("$(date)").runner(runner).run();
        run.result.as_ref().unwrap();
        assert_eq!(run.output, "Mon\n");
    }

    #[test]
    fn test_error_site_records_call_stack() {
        let run = run_script("func inner() { return 1 - \"a\" }\nfunc outer() { return inner() }\nvar v = outer()");
        assert!(run.result.is_err());
        let trace = run.error_trace.unwrap();
        let names: Vec<&str> = trace.iter().map(|e| e.function.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
        assert_eq!(trace[0].line, 3);
        assert_eq!(trace[1].line, 2);
    }
}
