//! source - Execute statements from other files in the current environment
//!
//! Each path is resolved against the entry point's directory, parsed, and
//! run in the frame that contains the `source` statement, so its top-level
//! bindings and functions become visible to the includer. A `return` at the
//! top level of a sourced file stops that file only.

use crate::ast::types::{Program, SourceDeclaration};
use crate::interpreter::errors::{ExecutionLimitError, InterpreterError, LimitType, RuntimeError};
use crate::interpreter::functions::validate_functions;
use crate::interpreter::interpreter::Interpreter;
use crate::parser::parse;

impl<'a> Interpreter<'a> {
    pub(crate) fn execute_source(&mut self, decl: &SourceDeclaration) -> Result<(), InterpreterError> {
        for path in &decl.sources {
            self.source_file(path, decl.span.line)?;
        }
        Ok(())
    }

    fn source_file(&mut self, path: &str, line: usize) -> Result<(), InterpreterError> {
        let max_source_depth = self.ctx.limits.max_source_depth;
        if self.state.source_depth >= max_source_depth {
            return Err(ExecutionLimitError::new(
                format!("source: maximum nesting depth ({}) exceeded", max_source_depth),
                LimitType::SourceDepth,
                line,
            )
            .into());
        }

        let resolved = self.ctx.fs.resolve_path(&self.ctx.base_dir, path);
        let text = self
            .ctx
            .fs
            .read_file(&resolved)
            .map_err(|e| RuntimeError::new(format!("cannot source `{}`: {}", path, e), line))?;
        tracing::debug!(path = %resolved, depth = self.state.source_depth + 1, "source");

        let program = self.parse_source(&text, &resolved)?;

        self.state.source_depth += 1;
        let saved_file = std::mem::replace(&mut self.state.current_file, resolved);
        let result = self.execute_statements(&program.body);
        self.state.current_file = saved_file;
        self.state.source_depth -= 1;

        match result {
            Err(InterpreterError::Return(_)) => Ok(()),
            other => other,
        }
    }

    /// Parse a sourced file under the running program's entry point name.
    /// Errors before execution belong to the sourced file, not the line
    /// that included it.
    fn parse_source(&mut self, text: &str, resolved: &str) -> Result<Program, InterpreterError> {
        parse(text, &self.state.entry_point)
            .map_err(InterpreterError::from)
            .and_then(|program| validate_functions(&program.body).map(|_| program))
            .map_err(|e| self.blame_file(resolved, e))
    }

    fn blame_file(&mut self, file: &str, error: InterpreterError) -> InterpreterError {
        if self.state.error_file.is_none() {
            self.state.error_file = Some(file.to_string());
            self.state.error_trace = Some(self.state.call_stack.clone());
        }
        error
    }
}
