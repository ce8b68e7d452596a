//! Interpreter Errors
//!
//! Every failure kind is its own error struct; `InterpreterError` unifies them
//! so evaluation can thread a single `Result` with `?`.
//!
//! Control flow is carried on the same channel:
//! - return: Exit functions (carries the returned value)
//! - break: Exit loops
//! - continue: Skip to next iteration
//!
//! Those three are caught by the construct they belong to and never reach the
//! driver unless they escape their scope.

use thiserror::Error;

use crate::interpreter::types::Value;

pub use crate::parser::types::SyntaxError;

/// Reference to a name that is not bound in any frame.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: unresolved identifier `{name}`")]
pub struct UnresolvedIdentifierError {
    pub name: String,
    pub line: usize,
}

impl UnresolvedIdentifierError {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self { name: name.into(), line }
    }
}

/// General evaluation failure: bad call, bad index, missing file, etc.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// An operator applied to operands it does not support.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: invalid operation `{operator}`: {message}")]
pub struct IllegalOperationError {
    pub operator: String,
    pub message: String,
    pub line: usize,
}

impl IllegalOperationError {
    pub fn new(operator: impl Into<String>, message: impl Into<String>, line: usize) -> Self {
        Self {
            operator: operator.into(),
            message: message.into(),
            line,
        }
    }
}

/// Which execution limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    CallDepth,
    LoopIterations,
    SourceDepth,
}

/// Error thrown when a configured execution limit is exceeded.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct ExecutionLimitError {
    pub message: String,
    pub limit_type: LimitType,
    pub line: usize,
}

impl ExecutionLimitError {
    pub fn new(message: impl Into<String>, limit_type: LimitType, line: usize) -> Self {
        Self {
            message: message.into(),
            limit_type,
            line,
        }
    }
}

/// `return` unwinding to the enclosing call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: return outside of a function")]
pub struct ReturnSignal {
    pub value: Option<Value>,
    pub line: usize,
}

/// `break` unwinding to the enclosing loop.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: break outside of a loop")]
pub struct BreakSignal {
    pub line: usize,
}

/// `continue` unwinding to the enclosing loop.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: continue outside of a loop")]
pub struct ContinueSignal {
    pub line: usize,
}

/// Unified error enum for all interpreter errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    UnresolvedIdentifier(#[from] UnresolvedIdentifierError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    IllegalOperation(#[from] IllegalOperationError),
    #[error(transparent)]
    ExecutionLimit(#[from] ExecutionLimitError),
    #[error(transparent)]
    Return(#[from] ReturnSignal),
    #[error(transparent)]
    Break(#[from] BreakSignal),
    #[error(transparent)]
    Continue(#[from] ContinueSignal),
}

impl InterpreterError {
    /// Kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            InterpreterError::Syntax(_) => "SyntaxError",
            InterpreterError::UnresolvedIdentifier(_) => "UnresolvedIdentifier",
            InterpreterError::Runtime(_) => "RuntimeError",
            InterpreterError::IllegalOperation(_) => "IllegalOperation",
            InterpreterError::ExecutionLimit(_) => "ExecutionLimit",
            InterpreterError::Return(_) | InterpreterError::Break(_) | InterpreterError::Continue(_) => {
                "RuntimeError"
            }
        }
    }

    pub fn line(&self) -> usize {
        match self {
            InterpreterError::Syntax(e) => e.line,
            InterpreterError::UnresolvedIdentifier(e) => e.line,
            InterpreterError::Runtime(e) => e.line,
            InterpreterError::IllegalOperation(e) => e.line,
            InterpreterError::ExecutionLimit(e) => e.line,
            InterpreterError::Return(e) => e.line,
            InterpreterError::Break(e) => e.line,
            InterpreterError::Continue(e) => e.line,
        }
    }

    /// Check if an error is a scope exit signal (return, break, continue).
    pub fn is_scope_exit(&self) -> bool {
        matches!(
            self,
            InterpreterError::Return(_) | InterpreterError::Break(_) | InterpreterError::Continue(_)
        )
    }

    /// Turn a signal that escaped its construct into the runtime error it
    /// stands for. Other errors pass through unchanged.
    pub fn into_escaped(self) -> InterpreterError {
        match self {
            InterpreterError::Return(ref s) => RuntimeError::new("return outside of a function", s.line).into(),
            InterpreterError::Break(ref s) => RuntimeError::new("break outside of a loop", s.line).into(),
            InterpreterError::Continue(ref s) => RuntimeError::new("continue outside of a loop", s.line).into(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_line() {
        let err: InterpreterError = IllegalOperationError::new("-", "cannot apply to string", 3).into();
        assert_eq!(err.to_string(), "line 3: invalid operation `-`: cannot apply to string");
        assert_eq!(err.kind_name(), "IllegalOperation");
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_scope_exit_signals() {
        let err: InterpreterError = BreakSignal { line: 2 }.into();
        assert!(err.is_scope_exit());
        let escaped = err.into_escaped();
        assert!(!escaped.is_scope_exit());
        assert_eq!(escaped.to_string(), "line 2: break outside of a loop");

        let err: InterpreterError = RuntimeError::new("boom", 1).into();
        assert!(!err.is_scope_exit());
    }
}
