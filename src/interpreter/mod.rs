//! Interpreter module
//!
//! This module contains the gosh tree-walking interpreter.

pub mod binary_expression;
pub mod builtins;
pub mod command_substitution;
pub mod control_flow;
pub mod errors;
pub mod expressions;
pub mod functions;
pub mod interpreter;
pub mod scope;
pub mod stack;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use binary_expression::{evaluate_binary, values_equal};
pub use command_substitution::*;
pub use errors::*;
pub use functions::{validate_functions, INIT_FUNCTION};
pub use interpreter::{Interpreter, InterpreterContext, InterpreterState};
pub use scope::*;
pub use types::*;
