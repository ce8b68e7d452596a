//! gosh - A small scripting language with shell subshells
//!
//! This library provides the tokenizer, the parser producing a typed AST, and
//! a tree-walking interpreter that runs `$( ... )` commands and shell lines
//! through the OS shell.

pub mod ast;
pub mod fs;
pub mod gosh;
pub mod interpreter;
pub mod parser;

pub use ast::types::*;
pub use gosh::{Gosh, GoshError, GoshOptions};
pub use interpreter::{ExecResult, ExecutionLimits, InterpreterError, Value};
pub use parser::{parse, tokenize, SyntaxError};
