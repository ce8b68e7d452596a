//! Abstract Syntax Tree (AST) Types for gosh
//!
//! Architecture:
//!   Source → Lexer → Parser → AST → Interpreter → Output

pub mod types;

pub use types::*;
