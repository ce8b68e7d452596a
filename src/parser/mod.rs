//! Parser module for gosh scripts
//!
//! This module contains the lexer, the statement parser and the
//! operator-precedence expression parser.

pub mod types;
pub mod lexer;
pub mod expression_parser;
pub mod parser;

// Re-exports
pub use types::SyntaxError;
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::{parse, parse_tokens, Parser};
