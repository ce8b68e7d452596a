//! Parser Types and Constants
//!
//! Shared types and constants used across parser modules.

use thiserror::Error;

use crate::parser::lexer::{Token, TokenKind};

/// Max recursion depth for nested constructs (blocks, brackets, templates)
pub const MAX_PARSER_DEPTH: usize = 200;

/// A structural error found while parsing. Parsing is all-or-nothing, so the
/// first one aborts the whole parse.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub token: Option<Token>,
}

impl SyntaxError {
    pub fn with_token(message: impl Into<String>, token: &Token) -> Self {
        Self {
            message: message.into(),
            line: token.line,
            token: Some(token.clone()),
        }
    }

    /// The standard error for a token the grammar has no place for.
    pub fn unexpected(token: &Token) -> Self {
        let message = match token.kind {
            TokenKind::Illegal => format!("illegal character `{}`", token.raw),
            TokenKind::Eof => "unexpected end of input".to_string(),
            _ => format!("unexpected token `{}`", token.raw),
        };
        Self::with_token(message, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_messages() {
        let illegal = Token::new(TokenKind::Illegal, "~", 4, 5, 2);
        let err = SyntaxError::unexpected(&illegal);
        assert_eq!(err.to_string(), "line 2: illegal character `~`");
        assert_eq!(err.token.as_ref().map(|t| t.start), Some(4));

        let eof = Token::new(TokenKind::Eof, "", 9, 9, 3);
        assert_eq!(SyntaxError::unexpected(&eof).message, "unexpected end of input");

        let rbrace = Token::new(TokenKind::RightBrace, "}", 0, 1, 1);
        assert_eq!(SyntaxError::unexpected(&rbrace).message, "unexpected token `}`");
    }
}
