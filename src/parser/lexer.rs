//! Lexer for gosh Scripts
//!
//! The lexer turns source text into an ordered sequence of tokens. At every
//! position it tries an ordered list of rules and commits to the first one
//! that matches a non-empty prefix. The order is part of the language: `$(`
//! is a subshell before `$x` is a dollar variable, `-x` is a flag before it
//! is an operator, a number before an identifier, and so on.
//!
//! Whitespace, newlines and comments are emitted like any other token; the
//! parser is responsible for skipping them.

use std::collections::HashMap;

use regex_lite::Regex;
use serde::Serialize;

/// Token types for the gosh lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Identifier,
    PrimitiveType,
    CompositeType,
    Keyword,
    ShellKeyword,
    Number,
    Operator,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Colon,
    Comma,
    Dot,

    // Literals
    String,
    TemplateString,
    Boolean,

    // Shell flavored
    DollarVariable,
    Flag,
    Subshell,

    // Trivia
    Comment,
    Whitespace,
    Newline,

    Eof,
    Illegal,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identifier => "IDENTIFIER",
            Self::PrimitiveType => "PRIMITIVE_TYPE",
            Self::CompositeType => "COMPOSITE_TYPE",
            Self::Keyword => "KEYWORD",
            Self::ShellKeyword => "SHELL_KEYWORD",
            Self::Number => "NUMBER",
            Self::Operator => "OPERATOR",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::String => "STRING",
            Self::TemplateString => "TEMPLATE_STRING",
            Self::Boolean => "BOOLEAN",
            Self::DollarVariable => "DOLLAR_VARIABLE",
            Self::Flag => "FLAG",
            Self::Subshell => "SUBSHELL",
            Self::Comment => "COMMENT",
            Self::Whitespace => "WHITESPACE",
            Self::Newline => "NEWLINE",
            Self::Eof => "EOF",
            Self::Illegal => "ILLEGAL",
        }
    }

    /// Tokens the parser never looks at.
    pub fn is_trivia(&self) -> bool {
        matches!(self, Self::Whitespace | Self::Newline | Self::Comment)
    }

    /// Tokens produced by the word rule (identifiers and every reserved word).
    pub fn is_word(&self) -> bool {
        matches!(
            self,
            Self::Identifier
                | Self::PrimitiveType
                | Self::CompositeType
                | Self::Keyword
                | Self::ShellKeyword
                | Self::Boolean
        )
    }
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text of the token
    pub raw: String,
    /// Byte offsets into the source
    pub start: usize,
    pub end: usize,
    /// Line of the first character (1-based)
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, raw: impl Into<String>, start: usize, end: usize, line: usize) -> Self {
        Self {
            kind,
            raw: raw.into(),
            start,
            end,
            line,
        }
    }

    /// Check both the kind and the exact text.
    pub fn is(&self, kind: TokenKind, raw: &str) -> bool {
        self.kind == kind && self.raw == raw
    }

    /// Line of the last character; differs from `line` for multi-line tokens.
    pub fn end_line(&self) -> usize {
        self.line + self.raw.matches('\n').count()
    }
}

/// How a rule recognises its prefix.
enum Matcher {
    Pattern(Regex),
    Literal(&'static str),
    Scan(fn(&str) -> Option<usize>),
}

impl Matcher {
    /// Length of the match anchored at the start of `input`, if non-empty.
    fn match_len(&self, input: &str) -> Option<usize> {
        let len = match self {
            Matcher::Pattern(re) => re.find(input).filter(|m| m.start() == 0).map(|m| m.end()),
            Matcher::Literal(text) => input.starts_with(text).then(|| text.len()),
            Matcher::Scan(scan) => scan(input),
        };
        len.filter(|&n| n > 0)
    }
}

struct Rule {
    kind: TokenKind,
    matcher: Matcher,
}

fn pattern(kind: TokenKind, re: &str) -> Rule {
    // Patterns are compile-time constants below.
    let regex = Regex::new(re).unwrap_or_else(|e| panic!("invalid token pattern {}: {}", re, e));
    Rule {
        kind,
        matcher: Matcher::Pattern(regex),
    }
}

fn literal(kind: TokenKind, text: &'static str) -> Rule {
    Rule {
        kind,
        matcher: Matcher::Literal(text),
    }
}

lazy_static::lazy_static! {
    /// Token rules in priority order. The first rule that matches wins.
    static ref RULES: Vec<Rule> = vec![
        pattern(TokenKind::Whitespace, r"^[ \t\r]+"),
        literal(TokenKind::Newline, "\n"),
        pattern(TokenKind::Comment, r"^(?://[^\n]*|/\*(?s:.*?)\*/)"),
        Rule { kind: TokenKind::Subshell, matcher: Matcher::Scan(scan_subshell) },
        pattern(TokenKind::DollarVariable, r"^\$[A-Za-z_][A-Za-z0-9_]*"),
        pattern(TokenKind::Flag, r"^--?[A-Za-z][A-Za-z0-9_-]*"),
        pattern(TokenKind::Number, r"^[0-9]+(?:\.[0-9]+)?"),
        pattern(TokenKind::Identifier, r"^[A-Za-z_][A-Za-z0-9_]*"),
        pattern(TokenKind::TemplateString, r"^`[^`]*`"),
        pattern(TokenKind::String, r#"^(?:"[^"\n]*"|'[^'\n]*')"#),
        pattern(TokenKind::Operator, r"^(?:==|!=|<=|>=|&&|\|\||[+\-*/=<>])"),
        literal(TokenKind::LeftParen, "("),
        literal(TokenKind::RightParen, ")"),
        literal(TokenKind::LeftBrace, "{"),
        literal(TokenKind::RightBrace, "}"),
        literal(TokenKind::LeftBracket, "["),
        literal(TokenKind::RightBracket, "]"),
        literal(TokenKind::Semicolon, ";"),
        literal(TokenKind::Colon, ":"),
        literal(TokenKind::Comma, ","),
        literal(TokenKind::Dot, "."),
    ];

    /// Reserved words and their token kinds
    static ref RESERVED_WORDS: HashMap<&'static str, TokenKind> = {
        let mut m = HashMap::new();
        for word in ["var", "const", "if", "else", "func", "return", "for", "in", "while", "do", "break", "continue"] {
            m.insert(word, TokenKind::Keyword);
        }
        for word in ["echo", "source", "sleep"] {
            m.insert(word, TokenKind::ShellKeyword);
        }
        for word in ["bool", "int", "float64", "string"] {
            m.insert(word, TokenKind::PrimitiveType);
        }
        for word in ["array", "object"] {
            m.insert(word, TokenKind::CompositeType);
        }
        m.insert("true", TokenKind::Boolean);
        m.insert("false", TokenKind::Boolean);
        m
    };
}

/// Match `$( ... )` with balanced parentheses on a single line.
/// Parentheses inside quotes do not count.
fn scan_subshell(input: &str) -> Option<usize> {
    if !input.starts_with("$(") {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices().skip(1) {
        if c == '\n' {
            return None;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Classify the text matched by the word rule.
pub fn classify_word(word: &str) -> TokenKind {
    RESERVED_WORDS.get(word).copied().unwrap_or(TokenKind::Identifier)
}

/// Check if a string would lex as a single identifier-shaped word
pub fn is_word_text(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Lexer over a single source text
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0, line: 1 }
    }

    /// Start counting lines at `line` instead of 1. Used when re-lexing a
    /// fragment embedded in a larger source.
    pub fn starting_at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Tokenize the whole input. Always ends with an EOF token.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            let (kind, len) = RULES
                .iter()
                .find_map(|rule| rule.matcher.match_len(rest).map(|len| (rule.kind, len)))
                .unwrap_or_else(|| {
                    // Exactly one character so the cursor always moves.
                    let len = rest.chars().next().map_or(1, char::len_utf8);
                    (TokenKind::Illegal, len)
                });

            let raw = &rest[..len];
            let kind = if kind == TokenKind::Identifier { classify_word(raw) } else { kind };

            tokens.push(Token::new(kind, raw, self.pos, self.pos + len, self.line));
            self.line += raw.matches('\n').count();
            self.pos += len;
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.pos, self.pos, self.line));
        tracing::debug!(tokens = tokens.len(), lines = self.line, "tokenized source");
        tokens
    }
}

/// Tokenize a source string.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
