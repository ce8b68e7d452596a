//! Statement Parser for gosh Scripts
//!
//! This parser consumes tokens from the lexer and produces a `Program`.
//! Statements are recognised by their leading token; expressions are handed
//! to the operator-precedence parser in `expression_parser`.
//!
//! Grammar (simplified):
//!   program    ::= (statement end)*
//!   statement  ::= var_decl | func_decl | if | while | for | return
//!                | break | continue | shell_line | source | assignment | expr
//!   var_decl   ::= ('var' | 'const') IDENT [':' TYPE] '=' expr
//!   func_decl  ::= 'func' IDENT '(' [param (',' param)*] ')' block
//!   if         ::= 'if' expr block ['else' (if | block)]
//!   while      ::= 'while' expr block
//!   for        ::= 'for' IDENT 'in' expr block
//!   shell_line ::= ('echo' | 'sleep') <rest of line>
//!   source     ::= 'source' <paths on the rest of the line>
//!   end        ::= NEWLINE | ';' | '}' | EOF
//!
//! Trivia tokens are kept alongside the significant ones so shell lines can be
//! reassembled verbatim.

use std::collections::HashSet;

use crate::ast::types::*;
use crate::parser::expression_parser::ExprContext;
use crate::parser::lexer::{tokenize, Token, TokenKind};
use crate::parser::types::{SyntaxError, MAX_PARSER_DEPTH};

/// Main parser struct
pub struct Parser {
    /// Every token, trivia included
    tokens: Vec<Token>,
    /// Indices into `tokens` of the non-trivia tokens
    significant: Vec<usize>,
    /// Cursor into `significant`
    pos: usize,
    /// Number of enclosing `{ ... }` statement blocks
    block_depth: usize,
    /// Recursion depth for nested constructs
    pub(crate) depth: usize,
}

impl Parser {
    /// Create a parser over a token stream. An EOF token is appended if the
    /// stream does not already end with one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (end, line) = tokens.last().map_or((0, 1), |t| (t.end, t.end_line()));
            tokens.push(Token::new(TokenKind::Eof, "", end, end, line));
        }
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .map(|(i, _)| i)
            .collect();
        Parser {
            tokens,
            significant,
            pos: 0,
            block_depth: 0,
            depth: 0,
        }
    }

    /// Parse the whole token stream into a program.
    pub fn parse_program(&mut self, entry_point: &str) -> Result<Program, SyntaxError> {
        let mut body = Vec::new();
        loop {
            self.skip_semicolons();
            if self.check(TokenKind::Eof) {
                break;
            }
            body.push(self.parse_statement()?);
            self.expect_statement_end()?;
        }

        tracing::debug!(entry_point, statements = body.len(), "parsed program");
        Ok(Program {
            body,
            entry_point: entry_point.to_string(),
        })
    }

    // ===========================================================================
    // HELPER METHODS
    // ===========================================================================

    pub(crate) fn current(&self) -> &Token {
        self.peek(0)
    }

    pub(crate) fn peek(&self, offset: usize) -> &Token {
        // The last significant token is always EOF.
        let idx = (self.pos + offset).min(self.significant.len() - 1);
        &self.tokens[self.significant[idx]]
    }

    /// The last consumed significant token.
    pub(crate) fn previous(&self) -> Option<&Token> {
        self.pos
            .checked_sub(1)
            .and_then(|p| self.significant.get(p))
            .map(|&i| &self.tokens[i])
    }

    pub(crate) fn previous_end_line(&self) -> usize {
        self.previous().map_or(0, Token::end_line)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.significant.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    pub(crate) fn check_raw(&self, kind: TokenKind, raw: &str) -> bool {
        self.current().is(kind, raw)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(what))
        }
    }

    pub(crate) fn expected(&self, what: &str) -> SyntaxError {
        let token = self.current();
        match token.kind {
            TokenKind::Eof => SyntaxError::with_token(format!("expected {}, found end of input", what), token),
            _ => SyntaxError::with_token(format!("expected {}, found `{}`", what, token.raw), token),
        }
    }

    /// Span from `start` through the last consumed token.
    pub(crate) fn span_from(&self, start: &Token) -> Span {
        let end = self.previous().map_or(start.end, |t| t.end);
        Span::new(start.start, end.max(start.end), start.line)
    }

    pub(crate) fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            return Err(SyntaxError::with_token("maximum nesting depth exceeded", self.current()));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_semicolons(&mut self) {
        while self.check(TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// A statement must be followed by a line break, `;`, the enclosing `}`
    /// or the end of input.
    fn expect_statement_end(&mut self) -> Result<(), SyntaxError> {
        let token = self.current();
        match token.kind {
            TokenKind::Eof => Ok(()),
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RightBrace if self.block_depth > 0 => Ok(()),
            _ if token.line > self.previous_end_line() => Ok(()),
            _ => Err(SyntaxError::unexpected(token)),
        }
    }

    /// Reassemble the raw text from `all_start` up to the end of the line.
    /// A comment, `;`, or the closing `}` of an enclosing block also ends it.
    /// Braces opened on the line itself (`${name}`) are kept balanced.
    fn take_line_from(&mut self, all_start: usize) -> String {
        let mut text = String::new();
        let mut stop = all_start;
        let mut open_braces = 0usize;
        while let Some(token) = self.tokens.get(stop) {
            let ends_line = match token.kind {
                TokenKind::Eof | TokenKind::Newline | TokenKind::Comment | TokenKind::Semicolon => true,
                TokenKind::LeftBrace => {
                    open_braces += 1;
                    false
                }
                TokenKind::RightBrace if open_braces > 0 => {
                    open_braces -= 1;
                    false
                }
                TokenKind::RightBrace => self.block_depth > 0,
                _ => false,
            };
            if ends_line {
                break;
            }
            text.push_str(&token.raw);
            stop += 1;
        }
        self.pos = self.significant.partition_point(|&i| i < stop);
        text.trim().to_string()
    }

    // ===========================================================================
    // STATEMENTS
    // ===========================================================================

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Keyword => match token.raw.as_str() {
                "var" | "const" => self.parse_variable_declaration(),
                "func" if self.peek(1).kind == TokenKind::Identifier => {
                    Ok(Statement::FunctionDeclaration(self.parse_function_declaration()?))
                }
                "if" => self.parse_if(),
                "while" => self.parse_while(),
                "for" => self.parse_for(),
                "return" => self.parse_return(),
                "break" => {
                    self.advance();
                    Ok(Statement::Break(BreakStatement { span: self.span_from(&token) }))
                }
                "continue" => {
                    self.advance();
                    Ok(Statement::Continue(ContinueStatement { span: self.span_from(&token) }))
                }
                "func" => self.parse_expression_statement(),
                _ => Err(SyntaxError::unexpected(&token)),
            },
            TokenKind::ShellKeyword => match token.raw.as_str() {
                "source" => self.parse_source(),
                _ => self.parse_shell_expression(),
            },
            TokenKind::Identifier if self.peek(1).is(TokenKind::Operator, "=") => self.parse_assignment(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance();
        let kind = if start.raw == "const" {
            DeclarationKind::Const
        } else {
            DeclarationKind::Var
        };

        let name = self.parse_identifier("variable name")?;
        let type_annotation = self.parse_type_annotation()?;

        if !self.check_raw(TokenKind::Operator, "=") {
            return Err(self.expected("`=`"));
        }
        self.advance();

        let init = self.parse_required_expression(ExprContext::Statement)?;
        Ok(Statement::VariableDeclaration(VariableDeclaration {
            span: self.span_from(&start),
            kind,
            name,
            type_annotation,
            init,
        }))
    }

    fn parse_assignment(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.current().clone();
        let identifier = self.parse_identifier("identifier")?;
        // `=`
        self.advance();
        let expression = self.parse_required_expression(ExprContext::Statement)?;
        Ok(Statement::AssignmentExpression(AssignmentExpression {
            span: self.span_from(&start),
            identifier,
            expression,
        }))
    }

    pub(crate) fn parse_identifier(&mut self, what: &str) -> Result<Identifier, SyntaxError> {
        let token = self.expect(TokenKind::Identifier, what)?;
        Ok(Identifier {
            span: Span::new(token.start, token.end, token.line),
            name: token.raw,
        })
    }

    fn parse_type_annotation(&mut self) -> Result<Option<TypeAnnotation>, SyntaxError> {
        if !self.check(TokenKind::Colon) {
            return Ok(None);
        }
        self.advance();
        let token = self.current().clone();
        match token.kind {
            TokenKind::PrimitiveType | TokenKind::CompositeType => {
                self.advance();
                Ok(TypeAnnotation::from_keyword(&token.raw))
            }
            _ => Err(self.expected("a type")),
        }
    }

    fn parse_function_declaration(&mut self) -> Result<FunctionDeclaration, SyntaxError> {
        let start = self.advance();
        let name = self.parse_identifier("function name")?;
        self.parse_function_rest(&start, Some(name))
    }

    /// Parameters and body of a function; `func` (and the name) are consumed.
    pub(crate) fn parse_function_rest(
        &mut self,
        start: &Token,
        name: Option<Identifier>,
    ) -> Result<FunctionDeclaration, SyntaxError> {
        self.expect(TokenKind::LeftParen, "`(`")?;

        let mut parameters = Vec::new();
        let mut seen = HashSet::new();
        while !self.check(TokenKind::RightParen) {
            let param_token = self.current().clone();
            let param_name = self.parse_identifier("parameter name")?;
            if !seen.insert(param_name.name.clone()) {
                return Err(SyntaxError::with_token(
                    format!("duplicate parameter `{}`", param_name.name),
                    &param_token,
                ));
            }
            let type_annotation = self.parse_type_annotation()?;
            parameters.push(Parameter {
                name: param_name,
                type_annotation,
            });

            if self.check(TokenKind::Comma) {
                self.advance();
            } else if !self.check(TokenKind::RightParen) {
                return Err(self.expected("`,` or `)`"));
            }
        }
        self.advance();

        let body = self.parse_block()?;
        Ok(FunctionDeclaration {
            span: self.span_from(start),
            name,
            parameters,
            body,
        })
    }

    /// `{ statement* }`
    pub(crate) fn parse_block(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        self.expect(TokenKind::LeftBrace, "`{`")?;
        self.enter()?;
        self.block_depth += 1;

        let mut body = Vec::new();
        loop {
            self.skip_semicolons();
            if self.check(TokenKind::RightBrace) {
                break;
            }
            if self.check(TokenKind::Eof) {
                return Err(self.expected("`}`"));
            }
            body.push(self.parse_statement()?);
            self.expect_statement_end()?;
        }
        self.advance();

        self.block_depth -= 1;
        self.leave();
        Ok(body)
    }

    fn parse_if(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance();
        let condition = self.parse_required_expression(ExprContext::Statement)?;
        let consequent = self.parse_block()?;

        let alternate = if self.check_raw(TokenKind::Keyword, "else") {
            self.advance();
            if self.check_raw(TokenKind::Keyword, "if") {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            span: self.span_from(&start),
            condition,
            consequent,
            alternate,
        }))
    }

    fn parse_while(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance();
        let condition = self.parse_required_expression(ExprContext::Statement)?;
        let body = self.parse_block()?;
        Ok(Statement::While(WhileStatement {
            span: self.span_from(&start),
            condition,
            body,
        }))
    }

    fn parse_for(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance();
        let binding = self.parse_identifier("loop variable")?;
        if !self.check_raw(TokenKind::Keyword, "in") {
            return Err(self.expected("`in`"));
        }
        self.advance();
        let iterable = self.parse_required_expression(ExprContext::Statement)?;
        let body = self.parse_block()?;
        Ok(Statement::For(ForStatement {
            span: self.span_from(&start),
            binding,
            iterable,
            body,
        }))
    }

    fn parse_return(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance();
        let next = self.current();
        let bare = next.line > start.end_line()
            || matches!(next.kind, TokenKind::Eof | TokenKind::Semicolon | TokenKind::RightBrace);
        let argument = if bare {
            None
        } else {
            Some(self.parse_required_expression(ExprContext::Statement)?)
        };
        Ok(Statement::Return(ReturnStatement {
            span: self.span_from(&start),
            argument,
        }))
    }

    fn parse_shell_expression(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.current().clone();
        let command = self.take_line_from(self.significant[self.pos]);
        Ok(Statement::ShellExpression(ShellExpression {
            span: self.span_from(&start),
            command,
        }))
    }

    fn parse_source(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance();
        let after_keyword = self.significant[self.pos - 1] + 1;
        let line = self.take_line_from(after_keyword);

        let sources: Vec<String> = line.split_whitespace().map(|s| strip_quotes(s).to_string()).collect();
        if sources.is_empty() {
            return Err(SyntaxError::with_token("`source` needs at least one path", &start));
        }

        Ok(Statement::SourceDeclaration(SourceDeclaration {
            span: self.span_from(&start),
            sources,
        }))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.current().clone();
        let expression = self.parse_required_expression(ExprContext::Statement)?;
        Ok(Statement::Expression(ExpressionStatement {
            span: self.span_from(&start),
            expression,
        }))
    }

    pub(crate) fn parse_required_expression(&mut self, ctx: ExprContext) -> Result<Expression, SyntaxError> {
        match self.parse_expression(ctx)? {
            Some(expr) => Ok(expr),
            None => Err(SyntaxError::unexpected(self.current())),
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Convenience function to tokenize and parse a source text
pub fn parse(source: &str, entry_point: &str) -> Result<Program, SyntaxError> {
    parse_tokens(tokenize(source), entry_point)
}

/// Parse from pre-tokenized input
pub fn parse_tokens(tokens: Vec<Token>, entry_point: &str) -> Result<Program, SyntaxError> {
    Parser::new(tokens).parse_program(entry_point)
}
