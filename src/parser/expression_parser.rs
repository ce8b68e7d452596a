//! Expression Parser
//!
//! Operator-precedence (shunting-yard) parsing of expressions. Operands go to
//! an output queue; binary operators wait on an operator stack and are moved
//! to the output while the stack top binds at least as tightly. The postfix
//! queue is then reduced into a `BinaryExpression` tree.
//!
//! Statement context is line-delimited: a token on a later line than the
//! previous one ends the expression unless a `(` is still open. In nested
//! context (brackets, argument lists, template holes) newlines are free and
//! `, ) ] }` at parenthesis depth 0 terminate the expression.

use crate::ast::types::*;
use crate::parser::lexer::{Lexer, Token, TokenKind};
use crate::parser::parser::Parser;
use crate::parser::types::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    Statement,
    Nested,
}

enum StackOp {
    Operator(BinaryOperator, Token),
    LeftParen(Token),
}

enum Postfix {
    Operand(Expression),
    Operator(BinaryOperator, Token),
}

impl Parser {
    /// Parse one expression. Returns `None` when no expression starts here.
    pub(crate) fn parse_expression(&mut self, ctx: ExprContext) -> Result<Option<Expression>, SyntaxError> {
        let mut output: Vec<Postfix> = Vec::new();
        let mut ops: Vec<StackOp> = Vec::new();
        let mut expect_operand = true;
        let mut paren_depth = 0usize;
        let mut operator_count = 0usize;
        let mut started = false;

        loop {
            let token = self.current().clone();
            if token.kind == TokenKind::Eof {
                break;
            }
            if ctx == ExprContext::Statement
                && started
                && paren_depth == 0
                && token.line > self.previous_end_line()
            {
                break;
            }

            match token.kind {
                TokenKind::Operator if token.raw == "=" => break,
                TokenKind::Operator if expect_operand => {
                    let next = self.peek(1);
                    if token.raw == "-" && next.kind == TokenKind::Number && next.start == token.end {
                        let number = self.parse_negative_number()?;
                        output.push(Postfix::Operand(number));
                        expect_operand = false;
                    } else {
                        return Err(SyntaxError::unexpected(&token));
                    }
                }
                TokenKind::Operator => {
                    let Some(op) = BinaryOperator::from_symbol(&token.raw) else {
                        return Err(SyntaxError::unexpected(&token));
                    };
                    self.advance();
                    while let Some(StackOp::Operator(top, _)) = ops.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        if let Some(StackOp::Operator(top, top_token)) = ops.pop() {
                            output.push(Postfix::Operator(top, top_token));
                        }
                    }
                    ops.push(StackOp::Operator(op, token));
                    operator_count += 1;
                    expect_operand = true;
                }
                TokenKind::LeftParen => {
                    if !expect_operand {
                        break;
                    }
                    self.advance();
                    ops.push(StackOp::LeftParen(token));
                    paren_depth += 1;
                }
                TokenKind::RightParen => {
                    if paren_depth == 0 {
                        match ctx {
                            ExprContext::Nested => break,
                            ExprContext::Statement => {
                                return Err(SyntaxError::with_token("unmatched `)`", &token));
                            }
                        }
                    }
                    if expect_operand {
                        return Err(SyntaxError::unexpected(&token));
                    }
                    self.advance();
                    while let Some(op) = ops.pop() {
                        match op {
                            StackOp::LeftParen(_) => break,
                            StackOp::Operator(op, op_token) => output.push(Postfix::Operator(op, op_token)),
                        }
                    }
                    paren_depth -= 1;
                }
                TokenKind::Comma | TokenKind::RightBracket | TokenKind::RightBrace
                    if ctx == ExprContext::Nested && paren_depth == 0 =>
                {
                    break
                }
                _ => {
                    if !expect_operand || !self.starts_operand() {
                        if output.is_empty() && ops.is_empty() {
                            break;
                        }
                        if expect_operand {
                            return Err(SyntaxError::unexpected(&token));
                        }
                        break;
                    }
                    let operand = self.parse_operand()?;
                    output.push(Postfix::Operand(operand));
                    expect_operand = false;
                }
            }
            started = true;
        }

        while let Some(op) = ops.pop() {
            match op {
                StackOp::LeftParen(token) => return Err(SyntaxError::with_token("expected `)`", &token)),
                StackOp::Operator(op, token) => output.push(Postfix::Operator(op, token)),
            }
        }

        if operator_count == 0 {
            return Ok(output.pop().and_then(|item| match item {
                Postfix::Operand(expr) => Some(expr),
                Postfix::Operator(..) => None,
            }));
        }
        reduce_postfix(output, self.current()).map(Some)
    }

    fn starts_operand(&self) -> bool {
        let token = self.current();
        match token.kind {
            TokenKind::Number
            | TokenKind::String
            | TokenKind::TemplateString
            | TokenKind::Boolean
            | TokenKind::Identifier
            | TokenKind::DollarVariable
            | TokenKind::Subshell
            | TokenKind::LeftBracket
            | TokenKind::LeftBrace => true,
            TokenKind::Keyword => token.raw == "func",
            _ => false,
        }
    }

    /// A primary plus any member, index or call suffixes.
    fn parse_operand(&mut self) -> Result<Expression, SyntaxError> {
        let primary = self.parse_primary()?;
        match primary {
            Expression::Identifier(_) => self.parse_postfix(primary),
            _ => Ok(primary),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.current().clone();
        let span = Span::new(token.start, token.end, token.line);
        match token.kind {
            TokenKind::Number => {
                self.advance();
                parse_number(&token, &token.raw)
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::StringLiteral(StringLiteral {
                    span,
                    value: token.raw[1..token.raw.len() - 1].to_string(),
                    template: None,
                }))
            }
            TokenKind::TemplateString => {
                self.advance();
                self.parse_template(&token)
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(Expression::BooleanLiteral(BooleanLiteral {
                    span,
                    value: token.raw == "true",
                }))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expression::Identifier(Identifier { span, name: token.raw }))
            }
            TokenKind::DollarVariable => {
                self.advance();
                Ok(Expression::Identifier(Identifier {
                    span,
                    name: token.raw[1..].to_string(),
                }))
            }
            TokenKind::Subshell => {
                self.advance();
                Ok(Expression::SubShell(SubShell {
                    span,
                    command: token.raw[2..token.raw.len() - 1].trim().to_string(),
                }))
            }
            TokenKind::LeftBracket => self.parse_array(),
            TokenKind::LeftBrace => self.parse_object(),
            TokenKind::Keyword if token.raw == "func" => {
                self.advance();
                let func = self.parse_function_rest(&token, None)?;
                Ok(Expression::FunctionExpression(func))
            }
            _ => Err(SyntaxError::unexpected(&token)),
        }
    }

    fn parse_negative_number(&mut self) -> Result<Expression, SyntaxError> {
        let minus = self.advance();
        let number = self.advance();
        let raw = format!("-{}", number.raw);
        let folded = Token::new(TokenKind::Number, raw.clone(), minus.start, number.end, minus.line);
        parse_number(&folded, &raw)
    }

    /// `.name`, `[index]` and `(args)` suffixes on the same line.
    fn parse_postfix(&mut self, mut expr: Expression) -> Result<Expression, SyntaxError> {
        loop {
            let token = self.current().clone();
            if token.line > self.previous_end_line() {
                return Ok(expr);
            }
            let start = expr.span();
            expr = match token.kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.current().clone();
                    if !name.kind.is_word() {
                        return Err(self.expected("property name"));
                    }
                    self.advance();
                    Expression::MemberExpression(MemberExpression {
                        span: start.to(Span::new(name.start, name.end, name.line)),
                        object: Box::new(expr),
                        property: Box::new(Expression::Identifier(Identifier {
                            span: Span::new(name.start, name.end, name.line),
                            name: name.raw,
                        })),
                        computed: false,
                    })
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    self.enter()?;
                    let property = self.parse_required_expression(ExprContext::Nested)?;
                    let close = self.expect(TokenKind::RightBracket, "`]`")?;
                    self.leave();
                    Expression::MemberExpression(MemberExpression {
                        span: start.to(Span::new(close.start, close.end, close.line)),
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: true,
                    })
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let arguments = self.parse_expression_list(TokenKind::RightParen, "`,` or `)`")?;
                    Expression::CallExpression(CallExpression {
                        span: self.span_from_span(start),
                        callee: Box::new(expr),
                        arguments,
                    })
                }
                _ => return Ok(expr),
            };
        }
    }

    fn span_from_span(&self, start: Span) -> Span {
        let end = self.previous().map_or(start.end, |t| t.end);
        Span::new(start.start, end.max(start.end), start.line)
    }

    /// Comma separated expressions up to and including `close`. The opening
    /// token is already consumed. A trailing comma is allowed.
    fn parse_expression_list(&mut self, close: TokenKind, what: &str) -> Result<Vec<Expression>, SyntaxError> {
        self.enter()?;
        let mut items = Vec::new();
        loop {
            if self.check(close) {
                self.advance();
                break;
            }
            items.push(self.parse_required_expression(ExprContext::Nested)?);
            if self.check(TokenKind::Comma) {
                self.advance();
            } else if !self.check(close) {
                return Err(self.expected(what));
            }
        }
        self.leave();
        Ok(items)
    }

    fn parse_array(&mut self) -> Result<Expression, SyntaxError> {
        let start = self.advance();
        let elements = self.parse_expression_list(TokenKind::RightBracket, "`,` or `]`")?;
        Ok(Expression::ArrayExpression(ArrayExpression {
            span: self.span_from(&start),
            elements,
        }))
    }

    fn parse_object(&mut self) -> Result<Expression, SyntaxError> {
        let start = self.advance();
        self.enter()?;
        let mut properties = Vec::new();
        loop {
            if self.check(TokenKind::RightBrace) {
                self.advance();
                break;
            }

            let key_token = self.current().clone();
            let key = match key_token.kind {
                kind if kind.is_word() => key_token.raw.clone(),
                TokenKind::Number => key_token.raw.clone(),
                TokenKind::String => key_token.raw[1..key_token.raw.len() - 1].to_string(),
                _ => return Err(self.expected("property key")),
            };
            self.advance();
            self.expect(TokenKind::Colon, "`:`")?;
            let value = self.parse_required_expression(ExprContext::Nested)?;
            properties.push(Property { key, value });

            if self.check(TokenKind::Comma) {
                self.advance();
            } else if !self.check(TokenKind::RightBrace) {
                return Err(self.expected("`,` or `}`"));
            }
        }
        self.leave();
        Ok(Expression::ObjectExpression(ObjectExpression {
            span: self.span_from(&start),
            properties,
        }))
    }

    /// Split a backtick template into text and `${expr}` / `$name` holes.
    fn parse_template(&mut self, token: &Token) -> Result<Expression, SyntaxError> {
        let inner = &token.raw[1..token.raw.len() - 1];
        // Byte offset of `inner` in the source
        let base = token.start + 1;
        let bytes = inner.as_bytes();

        let mut parts = Vec::new();
        let mut text = String::new();
        let mut i = 0;
        while i < inner.len() {
            if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
                let hole_start = i + 2;
                let hole_end = find_hole_end(inner, hole_start).ok_or_else(|| {
                    SyntaxError::with_token("unterminated `${` in template", token)
                })?;
                if !text.is_empty() {
                    parts.push(TemplatePart::Text { value: std::mem::take(&mut text) });
                }
                let line = token.line + inner[..hole_start].matches('\n').count();
                let expression = self.parse_template_hole(&inner[hole_start..hole_end], base + hole_start, line, token)?;
                parts.push(TemplatePart::Expression { expression });
                i = hole_end + 1;
            } else if bytes[i] == b'$' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') {
                let name_start = i + 1;
                let name_end = inner[name_start..]
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .map_or(inner.len(), |n| name_start + n);
                if !text.is_empty() {
                    parts.push(TemplatePart::Text { value: std::mem::take(&mut text) });
                }
                let line = token.line + inner[..i].matches('\n').count();
                parts.push(TemplatePart::Expression {
                    expression: Expression::Identifier(Identifier {
                        span: Span::new(base + i, base + name_end, line),
                        name: inner[name_start..name_end].to_string(),
                    }),
                });
                i = name_end;
            } else {
                let ch_len = inner[i..].chars().next().map_or(1, char::len_utf8);
                text.push_str(&inner[i..i + ch_len]);
                i += ch_len;
            }
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text { value: text });
        }

        Ok(Expression::StringLiteral(StringLiteral {
            span: Span::new(token.start, token.end, token.line),
            value: inner.to_string(),
            template: Some(parts),
        }))
    }

    fn parse_template_hole(
        &mut self,
        source: &str,
        offset: usize,
        line: usize,
        template: &Token,
    ) -> Result<Expression, SyntaxError> {
        let tokens: Vec<Token> = Lexer::new(source)
            .starting_at_line(line)
            .tokenize()
            .into_iter()
            .map(|mut t| {
                t.start += offset;
                t.end += offset;
                t
            })
            .collect();

        let mut sub = Parser::new(tokens);
        sub.depth = self.depth + 1;
        if sub.depth > crate::parser::types::MAX_PARSER_DEPTH {
            return Err(SyntaxError::with_token("maximum nesting depth exceeded", template));
        }
        let expression = match sub.parse_expression(ExprContext::Nested)? {
            Some(expr) => expr,
            None => return Err(SyntaxError::with_token("empty `${}` in template", template)),
        };
        if !sub.check(TokenKind::Eof) {
            return Err(SyntaxError::unexpected(sub.current()));
        }
        Ok(expression)
    }
}

/// Index of the `}` closing a template hole that starts at `from`.
fn find_hole_end(inner: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in inner[from..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(from + i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn parse_number(token: &Token, raw: &str) -> Result<Expression, SyntaxError> {
    let value = if raw.contains('.') {
        raw.parse::<f64>().map(Number::Float).ok()
    } else {
        raw.parse::<i64>().map(Number::Int).ok()
    };
    let value = value.ok_or_else(|| SyntaxError::with_token(format!("number `{}` out of range", raw), token))?;
    Ok(Expression::NumberLiteral(NumberLiteral {
        span: Span::new(token.start, token.end, token.line),
        raw: raw.to_string(),
        value,
    }))
}

/// Reduce a postfix queue to a single expression tree.
fn reduce_postfix(output: Vec<Postfix>, at: &Token) -> Result<Expression, SyntaxError> {
    let mut stack: Vec<Expression> = Vec::new();
    for item in output {
        match item {
            Postfix::Operand(expr) => stack.push(expr),
            Postfix::Operator(operator, token) => {
                let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                    return Err(SyntaxError::with_token(format!("missing operand for `{}`", operator), &token));
                };
                stack.push(Expression::BinaryExpression(BinaryExpression {
                    span: left.span().to(right.span()),
                    left: Box::new(left),
                    right: Box::new(right),
                    operator,
                }));
            }
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(expr), true) => Ok(expr),
        _ => Err(SyntaxError::with_token("malformed expression", at)),
    }
}
