//! Abstract Syntax Tree (AST) Types for gosh
//!
//! A program is a list of statements; statements own their expressions and
//! nested blocks, so the tree is acyclic and every node has exactly one
//! owner. Every node carries a `Span` pointing back into the source.
//!
//! All nodes derive `Serialize` so the CLI can dump them as JSON.

use std::fmt;

use serde::Serialize;

use crate::parser::lexer::is_word_text;

// =============================================================================
// BASE TYPES
// =============================================================================

/// Byte range and first line of a node in its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    /// Span covering `self` through `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
        }
    }
}

/// Root node: one parsed source file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub body: Vec<Statement>,
    /// Path (or pseudo-path such as `-c`) the program was loaded from
    pub entry_point: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Var,
    Const,
}

/// Optional type annotation on a declaration or parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeAnnotation {
    Bool,
    Int,
    Float64,
    String,
    Array,
    Object,
}

impl TypeAnnotation {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float64" => Some(Self::Float64),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// STATEMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Statement {
    VariableDeclaration(VariableDeclaration),
    AssignmentExpression(AssignmentExpression),
    FunctionDeclaration(FunctionDeclaration),
    SourceDeclaration(SourceDeclaration),
    ShellExpression(ShellExpression),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    Return(ReturnStatement),
    Break(BreakStatement),
    Continue(ContinueStatement),
    Expression(ExpressionStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::VariableDeclaration(s) => s.span,
            Statement::AssignmentExpression(s) => s.span,
            Statement::FunctionDeclaration(s) => s.span,
            Statement::SourceDeclaration(s) => s.span,
            Statement::ShellExpression(s) => s.span,
            Statement::If(s) => s.span,
            Statement::While(s) => s.span,
            Statement::For(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::Break(s) => s.span,
            Statement::Continue(s) => s.span,
            Statement::Expression(s) => s.span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::VariableDeclaration(_) => "VariableDeclaration",
            Statement::AssignmentExpression(_) => "AssignmentExpression",
            Statement::FunctionDeclaration(_) => "FunctionDeclaration",
            Statement::SourceDeclaration(_) => "SourceDeclaration",
            Statement::ShellExpression(_) => "ShellExpression",
            Statement::If(_) => "If",
            Statement::While(_) => "While",
            Statement::For(_) => "For",
            Statement::Return(_) => "Return",
            Statement::Break(_) => "Break",
            Statement::Continue(_) => "Continue",
            Statement::Expression(_) => "Expression",
        }
    }
}

/// `var name[: type] = init` or `const ...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub span: Span,
    pub kind: DeclarationKind,
    pub name: Identifier,
    pub type_annotation: Option<TypeAnnotation>,
    pub init: Expression,
}

/// `name = expression`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentExpression {
    pub span: Span,
    pub identifier: Identifier,
    pub expression: Expression,
}

/// Named declaration or anonymous function literal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub span: Span,
    pub name: Option<Identifier>,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
}

impl FunctionDeclaration {
    pub fn name_str(&self) -> &str {
        self.name.as_ref().map_or("<anonymous>", |n| n.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: Identifier,
    pub type_annotation: Option<TypeAnnotation>,
}

/// `source a.gosh b.gosh`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDeclaration {
    pub span: Span,
    pub sources: Vec<String>,
}

/// `echo ...` / `sleep ...`: the whole line is handed to the OS shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellExpression {
    pub span: Span,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfStatement {
    pub span: Span,
    pub condition: Expression,
    pub consequent: Vec<Statement>,
    /// `else { ... }`; an `else if` is a single nested `If` statement
    pub alternate: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhileStatement {
    pub span: Span,
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForStatement {
    pub span: Span,
    pub binding: Identifier,
    pub iterable: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStatement {
    pub span: Span,
    pub argument: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakStatement {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinueStatement {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionStatement {
    pub span: Span,
    pub expression: Expression,
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Expression {
    NumberLiteral(NumberLiteral),
    StringLiteral(StringLiteral),
    BooleanLiteral(BooleanLiteral),
    Identifier(Identifier),
    MemberExpression(MemberExpression),
    CallExpression(CallExpression),
    SubShell(SubShell),
    BinaryExpression(BinaryExpression),
    ArrayExpression(ArrayExpression),
    ObjectExpression(ObjectExpression),
    FunctionExpression(FunctionDeclaration),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::NumberLiteral(e) => e.span,
            Expression::StringLiteral(e) => e.span,
            Expression::BooleanLiteral(e) => e.span,
            Expression::Identifier(e) => e.span,
            Expression::MemberExpression(e) => e.span,
            Expression::CallExpression(e) => e.span,
            Expression::SubShell(e) => e.span,
            Expression::BinaryExpression(e) => e.span,
            Expression::ArrayExpression(e) => e.span,
            Expression::ObjectExpression(e) => e.span,
            Expression::FunctionExpression(e) => e.span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }
}

/// Numeric payload of a number literal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberLiteral {
    pub span: Span,
    pub raw: String,
    pub value: Number,
}

/// A quoted string, or a backtick template when `template` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringLiteral {
    pub span: Span,
    /// Text between the quotes
    pub value: String,
    pub template: Option<Vec<TemplatePart>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TemplatePart {
    Text { value: String },
    Expression { expression: Expression },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanLiteral {
    pub span: Span,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identifier {
    pub span: Span,
    pub name: String,
}

/// `object.property` or `object[property]` (computed)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberExpression {
    pub span: Span,
    pub object: Box<Expression>,
    pub property: Box<Expression>,
    pub computed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallExpression {
    pub span: Span,
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
}

/// `$( command )`; `command` is the text between the parentheses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubShell {
    pub span: Span,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryExpression {
    pub span: Span,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub operator: BinaryOperator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayExpression {
    pub span: Span,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectExpression {
    pub span: Span,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: String,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "||" => Some(Self::Or),
            "&&" => Some(Self::And),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::LtEq),
            ">=" => Some(Self::GtEq),
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    /// Higher binds tighter. Every operator is left-associative.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::NotEq => 3,
            Self::Lt | Self::Gt | Self::LtEq | Self::GtEq => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div => 6,
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SOURCE RENDERING
// =============================================================================

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, body: &[Statement]) -> fmt::Result {
    if body.is_empty() {
        return f.write_str("{}");
    }
    f.write_str("{\n")?;
    for stmt in body {
        writeln!(f, "{}", stmt)?;
    }
    f.write_str("}")
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if s.contains('"') {
        write!(f, "'{}'", s)
    } else {
        write!(f, "\"{}\"", s)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_annotation {
            Some(t) => write!(f, "{}: {}", self.name.name, t),
            None => f.write_str(&self.name.name),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_word_text(&self.key) {
            f.write_str(&self.key)?;
        } else {
            write_quoted(f, &self.key)?;
        }
        write!(f, ": {}", self.value)
    }
}

impl fmt::Display for FunctionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func")?;
        if let Some(name) = &self.name {
            write!(f, " {}", name.name)?;
        }
        f.write_str("(")?;
        write_joined(f, &self.parameters, ", ")?;
        f.write_str(") ")?;
        write_block(f, &self.body)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::NumberLiteral(n) => f.write_str(&n.raw),
            Expression::StringLiteral(s) => match s.template {
                Some(_) => write!(f, "`{}`", s.value),
                None => write_quoted(f, &s.value),
            },
            Expression::BooleanLiteral(b) => write!(f, "{}", b.value),
            Expression::Identifier(id) => f.write_str(&id.name),
            Expression::MemberExpression(m) => {
                if m.computed {
                    write!(f, "{}[{}]", m.object, m.property)
                } else {
                    write!(f, "{}.{}", m.object, m.property)
                }
            }
            Expression::CallExpression(c) => {
                write!(f, "{}(", c.callee)?;
                write_joined(f, &c.arguments, ", ")?;
                f.write_str(")")
            }
            Expression::SubShell(s) => write!(f, "$({})", s.command),
            Expression::BinaryExpression(b) => write!(f, "({} {} {})", b.left, b.operator, b.right),
            Expression::ArrayExpression(a) => {
                f.write_str("[")?;
                write_joined(f, &a.elements, ", ")?;
                f.write_str("]")
            }
            Expression::ObjectExpression(o) => {
                f.write_str("{")?;
                write_joined(f, &o.properties, ", ")?;
                f.write_str("}")
            }
            Expression::FunctionExpression(func) => write!(f, "{}", func),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::VariableDeclaration(d) => {
                let keyword = match d.kind {
                    DeclarationKind::Var => "var",
                    DeclarationKind::Const => "const",
                };
                write!(f, "{} {}", keyword, d.name.name)?;
                if let Some(t) = d.type_annotation {
                    write!(f, ": {}", t)?;
                }
                write!(f, " = {}", d.init)
            }
            Statement::AssignmentExpression(a) => write!(f, "{} = {}", a.identifier.name, a.expression),
            Statement::FunctionDeclaration(func) => write!(f, "{}", func),
            Statement::SourceDeclaration(s) => write!(f, "source {}", s.sources.join(" ")),
            Statement::ShellExpression(s) => f.write_str(&s.command),
            Statement::If(i) => {
                write!(f, "if {} ", i.condition)?;
                write_block(f, &i.consequent)?;
                match i.alternate.as_deref() {
                    Some([nested @ Statement::If(_)]) => write!(f, " else {}", nested),
                    Some(alternate) => {
                        f.write_str(" else ")?;
                        write_block(f, alternate)
                    }
                    None => Ok(()),
                }
            }
            Statement::While(w) => {
                write!(f, "while {} ", w.condition)?;
                write_block(f, &w.body)
            }
            Statement::For(l) => {
                write!(f, "for {} in {} ", l.binding.name, l.iterable)?;
                write_block(f, &l.body)
            }
            Statement::Return(r) => match &r.argument {
                Some(arg) => write!(f, "return {}", arg),
                None => f.write_str("return"),
            },
            Statement::Break(_) => f.write_str("break"),
            Statement::Continue(_) => f.write_str("continue"),
            Statement::Expression(e) => write!(f, "{}", e.expression),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expression {
        Expression::Identifier(Identifier {
            span: Span::default(),
            name: name.to_string(),
        })
    }

    fn num(raw: &str, value: i64) -> Expression {
        Expression::NumberLiteral(NumberLiteral {
            span: Span::default(),
            raw: raw.to_string(),
            value: Number::Int(value),
        })
    }

    #[test]
    fn test_precedence_table() {
        assert!(BinaryOperator::Mul.precedence() > BinaryOperator::Add.precedence());
        assert!(BinaryOperator::Add.precedence() > BinaryOperator::Lt.precedence());
        assert!(BinaryOperator::Lt.precedence() > BinaryOperator::Eq.precedence());
        assert!(BinaryOperator::Eq.precedence() > BinaryOperator::And.precedence());
        assert!(BinaryOperator::And.precedence() > BinaryOperator::Or.precedence());
        assert_eq!(BinaryOperator::from_symbol("<="), Some(BinaryOperator::LtEq));
        assert_eq!(BinaryOperator::from_symbol("="), None);
    }

    #[test]
    fn test_display_binary_is_parenthesized() {
        let expr = Expression::BinaryExpression(BinaryExpression {
            span: Span::default(),
            left: Box::new(num("1", 1)),
            right: Box::new(Expression::BinaryExpression(BinaryExpression {
                span: Span::default(),
                left: Box::new(ident("a")),
                right: Box::new(num("2", 2)),
                operator: BinaryOperator::Mul,
            })),
            operator: BinaryOperator::Add,
        });
        assert_eq!(expr.to_string(), "(1 + (a * 2))");
    }

    #[test]
    fn test_display_object_keys() {
        let expr = Expression::ObjectExpression(ObjectExpression {
            span: Span::default(),
            properties: vec![
                Property { key: "name".into(), value: num("1", 1) },
                Property { key: "two words".into(), value: ident("x") },
            ],
        });
        assert_eq!(expr.to_string(), "{name: 1, \"two words\": x}");
    }

    #[test]
    fn test_display_string_quote_choice() {
        let plain = Expression::StringLiteral(StringLiteral {
            span: Span::default(),
            value: "hi".into(),
            template: None,
        });
        let quoted = Expression::StringLiteral(StringLiteral {
            span: Span::default(),
            value: "say \"hi\"".into(),
            template: None,
        });
        assert_eq!(plain.to_string(), "\"hi\"");
        assert_eq!(quoted.to_string(), "'say \"hi\"'");
    }

    #[test]
    fn test_serialize_tags_variants() {
        let stmt = Statement::Break(BreakStatement { span: Span::new(0, 5, 1) });
        let json = serde_json::to_value(&stmt).unwrap();
        assert_eq!(json["type"], "Break");
        assert_eq!(json["span"]["end"], 5);

        let op = serde_json::to_value(BinaryOperator::NotEq).unwrap();
        assert_eq!(op, "!=");
    }

    #[test]
    fn test_span_to() {
        let a = Span::new(2, 4, 1);
        let b = Span::new(8, 12, 2);
        assert_eq!(a.to(b), Span::new(2, 12, 1));
    }
}
