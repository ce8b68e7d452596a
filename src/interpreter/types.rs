//! Interpreter Types
//!
//! Runtime values, execution results and limits.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use crate::ast::types::{FunctionDeclaration, Number, TypeAnnotation};

// ============================================================================
// Values
// ============================================================================

/// A dynamic value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Array(Vec<Value>),
    /// Keys keep insertion order
    Object(IndexMap<String, Value>),
    Function(Rc<FunctionValue>),
}

/// A function together with the file it was declared in.
#[derive(Debug, PartialEq)]
pub struct FunctionValue {
    pub declaration: FunctionDeclaration,
    pub file: String,
}

impl FunctionValue {
    pub fn name(&self) -> &str {
        self.declaration.name_str()
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float64",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "func",
        }
    }

    /// Numbers, strings and booleans.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Str(_) | Value::Bool(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Whether the value satisfies a type annotation. `float64` accepts ints.
    pub fn matches_type(&self, annotation: TypeAnnotation) -> bool {
        match annotation {
            TypeAnnotation::Bool => matches!(self, Value::Bool(_)),
            TypeAnnotation::Int => matches!(self, Value::Int(_)),
            TypeAnnotation::Float64 => matches!(self, Value::Int(_) | Value::Float(_)),
            TypeAnnotation::String => matches!(self, Value::Str(_)),
            TypeAnnotation::Array => matches!(self, Value::Array(_)),
            TypeAnnotation::Object => matches!(self, Value::Object(_)),
        }
    }

    /// Text spliced into shell commands and templates: strings unquoted,
    /// everything else in its display form.
    pub fn to_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(x) => Value::Float(x),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
            Value::Function(func) => write!(f, "func {}", func.name()),
        }
    }
}

// ============================================================================
// Results and limits
// ============================================================================

/// Outcome of running a whole script, as returned by `Gosh::exec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn new(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self { stdout, stderr, exit_code }
    }

    /// Success result with the given output
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::new(stdout.into(), String::new(), 0)
    }

    /// Failure result with stderr message and exit code
    pub fn failure(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self::new(stdout.into(), stderr.into(), exit_code)
    }
}

/// Execution limits configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionLimits {
    /// Maximum depth of nested function calls
    pub max_call_depth: usize,
    /// Maximum iterations of a single loop
    pub max_loop_iterations: u64,
    /// Maximum depth of nested `source` inclusion
    pub max_source_depth: usize,
    /// Kill external commands that run longer than this
    pub command_timeout: Option<Duration>,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            max_loop_iterations: 1_000_000,
            max_source_depth: 64,
            command_timeout: None,
        }
    }
}

/// One frame of the call stack, kept for error reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackEntry {
    pub function: String,
    /// Line of the call site
    pub line: usize,
    pub file: String,
}
