//! Symbol Table and Scope Resolution
//!
//! Bindings live in a stack of frames. The first frame is the global one and
//! can never be popped; calls and blocks push a frame on entry and pop it on
//! exit. Lookup walks from the innermost frame outward, so a frame pushed by
//! a call can see every binding of the frames below it.

use std::collections::HashMap;

use crate::ast::types::TypeAnnotation;
use crate::interpreter::errors::{InterpreterError, RuntimeError, UnresolvedIdentifierError};
use crate::interpreter::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Constant,
    Function,
}

/// A single binding.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub kind: SymbolKind,
    pub value: Value,
    /// Line of the declaration
    pub line: usize,
    /// Declared type, checked again on assignment
    pub type_annotation: Option<TypeAnnotation>,
}

impl SymbolInfo {
    pub fn new(kind: SymbolKind, value: Value, line: usize) -> Self {
        Self {
            kind,
            value,
            line,
            type_annotation: None,
        }
    }

    pub fn with_type(mut self, annotation: Option<TypeAnnotation>) -> Self {
        self.type_annotation = annotation;
        self
    }
}

/// Stack of name → symbol frames. The last element is the innermost frame.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    frames: Vec<HashMap<String, SymbolInfo>>,
}

impl SymbolTable {
    /// Create a table holding only the global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pop the innermost frame.
    ///
    /// Panics if attempting to pop the global frame.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        } else {
            panic!("cannot pop the global scope frame");
        }
    }

    /// Bind `name` in the innermost frame, replacing any binding there.
    pub fn insert(&mut self, name: impl Into<String>, info: SymbolInfo) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), info);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Look a name up from the innermost frame outward.
    pub fn resolve(&self, name: &str, line: usize) -> Result<&SymbolInfo, UnresolvedIdentifierError> {
        self.lookup(name).ok_or_else(|| UnresolvedIdentifierError::new(name, line))
    }

    /// Rebind an existing variable in the frame that owns it.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), InterpreterError> {
        let info = self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
            .ok_or_else(|| UnresolvedIdentifierError::new(name, line))?;

        match info.kind {
            SymbolKind::Constant => {
                return Err(RuntimeError::new(format!("cannot assign to constant `{}`", name), line).into());
            }
            SymbolKind::Function => {
                return Err(RuntimeError::new(format!("cannot assign to function `{}`", name), line).into());
            }
            SymbolKind::Variable => {}
        }

        if let Some(annotation) = info.type_annotation {
            if !value.matches_type(annotation) {
                return Err(RuntimeError::new(
                    format!(
                        "cannot assign {} to `{}` declared as {}",
                        value.type_name(),
                        name,
                        annotation
                    ),
                    line,
                )
                .into());
            }
        }

        info.value = value;
        Ok(())
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
