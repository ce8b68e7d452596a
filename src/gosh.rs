//! Gosh Environment
//!
//! Main entry point for running gosh scripts.
//! Ties together the parser, the interpreter, the file system used by
//! `source` and the runner used for shell commands.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fs::{FileSystem, RealFs};
use crate::interpreter::{
    CommandRunner, ExecResult, ExecutionLimits, Interpreter, InterpreterContext, InterpreterError, ShellCommandRunner,
    StackEntry,
};
use crate::parser::parse;

/// Options for creating a Gosh environment.
#[derive(Default)]
pub struct GoshOptions {
    /// File system used by `source` (defaults to RealFs)
    pub fs: Option<Box<dyn FileSystem>>,
    /// Runner for subshells and shell lines (defaults to `sh -c`)
    pub runner: Option<Box<dyn CommandRunner>>,
    /// Execution limits
    pub limits: Option<ExecutionLimits>,
    /// Directory `source` paths are resolved against. Defaults to the
    /// directory of the entry point.
    pub base_dir: Option<PathBuf>,
}

/// A failed run: the error plus where it happened.
#[derive(Debug, Clone, Error)]
#[error("{file}: {error}")]
pub struct GoshError {
    pub error: InterpreterError,
    /// File the error was raised in
    pub file: String,
    /// Active calls when the error was raised, outermost first
    pub stack: Vec<StackEntry>,
}

impl GoshError {
    pub fn exit_code(&self) -> i32 {
        match self.error {
            InterpreterError::Syntax(_) => 2,
            _ => 1,
        }
    }

    /// Diagnostic text: the error followed by the call stack, innermost
    /// call first.
    pub fn render(&self) -> String {
        let mut out = format!("{}: {}: {}\n", self.file, self.error.kind_name(), self.error);
        for entry in self.stack.iter().rev() {
            let _ = writeln!(out, "    at {} ({}:{})", entry.function, entry.file, entry.line);
        }
        out
    }
}

/// The gosh script environment.
pub struct Gosh {
    fs: Box<dyn FileSystem>,
    runner: Box<dyn CommandRunner>,
    limits: ExecutionLimits,
    base_dir: Option<PathBuf>,
}

impl Gosh {
    pub fn new(options: GoshOptions) -> Self {
        let limits = options.limits.unwrap_or_default();
        let runner = options
            .runner
            .unwrap_or_else(|| Box::new(ShellCommandRunner::new().with_timeout(limits.command_timeout)));
        Self {
            fs: options.fs.unwrap_or_else(|| Box::new(RealFs::new())),
            runner,
            limits,
            base_dir: options.base_dir,
        }
    }

    /// Parse and run `script`, writing shell output to `out`.
    ///
    /// `entry_point` names the script in diagnostics and anchors relative
    /// `source` paths.
    pub fn run(&self, script: &str, entry_point: &str, out: &mut dyn Write) -> Result<(), GoshError> {
        let program = parse(script, entry_point).map_err(|e| GoshError {
            error: e.into(),
            file: entry_point.to_string(),
            stack: Vec::new(),
        })?;
        tracing::debug!(entry_point, statements = program.body.len(), "run");

        let ctx = InterpreterContext {
            limits: &self.limits,
            fs: self.fs.as_ref(),
            runner: self.runner.as_ref(),
            out,
            base_dir: self.base_dir_for(entry_point),
        };
        let mut interpreter = Interpreter::new(ctx);
        interpreter.interpret(&program).map_err(|error| {
            let state = &mut interpreter.state;
            GoshError {
                error,
                file: state.error_file.take().unwrap_or_else(|| entry_point.to_string()),
                stack: state.error_trace.take().unwrap_or_default(),
            }
        })
    }

    /// Run `script` and collect its output, diagnostics and exit code.
    pub fn exec(&self, script: &str, entry_point: &str) -> ExecResult {
        let mut stdout = Vec::new();
        let result = self.run(script, entry_point, &mut stdout);
        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        match result {
            Ok(()) => ExecResult::ok(stdout),
            Err(e) => ExecResult::failure(stdout, e.render(), e.exit_code()),
        }
    }

    fn base_dir_for(&self, entry_point: &str) -> String {
        let dir = match &self.base_dir {
            Some(dir) => dir.as_path(),
            None => Path::new(entry_point).parent().unwrap_or_else(|| Path::new("")),
        };
        match dir.to_str() {
            Some("") | None => ".".to_string(),
            Some(dir) => dir.to_string(),
        }
    }
}

impl Default for Gosh {
    fn default() -> Self {
        Self::new(GoshOptions::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
