//! Test support: a scripted command runner and a builder that runs a source
//! string end to end against an in-memory file system.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::fs::{FileSystem, InMemoryFs};
use crate::interpreter::command_substitution::{CommandError, CommandOutput, CommandRunner};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::interpreter::{Interpreter, InterpreterContext};
use crate::interpreter::scope::SymbolTable;
use crate::interpreter::types::{ExecutionLimits, StackEntry, Value};
use crate::parser::parse;

pub(crate) const ENTRY_POINT: &str = "/scripts/main.gosh";
pub(crate) const BASE_DIR: &str = "/scripts";

/// Answers commands from a table instead of spawning processes.
///
/// Commands are matched by their first word. Unmatched `echo` lines print
/// their arguments; anything else prints nothing.
#[derive(Default)]
pub(crate) struct RecordingRunner {
    responses: HashMap<String, String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, program: &str, stdout: &str) -> Self {
        self.responses.insert(program.to_string(), stdout.to_string());
        self
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        let program = command.split_whitespace().next().unwrap_or("");
        if let Some(stdout) = self.responses.get(program) {
            return Ok(CommandOutput::success(stdout.clone()));
        }
        match command.strip_prefix("echo ") {
            Some(args) => Ok(CommandOutput::success(format!("{}\n", args))),
            None if command == "echo" => Ok(CommandOutput::success("\n")),
            None => Ok(CommandOutput::success("")),
        }
    }
}

/// Logs every command before passing it on.
struct CommandLog<'r> {
    inner: &'r dyn CommandRunner,
    commands: RefCell<Vec<String>>,
}

impl CommandRunner for CommandLog<'_> {
    fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        self.commands.borrow_mut().push(command.to_string());
        self.inner.run(command)
    }
}

pub(crate) struct TestRun {
    source: String,
    fs: Box<dyn FileSystem>,
    runner: Box<dyn CommandRunner>,
    limits: ExecutionLimits,
}

impl TestRun {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            fs: Box::new(InMemoryFs::new()),
            runner: Box::new(RecordingRunner::new()),
            limits: ExecutionLimits::default(),
        }
    }

    pub fn fs(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    pub fn runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn run(self) -> TestOutcome {
        let log = CommandLog {
            inner: self.runner.as_ref(),
            commands: RefCell::new(Vec::new()),
        };
        let mut out = Vec::new();

        let (result, state) = {
            let ctx = InterpreterContext {
                limits: &self.limits,
                fs: self.fs.as_ref(),
                runner: &log,
                out: &mut out,
                base_dir: BASE_DIR.to_string(),
            };
            let mut interpreter = Interpreter::new(ctx);
            let result = parse(&self.source, ENTRY_POINT)
                .map_err(InterpreterError::from)
                .and_then(|program| interpreter.interpret(&program));
            (result, interpreter.state)
        };

        TestOutcome {
            result,
            output: String::from_utf8(out).expect("output is UTF-8"),
            commands: log.commands.into_inner(),
            error_trace: state.error_trace,
            error_file: state.error_file,
            symbols: state.symbols,
        }
    }
}

pub(crate) struct TestOutcome {
    pub result: Result<(), InterpreterError>,
    pub output: String,
    pub commands: Vec<String>,
    pub error_trace: Option<Vec<StackEntry>>,
    pub error_file: Option<String>,
    symbols: SymbolTable,
}

impl TestOutcome {
    /// Value bound to `name` once the run finished.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.symbols.lookup(name).map(|info| info.value.clone())
    }
}

pub(crate) fn run_script(source: &str) -> TestOutcome {
    TestRun::new(source).run()
}
