//! Shell lines and subshells
//!
//! `echo`/`sleep` lines and `$( ... )` commands run through the configured
//! `CommandRunner` after `$name` references are replaced with bound values.

use crate::ast::types::ShellExpression;
use crate::interpreter::command_substitution::interpolate_command;
use crate::interpreter::errors::{InterpreterError, RuntimeError};
use crate::interpreter::interpreter::Interpreter;

impl<'a> Interpreter<'a> {
    /// Interpolate and run `command`, returning its captured stdout.
    ///
    /// A non-zero exit status is logged, not raised; the script decides what
    /// to do with the output.
    pub(crate) fn run_command(&mut self, command: &str, line: usize) -> Result<String, InterpreterError> {
        let symbols = &self.state.symbols;
        let command = interpolate_command(command, |name| symbols.lookup(name).map(|info| info.value.clone()));
        let output = self
            .ctx
            .runner
            .run(&command)
            .map_err(|e| RuntimeError::new(e.to_string(), line))?;

        tracing::debug!(%command, line, status = ?output.status, "command finished");
        match output.status {
            Some(0) => {}
            Some(code) => tracing::warn!(%command, code, line, "command exited with non-zero status"),
            None => tracing::warn!(%command, line, "command terminated by signal"),
        }
        Ok(output.stdout)
    }

    /// Run a shell line and print what it wrote.
    pub(crate) fn execute_shell(&mut self, shell: &ShellExpression) -> Result<(), InterpreterError> {
        let line = shell.span.line;
        let stdout = self.run_command(&shell.command, line)?;
        self.write_output(&stdout, line)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::command_substitution::{CommandError, CommandOutput, CommandRunner};
    use crate::interpreter::errors::InterpreterError;
    use crate::interpreter::testing::{run_script, TestRun};
    use pretty_assertions::assert_eq;

    struct FailingRunner;

    impl CommandRunner for FailingRunner {
        fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
            Err(CommandError::Spawn {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no shell"),
            })
        }
    }

    #[test]
    fn test_echo_line_is_printed() {
        let run = run_script("var who = \"world\"\necho hello $who\necho '$who'");
        run.result.as_ref().unwrap();
        assert_eq!(run.commands, vec!["echo hello world", "echo '$who'"]);
        assert_eq!(run.output, "hello world\n'$who'\n");
    }

    #[test]
    fn test_braced_reference_inside_blocks() {
        let run = run_script("var x = \"hi\"\nfunc f() {\n  echo ${x}!\n}\nf()\nif true { echo ${x} }");
        run.result.as_ref().unwrap();
        assert_eq!(run.commands, vec!["echo hi!", "echo hi"]);
        assert_eq!(run.output, "hi!\nhi\n");
    }

    #[test]
    fn test_sleep_line_runs_through_shell() {
        let run = run_script("var n = 0\nsleep $n");
        run.result.as_ref().unwrap();
        assert_eq!(run.commands, vec!["sleep 0"]);
        assert_eq!(run.output, "");
    }

    #[test]
    fn test_runner_failure_is_runtime_error() {
        let run = TestRun::new("var a = 1\necho hi").runner(FailingRunner).run();
        let err = run.result.unwrap_err();
        assert!(matches!(err, InterpreterError::Runtime(_)));
        assert_eq!(err.to_string(), "line 2: failed to run `echo hi`: no shell");
    }
}
