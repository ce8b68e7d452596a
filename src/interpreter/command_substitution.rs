//! Command Substitution
//!
//! Bridge between the interpreter and the OS shell. `$( ... )` subshells and
//! `echo`/`sleep` lines are interpolated against the current bindings and
//! handed to a `CommandRunner`. The OS implementation runs `sh -c` on a
//! current-thread tokio runtime and blocks until the child exits.

use std::process::Stdio;
use std::time::Duration;

use regex_lite::Regex;
use thiserror::Error;
use tokio::process::Command;

use crate::interpreter::types::Value;

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    /// Exit code; `None` when the process was terminated by a signal
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            status: Some(0),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` timed out after {}s", .timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },
    #[error("failed to start command runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Command execution interface.
///
/// Implemented by the OS shell runner and by test doubles.
pub trait CommandRunner {
    /// Run `command` to completion and capture its standard output.
    fn run(&self, command: &str) -> Result<CommandOutput, CommandError>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
    timeout: Option<Duration>,
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_async(&self, command: &str) -> Result<CommandOutput, CommandError> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let spawn_error = |source| CommandError::Spawn {
            command: command.to_string(),
            source,
        };

        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, cmd.output()).await {
                Ok(result) => result.map_err(spawn_error)?,
                // Dropping the future kills the child.
                Err(_) => {
                    return Err(CommandError::Timeout {
                        command: command.to_string(),
                        timeout,
                    })
                }
            },
            None => cmd.output().await.map_err(spawn_error)?,
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            status: output.status.code(),
        })
    }
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ShellCommandRunner {
    fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CommandError::Runtime)?;
        rt.block_on(self.run_async(command))
    }
}

lazy_static::lazy_static! {
    static ref VARIABLE_REFERENCE: Regex =
        Regex::new(r"^\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .unwrap_or_else(|e| panic!("invalid variable reference pattern: {}", e));
}

/// Replace `$name` and `${name}` with bound values.
///
/// Names `lookup` does not know are left in place for the OS shell to expand.
/// Nothing inside single quotes is touched.
pub fn interpolate_command<F>(command: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<Value>,
{
    let mut out = String::with_capacity(command.len());
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;

    while i < command.len() {
        let rest = &command[i..];
        let c = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };

        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '$' if !in_single => {
                if let Some(caps) = VARIABLE_REFERENCE.captures(rest) {
                    let whole = caps.get(0).map_or("", |m| m.as_str());
                    let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                    match lookup(name) {
                        Some(value) => out.push_str(&value.to_text()),
                        None => out.push_str(whole),
                    }
                    i += whole.len();
                    continue;
                }
            }
            _ => {}
        }

        out.push(c);
        i += c.len_utf8();
    }
    out
}

/// Drop exactly one trailing newline (`\n` or `\r\n`).
pub fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::Str("world".into())),
            "n" => Some(Value::Int(3)),
            _ => None,
        }
    }

    #[test]
    fn test_interpolate_bound_names() {
        assert_eq!(interpolate_command("echo hello $name", lookup), "echo hello world");
        assert_eq!(interpolate_command("echo ${n}rd", lookup), "echo 3rd");
        assert_eq!(interpolate_command("echo \"$name\"", lookup), "echo \"world\"");
    }

    #[test]
    fn test_interpolate_leaves_unbound_and_quoted() {
        assert_eq!(interpolate_command("echo $HOME", lookup), "echo $HOME");
        assert_eq!(interpolate_command("echo '$name'", lookup), "echo '$name'");
        assert_eq!(interpolate_command("echo \"it's $n\"", lookup), "echo \"it's 3\"");
        assert_eq!(interpolate_command("echo $ $1", lookup), "echo $ $1");
    }

    #[test]
    fn test_strip_trailing_newline() {
        assert_eq!(strip_trailing_newline("a\n".into()), "a");
        assert_eq!(strip_trailing_newline("a\n\n".into()), "a\n");
        assert_eq!(strip_trailing_newline("a\r\n".into()), "a");
        assert_eq!(strip_trailing_newline("a".into()), "a");
        assert_eq!(strip_trailing_newline(String::new()), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_captures_stdout() {
        let output = ShellCommandRunner::new().run("printf 'x\\ny\\n'").unwrap();
        assert_eq!(output.stdout, "x\ny\n");
        assert_eq!(output.status, Some(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_reports_exit_status() {
        let output = ShellCommandRunner::new().run("exit 3").unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout, "");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_timeout() {
        let runner = ShellCommandRunner::new().with_timeout(Some(Duration::from_millis(100)));
        let err = runner.run("sleep 5").unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }
}
