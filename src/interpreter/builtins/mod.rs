//! Builtin Statements
//!
//! Statements executed by the interpreter itself rather than evaluated as
//! expressions: `source` inclusion and lines handed to the OS shell.

pub mod shell_cmd;
pub mod source_cmd;
