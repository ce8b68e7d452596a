//! File System Types
//!
//! The file system interface used to load `source`d scripts.

use thiserror::Error;

/// File system errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FsError {
    #[error("ENOENT: no such file or directory, {operation} '{path}'")]
    NotFound { path: String, operation: String },

    #[error("EISDIR: illegal operation on a directory, {operation} '{path}'")]
    IsDirectory { path: String, operation: String },

    #[error("EILSEQ: file is not valid UTF-8, {operation} '{path}'")]
    InvalidData { path: String, operation: String },

    #[error("{operation} '{path}': {message}")]
    Io {
        path: String,
        operation: String,
        message: String,
    },
}

impl FsError {
    pub fn path(&self) -> &str {
        match self {
            FsError::NotFound { path, .. }
            | FsError::IsDirectory { path, .. }
            | FsError::InvalidData { path, .. }
            | FsError::Io { path, .. } => path,
        }
    }
}

/// File system interface.
///
/// Implemented by the real file system and by `InMemoryFs` for tests and
/// embedding.
pub trait FileSystem {
    /// Read a whole file as UTF-8 text.
    fn read_file(&self, path: &str) -> Result<String, FsError>;

    /// Resolve `path` against the directory `base`. Absolute paths are
    /// returned as they are.
    fn resolve_path(&self, base: &str, path: &str) -> String;
}
