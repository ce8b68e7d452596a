//! Real File System
//!
//! `FileSystem` backed by `std::fs`.

use std::io::ErrorKind;
use std::path::Path;

use super::types::{FileSystem, FsError};

#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_file(&self, path: &str) -> Result<String, FsError> {
        let operation = "open".to_string();
        if Path::new(path).is_dir() {
            return Err(FsError::IsDirectory {
                path: path.to_string(),
                operation,
            });
        }
        std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FsError::NotFound {
                path: path.to_string(),
                operation,
            },
            ErrorKind::InvalidData => FsError::InvalidData {
                path: path.to_string(),
                operation,
            },
            _ => FsError::Io {
                path: path.to_string(),
                operation,
                message: e.to_string(),
            },
        })
    }

    fn resolve_path(&self, base: &str, path: &str) -> String {
        let path = Path::new(path);
        if path.is_absolute() || base.is_empty() {
            return path.to_string_lossy().into_owned();
        }
        Path::new(base).join(path).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file() {
        let fs = RealFs::new();
        let err = fs.read_file("/definitely/not/here.gosh").unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
        assert_eq!(err.path(), "/definitely/not/here.gosh");
    }

    #[test]
    fn test_read_existing_file() {
        let path = std::env::temp_dir().join(format!("gosh-real-fs-{}.gosh", std::process::id()));
        std::fs::write(&path, "var x = 1\n").unwrap();
        let text = RealFs::new().read_file(&path.to_string_lossy()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(text, "var x = 1\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_path() {
        let fs = RealFs::new();
        assert_eq!(fs.resolve_path("/scripts", "lib.gosh"), "/scripts/lib.gosh");
        assert_eq!(fs.resolve_path("/scripts", "/abs/lib.gosh"), "/abs/lib.gosh");
        assert_eq!(fs.resolve_path("", "lib.gosh"), "lib.gosh");
    }
}
