//! In-Memory File System
//!
//! A `FileSystem` holding files in a map keyed by normalized absolute path.
//! Used by tests and by embedders that want `source` without touching disk.

use std::collections::HashMap;

use super::types::{FileSystem, FsError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryFs {
    files: HashMap<String, String>,
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial files.
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<String>,
    {
        let mut fs = Self::new();
        for (path, content) in files {
            fs.write_file(path.as_ref(), content);
        }
        fs
    }

    pub fn write_file(&mut self, path: &str, content: impl Into<String>) {
        self.files.insert(normalize_path(path), content.into());
    }

    fn is_directory(&self, normalized: &str) -> bool {
        let prefix = if normalized == "/" {
            "/".to_string()
        } else {
            format!("{}/", normalized)
        };
        self.files.keys().any(|k| k.starts_with(&prefix))
    }
}

impl FileSystem for InMemoryFs {
    fn read_file(&self, path: &str) -> Result<String, FsError> {
        let normalized = normalize_path(path);
        if let Some(content) = self.files.get(&normalized) {
            return Ok(content.clone());
        }
        let operation = "open".to_string();
        if self.is_directory(&normalized) {
            return Err(FsError::IsDirectory {
                path: path.to_string(),
                operation,
            });
        }
        Err(FsError::NotFound {
            path: path.to_string(),
            operation,
        })
    }

    fn resolve_path(&self, base: &str, path: &str) -> String {
        if path.starts_with('/') {
            return normalize_path(path);
        }
        normalize_path(&format!("{}/{}", base, path))
    }
}

// ============================================================================
// Path utilities
// ============================================================================

/// Lexically normalize a path: make it absolute, drop `.` and empty
/// segments, and apply `..`.
fn normalize_path(path: &str) -> String {
    let mut resolved: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                resolved.pop();
            }
            _ => resolved.push(part),
        }
    }
    if resolved.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", resolved.join("/"))
    }
}
