//! File System Module
//!
//! File system abstraction used to load `source`d scripts.
//! Implementations:
//! - RealFs: the host file system
//! - InMemoryFs: pure in-memory file map

pub mod types;
pub mod real_fs;
pub mod in_memory_fs;

pub use types::*;
pub use real_fs::RealFs;
pub use in_memory_fs::InMemoryFs;
