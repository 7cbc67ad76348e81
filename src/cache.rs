//! Artifact caches
//!
//!     Compiled output is written to disk so unchanged sources skip compilation. Two
//!     strategies share the [ArtifactCache] interface:
//!
//!     - [ContentHashCache] keys artifacts by a SHA-256 of the input, so any byte-identical
//!       input hits no matter where it came from. The stylesheet compiler uses it.
//!     - [TimestampCache] mirrors source files into a cache directory and trusts an artifact
//!       only while it is newer than its source. The markup compiler uses it.
//!
//!     Both are write-through: a miss is followed by a store, and store failures surface
//!     to the caller instead of being swallowed.

mod content_hash;
mod timestamp;

use std::path::PathBuf;
use thiserror::Error;

pub use content_hash::ContentHashCache;
pub use timestamp::TimestampCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read cached artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write cached artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to inspect {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A store of compiled artifacts.
pub trait ArtifactCache {
    type Key: ?Sized;

    /// Return the artifact for `key` when present and still valid.
    fn lookup(&self, key: &Self::Key) -> Result<Option<String>, CacheError>;

    /// Write the artifact for `key`, creating directories as needed.
    fn store(&self, key: &Self::Key, payload: &str) -> Result<(), CacheError>;
}

pub(crate) fn write_artifact(path: PathBuf, payload: &str) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| CacheError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&path, payload).map_err(|source| CacheError::Write { path, source })
}
