use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::{write_artifact, ArtifactCache, CacheError};

/// Artifacts named after the hash of their input: `<dir>/<sha256>.<extension>`.
#[derive(Debug, Clone)]
pub struct ContentHashCache {
    dir: PathBuf,
    extension: String,
}

impl ContentHashCache {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        ContentHashCache {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Hex SHA-256 of `input`.
    pub fn key_for(input: &str) -> String {
        hex::encode(Sha256::digest(input.as_bytes()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", self.extension))
    }
}

impl ArtifactCache for ContentHashCache {
    type Key = str;

    fn lookup(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.artifact_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&path).map_err(|source| CacheError::Read { path, source })?;
        tracing::debug!(key, "content-hash cache hit");
        Ok(Some(contents.trim_start().to_string()))
    }

    fn store(&self, key: &str, payload: &str) -> Result<(), CacheError> {
        write_artifact(self.artifact_path(key), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_hex_sha256() {
        let key = ContentHashCache::key_for("a");
        assert_eq!(key.len(), 64);
        assert_eq!(
            key,
            "ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb"
        );
    }

    #[test]
    fn test_store_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentHashCache::new(dir.path().join("nested"), "css");
        let key = ContentHashCache::key_for("a\n  :color red");
        assert_eq!(cache.lookup(&key).unwrap(), None);
        cache.store(&key, "\n a { color: red; }\n").unwrap();
        assert_eq!(
            cache.lookup(&key).unwrap().as_deref(),
            Some("a { color: red; }\n")
        );
        assert!(cache.artifact_path(&key).ends_with(format!("{key}.css")));
    }

    #[test]
    fn test_store_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let cache = ContentHashCache::new(blocker.join("sub"), "css");
        let err = cache.store("k", "x").unwrap_err();
        assert!(matches!(err, CacheError::Write { .. }));
    }
}
