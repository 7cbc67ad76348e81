use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::{write_artifact, ArtifactCache, CacheError, ContentHashCache};

/// Hex digits of the directory hash that prefixes artifact paths.
const TAG_LEN: usize = 16;

/// Artifacts mirrored from a source tree, valid while newer than their source.
///
/// `<source_root>/pages/home.haml` maps to `<cache_root>/<tag>/pages/home.<extension>`,
/// where `<tag>` hashes the canonical source root. A source outside the root is stored
/// under the tag of its own directory. Caches over different roots can share one
/// `cache_root` without reading each other's artifacts.
#[derive(Debug, Clone)]
pub struct TimestampCache {
    source_root: PathBuf,
    cache_root: PathBuf,
    extension: String,
}

impl TimestampCache {
    pub fn new(
        source_root: impl Into<PathBuf>,
        cache_root: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        TimestampCache {
            source_root: source_root.into(),
            cache_root: cache_root.into(),
            extension: extension.into(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Directory holding the artifacts of sources under the source root.
    pub fn artifact_dir(&self) -> PathBuf {
        self.cache_root
            .join(directory_tag(&canonical(&self.source_root)))
    }

    pub fn artifact_path(&self, source: &Path) -> PathBuf {
        let root = canonical(&self.source_root);
        let source = canonical(source);
        let (dir, relative) = match source.strip_prefix(&root) {
            Ok(relative) => (root.clone(), relative.to_path_buf()),
            Err(_) => (
                source.parent().map(Path::to_path_buf).unwrap_or_default(),
                source
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("template")),
            ),
        };
        self.cache_root
            .join(directory_tag(&dir))
            .join(relative)
            .with_extension(&self.extension)
    }

    /// Delete the artifacts of sources under the source root, returning how many were
    /// removed. Artifacts of other roots sharing the cache root are left alone.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let dir = self.artifact_dir();
        if !dir.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        let mut pending = vec![dir];
        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|source| CacheError::Metadata {
                path: dir.clone(),
                source,
            })?;
            for entry in entries {
                let path = entry
                    .map_err(|source| CacheError::Metadata {
                        path: dir.clone(),
                        source,
                    })?
                    .path();
                if path.is_dir() {
                    pending.push(path);
                } else if path.extension().and_then(|e| e.to_str())
                    == Some(self.extension.as_str())
                {
                    std::fs::remove_file(&path)
                        .map_err(|source| CacheError::Write { path, source })?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

/// Resolved form of `path`. Missing components are kept as written below the deepest
/// ancestor that exists.
fn canonical(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            canonical(parent).join(name)
        }
        _ => path.to_path_buf(),
    }
}

fn directory_tag(dir: &Path) -> String {
    let mut tag = ContentHashCache::key_for(&dir.to_string_lossy());
    tag.truncate(TAG_LEN);
    tag
}

fn modified(path: &Path) -> Result<SystemTime, CacheError> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| CacheError::Metadata {
            path: path.to_path_buf(),
            source,
        })
}

impl ArtifactCache for TimestampCache {
    type Key = Path;

    fn lookup(&self, source: &Path) -> Result<Option<String>, CacheError> {
        let artifact = self.artifact_path(source);
        if !artifact.is_file() {
            return Ok(None);
        }
        if modified(&artifact)? > modified(source)? {
            tracing::debug!(source = %source.display(), "timestamp cache hit");
            let contents = std::fs::read_to_string(&artifact).map_err(|source| {
                CacheError::Read {
                    path: artifact.clone(),
                    source,
                }
            })?;
            return Ok(Some(contents));
        }
        tracing::debug!(artifact = %artifact.display(), "stale artifact removed");
        std::fs::remove_file(&artifact).map_err(|source| CacheError::Write {
            path: artifact,
            source,
        })?;
        Ok(None)
    }

    fn store(&self, source: &Path, payload: &str) -> Result<(), CacheError> {
        write_artifact(self.artifact_path(source), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::set_modified;
    use std::time::Duration;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_artifact_mirrors_relative_path_under_root_tag() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        let source = root.join("pages").join("home.haml");
        touch(&source);

        let cache = TimestampCache::new(&root, dir.path().join("out"), "tpl");
        let expected = dir
            .path()
            .join("out")
            .join(directory_tag(&canonical(&root)))
            .join("pages")
            .join("home.tpl");
        assert_eq!(cache.artifact_path(&source), expected);
        assert!(cache.artifact_path(&source).starts_with(cache.artifact_dir()));
    }

    #[test]
    fn test_roots_sharing_a_cache_root_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a"), dir.path().join("b"));
        touch(&a.join("index.haml"));
        touch(&b.join("index.haml"));
        let out = dir.path().join("out");

        let first = TimestampCache::new(&a, &out, "tpl");
        let second = TimestampCache::new(&b, &out, "tpl");
        assert_ne!(
            first.artifact_path(&a.join("index.haml")),
            second.artifact_path(&b.join("index.haml"))
        );
    }

    #[test]
    fn test_sources_outside_root_are_keyed_by_their_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        let (x, y) = (dir.path().join("x").join("card.haml"), dir.path().join("y").join("card.haml"));
        touch(&root.join("card.haml"));
        touch(&x);
        touch(&y);

        let cache = TimestampCache::new(&root, dir.path().join("out"), "tpl");
        let inside = cache.artifact_path(&root.join("card.haml"));
        let (outside_x, outside_y) = (cache.artifact_path(&x), cache.artifact_path(&y));
        assert_ne!(outside_x, outside_y);
        assert_ne!(outside_x, inside);
        assert!(!outside_x.starts_with(cache.artifact_dir()));
        assert_eq!(outside_x.file_name().unwrap(), "card.tpl");
    }

    #[test]
    fn test_fresh_artifact_hits_and_stale_one_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src").join("page.haml");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, "%p hi").unwrap();
        let now = SystemTime::now();
        set_modified(&source, now - Duration::from_secs(60)).unwrap();

        let cache = TimestampCache::new(dir.path().join("src"), dir.path().join("cache"), "tpl");
        assert_eq!(cache.lookup(&source).unwrap(), None);
        cache.store(&source, "<p>hi</p>").unwrap();
        assert_eq!(cache.lookup(&source).unwrap().as_deref(), Some("<p>hi</p>"));

        set_modified(&source, now + Duration::from_secs(60)).unwrap();
        assert_eq!(cache.lookup(&source).unwrap(), None);
        assert!(!cache.artifact_path(&source).exists());
    }

    #[test]
    fn test_clear_removes_only_this_roots_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (dir.path().join("a"), dir.path().join("b"));
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        let out = dir.path().join("cache");
        let first = TimestampCache::new(&a, &out, "tpl");
        let second = TimestampCache::new(&b, &out, "tpl");

        first.store(&a.join("a.haml"), "a").unwrap();
        first.store(&a.join("nested/b.haml"), "b").unwrap();
        second.store(&b.join("c.haml"), "c").unwrap();

        assert_eq!(first.clear().unwrap(), 2);
        assert_eq!(first.clear().unwrap(), 0);
        assert!(second.artifact_path(&b.join("c.haml")).is_file());
        assert_eq!(second.clear().unwrap(), 1);
    }
}
