//! Testing utilities
//!
//!     Helpers shared by the unit tests and the integration tests under `tests/`.
//!
//!     Cache behavior is only observable through side effects, so the compilers accept a
//!     hook that fires whenever a source is actually parsed into a tree. [BuildCounter]
//!     counts those calls: a cache hit leaves the count unchanged.
//!
//!     ```rust,ignore
//!     let counter = BuildCounter::new();
//!     let compiler = StylesheetCompiler::new(config).on_tree_built(counter.hook());
//!     compiler.compile(source, &[])?;
//!     compiler.compile(source, &[])?;
//!     assert_eq!(counter.count(), 1);
//!     ```
//!
//!     Timestamp caches compare modification times, and writes in quick succession can land
//!     in the same clock tick. Tests move mtimes explicitly with [set_modified] instead of
//!     sleeping.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::tree::TreeBuiltHook;

/// Counts tree builds through a [TreeBuiltHook].
#[derive(Debug, Clone, Default)]
pub struct BuildCounter {
    count: Arc<AtomicUsize>,
}

impl BuildCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self) -> TreeBuiltHook {
        let count = Arc::clone(&self.count);
        Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Set the modification time of `path`.
pub fn set_modified(path: &Path, time: SystemTime) -> std::io::Result<()> {
    std::fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(time)
}
