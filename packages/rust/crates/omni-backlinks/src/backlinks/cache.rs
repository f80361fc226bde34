//! Index Cache: the one installed snapshot, swapped wholesale.
//!
//! Readers clone an `Arc` under a short read lock and then work on an
//! immutable snapshot, so a concurrent `install` never tears a lookup.

use super::models::{BacklinkIndex, SourceExcerpts};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Holder of the current [`BacklinkIndex`] snapshot.
#[derive(Debug, Default)]
pub struct IndexCache {
    current: RwLock<Arc<BacklinkIndex>>,
    generation: AtomicU64,
}

impl IndexCache {
    /// Empty cache in the "not yet built" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<BacklinkIndex> {
        Arc::clone(&read_lock(&self.current))
    }

    /// Backlinks of `id` in the current snapshot; empty when absent or
    /// before the first build.
    #[must_use]
    pub fn get(&self, id: &str) -> SourceExcerpts {
        self.snapshot().get(id)
    }

    /// Replace the snapshot and return its generation (1 for the first build).
    pub fn install(&self, index: BacklinkIndex) -> u64 {
        let next = Arc::new(index);
        let mut current = write_lock(&self.current);
        *current = next;
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of snapshots installed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether at least one snapshot was installed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.generation() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlinks::models::LinkRecord;

    #[test]
    fn empty_before_first_install() {
        let cache = IndexCache::new();
        assert!(cache.get("anything").is_empty());
        assert!(!cache.is_built());
    }

    #[test]
    fn install_swaps_whole_snapshot() {
        let cache = IndexCache::new();
        let before = cache.snapshot();
        let generation = cache.install(BacklinkIndex::from_records([LinkRecord {
            source: "a".into(),
            target: "b".into(),
            excerpt: "see b".to_string(),
        }]));
        assert_eq!(generation, 1);
        assert!(before.is_empty());
        assert_eq!(cache.get("b")["a"], vec!["see b"]);

        cache.install(BacklinkIndex::new());
        assert_eq!(cache.generation(), 2);
        assert!(cache.get("b").is_empty());
    }
}
