//! Advisory map from key to the store that last held it.

use crate::storage::{KeyMap, StorageKind};
use crate::StorageKey;

/// Remembers where each key was last seen.
///
/// Only ever a hint: readers try the recorded store first and fall back to a
/// full search, so a stale entry costs one extra probe and never hides a
/// value.
#[derive(Default)]
pub(crate) struct StorageIndex {
    locations: KeyMap<StorageKind>,
}

impl StorageIndex {
    #[inline]
    pub(crate) fn lookup(&self, key: &StorageKey) -> Option<StorageKind> {
        self.locations.get(key).copied()
    }

    pub(crate) fn record(&mut self, key: StorageKey, kind: StorageKind) {
        self.locations.insert(key, kind);
    }

    pub(crate) fn forget(&mut self, key: &StorageKey) -> bool {
        self.locations.remove(key).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.locations.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.locations.len()
    }
}
