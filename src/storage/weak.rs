//! Store that only observes its values.

use std::any::Any;
use std::sync::{Arc, Weak};

use tracing::debug;

use super::{AnyArc, KeyMap, Released, Storage, StorageKind};
use crate::{RegistryError, RegistryResult, StorageKey};

type AnyWeak = Weak<dyn Any + Send + Sync>;

/// Weak reference storage.
///
/// Only a [`Weak`] handle is kept, so a value lives exactly as long as some
/// strong `Arc` exists elsewhere in the program. There is no notification
/// when the last owner goes away; death is noticed on the next access to the
/// key, which evicts the dangling handle on the spot.
///
/// Weak retention is only meaningful for values that have an owner besides
/// the handle passed in. A sole `Arc` is rejected with
/// [`RegistryError::InvalidValueKind`]: the value would die as soon as the
/// caller let go of it.
///
/// The store never owns a value, so it never adds anything to a
/// [`Released`].
///
/// ```rust
/// use ferrous_registry::storage::{AnyArc, Released, Storage, WeakStorage};
/// use ferrous_registry::StorageKey;
/// use std::sync::Arc;
///
/// let mut store = WeakStorage::new();
/// let mut released = Released::new();
/// let key = StorageKey::from("weak-doc");
///
/// let conn: AnyArc = Arc::new(String::from("conn"));
/// let owner = conn.clone();
/// store.set(key.clone(), &conn, &mut released).unwrap();
/// drop(owner);
/// assert!(store.has(&key));
///
/// drop(conn);
/// assert!(!store.has(&key));
/// assert_eq!(store.len(), 0);
/// ```
#[derive(Default)]
pub struct WeakStorage {
    entries: KeyMap<AnyWeak>,
}

impl WeakStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every handle whose value is gone. Returns how many were evicted.
    pub fn purge(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, handle| handle.strong_count() > 0);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "purged collected weak entries");
        }
        evicted
    }

    /// Number of entries whose value is still alive.
    pub fn live_len(&self) -> usize {
        self.entries
            .values()
            .filter(|handle| handle.strong_count() > 0)
            .count()
    }
}

impl Storage for WeakStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Weak
    }

    fn get(&mut self, key: &StorageKey) -> Option<AnyArc> {
        let upgraded = self.entries.get(key)?.upgrade();
        if upgraded.is_none() {
            self.entries.remove(key);
            debug!(key = %key, "evicted collected weak entry");
        }
        upgraded
    }

    // Checks liveness without upgrading: an upgraded `Arc` dropped here could
    // turn out to be the last one.
    fn has(&mut self, key: &StorageKey) -> bool {
        let Some(handle) = self.entries.get(key) else {
            return false;
        };
        if handle.strong_count() > 0 {
            return true;
        }
        self.entries.remove(key);
        debug!(key = %key, "evicted collected weak entry");
        false
    }

    fn set(&mut self, key: StorageKey, value: &AnyArc, _released: &mut Released) -> RegistryResult<()> {
        // `value` itself is one owner; somebody else must hold another.
        if Arc::strong_count(value) < 2 {
            return Err(RegistryError::InvalidValueKind(key.to_string()));
        }
        self.entries.insert(key, Arc::downgrade(value));
        Ok(())
    }

    fn delete(&mut self, key: &StorageKey, _released: &mut Released) -> bool {
        self.entries.remove(key).is_some()
    }

    fn clear(&mut self, _released: &mut Released) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
