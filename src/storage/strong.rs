//! Store that owns its values.

use std::sync::Arc;

use super::{AnyArc, KeyMap, Released, Storage, StorageKind};
use crate::{RegistryResult, StorageKey};

/// Strong reference storage.
///
/// A plain map: once set, a value stays alive until it is deleted, replaced
/// or the store is cleared, whatever else happens in the program.
///
/// ```rust
/// use ferrous_registry::storage::{AnyArc, Released, Storage, StrongStorage};
/// use ferrous_registry::StorageKey;
/// use std::sync::Arc;
///
/// let mut store = StrongStorage::new();
/// let mut released = Released::new();
/// let key = StorageKey::from("strong-doc");
/// let value: AnyArc = Arc::new(7u8);
///
/// store.set(key.clone(), &value, &mut released).unwrap();
/// assert!(store.has(&key));
/// assert!(store.delete(&key, &mut released));
/// assert!(!store.delete(&key, &mut released));
/// assert_eq!(released.len(), 1);
/// ```
#[derive(Default)]
pub struct StrongStorage {
    entries: KeyMap<AnyArc>,
}

impl StrongStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for StrongStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Strong
    }

    #[inline]
    fn get(&mut self, key: &StorageKey) -> Option<AnyArc> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: StorageKey, value: &AnyArc, released: &mut Released) -> RegistryResult<()> {
        if let Some(previous) = self.entries.insert(key, Arc::clone(value)) {
            released.push(previous);
        }
        Ok(())
    }

    #[inline]
    fn has(&mut self, key: &StorageKey) -> bool {
        self.entries.contains_key(key)
    }

    fn delete(&mut self, key: &StorageKey, released: &mut Released) -> bool {
        match self.entries.remove(key) {
            Some(value) => {
                released.push(value);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self, released: &mut Released) {
        released.extend(self.entries.drain().map(|(_, value)| value));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
