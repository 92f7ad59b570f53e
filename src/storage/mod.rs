//! Backing stores for registry entries.
//!
//! Two stores share the [`Storage`] contract: [`StrongStorage`] owns its
//! values, [`WeakStorage`] only observes them. The registry composes both
//! behind a single namespace; the stores themselves know nothing about each
//! other.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{RegistryResult, SingletonConfig, StorageKey};

pub mod strong;
pub mod weak;

pub use strong::StrongStorage;
pub use weak::WeakStorage;

/// Type-erased shared value as held by the stores.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

#[cfg(feature = "ahash")]
pub(crate) type KeyMap<V> = HashMap<StorageKey, V, ahash::RandomState>;
#[cfg(not(feature = "ahash"))]
pub(crate) type KeyMap<V> = HashMap<StorageKey, V>;

/// Which store holds (or should hold) an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Owned by the registry until deleted
    Strong,
    /// Alive only while referenced elsewhere
    Weak,
}

impl StorageKind {
    /// Search order used when the index has nothing to say.
    pub(crate) const FALLBACK_ORDER: [StorageKind; 2] = [StorageKind::Strong, StorageKind::Weak];

    /// Picks the store a config asks for.
    pub fn for_config(config: &SingletonConfig) -> StorageKind {
        if config.weak_ref {
            StorageKind::Weak
        } else {
            StorageKind::Strong
        }
    }

    /// The other store.
    pub fn other(self) -> StorageKind {
        match self {
            StorageKind::Strong => StorageKind::Weak,
            StorageKind::Weak => StorageKind::Strong,
        }
    }
}

/// Values a store stopped owning.
///
/// Dropping the last `Arc` to a value runs its `Drop`, and that code may call
/// back into the registry. Stores therefore never drop an owned value
/// themselves: they push it here, and the registry lets go of the whole batch
/// after its lock is released.
#[must_use = "released values must be dropped after the lock is released"]
#[derive(Default)]
pub struct Released {
    values: Vec<AnyArc>,
}

impl Released {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: AnyArc) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Extend<AnyArc> for Released {
    fn extend<I: IntoIterator<Item = AnyArc>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

/// Raw key/value contract shared by both stores.
///
/// `get` and `has` take `&mut self` because a store may evict entries it
/// discovers to be dead while reading. Mutations hand every owned value they
/// displace to a [`Released`] instead of dropping it in place.
pub trait Storage: Send {
    /// The retention discipline this store implements.
    fn kind(&self) -> StorageKind;

    /// Returns the live value for `key`, if any.
    fn get(&mut self, key: &StorageKey) -> Option<AnyArc>;

    /// Stores a handle to `value`, replacing any previous value for `key`.
    ///
    /// The caller keeps its own `Arc`, so a rejected value is never dropped
    /// inside the store.
    fn set(&mut self, key: StorageKey, value: &AnyArc, released: &mut Released) -> RegistryResult<()>;

    /// Returns true if `key` currently maps to a live value.
    fn has(&mut self, key: &StorageKey) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key`. Returns whether an entry was present.
    fn delete(&mut self, key: &StorageKey, released: &mut Released) -> bool;

    /// Removes every entry.
    fn clear(&mut self, released: &mut Released);

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
