//! In-flight async factories, one per key.

use futures::future::{BoxFuture, Shared};

use crate::storage::{AnyArc, KeyMap};
use crate::{RegistryResult, StorageKey};

/// A running factory that any number of callers can await.
pub(crate) type SharedFactory = Shared<BoxFuture<'static, RegistryResult<AnyArc>>>;

/// Keys whose async factory has started but not settled.
///
/// The map keeps its own clone of each shared future, so the factory is not
/// lost when every current waiter is dropped: the next caller for the key
/// picks it up and drives it on.
#[derive(Default)]
pub(crate) struct PendingFactories {
    in_flight: KeyMap<SharedFactory>,
}

impl PendingFactories {
    pub(crate) fn get(&self, key: &StorageKey) -> Option<SharedFactory> {
        self.in_flight.get(key).cloned()
    }

    pub(crate) fn register(&mut self, key: StorageKey, factory: SharedFactory) {
        let previous = self.in_flight.insert(key, factory);
        debug_assert!(previous.is_none(), "two factories in flight for one key");
    }

    pub(crate) fn settle(&mut self, key: &StorageKey) {
        self.in_flight.remove(key);
    }

    pub(crate) fn contains(&self, key: &StorageKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.in_flight.len()
    }
}
