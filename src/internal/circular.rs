//! Re-entrancy detection for synchronous factories.

use std::cell::RefCell;

use crate::{RegistryError, RegistryResult, StorageKey};

// Keys whose sync factory is currently running on this thread, outermost first.
thread_local! {
    static FACTORY_STACK: RefCell<Vec<StorageKey>> = const { RefCell::new(Vec::new()) };
}

/// Marks a key's factory as running on the current thread.
///
/// Entering a key that is already on the stack means the factory asked for its
/// own singleton while building it, which can only recurse forever.
pub(crate) struct FactoryGuard {
    key: StorageKey,
}

impl FactoryGuard {
    pub(crate) fn enter(key: &StorageKey) -> RegistryResult<Self> {
        FACTORY_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.iter().any(|running| running == key) {
                let mut path: Vec<String> = stack.iter().map(ToString::to_string).collect();
                path.push(key.to_string());
                return Err(RegistryError::Circular(path));
            }

            stack.push(key.clone());
            Ok(FactoryGuard { key: key.clone() })
        })
    }
}

impl Drop for FactoryGuard {
    fn drop(&mut self) {
        FACTORY_STACK.with(|stack| {
            if let Some(last) = stack.borrow_mut().pop() {
                debug_assert_eq!(last, self.key);
            }
        });
    }
}
