//! The process-wide registry.
//!
//! Code that is handed a [`SingletonRegistry`] should use it. For code that
//! cannot be, this module anchors one instance in a process-global static:
//! it is created on first access, or injected once at start-up with
//! [`install`], and every later access from any module returns a handle to
//! that same instance.

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{RegistryError, RegistryResult, SingletonRegistry};

static GLOBAL: OnceCell<SingletonRegistry> = OnceCell::new();

/// Returns the global registry, creating it on first use.
///
/// ```rust
/// use ferrous_registry::{global, SingletonRegistry};
///
/// let a = global::registry();
/// let b = global::registry();
/// assert!(SingletonRegistry::ptr_eq(&a, &b));
/// ```
pub fn registry() -> SingletonRegistry {
    GLOBAL
        .get_or_init(|| {
            debug!("created global singleton registry");
            SingletonRegistry::new()
        })
        .clone()
}

/// Makes `registry` the global instance.
///
/// Only possible before anything has touched the global registry; afterwards
/// this fails with [`RegistryError::AlreadyInstalled`] and the existing
/// instance stays in place.
pub fn install(registry: SingletonRegistry) -> RegistryResult<()> {
    GLOBAL
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInstalled)?;
    debug!("installed global singleton registry");
    Ok(())
}

/// Whether the global registry exists yet.
pub fn is_initialized() -> bool {
    GLOBAL.get().is_some()
}
