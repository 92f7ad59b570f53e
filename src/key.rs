//! Storage key types and the process-wide key interner.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

// Ids are never reused, so a key's id is its identity.
static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

// Registered (string) keys, shared by every call site in the process.
static INTERNER: Lazy<Mutex<HashMap<Arc<str>, StorageKey>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Canonical identity of a singleton slot.
///
/// Keys come in two flavours:
///
/// - **Registered**: produced from a string. Equal strings always map to the
///   identical key, no matter which module asks, so `"database"` denotes the
///   same slot everywhere in the process.
/// - **Unique**: produced by [`StorageKey::unique`]. A unique key never equals
///   any registered key or any other unique key, even one with the same
///   description, which lets a caller opt out of accidental collisions.
///
/// Keys are cheap to clone and compare: equality and hashing only look at an
/// integer id.
///
/// # Examples
///
/// ```rust
/// use ferrous_registry::StorageKey;
///
/// let a = StorageKey::from("database");
/// let b = StorageKey::from(String::from("database"));
/// assert_eq!(a, b);
/// assert!(StorageKey::ptr_eq(&a, &b));
///
/// let private = StorageKey::unique("database");
/// assert_ne!(a, private);
/// assert_ne!(private, StorageKey::unique("database"));
/// ```
#[derive(Clone)]
pub struct StorageKey {
    inner: Arc<KeyInner>,
}

struct KeyInner {
    id: u64,
    description: Arc<str>,
    registered: bool,
}

impl StorageKey {
    /// Returns the registered key for `name`, creating it on first use.
    pub fn registered(name: &str) -> StorageKey {
        let mut table = INTERNER.lock();
        if let Some(key) = table.get(name) {
            return key.clone();
        }
        let description: Arc<str> = Arc::from(name);
        let key = StorageKey::fresh(description.clone(), true);
        table.insert(description, key.clone());
        key
    }

    /// Creates a key that is equal to no other key.
    pub fn unique(description: impl Into<String>) -> StorageKey {
        let description: Arc<str> = Arc::from(description.into());
        StorageKey::fresh(description, false)
    }

    /// Returns the registered key named after the type `T`.
    ///
    /// The name comes from [`std::any::type_name`], which is meant for
    /// diagnostics: it is not guaranteed to be unique across types, and it
    /// may change between compiler versions. Two distinct types that render
    /// to the same name share a key, and the string `"alloc::string::String"`
    /// names the same slot as `of::<String>()` today but may not tomorrow.
    /// Use [`StorageKey::unique`] when a slot must belong to exactly one type.
    ///
    /// ```rust
    /// use ferrous_registry::StorageKey;
    ///
    /// struct Database;
    /// assert_eq!(StorageKey::of::<Database>(), StorageKey::of::<Database>());
    /// assert_eq!(
    ///     StorageKey::of::<String>().description(),
    ///     std::any::type_name::<String>()
    /// );
    /// ```
    pub fn of<T: ?Sized + 'static>() -> StorageKey {
        StorageKey::registered(std::any::type_name::<T>())
    }

    fn fresh(description: Arc<str>, registered: bool) -> StorageKey {
        StorageKey {
            inner: Arc::new(KeyInner {
                id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
                description,
                registered,
            }),
        }
    }

    /// Human-readable description (the string for registered keys).
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// Whether this key came from the shared string table.
    pub fn is_registered(&self) -> bool {
        self.inner.registered
    }

    /// Returns true when both keys are the same interned instance.
    pub fn ptr_eq(a: &StorageKey, b: &StorageKey) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for StorageKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for StorageKey {}

impl Hash for StorageKey {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.registered {
            f.write_str(&self.inner.description)
        } else {
            write!(f, "unique({})", self.inner.description)
        }
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageKey")
            .field("id", &self.inner.id)
            .field("description", &self.inner.description)
            .field("registered", &self.inner.registered)
            .finish()
    }
}

impl From<&str> for StorageKey {
    fn from(name: &str) -> Self {
        StorageKey::registered(name)
    }
}

impl From<String> for StorageKey {
    fn from(name: String) -> Self {
        StorageKey::registered(&name)
    }
}

impl From<&String> for StorageKey {
    fn from(name: &String) -> Self {
        StorageKey::registered(name)
    }
}

/// Anything the registry accepts as a key.
///
/// Strings go through the shared table; existing keys pass through unchanged.
pub trait IntoStorageKey {
    fn into_storage_key(self) -> StorageKey;
}

impl IntoStorageKey for StorageKey {
    #[inline]
    fn into_storage_key(self) -> StorageKey {
        self
    }
}

impl IntoStorageKey for &StorageKey {
    #[inline]
    fn into_storage_key(self) -> StorageKey {
        self.clone()
    }
}

impl IntoStorageKey for &str {
    fn into_storage_key(self) -> StorageKey {
        StorageKey::registered(self)
    }
}

impl IntoStorageKey for String {
    fn into_storage_key(self) -> StorageKey {
        StorageKey::registered(&self)
    }
}

impl IntoStorageKey for &String {
    fn into_storage_key(self) -> StorageKey {
        StorageKey::registered(self)
    }
}
