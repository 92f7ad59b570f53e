//! Singleton registry module.
//!
//! This module contains [`SingletonRegistry`], the single entry point that
//! composes strong and weak storage into one namespace and deduplicates
//! concurrent async factories.

use std::any::type_name;
use std::convert::Infallible;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::error::BoxError;
use crate::instance::IntoInstance;
use crate::internal::FactoryGuard;
use crate::metrics::{RegistryCounters, RegistryStats};
use crate::storage::{AnyArc, Released, Storage, StorageKind, StrongStorage, WeakStorage};
use crate::{IntoStorageKey, RegistryError, RegistryResult, SingletonConfig, StorageKey};

mod index;
mod pending;

use index::StorageIndex;
use pending::{PendingFactories, SharedFactory};

/// Process-wide cache of lazily constructed singletons.
///
/// The `SingletonRegistry` keeps every value under a [`StorageKey`] in one of
/// two stores, chosen per entry through [`SingletonConfig`]:
///
/// - **strong**: the registry owns the value until it is deleted or cleared;
/// - **weak**: the registry only observes the value, which lives as long as
///   somebody else holds an `Arc` to it.
///
/// Both stores appear as one namespace. A key is never live in both at once:
/// storing into one store evicts the key from the other.
///
/// # Factories
///
/// [`get_or_create`](Self::get_or_create) runs a factory only when the key
/// has no live value. [`get_or_create_async`](Self::get_or_create_async) adds
/// a concurrency guard: while an async factory for a key is running, every
/// other caller for that key awaits the same future instead of starting a
/// second one. A failed factory is forgotten as soon as it settles, so the
/// next call retries from scratch.
///
/// # Thread Safety
///
/// The registry is `Send + Sync` and cheap to clone (it uses `Arc`
/// internally); clones share state. The internal lock is never held while a
/// factory runs, across an `.await`, or while a value the registry let go of
/// is dropped, so factories and `Drop` impls may call back into the
/// registry.
///
/// # Examples
///
/// ```
/// use ferrous_registry::{SingletonRegistry, SingletonConfig};
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// let registry = SingletonRegistry::new();
/// let db = registry
///     .get_or_create(
///         "database",
///         || Arc::new(Database { url: "postgres://localhost".to_string() }),
///         SingletonConfig::default(),
///     )
///     .unwrap();
///
/// let again = registry.get::<Database>("database").unwrap().unwrap();
/// assert!(Arc::ptr_eq(&db, &again));
/// assert_eq!(again.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct SingletonRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    state: Mutex<RegistryState>,
}

/// Everything the registry mutates, behind one lock.
#[derive(Default)]
struct RegistryState {
    strong: StrongStorage,
    weak: WeakStorage,
    index: StorageIndex,
    pending: PendingFactories,
    // Bumped by clear(); factories that started earlier do not cache.
    generation: u64,
    counters: RegistryCounters,
}

impl RegistryState {
    fn store(&mut self, kind: StorageKind) -> &mut dyn Storage {
        match kind {
            StorageKind::Strong => &mut self.strong,
            StorageKind::Weak => &mut self.weak,
        }
    }

    /// Probes the indexed store first, then the rest in fallback order.
    ///
    /// A hit in an unindexed store re-points the index; a complete miss drops
    /// whatever the index claimed.
    fn search<R>(
        &mut self,
        key: &StorageKey,
        mut probe: impl FnMut(&mut dyn Storage, &StorageKey) -> Option<R>,
    ) -> Option<(StorageKind, R)> {
        let hint = self.index.lookup(key);

        if let Some(kind) = hint {
            if let Some(found) = probe(self.store(kind), key) {
                return Some((kind, found));
            }
        }

        for kind in StorageKind::FALLBACK_ORDER {
            if Some(kind) == hint {
                continue;
            }
            if let Some(found) = probe(self.store(kind), key) {
                self.index.record(key.clone(), kind);
                return Some((kind, found));
            }
        }

        if self.index.forget(key) {
            debug!(key = %key, "dropped stale index entry");
        }
        None
    }

    fn peek(&mut self, key: &StorageKey) -> Option<AnyArc> {
        self.search(key, |store, key| store.get(key))
            .map(|(_, value)| value)
    }

    fn lookup(&mut self, key: &StorageKey) -> Option<AnyArc> {
        let found = self.peek(key);
        self.counters.record_lookup(found.is_some());
        if found.is_some() {
            trace!(key = %key, "registry hit");
        }
        found
    }

    fn locate(&mut self, key: &StorageKey) -> Option<StorageKind> {
        self.search(key, |store, key| store.has(key).then_some(()))
            .map(|(kind, _)| kind)
    }

    /// Stores `value` in `kind`, evicting the key from the other store.
    ///
    /// Validation happens first; a rejected value leaves everything as it was.
    /// Displaced values come back for the caller to drop once unlocked.
    fn insert(&mut self, key: StorageKey, value: &AnyArc, kind: StorageKind) -> RegistryResult<Released> {
        let mut released = Released::new();
        self.store(kind).set(key.clone(), value, &mut released)?;
        if self.store(kind.other()).delete(&key, &mut released) {
            debug!(key = %key, to = ?kind, "migrated entry between stores");
        }
        debug!(key = %key, kind = ?kind, "stored singleton");
        self.index.record(key, kind);
        Ok(released)
    }
}

impl RegistryInner {
    /// Finishes an async factory: forgets it, then caches a success.
    fn settle(
        &self,
        key: &StorageKey,
        kind: StorageKind,
        generation: u64,
        outcome: RegistryResult<AnyArc>,
    ) -> RegistryResult<AnyArc> {
        let mut state = self.state.lock();
        state.pending.settle(key);

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                state.counters.factory_failures += 1;
                warn!(key = %key, error = %err, "async factory failed");
                return Err(err);
            }
        };
        if state.generation != generation {
            debug!(key = %key, "registry cleared while factory ran, result not cached");
            return Ok(value);
        }

        // The waiters' copy is what keeps a weak entry alive.
        let stored = value.clone();
        let inserted = state.insert(key.clone(), &stored, kind);
        drop(state);
        drop(inserted?);
        Ok(value)
    }
}

// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("factory panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("factory panicked: {}", message)
    } else {
        "factory panicked".to_string()
    }
}

fn downcast<T: Send + Sync + 'static>(key: &StorageKey, value: AnyArc) -> RegistryResult<Arc<T>> {
    value.downcast::<T>().map_err(|_| RegistryError::TypeMismatch {
        key: key.to_string(),
        expected: type_name::<T>(),
    })
}

impl SingletonRegistry {
    /// Creates an empty registry.
    ///
    /// Most applications create one registry at start-up and hand clones of
    /// it to whoever needs it; [`crate::global`] offers a process-wide
    /// instance for code that cannot be handed one.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState::default()),
            }),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.state.lock()
    }

    /// Returns true when both handles share the same registry.
    pub fn ptr_eq(a: &SingletonRegistry, b: &SingletonRegistry) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Returns the live value for `key` as `T`.
    ///
    /// `Ok(None)` means no store holds a live value. A value of another type
    /// is reported as [`RegistryError::TypeMismatch`]. Never runs a factory.
    ///
    /// ```
    /// use ferrous_registry::{SingletonRegistry, SingletonConfig};
    /// use std::sync::Arc;
    ///
    /// let registry = SingletonRegistry::new();
    /// assert!(registry.get::<u32>("port").unwrap().is_none());
    ///
    /// registry.set("port", Arc::new(8080u32), SingletonConfig::default()).unwrap();
    /// assert_eq!(*registry.get::<u32>("port").unwrap().unwrap(), 8080);
    /// assert!(registry.get::<String>("port").is_err());
    /// ```
    pub fn get<T: Send + Sync + 'static>(&self, key: impl IntoStorageKey) -> RegistryResult<Option<Arc<T>>> {
        let key = key.into_storage_key();
        match self.get_any(&key) {
            Some(value) => downcast(&key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Untyped [`get`](Self::get).
    pub fn get_any(&self, key: impl IntoStorageKey) -> Option<AnyArc> {
        let key = key.into_storage_key();
        self.lock().lookup(&key)
    }

    /// Returns true if some store holds a live value for `key`.
    pub fn has(&self, key: impl IntoStorageKey) -> bool {
        let key = key.into_storage_key();
        self.lock().locate(&key).is_some()
    }

    /// Returns which store holds the live value for `key`.
    pub fn location(&self, key: impl IntoStorageKey) -> Option<StorageKind> {
        let key = key.into_storage_key();
        self.lock().locate(&key)
    }

    /// Checks one store directly, bypassing the index.
    pub fn contains_in(&self, key: impl IntoStorageKey, kind: StorageKind) -> bool {
        let key = key.into_storage_key();
        self.lock().store(kind).has(&key)
    }

    /// Stores `value` under `key` in the store `config` selects.
    ///
    /// Any entry for the key in the other store is removed. Weak retention
    /// fails with [`RegistryError::InvalidValueKind`] when `value` is the only
    /// `Arc` to its data, since nothing would keep it alive.
    ///
    /// ```
    /// use ferrous_registry::{SingletonRegistry, SingletonConfig, StorageKind};
    /// use std::sync::Arc;
    ///
    /// let registry = SingletonRegistry::new();
    /// let conn = Arc::new(String::from("conn"));
    ///
    /// registry.set("db", conn.clone(), SingletonConfig::strong()).unwrap();
    /// registry.set("db", conn.clone(), SingletonConfig::weak()).unwrap();
    /// assert!(!registry.contains_in("db", StorageKind::Strong));
    /// assert!(registry.contains_in("db", StorageKind::Weak));
    /// ```
    pub fn set<T: Send + Sync + 'static>(
        &self,
        key: impl IntoStorageKey,
        value: Arc<T>,
        config: SingletonConfig,
    ) -> RegistryResult<()> {
        self.set_any(key, value, config)
    }

    /// Untyped [`set`](Self::set).
    pub fn set_any(&self, key: impl IntoStorageKey, value: AnyArc, config: SingletonConfig) -> RegistryResult<()> {
        let key = key.into_storage_key();
        let released = self.lock().insert(key, &value, StorageKind::for_config(&config))?;
        drop(released);
        Ok(())
    }

    /// Removes `key` from both stores and the index.
    ///
    /// Returns whether any store held an entry. Deleting an absent key is a
    /// no-op.
    pub fn delete(&self, key: impl IntoStorageKey) -> bool {
        let key = key.into_storage_key();
        let mut released = Released::new();
        let removed = {
            let mut state = self.lock();
            let strong = state.strong.delete(&key, &mut released);
            let weak = state.weak.delete(&key, &mut released);
            state.index.forget(&key);
            strong || weak
        };
        if removed {
            debug!(key = %key, "deleted singleton");
        }
        drop(released);
        removed
    }

    /// Empties both stores and the index.
    ///
    /// Async factories already running are not cancelled: their waiters
    /// still receive the outcome, but a value that settles after the clear is
    /// not cached.
    pub fn clear(&self) {
        let mut released = Released::new();
        let generation = {
            let mut state = self.lock();
            state.strong.clear(&mut released);
            state.weak.clear(&mut released);
            state.index.clear();
            state.generation = state.generation.wrapping_add(1);
            state.generation
        };
        debug!(generation, released = released.len(), "cleared registry");
        drop(released);
    }

    /// Returns the value for `key`, building it with `factory` if absent.
    ///
    /// An existing value is returned as is and `factory` is dropped unrun.
    /// Otherwise `factory` runs once; a `None` result fails with
    /// [`RegistryError::InvalidFactoryResult`]. The new value is stored as
    /// [`set`](Self::set) would store it and returned.
    ///
    /// A factory that asks the registry for its own key while running fails
    /// with [`RegistryError::Circular`]. A factory that panics unwinds into the
    /// caller and leaves the registry untouched.
    ///
    /// ```
    /// use ferrous_registry::{SingletonRegistry, SingletonConfig};
    /// use std::collections::HashMap;
    /// use std::sync::{Arc, Mutex};
    ///
    /// let registry = SingletonRegistry::new();
    /// let cache = registry
    ///     .get_or_create(
    ///         "cache",
    ///         || Arc::new(Mutex::new(HashMap::<String, String>::new())),
    ///         SingletonConfig::weak(),
    ///     )
    ///     .unwrap();
    ///
    /// assert!(registry.has("cache"));
    /// drop(cache);
    /// assert!(!registry.has("cache"));
    /// ```
    pub fn get_or_create<R, F>(
        &self,
        key: impl IntoStorageKey,
        factory: F,
        config: SingletonConfig,
    ) -> RegistryResult<Arc<R::Value>>
    where
        F: FnOnce() -> R,
        R: IntoInstance,
    {
        self.try_get_or_create(key, || Ok::<R, Infallible>(factory()), config)
    }

    /// [`get_or_create`](Self::get_or_create) with a fallible factory.
    ///
    /// The factory's error is returned verbatim as the source of
    /// [`RegistryError::Factory`]; nothing is cached.
    pub fn try_get_or_create<R, E, F>(
        &self,
        key: impl IntoStorageKey,
        factory: F,
        config: SingletonConfig,
    ) -> RegistryResult<Arc<R::Value>>
    where
        F: FnOnce() -> Result<R, E>,
        R: IntoInstance,
        E: Into<BoxError>,
    {
        let key = key.into_storage_key();
        let existing = self.lock().lookup(&key);
        if let Some(existing) = existing {
            return downcast(&key, existing);
        }

        let guard = FactoryGuard::enter(&key)?;
        self.lock().counters.factory_runs += 1;
        debug!(key = %key, "running factory");
        let produced = factory();
        drop(guard);

        let instance = match produced {
            Ok(result) => result.into_instance(),
            Err(err) => {
                self.lock().counters.factory_failures += 1;
                let err = RegistryError::factory(key.to_string(), err);
                warn!(key = %key, error = %err, "factory failed");
                return Err(err);
            }
        };
        let Some(instance) = instance else {
            self.lock().counters.factory_failures += 1;
            return Err(RegistryError::InvalidFactoryResult(key.to_string()));
        };

        let mut state = self.lock();
        // Another thread may have stored a value while our factory ran.
        if let Some(existing) = state.peek(&key) {
            drop(state);
            return downcast(&key, existing);
        }
        let value: AnyArc = instance.clone();
        let inserted = state.insert(key, &value, StorageKind::for_config(&config));
        drop(state);
        drop(inserted?);
        Ok(instance)
    }

    /// Async [`get_or_create`](Self::get_or_create) with thundering-herd
    /// protection.
    ///
    /// When no value exists and no factory for `key` is running, `factory` is
    /// started and recorded as pending. Every caller that arrives while it is
    /// pending awaits the same outcome instead of running its own factory:
    /// all of them get the same `Arc`, or all of them get the same error.
    ///
    /// The pending record is dropped as soon as the factory settles, before
    /// any waiter sees the result. A failure is therefore never cached; the
    /// next call starts a fresh attempt. A factory that panics counts as a
    /// failure: every waiter gets [`RegistryError::Factory`] carrying the
    /// panic message.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_registry::{SingletonRegistry, SingletonConfig, BoxError};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// # async fn example() {
    /// let registry = SingletonRegistry::new();
    /// let calls = Arc::new(AtomicU32::new(0));
    ///
    /// let make = |calls: Arc<AtomicU32>| move || async move {
    ///     calls.fetch_add(1, Ordering::SeqCst);
    ///     Ok::<_, BoxError>(Arc::new(String::from("service")))
    /// };
    ///
    /// let (a, b, c) = futures::join!(
    ///     registry.get_or_create_async("svc", make(calls.clone()), SingletonConfig::default()),
    ///     registry.get_or_create_async("svc", make(calls.clone()), SingletonConfig::default()),
    ///     registry.get_or_create_async("svc", make(calls.clone()), SingletonConfig::default()),
    /// );
    ///
    /// assert_eq!(calls.load(Ordering::SeqCst), 1);
    /// assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    /// # let _ = c;
    /// # }
    /// ```
    pub async fn get_or_create_async<R, E, F, Fut>(
        &self,
        key: impl IntoStorageKey,
        factory: F,
        config: SingletonConfig,
    ) -> RegistryResult<Arc<R::Value>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoInstance + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let key = key.into_storage_key();

        // Check and register under one lock, with no await in between.
        let running = {
            let mut state = self.lock();
            if let Some(existing) = state.lookup(&key) {
                drop(state);
                return downcast(&key, existing);
            }
            let joined = state.pending.get(&key);
            match joined {
                Some(running) => {
                    state.counters.joined += 1;
                    trace!(key = %key, "joining running factory");
                    running
                }
                None => {
                    state.counters.factory_runs += 1;
                    let kind = StorageKind::for_config(&config);
                    let running = self.start_factory(key.clone(), kind, state.generation, factory);
                    state.pending.register(key.clone(), running.clone());
                    debug!(key = %key, "started async factory");
                    running
                }
            }
        };

        let value = running.await?;
        downcast(&key, value)
    }

    fn start_factory<R, E, F, Fut>(
        &self,
        key: StorageKey,
        kind: StorageKind,
        generation: u64,
        factory: F,
    ) -> SharedFactory
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoInstance + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        // Weak, so a factory that never settles does not keep the registry alive.
        let registry: Weak<RegistryInner> = Arc::downgrade(&self.inner);

        async move {
            // A panic must settle the factory too, or the key stays pending
            // with a poisoned future.
            let produced = AssertUnwindSafe(async move { factory().await })
                .catch_unwind()
                .await;
            let outcome = match produced {
                Ok(Ok(result)) => result
                    .into_instance()
                    .map(|value| value as AnyArc)
                    .ok_or_else(|| RegistryError::InvalidFactoryResult(key.to_string())),
                Ok(Err(err)) => Err(RegistryError::factory(key.to_string(), err)),
                Err(payload) => Err(RegistryError::factory(key.to_string(), panic_message(&*payload))),
            };
            match registry.upgrade() {
                Some(inner) => inner.settle(&key, kind, generation, outcome),
                None => outcome,
            }
        }
        .boxed()
        .shared()
    }

    /// Returns true while an async factory for `key` is running.
    pub fn is_pending(&self, key: impl IntoStorageKey) -> bool {
        let key = key.into_storage_key();
        self.lock().pending.contains(&key)
    }

    /// Evicts every weak entry whose value is gone. Returns how many.
    pub fn purge(&self) -> usize {
        self.lock().weak.purge()
    }

    /// Point-in-time view of sizes and counters.
    pub fn stats(&self) -> RegistryStats {
        let state = self.lock();
        RegistryStats {
            strong: state.strong.len(),
            weak: state.weak.len(),
            weak_live: state.weak.live_len(),
            indexed: state.index.len(),
            pending: state.pending.len(),
            generation: state.generation,
            counters: state.counters,
        }
    }
}

impl Default for SingletonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}
