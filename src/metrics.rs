//! Counters and point-in-time snapshots of registry state.

/// Running counters kept by a registry.
///
/// Updated under the registry lock, so they are exact rather than sampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCounters {
    /// Lookups that found a live value
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Factory invocations started (sync and async)
    pub factory_runs: u64,
    /// Factory invocations that failed or produced no value
    pub factory_failures: u64,
    /// Async callers that joined an already running factory
    pub joined: u64,
}

impl RegistryCounters {
    pub(crate) fn record_lookup(&mut self, found: bool) {
        if found {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    /// Fraction of lookups that hit, or `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Snapshot returned by [`SingletonRegistry::stats`](crate::SingletonRegistry::stats).
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryStats {
    /// Entries in strong storage
    pub strong: usize,
    /// Weak handles held, including dead ones not yet observed
    pub weak: usize,
    /// Weak handles whose value is still alive
    pub weak_live: usize,
    /// Keys with a recorded storage location
    pub indexed: usize,
    /// Async factories currently in flight
    pub pending: usize,
    /// Number of `clear()` calls so far
    pub generation: u64,
    pub counters: RegistryCounters,
}

impl RegistryStats {
    /// Live entries across both stores.
    pub fn live(&self) -> usize {
        self.strong + self.weak_live
    }
}
