use ferrous_registry::{RegistryError, SingletonConfig, SingletonRegistry};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// A singleton whose destructor asks the registry about another key.
struct CallsBackOnDrop {
    registry: SingletonRegistry,
    drops: Arc<AtomicU32>,
}

impl Drop for CallsBackOnDrop {
    fn drop(&mut self) {
        let _ = self.registry.has("drop-neighbour");
        let _ = self.registry.get::<u32>("drop-neighbour");
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn calls_back(registry: &SingletonRegistry, drops: &Arc<AtomicU32>) -> Arc<CallsBackOnDrop> {
    Arc::new(CallsBackOnDrop {
        registry: registry.clone(),
        drops: drops.clone(),
    })
}

/// Runs `f` on a worker thread and reports whether it finished in time.
fn completes<F>(f: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    let (done, finished) = mpsc::channel();
    thread::spawn(move || {
        f();
        let _ = done.send(());
    });
    finished.recv_timeout(Duration::from_secs(5)).is_ok()
}

#[test]
fn test_delete_drops_value_after_unlocking() {
    let registry = SingletonRegistry::new();
    let drops = Arc::new(AtomicU32::new(0));
    registry
        .set("drop-cb", calls_back(&registry, &drops), SingletonConfig::strong())
        .unwrap();

    let worker = registry.clone();
    assert!(completes(move || {
        assert!(worker.delete("drop-cb"));
    }));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_clear_drops_values_after_unlocking() {
    let registry = SingletonRegistry::new();
    let drops = Arc::new(AtomicU32::new(0));
    registry
        .set("drop-cb-a", calls_back(&registry, &drops), SingletonConfig::strong())
        .unwrap();
    registry
        .set("drop-cb-b", calls_back(&registry, &drops), SingletonConfig::strong())
        .unwrap();

    let worker = registry.clone();
    assert!(completes(move || worker.clear()));
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn test_overwrite_drops_previous_value_after_unlocking() {
    let registry = SingletonRegistry::new();
    let drops = Arc::new(AtomicU32::new(0));
    registry
        .set("drop-cb", calls_back(&registry, &drops), SingletonConfig::strong())
        .unwrap();

    let worker = registry.clone();
    assert!(completes(move || {
        worker
            .set("drop-cb", Arc::new(0u32), SingletonConfig::strong())
            .unwrap();
    }));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_migration_to_weak_drops_strong_value_after_unlocking() {
    let registry = SingletonRegistry::new();
    let drops = Arc::new(AtomicU32::new(0));
    registry
        .set("drop-cb", calls_back(&registry, &drops), SingletonConfig::strong())
        .unwrap();

    let worker = registry.clone();
    assert!(completes(move || {
        let kept = Arc::new(1u32);
        worker
            .set("drop-cb", kept.clone(), SingletonConfig::weak())
            .unwrap();
    }));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rejected_weak_value_drops_after_unlocking() {
    let registry = SingletonRegistry::new();
    let drops = Arc::new(AtomicU32::new(0));

    let worker = registry.clone();
    let worker_drops = drops.clone();
    assert!(completes(move || {
        let err = worker
            .set("drop-cb-weak", calls_back(&worker, &worker_drops), SingletonConfig::weak())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidValueKind(_)));
    }));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_last_weak_owner_dropping_during_lookup() {
    let registry = SingletonRegistry::new();
    let drops = Arc::new(AtomicU32::new(0));
    let owner = calls_back(&registry, &drops);
    registry
        .set("drop-cb-weak", owner.clone(), SingletonConfig::weak())
        .unwrap();

    let worker = registry.clone();
    assert!(completes(move || {
        // Looking the value up and letting go of it must not hold the lock
        // while the destructor runs, whichever handle ends up last.
        let found = worker.get::<CallsBackOnDrop>("drop-cb-weak").unwrap();
        drop(owner);
        drop(found);
        assert!(!worker.has("drop-cb-weak"));
    }));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}
