use ferrous_registry::{RegistryError, SingletonConfig, SingletonRegistry, StorageKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Session {
    user: String,
}

#[test]
fn test_weak_set_rejects_sole_owner() {
    let registry = SingletonRegistry::new();

    let err = registry.set("answer", Arc::new(42i32), SingletonConfig::weak()).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidValueKind(ref key) if key == "answer"));
    assert!(!registry.has("answer"));
}

#[test]
fn test_weak_set_leaves_ownership_with_caller() {
    let registry = SingletonRegistry::new();
    let session = Arc::new(Session { user: "ada".to_string() });

    registry.set("session", session.clone(), SingletonConfig::weak()).unwrap();

    assert_eq!(Arc::strong_count(&session), 1);
    let fetched = registry.get::<Session>("session").unwrap().unwrap();
    assert!(Arc::ptr_eq(&session, &fetched));
    assert_eq!(fetched.user, "ada");
}

#[test]
fn test_weak_entry_heals_after_collection() {
    let registry = SingletonRegistry::new();
    let session = Arc::new(Session { user: "grace".to_string() });
    registry.set("short-lived", session.clone(), SingletonConfig::weak()).unwrap();
    assert_eq!(registry.location("short-lived"), Some(StorageKind::Weak));

    drop(session);

    assert!(registry.get::<Session>("short-lived").unwrap().is_none());
    assert!(!registry.has("short-lived"));
    // Repeated reads stay absent and leave no bookkeeping behind.
    for _ in 0..3 {
        assert!(registry.get_any("short-lived").is_none());
        assert_eq!(registry.location("short-lived"), None);
    }
    let stats = registry.stats();
    assert_eq!(stats.weak, 0);
    assert_eq!(stats.indexed, 0);
}

#[test]
fn test_weak_get_or_create_lives_while_held() {
    let registry = SingletonRegistry::new();

    let cache = registry
        .get_or_create("cache", || Arc::new(Mutex::new(HashMap::<String, u32>::new())), SingletonConfig::weak())
        .unwrap();
    assert!(registry.has("cache"));

    cache.lock().unwrap().insert("hits".to_string(), 1);
    let again = registry
        .get_or_create("cache", || Arc::new(Mutex::new(HashMap::<String, u32>::new())), SingletonConfig::weak())
        .unwrap();
    assert!(Arc::ptr_eq(&cache, &again));

    drop(cache);
    drop(again);
    assert!(!registry.has("cache"));

    // A collected weak singleton is rebuilt on demand.
    let rebuilt = registry
        .get_or_create("cache", || Arc::new(Mutex::new(HashMap::<String, u32>::new())), SingletonConfig::weak())
        .unwrap();
    assert!(rebuilt.lock().unwrap().is_empty());
}

#[test]
fn test_weak_to_strong_migration() {
    let registry = SingletonRegistry::new();
    let value = Arc::new(String::from("migrating"));

    registry.set("migrating", value.clone(), SingletonConfig::weak()).unwrap();
    assert!(registry.contains_in("migrating", StorageKind::Weak));
    assert!(!registry.contains_in("migrating", StorageKind::Strong));

    registry.set("migrating", value.clone(), SingletonConfig::strong()).unwrap();
    assert!(registry.contains_in("migrating", StorageKind::Strong));
    assert!(!registry.contains_in("migrating", StorageKind::Weak));

    // Now owned by the registry: survives the caller dropping its handle.
    drop(value);
    assert_eq!(*registry.get::<String>("migrating").unwrap().unwrap(), "migrating");
}

#[test]
fn test_strong_to_weak_migration() {
    let registry = SingletonRegistry::new();
    let value = Arc::new(String::from("demoted"));

    registry.set("demoted", value.clone(), SingletonConfig::strong()).unwrap();
    registry.set("demoted", value.clone(), SingletonConfig::weak()).unwrap();

    assert!(!registry.contains_in("demoted", StorageKind::Strong));
    assert!(registry.contains_in("demoted", StorageKind::Weak));
    assert_eq!(registry.location("demoted"), Some(StorageKind::Weak));

    drop(value);
    assert!(!registry.has("demoted"));
}

#[test]
fn test_delete_removes_from_both_stores() {
    let registry = SingletonRegistry::new();
    let value = Arc::new(1u64);
    registry.set("both", value.clone(), SingletonConfig::weak()).unwrap();

    assert!(registry.delete("both"));
    assert!(!registry.contains_in("both", StorageKind::Weak));
    assert!(!registry.contains_in("both", StorageKind::Strong));
    assert!(!registry.has("both"));
    // The value itself is untouched.
    assert_eq!(*value, 1);
}

#[test]
fn test_purge_sweeps_collected_entries() {
    let registry = SingletonRegistry::new();
    let kept = Arc::new(1u32);
    let dropped = Arc::new(2u32);
    registry.set("kept", kept.clone(), SingletonConfig::weak()).unwrap();
    registry.set("dropped", dropped.clone(), SingletonConfig::weak()).unwrap();

    drop(dropped);
    let stats = registry.stats();
    assert_eq!(stats.weak, 2);
    assert_eq!(stats.weak_live, 1);

    assert_eq!(registry.purge(), 1);
    assert_eq!(registry.stats().weak, 1);
    assert!(registry.has("kept"));
    assert!(!registry.has("dropped"));
}
