#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_registry::{SingletonConfig, SingletonRegistry, StorageKind};
use std::sync::Arc;

const KEYS: [&str; 4] = ["fuzz-a", "fuzz-b", "fuzz-c", "fuzz-d"];

fuzz_target!(|data: &[u8]| {
    let registry = SingletonRegistry::new();
    // Owners for weak values; dropping a slot lets its value be collected.
    let mut owners: [Option<Arc<u32>>; 4] = [None, None, None, None];

    for chunk in data.chunks(2) {
        let op = chunk[0];
        let slot = chunk.get(1).copied().unwrap_or(0) as usize % KEYS.len();
        let key = KEYS[slot];

        match op % 8 {
            0 => {
                let _ = registry.set(key, Arc::new(op as u32), SingletonConfig::strong());
            }
            1 => {
                let value = Arc::new(op as u32);
                owners[slot] = Some(value.clone());
                registry.set(key, value, SingletonConfig::weak()).unwrap();
            }
            2 => {
                // Sole owner: must be rejected.
                assert!(registry.set(key, Arc::new(0u32), SingletonConfig::weak()).is_err());
            }
            3 => {
                owners[slot] = None;
            }
            4 => {
                let _ = registry.get::<u32>(key);
            }
            5 => {
                registry.delete(key);
                assert!(!registry.has(key));
            }
            6 => {
                let value = registry.get_or_create(key, || Arc::new(op as u32), SingletonConfig::default());
                assert!(value.is_ok());
            }
            _ => {
                registry.clear();
            }
        }

        for name in KEYS {
            let strong = registry.contains_in(name, StorageKind::Strong);
            let weak = registry.contains_in(name, StorageKind::Weak);
            assert!(!(strong && weak));
        }
    }
});
