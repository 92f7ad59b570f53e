//! # ferrous-registry
//!
//! A process-wide singleton registry: a cache of lazily constructed values
//! keyed by symbolic identity.
//!
//! ## Features
//!
//! - **Two retention disciplines**: strong entries live until deleted, weak
//!   entries live as long as someone else holds them and vanish on their own
//! - **One namespace**: both stores behave as a single map; a key is never
//!   live in both
//! - **Thundering-herd protection**: concurrent async factories for one key
//!   run once, and every caller shares the outcome
//! - **Retry on failure**: a failed factory is never cached
//! - **Shared string keys, private unique keys**: `"database"` is the same
//!   slot everywhere, [`StorageKey::unique`] is a slot nobody can collide with
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_registry::{SingletonRegistry, SingletonConfig};
//! use std::sync::Arc;
//!
//! struct Connection {
//!     url: String,
//! }
//!
//! let registry = SingletonRegistry::new();
//!
//! let conn = Arc::new(Connection { url: "postgres://localhost".to_string() });
//! registry.set("db", conn.clone(), SingletonConfig::default()).unwrap();
//!
//! let same = registry.get::<Connection>("db").unwrap().unwrap();
//! assert!(Arc::ptr_eq(&conn, &same));
//! ```
//!
//! ## Weak Entries
//!
//! ```rust
//! use ferrous_registry::{SingletonRegistry, SingletonConfig};
//! use std::sync::Arc;
//!
//! let registry = SingletonRegistry::new();
//! let session = registry
//!     .get_or_create("session", || Arc::new(vec![1u8, 2, 3]), SingletonConfig::weak())
//!     .unwrap();
//!
//! assert!(registry.has("session"));
//! drop(session);
//! assert!(!registry.has("session"));
//! ```
//!
//! ## Async Factories
//!
//! ```rust
//! use ferrous_registry::{SingletonRegistry, SingletonConfig, BoxError};
//! use std::sync::Arc;
//!
//! struct Pool;
//!
//! # async fn example() -> Result<(), ferrous_registry::RegistryError> {
//! let registry = SingletonRegistry::new();
//! let pool = registry
//!     .get_or_create_async(
//!         "pool",
//!         || async {
//!             // connect...
//!             Ok::<_, BoxError>(Arc::new(Pool))
//!         },
//!         SingletonConfig::default(),
//!     )
//!     .await?;
//! # let _ = pool;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod global;
pub mod instance;
pub mod key;
pub mod metrics;
pub mod provider;
pub mod storage;

// Internal modules
mod internal;

// Re-export core types
pub use config::SingletonConfig;
pub use error::{BoxError, RegistryError, RegistryResult};
pub use instance::IntoInstance;
pub use key::{IntoStorageKey, StorageKey};
pub use metrics::{RegistryCounters, RegistryStats};
pub use provider::SingletonRegistry;
pub use storage::{AnyArc, Released, Storage, StorageKind, StrongStorage, WeakStorage};
