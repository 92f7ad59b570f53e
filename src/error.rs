//! Error types for the singleton registry.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boxed error produced by a user factory.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Singleton registry errors
///
/// Every failure the registry can report. The type is `Clone` so a single
/// async factory failure can be delivered to every caller that was waiting
/// on the same in-flight factory.
///
/// # Examples
///
/// ```rust
/// use ferrous_registry::{RegistryError, SingletonRegistry, SingletonConfig};
/// use std::sync::Arc;
///
/// let registry = SingletonRegistry::new();
///
/// // The only owner of this Arc is the registry itself, so a weak handle
/// // would dangle immediately.
/// match registry.set("answer", Arc::new(42u32), SingletonConfig::weak()) {
///     Err(RegistryError::InvalidValueKind(key)) => assert_eq!(key, "answer"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// Weak retention requested for a value nothing else keeps alive
    InvalidValueKind(String),
    /// A factory produced no value
    InvalidFactoryResult(String),
    /// A factory failed with its own error
    Factory {
        key: String,
        source: Arc<dyn Error + Send + Sync + 'static>,
    },
    /// Typed access with a type other than the stored one
    TypeMismatch {
        key: String,
        expected: &'static str,
    },
    /// A synchronous factory re-entered creation of its own key (includes path)
    Circular(Vec<String>),
    /// The global registry was already initialised
    AlreadyInstalled,
    /// A serialized config could not be parsed
    InvalidConfig(String),
}

impl RegistryError {
    /// Wraps a factory error, keeping it verbatim as the error source.
    pub fn factory(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        RegistryError::Factory {
            key: key.into(),
            source: Arc::from(source.into()),
        }
    }

    /// Returns the key the error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            RegistryError::InvalidValueKind(key)
            | RegistryError::InvalidFactoryResult(key)
            | RegistryError::Factory { key, .. }
            | RegistryError::TypeMismatch { key, .. } => Some(key.as_str()),
            RegistryError::Circular(path) => path.last().map(String::as_str),
            RegistryError::AlreadyInstalled | RegistryError::InvalidConfig(_) => None,
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidValueKind(key) => {
                write!(f, "Invalid value for weak retention: {}", key)
            }
            RegistryError::InvalidFactoryResult(key) => {
                write!(f, "Factory produced no value for: {}", key)
            }
            RegistryError::Factory { key, source } => {
                write!(f, "Factory failed for {}: {}", key, source)
            }
            RegistryError::TypeMismatch { key, expected } => {
                write!(f, "Type mismatch for {}: expected {}", key, expected)
            }
            RegistryError::Circular(path) => {
                write!(f, "Circular factory: {}", path.join(" -> "))
            }
            RegistryError::AlreadyInstalled => write!(f, "Global registry already installed"),
            RegistryError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegistryError::Factory { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type for registry operations
///
/// A convenience alias for `Result<T, RegistryError>` used throughout the crate.
///
/// # Examples
///
/// ```rust
/// use ferrous_registry::{RegistryResult, RegistryError};
///
/// fn lookup() -> RegistryResult<u32> {
///     Err(RegistryError::InvalidFactoryResult("port".to_string()))
/// }
///
/// assert!(lookup().is_err());
/// ```
pub type RegistryResult<T> = Result<T, RegistryError>;
