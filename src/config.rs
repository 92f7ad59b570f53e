//! Per-entry configuration.
//!
//! A single option is recognised: whether an entry is retained strongly (the
//! default) or weakly. With the `config` feature the type can be read from and
//! written to JSON, using the external field name `weakRef`.

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "config")]
use crate::{RegistryError, RegistryResult};

/// Storage options for one registry entry.
///
/// # Examples
///
/// ```rust
/// use ferrous_registry::SingletonConfig;
///
/// assert!(!SingletonConfig::default().weak_ref);
/// assert!(SingletonConfig::weak().weak_ref);
/// assert_eq!(SingletonConfig::strong(), SingletonConfig::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "camelCase", default))]
pub struct SingletonConfig {
    /// Hold the value through a weak handle instead of owning it.
    pub weak_ref: bool,
}

impl SingletonConfig {
    /// Strong retention: the registry keeps the value alive.
    pub const fn strong() -> Self {
        Self { weak_ref: false }
    }

    /// Weak retention: the value lives as long as someone else holds it.
    pub const fn weak() -> Self {
        Self { weak_ref: true }
    }

    /// Parses a config object such as `{"weakRef": true}`.
    ///
    /// Missing fields fall back to their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> RegistryResult<Self> {
        serde_json::from_str(json).map_err(|err| RegistryError::InvalidConfig(err.to_string()))
    }
}

impl From<bool> for SingletonConfig {
    fn from(weak_ref: bool) -> Self {
        Self { weak_ref }
    }
}
