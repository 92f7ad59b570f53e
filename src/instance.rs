//! Normalisation of factory results.

use std::sync::Arc;

/// A factory result that may or may not carry a value.
///
/// Factories hand back either an `Arc<T>` or an `Option<Arc<T>>`. An empty
/// result is a programming error: a singleton never stands for "nothing",
/// and the registry reports it as
/// [`RegistryError::InvalidFactoryResult`](crate::RegistryError::InvalidFactoryResult).
pub trait IntoInstance {
    /// The singleton's type.
    type Value: Send + Sync + 'static;

    fn into_instance(self) -> Option<Arc<Self::Value>>;
}

impl<T: Send + Sync + 'static> IntoInstance for Arc<T> {
    type Value = T;

    #[inline]
    fn into_instance(self) -> Option<Arc<T>> {
        Some(self)
    }
}

impl<T: Send + Sync + 'static> IntoInstance for Option<Arc<T>> {
    type Value = T;

    #[inline]
    fn into_instance(self) -> Option<Arc<T>> {
        self
    }
}
