//! Internal implementation details.

pub(crate) mod circular;

pub(crate) use circular::FactoryGuard;
