//! Runtime state of created beans: singletons, dependency edges and disposal callbacks.

mod dependency;
mod disposal;
mod singleton;

pub(crate) use disposal::DisposableAdapter;
pub(crate) use singleton::SingletonRegistry;
