//! Callbacks giving a bean access to its name and its container.
//!
//! Delivered after properties are populated and before any initialization callback,
//! in the order name, type registry, factory.

use std::sync::Arc;

use crate::factory::WeakBeanFactory;
use crate::types::TypeRegistry;

/// Receives the name the bean was registered under.
pub trait BeanNameAware: Send + Sync + 'static {
    fn set_bean_name(&self, name: &str);
}

/// Receives the type registry of the owning factory.
pub trait TypeRegistryAware: Send + Sync + 'static {
    fn set_type_registry(&self, registry: Arc<TypeRegistry>);
}

/// Receives a handle to the owning factory.
///
/// The handle is weak so a singleton keeping it does not keep the factory alive.
pub trait BeanFactoryAware: Send + Sync + 'static {
    fn set_bean_factory(&self, factory: WeakBeanFactory);
}
