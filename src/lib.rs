//! # ferrous-beans
//!
//! Bean-creation engine for a dependency injection container: declarative bean
//! definitions in, fully constructed, wired and initialized beans out.
//!
//! ## Features
//!
//! - **Definitions**: types, scopes, constructor arguments, property values, parent
//!   inheritance, init and destroy methods
//! - **Instantiation strategies**: suppliers, static and instance factory methods,
//!   constructor autowiring with argument matching
//! - **Autowiring**: by name, by type and by constructor, with dependency checks
//! - **Post-processors**: ordered hooks around every phase of creation
//! - **Circular references**: singletons populated through properties may reference
//!   each other; early references resolve the cycle
//! - **Factory beans**: beans that produce other beans, addressable with `&name`
//! - **Ordered destruction**: dependents are destroyed before their dependencies
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_beans::{AutowireMode, BeanDefinition, BeanFactory, BeanType, Value};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Database {
//!     url: Mutex<String>,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let factory = BeanFactory::builder()
//!     .register_type(
//!         BeanType::of::<Database>()
//!             .default_constructor(Database::default)
//!             .value::<String>("url", |db, url| *db.url.lock().unwrap() = url)
//!             .build(),
//!     )
//!     .register_type(
//!         BeanType::of::<UserService>()
//!             .constructor(vec![ferrous_beans::ValueType::bean::<Database>()], |args| {
//!                 Ok(UserService { db: args.next::<Database>()? })
//!             })
//!             .build(),
//!     )
//!     .define(
//!         "database",
//!         BeanDefinition::of::<Database>().property("url", Value::literal("postgres://localhost")),
//!     )
//!     .define(
//!         "users",
//!         BeanDefinition::of::<UserService>().autowire(AutowireMode::Constructor),
//!     )
//!     .build();
//!
//! let users = factory.get_typed::<UserService>("users").unwrap();
//! assert_eq!(*users.db.url.lock().unwrap(), "postgres://localhost");
//! ```
//!
//! ## Circular References
//!
//! ```rust
//! use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, Value};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Left { right: Mutex<Option<Arc<Right>>> }
//! #[derive(Default)]
//! struct Right { left: Mutex<Option<Arc<Left>>> }
//!
//! let factory = BeanFactory::builder()
//!     .register_type(
//!         BeanType::of::<Left>()
//!             .default_constructor(Left::default)
//!             .reference::<Right>("right", |l, r| *l.right.lock().unwrap() = Some(r))
//!             .build(),
//!     )
//!     .register_type(
//!         BeanType::of::<Right>()
//!             .default_constructor(Right::default)
//!             .reference::<Left>("left", |r, l| *r.left.lock().unwrap() = Some(l))
//!             .build(),
//!     )
//!     .define("left", BeanDefinition::of::<Left>().property("right", Value::reference("right")))
//!     .define("right", BeanDefinition::of::<Right>().property("left", Value::reference("left")))
//!     .build();
//!
//! let left = factory.get_typed::<Left>("left").unwrap();
//! let right = left.right.lock().unwrap().clone().unwrap();
//! let back = right.left.lock().unwrap().clone().unwrap();
//! assert!(Arc::ptr_eq(&left, &back));
//! ```

pub mod config;
pub mod convert;
pub mod definition;
#[cfg(feature = "diagnostics")]
pub mod descriptors;
pub mod error;
pub mod factory;
pub mod key;
pub mod observer;
pub mod processor;
pub mod scope;
pub mod traits;
pub mod types;
pub mod value;
pub mod wrapper;

// Internal modules
mod internal;
mod registry;

pub use config::{ConfigError, FactoryConfig, ENV_PREFIX};
pub use convert::{ConversionError, Resolved, TypeConverter};
pub use definition::{
    BeanDefinition, DefinitionStore, InMemoryDefinitionStore, Instantiation, LookupOverride,
    MergedDefinition, Supplier, TypeRef,
};
#[cfg(feature = "diagnostics")]
pub use descriptors::BeanDescriptor;
pub use error::{BeanError, BeanResult, BoxError, SharedError};
pub use factory::{BeanFactory, BeanFactoryBuilder, Lookup, WeakBeanFactory, FACTORY_BEAN_PREFIX};
pub use key::{same_object, BeanObject, TypeKey};
pub use observer::{CreationObserver, CreationState, LoggingObserver};
pub use processor::{BeanPostProcessor, Capabilities};
pub use scope::{AutowireMode, DependencyCheck, Scope};
pub use traits::{
    AutowireCandidateResolver, BeanFactoryAware, BeanNameAware, DisposableBean, FactoryBean,
    InitializingBean, TypeRegistryAware,
};
pub use types::{
    BeanType, BeanTypeBuilder, ConstructorDescriptor, FactoryMethodDescriptor, MethodDescriptor,
    PropertyDescriptor, TypeRegistry, ValueType,
};
pub use value::{trait_object, Args, ConstructorArgs, DynamicValue, PropertyValue, PropertyValues, Value};
pub use wrapper::{BeanWrapper, PropertyError};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counter {
        start: Mutex<u32>,
    }

    fn counter_factory(scope: Scope) -> BeanFactory {
        BeanFactory::builder()
            .register_type(
                BeanType::of::<Counter>()
                    .default_constructor(Counter::default)
                    .value::<u32>("start", |c, v| *c.start.lock().unwrap() = v)
                    .build(),
            )
            .define(
                "counter",
                BeanDefinition::of::<Counter>()
                    .scope(scope)
                    .property("start", Value::literal("7")),
            )
            .build()
    }

    #[test]
    fn test_singleton_resolution() {
        let factory = counter_factory(Scope::Singleton);
        let a = factory.get_typed::<Counter>("counter").unwrap();
        let b = factory.get_typed::<Counter>("counter").unwrap();

        assert_eq!(*a.start.lock().unwrap(), 7);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.singleton_count(), 1);
    }

    #[test]
    fn test_prototype_resolution() {
        let factory = counter_factory(Scope::Prototype);
        let a = factory.get_typed::<Counter>("counter").unwrap();
        let b = factory.get_typed::<Counter>("counter").unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(factory.singleton_count(), 0);
    }

    #[test]
    fn test_missing_bean() {
        let factory = counter_factory(Scope::Singleton);
        let err = factory.get_bean("nope").unwrap_err();
        assert!(matches!(err, BeanError::NoSuchBean { ref bean_name } if bean_name == "nope"));
    }

    #[test]
    fn test_wrong_requested_type() {
        let factory = counter_factory(Scope::Singleton);
        let err = factory.get_typed::<String>("counter").unwrap_err();
        assert!(matches!(err, BeanError::NotOfRequiredType { .. }));
    }

    #[test]
    fn test_observer_sees_ready() {
        #[derive(Default)]
        struct Ready(AtomicUsize);
        impl CreationObserver for Ready {
            fn transition(&self, _bean: &str, _from: CreationState, to: CreationState) {
                if to == CreationState::Ready {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let ready = Arc::new(Ready::default());
        let factory = BeanFactory::builder()
            .register_type(BeanType::of::<Counter>().default_constructor(Counter::default).build())
            .define("counter", BeanDefinition::of::<Counter>())
            .observer(ready.clone())
            .build();

        factory.get_bean("counter").unwrap();
        factory.get_bean("counter").unwrap();
        assert_eq!(ready.0.load(Ordering::SeqCst), 1);
    }
}
