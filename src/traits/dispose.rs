//! Initialization and disposal callbacks.

use crate::error::BoxError;

/// Callback invoked once all properties of a bean have been set.
///
/// Runs after the before-initialization processors and before any custom init method.
/// An error fails the creation of the bean.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, BoxError, InitializingBean};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Pool { ready: AtomicBool }
///
/// impl InitializingBean for Pool {
///     fn after_properties_set(&self) -> Result<(), BoxError> {
///         self.ready.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let factory = BeanFactory::builder()
///     .register_type(BeanType::of::<Pool>().default_constructor(Pool::default).initializing().build())
///     .define("pool", BeanDefinition::of::<Pool>())
///     .build();
///
/// assert!(factory.get_typed::<Pool>("pool").unwrap().ready.load(Ordering::SeqCst));
/// ```
pub trait InitializingBean: Send + Sync + 'static {
    fn after_properties_set(&self) -> Result<(), BoxError>;
}

/// Callback invoked when the factory destroys a singleton.
///
/// Destruction runs in reverse registration order, dependents first. Errors are logged
/// and do not stop the destruction of other beans.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, BoxError, DisposableBean};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// static CLOSED: AtomicBool = AtomicBool::new(false);
///
/// #[derive(Default)]
/// struct Connection;
///
/// impl DisposableBean for Connection {
///     fn destroy(&self) -> Result<(), BoxError> {
///         CLOSED.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let factory = BeanFactory::builder()
///     .register_type(BeanType::of::<Connection>().default_constructor(Connection::default).disposable().build())
///     .define("connection", BeanDefinition::of::<Connection>())
///     .build();
///
/// factory.get_bean("connection").unwrap();
/// factory.destroy_singletons();
/// assert!(CLOSED.load(Ordering::SeqCst));
/// ```
pub trait DisposableBean: Send + Sync + 'static {
    fn destroy(&self) -> Result<(), BoxError>;
}
