//! Beans that produce other objects.

use crate::error::BoxError;
use crate::key::{BeanObject, TypeKey};

/// A bean that is itself a factory for the object exposed under its name.
///
/// Requesting `name` returns the product; requesting `&name` returns the factory bean.
/// Singleton products are cached and post-processed like regular beans.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, BeanObject, BeanType, BoxError, FactoryBean, TypeKey};
/// use std::sync::Arc;
///
/// struct Client { url: String }
///
/// #[derive(Default)]
/// struct ClientFactory;
///
/// impl FactoryBean for ClientFactory {
///     fn produce(&self) -> Result<BeanObject, BoxError> {
///         Ok(Arc::new(Client { url: "http://localhost".into() }))
///     }
///
///     fn produced_type(&self) -> Option<TypeKey> {
///         Some(TypeKey::of::<Client>())
///     }
/// }
///
/// let factory = BeanFactory::builder()
///     .register_type(BeanType::of::<ClientFactory>().default_constructor(ClientFactory::default).factory_bean().build())
///     .define("client", BeanDefinition::of::<ClientFactory>())
///     .build();
///
/// assert_eq!(factory.get_typed::<Client>("client").unwrap().url, "http://localhost");
/// assert!(factory.get_typed::<ClientFactory>("&client").is_ok());
/// ```
pub trait FactoryBean: Send + Sync + 'static {
    fn produce(&self) -> Result<BeanObject, BoxError>;

    /// Type of the product, if known before producing it.
    fn produced_type(&self) -> Option<TypeKey> {
        None
    }

    /// Whether the product is shared; non-singleton products are produced per request.
    fn is_singleton(&self) -> bool {
        true
    }
}
