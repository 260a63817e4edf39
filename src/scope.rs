//! Bean scope, autowire mode and dependency-check definitions.

/// Bean scopes controlling instance sharing
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, Scope};
///
/// #[derive(Default)]
/// struct Counter;
///
/// let factory = BeanFactory::builder()
///     .register_type(BeanType::of::<Counter>().default_constructor(Counter::default).build())
///     .define("shared", BeanDefinition::of::<Counter>())
///     .define("fresh", BeanDefinition::of::<Counter>().scope(Scope::Prototype))
///     .build();
///
/// let a = factory.get_typed::<Counter>("shared").unwrap();
/// let b = factory.get_typed::<Counter>("shared").unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
///
/// let c = factory.get_typed::<Counter>("fresh").unwrap();
/// let d = factory.get_typed::<Counter>("fresh").unwrap();
/// assert!(!std::sync::Arc::ptr_eq(&c, &d));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Scope {
    /// Single shared instance per factory, created once and cached
    ///
    /// Singletons take part in early reference exposure, so field-level cycles between
    /// singletons can be resolved.
    #[default]
    Singleton,
    /// New instance per request, never cached
    ///
    /// Prototype creation is tracked per thread only; a prototype that needs itself
    /// while being built fails fast.
    Prototype,
}

/// How unset properties and constructor arguments get filled from other beans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum AutowireMode {
    /// Only explicit values are applied
    #[default]
    No,
    /// A property is injected with the bean of the same name, if one exists
    ByName,
    /// A property is injected with the single bean matching its type
    ByType,
    /// Constructor arguments are resolved by type
    Constructor,
}

/// Which unset properties count as a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum DependencyCheck {
    #[default]
    None,
    /// References to other beans must all be set
    Objects,
    /// Simple values (numbers, strings, ...) must all be set
    Simple,
    /// Every writable property must be set
    All,
}

impl DependencyCheck {
    /// Whether an unset property of the given simplicity violates this check.
    pub fn is_violated_by(&self, simple: bool) -> bool {
        match self {
            DependencyCheck::None => false,
            DependencyCheck::Objects => !simple,
            DependencyCheck::Simple => simple,
            DependencyCheck::All => true,
        }
    }
}
