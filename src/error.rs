//! Error types for the bean factory.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by user callbacks (constructors, setters, init methods, ...).
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Shared error used as the source of a [`BeanError`], keeping the error `Clone`.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Bean factory errors
///
/// Every variant carries the name of the bean the error belongs to and, where the
/// definition declared one, a human readable description of where it came from.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanError, BeanFactory};
///
/// let factory = BeanFactory::builder().build();
/// match factory.get_bean("missing") {
///     Err(BeanError::NoSuchBean { bean_name }) => assert_eq!(bean_name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_beans::BeanError;
///
/// let circular = BeanError::CircularExposure {
///     bean_name: "a".to_string(),
///     dependents: vec!["b".to_string()],
/// };
/// assert!(circular.to_string().contains("[b]"));
/// ```
#[derive(Debug, Clone, Error)]
pub enum BeanError {
    /// The definition itself is invalid: unresolvable type, bad method overrides, ...
    #[error("Invalid bean definition with name '{bean_name}'{}: {message}", describe(.resource))]
    Definition {
        bean_name: String,
        resource: Option<String>,
        message: String,
    },
    /// Creating the bean failed; registry state has been rolled back.
    #[error("Error creating bean with name '{bean_name}'{}: {message}", describe(.resource))]
    Creation {
        bean_name: String,
        resource: Option<String>,
        message: String,
        #[source]
        source: Option<SharedError>,
    },
    /// The bean was requested again while it is still being built and no early
    /// reference could be handed out.
    #[error("Error creating bean with name '{bean_name}': Requested bean is currently in creation: Is there an unresolvable circular reference?")]
    CurrentlyInCreation { bean_name: String },
    /// A required property or constructor argument could not be satisfied.
    #[error("Error creating bean with name '{bean_name}'{}: Unsatisfied dependency expressed through property '{property}': {message}", describe(.resource))]
    UnsatisfiedDependency {
        bean_name: String,
        resource: Option<String>,
        property: String,
        message: String,
        #[source]
        source: Option<SharedError>,
    },
    /// The raw early reference was injected into other beans, but the bean was wrapped
    /// afterwards, so those beans never see the final version.
    #[error("Bean with name '{bean_name}' has been injected into other beans [{}] in its raw version as part of a circular reference, but has eventually been wrapped", .dependents.join(", "))]
    CircularExposure {
        bean_name: String,
        dependents: Vec<String>,
    },
    /// An init callback (`after_properties_set` or a custom init method) failed.
    #[error("Error creating bean with name '{bean_name}'{}: {message}", describe(.resource))]
    Initialization {
        bean_name: String,
        resource: Option<String>,
        message: String,
        #[source]
        source: SharedError,
    },
    /// No definition and no manually registered singleton under that name.
    #[error("No bean named '{bean_name}' available")]
    NoSuchBean { bean_name: String },
    /// Several beans match a required type.
    #[error("No qualifying bean of type '{type_name}' available: expected single matching bean but found {}: {}", .candidates.len(), .candidates.join(","))]
    NoUniqueBean {
        type_name: &'static str,
        candidates: Vec<String>,
    },
    /// The bean exists but is not of the requested type.
    #[error("Bean named '{bean_name}' is expected to be of type '{required}' but was actually of type '{actual}'")]
    NotOfRequiredType {
        bean_name: String,
        required: &'static str,
        actual: String,
    },
    /// `&name` was requested for a bean that is not a factory bean.
    #[error("Bean named '{bean_name}' is expected to be a factory bean")]
    NotAFactory { bean_name: String },
    /// Singleton creation was requested while the factory is destroying its singletons.
    #[error("Error creating bean with name '{bean_name}': Singleton bean creation not allowed while singletons of this factory are in destruction")]
    CreationNotAllowed { bean_name: String },
}

fn describe(resource: &Option<String>) -> String {
    match resource {
        Some(resource) => format!(" defined in {}", resource),
        None => String::new(),
    }
}

impl BeanError {
    pub(crate) fn definition(
        bean_name: &str,
        resource: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        BeanError::Definition {
            bean_name: bean_name.to_string(),
            resource: resource.map(str::to_string),
            message: message.into(),
        }
    }

    pub(crate) fn creation(
        bean_name: &str,
        resource: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        BeanError::Creation {
            bean_name: bean_name.to_string(),
            resource: resource.map(str::to_string),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn creation_caused_by(
        bean_name: &str,
        resource: Option<&str>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        BeanError::Creation {
            bean_name: bean_name.to_string(),
            resource: resource.map(str::to_string),
            message: message.into(),
            source: Some(Arc::from(source.into())),
        }
    }

    pub(crate) fn unsatisfied(
        bean_name: &str,
        resource: Option<&str>,
        property: &str,
        message: impl Into<String>,
        source: Option<SharedError>,
    ) -> Self {
        BeanError::UnsatisfiedDependency {
            bean_name: bean_name.to_string(),
            resource: resource.map(str::to_string),
            property: property.to_string(),
            message: message.into(),
            source,
        }
    }

    /// Name of the bean this error was raised for, if any.
    pub fn bean_name(&self) -> Option<&str> {
        match self {
            BeanError::Definition { bean_name, .. }
            | BeanError::Creation { bean_name, .. }
            | BeanError::CurrentlyInCreation { bean_name }
            | BeanError::UnsatisfiedDependency { bean_name, .. }
            | BeanError::CircularExposure { bean_name, .. }
            | BeanError::Initialization { bean_name, .. }
            | BeanError::NoSuchBean { bean_name }
            | BeanError::NotOfRequiredType { bean_name, .. }
            | BeanError::NotAFactory { bean_name }
            | BeanError::CreationNotAllowed { bean_name } => Some(bean_name),
            BeanError::NoUniqueBean { .. } => None,
        }
    }

    /// Walks this error and its sources, returning the first bean error matching `pred`.
    ///
    /// ```rust
    /// use ferrous_beans::BeanError;
    /// use std::sync::Arc;
    ///
    /// let inner = BeanError::CurrentlyInCreation { bean_name: "a".into() };
    /// let outer = BeanError::Creation {
    ///     bean_name: "b".into(),
    ///     resource: None,
    ///     message: "Initialization of bean failed".into(),
    ///     source: Some(Arc::new(inner)),
    /// };
    /// let found = outer.find_cause(|e| matches!(e, BeanError::CurrentlyInCreation { .. }));
    /// assert_eq!(found.and_then(|e| e.bean_name()), Some("a"));
    /// ```
    pub fn find_cause(&self, pred: impl Fn(&BeanError) -> bool) -> Option<&BeanError> {
        let mut current: Option<&(dyn StdError + 'static)> = Some(self);
        while let Some(err) = current {
            // Shared sources delegate `source()` past their inner error, so unwrap them here.
            if let Some(shared) = err.downcast_ref::<SharedError>() {
                current = Some(&**shared);
                continue;
            }
            if let Some(bean_err) = err.downcast_ref::<BeanError>() {
                if pred(bean_err) {
                    return Some(bean_err);
                }
            }
            current = err.source();
        }
        None
    }

    /// True if this error, or any error it wraps, reports a bean currently in creation.
    pub fn is_currently_in_creation(&self) -> bool {
        self.find_cause(|e| matches!(e, BeanError::CurrentlyInCreation { .. }))
            .is_some()
    }
}

/// Result type for bean factory operations
///
/// A convenience alias for `Result<T, BeanError>` used throughout ferrous-beans.
///
/// ```rust
/// use ferrous_beans::{BeanResult, BeanError};
///
/// fn lookup() -> BeanResult<()> {
///     Err(BeanError::NoSuchBean { bean_name: "cache".into() })
/// }
/// assert!(lookup().is_err());
/// ```
pub type BeanResult<T> = Result<T, BeanError>;
