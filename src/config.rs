//! Factory configuration: built in code, read from the environment, or parsed from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::TypeKey;
use crate::traits::{BeanFactoryAware, BeanNameAware, TypeRegistryAware};

/// Prefix of the environment variables read by [`FactoryConfig::from_env`].
pub const ENV_PREFIX: &str = "FERROUS_BEANS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for configuration key '{key}': expected a boolean")]
    InvalidValue { key: String, value: String },
    #[cfg(feature = "config")]
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Behavior switches of a [`BeanFactory`](crate::BeanFactory)
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::FactoryConfig;
///
/// let config = FactoryConfig::default()
///     .allow_circular_references(false)
///     .ignore_dependency_type::<String>();
///
/// assert!(!config.allow_circular_references);
/// assert!(!config.allow_raw_injection_despite_wrapping);
/// assert!(config.is_ignored_dependency_type(&ferrous_beans::TypeKey::of::<String>()));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct FactoryConfig {
    /// Resolve field-level cycles between singletons through early references
    pub allow_circular_references: bool,
    /// Accept that a bean injected early differs from its final wrapped version
    pub allow_raw_injection_despite_wrapping: bool,
    /// Whether registering a definition under an existing name replaces it
    pub allow_definition_overriding: bool,
    /// Memoize filtered property descriptors per type
    pub cache_property_descriptors: bool,
    /// Types never autowired and never reported by dependency checks
    #[cfg_attr(feature = "config", serde(skip))]
    pub ignored_dependency_types: Vec<TypeKey>,
    /// Traits whose callback-set properties are never autowired nor dependency-checked.
    /// Holds the aware callbacks unless cleared.
    #[cfg_attr(feature = "config", serde(skip))]
    pub ignored_dependency_interfaces: Vec<TypeKey>,
}

fn aware_interfaces() -> Vec<TypeKey> {
    vec![
        TypeKey::of_trait::<dyn BeanNameAware>(),
        TypeKey::of_trait::<dyn TypeRegistryAware>(),
        TypeKey::of_trait::<dyn BeanFactoryAware>(),
    ]
}

impl Default for FactoryConfig {
    fn default() -> Self {
        FactoryConfig {
            allow_circular_references: true,
            allow_raw_injection_despite_wrapping: false,
            allow_definition_overriding: true,
            cache_property_descriptors: true,
            ignored_dependency_types: Vec::new(),
            ignored_dependency_interfaces: aware_interfaces(),
        }
    }
}

impl FactoryConfig {
    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    pub fn allow_raw_injection_despite_wrapping(mut self, allow: bool) -> Self {
        self.allow_raw_injection_despite_wrapping = allow;
        self
    }

    pub fn allow_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_definition_overriding = allow;
        self
    }

    pub fn cache_property_descriptors(mut self, cache: bool) -> Self {
        self.cache_property_descriptors = cache;
        self
    }

    pub fn ignore_dependency_type<T: 'static>(mut self) -> Self {
        self.ignored_dependency_types.push(TypeKey::of::<T>());
        self
    }

    pub fn ignore_dependency_trait<T: ?Sized + 'static>(mut self) -> Self {
        self.ignored_dependency_types.push(TypeKey::of_trait::<T>());
        self
    }

    pub fn is_ignored_dependency_type(&self, key: &TypeKey) -> bool {
        self.ignored_dependency_types.contains(key)
    }

    pub fn ignore_dependency_interface<I: ?Sized + 'static>(mut self) -> Self {
        self.ignored_dependency_interfaces.push(TypeKey::of_trait::<I>());
        self
    }

    pub fn is_ignored_dependency_interface(&self, key: &TypeKey) -> bool {
        self.ignored_dependency_interfaces.contains(key)
    }

    /// Defaults overridden by `FERROUS_BEANS_*` environment variables.
    ///
    /// Recognized: `ALLOW_CIRCULAR_REFERENCES`, `ALLOW_RAW_INJECTION_DESPITE_WRAPPING`,
    /// `ALLOW_DEFINITION_OVERRIDING`, `CACHE_PROPERTY_DESCRIPTORS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env(ENV_PREFIX)
    }

    /// Applies boolean overrides from environment variables named `{prefix}_{KEY}`.
    pub fn merge_env(mut self, prefix: &str) -> Result<Self, ConfigError> {
        let switches: [(&str, &mut bool); 4] = [
            ("ALLOW_CIRCULAR_REFERENCES", &mut self.allow_circular_references),
            (
                "ALLOW_RAW_INJECTION_DESPITE_WRAPPING",
                &mut self.allow_raw_injection_despite_wrapping,
            ),
            ("ALLOW_DEFINITION_OVERRIDING", &mut self.allow_definition_overriding),
            ("CACHE_PROPERTY_DESCRIPTORS", &mut self.cache_property_descriptors),
        ];
        for (key, slot) in switches {
            let name = format!("{}_{}", prefix.to_uppercase(), key);
            if let Ok(value) = env::var(&name) {
                *slot = parse_bool(&value).ok_or(ConfigError::InvalidValue {
                    key: name,
                    value,
                })?;
            }
        }
        Ok(self)
    }

    /// Parses a JSON object; missing keys keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
