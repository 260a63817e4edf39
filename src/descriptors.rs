//! Bean descriptors for introspection and diagnostics.

use std::fmt::Write as _;

use crate::definition::TypeRef;
use crate::factory::BeanFactory;
use crate::scope::Scope;

/// Snapshot of one bean definition and its singleton state
///
/// Useful for startup health checks, debugging wiring problems and dumping the
/// container's configuration.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, Scope};
///
/// #[derive(Default)]
/// struct Cache;
///
/// let factory = BeanFactory::builder()
///     .register_type(BeanType::of::<Cache>().default_constructor(Cache::default).build())
///     .define("cache", BeanDefinition::of::<Cache>())
///     .define("scratch", BeanDefinition::of::<Cache>().prototype())
///     .build();
/// factory.pre_instantiate_singletons().unwrap();
///
/// let descriptors = factory.bean_descriptors();
/// let cache = descriptors.iter().find(|d| d.name == "cache").unwrap();
/// assert!(cache.instantiated);
/// assert_eq!(cache.scope, Scope::Singleton);
///
/// let scratch = descriptors.iter().find(|d| d.name == "scratch").unwrap();
/// assert!(!scratch.instantiated);
/// ```
#[derive(Debug, Clone)]
pub struct BeanDescriptor {
    pub name: String,
    /// Declared type, if the definition names one
    pub type_name: Option<String>,
    pub scope: Scope,
    pub is_abstract: bool,
    pub is_lazy_init: bool,
    /// Whether a finished singleton instance exists
    pub instantiated: bool,
    pub depends_on: Vec<String>,
    /// Beans registered as depending on this one
    pub dependents: Vec<String>,
}

impl BeanFactory {
    /// Descriptors of all definitions, in registration order.
    ///
    /// Definitions that fail to merge are skipped.
    pub fn bean_descriptors(&self) -> Vec<BeanDescriptor> {
        let singletons = self.singleton_names();
        self.bean_definition_names()
            .into_iter()
            .filter_map(|name| {
                let merged = self.merged_definition(&name).ok()?;
                let type_name = merged.bean_type().map(|t| match t {
                    TypeRef::Key(key) => key.name().to_string(),
                    TypeRef::Named(name) => name.clone(),
                });
                Some(BeanDescriptor {
                    instantiated: singletons.contains(&name),
                    dependents: self.dependents_of(&name),
                    type_name,
                    scope: merged.scope(),
                    is_abstract: merged.is_abstract(),
                    is_lazy_init: merged.is_lazy_init(),
                    depends_on: merged.depends_on().to_vec(),
                    name,
                })
            })
            .collect()
    }
}

pub(crate) fn debug_string(factory: &BeanFactory) -> String {
    let mut out = String::new();
    let descriptors = factory.bean_descriptors();
    let _ = writeln!(out, "BeanFactory ({} definitions)", descriptors.len());
    for d in &descriptors {
        let _ = write!(
            out,
            "  {} [{:?}] type={}",
            d.name,
            d.scope,
            d.type_name.as_deref().unwrap_or("?")
        );
        if d.is_abstract {
            out.push_str(" abstract");
        }
        if d.is_lazy_init {
            out.push_str(" lazy");
        }
        if d.instantiated {
            out.push_str(" instantiated");
        }
        if !d.depends_on.is_empty() {
            let _ = write!(out, " depends-on={}", d.depends_on.join(","));
        }
        out.push('\n');
    }

    let manual: Vec<String> = factory
        .singleton_names()
        .into_iter()
        .filter(|name| !descriptors.iter().any(|d| &d.name == name))
        .collect();
    if !manual.is_empty() {
        let _ = writeln!(out, "Registered singletons: {}", manual.join(", "));
    }
    out
}
