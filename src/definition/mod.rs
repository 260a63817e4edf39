//! Bean definitions: how a bean is authored and how the factory sees it once merged.

mod store;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

pub use store::{DefinitionStore, InMemoryDefinitionStore};

use crate::error::BoxError;
use crate::key::{BeanObject, TypeKey};
use crate::scope::{AutowireMode, DependencyCheck, Scope};
use crate::types::BeanType;
use crate::value::{ConstructorArgs, PropertyValues, Value};

/// Callback producing the raw bean instance in place of a constructor.
pub type Supplier = Arc<dyn Fn() -> Result<BeanObject, BoxError> + Send + Sync>;

/// Reference to the type a definition creates.
#[derive(Clone, Debug)]
pub enum TypeRef {
    Key(TypeKey),
    /// Alias or full type name, resolved against the type registry on first use
    Named(String),
}

/// Replaces a method of the bean type with a lookup of another bean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupOverride {
    pub method: String,
    pub bean_name: String,
}

/// Declarative description of a bean
///
/// Built with chained setters. A definition with a `parent` inherits everything it does
/// not set itself; constructor arguments, property values and lookup overrides are
/// merged on top of the parent's.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{AutowireMode, BeanDefinition, Scope, Value};
///
/// #[derive(Default)]
/// struct Service;
///
/// let template = BeanDefinition::of::<Service>()
///     .scope(Scope::Prototype)
///     .property("timeout", Value::literal("30"))
///     .abstract_definition(true);
///
/// let concrete = BeanDefinition::child("template")
///     .property("retries", Value::literal("3"))
///     .autowire(AutowireMode::ByName)
///     .init_method("start");
///
/// assert!(template.is_abstract());
/// assert_eq!(concrete.parent_name(), Some("template"));
/// ```
#[derive(Clone)]
pub struct BeanDefinition {
    pub(crate) bean_type: Option<TypeRef>,
    pub(crate) parent: Option<String>,
    pub(crate) factory_bean: Option<String>,
    pub(crate) factory_method: Option<String>,
    pub(crate) scope: Option<Scope>,
    pub(crate) constructor_args: ConstructorArgs,
    pub(crate) properties: PropertyValues,
    pub(crate) autowire: AutowireMode,
    pub(crate) dependency_check: DependencyCheck,
    pub(crate) init_method: Option<String>,
    pub(crate) enforce_init_method: bool,
    pub(crate) destroy_method: Option<String>,
    pub(crate) enforce_destroy_method: bool,
    pub(crate) non_public_access: bool,
    pub(crate) synthetic: bool,
    pub(crate) lazy_init: Option<bool>,
    pub(crate) is_abstract: bool,
    pub(crate) depends_on: Vec<String>,
    pub(crate) lookup_overrides: Vec<LookupOverride>,
    pub(crate) supplier: Option<Supplier>,
    pub(crate) resource: Option<String>,
}

impl Default for BeanDefinition {
    fn default() -> Self {
        BeanDefinition {
            bean_type: None,
            parent: None,
            factory_bean: None,
            factory_method: None,
            scope: None,
            constructor_args: ConstructorArgs::new(),
            properties: PropertyValues::new(),
            autowire: AutowireMode::No,
            dependency_check: DependencyCheck::None,
            init_method: None,
            enforce_init_method: true,
            destroy_method: None,
            enforce_destroy_method: true,
            non_public_access: true,
            synthetic: false,
            lazy_init: None,
            is_abstract: false,
            depends_on: Vec::new(),
            lookup_overrides: Vec::new(),
            supplier: None,
            resource: None,
        }
    }
}

impl BeanDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Definition creating a bean of type `T`.
    pub fn of<T: 'static>() -> Self {
        BeanDefinition {
            bean_type: Some(TypeRef::Key(TypeKey::of::<T>())),
            ..Self::default()
        }
    }

    pub(crate) fn of_key(key: TypeKey) -> Self {
        BeanDefinition {
            bean_type: Some(TypeRef::Key(key)),
            ..Self::default()
        }
    }

    /// Definition creating a bean whose type is looked up by alias or type name.
    pub fn named_type(name: impl Into<String>) -> Self {
        BeanDefinition {
            bean_type: Some(TypeRef::Named(name.into())),
            ..Self::default()
        }
    }

    /// Definition inheriting from the definition registered as `parent`.
    pub fn child(parent: impl Into<String>) -> Self {
        BeanDefinition {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    /// Definition whose raw instance comes from `supplier`.
    pub fn from_supplier<T: Send + Sync + 'static>(
        supplier: impl Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    ) -> Self {
        BeanDefinition {
            bean_type: Some(TypeRef::Key(TypeKey::of::<T>())),
            supplier: Some(Arc::new(move || supplier().map(|t| Arc::new(t) as BeanObject))),
            ..Self::default()
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    /// Static factory method on the definition's own type.
    pub fn factory_method(mut self, method: impl Into<String>) -> Self {
        self.factory_method = Some(method.into());
        self
    }

    /// Instance factory method invoked on the bean named `factory_bean`.
    pub fn factory_bean_method(
        mut self,
        factory_bean: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        self.factory_bean = Some(factory_bean.into());
        self.factory_method = Some(method.into());
        self
    }

    pub fn constructor_arg(mut self, index: usize, value: Value) -> Self {
        self.constructor_args.add_indexed(index, value);
        self
    }

    pub fn generic_arg(mut self, value: Value) -> Self {
        self.constructor_args.add_generic(value);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.add(name, value);
        self
    }

    pub fn autowire(mut self, mode: AutowireMode) -> Self {
        self.autowire = mode;
        self
    }

    pub fn dependency_check(mut self, check: DependencyCheck) -> Self {
        self.dependency_check = check;
        self
    }

    pub fn init_method(mut self, name: impl Into<String>) -> Self {
        self.init_method = Some(name.into());
        self
    }

    /// Whether a missing init method is an error (default) or silently skipped.
    pub fn enforce_init_method(mut self, enforce: bool) -> Self {
        self.enforce_init_method = enforce;
        self
    }

    pub fn destroy_method(mut self, name: impl Into<String>) -> Self {
        self.destroy_method = Some(name.into());
        self
    }

    pub fn enforce_destroy_method(mut self, enforce: bool) -> Self {
        self.enforce_destroy_method = enforce;
        self
    }

    /// Whether non-public constructors and factory methods may be used.
    pub fn non_public_access(mut self, allowed: bool) -> Self {
        self.non_public_access = allowed;
        self
    }

    /// Synthetic beans are infrastructure: initialization processors skip them.
    pub fn synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    pub fn lazy_init(mut self, lazy: bool) -> Self {
        self.lazy_init = Some(lazy);
        self
    }

    pub fn abstract_definition(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn lookup_method(mut self, method: impl Into<String>, bean_name: impl Into<String>) -> Self {
        self.lookup_overrides.push(LookupOverride {
            method: method.into(),
            bean_name: bean_name.into(),
        });
        self
    }

    pub fn supplier(
        mut self,
        supplier: impl Fn() -> Result<BeanObject, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.supplier = Some(Arc::new(supplier));
        self
    }

    /// Description of where the definition came from, used in error messages.
    pub fn resource(mut self, description: impl Into<String>) -> Self {
        self.resource = Some(description.into());
        self
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Applies the settings of a child definition on top of this one.
    pub(crate) fn override_from(&mut self, child: &BeanDefinition) {
        if child.bean_type.is_some() {
            self.bean_type = child.bean_type.clone();
        }
        if child.factory_bean.is_some() {
            self.factory_bean = child.factory_bean.clone();
        }
        if child.factory_method.is_some() {
            self.factory_method = child.factory_method.clone();
        }
        if child.scope.is_some() {
            self.scope = child.scope;
        }
        if child.lazy_init.is_some() {
            self.lazy_init = child.lazy_init;
        }
        if child.init_method.is_some() {
            self.init_method = child.init_method.clone();
            self.enforce_init_method = child.enforce_init_method;
        }
        if child.destroy_method.is_some() {
            self.destroy_method = child.destroy_method.clone();
            self.enforce_destroy_method = child.enforce_destroy_method;
        }
        if child.supplier.is_some() {
            self.supplier = child.supplier.clone();
        }
        self.constructor_args.merge_from(&child.constructor_args);
        self.properties.merge_from(&child.properties);
        for lookup in &child.lookup_overrides {
            self.lookup_overrides.retain(|l| l.method != lookup.method);
            self.lookup_overrides.push(lookup.clone());
        }
        self.autowire = child.autowire;
        self.dependency_check = child.dependency_check;
        self.depends_on = child.depends_on.clone();
        self.non_public_access = child.non_public_access;
        self.synthetic = child.synthetic;
        self.is_abstract = child.is_abstract;
        self.resource = child.resource.clone();
        self.parent = None;
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("bean_type", &self.bean_type)
            .field("parent", &self.parent)
            .field("factory_bean", &self.factory_bean)
            .field("factory_method", &self.factory_method)
            .field("scope", &self.scope)
            .field("autowire", &self.autowire)
            .field("properties", &self.properties.len())
            .field("abstract", &self.is_abstract)
            .field("has_supplier", &self.supplier.is_some())
            .finish()
    }
}

/// How a definition's raw instance gets produced, once resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instantiation {
    Supplier,
    /// Index into the factory type's factory methods
    FactoryMethod { index: usize },
    /// Index into the bean type's constructors, arguments resolved per instance
    AutowiredConstructor { index: usize },
    DefaultConstructor { index: usize },
}

/// Resolution results cached on a merged definition, each computed at most once.
#[derive(Default)]
pub(crate) struct ResolutionCache {
    pub(crate) resolved_type: Option<Arc<BeanType>>,
    pub(crate) instantiation: Option<Instantiation>,
    pub(crate) target_type: Option<Option<TypeKey>>,
    pub(crate) factory_method_return: Option<Option<TypeKey>>,
    /// Converted literal per property, with the literal it was converted from
    pub(crate) converted_properties: HashMap<String, (String, BeanObject)>,
    pub(crate) post_processed: bool,
    pub(crate) before_instantiation_resolved: Option<bool>,
    pub(crate) is_factory_bean: Option<bool>,
    pub(crate) externally_managed_init: Vec<String>,
    pub(crate) externally_managed_destroy: Vec<String>,
}

/// Flattened definition served to the factory, with its resolution cache.
pub struct MergedDefinition {
    name: String,
    definition: BeanDefinition,
    cache: Mutex<ResolutionCache>,
    pub(crate) post_processing: Mutex<()>,
}

impl MergedDefinition {
    pub(crate) fn new(name: &str, definition: BeanDefinition) -> Self {
        MergedDefinition {
            name: name.to_string(),
            definition,
            cache: Mutex::new(ResolutionCache::default()),
            post_processing: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bean_type(&self) -> Option<&TypeRef> {
        self.definition.bean_type.as_ref()
    }

    pub fn scope(&self) -> Scope {
        self.definition.scope.unwrap_or_default()
    }

    pub fn is_singleton(&self) -> bool {
        self.scope() == Scope::Singleton
    }

    pub fn is_prototype(&self) -> bool {
        self.scope() == Scope::Prototype
    }

    pub fn factory_bean_name(&self) -> Option<&str> {
        self.definition.factory_bean.as_deref()
    }

    pub fn factory_method_name(&self) -> Option<&str> {
        self.definition.factory_method.as_deref()
    }

    pub fn constructor_args(&self) -> &ConstructorArgs {
        &self.definition.constructor_args
    }

    pub fn has_constructor_args(&self) -> bool {
        !self.definition.constructor_args.is_empty()
    }

    pub fn properties(&self) -> &PropertyValues {
        &self.definition.properties
    }

    pub fn autowire(&self) -> AutowireMode {
        self.definition.autowire
    }

    pub fn dependency_check(&self) -> DependencyCheck {
        self.definition.dependency_check
    }

    pub fn init_method(&self) -> Option<&str> {
        self.definition.init_method.as_deref()
    }

    pub fn enforces_init_method(&self) -> bool {
        self.definition.enforce_init_method
    }

    pub fn destroy_method(&self) -> Option<&str> {
        self.definition.destroy_method.as_deref()
    }

    pub fn enforces_destroy_method(&self) -> bool {
        self.definition.enforce_destroy_method
    }

    pub fn is_non_public_access_allowed(&self) -> bool {
        self.definition.non_public_access
    }

    pub fn is_synthetic(&self) -> bool {
        self.definition.synthetic
    }

    pub fn is_lazy_init(&self) -> bool {
        self.definition.lazy_init.unwrap_or(false)
    }

    pub fn is_abstract(&self) -> bool {
        self.definition.is_abstract
    }

    pub fn depends_on(&self) -> &[String] {
        &self.definition.depends_on
    }

    pub fn lookup_overrides(&self) -> &[LookupOverride] {
        &self.definition.lookup_overrides
    }

    pub(crate) fn supplier(&self) -> Option<&Supplier> {
        self.definition.supplier.as_ref()
    }

    pub fn resource_description(&self) -> Option<&str> {
        self.definition.resource.as_deref()
    }

    /// Marks an init method as invoked by someone else; the factory will skip it.
    pub fn register_externally_managed_init_method(&self, method: &str) {
        let mut cache = self.cache.lock();
        if !cache.externally_managed_init.iter().any(|m| m == method) {
            cache.externally_managed_init.push(method.to_string());
        }
    }

    pub fn is_externally_managed_init_method(&self, method: &str) -> bool {
        self.cache.lock().externally_managed_init.iter().any(|m| m == method)
    }

    pub fn register_externally_managed_destroy_method(&self, method: &str) {
        let mut cache = self.cache.lock();
        if !cache.externally_managed_destroy.iter().any(|m| m == method) {
            cache.externally_managed_destroy.push(method.to_string());
        }
    }

    pub fn is_externally_managed_destroy_method(&self, method: &str) -> bool {
        self.cache
            .lock()
            .externally_managed_destroy
            .iter()
            .any(|m| m == method)
    }

    /// The cached instantiation strategy, once resolved.
    pub fn resolved_instantiation(&self) -> Option<Instantiation> {
        self.cache.lock().instantiation
    }

    pub(crate) fn cache(&self) -> MutexGuard<'_, ResolutionCache> {
        self.cache.lock()
    }
}

impl fmt::Debug for MergedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedDefinition")
            .field("name", &self.name)
            .field("definition", &self.definition)
            .finish()
    }
}
