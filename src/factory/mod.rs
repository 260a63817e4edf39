//! The bean factory: definitions in, fully wired and initialized beans out.
//!
//! The factory is split the way a creation flows:
//! - this module holds the container, its builder and the lookup entry points
//! - `create` runs one creation attempt end to end
//! - `instantiate` picks and invokes a supplier, factory method or constructor
//! - `populate` autowires and applies property values
//! - `initialize` delivers aware callbacks, init methods and initialization processors
//! - `factory_bean` dereferences factory beans and predicts bean types
//! - `existing` configures and destroys objects the factory does not manage

mod create;
mod existing;
mod factory_bean;
mod initialize;
mod instantiate;
mod populate;

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::FactoryConfig;
use crate::definition::{BeanDefinition, DefinitionStore, InMemoryDefinitionStore, MergedDefinition};
use crate::error::{BeanError, BeanResult};
use crate::internal::PrototypesInCreation;
use crate::key::{BeanObject, TypeKey};
use crate::observer::{CreationObserver, Observers};
use crate::processor::{BeanPostProcessor, ProcessorPipeline};
use crate::registry::SingletonRegistry;
use crate::traits::AutowireCandidateResolver;
use crate::types::{BeanType, PropertyDescriptor, TypeRegistry};
use crate::value::downcast_trait;
use crate::wrapper::BeanWrapper;

/// Prefix that asks for a factory bean itself rather than its product.
pub const FACTORY_BEAN_PREFIX: &str = "&";

pub(crate) fn transformed_name(name: &str) -> &str {
    name.trim_start_matches(FACTORY_BEAN_PREFIX)
}

pub(crate) fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_BEAN_PREFIX)
}

pub(crate) struct FactoryInner {
    pub(crate) config: FactoryConfig,
    pub(crate) types: Arc<TypeRegistry>,
    pub(crate) definitions: Box<dyn DefinitionStore>,
    pub(crate) singletons: SingletonRegistry,
    pub(crate) processors: ProcessorPipeline,
    pub(crate) prototypes: PrototypesInCreation,
    pub(crate) observers: Observers,
    pub(crate) candidate_resolver: Option<Arc<dyn AutowireCandidateResolver>>,
    /// Writable, non-ignored property names per type
    pub(crate) filtered_properties: DashMap<TypeId, Arc<[PropertyDescriptor]>>,
    /// Raw factory-bean instances created only to ask for their product type
    pub(crate) type_check_instances: Mutex<HashMap<String, BeanWrapper>>,
    pub(crate) type_checks_in_progress: Mutex<HashSet<String>>,
}

/// Bean factory creating, wiring and managing beans from their definitions.
///
/// Singletons are created once and shared; prototypes are created on every request.
/// Circular references between singletons populated through properties are resolved
/// by handing out early references to instances that are not fully initialized yet.
///
/// # Thread Safety
///
/// The factory is cheap to clone (it is an `Arc` internally) and safe to share across
/// threads. Singleton creation is serialized container-wide; finished singletons are
/// read without waiting on creation.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, Value};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Repository { url: Mutex<String> }
///
/// #[derive(Default)]
/// struct Service { repository: Mutex<Option<Arc<Repository>>> }
///
/// let factory = BeanFactory::builder()
///     .register_type(
///         BeanType::of::<Repository>()
///             .default_constructor(Repository::default)
///             .value::<String>("url", |r, url| *r.url.lock().unwrap() = url)
///             .build(),
///     )
///     .register_type(
///         BeanType::of::<Service>()
///             .default_constructor(Service::default)
///             .reference::<Repository>("repository", |s, r| *s.repository.lock().unwrap() = Some(r))
///             .build(),
///     )
///     .define("repository", BeanDefinition::of::<Repository>().property("url", Value::literal("postgres://db")))
///     .define("service", BeanDefinition::of::<Service>().property("repository", Value::reference("repository")))
///     .build();
///
/// let service = factory.get_typed::<Service>("service").unwrap();
/// let repository = service.repository.lock().unwrap().clone().unwrap();
/// assert_eq!(*repository.url.lock().unwrap(), "postgres://db");
/// assert!(Arc::ptr_eq(&repository, &factory.get_typed::<Repository>("repository").unwrap()));
/// ```
#[derive(Clone)]
pub struct BeanFactory {
    inner: Arc<FactoryInner>,
}

impl BeanFactory {
    pub fn builder() -> BeanFactoryBuilder {
        BeanFactoryBuilder::new()
    }

    /// Weak handle, for beans that need to call back into the factory.
    pub fn downgrade(&self) -> WeakBeanFactory {
        WeakBeanFactory {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns the bean registered under `name`, creating it if necessary.
    ///
    /// A name starting with `&` returns a factory bean itself instead of its product.
    pub fn get_bean(&self, name: &str) -> BeanResult<BeanObject> {
        self.do_get_bean(name, None)
    }

    /// Like [`get_bean`](Self::get_bean), passing explicit constructor or factory
    /// method arguments. The arguments are only used if the bean gets created.
    pub fn get_bean_with_args(&self, name: &str, args: Vec<BeanObject>) -> BeanResult<BeanObject> {
        self.do_get_bean(name, Some(args.as_slice()))
    }

    /// Returns the bean `name` downcast to its concrete type.
    pub fn get_typed<T: Send + Sync + 'static>(&self, name: &str) -> BeanResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        bean.downcast::<T>().map_err(|bean| BeanError::NotOfRequiredType {
            bean_name: name.to_string(),
            required: std::any::type_name::<T>(),
            actual: self.describe_type(&bean),
        })
    }

    /// Returns the bean `name` viewed as the trait object `T`.
    ///
    /// ```
    /// use ferrous_beans::{BeanDefinition, BeanFactory, BeanType};
    /// use std::sync::Arc;
    ///
    /// trait Greeter: Send + Sync { fn greet(&self) -> String; }
    ///
    /// #[derive(Default)]
    /// struct English;
    /// impl Greeter for English { fn greet(&self) -> String { "hello".into() } }
    ///
    /// let factory = BeanFactory::builder()
    ///     .register_type(
    ///         BeanType::of::<English>()
    ///             .default_constructor(English::default)
    ///             .implements::<dyn Greeter>(|e| e as Arc<dyn Greeter>)
    ///             .build(),
    ///     )
    ///     .define("greeter", BeanDefinition::of::<English>())
    ///     .build();
    ///
    /// let greeter = factory.get_trait::<dyn Greeter>("greeter").unwrap();
    /// assert_eq!(greeter.greet(), "hello");
    /// ```
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> BeanResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        self.inner
            .types
            .upcast(&bean, &TypeKey::of_trait::<T>())
            .and_then(|object| downcast_trait::<T>(&object))
            .ok_or_else(|| BeanError::NotOfRequiredType {
                bean_name: name.to_string(),
                required: std::any::type_name::<T>(),
                actual: self.describe_type(&bean),
            })
    }

    /// Returns the single bean whose type is `T`.
    pub fn get_by_type<T: Send + Sync + 'static>(&self) -> BeanResult<Arc<T>> {
        let key = TypeKey::of::<T>();
        let names = self.bean_names_for_type(&key)?;
        match names.as_slice() {
            [] => Err(BeanError::NoSuchBean {
                bean_name: key.name().to_string(),
            }),
            [name] => self.get_typed::<T>(name),
            _ => Err(BeanError::NoUniqueBean {
                type_name: key.name(),
                candidates: names,
            }),
        }
    }

    /// Names of all beans whose type, or factory-bean product type, is assignable to `target`.
    ///
    /// Abstract definitions are skipped, as are beans whose type cannot be determined
    /// because they are currently in creation.
    pub fn bean_names_for_type(&self, target: &TypeKey) -> BeanResult<Vec<String>> {
        let mut result = Vec::new();
        for name in self.inner.definitions.names() {
            let merged = self.inner.definitions.merged(&name)?;
            if merged.is_abstract() {
                continue;
            }
            match self.get_type(&name) {
                Ok(Some(key)) if self.inner.types.is_assignable(&key, target) => result.push(name),
                Ok(_) => {}
                Err(e) if e.is_currently_in_creation() => {
                    tracing::debug!(bean = %name, "Ignoring bean currently in creation during type match: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        for name in self.inner.singletons.names() {
            if result.contains(&name) || self.inner.definitions.contains(&name) {
                continue;
            }
            if let Some(Some(key)) = self.get_type(&name).ok() {
                if self.inner.types.is_assignable(&key, target) {
                    result.push(name);
                }
            }
        }
        Ok(result)
    }

    /// Whether a definition or a manually registered singleton exists under `name`.
    pub fn contains_bean(&self, name: &str) -> bool {
        let bean_name = transformed_name(name);
        let exists =
            self.inner.singletons.contains(bean_name) || self.inner.definitions.contains(bean_name);
        if !exists || !is_factory_dereference(name) {
            return exists;
        }
        self.is_factory_bean(bean_name).unwrap_or(false)
    }

    /// Whether `name` always returns the same instance.
    pub fn is_singleton(&self, name: &str) -> BeanResult<bool> {
        let bean_name = transformed_name(name);
        if let Some(instance) = self.inner.singletons.get(bean_name) {
            return Ok(match self.factory_bean_of(&instance) {
                Some(factory) if !is_factory_dereference(name) => factory.is_singleton(),
                _ => true,
            });
        }
        let merged = self.merged_definition(bean_name)?;
        if !merged.is_singleton() {
            return Ok(false);
        }
        if is_factory_dereference(name) || !self.is_factory_bean(bean_name)? {
            return Ok(true);
        }
        Ok(self
            .type_check_instance(bean_name, &merged)
            .and_then(|instance| self.factory_bean_of(&instance).map(|f| f.is_singleton()))
            .unwrap_or(true))
    }

    /// Registers a definition; a singleton already created under that name is destroyed.
    pub fn register_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()> {
        self.inner.definitions.register(name, definition)?;
        if self.inner.singletons.contains(name) || self.inner.singletons.is_disposable(name) {
            self.destroy_singleton(name);
        }
        self.inner.type_check_instances.lock().remove(name);
        Ok(())
    }

    pub fn remove_definition(&self, name: &str) -> BeanResult<BeanDefinition> {
        let removed = self.inner.definitions.remove(name)?;
        self.destroy_singleton(name);
        Ok(removed)
    }

    /// Registers an externally created object as a finished singleton.
    pub fn register_singleton(&self, name: &str, object: BeanObject) -> BeanResult<()> {
        self.inner.singletons.register_singleton(name, object)
    }

    /// Adds a processor; registering the same processor again moves it to the end.
    pub fn add_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.inner.processors.add(processor);
    }

    /// Eagerly creates every non-abstract, non-lazy singleton, in registration order.
    pub fn pre_instantiate_singletons(&self) -> BeanResult<()> {
        let names = self.inner.definitions.names();
        tracing::debug!(count = names.len(), "Pre-instantiating singletons");
        for name in names {
            let merged = self.inner.definitions.merged(&name)?;
            if merged.is_abstract() || !merged.is_singleton() || merged.is_lazy_init() {
                continue;
            }
            if self.is_factory_bean(&name)? {
                self.get_bean(&format!("{}{}", FACTORY_BEAN_PREFIX, name))?;
            } else {
                self.get_bean(&name)?;
            }
        }
        Ok(())
    }

    /// Destroys the singleton `name` and, before it, every bean depending on it.
    pub fn destroy_singleton(&self, name: &str) {
        self.inner.singletons.destroy_singleton(name);
        self.inner.type_check_instances.lock().remove(name);
    }

    /// Destroys all singletons in reverse registration order and clears every cache.
    pub fn destroy_singletons(&self) {
        self.inner.singletons.destroy_singletons();
        self.inner.type_check_instances.lock().clear();
    }

    pub fn bean_definition_names(&self) -> Vec<String> {
        self.inner.definitions.names()
    }

    /// Names of finished singletons, in registration order.
    pub fn singleton_names(&self) -> Vec<String> {
        self.inner.singletons.names()
    }

    pub fn singleton_count(&self) -> usize {
        self.inner.singletons.len()
    }

    /// Beans that were injected with `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.inner.singletons.dependents_of(name)
    }

    /// Beans that `name` was injected with.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.inner.singletons.dependencies_of(name)
    }

    pub fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.inner.types
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.inner.config
    }

    /// The flattened definition for `name`, parents merged in.
    pub fn merged_definition(&self, name: &str) -> BeanResult<Arc<MergedDefinition>> {
        if !self.inner.definitions.contains(name) {
            return Err(BeanError::NoSuchBean {
                bean_name: name.to_string(),
            });
        }
        self.inner.definitions.merged(name)
    }

    /// Number of destruction callbacks waiting for shutdown.
    pub fn pending_disposals(&self) -> usize {
        self.inner.singletons.pending_disposals()
    }

    fn do_get_bean(&self, name: &str, args: Option<&[BeanObject]>) -> BeanResult<BeanObject> {
        let bean_name = transformed_name(name);

        if args.is_none() {
            if let Some(shared) = self.inner.singletons.get_singleton(bean_name, true)? {
                if self.inner.singletons.is_in_creation(bean_name) {
                    tracing::trace!(
                        bean = bean_name,
                        "Returning eagerly cached instance of singleton bean that is not fully initialized yet"
                    );
                }
                let merged = self.inner.definitions.merged(bean_name).ok();
                return self.object_for_bean_instance(shared, name, bean_name, merged.as_deref());
            }
        }

        if self.inner.prototypes.is_in_creation(bean_name) {
            return Err(BeanError::CurrentlyInCreation {
                bean_name: bean_name.to_string(),
            });
        }

        let merged = self.merged_definition(bean_name)?;
        if merged.is_abstract() {
            return Err(BeanError::definition(
                bean_name,
                merged.resource_description(),
                "Bean definition is abstract",
            ));
        }

        for dependency in merged.depends_on() {
            if self.inner.singletons.is_dependent(bean_name, dependency) {
                return Err(BeanError::definition(
                    bean_name,
                    merged.resource_description(),
                    format!(
                        "Circular depends-on relationship between '{}' and '{}'",
                        bean_name, dependency
                    ),
                ));
            }
            self.inner.singletons.register_dependent(dependency, bean_name);
            self.get_bean(dependency).map_err(|e| {
                BeanError::creation_caused_by(
                    bean_name,
                    merged.resource_description(),
                    format!("'{}' depends on missing bean '{}'", bean_name, dependency),
                    e,
                )
            })?;
        }

        if merged.is_singleton() {
            let shared = self
                .inner
                .singletons
                .get_or_create(bean_name, || self.create_bean_with(bean_name, &merged, args))?;
            self.object_for_bean_instance(shared, name, bean_name, Some(&merged))
        } else {
            let prototype = {
                let _guard = self.inner.prototypes.enter(bean_name)?;
                self.create_bean_with(bean_name, &merged, args)?
            };
            self.object_for_bean_instance(prototype, name, bean_name, Some(&merged))
        }
    }

    /// Registered metadata for the concrete type of `object`.
    pub(crate) fn type_of_instance(&self, object: &BeanObject) -> Arc<BeanType> {
        let id = TypeKey::of_object(object);
        self.inner
            .types
            .get(id)
            .unwrap_or_else(|| Arc::new(BeanType::opaque(TypeKey::from_id(id))))
    }

    fn describe_type(&self, object: &BeanObject) -> String {
        self.type_of_instance(object).name().to_string()
    }

    /// Multi-line summary of definitions and singletons.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        crate::descriptors::debug_string(self)
    }
}

impl std::fmt::Debug for BeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanFactory")
            .field("definitions", &self.inner.definitions.names().len())
            .field("singletons", &self.inner.singletons.len())
            .field("processors", &self.inner.processors.len())
            .field("types", &self.inner.types.len())
            .finish()
    }
}

/// Non-owning handle to a [`BeanFactory`].
#[derive(Clone)]
pub struct WeakBeanFactory {
    inner: Weak<FactoryInner>,
}

impl WeakBeanFactory {
    pub fn upgrade(&self) -> Option<BeanFactory> {
        self.inner.upgrade().map(|inner| BeanFactory { inner })
    }

    /// Looks up a bean; fails with `CreationNotAllowed` once the factory is gone.
    pub fn get_bean(&self, name: &str) -> BeanResult<BeanObject> {
        self.upgrade()
            .ok_or_else(|| BeanError::CreationNotAllowed {
                bean_name: name.to_string(),
            })?
            .get_bean(name)
    }
}

impl std::fmt::Debug for WeakBeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakBeanFactory")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Implementation of a lookup method: every call fetches the target bean from the factory.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, Lookup};
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct Command;
///
/// #[derive(Default)]
/// struct Manager { command: Mutex<Option<Lookup>> }
///
/// impl Manager {
///     fn create_command(&self) -> std::sync::Arc<Command> {
///         let lookup = self.command.lock().unwrap().clone().unwrap();
///         lookup.get_typed::<Command>().unwrap()
///     }
/// }
///
/// let factory = BeanFactory::builder()
///     .register_type(BeanType::of::<Command>().default_constructor(Command::default).build())
///     .register_type(
///         BeanType::of::<Manager>()
///             .default_constructor(Manager::default)
///             .lookup_method("create_command", |m, lookup| *m.command.lock().unwrap() = Some(lookup))
///             .build(),
///     )
///     .define("command", BeanDefinition::of::<Command>().prototype())
///     .define("manager", BeanDefinition::of::<Manager>().lookup_method("create_command", "command"))
///     .build();
///
/// let manager = factory.get_typed::<Manager>("manager").unwrap();
/// assert!(!std::sync::Arc::ptr_eq(&manager.create_command(), &manager.create_command()));
/// ```
#[derive(Clone, Debug)]
pub struct Lookup {
    factory: WeakBeanFactory,
    bean_name: String,
}

impl Lookup {
    pub(crate) fn new(factory: WeakBeanFactory, bean_name: &str) -> Self {
        Lookup {
            factory,
            bean_name: bean_name.to_string(),
        }
    }

    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }

    pub fn get(&self) -> BeanResult<BeanObject> {
        self.factory.get_bean(&self.bean_name)
    }

    pub fn get_typed<T: Send + Sync + 'static>(&self) -> BeanResult<Arc<T>> {
        let factory = self
            .factory
            .upgrade()
            .ok_or_else(|| BeanError::CreationNotAllowed {
                bean_name: self.bean_name.clone(),
            })?;
        factory.get_typed::<T>(&self.bean_name)
    }
}

/// Builder for [`BeanFactory`].
pub struct BeanFactoryBuilder {
    config: FactoryConfig,
    types: Vec<BeanType>,
    definitions: Vec<(String, BeanDefinition)>,
    singletons: Vec<(String, BeanObject)>,
    processors: Vec<Arc<dyn BeanPostProcessor>>,
    observers: Observers,
    candidate_resolver: Option<Arc<dyn AutowireCandidateResolver>>,
    store: Option<Box<dyn DefinitionStore>>,
}

impl BeanFactoryBuilder {
    pub fn new() -> Self {
        BeanFactoryBuilder {
            config: FactoryConfig::default(),
            types: Vec::new(),
            definitions: Vec::new(),
            singletons: Vec::new(),
            processors: Vec::new(),
            observers: Observers::default(),
            candidate_resolver: None,
            store: None,
        }
    }

    pub fn config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register_type(mut self, bean_type: BeanType) -> Self {
        self.types.push(bean_type);
        self
    }

    pub fn define(mut self, name: impl Into<String>, definition: BeanDefinition) -> Self {
        self.definitions.push((name.into(), definition));
        self
    }

    pub fn singleton(mut self, name: impl Into<String>, object: BeanObject) -> Self {
        self.singletons.push((name.into(), object));
        self
    }

    pub fn processor(mut self, processor: Arc<dyn BeanPostProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn CreationObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn candidate_resolver(mut self, resolver: Arc<dyn AutowireCandidateResolver>) -> Self {
        self.candidate_resolver = Some(resolver);
        self
    }

    /// Replaces the in-memory definition store.
    pub fn definition_store(mut self, store: Box<dyn DefinitionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the factory, failing on the first rejected definition or singleton.
    pub fn try_build(self) -> BeanResult<BeanFactory> {
        let (factory, pending) = self.into_parts();
        for (name, definition) in pending.definitions {
            factory.register_definition(&name, definition)?;
        }
        for (name, object) in pending.singletons {
            factory.register_singleton(&name, object)?;
        }
        Ok(factory)
    }

    /// Builds the factory; rejected registrations are logged and skipped.
    pub fn build(self) -> BeanFactory {
        let (factory, pending) = self.into_parts();
        for (name, definition) in pending.definitions {
            if let Err(e) = factory.register_definition(&name, definition) {
                tracing::warn!(bean = %name, "Skipping bean definition: {}", e);
            }
        }
        for (name, object) in pending.singletons {
            if let Err(e) = factory.register_singleton(&name, object) {
                tracing::warn!(bean = %name, "Skipping singleton: {}", e);
            }
        }
        factory
    }

    fn into_parts(self) -> (BeanFactory, Pending) {
        let types = Arc::new(TypeRegistry::new());
        for bean_type in self.types {
            types.register(bean_type);
        }
        let definitions = self.store.unwrap_or_else(|| {
            Box::new(InMemoryDefinitionStore::new(
                self.config.allow_definition_overriding,
            ))
        });
        let processors = ProcessorPipeline::default();
        for processor in self.processors {
            processors.add(processor);
        }
        let inner = FactoryInner {
            config: self.config,
            types,
            definitions,
            singletons: SingletonRegistry::default(),
            processors,
            prototypes: PrototypesInCreation::default(),
            observers: self.observers,
            candidate_resolver: self.candidate_resolver,
            filtered_properties: DashMap::new(),
            type_check_instances: Mutex::new(HashMap::new()),
            type_checks_in_progress: Mutex::new(HashSet::new()),
        };
        tracing::debug!(
            types = inner.types.len(),
            processors = inner.processors.len(),
            "Building bean factory"
        );
        let factory = BeanFactory {
            inner: Arc::new(inner),
        };
        let pending = Pending {
            definitions: self.definitions,
            singletons: self.singletons,
        };
        (factory, pending)
    }
}

struct Pending {
    definitions: Vec<(String, BeanDefinition)>,
    singletons: Vec<(String, BeanObject)>,
}

impl Default for BeanFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
