//! Type metadata standing in for runtime reflection.
//!
//! A [`BeanType`] describes everything the factory needs to know about a Rust type:
//! how to construct it, which properties it exposes, which callbacks it supports and
//! which trait objects it can be viewed as. Types are registered in a [`TypeRegistry`].

mod descriptor;
mod registry;

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

pub use descriptor::{
    ConstructorDescriptor, FactoryMethodDescriptor, MethodDescriptor, PropertyDescriptor,
    ValueType,
};
pub use registry::TypeRegistry;

use crate::error::BoxError;
use crate::factory::Lookup;
use crate::key::{BeanObject, TypeKey};
use crate::traits::{
    BeanFactoryAware, BeanNameAware, DisposableBean, FactoryBean, InitializingBean,
    TypeRegistryAware,
};
use crate::value::{trait_object, Args};

pub(crate) type NameAwareView = fn(&BeanObject) -> Option<&dyn BeanNameAware>;
pub(crate) type RegistryAwareView = fn(&BeanObject) -> Option<&dyn TypeRegistryAware>;
pub(crate) type FactoryAwareView = fn(&BeanObject) -> Option<&dyn BeanFactoryAware>;
pub(crate) type InitializingView = fn(&BeanObject) -> Option<&dyn InitializingBean>;
pub(crate) type DisposableView = fn(&BeanObject) -> Option<&dyn DisposableBean>;
pub(crate) type FactoryBeanView = fn(&BeanObject) -> Option<&dyn FactoryBean>;

pub(crate) type Upcast = Arc<dyn Fn(&BeanObject) -> Option<BeanObject> + Send + Sync>;
pub(crate) type Install = Arc<dyn Fn(&BeanObject, Lookup) -> Result<(), BoxError> + Send + Sync>;

/// Lifecycle contracts implemented by a type, as downcasting views.
#[derive(Clone, Copy, Default)]
pub(crate) struct Lifecycle {
    pub(crate) name_aware: Option<NameAwareView>,
    pub(crate) registry_aware: Option<RegistryAwareView>,
    pub(crate) factory_aware: Option<FactoryAwareView>,
    pub(crate) initializing: Option<InitializingView>,
    pub(crate) disposable: Option<DisposableView>,
    pub(crate) factory_bean: Option<FactoryBeanView>,
}

#[derive(Clone)]
pub(crate) struct LookupMethodDescriptor {
    pub(crate) name: String,
    pub(crate) install: Install,
}

/// Metadata record for a bean type.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanType, ValueType};
/// use std::sync::{Arc, Mutex};
///
/// trait Engine: Send + Sync {}
///
/// #[derive(Default)]
/// struct V8;
/// impl Engine for V8 {}
///
/// #[derive(Default)]
/// struct Car {
///     engine: Mutex<Option<Arc<dyn Engine>>>,
///     seats: Mutex<u8>,
/// }
///
/// let car = BeanType::of::<Car>()
///     .named("Car")
///     .default_constructor(Car::default)
///     .reference_trait::<dyn Engine>("engine", |car, e| *car.engine.lock().unwrap() = Some(e))
///     .value::<u8>("seats", |car, n| *car.seats.lock().unwrap() = n)
///     .build();
///
/// assert_eq!(car.alias(), Some("Car"));
/// assert!(car.property("seats").unwrap().value_type().is_simple());
/// assert!(!car.property("engine").unwrap().value_type().is_simple());
///
/// let v8 = BeanType::of::<V8>()
///     .default_constructor(V8::default)
///     .implements::<dyn Engine>(|v8| v8 as Arc<dyn Engine>)
///     .build();
/// assert!(v8.upcast_keys().any(|k| k == ferrous_beans::TypeKey::of_trait::<dyn Engine>()));
/// ```
#[derive(Clone)]
pub struct BeanType {
    pub(crate) key: TypeKey,
    pub(crate) alias: Option<String>,
    pub(crate) constructors: Vec<ConstructorDescriptor>,
    pub(crate) factory_methods: Vec<FactoryMethodDescriptor>,
    pub(crate) properties: Vec<PropertyDescriptor>,
    pub(crate) methods: Vec<MethodDescriptor>,
    pub(crate) lookup_methods: Vec<LookupMethodDescriptor>,
    pub(crate) upcasts: Vec<(TypeKey, Upcast)>,
    pub(crate) non_public: bool,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) produces: Option<TypeKey>,
}

impl BeanType {
    /// Starts describing the type `T`.
    pub fn of<T: Send + Sync + 'static>() -> BeanTypeBuilder<T> {
        BeanTypeBuilder {
            ty: BeanType {
                key: TypeKey::of::<T>(),
                alias: None,
                constructors: Vec::new(),
                factory_methods: Vec::new(),
                properties: Vec::new(),
                methods: Vec::new(),
                lookup_methods: Vec::new(),
                upcasts: Vec::new(),
                non_public: false,
                lifecycle: Lifecycle::default(),
                produces: None,
            },
            _marker: PhantomData,
        }
    }

    /// Bare record for an instance whose type was never registered.
    pub(crate) fn opaque(key: TypeKey) -> BeanType {
        BeanType {
            key,
            alias: None,
            constructors: Vec::new(),
            factory_methods: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            lookup_methods: Vec::new(),
            upcasts: Vec::new(),
            non_public: false,
            lifecycle: Lifecycle::default(),
            produces: None,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    /// Short name the type can be referred to by in definitions.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    pub fn default_constructor(&self) -> Option<usize> {
        self.constructors.iter().position(|c| c.params.is_empty())
    }

    pub fn factory_methods(&self) -> &[FactoryMethodDescriptor] {
        &self.factory_methods
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has_lookup_method(&self, name: &str) -> bool {
        self.lookup_methods.iter().any(|m| m.name == name)
    }

    pub(crate) fn lookup_method(&self, name: &str) -> Option<&LookupMethodDescriptor> {
        self.lookup_methods.iter().find(|m| m.name == name)
    }

    /// Trait objects this type can be injected as.
    pub fn upcast_keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.upcasts.iter().map(|(key, _)| *key)
    }

    pub(crate) fn upcast(&self, object: &BeanObject, target: TypeId) -> Option<BeanObject> {
        self.upcasts
            .iter()
            .find(|(key, _)| key.id() == target)
            .and_then(|(_, cast)| cast(object))
    }

    /// Whether instances of this type may be assigned to `target`.
    pub fn is_assignable_to(&self, target: &TypeKey) -> bool {
        target.is_object()
            || self.key == *target
            || self.upcasts.iter().any(|(key, _)| key == target)
    }

    pub fn is_non_public(&self) -> bool {
        self.non_public
    }

    pub fn is_factory_bean(&self) -> bool {
        self.lifecycle.factory_bean.is_some()
    }

    pub fn is_disposable(&self) -> bool {
        self.lifecycle.disposable.is_some()
    }

    /// Product type declared for a factory bean type, if known statically.
    pub fn produces(&self) -> Option<TypeKey> {
        self.produces
    }
}

impl fmt::Debug for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanType")
            .field("name", &self.key.name())
            .field("alias", &self.alias)
            .field("constructors", &self.constructors.len())
            .field("factory_methods", &self.factory_methods)
            .field("properties", &self.properties)
            .field("upcasts", &self.upcasts.iter().map(|(k, _)| k.name()).collect::<Vec<_>>())
            .finish()
    }
}

fn target_of<T: 'static>(object: &BeanObject) -> Result<&T, BoxError> {
    object.downcast_ref::<T>().ok_or_else(|| {
        format!("target object is not of type {}", std::any::type_name::<T>()).into()
    })
}

fn value_of<V: Send + Sync + 'static>(value: BeanObject, property: &str) -> Result<Arc<V>, BoxError> {
    value.downcast::<V>().map_err(|_| {
        format!(
            "value for property '{}' is not of type {}",
            property,
            std::any::type_name::<V>()
        )
        .into()
    })
}

fn name_aware<T: BeanNameAware + 'static>(o: &BeanObject) -> Option<&dyn BeanNameAware> {
    o.downcast_ref::<T>().map(|t| t as &dyn BeanNameAware)
}

fn registry_aware<T: TypeRegistryAware + 'static>(o: &BeanObject) -> Option<&dyn TypeRegistryAware> {
    o.downcast_ref::<T>().map(|t| t as &dyn TypeRegistryAware)
}

fn factory_aware<T: BeanFactoryAware + 'static>(o: &BeanObject) -> Option<&dyn BeanFactoryAware> {
    o.downcast_ref::<T>().map(|t| t as &dyn BeanFactoryAware)
}

fn initializing<T: InitializingBean + 'static>(o: &BeanObject) -> Option<&dyn InitializingBean> {
    o.downcast_ref::<T>().map(|t| t as &dyn InitializingBean)
}

fn disposable<T: DisposableBean + 'static>(o: &BeanObject) -> Option<&dyn DisposableBean> {
    o.downcast_ref::<T>().map(|t| t as &dyn DisposableBean)
}

fn factory_bean<T: FactoryBean + 'static>(o: &BeanObject) -> Option<&dyn FactoryBean> {
    o.downcast_ref::<T>().map(|t| t as &dyn FactoryBean)
}

/// Builder for [`BeanType`].
pub struct BeanTypeBuilder<T> {
    ty: BeanType,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> BeanTypeBuilder<T> {
    /// Registers a short name for the type, usable in [`crate::BeanDefinition::named_type`].
    pub fn named(mut self, alias: impl Into<String>) -> Self {
        self.ty.alias = Some(alias.into());
        self
    }

    pub fn default_constructor(self, f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.constructor(Vec::new(), move |_| Ok(f()))
    }

    pub fn constructor(
        mut self,
        params: Vec<ValueType>,
        f: impl Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.ty.constructors.push(ConstructorDescriptor {
            params,
            construct: Arc::new(move |args| f(args).map(|t| Arc::new(t) as BeanObject)),
        });
        self
    }

    /// A static factory method returning `R`.
    pub fn static_factory<R: Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        params: Vec<ValueType>,
        f: impl Fn(&mut Args) -> Result<R, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.ty.factory_methods.push(FactoryMethodDescriptor {
            name: name.into(),
            is_static: true,
            params,
            return_type: TypeKey::of::<R>(),
            invoke: Arc::new(move |_, args| f(args).map(|r| Arc::new(r) as BeanObject)),
        });
        self
    }

    /// A static factory method returning the trait object `R`.
    pub fn static_factory_trait<R: ?Sized + Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        params: Vec<ValueType>,
        f: impl Fn(&mut Args) -> Result<Arc<R>, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.ty.factory_methods.push(FactoryMethodDescriptor {
            name: name.into(),
            is_static: true,
            params,
            return_type: TypeKey::of_trait::<R>(),
            invoke: Arc::new(move |_, args| f(args).map(trait_object)),
        });
        self
    }

    /// A factory method invoked on an instance of `T` registered as a bean.
    pub fn instance_factory<R: Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        params: Vec<ValueType>,
        f: impl Fn(&T, &mut Args) -> Result<R, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.ty.factory_methods.push(FactoryMethodDescriptor {
            name: name.into(),
            is_static: false,
            params,
            return_type: TypeKey::of::<R>(),
            invoke: Arc::new(move |target, args| {
                let target = target.ok_or("no factory instance given")?;
                f(target_of::<T>(target)?, args).map(|r| Arc::new(r) as BeanObject)
            }),
        });
        self
    }

    /// A writable property receiving the converted value as a bean object.
    pub fn property(
        mut self,
        name: impl Into<String>,
        value_type: ValueType,
        set: impl Fn(&T, BeanObject) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.ty.properties.push(PropertyDescriptor {
            name: name.into(),
            value_type,
            setter: Some(Arc::new(move |target, value| set(target_of::<T>(target)?, value))),
            declared_by: None,
        });
        self
    }

    /// A property holding another bean of concrete type `D`.
    pub fn reference<D: Send + Sync + 'static>(
        self,
        name: &str,
        set: impl Fn(&T, Arc<D>) + Send + Sync + 'static,
    ) -> Self {
        let property = name.to_string();
        self.property(name, ValueType::bean::<D>(), move |t, value| {
            set(t, value_of::<D>(value, &property)?);
            Ok(())
        })
    }

    /// A property holding a bean exposed as the trait object `D`.
    pub fn reference_trait<D: ?Sized + Send + Sync + 'static>(
        self,
        name: &str,
        set: impl Fn(&T, Arc<D>) + Send + Sync + 'static,
    ) -> Self {
        let property = name.to_string();
        self.property(name, ValueType::of_trait::<D>(), move |t, value| {
            let value = value_of::<Arc<D>>(value, &property)?;
            set(t, Arc::clone(&value));
            Ok(())
        })
    }

    /// A simple-valued property parsed from strings.
    pub fn value<V>(self, name: &str, set: impl Fn(&T, V) + Send + Sync + 'static) -> Self
    where
        V: FromStr + Clone + Send + Sync + 'static,
        V::Err: std::error::Error + Send + Sync + 'static,
    {
        let property = name.to_string();
        self.property(name, ValueType::simple::<V>(), move |t, value| {
            set(t, (*value_of::<V>(value, &property)?).clone());
            Ok(())
        })
    }

    /// A property that is visible for introspection but cannot be set.
    pub fn read_only(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.ty.properties.push(PropertyDescriptor {
            name: name.into(),
            value_type,
            setter: None,
            declared_by: None,
        });
        self
    }

    /// Marks `property` as set through a callback of the trait `I`.
    ///
    /// Properties declared by an ignored dependency interface are neither autowired
    /// nor dependency-checked.
    pub fn declared_by<I: ?Sized + 'static>(mut self, property: &str) -> Self {
        if let Some(descriptor) = self.ty.properties.iter_mut().find(|p| p.name == property) {
            descriptor.declared_by = Some(TypeKey::of_trait::<I>());
        }
        self
    }

    /// A no-argument method usable as init or destroy callback.
    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.ty.methods.push(MethodDescriptor {
            name: name.into(),
            invoke: Arc::new(move |target| f(target_of::<T>(target)?)),
        });
        self
    }

    /// A method whose implementation is supplied by the factory as a bean lookup.
    pub fn lookup_method(
        mut self,
        name: impl Into<String>,
        install: impl Fn(&T, Lookup) + Send + Sync + 'static,
    ) -> Self {
        self.ty.lookup_methods.push(LookupMethodDescriptor {
            name: name.into(),
            install: Arc::new(move |target, lookup| {
                install(target_of::<T>(target)?, lookup);
                Ok(())
            }),
        });
        self
    }

    /// Declares that `T` can be injected wherever `D` is expected.
    pub fn implements<D: ?Sized + Send + Sync + 'static>(
        mut self,
        cast: impl Fn(Arc<T>) -> Arc<D> + Send + Sync + 'static,
    ) -> Self {
        let upcast: Upcast = Arc::new(move |object| {
            object
                .clone()
                .downcast::<T>()
                .ok()
                .map(|t| trait_object::<D>(cast(t)))
        });
        self.ty.upcasts.push((TypeKey::of_trait::<D>(), upcast));
        self
    }

    /// Marks the type's constructors as non-public.
    pub fn non_public(mut self) -> Self {
        self.ty.non_public = true;
        self
    }

    pub fn bean_name_aware(mut self) -> Self
    where
        T: BeanNameAware,
    {
        self.ty.lifecycle.name_aware = Some(name_aware::<T>);
        self
    }

    pub fn type_registry_aware(mut self) -> Self
    where
        T: TypeRegistryAware,
    {
        self.ty.lifecycle.registry_aware = Some(registry_aware::<T>);
        self
    }

    pub fn factory_aware(mut self) -> Self
    where
        T: BeanFactoryAware,
    {
        self.ty.lifecycle.factory_aware = Some(factory_aware::<T>);
        self
    }

    pub fn initializing(mut self) -> Self
    where
        T: InitializingBean,
    {
        self.ty.lifecycle.initializing = Some(initializing::<T>);
        self
    }

    pub fn disposable(mut self) -> Self
    where
        T: DisposableBean,
    {
        self.ty.lifecycle.disposable = Some(disposable::<T>);
        self
    }

    pub fn factory_bean(mut self) -> Self
    where
        T: FactoryBean,
    {
        self.ty.lifecycle.factory_bean = Some(factory_bean::<T>);
        self
    }

    /// Statically declares the product type of a factory bean.
    pub fn produces<P: ?Sized + 'static>(mut self) -> Self {
        self.ty.produces = Some(TypeKey::of::<P>());
        self
    }

    /// Statically declares a trait-object product type of a factory bean.
    pub fn produces_trait<P: ?Sized + 'static>(mut self) -> Self {
        self.ty.produces = Some(TypeKey::of_trait::<P>());
        self
    }

    pub fn build(self) -> BeanType {
        self.ty
    }
}
