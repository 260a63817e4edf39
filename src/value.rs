//! Property and constructor argument values as authored on a definition.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::key::{BeanObject, TypeKey};

/// Producer of a string value evaluated for every instance.
#[derive(Clone)]
pub struct DynamicValue(Arc<dyn Fn() -> String + Send + Sync>);

impl DynamicValue {
    pub fn new(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        DynamicValue(Arc::new(f))
    }

    pub(crate) fn evaluate(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DynamicValue(..)")
    }
}

/// A value supplied for a property or constructor argument.
///
/// Literals are converted to the target type once per definition and cached; dynamic
/// values and references are resolved again for every instance.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::Value;
///
/// let port = Value::literal("8080");
/// assert!(port.is_cacheable());
///
/// let reference = Value::reference("dataSource");
/// assert!(!reference.is_cacheable());
/// ```
#[derive(Clone, Debug)]
pub enum Value {
    /// String form, converted to the declared type
    Literal(String),
    /// String computed at resolution time, converted per instance
    Dynamic(DynamicValue),
    /// Reference to another bean by name
    Ref(String),
    /// Ready-made object, injected as is (or upcast to the declared trait)
    Object(BeanObject),
}

impl Value {
    pub fn literal(value: impl Into<String>) -> Self {
        Value::Literal(value.into())
    }

    pub fn dynamic(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Value::Dynamic(DynamicValue::new(f))
    }

    pub fn reference(bean_name: impl Into<String>) -> Self {
        Value::Ref(bean_name.into())
    }

    pub fn object<T: Send + Sync + 'static>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    /// Whether the converted form of this value may be cached on the definition.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Value::Literal(_))
    }
}

/// A named property value.
#[derive(Clone, Debug)]
pub struct PropertyValue {
    pub name: String,
    pub value: Value,
}

/// Ordered set of property values, at most one per property name.
#[derive(Clone, Debug, Default)]
pub struct PropertyValues {
    values: Vec<PropertyValue>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any earlier value for it.
    pub fn add(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.values.iter_mut().find(|pv| pv.name == name) {
            Some(existing) => existing.value = value,
            None => self.values.push(PropertyValue { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|pv| pv.name == name).map(|pv| &pv.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|pv| pv.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.values.iter().position(|pv| pv.name == name)?;
        Some(self.values.remove(pos).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlays `other` on top of these values.
    pub(crate) fn merge_from(&mut self, other: &PropertyValues) {
        for pv in &other.values {
            self.add(pv.name.clone(), pv.value.clone());
        }
    }
}

/// Constructor or factory-method arguments: positional plus untyped generic values.
#[derive(Clone, Debug, Default)]
pub struct ConstructorArgs {
    indexed: BTreeMap<usize, Value>,
    generic: Vec<Value>,
}

impl ConstructorArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_indexed(&mut self, index: usize, value: Value) {
        self.indexed.insert(index, value);
    }

    pub fn add_generic(&mut self, value: Value) {
        self.generic.push(value);
    }

    pub fn indexed(&self, index: usize) -> Option<&Value> {
        self.indexed.get(&index)
    }

    pub fn generic(&self) -> &[Value] {
        &self.generic
    }

    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.generic.is_empty()
    }

    /// Minimum number of parameters a constructor needs to accept these arguments.
    pub fn count(&self) -> usize {
        let positional = self.indexed.keys().next_back().map_or(0, |max| max + 1);
        positional.max(self.indexed.len() + self.generic.len())
    }

    pub(crate) fn merge_from(&mut self, other: &ConstructorArgs) {
        for (index, value) in &other.indexed {
            self.indexed.insert(*index, value.clone());
        }
        self.generic.extend(other.generic.iter().cloned());
    }
}

/// Resolved arguments handed to a constructor or factory method, read front to back.
///
/// ```rust
/// use ferrous_beans::{BeanFactory, BeanDefinition, BeanType, Value, ValueType};
///
/// struct Pool { size: u32 }
///
/// let factory = BeanFactory::builder()
///     .register_type(
///         BeanType::of::<Pool>()
///             .constructor(vec![ValueType::simple::<u32>()], |args| {
///                 Ok(Pool { size: args.value::<u32>()? })
///             })
///             .build(),
///     )
///     .define("pool", BeanDefinition::of::<Pool>().constructor_arg(0, Value::literal("8")))
///     .build();
///
/// assert_eq!(factory.get_typed::<Pool>("pool").unwrap().size, 8);
/// ```
pub struct Args {
    values: std::vec::IntoIter<BeanObject>,
    position: usize,
}

impl Args {
    pub(crate) fn new(values: Vec<BeanObject>) -> Self {
        Args {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Number of arguments not read yet.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    pub fn next_object(&mut self) -> Result<BeanObject, BoxError> {
        let position = self.position;
        self.position += 1;
        self.values
            .next()
            .ok_or_else(|| format!("missing argument #{}", position).into())
    }

    /// Next argument as a shared concrete value.
    pub fn next<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, BoxError> {
        let position = self.position;
        self.next_object()?
            .downcast::<T>()
            .map_err(|_| mismatch::<T>(position))
    }

    /// Next argument as a trait object.
    pub fn next_trait<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<T>, BoxError> {
        let position = self.position;
        let object = self.next_object()?;
        downcast_trait::<T>(&object).ok_or_else(|| mismatch::<T>(position))
    }

    /// Next argument cloned out of its shared value.
    pub fn value<T: Clone + Send + Sync + 'static>(&mut self) -> Result<T, BoxError> {
        let position = self.position;
        let object = self.next_object()?;
        object
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| mismatch::<T>(position))
    }
}

fn mismatch<T: ?Sized>(position: usize) -> BoxError {
    format!(
        "argument #{} is not of type {}",
        position,
        std::any::type_name::<T>()
    )
    .into()
}

/// Trait objects are stored as `Arc<dyn Trait>` inside the bean object.
pub(crate) fn downcast_trait<T: ?Sized + Send + Sync + 'static>(object: &BeanObject) -> Option<Arc<T>> {
    object.downcast_ref::<Arc<T>>().cloned()
}

/// Wraps a trait object so that it downcasts under [`TypeKey::of_trait`].
pub fn trait_object<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> BeanObject {
    debug_assert_eq!(
        TypeKey::of_trait::<T>().id(),
        std::any::TypeId::of::<Arc<T>>()
    );
    Arc::new(value)
}
