//! Descriptors for the members of a bean type.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::BoxError;
use crate::key::{BeanObject, TypeKey};
use crate::value::Args;

pub(crate) type Parser = fn(&str) -> Result<BeanObject, BoxError>;
pub(crate) type Setter = Arc<dyn Fn(&BeanObject, BeanObject) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type Construct = Arc<dyn Fn(&mut Args) -> Result<BeanObject, BoxError> + Send + Sync>;
pub(crate) type Invoke =
    Arc<dyn Fn(Option<&BeanObject>, &mut Args) -> Result<BeanObject, BoxError> + Send + Sync>;
pub(crate) type Callback = Arc<dyn Fn(&BeanObject) -> Result<(), BoxError> + Send + Sync>;

fn parse_simple<T>(raw: &str) -> Result<BeanObject, BoxError>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map(|value| Arc::new(value) as BeanObject)
        .map_err(|e| Box::new(e) as BoxError)
}

#[derive(Clone, Copy)]
pub(crate) enum ValueKind {
    /// Plain data converted from strings
    Simple(Parser),
    /// Another bean, by concrete type or trait
    Reference,
    /// Anything at all
    Object,
}

/// Declared type of a property or parameter.
///
/// Simple types are parsed from literal strings; reference types are satisfied by
/// other beans and are the only ones eligible for autowiring.
#[derive(Clone, Copy)]
pub struct ValueType {
    key: TypeKey,
    kind: ValueKind,
}

impl ValueType {
    /// A simple value parsed with `FromStr`.
    pub fn simple<T>() -> Self
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        ValueType {
            key: TypeKey::of::<T>(),
            kind: ValueKind::Simple(parse_simple::<T>),
        }
    }

    /// A reference to a bean of concrete type `T`.
    pub fn bean<T: Send + Sync + 'static>() -> Self {
        ValueType {
            key: TypeKey::of::<T>(),
            kind: ValueKind::Reference,
        }
    }

    /// A reference to a bean exposed as the trait object `T`.
    pub fn of_trait<T: ?Sized + Send + Sync + 'static>() -> Self {
        ValueType {
            key: TypeKey::of_trait::<T>(),
            kind: ValueKind::Reference,
        }
    }

    /// Accepts any bean; never autowired by type.
    pub fn object() -> Self {
        ValueType {
            key: TypeKey::object(),
            kind: ValueKind::Object,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn is_simple(&self) -> bool {
        matches!(self.kind, ValueKind::Simple(_))
    }

    pub(crate) fn parser(&self) -> Option<Parser> {
        match self.kind {
            ValueKind::Simple(parser) => Some(parser),
            _ => None,
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ValueKind::Simple(_) => "simple",
            ValueKind::Reference => "reference",
            ValueKind::Object => "object",
        };
        write!(f, "{}({})", kind, self.key.name())
    }
}

/// A named property of a bean type.
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub(crate) name: String,
    pub(crate) value_type: ValueType,
    pub(crate) setter: Option<Setter>,
    pub(crate) declared_by: Option<TypeKey>,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Trait whose callback sets this property, if any.
    pub fn declared_by(&self) -> Option<TypeKey> {
        self.declared_by
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("writable", &self.is_writable())
            .field("declared_by", &self.declared_by.map(|k| k.name()))
            .finish()
    }
}

#[derive(Clone)]
pub struct ConstructorDescriptor {
    pub(crate) params: Vec<ValueType>,
    pub(crate) construct: Construct,
}

impl ConstructorDescriptor {
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .finish()
    }
}

/// A factory method, either static on its type or invoked on a factory bean instance.
#[derive(Clone)]
pub struct FactoryMethodDescriptor {
    pub(crate) name: String,
    pub(crate) is_static: bool,
    pub(crate) params: Vec<ValueType>,
    pub(crate) return_type: TypeKey,
    pub(crate) invoke: Invoke,
}

impl FactoryMethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn return_type(&self) -> TypeKey {
        self.return_type
    }
}

impl fmt::Debug for FactoryMethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryMethodDescriptor")
            .field("name", &self.name)
            .field("is_static", &self.is_static)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish()
    }
}

/// A no-argument method callable by name, used for init and destroy callbacks.
#[derive(Clone)]
pub struct MethodDescriptor {
    pub(crate) name: String,
    pub(crate) invoke: Callback,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodDescriptor({})", self.name)
    }
}
