//! Instance wrapper giving typed property access to a bean under construction.

use std::sync::Arc;

use thiserror::Error;

use crate::convert::{ConversionError, Resolved, TypeConverter};
use crate::error::SharedError;
use crate::key::BeanObject;
use crate::types::{BeanType, PropertyDescriptor, TypeRegistry};

#[derive(Debug, Clone, Error)]
pub enum PropertyError {
    #[error("Invalid property '{property}' of bean type [{type_name}]: property is not writable or has no setter")]
    NotWritable {
        property: String,
        type_name: &'static str,
    },
    #[error("Failed to convert property value for '{property}'")]
    Conversion {
        property: String,
        #[source]
        source: ConversionError,
    },
    #[error("Setter for property '{property}' threw an error")]
    Setter {
        property: String,
        #[source]
        source: SharedError,
    },
}

/// A raw bean instance together with the metadata of its type.
///
/// Created once per creation attempt; conversion goes through the owning
/// factory's type registry.
#[derive(Clone)]
pub struct BeanWrapper {
    instance: BeanObject,
    bean_type: Arc<BeanType>,
    registry: Arc<TypeRegistry>,
}

impl BeanWrapper {
    pub fn new(instance: BeanObject, bean_type: Arc<BeanType>, registry: Arc<TypeRegistry>) -> Self {
        BeanWrapper {
            instance,
            bean_type,
            registry,
        }
    }

    pub fn instance(&self) -> &BeanObject {
        &self.instance
    }

    pub fn bean_type(&self) -> &Arc<BeanType> {
        &self.bean_type
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.bean_type.property(name)
    }

    pub fn is_writable(&self, name: &str) -> bool {
        self.property(name).map_or(false, PropertyDescriptor::is_writable)
    }

    pub fn writable_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.bean_type.properties().iter().filter(|p| p.is_writable())
    }

    fn writable(&self, name: &str) -> Result<&PropertyDescriptor, PropertyError> {
        self.property(name)
            .filter(|p| p.is_writable())
            .ok_or_else(|| PropertyError::NotWritable {
                property: name.to_string(),
                type_name: self.bean_type.name(),
            })
    }

    /// Converts `value` to the declared type of property `name`.
    pub fn convert_for_property(&self, name: &str, value: Resolved) -> Result<BeanObject, PropertyError> {
        let descriptor = self.writable(name)?;
        TypeConverter::new(&self.registry)
            .convert(value, &descriptor.value_type)
            .map_err(|source| PropertyError::Conversion {
                property: name.to_string(),
                source,
            })
    }

    /// Sets an already converted value.
    pub fn set_converted(&self, name: &str, value: BeanObject) -> Result<(), PropertyError> {
        let descriptor = self.writable(name)?;
        let setter = descriptor.setter.as_ref().ok_or_else(|| PropertyError::NotWritable {
            property: name.to_string(),
            type_name: self.bean_type.name(),
        })?;
        setter(&self.instance, value).map_err(|e| PropertyError::Setter {
            property: name.to_string(),
            source: Arc::from(e),
        })
    }

    /// Converts and sets in one step.
    pub fn set_property(&self, name: &str, value: Resolved) -> Result<(), PropertyError> {
        let converted = self.convert_for_property(name, value)?;
        self.set_converted(name, converted)
    }
}

impl std::fmt::Debug for BeanWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanWrapper")
            .field("bean_type", &self.bean_type.name())
            .finish()
    }
}
