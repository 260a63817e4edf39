//! Conversion of resolved values to the declared type of a property or parameter.

use std::sync::Arc;

use thiserror::Error;

use crate::error::SharedError;
use crate::key::{BeanObject, TypeKey};
use crate::types::{TypeRegistry, ValueType};

/// A value after references and dynamic expressions have been resolved.
#[derive(Clone, Debug)]
pub enum Resolved {
    Text(String),
    Object(BeanObject),
}

/// A value could not be converted to the required type.
#[derive(Debug, Clone, Error)]
#[error("Failed to convert value of type '{from}' to required type '{to}'")]
pub struct ConversionError {
    pub from: String,
    pub to: &'static str,
    #[source]
    pub source: Option<SharedError>,
}

/// Converts resolved values using the parsers and upcasts known to a [`TypeRegistry`].
pub struct TypeConverter<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> TypeConverter<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        TypeConverter { registry }
    }

    pub fn convert(&self, value: Resolved, target: &ValueType) -> Result<BeanObject, ConversionError> {
        match value {
            Resolved::Text(text) => self.convert_text(&text, target),
            Resolved::Object(object) => self.convert_object(&object, target),
        }
    }

    /// Parses `text` for simple targets; `Object` targets receive the string itself.
    pub fn convert_text(&self, text: &str, target: &ValueType) -> Result<BeanObject, ConversionError> {
        if let Some(parse) = target.parser() {
            return parse(text).map_err(|e| ConversionError {
                from: "String".to_string(),
                to: target.key().name(),
                source: Some(Arc::from(e)),
            });
        }
        if target.key().is_object() {
            return Ok(Arc::new(text.to_string()));
        }
        Err(ConversionError {
            from: "String".to_string(),
            to: target.key().name(),
            source: None,
        })
    }

    /// Passes matching objects through, upcasts to trait targets and parses strings.
    pub fn convert_object(
        &self,
        object: &BeanObject,
        target: &ValueType,
    ) -> Result<BeanObject, ConversionError> {
        if let Some(converted) = self.registry.upcast(object, &target.key()) {
            return Ok(converted);
        }
        if target.is_simple() {
            if let Some(text) = object.downcast_ref::<String>() {
                return self.convert_text(text, target);
            }
        }
        let from = self
            .registry
            .get(TypeKey::of_object(object))
            .map_or_else(|| "unregistered type".to_string(), |t| t.name().to_string());
        Err(ConversionError {
            from,
            to: target.key().name(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BeanType;

    trait Sink: Send + Sync {}
    struct Buffer;
    impl Sink for Buffer {}

    #[test]
    fn literal_parsed_to_simple_type() {
        let registry = TypeRegistry::new();
        let converter = TypeConverter::new(&registry);
        let port = converter
            .convert_text("8080", &ValueType::simple::<u16>())
            .unwrap();
        assert_eq!(port.downcast_ref::<u16>(), Some(&8080));
    }

    #[test]
    fn bad_literal_reports_target_type() {
        let registry = TypeRegistry::new();
        let converter = TypeConverter::new(&registry);
        let err = converter
            .convert_text("eighty", &ValueType::simple::<u16>())
            .unwrap_err();
        assert_eq!(err.to, "u16");
        assert!(err.source.is_some());
    }

    #[test]
    fn object_upcast_to_declared_trait() {
        let registry = TypeRegistry::new();
        registry.register(
            BeanType::of::<Buffer>()
                .implements::<dyn Sink>(|b| b as Arc<dyn Sink>)
                .build(),
        );
        let converter = TypeConverter::new(&registry);
        let buffer: BeanObject = Arc::new(Buffer);
        let sink = converter
            .convert_object(&buffer, &ValueType::of_trait::<dyn Sink>())
            .unwrap();
        assert!(sink.downcast_ref::<Arc<dyn Sink>>().is_some());
        assert!(converter
            .convert_object(&buffer, &ValueType::bean::<String>())
            .is_err());
    }
}
