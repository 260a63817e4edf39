//! Property population: autowiring, property-value rewriting, dependency checks
//! and applying converted values through the bean wrapper.

use std::sync::Arc;

use super::BeanFactory;
use crate::convert::{Resolved, TypeConverter};
use crate::definition::MergedDefinition;
use crate::error::{BeanError, BeanResult, SharedError};
use crate::key::BeanObject;
use crate::processor::Capabilities;
use crate::scope::{AutowireMode, DependencyCheck};
use crate::types::{PropertyDescriptor, ValueType};
use crate::value::{PropertyValues, Value};
use crate::wrapper::{BeanWrapper, PropertyError};

impl BeanFactory {
    /// Fills in the properties of a freshly instantiated bean.
    pub(crate) fn populate(
        &self,
        name: &str,
        merged: &MergedDefinition,
        wrapper: &BeanWrapper,
    ) -> BeanResult<()> {
        let resource = merged.resource_description();
        if !merged.is_synthetic() {
            for processor in self.inner.processors.with(Capabilities::AFTER_INSTANTIATION) {
                let proceed = processor
                    .after_instantiation(wrapper.instance(), name)
                    .map_err(|e| {
                        BeanError::creation_caused_by(
                            name,
                            resource,
                            "BeanPostProcessor after instantiation failed",
                            e,
                        )
                    })?;
                if !proceed {
                    tracing::debug!(bean = name, "Property population vetoed by processor");
                    return Ok(());
                }
            }
        }

        let mut values = merged.properties().clone();
        match merged.autowire() {
            AutowireMode::ByName => self.autowire_by_name(name, wrapper, &mut values)?,
            AutowireMode::ByType => self.autowire_by_type(name, merged, wrapper, &mut values)?,
            AutowireMode::No | AutowireMode::Constructor => {}
        }

        if !merged.is_synthetic() && self.inner.processors.has(Capabilities::PROPERTY_VALUES) {
            let descriptors = self.filtered_properties(wrapper);
            for processor in self.inner.processors.with(Capabilities::PROPERTY_VALUES) {
                let rewritten = processor
                    .rewrite_property_values(values, &descriptors, wrapper.instance(), name)
                    .map_err(|e| {
                        BeanError::creation_caused_by(
                            name,
                            resource,
                            "BeanPostProcessor property rewriting failed",
                            e,
                        )
                    })?;
                match rewritten {
                    Some(next) => values = next,
                    None => return Ok(()),
                }
            }
        }

        if merged.dependency_check() != DependencyCheck::None {
            self.check_dependencies(name, merged, wrapper, &values)?;
        }
        self.apply_property_values(name, merged, wrapper, &values)
    }

    fn autowire_by_name(
        &self,
        name: &str,
        wrapper: &BeanWrapper,
        values: &mut PropertyValues,
    ) -> BeanResult<()> {
        for property in self.unsatisfied_non_simple_properties(wrapper, values) {
            if self.contains_bean(&property) {
                let bean = self.get_bean(&property)?;
                values.add(property.clone(), Value::Object(bean));
                self.inner.singletons.register_dependent(&property, name);
                tracing::debug!(
                    bean = name,
                    property = %property,
                    "Added autowiring by name to bean named '{}'",
                    property
                );
            } else {
                tracing::trace!(
                    bean = name,
                    property = %property,
                    "Not autowiring property by name: no matching bean found"
                );
            }
        }
        Ok(())
    }

    fn autowire_by_type(
        &self,
        name: &str,
        merged: &MergedDefinition,
        wrapper: &BeanWrapper,
        values: &mut PropertyValues,
    ) -> BeanResult<()> {
        for property in self.unsatisfied_non_simple_properties(wrapper, values) {
            let Some(value_type) = wrapper.property(&property).map(PropertyDescriptor::value_type) else {
                continue;
            };
            if value_type.key().is_object() {
                continue;
            }
            if let Some(bean) = self.resolve_dependency(name, merged, &property, &value_type)? {
                values.add(property, Value::Object(bean));
            }
        }
        Ok(())
    }

    /// Finds the single bean assignable to `target`, converted to it.
    ///
    /// `Ok(None)` means no candidate; several candidates go to the candidate resolver
    /// and are an error if it cannot pick one.
    pub(crate) fn resolve_dependency(
        &self,
        name: &str,
        merged: &MergedDefinition,
        property: &str,
        target: &ValueType,
    ) -> BeanResult<Option<BeanObject>> {
        let resource = merged.resource_description();
        let key = target.key();
        let candidates: Vec<String> = self
            .bean_names_for_type(&key)?
            .into_iter()
            .filter(|candidate| candidate != name)
            .collect();

        let chosen = match candidates.as_slice() {
            [] => return Ok(None),
            [single] => single.clone(),
            _ => {
                let selected = self
                    .inner
                    .candidate_resolver
                    .as_ref()
                    .and_then(|resolver| resolver.select(name, property, &key, &candidates))
                    .filter(|selected| candidates.contains(selected));
                match selected {
                    Some(selected) => selected,
                    None => {
                        let cause = BeanError::NoUniqueBean {
                            type_name: key.name(),
                            candidates: candidates.clone(),
                        };
                        return Err(BeanError::unsatisfied(
                            name,
                            resource,
                            property,
                            cause.to_string(),
                            Some(Arc::new(cause) as SharedError),
                        ));
                    }
                }
            }
        };

        let bean = self.get_bean(&chosen).map_err(|e| {
            BeanError::unsatisfied(name, resource, property, e.to_string(), Some(Arc::new(e) as SharedError))
        })?;
        let converted = TypeConverter::new(&self.inner.types)
            .convert_object(&bean, target)
            .map_err(|e| {
                BeanError::unsatisfied(name, resource, property, e.to_string(), Some(Arc::new(e) as SharedError))
            })?;
        self.inner.singletons.register_dependent(&chosen, name);
        tracing::debug!(
            bean = name,
            property = property,
            "Autowiring by type to bean named '{}'",
            chosen
        );
        Ok(Some(converted))
    }

    fn is_excluded_from_dependency_check(&self, property: &PropertyDescriptor) -> bool {
        let config = &self.inner.config;
        config.is_ignored_dependency_type(&property.value_type().key())
            || property
                .declared_by()
                .map_or(false, |interface| config.is_ignored_dependency_interface(&interface))
    }

    /// Writable properties not excluded from dependency checks, memoized per type.
    fn filtered_properties(&self, wrapper: &BeanWrapper) -> Arc<[PropertyDescriptor]> {
        let id = wrapper.bean_type().key().id();
        if self.inner.config.cache_property_descriptors {
            if let Some(cached) = self.inner.filtered_properties.get(&id) {
                return Arc::clone(cached.value());
            }
        }
        let filtered: Arc<[PropertyDescriptor]> = wrapper
            .writable_properties()
            .filter(|p| !self.is_excluded_from_dependency_check(p))
            .cloned()
            .collect();
        if self.inner.config.cache_property_descriptors {
            self.inner.filtered_properties.insert(id, Arc::clone(&filtered));
        }
        filtered
    }

    /// Non-simple writable properties without a value, sorted by name.
    fn unsatisfied_non_simple_properties(
        &self,
        wrapper: &BeanWrapper,
        values: &PropertyValues,
    ) -> Vec<String> {
        let mut result: Vec<String> = self
            .filtered_properties(wrapper)
            .iter()
            .filter(|p| !values.contains(p.name()) && !p.value_type().is_simple())
            .map(|p| p.name().to_string())
            .collect();
        result.sort();
        result
    }

    fn check_dependencies(
        &self,
        name: &str,
        merged: &MergedDefinition,
        wrapper: &BeanWrapper,
        values: &PropertyValues,
    ) -> BeanResult<()> {
        let check = merged.dependency_check();
        for property in self.filtered_properties(wrapper).iter() {
            if values.contains(property.name()) {
                continue;
            }
            if check.is_violated_by(property.value_type().is_simple()) {
                return Err(BeanError::unsatisfied(
                    name,
                    merged.resource_description(),
                    property.name(),
                    "Set this property value or disable dependency checking for this bean.",
                    None,
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn apply_property_values(
        &self,
        name: &str,
        merged: &MergedDefinition,
        wrapper: &BeanWrapper,
        values: &PropertyValues,
    ) -> BeanResult<()> {
        let resource = merged.resource_description();
        let setting_failed = |e: PropertyError| {
            BeanError::creation_caused_by(name, resource, "Error setting property values", e)
        };

        for property in values.iter() {
            let converted = match &property.value {
                Value::Literal(text) => {
                    let cached = merged
                        .cache()
                        .converted_properties
                        .get(&property.name)
                        .filter(|(source, _)| source == text)
                        .map(|(_, value)| Arc::clone(value));
                    match cached {
                        Some(value) => value,
                        None => {
                            let value = wrapper
                                .convert_for_property(&property.name, Resolved::Text(text.clone()))
                                .map_err(setting_failed)?;
                            let from_definition = matches!(
                                merged.properties().get(&property.name),
                                Some(Value::Literal(original)) if original == text
                            );
                            if from_definition {
                                merged
                                    .cache()
                                    .converted_properties
                                    .insert(property.name.clone(), (text.clone(), Arc::clone(&value)));
                            }
                            value
                        }
                    }
                }
                other => {
                    let context = format!("bean property '{}'", property.name);
                    let resolved = self.resolve_value(name, merged, &context, other)?;
                    wrapper
                        .convert_for_property(&property.name, resolved)
                        .map_err(setting_failed)?
                }
            };
            wrapper
                .set_converted(&property.name, converted)
                .map_err(setting_failed)?;
        }
        Ok(())
    }

    /// Resolves references and dynamic expressions; references register a dependency edge.
    pub(crate) fn resolve_value(
        &self,
        name: &str,
        merged: &MergedDefinition,
        context: &str,
        value: &Value,
    ) -> BeanResult<Resolved> {
        match value {
            Value::Literal(text) => Ok(Resolved::Text(text.clone())),
            Value::Dynamic(dynamic) => Ok(Resolved::Text(dynamic.evaluate())),
            Value::Object(object) => Ok(Resolved::Object(Arc::clone(object))),
            Value::Ref(reference) => {
                let bean = self.get_bean(reference).map_err(|e| {
                    BeanError::creation_caused_by(
                        name,
                        merged.resource_description(),
                        format!(
                            "Cannot resolve reference to bean '{}' while setting {}",
                            reference, context
                        ),
                        e,
                    )
                })?;
                self.inner.singletons.register_dependent(reference, name);
                Ok(Resolved::Object(bean))
            }
        }
    }
}
