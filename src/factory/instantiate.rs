//! Choosing and invoking the way a raw instance is produced: supplier, factory
//! method, autowired constructor or default constructor.

use std::sync::Arc;

use super::{BeanFactory, Lookup};
use crate::convert::TypeConverter;
use crate::definition::{Instantiation, MergedDefinition, TypeRef};
use crate::error::{BeanError, BeanResult, SharedError};
use crate::key::{BeanObject, TypeKey};
use crate::processor::Capabilities;
use crate::scope::AutowireMode;
use crate::types::{BeanType, FactoryMethodDescriptor, ValueType};
use crate::value::Args;
use crate::wrapper::BeanWrapper;

fn argument_name(index: usize) -> String {
    format!("constructor argument {}", index)
}

fn signature(method: &FactoryMethodDescriptor) -> String {
    let params: Vec<&str> = method.params.iter().map(|p| p.key().name()).collect();
    format!("{}({})", method.name, params.join(", "))
}

fn same_params(a: &[ValueType], b: &[ValueType]) -> bool {
    a.iter().map(ValueType::key).eq(b.iter().map(ValueType::key))
}

impl BeanFactory {
    /// Bean type declared by the definition, resolved against the type registry once.
    pub(crate) fn resolve_bean_type(
        &self,
        name: &str,
        merged: &MergedDefinition,
    ) -> BeanResult<Option<Arc<BeanType>>> {
        if let Some(resolved) = &merged.cache().resolved_type {
            return Ok(Some(Arc::clone(resolved)));
        }
        let resolved = match merged.bean_type() {
            None => return Ok(None),
            Some(TypeRef::Key(key)) => self
                .inner
                .types
                .get(key.id())
                .unwrap_or_else(|| Arc::new(BeanType::opaque(*key))),
            Some(TypeRef::Named(type_name)) => {
                self.inner.types.resolve(type_name).ok_or_else(|| {
                    BeanError::definition(
                        name,
                        merged.resource_description(),
                        format!("Cannot resolve bean type [{}]", type_name),
                    )
                })?
            }
        };
        merged.cache().resolved_type = Some(Arc::clone(&resolved));
        Ok(Some(resolved))
    }

    /// Creates the raw instance for `name`, before any property is set.
    pub(crate) fn create_instance(
        &self,
        name: &str,
        merged: &MergedDefinition,
        args: Option<&[BeanObject]>,
    ) -> BeanResult<BeanWrapper> {
        let resource = merged.resource_description();
        let bean_type = self.resolve_bean_type(name, merged)?;
        if let Some(bean_type) = &bean_type {
            if bean_type.is_non_public() && !merged.is_non_public_access_allowed() {
                return Err(BeanError::creation(
                    name,
                    resource,
                    format!(
                        "Bean type isn't public, and non-public access not allowed: {}",
                        bean_type.name()
                    ),
                ));
            }
        }

        if let Some(supplier) = merged.supplier() {
            let instance = supplier().map_err(|e| {
                BeanError::creation_caused_by(name, resource, "Instantiation of supplied bean failed", e)
            })?;
            merged.cache().instantiation.get_or_insert(Instantiation::Supplier);
            return self.wrap_instance(name, merged, instance);
        }

        if merged.factory_method_name().is_some() {
            return self.instantiate_using_factory_method(name, merged, args);
        }

        let Some(bean_type) = bean_type else {
            return Err(BeanError::definition(
                name,
                resource,
                "Bean definition declares neither a bean type, a supplier nor a factory method",
            ));
        };

        if args.is_none() {
            let cached = merged.resolved_instantiation();
            match cached {
                Some(Instantiation::AutowiredConstructor { index }) => {
                    let autowiring = merged.autowire() == AutowireMode::Constructor
                        || self.inner.processors.has(Capabilities::CANDIDATE_CONSTRUCTORS);
                    return self.autowire_constructor(
                        name,
                        merged,
                        &bean_type,
                        Some(vec![index]),
                        None,
                        autowiring,
                    );
                }
                Some(Instantiation::DefaultConstructor { index }) => {
                    return self.instantiate_with_default(name, merged, &bean_type, index);
                }
                _ => {}
            }
        }

        let candidates = self.determine_candidate_constructors(name, merged, &bean_type)?;
        let autowiring = candidates.is_some() || merged.autowire() == AutowireMode::Constructor;
        if autowiring || merged.has_constructor_args() || args.is_some() {
            return self.autowire_constructor(name, merged, &bean_type, candidates, args, autowiring);
        }

        match bean_type.default_constructor() {
            Some(index) => self.instantiate_with_default(name, merged, &bean_type, index),
            None => Err(BeanError::creation(
                name,
                resource,
                format!("No default constructor found on type [{}]", bean_type.name()),
            )),
        }
    }

    fn instantiate_with_default(
        &self,
        name: &str,
        merged: &MergedDefinition,
        bean_type: &BeanType,
        index: usize,
    ) -> BeanResult<BeanWrapper> {
        let resource = merged.resource_description();
        let constructor = bean_type.constructors().get(index).ok_or_else(|| {
            BeanError::creation(
                name,
                resource,
                format!("No default constructor found on type [{}]", bean_type.name()),
            )
        })?;
        let instance = (constructor.construct)(&mut Args::new(Vec::new())).map_err(|e| {
            BeanError::creation_caused_by(
                name,
                resource,
                format!("Instantiation of bean failed; constructor of [{}] threw error", bean_type.name()),
                e,
            )
        })?;
        merged
            .cache()
            .instantiation
            .get_or_insert(Instantiation::DefaultConstructor { index });
        self.wrap_instance(name, merged, instance)
    }

    fn determine_candidate_constructors(
        &self,
        name: &str,
        merged: &MergedDefinition,
        bean_type: &BeanType,
    ) -> BeanResult<Option<Vec<usize>>> {
        for processor in self.inner.processors.with(Capabilities::CANDIDATE_CONSTRUCTORS) {
            let candidates = processor.candidate_constructors(bean_type, name).map_err(|e| {
                BeanError::creation_caused_by(
                    name,
                    merged.resource_description(),
                    "Determining candidate constructors failed",
                    e,
                )
            })?;
            if let Some(candidates) = candidates.filter(|c| !c.is_empty()) {
                return Ok(Some(candidates));
            }
        }
        Ok(None)
    }

    /// Tries constructors with the most parameters first; the first whose arguments
    /// all resolve wins.
    fn autowire_constructor(
        &self,
        name: &str,
        merged: &MergedDefinition,
        bean_type: &BeanType,
        candidates: Option<Vec<usize>>,
        explicit: Option<&[BeanObject]>,
        autowiring: bool,
    ) -> BeanResult<BeanWrapper> {
        let resource = merged.resource_description();
        let constructors = bean_type.constructors();
        let mut indices: Vec<usize> = match candidates {
            Some(candidates) => candidates.into_iter().filter(|i| *i < constructors.len()).collect(),
            None => (0..constructors.len()).collect(),
        };
        indices.sort_by(|a, b| constructors[*b].params.len().cmp(&constructors[*a].params.len()));
        let min_args = explicit.map_or_else(|| merged.constructor_args().count(), <[_]>::len);

        let mut last_error = None;
        for index in indices {
            let constructor = &constructors[index];
            let count = constructor.params.len();
            if count < min_args || explicit.map_or(false, |a| a.len() != count) {
                continue;
            }
            let resolved = match self.resolve_arguments(name, merged, &constructor.params, explicit, autowiring) {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::trace!(bean = name, constructor = index, "Skipping constructor: {}", e);
                    last_error = Some(e);
                    continue;
                }
            };
            let instance = (constructor.construct)(&mut Args::new(resolved)).map_err(|e| {
                BeanError::creation_caused_by(
                    name,
                    resource,
                    format!("Instantiation of bean failed; constructor of [{}] threw error", bean_type.name()),
                    e,
                )
            })?;
            if explicit.is_none() {
                merged
                    .cache()
                    .instantiation
                    .get_or_insert(Instantiation::AutowiredConstructor { index });
            }
            return self.wrap_instance(name, merged, instance);
        }

        Err(last_error.unwrap_or_else(|| {
            BeanError::creation(
                name,
                resource,
                format!(
                    "Could not resolve matching constructor on type [{}] (hint: specify index arguments for simple parameters to avoid type ambiguities)",
                    bean_type.name()
                ),
            )
        }))
    }

    fn instantiate_using_factory_method(
        &self,
        name: &str,
        merged: &MergedDefinition,
        explicit: Option<&[BeanObject]>,
    ) -> BeanResult<BeanWrapper> {
        let resource = merged.resource_description();
        let Some(method_name) = merged.factory_method_name() else {
            return Err(BeanError::definition(name, resource, "No factory method specified"));
        };

        let (factory_type, factory_instance) = match merged.factory_bean_name() {
            Some(factory_name) => {
                if factory_name == name {
                    return Err(BeanError::definition(
                        name,
                        resource,
                        "factory-bean reference points back to the same bean definition",
                    ));
                }
                let instance = self.get_bean(factory_name)?;
                self.inner.singletons.register_dependent(factory_name, name);
                (self.type_of_instance(&instance), Some(instance))
            }
            None => match self.resolve_bean_type(name, merged)? {
                Some(bean_type) => (bean_type, None),
                None => {
                    return Err(BeanError::definition(
                        name,
                        resource,
                        "Bean definition declares neither a bean type nor a factory-bean reference",
                    ))
                }
            },
        };
        let is_static = factory_instance.is_none();
        let methods = factory_type.factory_methods();

        let mut candidates: Vec<usize> = match (explicit, merged.resolved_instantiation()) {
            (None, Some(Instantiation::FactoryMethod { index })) if index < methods.len() => vec![index],
            _ => methods
                .iter()
                .enumerate()
                .filter(|(_, m)| m.name == method_name && m.is_static == is_static)
                .map(|(i, _)| i)
                .collect(),
        };
        if candidates.is_empty() {
            return Err(BeanError::creation(
                name,
                resource,
                format!(
                    "No matching factory method found on type [{}]: factory method '{}'. Check that a method with the specified name exists and that it is {}.",
                    factory_type.name(),
                    method_name,
                    if is_static { "static" } else { "non-static" }
                ),
            ));
        }
        candidates.sort_by(|a, b| methods[*b].params.len().cmp(&methods[*a].params.len()));

        let min_args = explicit.map_or_else(|| merged.constructor_args().count(), <[_]>::len);
        let autowiring = merged.autowire() == AutowireMode::Constructor;
        let mut chosen: Option<(usize, Vec<BeanObject>)> = None;
        let mut ambiguous = Vec::new();
        let mut last_error = None;

        for index in candidates {
            let method = &methods[index];
            let count = method.params.len();
            if count < min_args || explicit.map_or(false, |a| a.len() != count) {
                continue;
            }
            if let Some((chosen_index, _)) = &chosen {
                if methods[*chosen_index].params.len() > count {
                    break;
                }
            }
            match self.resolve_arguments(name, merged, &method.params, explicit, autowiring) {
                Ok(resolved) => match chosen.as_ref().map(|(i, _)| *i) {
                    None => chosen = Some((index, resolved)),
                    Some(chosen_index) => {
                        if !same_params(&methods[chosen_index].params, &method.params) {
                            ambiguous.push(index);
                        }
                    }
                },
                Err(e) => {
                    tracing::trace!(bean = name, method = %signature(method), "Skipping factory method: {}", e);
                    last_error = Some(e);
                }
            }
        }

        let Some((index, resolved)) = chosen else {
            return Err(last_error.unwrap_or_else(|| {
                BeanError::creation(
                    name,
                    resource,
                    format!(
                        "No factory method '{}' on type [{}] accepts {} argument(s)",
                        method_name,
                        factory_type.name(),
                        min_args
                    ),
                )
            }));
        };
        if !ambiguous.is_empty() {
            let signatures: Vec<String> = std::iter::once(index)
                .chain(ambiguous)
                .map(|i| signature(&methods[i]))
                .collect();
            return Err(BeanError::creation(
                name,
                resource,
                format!(
                    "Ambiguous factory method matches found on type [{}] (hint: specify index arguments for simple parameters to avoid type ambiguities): {}",
                    factory_type.name(),
                    signatures.join(", ")
                ),
            ));
        }

        let method = &methods[index];
        let instance = (method.invoke)(factory_instance.as_ref(), &mut Args::new(resolved)).map_err(|e| {
            BeanError::creation_caused_by(
                name,
                resource,
                format!("Instantiation of bean failed; factory method '{}' threw error", method_name),
                e,
            )
        })?;
        {
            let mut cache = merged.cache();
            if explicit.is_none() {
                cache.instantiation.get_or_insert(Instantiation::FactoryMethod { index });
            }
            cache.factory_method_return.get_or_insert(Some(method.return_type));
        }
        self.wrap_instance(name, merged, instance)
    }

    /// Resolves and converts the arguments for one constructor or factory method.
    fn resolve_arguments(
        &self,
        name: &str,
        merged: &MergedDefinition,
        params: &[ValueType],
        explicit: Option<&[BeanObject]>,
        autowiring: bool,
    ) -> BeanResult<Vec<BeanObject>> {
        let resource = merged.resource_description();
        let converter = TypeConverter::new(&self.inner.types);
        let unsatisfied = |index: usize, e: crate::convert::ConversionError| {
            BeanError::unsatisfied(
                name,
                resource,
                &argument_name(index),
                e.to_string(),
                Some(Arc::new(e) as SharedError),
            )
        };

        if let Some(explicit) = explicit {
            return params
                .iter()
                .zip(explicit)
                .enumerate()
                .map(|(i, (param, value))| converter.convert_object(value, param).map_err(|e| unsatisfied(i, e)))
                .collect();
        }

        let args = merged.constructor_args();
        let mut generic_used = vec![false; args.generic().len()];
        let mut resolved = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            let argument = argument_name(i);
            if let Some(value) = args.indexed(i) {
                let value = self.resolve_value(name, merged, &argument, value)?;
                resolved.push(converter.convert(value, param).map_err(|e| unsatisfied(i, e))?);
                continue;
            }
            if let Some(value) = self.match_generic_argument(name, merged, &argument, param, &mut generic_used)? {
                resolved.push(value);
                continue;
            }
            if autowiring && !param.is_simple() {
                match self.resolve_dependency(name, merged, &argument, param)? {
                    Some(bean) => {
                        resolved.push(bean);
                        continue;
                    }
                    None => {
                        return Err(BeanError::unsatisfied(
                            name,
                            resource,
                            &argument,
                            format!(
                                "No qualifying bean of type '{}' available: expected at least 1 bean which qualifies as autowire candidate",
                                param.key().name()
                            ),
                            None,
                        ))
                    }
                }
            }
            return Err(BeanError::unsatisfied(
                name,
                resource,
                &argument,
                format!(
                    "Ambiguous argument values for parameter of type [{}] - did you specify the correct bean references as arguments?",
                    param.key().name()
                ),
                None,
            ));
        }
        Ok(resolved)
    }

    /// First unused generic argument convertible to `param`.
    fn match_generic_argument(
        &self,
        name: &str,
        merged: &MergedDefinition,
        argument: &str,
        param: &ValueType,
        used: &mut [bool],
    ) -> BeanResult<Option<BeanObject>> {
        let converter = TypeConverter::new(&self.inner.types);
        for (i, value) in merged.constructor_args().generic().iter().enumerate() {
            if used[i] {
                continue;
            }
            let resolved = self.resolve_value(name, merged, argument, value)?;
            if let Ok(converted) = converter.convert(resolved, param) {
                used[i] = true;
                return Ok(Some(converted));
            }
        }
        Ok(None)
    }

    /// Wraps a raw instance and installs its lookup methods.
    fn wrap_instance(
        &self,
        name: &str,
        merged: &MergedDefinition,
        instance: BeanObject,
    ) -> BeanResult<BeanWrapper> {
        let bean_type = self.type_of_instance(&instance);
        for lookup in merged.lookup_overrides() {
            let method = bean_type.lookup_method(&lookup.method).ok_or_else(|| {
                BeanError::definition(
                    name,
                    merged.resource_description(),
                    format!(
                        "Invalid method override: no method with name '{}' on type [{}]",
                        lookup.method,
                        bean_type.name()
                    ),
                )
            })?;
            (method.install)(&instance, Lookup::new(self.downgrade(), &lookup.bean_name)).map_err(|e| {
                BeanError::creation_caused_by(
                    name,
                    merged.resource_description(),
                    format!("Failed to install lookup method '{}'", lookup.method),
                    e,
                )
            })?;
        }
        Ok(BeanWrapper::new(instance, bean_type, Arc::clone(&self.inner.types)))
    }

    /// Raw type the definition produces, computed without creating anything.
    pub(crate) fn determine_target_type(
        &self,
        name: &str,
        merged: &MergedDefinition,
    ) -> BeanResult<Option<TypeKey>> {
        if let Some(target) = merged.cache().target_type {
            return Ok(target);
        }
        let target = if merged.factory_method_name().is_some() {
            self.factory_method_return_type(name, merged)?
        } else {
            self.resolve_bean_type(name, merged)?.map(|t| t.key())
        };
        Ok(*merged.cache().target_type.get_or_insert(target))
    }

    /// Target type, unless a type-predicting processor knows better.
    pub(crate) fn predict_bean_type(
        &self,
        name: &str,
        merged: &MergedDefinition,
    ) -> BeanResult<Option<TypeKey>> {
        let target = self.determine_target_type(name, merged)?;
        if let Some(key) = target {
            if !merged.is_synthetic() && self.inner.processors.has(Capabilities::PREDICT_TYPE) {
                if let Some(bean_type) = self.inner.types.get(key.id()) {
                    for processor in self.inner.processors.with(Capabilities::PREDICT_TYPE) {
                        if let Some(predicted) = processor.predict_type(&bean_type, name) {
                            return Ok(Some(predicted));
                        }
                    }
                }
            }
        }
        Ok(target)
    }

    /// Common return type of every factory method that could be chosen.
    fn factory_method_return_type(
        &self,
        name: &str,
        merged: &MergedDefinition,
    ) -> BeanResult<Option<TypeKey>> {
        if let Some(cached) = merged.cache().factory_method_return {
            return Ok(cached);
        }
        let Some(method_name) = merged.factory_method_name() else {
            return Ok(None);
        };
        let (factory_type, is_static) = match merged.factory_bean_name() {
            Some(factory_name) if factory_name == name => return Ok(None),
            Some(factory_name) => {
                let factory_type = self
                    .raw_type(factory_name)?
                    .and_then(|key| self.inner.types.get(key.id()));
                match factory_type {
                    Some(factory_type) => (factory_type, false),
                    None => return Ok(None),
                }
            }
            None => match self.resolve_bean_type(name, merged)? {
                Some(bean_type) => (bean_type, true),
                None => return Ok(None),
            },
        };
        let min_args = merged.constructor_args().count();
        let returns: Vec<TypeKey> = factory_type
            .factory_methods()
            .iter()
            .filter(|m| m.name == method_name && m.is_static == is_static && m.params.len() >= min_args)
            .map(|m| m.return_type)
            .collect();
        let result = self.inner.types.common_ancestor(&returns);
        Ok(*merged.cache().factory_method_return.get_or_insert(result))
    }

    /// Type of the bean `name` itself, never a factory-bean product.
    pub(crate) fn raw_type(&self, name: &str) -> BeanResult<Option<TypeKey>> {
        if let Some(instance) = self.inner.singletons.get(name) {
            return Ok(Some(self.type_of_instance(&instance).key()));
        }
        if !self.inner.definitions.contains(name) {
            return Ok(None);
        }
        let merged = self.inner.definitions.merged(name)?;
        self.predict_bean_type(name, &merged)
    }
}
