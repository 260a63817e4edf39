//! Factory-bean dereferencing and type prediction.

use std::sync::Arc;

use super::{is_factory_dereference, transformed_name, BeanFactory, FACTORY_BEAN_PREFIX};
use crate::definition::MergedDefinition;
use crate::error::{BeanError, BeanResult};
use crate::key::{BeanObject, TypeKey};
use crate::traits::FactoryBean;

impl BeanFactory {
    /// Type of the object `get_bean(name)` would return, without creating it if possible.
    ///
    /// For a factory bean this is the product type; `&name` asks for the factory itself.
    /// Determining a product type may create the factory bean when its type does not
    /// declare the product statically.
    pub fn get_type(&self, name: &str) -> BeanResult<Option<TypeKey>> {
        let bean_name = transformed_name(name);
        let dereference = is_factory_dereference(name);

        if let Some(instance) = self.inner.singletons.get(bean_name) {
            let raw = self.type_of_instance(&instance).key();
            return Ok(match self.factory_bean_of(&instance) {
                Some(factory) if !dereference => factory.produced_type(),
                Some(_) => Some(raw),
                None if dereference => None,
                None => Some(raw),
            });
        }

        let merged = self.merged_definition(bean_name)?;
        let predicted = self.predict_bean_type(bean_name, &merged)?;
        let is_factory = predicted
            .and_then(|key| self.inner.types.get(key.id()))
            .map_or(false, |t| t.is_factory_bean());
        match (is_factory, dereference) {
            (true, false) => self.factory_bean_product_type(bean_name, &merged, predicted),
            (false, true) => Ok(None),
            _ => Ok(predicted),
        }
    }

    /// Whether `name` is a factory bean, judged by its instance or its predicted type.
    pub fn is_factory_bean(&self, name: &str) -> BeanResult<bool> {
        let bean_name = transformed_name(name);
        if let Some(instance) = self.inner.singletons.get(bean_name) {
            return Ok(self.factory_bean_of(&instance).is_some());
        }
        if !self.inner.definitions.contains(bean_name) {
            return Ok(false);
        }
        let merged = self.inner.definitions.merged(bean_name)?;
        if let Some(cached) = merged.cache().is_factory_bean {
            return Ok(cached);
        }
        let result = self
            .predict_bean_type(bean_name, &merged)?
            .and_then(|key| self.inner.types.get(key.id()))
            .map_or(false, |t| t.is_factory_bean());
        merged.cache().is_factory_bean = Some(result);
        Ok(result)
    }

    pub(crate) fn factory_bean_of<'a>(&self, instance: &'a BeanObject) -> Option<&'a dyn FactoryBean> {
        self.type_of_instance(instance)
            .lifecycle
            .factory_bean
            .and_then(|view| view(instance))
    }

    /// The object to hand out for `instance`: the instance itself, or its product
    /// if it is a factory bean and `name` does not carry the `&` prefix.
    pub(crate) fn object_for_bean_instance(
        &self,
        instance: BeanObject,
        name: &str,
        bean_name: &str,
        merged: Option<&MergedDefinition>,
    ) -> BeanResult<BeanObject> {
        let is_factory = self.factory_bean_of(&instance).is_some();
        if is_factory_dereference(name) {
            return if is_factory {
                Ok(instance)
            } else {
                Err(BeanError::NotAFactory {
                    bean_name: bean_name.to_string(),
                })
            };
        }
        if !is_factory {
            return Ok(instance);
        }

        let factory = self
            .factory_bean_of(&instance)
            .ok_or_else(|| BeanError::NotAFactory {
                bean_name: bean_name.to_string(),
            })?;
        let synthetic = merged.map_or(false, MergedDefinition::is_synthetic);
        if factory.is_singleton() && self.inner.singletons.contains(bean_name) {
            self.inner
                .singletons
                .product_or_create(bean_name, || self.produce_object(factory, bean_name, synthetic))
        } else {
            self.produce_object(factory, bean_name, synthetic)
        }
    }

    fn produce_object(
        &self,
        factory: &dyn FactoryBean,
        bean_name: &str,
        synthetic: bool,
    ) -> BeanResult<BeanObject> {
        let product = factory.produce().map_err(|e| {
            BeanError::creation_caused_by(
                bean_name,
                None,
                "FactoryBean threw exception on object creation",
                e,
            )
        })?;
        if synthetic {
            return Ok(product);
        }
        self.run_after_initialization(product, bean_name).map_err(|e| {
            BeanError::creation_caused_by(
                bean_name,
                None,
                "Post-processing of FactoryBean's object failed",
                e,
            )
        })
    }

    /// Product type of the factory bean `name`: declared statically, asked from a raw
    /// type-check instance, or asked from the fully created factory as a last resort.
    fn factory_bean_product_type(
        &self,
        name: &str,
        merged: &MergedDefinition,
        raw: Option<TypeKey>,
    ) -> BeanResult<Option<TypeKey>> {
        let declared = raw
            .and_then(|key| self.inner.types.get(key.id()))
            .and_then(|t| t.produces());
        if declared.is_some() {
            return Ok(declared);
        }

        if let Some(instance) = self.type_check_instance(name, merged) {
            if let Some(produced) = self.factory_bean_of(&instance).and_then(|f| f.produced_type()) {
                return Ok(Some(produced));
            }
        }

        if !merged.is_singleton() || self.inner.singletons.is_in_creation(name) {
            return Ok(None);
        }
        let factory = self.get_bean(&format!("{}{}", FACTORY_BEAN_PREFIX, name))?;
        Ok(self.factory_bean_of(&factory).and_then(|f| f.produced_type()))
    }

    /// Raw factory-bean instance, created without population just to ask for its
    /// product type. Singleton instances are kept and reused by the real creation,
    /// and are created under the creation lock so no other thread builds a second one.
    ///
    /// Creation failures only mean the type stays unknown.
    pub(crate) fn type_check_instance(&self, name: &str, merged: &MergedDefinition) -> Option<BeanObject> {
        if let Some(instance) = self.cached_type_check_instance(name) {
            return Some(instance);
        }
        if merged.is_singleton() {
            self.inner
                .singletons
                .with_creation_lock(|| self.create_type_check_instance(name, merged))
        } else {
            self.create_type_check_instance(name, merged)
        }
    }

    fn cached_type_check_instance(&self, name: &str) -> Option<BeanObject> {
        if let Some(instance) = self.inner.singletons.get(name) {
            return Some(instance);
        }
        self.inner
            .type_check_instances
            .lock()
            .get(name)
            .map(|wrapper| Arc::clone(wrapper.instance()))
    }

    fn create_type_check_instance(&self, name: &str, merged: &MergedDefinition) -> Option<BeanObject> {
        // Another thread may have finished while we waited for the lock
        if let Some(instance) = self.cached_type_check_instance(name) {
            return Some(instance);
        }
        let factory_in_creation = merged
            .factory_bean_name()
            .map_or(false, |f| self.inner.singletons.is_in_creation(f));
        if self.inner.singletons.is_in_creation(name) || factory_in_creation {
            return None;
        }
        if !self.inner.type_checks_in_progress.lock().insert(name.to_string()) {
            return None;
        }
        let created = self.create_instance(name, merged, None);
        self.inner.type_checks_in_progress.lock().remove(name);

        match created {
            Ok(wrapper) => {
                let instance = Arc::clone(wrapper.instance());
                if merged.is_singleton() {
                    self.inner
                        .type_check_instances
                        .lock()
                        .insert(name.to_string(), wrapper);
                }
                Some(instance)
            }
            Err(e) => {
                tracing::debug!(bean = name, "Bean creation exception on FactoryBean type check: {}", e);
                None
            }
        }
    }
}
