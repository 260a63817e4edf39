//! Initialization: aware callbacks, init methods and the initialization processors
//! around them.

use std::sync::Arc;

use super::BeanFactory;
use crate::definition::MergedDefinition;
use crate::error::{BeanError, BeanResult, BoxError};
use crate::key::BeanObject;
use crate::processor::Capabilities;
use crate::types::BeanType;

/// Name of the `InitializingBean` callback, never invoked twice as a custom init method.
const AFTER_PROPERTIES_SET: &str = "after_properties_set";

impl BeanFactory {
    /// Delivers aware callbacks, runs before-initialization processors, init methods and
    /// after-initialization processors. Returns the bean to expose, possibly a wrapper.
    pub(crate) fn initialize_bean_with(
        &self,
        name: &str,
        bean: BeanObject,
        merged: Option<&MergedDefinition>,
    ) -> BeanResult<BeanObject> {
        let resource = merged.and_then(MergedDefinition::resource_description);
        let synthetic = merged.map_or(false, MergedDefinition::is_synthetic);
        self.invoke_aware_methods(name, &bean, &self.type_of_instance(&bean));

        let mut wrapped = bean;
        if !synthetic {
            wrapped = self.run_before_initialization(wrapped, name).map_err(|e| {
                BeanError::creation_caused_by(
                    name,
                    resource,
                    "BeanPostProcessor before initialization failed",
                    e,
                )
            })?;
        }

        self.invoke_init_methods(name, &wrapped, merged)?;

        if !synthetic {
            wrapped = self.run_after_initialization(wrapped, name).map_err(|e| {
                BeanError::creation_caused_by(
                    name,
                    resource,
                    "BeanPostProcessor after initialization failed",
                    e,
                )
            })?;
        }
        Ok(wrapped)
    }

    fn invoke_aware_methods(&self, name: &str, bean: &BeanObject, bean_type: &BeanType) {
        let lifecycle = &bean_type.lifecycle;
        if let Some(aware) = lifecycle.name_aware.and_then(|view| view(bean)) {
            aware.set_bean_name(name);
        }
        if let Some(aware) = lifecycle.registry_aware.and_then(|view| view(bean)) {
            aware.set_type_registry(Arc::clone(&self.inner.types));
        }
        if let Some(aware) = lifecycle.factory_aware.and_then(|view| view(bean)) {
            aware.set_bean_factory(self.downgrade());
        }
    }

    fn invoke_init_methods(
        &self,
        name: &str,
        bean: &BeanObject,
        merged: Option<&MergedDefinition>,
    ) -> BeanResult<()> {
        let resource = merged.and_then(MergedDefinition::resource_description);
        let bean_type = self.type_of_instance(bean);
        let initializing = bean_type.lifecycle.initializing.and_then(|view| view(bean));

        if let Some(initializing) = initializing {
            let external =
                merged.map_or(false, |m| m.is_externally_managed_init_method(AFTER_PROPERTIES_SET));
            if !external {
                tracing::trace!(bean = name, "Invoking after_properties_set() on bean");
                initializing.after_properties_set().map_err(|e| {
                    init_failed(name, resource, "Invocation of init method failed".to_string(), e)
                })?;
            }
        }

        let Some(merged) = merged else {
            return Ok(());
        };
        let Some(method) = merged.init_method() else {
            return Ok(());
        };
        if (initializing.is_some() && method == AFTER_PROPERTIES_SET)
            || merged.is_externally_managed_init_method(method)
        {
            return Ok(());
        }

        match bean_type.method(method) {
            Some(descriptor) => {
                tracing::trace!(bean = name, method = method, "Invoking init method on bean");
                (descriptor.invoke)(bean).map_err(|e| {
                    init_failed(name, resource, format!("Invocation of init method '{}' failed", method), e)
                })
            }
            None if merged.enforces_init_method() => Err(BeanError::definition(
                name,
                resource,
                format!(
                    "Could not find an init method named '{}' on bean with name '{}'",
                    method, name
                ),
            )),
            None => {
                tracing::trace!(bean = name, method = method, "No default init method found on bean");
                Ok(())
            }
        }
    }

    pub(crate) fn run_before_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> Result<BeanObject, BoxError> {
        let mut current = bean;
        for processor in self.inner.processors.with(Capabilities::BEFORE_INITIALIZATION) {
            if let Some(replacement) = processor.before_initialization(&current, name)? {
                current = replacement;
            }
        }
        Ok(current)
    }

    pub(crate) fn run_after_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> Result<BeanObject, BoxError> {
        let mut current = bean;
        for processor in self.inner.processors.with(Capabilities::AFTER_INITIALIZATION) {
            if let Some(replacement) = processor.after_initialization(&current, name)? {
                current = replacement;
            }
        }
        Ok(current)
    }
}

fn init_failed(name: &str, resource: Option<&str>, message: String, source: BoxError) -> BeanError {
    BeanError::Initialization {
        bean_name: name.to_string(),
        resource: resource.map(str::to_string),
        message,
        source: Arc::from(source),
    }
}
