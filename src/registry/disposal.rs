//! Destruction callbacks registered for finished singletons.

use std::collections::HashMap;
use std::sync::Arc;

use crate::key::BeanObject;
use crate::processor::BeanPostProcessor;
use crate::types::{DisposableView, MethodDescriptor};

/// Everything needed to destroy one bean.
pub(crate) struct DisposableAdapter {
    pub(crate) bean_name: String,
    pub(crate) bean: BeanObject,
    pub(crate) disposable: Option<DisposableView>,
    pub(crate) destroy_method: Option<MethodDescriptor>,
    pub(crate) processors: Vec<Arc<dyn BeanPostProcessor>>,
}

impl DisposableAdapter {
    /// Runs destruction processors, `DisposableBean::destroy`, then the custom destroy method.
    /// Failures are logged and do not stop later steps.
    pub(crate) fn destroy(&self) {
        for processor in &self.processors {
            if let Err(e) = processor.before_destruction(&self.bean, &self.bean_name) {
                tracing::warn!(bean = %self.bean_name, error = %e, "Destruction processor failed");
            }
        }
        if let Some(disposable) = self.disposable.and_then(|view| view(&self.bean)) {
            tracing::trace!(bean = %self.bean_name, "Invoking destroy() on bean");
            if let Err(e) = disposable.destroy() {
                tracing::warn!(bean = %self.bean_name, error = %e, "Invocation of destroy method failed");
            }
        }
        if let Some(method) = &self.destroy_method {
            tracing::trace!(bean = %self.bean_name, method = %method.name, "Invoking custom destroy method");
            if let Err(e) = (method.invoke)(&self.bean) {
                tracing::warn!(
                    bean = %self.bean_name,
                    method = %method.name,
                    error = %e,
                    "Custom destroy method failed"
                );
            }
        }
    }
}

/// Disposable beans in registration order; destroyed last-registered first.
#[derive(Default)]
pub(crate) struct DisposalRegistry {
    order: Vec<String>,
    entries: HashMap<String, DisposableAdapter>,
}

impl DisposalRegistry {
    pub(crate) fn register(&mut self, adapter: DisposableAdapter) {
        let name = adapter.bean_name.clone();
        if self.entries.insert(name.clone(), adapter).is_none() {
            self.order.push(name);
        }
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<DisposableAdapter> {
        let adapter = self.entries.remove(name)?;
        self.order.retain(|n| n != name);
        Some(adapter)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in reverse registration order.
    pub(crate) fn names_reversed(&self) -> Vec<String> {
        self.order.iter().rev().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
