//! Bean post-processors: ordered extension points around bean creation.
//!
//! Each processor declares its [`Capabilities`]; the factory only calls the hooks a
//! processor declared, in registration order.

use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;

use crate::definition::MergedDefinition;
use crate::error::BoxError;
use crate::key::{BeanObject, TypeKey};
use crate::types::{BeanType, PropertyDescriptor};
use crate::value::PropertyValues;

bitflags! {
    /// Hooks a processor participates in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        const MERGE_DEFINITION = 1 << 0;
        const BEFORE_INSTANTIATION = 1 << 1;
        const AFTER_INSTANTIATION = 1 << 2;
        const PROPERTY_VALUES = 1 << 3;
        const BEFORE_INITIALIZATION = 1 << 4;
        const AFTER_INITIALIZATION = 1 << 5;
        const EARLY_REFERENCE = 1 << 6;
        const PREDICT_TYPE = 1 << 7;
        const CANDIDATE_CONSTRUCTORS = 1 << 8;
        const DESTRUCTION = 1 << 9;
    }
}

/// Extension point invoked around the creation and destruction of every bean
///
/// All hooks have pass-through defaults; override the ones named in
/// [`capabilities`](BeanPostProcessor::capabilities).
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanObject, BeanPostProcessor, BoxError, Capabilities};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingProcessor {
///     initialized: AtomicUsize,
/// }
///
/// impl BeanPostProcessor for CountingProcessor {
///     fn capabilities(&self) -> Capabilities {
///         Capabilities::AFTER_INITIALIZATION
///     }
///
///     fn after_initialization(&self, _bean: &BeanObject, _name: &str) -> Result<Option<BeanObject>, BoxError> {
///         self.initialized.fetch_add(1, Ordering::SeqCst);
///         Ok(None)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Adjusts the merged definition once, before population; may register
    /// externally managed init or destroy methods.
    ///
    /// Runs while the factory's creation lock is held, so resolving other beans from
    /// here is safe but blocks singleton creation on other threads until it returns.
    fn merge_definition(
        &self,
        _definition: &MergedDefinition,
        _bean_type: &BeanType,
        _bean_name: &str,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Returns a surrogate that replaces the whole creation of the bean.
    fn before_instantiation(
        &self,
        _bean_type: &BeanType,
        _bean_name: &str,
    ) -> Result<Option<BeanObject>, BoxError> {
        Ok(None)
    }

    /// Returning `false` skips property population for the bean.
    fn after_instantiation(&self, _bean: &BeanObject, _bean_name: &str) -> Result<bool, BoxError> {
        Ok(true)
    }

    /// Rewrites the property values about to be applied; `None` skips applying them.
    ///
    /// `descriptors` are the writable properties of the bean's type, minus those
    /// whose type is an ignored dependency type or that an ignored interface sets.
    fn rewrite_property_values(
        &self,
        values: PropertyValues,
        _descriptors: &[PropertyDescriptor],
        _bean: &BeanObject,
        _bean_name: &str,
    ) -> Result<Option<PropertyValues>, BoxError> {
        Ok(Some(values))
    }

    /// `None` keeps the current bean.
    fn before_initialization(
        &self,
        _bean: &BeanObject,
        _bean_name: &str,
    ) -> Result<Option<BeanObject>, BoxError> {
        Ok(None)
    }

    /// `None` keeps the current bean.
    fn after_initialization(
        &self,
        _bean: &BeanObject,
        _bean_name: &str,
    ) -> Result<Option<BeanObject>, BoxError> {
        Ok(None)
    }

    /// Type the bean will eventually have, if this processor changes it.
    fn predict_type(&self, _bean_type: &BeanType, _bean_name: &str) -> Option<TypeKey> {
        None
    }

    /// Constructor indices to consider for autowiring.
    fn candidate_constructors(
        &self,
        _bean_type: &BeanType,
        _bean_name: &str,
    ) -> Result<Option<Vec<usize>>, BoxError> {
        Ok(None)
    }

    /// Reference handed out to beans resolving a circular dependency on `bean`.
    fn early_reference(&self, bean: BeanObject, _bean_name: &str) -> Result<BeanObject, BoxError> {
        Ok(bean)
    }

    fn before_destruction(&self, _bean: &BeanObject, _bean_name: &str) -> Result<(), BoxError> {
        Ok(())
    }

    /// Whether `bean` needs [`before_destruction`](BeanPostProcessor::before_destruction).
    fn requires_destruction(&self, _bean: &BeanObject) -> bool {
        true
    }
}

/// Registered processors in order, with the union of their capabilities.
#[derive(Default)]
pub(crate) struct ProcessorPipeline {
    inner: RwLock<PipelineInner>,
}

struct PipelineInner {
    processors: Arc<[Arc<dyn BeanPostProcessor>]>,
    capabilities: Capabilities,
}

impl Default for PipelineInner {
    fn default() -> Self {
        PipelineInner {
            processors: Arc::from(Vec::new()),
            capabilities: Capabilities::empty(),
        }
    }
}

impl ProcessorPipeline {
    /// Appends `processor`; a processor already registered moves to the end.
    pub(crate) fn add(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut inner = self.inner.write();
        let mut processors: Vec<_> = inner
            .processors
            .iter()
            .filter(|p| !Arc::ptr_eq(p, &processor))
            .cloned()
            .collect();
        processors.push(processor);
        inner.capabilities = processors
            .iter()
            .fold(Capabilities::empty(), |acc, p| acc | p.capabilities());
        inner.processors = processors.into();
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().processors.len()
    }

    /// Whether any registered processor declares `capability`.
    pub(crate) fn has(&self, capability: Capabilities) -> bool {
        self.inner.read().capabilities.intersects(capability)
    }

    /// Processors declaring `capability`, in registration order.
    pub(crate) fn with(&self, capability: Capabilities) -> Vec<Arc<dyn BeanPostProcessor>> {
        let inner = self.inner.read();
        if !inner.capabilities.intersects(capability) {
            return Vec::new();
        }
        inner
            .processors
            .iter()
            .filter(|p| p.capabilities().contains(capability))
            .cloned()
            .collect()
    }
}
