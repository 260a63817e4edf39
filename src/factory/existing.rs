//! Lifecycle services for objects the factory does not manage: one-off creation,
//! autowiring, configuration and destruction of caller-owned instances.
//!
//! Nothing created or configured here is registered as a singleton or for disposal.

use std::sync::Arc;

use super::BeanFactory;
use crate::definition::{BeanDefinition, MergedDefinition};
use crate::error::{BeanError, BeanResult};
use crate::key::{BeanObject, TypeKey};
use crate::processor::Capabilities;
use crate::registry::DisposableAdapter;
use crate::scope::{AutowireMode, DependencyCheck};
use crate::wrapper::BeanWrapper;

impl BeanFactory {
    /// Creates a fresh `T` through the full lifecycle: instantiation, processors,
    /// population and initialization, as for a prototype.
    ///
    /// The instance is named after its type and never cached.
    pub fn create_bean<T: Send + Sync + 'static>(&self) -> BeanResult<Arc<T>> {
        let key = TypeKey::of::<T>();
        let merged = Arc::new(MergedDefinition::new(key.name(), BeanDefinition::of::<T>().prototype()));
        let bean = self.create_bean_with(key.name(), &merged, None)?;
        self.downcast_existing::<T>(key.name(), bean)
    }

    /// Instantiates `T` and autowires it with `mode`, without initialization.
    ///
    /// [`AutowireMode::Constructor`] picks the greediest satisfiable constructor;
    /// other modes use the default constructor, then populate properties.
    pub fn autowire<T: Send + Sync + 'static>(
        &self,
        mode: AutowireMode,
        check: DependencyCheck,
    ) -> BeanResult<Arc<T>> {
        let key = TypeKey::of::<T>();
        let name = key.name();
        let merged = MergedDefinition::new(
            name,
            BeanDefinition::of::<T>()
                .prototype()
                .autowire(mode)
                .dependency_check(check),
        );
        let wrapper = self.create_instance(name, &merged, None)?;
        if mode != AutowireMode::Constructor {
            self.populate(name, &merged, &wrapper)?;
        }
        self.downcast_existing::<T>(name, Arc::clone(wrapper.instance()))
    }

    /// Autowires the properties of `existing` by name or type.
    ///
    /// Constructor autowiring makes no sense for an instance that already exists and
    /// is rejected. Explicit property values and processors still apply.
    pub fn autowire_bean_properties(
        &self,
        existing: &BeanObject,
        mode: AutowireMode,
        check: DependencyCheck,
    ) -> BeanResult<()> {
        let bean_type = self.type_of_instance(existing);
        let name = bean_type.name();
        if mode == AutowireMode::Constructor {
            return Err(BeanError::definition(
                name,
                None,
                "Autowiring by constructor is not supported for an existing bean instance",
            ));
        }
        let merged = MergedDefinition::new(
            name,
            BeanDefinition::of_key(bean_type.key())
                .prototype()
                .autowire(mode)
                .dependency_check(check),
        );
        let wrapper = BeanWrapper::new(Arc::clone(existing), Arc::clone(&bean_type), Arc::clone(&self.inner.types));
        self.populate(name, &merged, &wrapper)
    }

    /// Applies the property values of the definition `name` to `existing`, without
    /// autowiring or processors.
    pub fn apply_bean_property_values(&self, existing: &BeanObject, name: &str) -> BeanResult<()> {
        let merged = self.merged_definition(name)?;
        let wrapper = self.wrap_existing(existing);
        self.apply_property_values(name, &merged, &wrapper, merged.properties())
    }

    /// Populates and initializes `existing` as if it had been created from the
    /// definition `name`. Returns the bean to use, possibly a processor's wrapper.
    pub fn configure_bean(&self, existing: &BeanObject, name: &str) -> BeanResult<BeanObject> {
        let merged = self.merged_definition(name)?;
        tracing::debug!(bean = name, "Configuring existing bean instance");
        let wrapper = self.wrap_existing(existing);
        self.populate(name, &merged, &wrapper)?;
        self.initialize_bean_with(name, Arc::clone(existing), Some(&merged))
    }

    /// Runs aware callbacks, initialization processors and `InitializingBean` on
    /// `existing`. No definition applies, so custom init methods are not invoked.
    pub fn initialize_bean(&self, existing: &BeanObject, name: &str) -> BeanResult<BeanObject> {
        self.initialize_bean_with(name, Arc::clone(existing), None)
    }

    pub fn apply_before_initialization(&self, existing: &BeanObject, name: &str) -> BeanResult<BeanObject> {
        self.run_before_initialization(Arc::clone(existing), name)
            .map_err(|e| {
                BeanError::creation_caused_by(name, None, "BeanPostProcessor before initialization failed", e)
            })
    }

    pub fn apply_after_initialization(&self, existing: &BeanObject, name: &str) -> BeanResult<BeanObject> {
        self.run_after_initialization(Arc::clone(existing), name)
            .map_err(|e| {
                BeanError::creation_caused_by(name, None, "BeanPostProcessor after initialization failed", e)
            })
    }

    /// Runs destruction processors and `DisposableBean::destroy` on `existing`.
    ///
    /// Failures are logged, not returned.
    pub fn destroy_bean(&self, existing: &BeanObject) {
        let bean_type = self.type_of_instance(existing);
        let processors = self
            .inner
            .processors
            .with(Capabilities::DESTRUCTION)
            .into_iter()
            .filter(|p| p.requires_destruction(existing))
            .collect();
        DisposableAdapter {
            bean_name: bean_type.name().to_string(),
            bean: Arc::clone(existing),
            disposable: bean_type.lifecycle.disposable.filter(|view| view(existing).is_some()),
            destroy_method: None,
            processors,
        }
        .destroy();
    }

    fn wrap_existing(&self, existing: &BeanObject) -> BeanWrapper {
        BeanWrapper::new(
            Arc::clone(existing),
            self.type_of_instance(existing),
            Arc::clone(&self.inner.types),
        )
    }

    fn downcast_existing<T: Send + Sync + 'static>(&self, name: &str, bean: BeanObject) -> BeanResult<Arc<T>> {
        bean.downcast::<T>().map_err(|bean| BeanError::NotOfRequiredType {
            bean_name: name.to_string(),
            required: std::any::type_name::<T>(),
            actual: self.describe_type(&bean),
        })
    }
}
