//! One creation attempt, from type resolution to a registered, ready bean.

use std::sync::Arc;

use super::BeanFactory;
use crate::definition::MergedDefinition;
use crate::error::{BeanError, BeanResult, BoxError};
use crate::key::{same_object, BeanObject};
use crate::observer::{CreationState, CreationTracker};
use crate::processor::Capabilities;
use crate::registry::DisposableAdapter;
use crate::types::BeanType;

/// Name of the `DisposableBean` callback, never registered twice as a custom destroy method.
const DESTROY: &str = "destroy";

impl BeanFactory {
    /// Creates a bean instance for `name`: resolve, short-circuit or instantiate,
    /// populate, initialize, register for disposal.
    pub(crate) fn create_bean_with(
        &self,
        name: &str,
        merged: &Arc<MergedDefinition>,
        args: Option<&[BeanObject]>,
    ) -> BeanResult<BeanObject> {
        let mut tracker = self.inner.observers.track(name);
        tracker.advance(CreationState::Resolving);
        let result = self.create_bean_tracked(name, merged, args, &mut tracker);
        if let Err(e) = &result {
            tracker.fail(e);
        }
        result
    }

    fn create_bean_tracked(
        &self,
        name: &str,
        merged: &Arc<MergedDefinition>,
        args: Option<&[BeanObject]>,
        tracker: &mut CreationTracker<'_>,
    ) -> BeanResult<BeanObject> {
        tracing::debug!(bean = name, "Creating instance of bean");
        let resource = merged.resource_description();
        let bean_type = self.resolve_bean_type(name, merged)?;
        self.validate_lookup_overrides(name, merged, bean_type.as_deref())?;

        match self.resolve_before_instantiation(name, merged, bean_type.as_deref()) {
            Ok(Some(bean)) => {
                tracing::debug!(bean = name, "Bean supplied by a before-instantiation processor");
                tracker.advance(CreationState::ShortCircuited);
                return Ok(bean);
            }
            Ok(None) => {}
            Err(e) => {
                return Err(BeanError::creation_caused_by(
                    name,
                    resource,
                    "BeanPostProcessor before instantiation of bean failed",
                    e,
                ))
            }
        }

        let bean = self.do_create_bean(name, merged, args, tracker)?;
        tracing::debug!(bean = name, "Finished creating instance of bean");
        Ok(bean)
    }

    /// Gives before-instantiation processors the chance to return the bean instead.
    ///
    /// A surrogate still receives after-initialization processing.
    fn resolve_before_instantiation(
        &self,
        name: &str,
        merged: &MergedDefinition,
        bean_type: Option<&BeanType>,
    ) -> Result<Option<BeanObject>, BoxError> {
        if merged.cache().before_instantiation_resolved == Some(false) {
            return Ok(None);
        }
        let mut bean = None;
        if let Some(bean_type) = bean_type {
            if !merged.is_synthetic() && self.inner.processors.has(Capabilities::BEFORE_INSTANTIATION) {
                for processor in self.inner.processors.with(Capabilities::BEFORE_INSTANTIATION) {
                    if let Some(surrogate) = processor.before_instantiation(bean_type, name)? {
                        bean = Some(surrogate);
                        break;
                    }
                }
                if let Some(surrogate) = bean.take() {
                    bean = Some(self.run_after_initialization(surrogate, name)?);
                }
            }
        }
        merged.cache().before_instantiation_resolved = Some(bean.is_some());
        Ok(bean)
    }

    fn validate_lookup_overrides(
        &self,
        name: &str,
        merged: &MergedDefinition,
        bean_type: Option<&BeanType>,
    ) -> BeanResult<()> {
        for lookup in merged.lookup_overrides() {
            let found = bean_type.map_or(false, |t| t.has_lookup_method(&lookup.method));
            if !found {
                return Err(BeanError::definition(
                    name,
                    merged.resource_description(),
                    format!(
                        "Invalid method override: no method with name '{}' on type [{}]",
                        lookup.method,
                        bean_type.map_or("unknown", |t| t.name())
                    ),
                ));
            }
        }
        Ok(())
    }

    fn do_create_bean(
        &self,
        name: &str,
        merged: &Arc<MergedDefinition>,
        args: Option<&[BeanObject]>,
        tracker: &mut CreationTracker<'_>,
    ) -> BeanResult<BeanObject> {
        tracker.advance(CreationState::Instantiating);
        let cached = if merged.is_singleton() {
            self.inner.type_check_instances.lock().remove(name)
        } else {
            None
        };
        let wrapper = match cached {
            Some(wrapper) => wrapper,
            None => self.create_instance(name, merged, args)?,
        };
        let raw = Arc::clone(wrapper.instance());

        self.apply_merge_definition_processors(name, merged, wrapper.bean_type())?;

        let early_exposure = merged.is_singleton()
            && self.inner.config.allow_circular_references
            && self.inner.singletons.is_in_creation(name);
        if early_exposure {
            tracing::debug!(
                bean = name,
                "Eagerly caching bean to allow for resolving potential circular references"
            );
            let factory = self.downgrade();
            let early_name = name.to_string();
            let early_raw = Arc::clone(&raw);
            let synthetic = merged.is_synthetic();
            self.inner.singletons.add_early_factory(
                name,
                Box::new(move || match factory.upgrade() {
                    Some(factory) => factory.early_bean_reference(&early_name, early_raw, synthetic),
                    None => Ok(early_raw),
                }),
            );
            tracker.advance(CreationState::EarlyExposed);
        }

        tracker.advance(CreationState::Populating);
        let exposed = match self.populate(name, merged, &wrapper) {
            Ok(()) => {
                tracker.advance(CreationState::Initializing);
                self.initialize_bean_with(name, Arc::clone(&raw), Some(merged))
            }
            Err(e) => Err(e),
        }
        .map_err(|e| wrap_nested(name, merged, e))?;

        let exposed = if early_exposure {
            self.reconcile_early_reference(name, &raw, exposed)?
        } else {
            exposed
        };

        self.register_disposable_if_necessary(name, &exposed, merged)?;
        tracker.advance(CreationState::Ready);
        Ok(exposed)
    }

    /// Runs merge-definition processors once per merged definition.
    ///
    /// The creation lock is taken before the definition's post-processing lock, the
    /// same order a singleton creation acquires them in, so a processor may resolve
    /// other beans without risking a lock-order inversion.
    fn apply_merge_definition_processors(
        &self,
        name: &str,
        merged: &MergedDefinition,
        bean_type: &BeanType,
    ) -> BeanResult<()> {
        if merged.cache().post_processed {
            return Ok(());
        }
        self.inner.singletons.with_creation_lock(|| {
            let _guard = merged.post_processing.lock();
            if merged.cache().post_processed {
                return Ok(());
            }
            for processor in self.inner.processors.with(Capabilities::MERGE_DEFINITION) {
                processor
                    .merge_definition(merged, bean_type, name)
                    .map_err(|e| {
                        BeanError::creation_caused_by(
                            name,
                            merged.resource_description(),
                            "Post-processing of merged bean definition failed",
                            e,
                        )
                    })?;
            }
            merged.cache().post_processed = true;
            Ok(())
        })
    }

    /// Reference handed out to beans that ask for `name` while it is still being populated.
    pub(crate) fn early_bean_reference(
        &self,
        name: &str,
        raw: BeanObject,
        synthetic: bool,
    ) -> BeanResult<BeanObject> {
        if synthetic {
            return Ok(raw);
        }
        let mut exposed = raw;
        for processor in self.inner.processors.with(Capabilities::EARLY_REFERENCE) {
            exposed = processor.early_reference(exposed, name).map_err(|e| {
                BeanError::creation_caused_by(name, None, "Failed to obtain early bean reference", e)
            })?;
        }
        Ok(exposed)
    }

    /// Makes the final bean agree with any early reference already handed out.
    fn reconcile_early_reference(
        &self,
        name: &str,
        raw: &BeanObject,
        exposed: BeanObject,
    ) -> BeanResult<BeanObject> {
        let Some(early) = self.inner.singletons.get_singleton(name, false)? else {
            return Ok(exposed);
        };
        if same_object(&exposed, raw) {
            return Ok(early);
        }
        if !self.inner.config.allow_raw_injection_despite_wrapping
            && self.inner.singletons.has_dependents(name)
        {
            let dependents = self.inner.singletons.dependents_of(name);
            return Err(BeanError::CircularExposure {
                bean_name: name.to_string(),
                dependents,
            });
        }
        Ok(exposed)
    }

    fn register_disposable_if_necessary(
        &self,
        name: &str,
        bean: &BeanObject,
        merged: &MergedDefinition,
    ) -> BeanResult<()> {
        if !merged.is_singleton() {
            return Ok(());
        }
        let bean_type = self.type_of_instance(bean);
        let disposable = bean_type
            .lifecycle
            .disposable
            .filter(|view| view(bean).is_some())
            .filter(|_| !merged.is_externally_managed_destroy_method(DESTROY));

        let destroy_method = match merged.destroy_method() {
            Some(method)
                if !(disposable.is_some() && method == DESTROY)
                    && !merged.is_externally_managed_destroy_method(method) =>
            {
                match bean_type.method(method) {
                    Some(descriptor) => Some(descriptor.clone()),
                    None if merged.enforces_destroy_method() => {
                        return Err(BeanError::definition(
                            name,
                            merged.resource_description(),
                            format!(
                                "Could not find a destroy method named '{}' on bean with name '{}'",
                                method, name
                            ),
                        ));
                    }
                    None => None,
                }
            }
            _ => None,
        };

        let processors: Vec<_> = self
            .inner
            .processors
            .with(Capabilities::DESTRUCTION)
            .into_iter()
            .filter(|p| p.requires_destruction(bean))
            .collect();

        if disposable.is_none() && destroy_method.is_none() && processors.is_empty() {
            return Ok(());
        }
        self.inner.singletons.register_disposable(DisposableAdapter {
            bean_name: name.to_string(),
            bean: Arc::clone(bean),
            disposable,
            destroy_method,
            processors,
        });
        Ok(())
    }
}

/// Errors belonging to another bean are wrapped so the chain names every bean involved.
fn wrap_nested(name: &str, merged: &MergedDefinition, error: BeanError) -> BeanError {
    if error.bean_name() == Some(name) {
        return error;
    }
    BeanError::creation_caused_by(
        name,
        merged.resource_description(),
        "Initialization of bean failed",
        error,
    )
}
