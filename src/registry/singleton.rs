//! Shared singleton registry and the early-reference protocol for circular references.

use std::collections::{HashMap, HashSet};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, ReentrantMutex};

use super::dependency::DependencyGraph;
use super::disposal::{DisposableAdapter, DisposalRegistry};
use crate::error::{BeanError, BeanResult};
use crate::key::BeanObject;

/// Deferred producer of an early reference, consumed on first use.
pub(crate) type EarlyFactory = Box<dyn FnOnce() -> BeanResult<BeanObject> + Send>;

#[derive(Default)]
struct SingletonState {
    singletons: HashMap<String, BeanObject>,
    early: HashMap<String, BeanObject>,
    early_factories: HashMap<String, EarlyFactory>,
    registered: Vec<String>,
    in_creation: HashMap<String, ThreadId>,
    products: HashMap<String, BeanObject>,
    destroying: bool,
}

impl SingletonState {
    fn register_name(&mut self, name: &str) {
        if !self.registered.iter().any(|n| n == name) {
            self.registered.push(name.to_string());
        }
    }

    fn evict(&mut self, name: &str) {
        self.singletons.remove(name);
        self.early.remove(name);
        self.early_factories.remove(name);
        self.products.remove(name);
        self.registered.retain(|n| n != name);
    }
}

/// Finished and in-progress singletons, plus dependency edges and disposal callbacks.
///
/// Singleton creation is serialized by a container-wide reentrant lock so a thread
/// may create dependencies while holding it; bookkeeping sits behind a separate
/// short-held mutex so finished singletons are readable at any time.
#[derive(Default)]
pub(crate) struct SingletonRegistry {
    creation_lock: ReentrantMutex<()>,
    state: Mutex<SingletonState>,
    graph: Mutex<DependencyGraph>,
    disposals: Mutex<DisposalRegistry>,
}

impl SingletonRegistry {
    /// Registers an externally created singleton.
    pub(crate) fn register_singleton(&self, name: &str, object: BeanObject) -> BeanResult<()> {
        let mut state = self.state.lock();
        if state.singletons.contains_key(name) {
            return Err(BeanError::definition(
                name,
                None,
                format!(
                    "Could not register object under bean name '{}': there is already an object bound",
                    name
                ),
            ));
        }
        state.singletons.insert(name.to_string(), object);
        state.early.remove(name);
        state.early_factories.remove(name);
        state.register_name(name);
        Ok(())
    }

    /// Finished singleton only.
    pub(crate) fn get(&self, name: &str) -> Option<BeanObject> {
        self.state.lock().singletons.get(name).cloned()
    }

    /// Finished singleton, else the early reference if the calling thread is creating it.
    ///
    /// With `allow_early`, a registered early factory is invoked and replaced by its result.
    pub(crate) fn get_singleton(&self, name: &str, allow_early: bool) -> BeanResult<Option<BeanObject>> {
        let factory = {
            let mut state = self.state.lock();
            if let Some(object) = state.singletons.get(name) {
                return Ok(Some(object.clone()));
            }
            if state.in_creation.get(name) != Some(&thread::current().id()) {
                return Ok(None);
            }
            if let Some(early) = state.early.get(name) {
                return Ok(Some(early.clone()));
            }
            if !allow_early {
                return Ok(None);
            }
            match state.early_factories.remove(name) {
                Some(factory) => factory,
                None => return Ok(None),
            }
        };
        let early = factory()?;
        let mut state = self.state.lock();
        state.early.insert(name.to_string(), early.clone());
        Ok(Some(early))
    }

    /// Returns the singleton `name`, running `creator` under the creation lock if absent.
    ///
    /// Success stores the instance and drops early references; failure evicts every
    /// trace of the attempt so a later call starts from a clean slate.
    pub(crate) fn get_or_create(
        &self,
        name: &str,
        creator: impl FnOnce() -> BeanResult<BeanObject>,
    ) -> BeanResult<BeanObject> {
        let _creation = self.creation_lock.lock();
        {
            let mut state = self.state.lock();
            if let Some(existing) = state.singletons.get(name) {
                return Ok(existing.clone());
            }
            if state.destroying {
                return Err(BeanError::CreationNotAllowed {
                    bean_name: name.to_string(),
                });
            }
            if state.in_creation.contains_key(name) {
                return Err(BeanError::CurrentlyInCreation {
                    bean_name: name.to_string(),
                });
            }
            state
                .in_creation
                .insert(name.to_string(), thread::current().id());
        }
        tracing::debug!(bean = name, "Creating shared instance of singleton bean");

        let result = creator();

        let mut state = self.state.lock();
        state.in_creation.remove(name);
        match result {
            Ok(object) => {
                state.singletons.insert(name.to_string(), object.clone());
                state.early.remove(name);
                state.early_factories.remove(name);
                state.register_name(name);
                Ok(object)
            }
            Err(e) => {
                state.evict(name);
                drop(state);
                self.disposals.lock().remove(name);
                Err(e)
            }
        }
    }

    /// Registers an early factory unless the singleton is already finished.
    pub(crate) fn add_early_factory(&self, name: &str, factory: EarlyFactory) {
        let mut state = self.state.lock();
        if state.singletons.contains_key(name) {
            return;
        }
        state.early_factories.insert(name.to_string(), factory);
        state.early.remove(name);
        state.register_name(name);
    }

    pub(crate) fn is_in_creation(&self, name: &str) -> bool {
        self.state.lock().in_creation.contains_key(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.state.lock().singletons.contains_key(name)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .registered
            .iter()
            .filter(|n| state.singletons.contains_key(*n))
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().singletons.len()
    }

    /// Runs `f` while holding the creation lock, so it cannot interleave with a
    /// singleton creation on another thread.
    pub(crate) fn with_creation_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        let _creation = self.creation_lock.lock();
        f()
    }

    /// Cached factory-bean product for `name`, produced under the creation lock on first use.
    pub(crate) fn product_or_create(
        &self,
        name: &str,
        produce: impl FnOnce() -> BeanResult<BeanObject>,
    ) -> BeanResult<BeanObject> {
        let _creation = self.creation_lock.lock();
        if let Some(product) = self.state.lock().products.get(name) {
            return Ok(product.clone());
        }
        let product = produce()?;
        Ok(self
            .state
            .lock()
            .products
            .entry(name.to_string())
            .or_insert(product)
            .clone())
    }

    pub(crate) fn register_dependent(&self, bean: &str, dependent: &str) {
        self.graph.lock().register(bean, dependent);
    }

    pub(crate) fn dependents_of(&self, bean: &str) -> Vec<String> {
        self.graph.lock().dependents_of(bean)
    }

    pub(crate) fn dependencies_of(&self, bean: &str) -> Vec<String> {
        self.graph.lock().dependencies_of(bean)
    }

    pub(crate) fn has_dependents(&self, bean: &str) -> bool {
        self.graph.lock().has_dependents(bean)
    }

    pub(crate) fn is_dependent(&self, bean: &str, dependent: &str) -> bool {
        self.graph.lock().is_dependent(bean, dependent)
    }

    pub(crate) fn register_disposable(&self, adapter: DisposableAdapter) {
        self.disposals.lock().register(adapter);
    }

    pub(crate) fn is_disposable(&self, name: &str) -> bool {
        self.disposals.lock().contains(name)
    }

    /// Removes `name` and destroys it, destroying its dependents first.
    pub(crate) fn destroy_singleton(&self, name: &str) {
        self.state.lock().evict(name);
        let mut visited = HashSet::new();
        self.destroy_bean(name, &mut visited);
    }

    fn destroy_bean(&self, name: &str, visited: &mut HashSet<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        for dependent in self.dependents_of(name) {
            self.state.lock().evict(&dependent);
            self.destroy_bean(&dependent, visited);
        }
        let adapter = self.disposals.lock().remove(name);
        if let Some(adapter) = adapter {
            tracing::debug!(bean = name, "Destroying singleton");
            adapter.destroy();
        }
    }

    /// Destroys every disposable singleton in reverse registration order, then clears
    /// all caches and the dependency graph.
    pub(crate) fn destroy_singletons(&self) {
        self.state.lock().destroying = true;
        let names = self.disposals.lock().names_reversed();
        tracing::debug!(count = names.len(), "Destroying singletons");
        for name in names {
            self.destroy_singleton(&name);
        }
        self.graph.lock().clear();
        let mut state = self.state.lock();
        state.singletons.clear();
        state.early.clear();
        state.early_factories.clear();
        state.products.clear();
        state.registered.clear();
        state.destroying = false;
    }

    pub(crate) fn pending_disposals(&self) -> usize {
        self.disposals.lock().len()
    }
}
