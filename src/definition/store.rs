use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::{BeanDefinition, MergedDefinition};
use crate::error::{BeanError, BeanResult};

/// Source of merged bean definitions.
pub trait DefinitionStore: Send + Sync {
    /// Registers `definition` under `name`.
    fn register(&self, name: &str, definition: BeanDefinition) -> BeanResult<()>;

    fn remove(&self, name: &str) -> BeanResult<BeanDefinition>;

    fn contains(&self, name: &str) -> bool;

    /// Definition names in registration order.
    fn names(&self) -> Vec<String>;

    /// The merged definition for `name`, with parents applied; cached until invalidated.
    fn merged(&self, name: &str) -> BeanResult<Arc<MergedDefinition>>;

    /// Drops cached merged definitions so they are rebuilt on next access.
    fn clear_merged(&self);
}

#[derive(Default)]
struct Definitions {
    order: Vec<String>,
    by_name: HashMap<String, BeanDefinition>,
}

/// Definition store kept in memory.
///
/// ```rust
/// use ferrous_beans::{BeanDefinition, DefinitionStore, InMemoryDefinitionStore, Scope};
///
/// struct Job;
///
/// let store = InMemoryDefinitionStore::new(true);
/// store.register("base", BeanDefinition::of::<Job>().scope(Scope::Prototype)).unwrap();
/// store.register("job", BeanDefinition::child("base")).unwrap();
///
/// let merged = store.merged("job").unwrap();
/// assert!(merged.is_prototype());
/// assert_eq!(store.names(), vec!["base".to_string(), "job".to_string()]);
/// ```
pub struct InMemoryDefinitionStore {
    definitions: RwLock<Definitions>,
    merged: DashMap<String, Arc<MergedDefinition>>,
    allow_overriding: bool,
}

impl InMemoryDefinitionStore {
    pub fn new(allow_overriding: bool) -> Self {
        InMemoryDefinitionStore {
            definitions: RwLock::new(Definitions::default()),
            merged: DashMap::new(),
            allow_overriding,
        }
    }

    fn merge(&self, name: &str, chain: &mut Vec<String>) -> BeanResult<BeanDefinition> {
        let definition = self
            .definitions
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| BeanError::NoSuchBean {
                bean_name: name.to_string(),
            })?;
        let Some(parent) = definition.parent.clone() else {
            return Ok(definition);
        };
        if chain.iter().any(|n| *n == parent) || parent == name {
            return Err(BeanError::definition(
                name,
                definition.resource.as_deref(),
                format!("Circular parent reference to '{}'", parent),
            ));
        }
        chain.push(name.to_string());
        let mut flattened = match self.merge(&parent, chain) {
            Ok(flattened) => flattened,
            Err(BeanError::NoSuchBean { .. }) => {
                return Err(BeanError::definition(
                    name,
                    definition.resource.as_deref(),
                    format!("Could not resolve parent bean definition '{}'", parent),
                ))
            }
            Err(e) => return Err(e),
        };
        flattened.override_from(&definition);
        Ok(flattened)
    }
}

impl Default for InMemoryDefinitionStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DefinitionStore for InMemoryDefinitionStore {
    fn register(&self, name: &str, definition: BeanDefinition) -> BeanResult<()> {
        {
            let mut definitions = self.definitions.write();
            if definitions.by_name.contains_key(name) {
                if !self.allow_overriding {
                    return Err(BeanError::definition(
                        name,
                        definition.resource.as_deref(),
                        format!(
                            "Cannot register bean definition for bean '{}': there is already a definition bound",
                            name
                        ),
                    ));
                }
                tracing::debug!(bean = name, "Overriding bean definition");
            } else {
                definitions.order.push(name.to_string());
            }
            definitions.by_name.insert(name.to_string(), definition);
        }
        self.clear_merged();
        Ok(())
    }

    fn remove(&self, name: &str) -> BeanResult<BeanDefinition> {
        let removed = {
            let mut definitions = self.definitions.write();
            definitions.order.retain(|n| n != name);
            definitions.by_name.remove(name)
        };
        self.clear_merged();
        removed.ok_or_else(|| BeanError::NoSuchBean {
            bean_name: name.to_string(),
        })
    }

    fn contains(&self, name: &str) -> bool {
        self.definitions.read().by_name.contains_key(name)
    }

    fn names(&self) -> Vec<String> {
        self.definitions.read().order.clone()
    }

    fn merged(&self, name: &str) -> BeanResult<Arc<MergedDefinition>> {
        if let Some(merged) = self.merged.get(name) {
            return Ok(Arc::clone(merged.value()));
        }
        let flattened = self.merge(name, &mut Vec::new())?;
        let merged = self
            .merged
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MergedDefinition::new(name, flattened)));
        Ok(Arc::clone(merged.value()))
    }

    fn clear_merged(&self) {
        self.merged.clear();
    }
}
