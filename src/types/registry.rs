//! Registry of bean types, the factory's type-loading facility.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::BeanType;
use crate::key::{BeanObject, TypeKey};

/// Registered bean types, addressable by `TypeId`, full type name or alias.
///
/// ```rust
/// use ferrous_beans::{BeanType, TypeKey, TypeRegistry};
/// use std::sync::Arc;
///
/// trait Shape: Send + Sync {}
/// #[derive(Default)] struct Square;
/// #[derive(Default)] struct Circle;
/// impl Shape for Square {}
/// impl Shape for Circle {}
///
/// let registry = TypeRegistry::new();
/// registry.register(BeanType::of::<Square>().named("Square")
///     .implements::<dyn Shape>(|s| s as Arc<dyn Shape>).build());
/// registry.register(BeanType::of::<Circle>()
///     .implements::<dyn Shape>(|c| c as Arc<dyn Shape>).build());
///
/// assert!(registry.resolve("Square").is_some());
/// let ancestor = registry.common_ancestor(&[TypeKey::of::<Square>(), TypeKey::of::<Circle>()]);
/// assert_eq!(ancestor, Some(TypeKey::of_trait::<dyn Shape>()));
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<TypeId, Arc<BeanType>>>,
    names: RwLock<HashMap<String, TypeId>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bean_type`, replacing an earlier registration of the same type.
    pub fn register(&self, bean_type: BeanType) -> Arc<BeanType> {
        let id = bean_type.key.id();
        {
            let mut names = self.names.write();
            names.insert(bean_type.name().to_string(), id);
            if let Some(alias) = &bean_type.alias {
                names.insert(alias.clone(), id);
            }
        }
        let bean_type = Arc::new(bean_type);
        self.types.write().insert(id, Arc::clone(&bean_type));
        bean_type
    }

    pub fn get(&self, id: TypeId) -> Option<Arc<BeanType>> {
        self.types.read().get(&id).cloned()
    }

    /// Looks a type up by alias or full type name.
    pub fn resolve(&self, name: &str) -> Option<Arc<BeanType>> {
        let id = *self.names.read().get(name)?;
        self.get(id)
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.types.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Whether a value of type `from` can be injected where `to` is expected.
    pub fn is_assignable(&self, from: &TypeKey, to: &TypeKey) -> bool {
        if to.is_object() || from == to {
            return true;
        }
        self.get(from.id())
            .map_or(false, |bean_type| bean_type.is_assignable_to(to))
    }

    /// Most specific type every key is assignable to, other than `Object`.
    pub fn common_ancestor(&self, keys: &[TypeKey]) -> Option<TypeKey> {
        let (first, rest) = keys.split_first()?;
        if rest.iter().all(|k| k == first) {
            return Some(*first);
        }
        let mut candidates = vec![*first];
        if let Some(bean_type) = self.get(first.id()) {
            candidates.extend(bean_type.upcast_keys());
        }
        candidates
            .into_iter()
            .find(|candidate| keys.iter().all(|k| self.is_assignable(k, candidate)))
    }

    /// Views `object` as `target`, converting to a trait object if its type declares one.
    pub fn upcast(&self, object: &BeanObject, target: &TypeKey) -> Option<BeanObject> {
        let id = TypeKey::of_object(object);
        if target.is_object() || id == target.id() {
            return Some(Arc::clone(object));
        }
        self.get(id)?.upcast(object, target.id())
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = self.types.read();
        let mut names: Vec<_> = types.values().map(|t| t.name()).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
