//! Type keys identifying bean types, property types and injection targets.

use std::any::{Any, TypeId};
use std::sync::Arc;

/// Type-erased bean instance as stored in the factory.
pub type BeanObject = Arc<dyn Any + Send + Sync>;

/// Key identifying a Rust type at runtime.
///
/// Pairs the `TypeId` used for lookups with the type name used for diagnostics.
/// Trait-object injection targets are keyed by the `Arc<dyn Trait>` they are stored as,
/// so that a `BeanObject` holding such a value downcasts with the same key.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::TypeKey;
///
/// trait Engine: Send + Sync {}
///
/// let key = TypeKey::of::<String>();
/// assert_eq!(key.name(), "alloc::string::String");
/// assert!(!key.is_object());
///
/// let trait_key = TypeKey::of_trait::<dyn Engine>();
/// assert!(trait_key.name().contains("dyn"));
/// assert!(TypeKey::object().is_object());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of a concrete type.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Key of a trait object target, stored as `Arc<T>` inside a [`BeanObject`].
    #[inline(always)]
    pub fn of_trait<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<Arc<T>>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The catch-all `Object` type: accepts any bean, never autowired by type.
    pub fn object() -> Self {
        TypeKey {
            id: TypeId::of::<dyn Any + Send + Sync>(),
            name: "Object",
        }
    }

    /// Key for a type known only by its id.
    pub(crate) fn from_id(id: TypeId) -> Self {
        TypeKey {
            id,
            name: "unregistered type",
        }
    }

    /// Key of the concrete value inside a bean object.
    pub fn of_object(object: &BeanObject) -> TypeId {
        (**object).type_id()
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_object(&self) -> bool {
        self.id == TypeId::of::<dyn Any + Send + Sync>()
    }
}

// Equality and hashing look at the TypeId only; names are for display.
impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// True if both objects are the same allocation.
#[inline(always)]
pub fn same_object(a: &BeanObject, b: &BeanObject) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_id_sees_through_arc() {
        let obj: BeanObject = Arc::new(5u32);
        assert_eq!(TypeKey::of_object(&obj), TypeId::of::<u32>());
    }

    #[test]
    fn same_object_compares_allocations() {
        let a: BeanObject = Arc::new(1u8);
        let b: BeanObject = Arc::new(1u8);
        assert!(same_object(&a, &a.clone()));
        assert!(!same_object(&a, &b));
    }
}
