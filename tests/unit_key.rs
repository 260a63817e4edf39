/// Unit tests for TypeKey identity and naming
use ferrous_beans::{same_object, trait_object, BeanObject, TypeKey};
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

#[test]
fn test_type_key_name_and_id() {
    let key = TypeKey::of::<String>();
    assert_eq!(key.name(), "alloc::string::String");
    assert_eq!(key.id(), TypeId::of::<String>());
    assert_eq!(key.to_string(), "alloc::string::String");
    assert!(!key.is_object());
}

#[test]
fn test_trait_key_matches_stored_trait_objects() {
    let key = TypeKey::of_trait::<dyn Greeter>();
    assert!(key.name().contains("Greeter"));
    assert_eq!(key.id(), TypeId::of::<Arc<dyn Greeter>>());

    let object: BeanObject = trait_object::<dyn Greeter>(Arc::new(English));
    assert_eq!(TypeKey::of_object(&object), key.id());
    let greeter = object.downcast_ref::<Arc<dyn Greeter>>().unwrap();
    assert_eq!(greeter.greet(), "hello");
}

#[test]
fn test_object_key_is_catch_all() {
    let object = TypeKey::object();
    assert!(object.is_object());
    assert_eq!(object.name(), "Object");
    assert_ne!(object, TypeKey::of::<String>());
}

#[test]
fn test_equality_ignores_names() {
    let mut keys = HashSet::new();
    keys.insert(TypeKey::of::<u32>());
    keys.insert(TypeKey::of::<u32>());
    keys.insert(TypeKey::of::<u64>());
    assert_eq!(keys.len(), 2);

    // Concrete type and trait target of the same type are different keys
    assert_ne!(TypeKey::of::<English>(), TypeKey::of_trait::<English>());
}

#[test]
fn test_same_object_tracks_allocations() {
    let a: BeanObject = Arc::new(String::from("a"));
    let b: BeanObject = Arc::new(String::from("a"));
    assert!(same_object(&a, &Arc::clone(&a)));
    assert!(!same_object(&a, &b));
}
