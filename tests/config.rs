use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, ConfigError, FactoryConfig, Value};
use serial_test::serial;
use std::env;
use std::sync::{Arc, Mutex};

const KEYS: [&str; 4] = [
    "FERROUS_BEANS_ALLOW_CIRCULAR_REFERENCES",
    "FERROUS_BEANS_ALLOW_RAW_INJECTION_DESPITE_WRAPPING",
    "FERROUS_BEANS_ALLOW_DEFINITION_OVERRIDING",
    "FERROUS_BEANS_CACHE_PROPERTY_DESCRIPTORS",
];

fn clear_env() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = FactoryConfig::from_env().unwrap();
    assert!(config.allow_circular_references);
    assert!(!config.allow_raw_injection_despite_wrapping);
    assert!(config.allow_definition_overriding);
    assert!(config.cache_property_descriptors);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    env::set_var("FERROUS_BEANS_ALLOW_CIRCULAR_REFERENCES", "false");
    env::set_var("FERROUS_BEANS_ALLOW_RAW_INJECTION_DESPITE_WRAPPING", "yes");
    let config = FactoryConfig::from_env();
    clear_env();

    let config = config.unwrap();
    assert!(!config.allow_circular_references);
    assert!(config.allow_raw_injection_despite_wrapping);
}

#[test]
#[serial]
fn test_from_env_rejects_invalid_values() {
    clear_env();
    env::set_var("FERROUS_BEANS_ALLOW_DEFINITION_OVERRIDING", "perhaps");
    let result = FactoryConfig::from_env();
    clear_env();

    match result.unwrap_err() {
        ConfigError::InvalidValue { key, value } => {
            assert_eq!(key, "FERROUS_BEANS_ALLOW_DEFINITION_OVERRIDING");
            assert_eq!(value, "perhaps");
        }
        #[allow(unreachable_patterns)]
        other => panic!("unexpected error: {other}"),
    }
}

#[derive(Default)]
struct Left {
    right: Mutex<Option<Arc<Right>>>,
}

#[derive(Default)]
struct Right {
    left: Mutex<Option<Arc<Left>>>,
}

#[test]
#[serial]
fn test_environment_config_drives_the_factory() {
    clear_env();
    env::set_var("FERROUS_BEANS_ALLOW_CIRCULAR_REFERENCES", "0");
    let config = FactoryConfig::from_env().unwrap();
    clear_env();

    let factory = BeanFactory::builder()
        .config(config)
        .register_type(
            BeanType::of::<Left>()
                .default_constructor(Left::default)
                .reference::<Right>("right", |l, r| *l.right.lock().unwrap() = Some(r))
                .build(),
        )
        .register_type(
            BeanType::of::<Right>()
                .default_constructor(Right::default)
                .reference::<Left>("left", |r, l| *r.left.lock().unwrap() = Some(l))
                .build(),
        )
        .define("left", BeanDefinition::of::<Left>().property("right", Value::reference("right")))
        .define("right", BeanDefinition::of::<Right>().property("left", Value::reference("left")))
        .build();

    assert!(factory.get_bean("left").unwrap_err().is_currently_in_creation());
}

#[cfg(feature = "config")]
#[test]
fn test_from_json() {
    let config = FactoryConfig::from_json(
        r#"{ "allow_definition_overriding": false, "cache_property_descriptors": false }"#,
    )
    .unwrap();
    assert!(!config.allow_definition_overriding);
    assert!(!config.cache_property_descriptors);
    assert!(config.allow_circular_references);

    assert!(matches!(
        FactoryConfig::from_json("{ not json"),
        Err(ConfigError::Json(_))
    ));
}
