use ferrous_beans::{
    BeanDefinition, BeanError, BeanFactory, BeanObject, BeanType, Instantiation, TypeKey, Value,
    ValueType,
};
use std::sync::Arc;

#[derive(Debug)]
struct Connection {
    url: String,
    pool: u32,
}

fn connection_type() -> BeanType {
    BeanType::of::<Connection>()
        .static_factory::<Connection>("open", vec![ValueType::simple::<String>()], |args| {
            Ok(Connection {
                url: args.value::<String>()?,
                pool: 1,
            })
        })
        .static_factory::<Connection>(
            "open",
            vec![ValueType::simple::<String>(), ValueType::simple::<u32>()],
            |args| {
                Ok(Connection {
                    url: args.value::<String>()?,
                    pool: args.value::<u32>()?,
                })
            },
        )
        .static_factory::<Connection>("make", vec![ValueType::simple::<u32>()], |args| {
            Ok(Connection {
                url: "numbered".to_string(),
                pool: args.value::<u32>()?,
            })
        })
        .static_factory::<Connection>("make", vec![ValueType::simple::<String>()], |args| {
            Ok(Connection {
                url: args.value::<String>()?,
                pool: 0,
            })
        })
        .build()
}

struct ConnectionFactory {
    prefix: String,
}

fn connection_factory_type() -> BeanType {
    BeanType::of::<ConnectionFactory>()
        .default_constructor(|| ConnectionFactory {
            prefix: "db://".to_string(),
        })
        .instance_factory::<Connection>("connect", vec![ValueType::simple::<String>()], |f, args| {
            Ok(Connection {
                url: format!("{}{}", f.prefix, args.value::<String>()?),
                pool: 4,
            })
        })
        .build()
}

#[test]
fn test_static_factory_method_overload_by_argument_count() {
    let factory = BeanFactory::builder()
        .register_type(connection_type())
        .define(
            "single",
            BeanDefinition::of::<Connection>()
                .factory_method("open")
                .constructor_arg(0, Value::literal("db://single")),
        )
        .define(
            "pooled",
            BeanDefinition::of::<Connection>()
                .factory_method("open")
                .constructor_arg(0, Value::literal("db://pooled"))
                .constructor_arg(1, Value::literal("16")),
        )
        .build();

    let single = factory.get_typed::<Connection>("single").unwrap();
    assert_eq!(single.url, "db://single");
    assert_eq!(single.pool, 1);

    let pooled = factory.get_typed::<Connection>("pooled").unwrap();
    assert_eq!(pooled.pool, 16);
    assert!(matches!(
        factory.merged_definition("pooled").unwrap().resolved_instantiation(),
        Some(Instantiation::FactoryMethod { index: 1 })
    ));
}

#[test]
fn test_ambiguous_factory_methods_are_rejected() {
    let factory = BeanFactory::builder()
        .register_type(connection_type())
        .define(
            "conn",
            BeanDefinition::of::<Connection>()
                .factory_method("make")
                .generic_arg(Value::literal("42")),
        )
        .build();

    match factory.get_bean("conn").unwrap_err() {
        BeanError::Creation { message, .. } => {
            assert!(message.starts_with("Ambiguous factory method matches found"), "{message}");
            assert!(message.contains("make(u32)"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_factory_method() {
    let factory = BeanFactory::builder()
        .register_type(connection_type())
        .define("conn", BeanDefinition::of::<Connection>().factory_method("close"))
        .build();

    let err = factory.get_bean("conn").unwrap_err();
    assert!(err.to_string().contains("No matching factory method found"), "{err}");
}

#[test]
fn test_instance_factory_method() {
    let factory = BeanFactory::builder()
        .register_type(connection_factory_type())
        .register_type(connection_type())
        .define("connections", BeanDefinition::of::<ConnectionFactory>())
        .define(
            "conn",
            BeanDefinition::new()
                .factory_bean_method("connections", "connect")
                .constructor_arg(0, Value::literal("orders")),
        )
        .build();

    assert_eq!(
        factory.get_type("conn").unwrap(),
        Some(TypeKey::of::<Connection>())
    );
    assert_eq!(factory.singleton_count(), 0);

    let conn = factory.get_typed::<Connection>("conn").unwrap();
    assert_eq!(conn.url, "db://orders");
    assert_eq!(conn.pool, 4);
    assert_eq!(factory.dependents_of("connections"), vec!["conn".to_string()]);
}

#[test]
fn test_factory_bean_reference_to_itself() {
    let factory = BeanFactory::builder()
        .register_type(connection_factory_type())
        .define("looped", BeanDefinition::new().factory_bean_method("looped", "connect"))
        .build();

    match factory.get_bean("looped").unwrap_err() {
        BeanError::Definition { message, .. } => {
            assert_eq!(message, "factory-bean reference points back to the same bean definition")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_explicit_arguments_override_definition() {
    let factory = BeanFactory::builder()
        .register_type(connection_type())
        .define(
            "conn",
            BeanDefinition::of::<Connection>()
                .prototype()
                .factory_method("open")
                .constructor_arg(0, Value::literal("db://default")),
        )
        .build();

    let args: Vec<BeanObject> = vec![Arc::new("db://explicit".to_string()), Arc::new(9u32)];
    let explicit = factory
        .get_bean_with_args("conn", args)
        .unwrap()
        .downcast::<Connection>()
        .unwrap();
    assert_eq!(explicit.url, "db://explicit");
    assert_eq!(explicit.pool, 9);

    let plain = factory.get_typed::<Connection>("conn").unwrap();
    assert_eq!(plain.url, "db://default");
    assert_eq!(plain.pool, 1);
}

#[test]
fn test_explicit_arguments_of_wrong_type() {
    let factory = BeanFactory::builder()
        .register_type(connection_type())
        .define(
            "conn",
            BeanDefinition::of::<Connection>().prototype().factory_method("open"),
        )
        .build();

    let args: Vec<BeanObject> = vec![Arc::new(1.5f64)];
    let err = factory.get_bean_with_args("conn", args).unwrap_err();
    match err {
        BeanError::UnsatisfiedDependency { property, .. } => {
            assert_eq!(property, "constructor argument 0")
        }
        other => panic!("unexpected error: {other}"),
    }
}

struct Pool {
    size: u32,
    name: String,
}

#[test]
fn test_generic_arguments_match_by_type() {
    let factory = BeanFactory::builder()
        .register_type(
            BeanType::of::<Pool>()
                .constructor(
                    vec![ValueType::simple::<u32>(), ValueType::simple::<String>()],
                    |args| {
                        Ok(Pool {
                            size: args.value::<u32>()?,
                            name: args.value::<String>()?,
                        })
                    },
                )
                .build(),
        )
        .define(
            "pool",
            BeanDefinition::of::<Pool>()
                .generic_arg(Value::literal("workers"))
                .generic_arg(Value::literal("8")),
        )
        .build();

    let pool = factory.get_typed::<Pool>("pool").unwrap();
    assert_eq!(pool.size, 8);
    assert_eq!(pool.name, "workers");
}

#[test]
fn test_no_default_constructor() {
    let factory = BeanFactory::builder()
        .register_type(
            BeanType::of::<Pool>()
                .constructor(vec![ValueType::simple::<u32>()], |args| {
                    Ok(Pool {
                        size: args.value::<u32>()?,
                        name: String::new(),
                    })
                })
                .build(),
        )
        .define("pool", BeanDefinition::of::<Pool>())
        .build();

    let err = factory.get_bean("pool").unwrap_err();
    assert!(err.to_string().contains("No default constructor found"), "{err}");
}

#[test]
fn test_constructor_errors_are_wrapped() {
    let factory = BeanFactory::builder()
        .register_type(
            BeanType::of::<Pool>()
                .constructor(vec![], |_| Err("out of file descriptors".into()))
                .build(),
        )
        .define("pool", BeanDefinition::of::<Pool>())
        .build();

    let err = factory.get_bean("pool").unwrap_err();
    match &err {
        BeanError::Creation { message, source, .. } => {
            assert!(message.contains("threw error"), "{message}");
            assert_eq!(
                source.as_ref().map(|s| s.to_string()),
                Some("out of file descriptors".to_string())
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

struct Secret;

#[test]
fn test_non_public_types_need_access() {
    let factory = BeanFactory::builder()
        .register_type(BeanType::of::<Secret>().default_constructor(|| Secret).non_public().build())
        .define("allowed", BeanDefinition::of::<Secret>())
        .define("denied", BeanDefinition::of::<Secret>().non_public_access(false))
        .build();

    assert!(factory.get_typed::<Secret>("allowed").is_ok());
    let err = factory.get_bean("denied").unwrap_err();
    assert!(err.to_string().contains("non-public access not allowed"), "{err}");
}

#[test]
fn test_default_constructor_is_cached() {
    let factory = BeanFactory::builder()
        .register_type(BeanType::of::<Secret>().default_constructor(|| Secret).build())
        .define("secret", BeanDefinition::of::<Secret>().prototype())
        .build();

    factory.get_bean("secret").unwrap();
    factory.get_bean("secret").unwrap();
    assert_eq!(
        factory.merged_definition("secret").unwrap().resolved_instantiation(),
        Some(Instantiation::DefaultConstructor { index: 0 })
    );
}
