//! Lifecycle services applied to objects the factory does not own.

use ferrous_beans::{
    AutowireMode, BeanDefinition, BeanError, BeanFactory, BeanNameAware, BeanObject,
    BeanPostProcessor, BeanType, BoxError, Capabilities, DependencyCheck, DisposableBean,
    InitializingBean, Value, ValueType,
};
use std::sync::{Arc, Mutex};

type Events = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Default)]
struct Repository {
    url: Mutex<String>,
}

#[derive(Debug)]
struct Service {
    repository: Mutex<Option<Arc<Repository>>>,
    timeout: Mutex<u32>,
    name: Mutex<String>,
    events: Events,
}

impl Service {
    fn new(events: &Events) -> Self {
        Service {
            repository: Mutex::new(None),
            timeout: Mutex::new(0),
            name: Mutex::new(String::new()),
            events: Arc::clone(events),
        }
    }

    fn record(&self, what: &str) {
        self.events.lock().unwrap().push(what.to_string());
    }
}

impl BeanNameAware for Service {
    fn set_bean_name(&self, name: &str) {
        *self.name.lock().unwrap() = name.to_string();
    }
}

impl InitializingBean for Service {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        self.record("after_properties_set");
        Ok(())
    }
}

impl DisposableBean for Service {
    fn destroy(&self) -> Result<(), BoxError> {
        self.record("destroy");
        Ok(())
    }
}

struct Gateway {
    repository: Arc<Repository>,
}

/// Records every lifecycle hook it sees, by bean name.
struct Recorder {
    events: Events,
}

impl Recorder {
    fn record(&self, what: String) {
        self.events.lock().unwrap().push(what);
    }
}

impl BeanPostProcessor for Recorder {
    fn capabilities(&self) -> Capabilities {
        Capabilities::BEFORE_INITIALIZATION | Capabilities::AFTER_INITIALIZATION | Capabilities::DESTRUCTION
    }

    fn before_initialization(&self, _bean: &BeanObject, name: &str) -> Result<Option<BeanObject>, BoxError> {
        self.record(format!("before:{name}"));
        Ok(None)
    }

    fn after_initialization(&self, _bean: &BeanObject, name: &str) -> Result<Option<BeanObject>, BoxError> {
        self.record(format!("after:{name}"));
        Ok(None)
    }

    fn before_destruction(&self, _bean: &BeanObject, _name: &str) -> Result<(), BoxError> {
        self.record("before_destruction".to_string());
        Ok(())
    }
}

fn factory(events: &Events) -> BeanFactory {
    let service_events = Arc::clone(events);
    let factory = BeanFactory::builder()
        .register_type(
            BeanType::of::<Repository>()
                .default_constructor(Repository::default)
                .value::<String>("url", |r, v| *r.url.lock().unwrap() = v)
                .build(),
        )
        .register_type(
            BeanType::of::<Service>()
                .default_constructor(move || Service::new(&service_events))
                .reference::<Repository>("repository", |s, r| *s.repository.lock().unwrap() = Some(r))
                .value::<u32>("timeout", |s, v| *s.timeout.lock().unwrap() = v)
                .method("start", |s| {
                    s.record("start");
                    Ok(())
                })
                .bean_name_aware()
                .initializing()
                .disposable()
                .build(),
        )
        .register_type(
            BeanType::of::<Gateway>()
                .constructor(vec![ValueType::bean::<Repository>()], |args| {
                    Ok(Gateway {
                        repository: args.next::<Repository>()?,
                    })
                })
                .build(),
        )
        .processor(Arc::new(Recorder {
            events: Arc::clone(events),
        }))
        .define(
            "repository",
            BeanDefinition::of::<Repository>().property("url", Value::literal("postgres://db")),
        )
        .define(
            "template",
            BeanDefinition::of::<Service>()
                .property("timeout", Value::literal("30"))
                .property("repository", Value::reference("repository"))
                .init_method("start"),
        )
        .build();
    // created up front so tests only see the events of the object under test
    factory.get_bean("repository").unwrap();
    events.lock().unwrap().clear();
    factory
}

fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

fn recorded(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

#[test]
fn test_create_bean_runs_full_lifecycle_without_caching() {
    let log = events();
    let factory = factory(&log);

    let disposals = factory.pending_disposals();

    let first = factory.create_bean::<Service>().unwrap();
    let second = factory.create_bean::<Service>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(first.name.lock().unwrap().ends_with("Service"));
    assert!(recorded(&log).contains(&"after_properties_set".to_string()));
    assert_eq!(factory.singleton_names(), ["repository"]);
    assert_eq!(factory.pending_disposals(), disposals);
}

#[test]
fn test_autowire_by_constructor_and_by_type() {
    let log = events();
    let factory = factory(&log);

    let gateway = factory
        .autowire::<Gateway>(AutowireMode::Constructor, DependencyCheck::None)
        .unwrap();
    assert!(Arc::ptr_eq(
        &gateway.repository,
        &factory.get_typed::<Repository>("repository").unwrap()
    ));

    let service = factory
        .autowire::<Service>(AutowireMode::ByType, DependencyCheck::None)
        .unwrap();
    assert!(service.repository.lock().unwrap().is_some());
    // autowiring alone does not initialize
    assert!(service.name.lock().unwrap().is_empty());
    assert!(recorded(&log).is_empty());
}

#[test]
fn test_autowire_reports_unsatisfied_dependency_checks() {
    let log = events();
    let factory = factory(&log);

    match factory
        .autowire::<Service>(AutowireMode::ByType, DependencyCheck::Simple)
        .unwrap_err()
    {
        BeanError::UnsatisfiedDependency { property, .. } => assert_eq!(property, "timeout"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_autowire_bean_properties_of_existing_instance() {
    let log = events();
    let factory = factory(&log);
    let service = Arc::new(Service::new(&log));
    let existing: BeanObject = service.clone();

    factory
        .autowire_bean_properties(&existing, AutowireMode::ByName, DependencyCheck::None)
        .unwrap();
    let repository = service.repository.lock().unwrap().clone().unwrap();
    assert_eq!(*repository.url.lock().unwrap(), "postgres://db");

    let err = factory
        .autowire_bean_properties(&existing, AutowireMode::Constructor, DependencyCheck::None)
        .unwrap_err();
    assert!(matches!(err, BeanError::Definition { .. }));
}

#[test]
fn test_apply_bean_property_values_skips_lifecycle() {
    let log = events();
    let factory = factory(&log);
    let service = Arc::new(Service::new(&log));
    let existing: BeanObject = service.clone();

    factory.apply_bean_property_values(&existing, "template").unwrap();
    assert_eq!(*service.timeout.lock().unwrap(), 30);
    assert!(service.repository.lock().unwrap().is_some());
    assert!(recorded(&log).is_empty());

    assert!(matches!(
        factory.apply_bean_property_values(&existing, "missing"),
        Err(BeanError::NoSuchBean { .. })
    ));
}

#[test]
fn test_configure_bean_populates_and_initializes() {
    let log = events();
    let factory = factory(&log);
    let service = Arc::new(Service::new(&log));
    let existing: BeanObject = service.clone();
    let disposals = factory.pending_disposals();

    let configured = factory.configure_bean(&existing, "template").unwrap();
    assert!(Arc::ptr_eq(&configured, &existing));
    assert_eq!(*service.timeout.lock().unwrap(), 30);
    assert_eq!(*service.name.lock().unwrap(), "template");
    assert_eq!(
        recorded(&log),
        ["before:template", "after_properties_set", "start", "after:template"]
    );
    assert_eq!(factory.pending_disposals(), disposals);
    assert!(!factory.singleton_names().contains(&"template".to_string()));
}

#[test]
fn test_initialize_bean_without_definition() {
    let log = events();
    let factory = factory(&log);
    let existing: BeanObject = Arc::new(Service::new(&log));

    factory.initialize_bean(&existing, "manual").unwrap();
    // no definition, so the custom init method is not invoked
    assert_eq!(
        recorded(&log),
        ["before:manual", "after_properties_set", "after:manual"]
    );
}

#[test]
fn test_initialization_processors_apply_to_existing_objects() {
    let log = events();
    let factory = factory(&log);
    let existing: BeanObject = Arc::new(Repository::default());

    let before = factory.apply_before_initialization(&existing, "loose").unwrap();
    let after = factory.apply_after_initialization(&before, "loose").unwrap();
    assert!(Arc::ptr_eq(&after, &existing));
    assert_eq!(recorded(&log), ["before:loose", "after:loose"]);
}

#[test]
fn test_destroy_bean_runs_destruction_callbacks() {
    let log = events();
    let factory = factory(&log);
    let existing: BeanObject = Arc::new(Service::new(&log));

    factory.destroy_bean(&existing);
    assert_eq!(recorded(&log), ["before_destruction", "destroy"]);
}
