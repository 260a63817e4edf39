use ferrous_beans::{
    BeanDefinition, BeanError, BeanFactory, BeanNameAware, BeanObject, BeanPostProcessor, BeanType,
    BoxError, Capabilities, DisposableBean,
};
use std::sync::{Arc, Mutex};

type Events = Arc<Mutex<Vec<String>>>;

struct Resource {
    name: Mutex<String>,
    events: Events,
    fail_on_destroy: bool,
}

impl Resource {
    fn record(&self, what: &str) {
        let name = self.name.lock().unwrap().clone();
        self.events.lock().unwrap().push(format!("{what}:{name}"));
    }
}

impl BeanNameAware for Resource {
    fn set_bean_name(&self, name: &str) {
        *self.name.lock().unwrap() = name.to_string();
    }
}

impl DisposableBean for Resource {
    fn destroy(&self) -> Result<(), BoxError> {
        self.record("destroy");
        if self.fail_on_destroy {
            return Err("disk unavailable".into());
        }
        Ok(())
    }
}

fn resource_type(events: &Events, fail_on_destroy: bool) -> BeanType {
    let events = Arc::clone(events);
    BeanType::of::<Resource>()
        .default_constructor(move || Resource {
            name: Mutex::new(String::new()),
            events: Arc::clone(&events),
            fail_on_destroy,
        })
        .method("close", |r| {
            r.record("close");
            Ok(())
        })
        .bean_name_aware()
        .disposable()
        .build()
}

fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

fn recorded(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

#[test]
fn test_destroy_in_reverse_registration_order() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(resource_type(&log, false))
        .define("db", BeanDefinition::of::<Resource>())
        .define("cache", BeanDefinition::of::<Resource>())
        .define("repo", BeanDefinition::of::<Resource>().depends_on("db"))
        .build();

    factory.get_bean("db").unwrap();
    factory.get_bean("cache").unwrap();
    factory.get_bean("repo").unwrap();
    assert_eq!(factory.pending_disposals(), 3);

    factory.destroy_singletons();
    assert_eq!(
        recorded(&log),
        vec!["destroy:repo", "destroy:cache", "destroy:db"]
    );
    assert_eq!(factory.singleton_count(), 0);
    assert_eq!(factory.pending_disposals(), 0);
    assert!(factory.dependents_of("db").is_empty());
}

#[test]
fn test_dependents_are_destroyed_first() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(resource_type(&log, false))
        .define("db", BeanDefinition::of::<Resource>())
        .define("cache", BeanDefinition::of::<Resource>())
        .define("repo", BeanDefinition::of::<Resource>().depends_on("db"))
        .build();

    factory.get_bean("repo").unwrap();
    factory.get_bean("cache").unwrap();

    factory.destroy_singleton("db");
    assert_eq!(recorded(&log), vec!["destroy:repo", "destroy:db"]);
    assert_eq!(factory.singleton_names(), vec!["cache".to_string()]);

    // destroyed singletons are created afresh on the next request
    factory.get_bean("db").unwrap();
    assert_eq!(factory.singleton_count(), 2);
}

#[test]
fn test_disposable_then_custom_destroy_method() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(resource_type(&log, false))
        .define("pool", BeanDefinition::of::<Resource>().destroy_method("close"))
        .define("single", BeanDefinition::of::<Resource>().destroy_method("destroy"))
        .build();

    factory.get_bean("pool").unwrap();
    factory.get_bean("single").unwrap();
    factory.destroy_singletons();
    assert_eq!(
        recorded(&log),
        vec!["destroy:single", "destroy:pool", "close:pool"]
    );
}

#[test]
fn test_destroy_errors_do_not_stop_destruction() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(resource_type(&log, true))
        .define("first", BeanDefinition::of::<Resource>().destroy_method("close"))
        .define("second", BeanDefinition::of::<Resource>())
        .build();

    factory.get_bean("first").unwrap();
    factory.get_bean("second").unwrap();
    factory.destroy_singletons();
    assert_eq!(
        recorded(&log),
        vec!["destroy:second", "destroy:first", "close:first"]
    );
}

struct Plain;

#[test]
fn test_missing_destroy_method() {
    let factory = BeanFactory::builder()
        .register_type(BeanType::of::<Plain>().default_constructor(|| Plain).build())
        .define("strict", BeanDefinition::of::<Plain>().destroy_method("shutdown"))
        .define(
            "lenient",
            BeanDefinition::of::<Plain>()
                .destroy_method("shutdown")
                .enforce_destroy_method(false),
        )
        .build();

    match factory.get_bean("strict").unwrap_err() {
        BeanError::Definition { message, .. } => assert_eq!(
            message,
            "Could not find a destroy method named 'shutdown' on bean with name 'strict'"
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!factory.singleton_names().contains(&"strict".to_string()));

    factory.get_bean("lenient").unwrap();
    assert_eq!(factory.pending_disposals(), 0);
}

#[test]
fn test_missing_init_method() {
    let factory = BeanFactory::builder()
        .register_type(BeanType::of::<Plain>().default_constructor(|| Plain).build())
        .define("strict", BeanDefinition::of::<Plain>().init_method("warm_up"))
        .define(
            "lenient",
            BeanDefinition::of::<Plain>()
                .init_method("warm_up")
                .enforce_init_method(false),
        )
        .build();

    let err = factory.get_bean("strict").unwrap_err();
    assert!(
        err.to_string()
            .contains("Could not find an init method named 'warm_up'"),
        "{err}"
    );
    assert!(factory.get_bean("lenient").is_ok());
}

#[test]
fn test_prototypes_are_not_registered_for_disposal() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(resource_type(&log, false))
        .define(
            "scratch",
            BeanDefinition::of::<Resource>().prototype().destroy_method("close"),
        )
        .build();

    factory.get_bean("scratch").unwrap();
    factory.get_bean("scratch").unwrap();
    assert_eq!(factory.pending_disposals(), 0);
    factory.destroy_singletons();
    assert!(recorded(&log).is_empty());
}

/// Tracks destruction of resources only.
#[derive(Default)]
struct Shutdown {
    destroyed: Mutex<Vec<String>>,
}

impl BeanPostProcessor for Shutdown {
    fn capabilities(&self) -> Capabilities {
        Capabilities::DESTRUCTION
    }

    fn before_destruction(&self, _bean: &BeanObject, bean_name: &str) -> Result<(), BoxError> {
        self.destroyed.lock().unwrap().push(bean_name.to_string());
        Ok(())
    }

    fn requires_destruction(&self, bean: &BeanObject) -> bool {
        bean.is::<Resource>()
    }
}

#[test]
fn test_destruction_processors() {
    let log = events();
    let shutdown = Arc::new(Shutdown::default());
    let factory = BeanFactory::builder()
        .register_type(resource_type(&log, false))
        .register_type(BeanType::of::<Plain>().default_constructor(|| Plain).build())
        .processor(shutdown.clone())
        .define("resource", BeanDefinition::of::<Resource>())
        .define("plain", BeanDefinition::of::<Plain>())
        .build();

    factory.pre_instantiate_singletons().unwrap();
    assert_eq!(factory.pending_disposals(), 1);

    factory.destroy_singletons();
    assert_eq!(*shutdown.destroyed.lock().unwrap(), vec!["resource".to_string()]);
    assert_eq!(recorded(&log), vec!["destroy:resource"]);
}

#[test]
fn test_replacing_a_definition_destroys_the_old_singleton() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(resource_type(&log, false))
        .define("db", BeanDefinition::of::<Resource>())
        .build();

    factory.get_bean("db").unwrap();
    factory
        .register_definition("db", BeanDefinition::of::<Resource>().destroy_method("close"))
        .unwrap();
    assert_eq!(recorded(&log), vec!["destroy:db"]);
    assert_eq!(factory.singleton_count(), 0);
}
