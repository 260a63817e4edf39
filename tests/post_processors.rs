use ferrous_beans::{
    AutowireMode, BeanDefinition, BeanError, BeanFactory, BeanObject, BeanPostProcessor, BeanType,
    BoxError, Capabilities, CreationObserver, CreationState, FactoryConfig, InitializingBean,
    MergedDefinition, PropertyDescriptor, PropertyValues, TypeKey, Value, ValueType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Events = Arc<Mutex<Vec<String>>>;

struct Widget {
    label: Mutex<String>,
    events: Events,
}

impl Widget {
    fn new(events: &Events) -> Self {
        Widget {
            label: Mutex::new(String::new()),
            events: Arc::clone(events),
        }
    }

    fn record(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }
}

impl InitializingBean for Widget {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        self.record("after_properties_set");
        Ok(())
    }
}

fn widget_type(events: &Events) -> BeanType {
    let events = Arc::clone(events);
    BeanType::of::<Widget>()
        .default_constructor(move || Widget::new(&events))
        .value::<String>("label", |w, v| *w.label.lock().unwrap() = v)
        .method("start", |w| {
            w.record("start");
            Ok(())
        })
        .initializing()
        .build()
}

fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records initialization hooks into the shared event log.
struct Tracing {
    events: Events,
}

impl BeanPostProcessor for Tracing {
    fn capabilities(&self) -> Capabilities {
        Capabilities::BEFORE_INITIALIZATION | Capabilities::AFTER_INITIALIZATION
    }

    fn before_initialization(&self, _bean: &BeanObject, name: &str) -> Result<Option<BeanObject>, BoxError> {
        self.events.lock().unwrap().push(format!("before:{name}"));
        Ok(None)
    }

    fn after_initialization(&self, _bean: &BeanObject, name: &str) -> Result<Option<BeanObject>, BoxError> {
        self.events.lock().unwrap().push(format!("after:{name}"));
        Ok(None)
    }
}

#[test]
fn test_initialization_order() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(widget_type(&log))
        .processor(Arc::new(Tracing { events: Arc::clone(&log) }))
        .define(
            "widget",
            BeanDefinition::of::<Widget>()
                .property("label", Value::literal("w"))
                .init_method("start"),
        )
        .build();

    factory.get_bean("widget").unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["before:widget", "after_properties_set", "start", "after:widget"]
    );
}

#[test]
fn test_synthetic_beans_skip_initialization_processors() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(widget_type(&log))
        .processor(Arc::new(Tracing { events: Arc::clone(&log) }))
        .define("infra", BeanDefinition::of::<Widget>().synthetic(true))
        .build();

    factory.get_bean("infra").unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["after_properties_set"]);
}

struct Surrogate {
    hits: AtomicUsize,
}

impl BeanPostProcessor for Surrogate {
    fn capabilities(&self) -> Capabilities {
        Capabilities::BEFORE_INSTANTIATION | Capabilities::AFTER_INITIALIZATION
    }

    fn before_instantiation(&self, bean_type: &BeanType, name: &str) -> Result<Option<BeanObject>, BoxError> {
        if name == "gateway" && bean_type.key() == TypeKey::of::<Widget>() {
            let stub: BeanObject = Arc::new("stub gateway".to_string());
            return Ok(Some(stub));
        }
        Ok(None)
    }

    fn after_initialization(&self, _bean: &BeanObject, _name: &str) -> Result<Option<BeanObject>, BoxError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[derive(Default)]
struct States(Mutex<Vec<CreationState>>);

impl CreationObserver for States {
    fn transition(&self, _bean_name: &str, _from: CreationState, to: CreationState) {
        self.0.lock().unwrap().push(to);
    }
}

#[test]
fn test_before_instantiation_short_circuits_creation() {
    let log = events();
    let surrogate = Arc::new(Surrogate { hits: AtomicUsize::new(0) });
    let states = Arc::new(States::default());
    let factory = BeanFactory::builder()
        .register_type(widget_type(&log))
        .processor(surrogate.clone())
        .observer(states.clone())
        .define(
            "gateway",
            BeanDefinition::of::<Widget>().property("no_such_property", Value::literal("x")),
        )
        .build();

    let gateway = factory.get_typed::<String>("gateway").unwrap();
    assert_eq!(*gateway, "stub gateway");
    assert_eq!(surrogate.hits.load(Ordering::SeqCst), 1);
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(
        *states.0.lock().unwrap(),
        vec![CreationState::Resolving, CreationState::ShortCircuited]
    );
}

struct Veto;

impl BeanPostProcessor for Veto {
    fn capabilities(&self) -> Capabilities {
        Capabilities::AFTER_INSTANTIATION
    }

    fn after_instantiation(&self, _bean: &BeanObject, name: &str) -> Result<bool, BoxError> {
        Ok(name != "frozen")
    }
}

#[test]
fn test_after_instantiation_can_skip_population() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(widget_type(&log))
        .processor(Arc::new(Veto))
        .define("frozen", BeanDefinition::of::<Widget>().property("label", Value::literal("set")))
        .define("normal", BeanDefinition::of::<Widget>().property("label", Value::literal("set")))
        .build();

    let frozen = factory.get_typed::<Widget>("frozen").unwrap();
    let normal = factory.get_typed::<Widget>("normal").unwrap();
    assert_eq!(*frozen.label.lock().unwrap(), "");
    assert_eq!(*normal.label.lock().unwrap(), "set");
    // initialization still runs for a vetoed bean
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[derive(Default)]
struct Defaults {
    seen: Mutex<Vec<String>>,
}

impl BeanPostProcessor for Defaults {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PROPERTY_VALUES
    }

    fn rewrite_property_values(
        &self,
        mut values: PropertyValues,
        descriptors: &[PropertyDescriptor],
        _bean: &BeanObject,
        name: &str,
    ) -> Result<Option<PropertyValues>, BoxError> {
        self.seen
            .lock()
            .unwrap()
            .extend(descriptors.iter().map(|d| format!("{name}.{}", d.name())));
        if name == "skipped" {
            return Ok(None);
        }
        if !values.contains("label") {
            values.add("label", Value::literal("default"));
        }
        Ok(Some(values))
    }
}

#[test]
fn test_property_values_can_be_rewritten() {
    let log = events();
    let defaults = Arc::new(Defaults::default());
    let factory = BeanFactory::builder()
        .register_type(widget_type(&log))
        .processor(Arc::clone(&defaults) as Arc<dyn BeanPostProcessor>)
        .define("plain", BeanDefinition::of::<Widget>())
        .define("explicit", BeanDefinition::of::<Widget>().property("label", Value::literal("mine")))
        .define("skipped", BeanDefinition::of::<Widget>().property("label", Value::literal("lost")))
        .build();

    assert_eq!(*factory.get_typed::<Widget>("plain").unwrap().label.lock().unwrap(), "default");
    assert_eq!(*factory.get_typed::<Widget>("explicit").unwrap().label.lock().unwrap(), "mine");
    assert_eq!(*factory.get_typed::<Widget>("skipped").unwrap().label.lock().unwrap(), "");
    assert_eq!(
        *defaults.seen.lock().unwrap(),
        ["plain.label", "explicit.label", "skipped.label"]
    );
}

struct Gauge {
    level: Mutex<u32>,
    widget: Mutex<Option<Arc<Widget>>>,
}

/// Sees only the descriptors left after ignored dependency types are filtered out.
#[derive(Default)]
struct DescriptorNames {
    names: Mutex<Vec<String>>,
}

impl BeanPostProcessor for DescriptorNames {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PROPERTY_VALUES
    }

    fn rewrite_property_values(
        &self,
        values: PropertyValues,
        descriptors: &[PropertyDescriptor],
        _bean: &BeanObject,
        _name: &str,
    ) -> Result<Option<PropertyValues>, BoxError> {
        let mut names: Vec<String> = descriptors.iter().map(|d| d.name().to_string()).collect();
        names.sort();
        *self.names.lock().unwrap() = names;
        Ok(Some(values))
    }
}

#[test]
fn test_rewritten_properties_exclude_ignored_dependency_types() {
    let log = events();
    let names = Arc::new(DescriptorNames::default());
    let factory = BeanFactory::builder()
        .config(FactoryConfig::default().ignore_dependency_type::<Widget>())
        .register_type(widget_type(&log))
        .register_type(
            BeanType::of::<Gauge>()
                .default_constructor(|| Gauge {
                    level: Mutex::new(0),
                    widget: Mutex::new(None),
                })
                .value::<u32>("level", |g, v| *g.level.lock().unwrap() = v)
                .reference::<Widget>("widget", |g, w| *g.widget.lock().unwrap() = Some(w))
                .build(),
        )
        .processor(Arc::clone(&names) as Arc<dyn BeanPostProcessor>)
        .define("gauge", BeanDefinition::of::<Gauge>().property("level", Value::literal("3")))
        .build();

    let gauge = factory.get_typed::<Gauge>("gauge").unwrap();
    assert_eq!(*gauge.level.lock().unwrap(), 3);
    assert_eq!(*names.names.lock().unwrap(), ["level"]);
}

/// Takes over the `start` init method, as a lifecycle annotation processor would.
#[derive(Default)]
struct ManagesStart {
    merges: AtomicUsize,
}

impl BeanPostProcessor for ManagesStart {
    fn capabilities(&self) -> Capabilities {
        Capabilities::MERGE_DEFINITION
    }

    fn merge_definition(
        &self,
        definition: &MergedDefinition,
        _bean_type: &BeanType,
        _bean_name: &str,
    ) -> Result<(), BoxError> {
        self.merges.fetch_add(1, Ordering::SeqCst);
        definition.register_externally_managed_init_method("start");
        Ok(())
    }
}

#[test]
fn test_merge_definition_runs_once_and_can_claim_init_methods() {
    let log = events();
    let processor = Arc::new(ManagesStart::default());
    let factory = BeanFactory::builder()
        .register_type(widget_type(&log))
        .processor(processor.clone())
        .define("widget", BeanDefinition::of::<Widget>().prototype().init_method("start"))
        .build();

    factory.get_bean("widget").unwrap();
    factory.get_bean("widget").unwrap();
    assert_eq!(processor.merges.load(Ordering::SeqCst), 1);
    assert!(!log.lock().unwrap().contains(&"start".to_string()));
    assert!(factory
        .merged_definition("widget")
        .unwrap()
        .is_externally_managed_init_method("start"));
}

struct Failing;

impl BeanPostProcessor for Failing {
    fn capabilities(&self) -> Capabilities {
        Capabilities::AFTER_INITIALIZATION
    }

    fn after_initialization(&self, _bean: &BeanObject, _name: &str) -> Result<Option<BeanObject>, BoxError> {
        Err("proxy generation failed".into())
    }
}

#[test]
fn test_processor_failure_fails_creation() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(widget_type(&log))
        .processor(Arc::new(Failing))
        .define("widget", BeanDefinition::of::<Widget>())
        .build();

    let err = factory.get_bean("widget").unwrap_err();
    match &err {
        BeanError::Creation { message, .. } => {
            assert_eq!(message, "BeanPostProcessor after initialization failed")
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(factory.singleton_count(), 0);
}

trait Handler: Send + Sync {}

/// Predicts that widgets named `handler*` become handlers.
struct PredictsHandlers;

impl BeanPostProcessor for PredictsHandlers {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PREDICT_TYPE
    }

    fn predict_type(&self, _bean_type: &BeanType, name: &str) -> Option<TypeKey> {
        name.starts_with("handler").then(TypeKey::of_trait::<dyn Handler>)
    }
}

#[test]
fn test_type_prediction_drives_type_lookup() {
    let log = events();
    let factory = BeanFactory::builder()
        .register_type(widget_type(&log))
        .processor(Arc::new(PredictsHandlers))
        .define("handler_a", BeanDefinition::of::<Widget>())
        .define("plain", BeanDefinition::of::<Widget>())
        .build();

    assert_eq!(
        factory.bean_names_for_type(&TypeKey::of_trait::<dyn Handler>()).unwrap(),
        vec!["handler_a".to_string()]
    );
    assert_eq!(
        factory.get_type("plain").unwrap(),
        Some(TypeKey::of::<Widget>())
    );
    assert_eq!(factory.singleton_count(), 0);
}

struct Engine;

struct Car {
    engine: Option<Arc<Engine>>,
}

/// Forces the single-argument constructor.
struct PicksEngineConstructor;

impl BeanPostProcessor for PicksEngineConstructor {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CANDIDATE_CONSTRUCTORS
    }

    fn candidate_constructors(&self, bean_type: &BeanType, _name: &str) -> Result<Option<Vec<usize>>, BoxError> {
        if bean_type.key() == TypeKey::of::<Car>() {
            return Ok(Some(vec![1]));
        }
        Ok(None)
    }
}

#[test]
fn test_candidate_constructors_enable_autowiring() {
    let factory = BeanFactory::builder()
        .register_type(BeanType::of::<Engine>().default_constructor(|| Engine).build())
        .register_type(
            BeanType::of::<Car>()
                .default_constructor(|| Car { engine: None })
                .constructor(vec![ValueType::bean::<Engine>()], |args| {
                    Ok(Car {
                        engine: Some(args.next::<Engine>()?),
                    })
                })
                .build(),
        )
        .processor(Arc::new(PicksEngineConstructor))
        .define("engine", BeanDefinition::of::<Engine>())
        .define("car", BeanDefinition::of::<Car>().autowire(AutowireMode::No))
        .build();

    let car = factory.get_typed::<Car>("car").unwrap();
    assert!(car.engine.is_some());
}
