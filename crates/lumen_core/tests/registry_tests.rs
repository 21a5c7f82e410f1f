use lumen_core::*;
use std::cell::Cell;
use std::sync::Arc;

thread_local! {
    // Each #[tokio::test] runs on its own current-thread runtime
    static CONSTRUCTED: Cell<usize> = const { Cell::new(0) };
}

fn constructed() -> usize {
    CONSTRUCTED.with(Cell::get)
}

trait CounterModule: Module {
    fn id(&self) -> usize;
}

struct CounterModuleImpl {
    id: usize,
    options: OptionSet,
}

#[async_trait]
impl Module for CounterModuleImpl {
    fn name(&self) -> &str {
        "Counter"
    }

    fn options(&self) -> &OptionSet {
        &self.options
    }
}

impl CounterModule for CounterModuleImpl {
    fn id(&self) -> usize {
        self.id
    }
}

impl ModuleContract for dyn CounterModule {
    fn construct(_context: &ModuleContext) -> Result<Arc<Self>, ModuleError> {
        let id = CONSTRUCTED.with(|count| {
            count.set(count.get() + 1);
            count.get()
        });
        Ok(Arc::new(CounterModuleImpl {
            id,
            options: OptionSet::new(),
        }))
    }

    fn into_module(this: Arc<Self>) -> Arc<dyn Module> {
        this
    }
}

trait BrokenModule: Module {}

impl ModuleContract for dyn BrokenModule {
    fn construct(_context: &ModuleContext) -> Result<Arc<Self>, ModuleError> {
        Err(ModuleError::Construction("missing dependency".to_string()))
    }

    fn into_module(this: Arc<Self>) -> Arc<dyn Module> {
        this
    }
}

trait PickyModule: Module {}

struct PickyModuleImpl {
    refuse: bool,
    options: OptionSet,
}

#[async_trait]
impl Module for PickyModuleImpl {
    fn name(&self) -> &str {
        "Picky"
    }

    fn options(&self) -> &OptionSet {
        &self.options
    }

    async fn enable(&self, _context: &ModuleContext) -> Result<(), ModuleError> {
        if self.refuse {
            return Err(ModuleError::Enable("not today".to_string()));
        }
        Ok(())
    }
}

impl PickyModule for PickyModuleImpl {}

impl ModuleContract for dyn PickyModule {
    fn construct(_context: &ModuleContext) -> Result<Arc<Self>, ModuleError> {
        Ok(Arc::new(PickyModuleImpl {
            refuse: true,
            options: OptionSet::new(),
        }))
    }

    fn into_module(this: Arc<Self>) -> Arc<dyn Module> {
        this
    }
}

fn runtime() -> (ModuleContext, Arc<ModuleRegistry>) {
    create_module_runtime(PlatformKind::Server, Arc::new(RecordingTransport::new()))
}

#[tokio::test]
async fn test_double_registration_constructs_once() {
    let (context, registry) = runtime();
    let before = constructed();

    let first = registry.register::<dyn CounterModule>(&context).await.unwrap();
    let second = registry.register::<dyn CounterModule>(&context).await.unwrap();

    assert_eq!(constructed(), before + 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.id(), second.id());
    assert_eq!(registry.len().await, 1);
    assert_eq!(context.events().listener_count().await, 1);
}

#[tokio::test]
async fn test_concurrent_registration_constructs_once() {
    let (context, registry) = runtime();
    let before = constructed();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let context = context.clone();
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry.register::<dyn CounterModule>(&context).await.map(|module| module.id())
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(constructed(), before + 1);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_failed_construction_leaves_no_entry() {
    let (context, registry) = runtime();

    let result = registry.register::<dyn BrokenModule>(&context).await;
    assert!(matches!(result, Err(RegistryError::Construction { .. })));
    assert!(!registry.is_enabled::<dyn BrokenModule>().await);
    assert!(registry.lookup::<dyn BrokenModule>().await.is_none());
    assert!(registry.is_empty().await);
    assert_eq!(context.events().listener_count().await, 0);
}

#[tokio::test]
async fn test_failed_enable_rolls_back_subscription() {
    let (context, registry) = runtime();

    let result = registry.register::<dyn PickyModule>(&context).await;
    assert!(matches!(result, Err(RegistryError::Enable { ref module, .. }) if module == "Picky"));
    assert!(!registry.is_enabled::<dyn PickyModule>().await);
    assert!(!context.events().is_subscribed("Picky").await);
}

#[tokio::test]
async fn test_prebuilt_instance_is_used() {
    let (context, registry) = runtime();
    let instance: Arc<dyn CounterModule> = Arc::new(CounterModuleImpl {
        id: 4242,
        options: OptionSet::new(),
    });

    let registered = registry
        .register_instance::<dyn CounterModule>(&context, instance)
        .await
        .unwrap();
    assert_eq!(registered.id(), 4242);

    let found = registry.lookup::<dyn CounterModule>().await.unwrap();
    assert_eq!(found.id(), 4242);
}

#[tokio::test]
async fn test_name_clash_between_contracts_is_rejected() {
    let (context, registry) = runtime();
    registry.register::<dyn CounterModule>(&context).await.unwrap();

    // A second contract whose module reuses the name "Counter"
    trait ImpostorModule: Module {}
    struct ImpostorImpl(OptionSet);
    #[async_trait]
    impl Module for ImpostorImpl {
        fn name(&self) -> &str {
            "Counter"
        }

        fn options(&self) -> &OptionSet {
            &self.0
        }
    }
    impl ImpostorModule for ImpostorImpl {}
    impl ModuleContract for dyn ImpostorModule {
        fn construct(_context: &ModuleContext) -> Result<Arc<Self>, ModuleError> {
            Ok(Arc::new(ImpostorImpl(OptionSet::new())))
        }

        fn into_module(this: Arc<Self>) -> Arc<dyn Module> {
            this
        }
    }

    let result = registry.register::<dyn ImpostorModule>(&context).await;
    assert!(matches!(result, Err(RegistryError::Subscription { .. })));
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_modules_keep_registration_order() {
    let (context, registry) = runtime();
    let picky: Arc<dyn PickyModule> = Arc::new(PickyModuleImpl {
        refuse: false,
        options: OptionSet::new(),
    });
    registry
        .register_instance::<dyn PickyModule>(&context, picky)
        .await
        .unwrap();
    registry.register::<dyn CounterModule>(&context).await.unwrap();

    let names: Vec<String> = registry
        .modules()
        .await
        .iter()
        .map(|module| module.name().to_string())
        .collect();
    assert_eq!(names, vec!["Picky", "Counter"]);
}
