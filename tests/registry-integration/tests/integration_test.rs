//! 跨作用域导出/查找协议的集中集成测试
use scopenest_abstractions::ScopeContext;
use scopenest_common::{CapabilityDescriptor, ConfigLocation, RegistryError};
use scopenest_registry::{ExportOutcome, ExportRef, ObjectScope, ServiceRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait Storage: Send + Sync {
    fn backend(&self) -> &str;
}

struct MemoryStorage;

impl Storage for MemoryStorage {
    fn backend(&self) -> &str {
        "memory"
    }
}

fn storage() -> CapabilityDescriptor {
    CapabilityDescriptor::new("Storage")
}

fn cached_storage() -> CapabilityDescriptor {
    CapabilityDescriptor::new("CachedStorage").implementing(&storage())
}

/// 根作用域、共享注册表以及两个兄弟子作用域
struct Fixture {
    _root: Arc<ObjectScope>,
    registry: Arc<ServiceRegistry>,
    producer: Arc<ObjectScope>,
    consumer: Arc<ObjectScope>,
}

fn fixture() -> Fixture {
    let root = ObjectScope::root("root");
    let parent: Arc<dyn ScopeContext> = root.clone();
    let registry = Arc::new(ServiceRegistry::new(parent.clone()));
    let producer = ObjectScope::child(parent.clone(), ConfigLocation::new("mem:producer.toml"));
    let consumer = ObjectScope::child(parent, ConfigLocation::new("mem:consumer.toml"));
    Fixture {
        _root: root,
        registry,
        producer,
        consumer,
    }
}

fn export_storage_bean(fixture: &Fixture, capability: CapabilityDescriptor) -> Arc<AtomicUsize> {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    fixture
        .producer
        .register_factory::<dyn Storage, _>("storageBean", capability.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let storage: Arc<dyn Storage> = Arc::new(MemoryStorage);
            Ok(storage)
        })
        .unwrap();

    let owner: Arc<dyn ScopeContext> = fixture.producer.clone();
    let outcome = fixture
        .registry
        .export(ExportRef::bean("storage", capability, "storageBean", owner));
    assert_eq!(outcome, ExportOutcome::Registered);
    created
}

#[tokio::test]
async fn test_sibling_scope_sees_exported_bean() {
    let fixture = fixture();
    let created = export_storage_bean(&fixture, storage());

    let handle = fixture.registry.lookup::<dyn Storage>("storage", storage());
    assert_eq!(handle.get().unwrap().backend(), "memory");
    assert_eq!(created.load(Ordering::SeqCst), 1);

    // 子作用域之间互不可见，只能通过注册表获得对方的服务
    assert!(!fixture.consumer.contains_bean("storageBean"));
}

#[tokio::test]
async fn test_lookup_declared_before_export_binds_late() {
    let fixture = fixture();
    let handle = fixture.registry.lookup::<dyn Storage>("storage", storage());
    assert!(!handle.is_resolved());

    let created = export_storage_bean(&fixture, storage());
    assert_eq!(created.load(Ordering::SeqCst), 0);

    assert_eq!(handle.get().unwrap().backend(), "memory");
    assert!(handle.is_resolved());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_creates_one_instance() {
    let fixture = fixture();
    let created = export_storage_bean(&fixture, storage());
    let handle = fixture.registry.lookup::<dyn Storage>("storage", storage());
    let barrier = Arc::new(tokio::sync::Barrier::new(16));

    let tasks = (0..16).map(|_| {
        let handle = handle.clone();
        let barrier = barrier.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            handle.get().unwrap()
        })
    });

    let instances: Vec<Arc<dyn Storage>> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[tokio::test]
async fn test_narrower_export_satisfies_wider_lookup() {
    let fixture = fixture();
    export_storage_bean(&fixture, cached_storage());

    let handle = fixture.registry.lookup::<dyn Storage>("storage", storage());
    assert_eq!(handle.get().unwrap().backend(), "memory");
}

#[tokio::test]
async fn test_wider_export_rejects_narrower_lookup() {
    let fixture = fixture();
    export_storage_bean(&fixture, storage());

    let handle = fixture
        .registry
        .lookup::<dyn Storage>("storage", cached_storage());
    match handle.get() {
        Err(RegistryError::TypeMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, "CachedStorage");
            assert_eq!(actual, "Storage");
        }
        other => panic!("期望类型不匹配，实际: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_bean_capability_must_match_export_declaration() {
    let fixture = fixture();
    fixture
        .producer
        .register_instance("plainBean", CapabilityDescriptor::new("Plain"), Arc::new(7u32))
        .unwrap();
    let owner: Arc<dyn ScopeContext> = fixture.producer.clone();
    fixture
        .registry
        .export(ExportRef::bean("storage", storage(), "plainBean", owner));

    let handle = fixture.registry.lookup::<dyn Storage>("storage", storage());
    assert!(matches!(handle.get(), Err(RegistryError::TypeMismatch { .. })));
}

#[tokio::test]
async fn test_closed_provider_fails_unresolved_lookups_only() {
    let fixture = fixture();
    export_storage_bean(&fixture, storage());
    fixture
        .producer
        .register_instance("mirrorBean", storage(), Arc::new(MemoryStorage) as Arc<dyn Storage>)
        .unwrap();
    let owner: Arc<dyn ScopeContext> = fixture.producer.clone();
    fixture
        .registry
        .export(ExportRef::bean("mirror", storage(), "mirrorBean", owner));

    let resolved = fixture.registry.lookup::<dyn Storage>("storage", storage());
    let first = resolved.get().unwrap();
    let pending = fixture.registry.lookup::<dyn Storage>("mirror", storage());

    fixture.producer.close().unwrap();

    // 已解析的句柄保留缓存的实例
    assert!(Arc::ptr_eq(&first, &resolved.get().unwrap()));
    assert!(matches!(
        pending.get(),
        Err(RegistryError::ProviderFailed { .. })
    ));
}

#[tokio::test]
async fn test_first_export_wins_and_rebindable_replaces() {
    let fixture = fixture();
    let first: Arc<dyn Storage> = Arc::new(MemoryStorage);
    let second: Arc<dyn Storage> = Arc::new(MemoryStorage);

    assert_eq!(
        fixture
            .registry
            .export(ExportRef::instance("storage", storage(), first.clone())),
        ExportOutcome::Registered
    );
    assert_eq!(
        fixture
            .registry
            .export(ExportRef::instance("storage", storage(), second.clone())),
        ExportOutcome::Ignored
    );
    let handle = fixture.registry.lookup::<dyn Storage>("storage", storage());
    assert!(Arc::ptr_eq(&handle.get().unwrap(), &first));

    let registry = fixture.registry.clone();
    let cache: Arc<dyn Storage> = Arc::new(MemoryStorage);
    registry.export(ExportRef::instance("cache", storage(), first).rebindable());
    assert_eq!(
        registry.export(ExportRef::instance("cache", storage(), cache.clone()).rebindable()),
        ExportOutcome::Rebound
    );
    let cache_handle = registry.lookup::<dyn Storage>("cache", storage());
    assert!(Arc::ptr_eq(&cache_handle.get().unwrap(), &cache));
}

#[tokio::test]
async fn test_typed_handle_rejects_wrong_rust_type() -> anyhow::Result<()> {
    let fixture = fixture();
    fixture
        .registry
        .export(ExportRef::instance("answer", CapabilityDescriptor::new("Answer"), Arc::new(42u64)));

    let wrong = fixture
        .registry
        .lookup::<String>("answer", CapabilityDescriptor::new("Answer"));
    assert!(matches!(wrong.get(), Err(RegistryError::TypeMismatch { .. })));

    let right = fixture
        .registry
        .lookup::<u64>("answer", CapabilityDescriptor::new("Answer"));
    assert_eq!(*right.get()?, 42);
    Ok(())
}
