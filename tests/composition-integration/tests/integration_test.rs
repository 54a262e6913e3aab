//! 基于文件系统的嵌套作用域集中集成测试
use async_trait::async_trait;
use parking_lot::Mutex;
use scopenest_abstractions::{ChildScopeBuilder, ScopeContext};
use scopenest_common::{
    CapabilityDescriptor, ConfigLocation, LifecycleError, LifecycleState, NestedFailureCause,
    ScopeError,
};
use scopenest_composition::{
    ChildScopeFactory, FileSystemResourceNamespace, ModuleContext, ModuleInitializer,
    NestedScopesBuilder, ScopeLifecycleManager,
};
use scopenest_config::{NestedScopesOptions, OptionsBinder, PlaceholderResolver};
use scopenest_registry::ObjectScope;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn counter() -> CapabilityDescriptor {
    CapabilityDescriptor::new("Counter")
}

/// 按关闭顺序记录作用域名称
#[derive(Clone, Default)]
struct CloseLog(Arc<Mutex<Vec<String>>>);

impl CloseLog {
    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// 导出计数器的模块
struct ProducerModule {
    log: CloseLog,
}

#[async_trait]
impl ModuleInitializer for ProducerModule {
    fn name(&self) -> &str {
        "producer"
    }

    async fn initialize(&self, context: &ModuleContext) -> Result<(), ScopeError> {
        let start: u64 = context.property("start").unwrap_or(1);
        context
            .scope
            .register_instance("counterBean", counter(), Arc::new(start))?;

        let log = self.log.clone();
        let name = context.scope.name().to_string();
        context.scope.on_close("log", move || {
            log.0.lock().push(name);
            Ok(())
        });
        Ok(())
    }
}

/// 在导出方加载之前查找计数器的模块
struct ConsumerModule {
    log: CloseLog,
}

#[async_trait]
impl ModuleInitializer for ConsumerModule {
    fn name(&self) -> &str {
        "consumer"
    }

    async fn initialize(&self, context: &ModuleContext) -> Result<(), ScopeError> {
        let handle = context.registry.lookup::<u64>("counter", counter());
        context.scope.register_factory::<u64, _>(
            "doubled",
            CapabilityDescriptor::new("Doubled"),
            move |_| Ok(Arc::new(*handle.get()? * 2)),
        )?;

        let log = self.log.clone();
        let name = context.scope.name().to_string();
        context.scope.on_close("log", move || {
            log.0.lock().push(name);
            Ok(())
        });
        Ok(())
    }
}

const CONSUMER: &str = "module = \"consumer\"\n\n[[imports]]\nservice = \"counter\"\ncapability = \"Counter\"\n";
const PRODUCER: &str = r#"
module = "producer"

[properties]
start = 21

[[exports]]
service = "counter"
capability = "Counter"
bean = "counterBean"
"#;
const UNKNOWN: &str = "module = \"unknown\"";

struct Workspace {
    dir: TempDir,
    log: CloseLog,
}

impl Workspace {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        Self {
            dir,
            log: CloseLog::default(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn builder(&self) -> NestedScopesBuilder {
        NestedScopesBuilder::new()
            .with_namespace(Arc::new(FileSystemResourceNamespace::new(self.path())))
            .with_placeholders(PlaceholderResolver::from_map(HashMap::new()))
            .with_module(Arc::new(ProducerModule {
                log: self.log.clone(),
            }))
            .with_module(Arc::new(ConsumerModule {
                log: self.log.clone(),
            }))
    }

    fn manager(&self, options: NestedScopesOptions) -> ScopeLifecycleManager {
        self.builder().with_options(options).build().unwrap()
    }
}

fn child_names(manager: &ScopeLifecycleManager) -> Vec<String> {
    manager
        .children()
        .iter()
        .map(|child| child.name().to_string())
        .collect()
}

fn doubled(child: &Arc<dyn ScopeContext>) -> u64 {
    *child.get_bean("doubled").unwrap().downcast::<u64>().unwrap()
}

#[tokio::test]
async fn test_glob_children_are_ordered_and_torn_down_in_reverse() {
    let workspace = Workspace::new(&[
        ("modules/c.toml", PRODUCER),
        ("modules/a.toml", CONSUMER),
        ("modules/b.toml", CONSUMER),
    ]);
    let manager = workspace.manager(
        NestedScopesOptions::new()
            .with_location("modules/*.toml")
            .with_exclude("modules/b.toml"),
    );

    manager.finalize_config().await.unwrap();
    assert_eq!(manager.resolved_locations().len(), 2);

    manager.on_parent_ready().await.unwrap();
    assert_eq!(manager.state(), LifecycleState::Ready);
    assert_eq!(child_names(&manager), vec!["root/a.toml", "root/c.toml"]);

    manager.destroy().await.unwrap();
    assert_eq!(workspace.log.entries(), vec!["root/c.toml", "root/a.toml"]);
    assert_eq!(manager.state(), LifecycleState::Destroyed);
}

#[tokio::test]
async fn test_consumer_created_before_producer_binds_lazily() {
    let workspace = Workspace::new(&[
        ("modules/a-consumer.toml", CONSUMER),
        ("modules/b-producer.toml", PRODUCER),
    ]);
    let manager = workspace.manager(NestedScopesOptions::new().with_location("modules/*.toml"));

    manager.finalize_config().await.unwrap();
    manager.on_parent_ready().await.unwrap();

    let children = manager.children();
    assert_eq!(doubled(&children[0]), 42);

    let registry = manager.registry().unwrap();
    assert!(registry.contains_export("counter"));
    assert!(registry.contains_import("counter"));
    assert!(registry.import_handle::<u64>("counter").unwrap().is_resolved());
}

#[tokio::test]
async fn test_lenient_mode_records_failures_and_continues() {
    let workspace = Workspace::new(&[
        ("modules/a.toml", PRODUCER),
        ("modules/b.toml", UNKNOWN),
        ("modules/c.toml", CONSUMER),
    ]);
    let manager = workspace.manager(NestedScopesOptions::new().with_location("modules/*.toml"));

    manager.finalize_config().await.unwrap();
    manager.on_parent_ready().await.unwrap();

    assert_eq!(child_names(&manager), vec!["root/a.toml", "root/c.toml"]);
    let failures = manager.nested_failures();
    assert_eq!(failures.len(), 1);
    let (location, cause) = failures.iter().next().unwrap();
    assert!(location.as_str().ends_with("modules/b.toml"));
    assert!(matches!(cause, NestedFailureCause::Build(_)));
}

#[tokio::test]
async fn test_strict_mode_aborts_and_destroy_cleans_up() {
    let workspace = Workspace::new(&[
        ("modules/a.toml", PRODUCER),
        ("modules/b.toml", UNKNOWN),
        ("modules/c.toml", CONSUMER),
    ]);
    let manager = workspace.manager(
        NestedScopesOptions::new()
            .with_location("modules/a.toml")
            .with_location("modules/b.toml")
            .with_location("modules/c.toml")
            .with_strict_error_handling(true),
    );

    manager.finalize_config().await.unwrap();
    let result = manager.on_parent_ready().await;

    assert!(matches!(
        result,
        Err(LifecycleError::NestedScopeFailed { .. })
    ));
    assert_eq!(manager.state(), LifecycleState::Failed);
    assert_eq!(child_names(&manager), vec!["root/a.toml"]);

    manager.destroy().await.unwrap();
    assert_eq!(workspace.log.entries(), vec!["root/a.toml"]);
}

#[tokio::test]
async fn test_options_bound_from_file_with_placeholders() -> anyhow::Result<()> {
    let workspace = Workspace::new(&[
        ("plugins/a.toml", PRODUCER),
        ("plugins/b.toml", CONSUMER),
        (
            "scopenest.toml",
            "[nested_scopes]\nconfig_locations = [\"${MODULE_DIR}/b.toml\", \"${MODULE_DIR}/*.toml\"]\n",
        ),
    ]);
    let binder = OptionsBinder::new()
        .without_env()
        .add_file(workspace.path().join("scopenest.toml"));
    let placeholders = PlaceholderResolver::from_map(HashMap::from([(
        "MODULE_DIR".to_string(),
        "plugins".to_string(),
    )]));

    let manager = workspace
        .builder()
        .load_options(&binder)?
        .with_placeholders(placeholders)
        .build()?;

    manager.finalize_config().await?;
    manager.on_parent_ready().await?;

    // 精确位置在前，通配结果中的重复项被去除
    assert_eq!(child_names(&manager), vec!["root/b.toml", "root/a.toml"]);
    assert_eq!(doubled(&manager.children()[0]), 42);

    manager.destroy().await?;
    Ok(())
}

/// 为子作用域打标记的自定义构建器
struct TaggingBuilder;

#[async_trait]
impl ChildScopeBuilder for TaggingBuilder {
    async fn build(
        &self,
        resource: &ConfigLocation,
        parent: &Arc<dyn ScopeContext>,
    ) -> Result<Arc<dyn ScopeContext>, ScopeError> {
        let scope = ObjectScope::child(parent.clone(), resource.clone());
        scope.register_instance("tag", CapabilityDescriptor::new("Tag"), Arc::new("custom".to_string()))?;
        let scope: Arc<dyn ScopeContext> = scope;
        Ok(scope)
    }

    fn name(&self) -> &str {
        "tagging"
    }
}

#[tokio::test]
async fn test_custom_builder_named_in_options() {
    let workspace = Workspace::new(&[("modules/a.toml", PRODUCER)]);
    let root = ObjectScope::root("host");
    ChildScopeFactory::register_builder(&root, "taggingBuilder", Arc::new(TaggingBuilder)).unwrap();

    let manager = workspace
        .builder()
        .with_parent(root)
        .with_options(
            NestedScopesOptions::new()
                .with_location("modules/a.toml")
                .with_child_scope_builder("taggingBuilder"),
        )
        .build()
        .unwrap();

    manager.finalize_config().await.unwrap();
    manager.on_parent_ready().await.unwrap();

    let children = manager.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), "host/a.toml");
    let tag = children[0].get_bean("tag").unwrap().downcast::<String>().unwrap();
    assert_eq!(tag.as_str(), "custom");
    // 自定义构建器不加载模块清单
    assert!(!manager.registry().unwrap().contains_export("counter"));
}

#[tokio::test]
async fn test_missing_exact_location_is_a_build_failure() {
    let workspace = Workspace::new(&[("modules/a.toml", PRODUCER)]);
    let manager = workspace.manager(
        NestedScopesOptions::new()
            .with_location("modules/a.toml")
            .with_location("modules/missing.toml"),
    );

    manager.finalize_config().await.unwrap();
    manager.on_parent_ready().await.unwrap();

    assert_eq!(child_names(&manager), vec!["root/a.toml"]);
    let failed = manager.nested_failures().locations();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].as_str().ends_with("modules/missing.toml"));
}
