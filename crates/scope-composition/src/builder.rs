//! 嵌套作用域构建器

use crate::child_factory::{ChildScopeFactory, DefaultChildScopeBuilder};
use crate::lifecycle::ScopeLifecycleManager;
use crate::module_loader::{ManifestScopeLoader, ModuleCatalog, ModuleInitializer};
use crate::namespace::FileSystemResourceNamespace;
use crate::resolver::{ConfigLocationResolver, DependencyOrdering};
use scopenest_abstractions::{ChildScopeBuilder, ResourceNamespace, ScopeContext};
use scopenest_common::{CapabilityDescriptor, ConfigError, NestedScopeError};
use scopenest_config::{NestedScopesOptions, OptionsBinder, PlaceholderResolver};
use scopenest_registry::{CapabilityCatalog, ObjectScope, ServiceRegistry};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// 嵌套作用域构建器
///
/// 使用建造者模式组装解析器、子作用域工厂与生命周期管理器
pub struct NestedScopesBuilder {
    /// 启动配置
    options: NestedScopesOptions,
    /// 资源命名空间，默认为当前目录下的文件系统
    namespace: Option<Arc<dyn ResourceNamespace>>,
    /// 父作用域，默认新建根作用域
    parent: Option<Arc<ObjectScope>>,
    /// 共享注册表，默认为父作用域新建
    registry: Option<Arc<ServiceRegistry>>,
    /// 模块初始化器
    modules: Arc<ModuleCatalog>,
    /// 能力目录
    capabilities: Arc<CapabilityCatalog>,
    /// 占位符展开器
    placeholders: PlaceholderResolver,
    /// 依赖排序钩子
    ordering: Option<Arc<dyn DependencyOrdering>>,
    /// 替换默认的子作用域构建器
    default_builder: Option<Arc<dyn ChildScopeBuilder>>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl NestedScopesBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            options: NestedScopesOptions::default(),
            namespace: None,
            parent: None,
            registry: None,
            modules: Arc::new(ModuleCatalog::new()),
            capabilities: Arc::new(CapabilityCatalog::new()),
            placeholders: PlaceholderResolver::from_env(),
            ordering: None,
            default_builder: None,
            logging_enabled: false, // 默认不初始化日志
            logging_config: LoggingConfig::default(),
        }
    }

    /// 使用给定的启动配置
    pub fn with_options(mut self, options: NestedScopesOptions) -> Self {
        self.options = options;
        self
    }

    /// 通过配置绑定器加载启动配置
    pub fn load_options(mut self, binder: &OptionsBinder) -> Result<Self, ConfigError> {
        self.options = binder.load_options()?;
        info!(
            "加载嵌套作用域配置: {} 个位置",
            self.options.config_locations.len()
        );
        Ok(self)
    }

    /// 设置资源命名空间
    pub fn with_namespace(mut self, namespace: Arc<dyn ResourceNamespace>) -> Self {
        debug!("使用资源命名空间: {}", namespace.name());
        self.namespace = Some(namespace);
        self
    }

    /// 设置父作用域
    pub fn with_parent(mut self, parent: Arc<ObjectScope>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 设置共享注册表，注册表必须属于父作用域
    pub fn with_registry(mut self, registry: Arc<ServiceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 注册模块初始化器
    pub fn with_module(self, initializer: Arc<dyn ModuleInitializer>) -> Self {
        self.modules.register(initializer);
        self
    }

    /// 注册能力描述符，供模块清单按标识引用
    pub fn with_capability(self, descriptor: CapabilityDescriptor) -> Self {
        self.capabilities.register(descriptor);
        self
    }

    /// 设置占位符展开器
    pub fn with_placeholders(mut self, placeholders: PlaceholderResolver) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// 设置依赖排序钩子
    pub fn with_ordering(mut self, ordering: Arc<dyn DependencyOrdering>) -> Self {
        self.ordering = Some(ordering);
        self
    }

    /// 替换默认的子作用域构建器
    pub fn with_default_builder(mut self, builder: Arc<dyn ChildScopeBuilder>) -> Self {
        self.default_builder = Some(builder);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true;
        self
    }

    /// 构建生命周期管理器
    pub fn build(self) -> Result<ScopeLifecycleManager, NestedScopeError> {
        if self.logging_enabled {
            self.initialize_logging()?;
        }

        info!("开始构建嵌套作用域");

        let errors = self.options.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(ConfigError::ValidationFailed { errors: messages }.into());
        }

        let parent = self.parent.unwrap_or_else(|| ObjectScope::root("root"));
        let parent_context: Arc<dyn ScopeContext> = parent.clone();

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(ServiceRegistry::new(parent_context.clone())),
        };
        if registry.scope().info().id != parent_context.info().id {
            return Err(NestedScopeError::BootstrapFailed {
                message: format!(
                    "注册表属于作用域 {}，而不是父作用域 {}",
                    registry.scope().name(),
                    parent_context.name()
                ),
            });
        }

        let namespace = self
            .namespace
            .unwrap_or_else(|| Arc::new(FileSystemResourceNamespace::new(".")));

        let mut resolver = ConfigLocationResolver::new(namespace.clone())
            .with_placeholders(self.placeholders)
            .with_fail_fast(self.options.strict_error_handling);
        if let Some(ordering) = self.ordering {
            resolver = resolver.with_ordering(ordering);
        }

        let default_builder = match self.default_builder {
            Some(builder) => builder,
            None => {
                let loader = ManifestScopeLoader::new(
                    namespace,
                    self.modules.clone(),
                    registry.clone(),
                    self.capabilities.clone(),
                );
                Arc::new(DefaultChildScopeBuilder::new(Arc::new(loader)))
            }
        };

        let factory = ChildScopeFactory::new(default_builder)
            .with_custom_builder(self.options.child_scope_builder_name().map(str::to_string));

        info!(
            "嵌套作用域构建完成: {} 个模块初始化器, 严格模式: {}",
            self.modules.len(),
            self.options.strict_error_handling
        );

        Ok(
            ScopeLifecycleManager::new(parent_context, self.options, resolver, factory)
                .with_registry(registry),
        )
    }

    /// 初始化日志系统
    fn initialize_logging(&self) -> Result<(), NestedScopeError> {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.logging_config.env_filter())
            .with_target(self.logging_config.show_target)
            .with_thread_ids(self.logging_config.show_thread_ids)
            .with_file(self.logging_config.show_file)
            .with_line_number(self.logging_config.show_line_number);

        if self.logging_config.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| NestedScopeError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}

impl Default for NestedScopesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 过滤指令（如 `scopenest_composition=debug`），设置后覆盖 `level`
    pub directives: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            directives: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 使用 `RUST_LOG` 中的过滤指令（如果存在）
    pub fn with_env_directives(mut self) -> Self {
        if let Ok(directives) = std::env::var(EnvFilter::DEFAULT_ENV) {
            if !directives.trim().is_empty() {
                self.directives = Some(directives);
            }
        }
        self
    }

    /// 使用 JSON 格式输出
    pub fn with_json(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    /// 构造过滤器，指令无效时回退到 `level`
    pub fn env_filter(&self) -> EnvFilter {
        let level = self.level.as_str().to_lowercase();
        match &self.directives {
            Some(directives) => {
                EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(level))
            }
            None => EnvFilter::new(level),
        }
    }
}
