//! 基于模块清单的子作用域加载
//!
//! 资源内容是一份 [`ModuleManifest`]：加载器按 `module` 找到已注册的
//! [`ModuleInitializer`] 填充子作用域，然后应用清单中声明的导出与导入。

use crate::child_factory::ScopeLoader;
use async_trait::async_trait;
use dashmap::DashMap;
use scopenest_abstractions::{ResourceNamespace, ScopeContext};
use scopenest_common::{ConfigLocation, ScopeError};
use scopenest_config::ModuleManifest;
use scopenest_registry::{CapabilityCatalog, ExportRef, ObjectScope, ServiceRegistry};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// 模块初始化上下文
pub struct ModuleContext {
    /// 正在构建的子作用域
    pub scope: Arc<ObjectScope>,
    /// 共享的服务注册表
    pub registry: Arc<ServiceRegistry>,
    /// 模块清单
    pub manifest: ModuleManifest,
    /// 清单所在位置
    pub location: ConfigLocation,
}

impl ModuleContext {
    /// 读取清单中的类型化属性
    pub fn property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.manifest.property(key)
    }

    /// 读取原始属性值
    pub fn raw_property(&self, key: &str) -> Option<&Value> {
        self.manifest.properties.get(key)
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("scope", &self.scope.name())
            .field("module", &self.manifest.module)
            .field("location", &self.location)
            .finish()
    }
}

/// 模块初始化器
#[async_trait]
pub trait ModuleInitializer: Send + Sync {
    /// 模块名称，与清单中的 `module` 对应
    fn name(&self) -> &str;

    /// 向子作用域注册 Bean，并按需导出或查找服务
    async fn initialize(&self, context: &ModuleContext) -> Result<(), ScopeError>;
}

/// 模块初始化器目录
#[derive(Default)]
pub struct ModuleCatalog {
    initializers: DashMap<String, Arc<dyn ModuleInitializer>>,
}

impl ModuleCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册初始化器，同名的会被替换
    pub fn register(&self, initializer: Arc<dyn ModuleInitializer>) {
        info!("注册模块初始化器: {}", initializer.name());
        self.initializers
            .insert(initializer.name().to_string(), initializer);
    }

    /// 获取初始化器
    pub fn get(&self, module: &str) -> Option<Arc<dyn ModuleInitializer>> {
        self.initializers.get(module).map(|entry| entry.value().clone())
    }

    /// 已注册的模块名称（已排序）
    pub fn modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .initializers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// 已注册数量
    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("modules", &self.modules())
            .finish()
    }
}

/// 模块清单加载器
pub struct ManifestScopeLoader {
    namespace: Arc<dyn ResourceNamespace>,
    modules: Arc<ModuleCatalog>,
    registry: Arc<ServiceRegistry>,
    capabilities: Arc<CapabilityCatalog>,
}

impl ManifestScopeLoader {
    /// 创建加载器
    pub fn new(
        namespace: Arc<dyn ResourceNamespace>,
        modules: Arc<ModuleCatalog>,
        registry: Arc<ServiceRegistry>,
        capabilities: Arc<CapabilityCatalog>,
    ) -> Self {
        Self {
            namespace,
            modules,
            registry,
            capabilities,
        }
    }

    fn apply_declarations(
        &self,
        scope: &Arc<ObjectScope>,
        manifest: &ModuleManifest,
    ) -> Result<(), ScopeError> {
        for export in &manifest.exports {
            if !scope.contains_bean(&export.bean) {
                return Err(ScopeError::BeanNotFound {
                    name: export.bean.clone(),
                    scope: scope.name().to_string(),
                });
            }

            let owner: Arc<dyn ScopeContext> = scope.clone();
            let capability = self.capabilities.resolve(&export.capability);
            let mut declaration =
                ExportRef::bean(export.service.as_str(), capability, export.bean.clone(), owner);
            if export.rebindable {
                declaration = declaration.rebindable();
            }
            let outcome = self.registry.export(declaration);
            debug!("清单导出: {} -> {:?}", export.service, outcome);
        }

        for import in &manifest.imports {
            let capability = self.capabilities.resolve(&import.capability);
            self.registry.void_lookup(import.service.as_str(), capability);
        }

        Ok(())
    }
}

#[async_trait]
impl ScopeLoader for ManifestScopeLoader {
    async fn load(
        &self,
        scope: &Arc<ObjectScope>,
        resource: &ConfigLocation,
    ) -> Result<(), ScopeError> {
        let content = self
            .namespace
            .read(resource)
            .await
            .map_err(|source| ScopeError::ResourceLoadFailed {
                location: resource.to_string(),
                source,
            })?;

        let manifest = ModuleManifest::parse(resource.as_str(), &content)?;
        let initializer =
            self.modules
                .get(&manifest.module)
                .ok_or_else(|| ScopeError::ModuleNotFound {
                    module: manifest.module.clone(),
                })?;

        info!("初始化模块: {} ({})", manifest.module, resource);
        let context = ModuleContext {
            scope: scope.clone(),
            registry: self.registry.clone(),
            manifest,
            location: resource.clone(),
        };
        initializer.initialize(&context).await?;

        self.apply_declarations(scope, &context.manifest)?;
        debug!(
            "模块加载完成: {} ({} 个 Bean)",
            context.manifest.module,
            scope.bean_names().len()
        );
        Ok(())
    }
}

impl fmt::Debug for ManifestScopeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestScopeLoader")
            .field("namespace", &self.namespace.name())
            .field("modules", &self.modules)
            .finish()
    }
}
