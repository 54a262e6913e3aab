//! 子作用域工厂
//!
//! 每次调用恰好产生一个子作用域，内部不重试。配置了自定义构建器时先尝试它，
//! 任何失败都记录警告并回退到默认构建器。

use async_trait::async_trait;
use scopenest_abstractions::{ChildScopeBuilder, ScopeContext};
use scopenest_common::{CapabilityDescriptor, ConfigLocation, ScopeError};
use scopenest_registry::ObjectScope;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 子作用域加载器
///
/// 默认构建器创建空的子作用域后由加载器根据资源填充对象图
#[async_trait]
pub trait ScopeLoader: Send + Sync {
    /// 加载资源到作用域
    async fn load(&self, scope: &Arc<ObjectScope>, resource: &ConfigLocation)
        -> Result<(), ScopeError>;
}

/// 默认子作用域构建器
///
/// 子作用域的唯一配置来源是给定资源，父链接指向给定父作用域
pub struct DefaultChildScopeBuilder {
    loader: Arc<dyn ScopeLoader>,
}

impl DefaultChildScopeBuilder {
    /// 创建默认构建器
    pub fn new(loader: Arc<dyn ScopeLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl ChildScopeBuilder for DefaultChildScopeBuilder {
    async fn build(
        &self,
        resource: &ConfigLocation,
        parent: &Arc<dyn ScopeContext>,
    ) -> Result<Arc<dyn ScopeContext>, ScopeError> {
        let scope = ObjectScope::child(parent.clone(), resource.clone());

        if let Err(e) = self.loader.load(&scope, resource).await {
            // 半成品作用域需要关闭，释放已注册的回调
            if let Err(close_error) = scope.close() {
                warn!("关闭加载失败的子作用域出错: {}: {}", scope.name(), close_error);
            }
            return Err(e);
        }

        debug!("默认构建器完成子作用域: {}", scope.name());
        Ok(scope)
    }

    fn name(&self) -> &str {
        "default"
    }
}

impl fmt::Debug for DefaultChildScopeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultChildScopeBuilder").finish_non_exhaustive()
    }
}

/// 子作用域工厂
pub struct ChildScopeFactory {
    default_builder: Arc<dyn ChildScopeBuilder>,
    custom_builder: Option<String>,
}

impl ChildScopeFactory {
    /// 创建工厂
    pub fn new(default_builder: Arc<dyn ChildScopeBuilder>) -> Self {
        Self {
            default_builder,
            custom_builder: None,
        }
    }

    /// 设置自定义构建器名称（父作用域中的 Bean 名称）
    pub fn with_custom_builder(mut self, name: Option<String>) -> Self {
        self.custom_builder = name;
        self
    }

    /// 自定义构建器名称
    pub fn custom_builder_name(&self) -> Option<&str> {
        self.custom_builder.as_deref()
    }

    /// 自定义构建器 Bean 的能力描述符
    pub fn builder_capability() -> CapabilityDescriptor {
        CapabilityDescriptor::of::<dyn ChildScopeBuilder>()
    }

    /// 在作用域中注册自定义构建器
    pub fn register_builder(
        scope: &ObjectScope,
        name: &str,
        builder: Arc<dyn ChildScopeBuilder>,
    ) -> Result<(), ScopeError> {
        scope.register_instance(name, Self::builder_capability(), builder)
    }

    /// 为资源创建子作用域
    pub async fn create(
        &self,
        resource: &ConfigLocation,
        parent: &Arc<dyn ScopeContext>,
    ) -> Result<Arc<dyn ScopeContext>, ScopeError> {
        if let Some(name) = &self.custom_builder {
            match self.build_with_custom(name, resource, parent).await {
                Ok(scope) => {
                    info!("自定义构建器创建子作用域: {} -> {}", name, scope.name());
                    return Ok(scope);
                }
                Err(e) => {
                    warn!(
                        "自定义构建器 {} 创建子作用域失败，回退到默认构建器: {}, 原因: {}",
                        name, resource, e
                    );
                }
            }
        }

        self.default_builder.build(resource, parent).await
    }

    async fn build_with_custom(
        &self,
        name: &str,
        resource: &ConfigLocation,
        parent: &Arc<dyn ScopeContext>,
    ) -> Result<Arc<dyn ScopeContext>, ScopeError> {
        let instance = parent.get_bean(name)?;
        let builder = instance.downcast::<dyn ChildScopeBuilder>().ok_or_else(|| {
            ScopeError::BeanTypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<dyn ChildScopeBuilder>().to_string(),
                actual: instance.type_name().to_string(),
            }
        })?;

        builder.build(resource, parent).await
    }
}

impl fmt::Debug for ChildScopeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildScopeFactory")
            .field("default_builder", &self.default_builder.name())
            .field("custom_builder", &self.custom_builder)
            .finish()
    }
}
