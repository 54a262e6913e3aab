//! 子作用域构建器抽象接口

use crate::scope::ScopeContext;
use async_trait::async_trait;
use scopenest_common::{ConfigLocation, ScopeError};
use std::sync::Arc;

/// 子作用域构建器 trait
///
/// 根据一个已解析的资源和父作用域构建恰好一个子作用域，内部不做重试
#[async_trait]
pub trait ChildScopeBuilder: Send + Sync {
    /// 构建子作用域
    async fn build(
        &self,
        resource: &ConfigLocation,
        parent: &Arc<dyn ScopeContext>,
    ) -> Result<Arc<dyn ScopeContext>, ScopeError>;

    /// 构建器名称
    fn name(&self) -> &str;
}
