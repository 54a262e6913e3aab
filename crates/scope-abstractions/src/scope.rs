//! 作用域抽象接口

use scopenest_common::{CapabilityDescriptor, ScopeError, ScopeInfo, ServiceInstance};
use std::fmt::Debug;
use std::sync::Arc;

/// 作用域上下文 trait
///
/// 每个作用域拥有独立的对象图；子作用域通过父链接看到父作用域的单例。
pub trait ScopeContext: Send + Sync + Debug {
    /// 作用域描述信息
    fn info(&self) -> &ScopeInfo;

    /// 父作用域
    fn parent(&self) -> Option<Arc<dyn ScopeContext>>;

    /// 当前作用域或其祖先中是否存在指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;

    /// 获取 Bean 实例，必要时由对象图创建；本地不存在时向父作用域查找
    fn get_bean(&self, name: &str) -> Result<ServiceInstance, ScopeError>;

    /// 不创建实例的前提下查询 Bean 的能力描述符
    fn bean_capability(&self, name: &str) -> Option<CapabilityDescriptor>;

    /// 按名称注册单例
    fn register_singleton(
        &self,
        name: &str,
        capability: CapabilityDescriptor,
        instance: ServiceInstance,
    ) -> Result<(), ScopeError>;

    /// 作用域是否已关闭
    fn is_closed(&self) -> bool;

    /// 关闭作用域，重复调用不产生任何效果
    fn close(&self) -> Result<(), ScopeError>;

    /// 作用域名称
    fn name(&self) -> &str {
        &self.info().name
    }
}
