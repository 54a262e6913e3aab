//! 类型化服务句柄

use crate::target_source::LookupTargetSource;
use scopenest_common::{CapabilityDescriptor, RegistryError, RegistryResult, ServiceName};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 服务句柄
///
/// 创建时不做任何解析工作；首次调用 [`ServiceHandle::get`] 时才查找导出并缓存结果。
/// 同一导入声明的所有句柄共享同一个缓存，但每个句柄都用自己请求的能力检查导出声明。
pub struct ServiceHandle<T: ?Sized> {
    source: Arc<LookupTargetSource>,
    requested: CapabilityDescriptor,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T> ServiceHandle<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(source: Arc<LookupTargetSource>, requested: CapabilityDescriptor) -> Self {
        Self {
            source,
            requested,
            _marker: PhantomData,
        }
    }

    /// 获取服务实例
    pub fn get(&self) -> RegistryResult<Arc<T>> {
        let instance = self.source.get_target_as(&self.requested)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| RegistryError::TypeMismatch {
                service: self.source.service().to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual: instance.type_name().to_string(),
            })
    }

    /// 服务名称
    pub fn service(&self) -> &ServiceName {
        self.source.service()
    }

    /// 请求的能力
    pub fn capability(&self) -> &CapabilityDescriptor {
        &self.requested
    }

    /// 是否已经解析
    pub fn is_resolved(&self) -> bool {
        self.source.is_resolved()
    }

    /// 底层的查找目标源
    pub fn target_source(&self) -> &Arc<LookupTargetSource> {
        &self.source
    }
}

impl<T: ?Sized> Clone for ServiceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            requested: self.requested.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ServiceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("type", &std::any::type_name::<T>())
            .field("requested", &self.requested.id())
            .field("source", &self.source)
            .finish()
    }
}
