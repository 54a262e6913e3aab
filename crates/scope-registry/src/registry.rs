//! 服务注册表
//!
//! 每个根作用域一个注册表，子作用域共享它来导出或查找服务。

use crate::declaration::{Declaration, DeclarationKind, DeclarationTable};
use crate::handle::ServiceHandle;
use crate::target_source::{ExportKind, ExportRef, ExportTargetSource, LookupTargetSource, TargetSource};
use scopenest_abstractions::ScopeContext;
use scopenest_common::{CapabilityDescriptor, ServiceInstance, ServiceName};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 导出目标源单例名称前缀
pub const EXPORT_BEAN_PREFIX: &str = "scopenest.export.";

/// 导出结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// 新注册
    Registered,
    /// 已存在同名导出，本次调用被忽略
    Ignored,
    /// 替换了可重绑定导出的提供者
    Rebound,
}

/// 服务注册表
pub struct ServiceRegistry {
    scope: Arc<dyn ScopeContext>,
    table: Arc<DeclarationTable>,
}

impl ServiceRegistry {
    /// 为根作用域创建注册表
    pub fn new(scope: Arc<dyn ScopeContext>) -> Self {
        let table = DeclarationTable::new(scope.info().id);
        info!("创建服务注册表: {}", scope.name());
        Self { scope, table }
    }

    /// 所属作用域
    pub fn scope(&self) -> &Arc<dyn ScopeContext> {
        &self.scope
    }

    /// 声明表
    pub fn table(&self) -> &Arc<DeclarationTable> {
        &self.table
    }

    /// 导出服务
    ///
    /// 同名导出已存在时忽略本次调用，除非新旧导出都是可重绑定的。
    pub fn export(&self, export: ExportRef) -> ExportOutcome {
        let key = self.table.export_key(&export.service);
        let mut entries = self.table.write();

        if let Some(Declaration::Exported(existing)) = entries.get(&key) {
            if existing.kind() == ExportKind::Rebindable && export.kind == ExportKind::Rebindable {
                info!("重绑定导出服务: {}", export.service);
                existing.rebind(export);
                return ExportOutcome::Rebound;
            }

            warn!(
                "服务已导出，忽略重复导出: {} (已有能力: {}, 新能力: {})",
                export.service,
                existing.capability(),
                export.capability
            );
            return ExportOutcome::Ignored;
        }

        info!("导出服务: {} ({})", export.service, export.capability);
        let source = Arc::new(ExportTargetSource::new(export));
        entries.insert(key, Declaration::Exported(source.clone()));
        drop(entries);

        self.publish_singleton(&source);
        ExportOutcome::Registered
    }

    /// 导出目标源在所属作用域中的单例名称
    pub fn export_bean_name(service: &ServiceName) -> String {
        format!("{}{}", EXPORT_BEAN_PREFIX, service)
    }

    /// 把导出目标源注册为作用域单例，使作用域能按名称回答服务是否存在
    fn publish_singleton(&self, source: &Arc<ExportTargetSource>) {
        let name = Self::export_bean_name(source.service());
        let result = self.scope.register_singleton(
            &name,
            CapabilityDescriptor::of::<ExportTargetSource>(),
            ServiceInstance::new(source.clone()),
        );
        if let Err(e) = result {
            warn!("导出目标源注册为单例失败: {}: {}", name, e);
        }
    }

    /// 查找服务，返回的句柄在首次使用时才解析
    pub fn lookup<T>(
        &self,
        service: impl Into<ServiceName>,
        capability: CapabilityDescriptor,
    ) -> ServiceHandle<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let source = self.register_import(service.into(), capability.clone());
        ServiceHandle::new(source, capability)
    }

    /// 只注册导入声明，不返回句柄
    pub fn void_lookup(&self, service: impl Into<ServiceName>, capability: CapabilityDescriptor) {
        self.register_import(service.into(), capability);
    }

    /// 获取已注册导入声明的句柄
    pub fn import_handle<T>(&self, service: impl Into<ServiceName>) -> Option<ServiceHandle<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = self.table.import_key(&service.into());
        self.table.import(&key).map(|source| {
            let requested = source.requested_capability().clone();
            ServiceHandle::new(source, requested)
        })
    }

    fn register_import(
        &self,
        service: ServiceName,
        capability: CapabilityDescriptor,
    ) -> Arc<LookupTargetSource> {
        let key = self.table.import_key(&service);
        let mut entries = self.table.write();

        if let Some(Declaration::PendingImport(existing)) = entries.get(&key) {
            if existing.requested_capability() != &capability {
                debug!(
                    "导入声明已存在，句柄按各自请求的能力检查: {} (已有: {}, 请求: {})",
                    service,
                    existing.requested_capability(),
                    capability
                );
            }
            return existing.clone();
        }

        debug!("注册导入声明: {} ({})", service, capability);
        let source = Arc::new(LookupTargetSource::new(
            service,
            capability,
            key.to_export(),
            &self.table,
        ));
        entries.insert(key, Declaration::PendingImport(source.clone()));
        source
    }

    /// 是否存在导出
    pub fn contains_export(&self, service: impl Into<ServiceName>) -> bool {
        self.table.contains(&self.table.export_key(&service.into()))
    }

    /// 是否存在导入声明
    pub fn contains_import(&self, service: impl Into<ServiceName>) -> bool {
        self.table.contains(&self.table.import_key(&service.into()))
    }

    /// 获取导出目标源
    pub fn export_source(&self, service: impl Into<ServiceName>) -> Option<Arc<ExportTargetSource>> {
        self.table.export(&self.table.export_key(&service.into()))
    }

    /// 已导出的服务（已排序）
    pub fn exported_services(&self) -> Vec<ServiceName> {
        self.table.services(DeclarationKind::Export)
    }

    /// 已声明导入的服务（已排序）
    pub fn imported_services(&self) -> Vec<ServiceName> {
        self.table.services(DeclarationKind::Import)
    }

    /// 为所有尚无导入声明的导出注册导入声明，返回新增数量
    pub fn autowire_exports(&self) -> usize {
        let mut added = 0;
        for service in self.exported_services() {
            if self.contains_import(service.clone()) {
                continue;
            }
            let Some(export) = self.export_source(service.clone()) else {
                continue;
            };
            debug!("自动装配导出服务: {}", service);
            self.void_lookup(service, export.capability());
            added += 1;
        }

        if added > 0 {
            info!("自动装配导出服务完成: {} 个", added);
        }
        added
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("scope", &self.scope.name())
            .field("table", &self.table)
            .finish()
    }
}
