//! 目标源
//!
//! [`ExportTargetSource`] 持有导出方的服务提供者；[`LookupTargetSource`] 在首次使用时
//! 找到对应的导出并缓存结果。缓存只会从空变为已解析一次。

use crate::declaration::{DeclarationKey, DeclarationTable};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use scopenest_abstractions::ScopeContext;
use scopenest_common::{
    CapabilityDescriptor, RegistryError, ScopeError, ScopeId, ServiceInstance, ServiceName,
};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// 目标源 trait
pub trait TargetSource: Send + Sync {
    /// 声明的能力
    fn capability(&self) -> CapabilityDescriptor;

    /// 获取实际的服务实例
    fn get_target(&self) -> Result<ServiceInstance, RegistryError>;
}

/// 服务提供者
#[derive(Clone)]
pub enum ServiceProvider {
    /// 直接引用的实例
    Instance {
        instance: ServiceInstance,
        capability: CapabilityDescriptor,
    },
    /// 由所属作用域按名称创建的 Bean
    Bean {
        name: String,
        scope: Arc<dyn ScopeContext>,
    },
}

impl ServiceProvider {
    /// 直接引用实例
    pub fn instance<T>(value: Arc<T>, capability: CapabilityDescriptor) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::Instance {
            instance: ServiceInstance::new(value),
            capability,
        }
    }

    /// 按名称引用作用域中的 Bean
    pub fn bean(name: impl Into<String>, scope: Arc<dyn ScopeContext>) -> Self {
        Self::Bean {
            name: name.into(),
            scope,
        }
    }

    /// 提供者实际的能力，Bean 不存在时返回错误
    pub fn actual_capability(&self) -> Result<CapabilityDescriptor, ScopeError> {
        match self {
            Self::Instance { capability, .. } => Ok(capability.clone()),
            Self::Bean { name, scope } => {
                scope
                    .bean_capability(name)
                    .ok_or_else(|| ScopeError::BeanNotFound {
                        name: name.clone(),
                        scope: scope.name().to_string(),
                    })
            }
        }
    }

    /// 获取实例，Bean 由所属作用域的对象图创建
    pub fn materialize(&self) -> Result<ServiceInstance, ScopeError> {
        match self {
            Self::Instance { instance, .. } => Ok(instance.clone()),
            Self::Bean { name, scope } => scope.get_bean(name),
        }
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance {
                instance,
                capability,
            } => f
                .debug_struct("Instance")
                .field("type_name", &instance.type_name())
                .field("capability", &capability.id())
                .finish(),
            Self::Bean { name, scope } => f
                .debug_struct("Bean")
                .field("name", name)
                .field("scope", &scope.name())
                .finish(),
        }
    }
}

/// 导出种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportKind {
    /// 首次注册后不可替换
    #[default]
    Fixed,
    /// 允许之后用另一个可重绑定导出替换提供者
    Rebindable,
}

/// 导出声明
#[derive(Debug, Clone)]
pub struct ExportRef {
    pub service: ServiceName,
    pub capability: CapabilityDescriptor,
    pub provider: ServiceProvider,
    pub kind: ExportKind,
}

impl ExportRef {
    /// 创建导出声明
    pub fn new(
        service: impl Into<ServiceName>,
        capability: CapabilityDescriptor,
        provider: ServiceProvider,
    ) -> Self {
        Self {
            service: service.into(),
            capability,
            provider,
            kind: ExportKind::Fixed,
        }
    }

    /// 导出实例，实例的能力与声明的能力一致
    pub fn instance<T>(
        service: impl Into<ServiceName>,
        capability: CapabilityDescriptor,
        value: Arc<T>,
    ) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let provider = ServiceProvider::instance(value, capability.clone());
        Self::new(service, capability, provider)
    }

    /// 导出作用域中的 Bean
    pub fn bean(
        service: impl Into<ServiceName>,
        capability: CapabilityDescriptor,
        name: impl Into<String>,
        scope: Arc<dyn ScopeContext>,
    ) -> Self {
        Self::new(service, capability, ServiceProvider::bean(name, scope))
    }

    /// 标记为可重绑定导出
    pub fn rebindable(mut self) -> Self {
        self.kind = ExportKind::Rebindable;
        self
    }
}

#[derive(Debug)]
struct ExportBinding {
    capability: CapabilityDescriptor,
    provider: ServiceProvider,
}

/// 导出目标源
pub struct ExportTargetSource {
    service: ServiceName,
    kind: ExportKind,
    binding: RwLock<ExportBinding>,
}

impl ExportTargetSource {
    /// 从导出声明创建
    pub fn new(export: ExportRef) -> Self {
        Self {
            service: export.service,
            kind: export.kind,
            binding: RwLock::new(ExportBinding {
                capability: export.capability,
                provider: export.provider,
            }),
        }
    }

    /// 服务名称
    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    /// 导出种类
    pub fn kind(&self) -> ExportKind {
        self.kind
    }

    /// 当前的提供者
    pub fn provider(&self) -> ServiceProvider {
        self.binding.read().provider.clone()
    }

    /// 在同一把读锁下取得声明的能力与提供者
    pub fn snapshot(&self) -> (CapabilityDescriptor, ServiceProvider) {
        let binding = self.binding.read();
        (binding.capability.clone(), binding.provider.clone())
    }

    /// 替换提供者，只对可重绑定导出调用
    pub(crate) fn rebind(&self, export: ExportRef) {
        let mut binding = self.binding.write();
        debug!(
            "重绑定导出服务: {} ({} -> {})",
            self.service, binding.capability, export.capability
        );
        binding.capability = export.capability;
        binding.provider = export.provider;
    }
}

impl TargetSource for ExportTargetSource {
    fn capability(&self) -> CapabilityDescriptor {
        self.binding.read().capability.clone()
    }

    fn get_target(&self) -> Result<ServiceInstance, RegistryError> {
        // 不持锁创建实例，创建过程可能再次访问注册表
        let provider = self.provider();
        provider
            .materialize()
            .map_err(|source| RegistryError::ProviderFailed {
                service: self.service.to_string(),
                source,
            })
    }
}

impl fmt::Debug for ExportTargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = self.binding.read();
        f.debug_struct("ExportTargetSource")
            .field("service", &self.service)
            .field("kind", &self.kind)
            .field("capability", &binding.capability.id())
            .field("provider", &binding.provider)
            .finish()
    }
}

/// 查找目标源
///
/// 相等性、哈希与调试输出都不包含缓存的实例，解析前后保持一致。
pub struct LookupTargetSource {
    service: ServiceName,
    capability: CapabilityDescriptor,
    export_key: DeclarationKey,
    root: ScopeId,
    table: Weak<DeclarationTable>,
    target: OnceCell<ResolvedTarget>,
}

/// 已解析的目标及解析时导出声明的能力
#[derive(Debug, Clone)]
struct ResolvedTarget {
    instance: ServiceInstance,
    declared: CapabilityDescriptor,
}

impl LookupTargetSource {
    /// 创建指向 `export_key` 的查找目标源
    pub fn new(
        service: ServiceName,
        capability: CapabilityDescriptor,
        export_key: DeclarationKey,
        table: &Arc<DeclarationTable>,
    ) -> Self {
        Self {
            service,
            capability,
            export_key,
            root: table.scope(),
            table: Arc::downgrade(table),
            target: OnceCell::new(),
        }
    }

    /// 服务名称
    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    /// 请求的能力
    pub fn requested_capability(&self) -> &CapabilityDescriptor {
        &self.capability
    }

    /// 对应的导出声明键
    pub fn export_key(&self) -> &DeclarationKey {
        &self.export_key
    }

    /// 根作用域
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// 是否已经解析
    pub fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }

    fn mismatch(&self, expected: &CapabilityDescriptor, actual: &CapabilityDescriptor) -> RegistryError {
        RegistryError::TypeMismatch {
            service: self.service.to_string(),
            expected: expected.id().to_string(),
            actual: actual.id().to_string(),
        }
    }

    /// 以调用方请求的能力获取目标
    ///
    /// 同一导入声明可能被以不同能力查找，缓存命中时也要用调用方的能力
    /// 与解析时导出声明的能力比对。
    pub fn get_target_as(
        &self,
        requested: &CapabilityDescriptor,
    ) -> Result<ServiceInstance, RegistryError> {
        if let Some(target) = self.target.get() {
            return self.checked(requested, target);
        }

        let resolved = self.resolve(requested)?;
        match self.target.try_insert(resolved) {
            Ok(target) => {
                debug!("导入服务已解析: {} ({})", self.service, requested);
                Ok(target.instance.clone())
            }
            Err((winner, _discarded)) => {
                info!("导入服务已被其他线程解析，使用已有实例: {}", self.service);
                self.checked(requested, winner)
            }
        }
    }

    fn checked(
        &self,
        requested: &CapabilityDescriptor,
        target: &ResolvedTarget,
    ) -> Result<ServiceInstance, RegistryError> {
        if requested.accepts(&target.declared) {
            Ok(target.instance.clone())
        } else {
            Err(self.mismatch(requested, &target.declared))
        }
    }

    fn resolve(&self, requested: &CapabilityDescriptor) -> Result<ResolvedTarget, RegistryError> {
        let export = self
            .table
            .upgrade()
            .and_then(|table| table.export(&self.export_key))
            .ok_or_else(|| RegistryError::NotFound {
                service: self.service.to_string(),
                capability: requested.id().to_string(),
            })?;

        // 两次检查与创建实例都基于同一份绑定，重绑定不会插在中间
        let (declared, provider) = export.snapshot();
        if !requested.accepts(&declared) {
            return Err(self.mismatch(requested, &declared));
        }

        let provider_failed = |source: ScopeError| RegistryError::ProviderFailed {
            service: self.service.to_string(),
            source,
        };
        let actual = provider.actual_capability().map_err(provider_failed)?;
        if !declared.accepts(&actual) {
            return Err(self.mismatch(&declared, &actual));
        }

        let instance = provider.materialize().map_err(provider_failed)?;
        Ok(ResolvedTarget { instance, declared })
    }
}

impl TargetSource for LookupTargetSource {
    fn capability(&self) -> CapabilityDescriptor {
        self.capability.clone()
    }

    fn get_target(&self) -> Result<ServiceInstance, RegistryError> {
        self.get_target_as(&self.capability)
    }
}

impl PartialEq for LookupTargetSource {
    fn eq(&self, other: &Self) -> bool {
        self.service == other.service
            && self.capability == other.capability
            && self.export_key == other.export_key
            && self.root == other.root
    }
}

impl Eq for LookupTargetSource {}

impl Hash for LookupTargetSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service.hash(state);
        self.capability.hash(state);
        self.export_key.hash(state);
        self.root.hash(state);
    }
}

impl fmt::Debug for LookupTargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupTargetSource")
            .field("service", &self.service)
            .field("capability", &self.capability.id())
            .field("export_key", &self.export_key)
            .field("root", &self.root)
            .finish()
    }
}
