//! 内存对象图
//!
//! 提供 [`ScopeContext`] 的默认实现：按名称注册的单例、延迟创建的工厂 Bean、
//! 父作用域回退查找以及关闭回调。

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use scopenest_abstractions::ScopeContext;
use scopenest_common::{
    BoxError, CapabilityDescriptor, ConfigLocation, ScopeError, ScopeInfo, ScopeResult,
    ServiceInstance,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bean 工厂函数类型
pub type BeanFactoryFn =
    Arc<dyn Fn(&ObjectScope) -> Result<ServiceInstance, BoxError> + Send + Sync>;

/// 关闭回调类型
type CloseHook = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Bean 来源
enum BeanSource {
    /// 已存在的实例
    Instance(ServiceInstance),
    /// 首次获取时创建，之后复用
    Factory {
        factory: BeanFactoryFn,
        cell: OnceCell<ServiceInstance>,
    },
}

/// Bean 定义
struct BeanDefinition {
    capability: CapabilityDescriptor,
    source: BeanSource,
}

impl BeanDefinition {
    fn is_instantiated(&self) -> bool {
        match &self.source {
            BeanSource::Instance(_) => true,
            BeanSource::Factory { cell, .. } => cell.get().is_some(),
        }
    }
}

/// 内存对象图作用域
pub struct ObjectScope {
    info: ScopeInfo,
    parent: Option<Arc<dyn ScopeContext>>,
    beans: RwLock<HashMap<String, Arc<BeanDefinition>>>,
    close_hooks: Mutex<Vec<(String, CloseHook)>>,
    closed: AtomicBool,
}

impl ObjectScope {
    /// 创建根作用域
    pub fn root(name: impl Into<String>) -> Arc<Self> {
        let info = ScopeInfo::root(name);
        info!("创建根作用域: {} ({})", info.name, info.id);
        Arc::new(Self::with_info(info, None))
    }

    /// 创建子作用域，唯一配置来源为 `location`
    pub fn child(parent: Arc<dyn ScopeContext>, location: ConfigLocation) -> Arc<Self> {
        let info = ScopeInfo::child(parent.info(), location);
        debug!("创建子作用域: {} (父作用域: {})", info.name, parent.name());
        Arc::new(Self::with_info(info, Some(parent)))
    }

    fn with_info(info: ScopeInfo, parent: Option<Arc<dyn ScopeContext>>) -> Self {
        Self {
            info,
            parent,
            beans: RwLock::new(HashMap::new()),
            close_hooks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> ScopeResult<()> {
        if self.is_closed() {
            return Err(ScopeError::ScopeClosed {
                scope: self.info.name.clone(),
            });
        }
        Ok(())
    }

    fn insert(&self, name: &str, definition: BeanDefinition) -> ScopeResult<()> {
        self.ensure_open()?;

        let mut beans = self.beans.write();
        if beans.contains_key(name) {
            return Err(ScopeError::BeanAlreadyRegistered {
                name: name.to_string(),
                scope: self.info.name.clone(),
            });
        }
        beans.insert(name.to_string(), Arc::new(definition));
        Ok(())
    }

    fn local_definition(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        self.beans.read().get(name).cloned()
    }

    /// 注册共享实例
    pub fn register_instance<T>(
        &self,
        name: &str,
        capability: CapabilityDescriptor,
        value: Arc<T>,
    ) -> ScopeResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        debug!("注册单例 Bean: {} ({}) -> {}", name, capability, self.info.name);
        self.insert(
            name,
            BeanDefinition {
                capability,
                source: BeanSource::Instance(ServiceInstance::new(value)),
            },
        )
    }

    /// 注册延迟创建的单例工厂，工厂最多成功执行一次
    pub fn register_factory<T, F>(
        &self,
        name: &str,
        capability: CapabilityDescriptor,
        factory: F,
    ) -> ScopeResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ObjectScope) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        debug!("注册工厂 Bean: {} ({}) -> {}", name, capability, self.info.name);
        let factory: BeanFactoryFn =
            Arc::new(move |scope: &ObjectScope| factory(scope).map(ServiceInstance::new));
        self.insert(
            name,
            BeanDefinition {
                capability,
                source: BeanSource::Factory {
                    factory,
                    cell: OnceCell::new(),
                },
            },
        )
    }

    /// 获取类型化 Bean
    pub fn get<T>(&self, name: &str) -> ScopeResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.get_bean(name)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| ScopeError::BeanTypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual: instance.type_name().to_string(),
            })
    }

    /// 注册关闭回调，关闭时按注册的逆序执行
    pub fn on_close<F>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        self.close_hooks.lock().push((name.into(), Box::new(hook)));
    }

    /// 本地 Bean 名称（已排序）
    pub fn bean_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.beans.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// 本地 Bean 是否已经实例化
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.local_definition(name)
            .map(|definition| definition.is_instantiated())
            .unwrap_or(false)
    }

    /// 作用域的配置来源
    pub fn location(&self) -> Option<&ConfigLocation> {
        self.info.location.as_ref()
    }
}

impl ScopeContext for ObjectScope {
    fn info(&self) -> &ScopeInfo {
        &self.info
    }

    fn parent(&self) -> Option<Arc<dyn ScopeContext>> {
        self.parent.clone()
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.beans.read().contains_key(name)
            || self
                .parent
                .as_ref()
                .map(|parent| parent.contains_bean(name))
                .unwrap_or(false)
    }

    fn get_bean(&self, name: &str) -> Result<ServiceInstance, ScopeError> {
        self.ensure_open()?;

        let Some(definition) = self.local_definition(name) else {
            return match &self.parent {
                Some(parent) => parent.get_bean(name),
                None => Err(ScopeError::BeanNotFound {
                    name: name.to_string(),
                    scope: self.info.name.clone(),
                }),
            };
        };

        match &definition.source {
            BeanSource::Instance(instance) => Ok(instance.clone()),
            BeanSource::Factory { factory, cell } => cell
                .get_or_try_init(|| {
                    debug!("创建 Bean 实例: {} ({})", name, self.info.name);
                    factory(self)
                })
                .cloned()
                .map_err(|source| ScopeError::BeanCreationFailed {
                    name: name.to_string(),
                    source,
                }),
        }
    }

    fn bean_capability(&self, name: &str) -> Option<CapabilityDescriptor> {
        match self.local_definition(name) {
            Some(definition) => Some(definition.capability.clone()),
            None => self
                .parent
                .as_ref()
                .and_then(|parent| parent.bean_capability(name)),
        }
    }

    fn register_singleton(
        &self,
        name: &str,
        capability: CapabilityDescriptor,
        instance: ServiceInstance,
    ) -> Result<(), ScopeError> {
        debug!("注册单例: {} ({}) -> {}", name, capability, self.info.name);
        self.insert(
            name,
            BeanDefinition {
                capability,
                source: BeanSource::Instance(instance),
            },
        )
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> Result<(), ScopeError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("作用域已关闭，忽略重复关闭: {}", self.info.name);
            return Ok(());
        }

        info!("关闭作用域: {}", self.info.name);

        let hooks: Vec<(String, CloseHook)> = std::mem::take(&mut *self.close_hooks.lock());
        let mut failures = Vec::new();
        for (hook_name, hook) in hooks.into_iter().rev() {
            if let Err(e) = hook() {
                warn!("关闭回调执行失败: {} ({}): {}", hook_name, self.info.name, e);
                failures.push(format!("{}: {}", hook_name, e));
            }
        }

        self.beans.write().clear();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ScopeError::CloseFailed {
                scope: self.info.name.clone(),
                message: failures.join("; "),
            })
        }
    }
}

impl fmt::Debug for ObjectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectScope")
            .field("info", &self.info)
            .field("parent", &self.parent.as_ref().map(|p| p.name().to_string()))
            .field("beans", &self.bean_names())
            .field("closed", &self.is_closed())
            .finish()
    }
}
