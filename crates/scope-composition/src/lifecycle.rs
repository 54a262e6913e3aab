//! 嵌套作用域生命周期管理
//!
//! 状态只能线性前进：`Unstarted -> Resolved -> Ready -> Destroyed`。
//!
//! - [`ScopeLifecycleManager::finalize_config`] 解析配置位置
//! - [`ScopeLifecycleManager::on_parent_ready`] 按顺序为每个位置创建子作用域
//! - [`ScopeLifecycleManager::destroy`] 按创建的逆序关闭全部子作用域
//!
//! 宽松模式（默认）下，单个位置失败只记录到 [`NestedFailureRecord`]，其余位置继续处理；
//! 严格模式下第一个失败即中止整个转换。

use crate::child_factory::ChildScopeFactory;
use crate::resolver::ConfigLocationResolver;
use parking_lot::RwLock;
use scopenest_abstractions::ScopeContext;
use scopenest_common::{
    ConfigLocation, LifecycleError, LifecycleResult, LifecycleState, NestedFailureCause,
    TeardownFailure,
};
use scopenest_config::NestedScopesOptions;
use scopenest_registry::ServiceRegistry;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 嵌套作用域失败记录
///
/// 位置到错误的有序映射，保持首次记录的顺序，不会被自动清除
#[derive(Debug, Clone, Default)]
pub struct NestedFailureRecord {
    entries: Vec<(ConfigLocation, NestedFailureCause)>,
}

impl NestedFailureRecord {
    /// 创建空记录
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录失败，同一位置再次记录时替换错误但保留原有顺序
    pub fn put(&mut self, location: ConfigLocation, cause: NestedFailureCause) {
        match self.entries.iter_mut().find(|(existing, _)| existing == &location) {
            Some((_, existing)) => *existing = cause,
            None => self.entries.push((location, cause)),
        }
    }

    /// 查询位置的失败原因
    pub fn get(&self, location: &ConfigLocation) -> Option<&NestedFailureCause> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == location)
            .map(|(_, cause)| cause)
    }

    /// 是否记录了该位置
    pub fn contains(&self, location: &ConfigLocation) -> bool {
        self.get(location).is_some()
    }

    /// 失败的位置（按记录顺序）
    pub fn locations(&self) -> Vec<ConfigLocation> {
        self.entries
            .iter()
            .map(|(location, _)| location.clone())
            .collect()
    }

    /// 遍历记录
    pub fn iter(&self) -> impl Iterator<Item = (&ConfigLocation, &NestedFailureCause)> {
        self.entries.iter().map(|(location, cause)| (location, cause))
    }

    /// 记录数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 嵌套作用域生命周期管理器
pub struct ScopeLifecycleManager {
    parent: Arc<dyn ScopeContext>,
    options: NestedScopesOptions,
    resolver: ConfigLocationResolver,
    factory: ChildScopeFactory,
    registry: Option<Arc<ServiceRegistry>>,
    /// 串行化状态转换
    transition: Mutex<()>,
    state: RwLock<LifecycleState>,
    resolved: RwLock<Vec<ConfigLocation>>,
    children: RwLock<Vec<Arc<dyn ScopeContext>>>,
    failures: RwLock<NestedFailureRecord>,
    failed_locations: RwLock<Vec<ConfigLocation>>,
}

impl ScopeLifecycleManager {
    /// 创建管理器
    pub fn new(
        parent: Arc<dyn ScopeContext>,
        options: NestedScopesOptions,
        resolver: ConfigLocationResolver,
        factory: ChildScopeFactory,
    ) -> Self {
        Self {
            parent,
            options,
            resolver,
            factory,
            registry: None,
            transition: Mutex::new(()),
            state: RwLock::new(LifecycleState::Unstarted),
            resolved: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
            failures: RwLock::new(NestedFailureRecord::new()),
            failed_locations: RwLock::new(Vec::new()),
        }
    }

    /// 关联服务注册表，用于就绪后的自动装配
    pub fn with_registry(mut self, registry: Arc<ServiceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 当前状态
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// 父作用域
    pub fn parent(&self) -> &Arc<dyn ScopeContext> {
        &self.parent
    }

    /// 服务注册表
    pub fn registry(&self) -> Option<&Arc<ServiceRegistry>> {
        self.registry.as_ref()
    }

    /// 启动配置
    pub fn options(&self) -> &NestedScopesOptions {
        &self.options
    }

    /// 原始配置位置
    pub fn config_locations(&self) -> &[String] {
        &self.options.config_locations
    }

    /// 完全跳过的位置
    pub fn ignored_locations(&self) -> &BTreeSet<String> {
        &self.options.ignored_locations
    }

    /// 最终解析出的位置列表
    pub fn resolved_locations(&self) -> Vec<ConfigLocation> {
        self.resolved.read().clone()
    }

    /// 当前子作用域快照（按创建顺序）
    pub fn children(&self) -> Vec<Arc<dyn ScopeContext>> {
        self.children.read().clone()
    }

    /// 失败记录快照
    pub fn nested_failures(&self) -> NestedFailureRecord {
        self.failures.read().clone()
    }

    /// 重新展开失败的位置
    pub fn failed_locations(&self) -> Vec<ConfigLocation> {
        self.failed_locations.read().clone()
    }

    fn is_strict(&self) -> bool {
        self.options.strict_error_handling
    }

    fn set_state(&self, state: LifecycleState) {
        let mut current = self.state.write();
        debug!("生命周期状态: {} -> {}", *current, state);
        *current = state;
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[LifecycleState],
    ) -> LifecycleResult<()> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition { operation, state })
        }
    }

    fn record_failure(&self, location: &ConfigLocation, cause: NestedFailureCause) {
        self.failures.write().put(location.clone(), cause);
    }

    /// 配置确定后解析配置位置：`Unstarted -> Resolved`
    pub async fn finalize_config(&self) -> LifecycleResult<()> {
        let _guard = self.transition.lock().await;
        self.expect_state("finalize_config", &[LifecycleState::Unstarted])?;

        info!("解析嵌套作用域配置位置 (严格模式: {})", self.is_strict());
        let resolved = match self
            .resolver
            .resolve(
                &self.options.config_locations,
                &self.options.exclude_config_locations,
            )
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("配置位置解析失败: {}", e);
                self.set_state(LifecycleState::Failed);
                return Err(LifecycleError::Resolution { source: e });
            }
        };

        for (raw, error) in resolved.skipped {
            self.record_failure(&ConfigLocation::new(raw), NestedFailureCause::Expansion(error));
        }

        info!("解析得到 {} 个配置位置", resolved.locations.len());
        *self.resolved.write() = resolved.locations;
        self.set_state(LifecycleState::Resolved);
        Ok(())
    }

    /// 父作用域启动完成后创建子作用域：`Resolved -> Ready`
    pub async fn on_parent_ready(&self) -> LifecycleResult<()> {
        let _guard = self.transition.lock().await;
        self.expect_state("on_parent_ready", &[LifecycleState::Resolved])?;

        let locations = self.resolved_locations();
        info!("开始创建子作用域: {} 个配置位置", locations.len());

        for location in &locations {
            if self.options.ignored_locations.contains(location.as_str()) {
                info!("跳过忽略的配置位置: {}", location);
                continue;
            }

            let resources = match self.resolver.expand(location).await {
                Ok(resources) => resources,
                Err(e) => {
                    warn!("重新展开配置位置失败: {}, 原因: {}", location, e);
                    let cause = NestedFailureCause::Expansion(Arc::new(e));
                    self.record_failure(location, cause.clone());
                    self.failed_locations.write().push(location.clone());
                    if self.is_strict() {
                        return Err(self.abort(location, cause));
                    }
                    continue;
                }
            };

            for resource in &resources {
                match self.factory.create(resource, &self.parent).await {
                    Ok(child) => {
                        info!("子作用域已创建: {} ({})", child.name(), resource);
                        self.children.write().push(child);
                    }
                    Err(e) => {
                        error!("子作用域创建失败: {}, 原因: {}", resource, e);
                        let cause = NestedFailureCause::Build(Arc::new(e));
                        self.record_failure(location, cause.clone());
                        if self.is_strict() {
                            return Err(self.abort(location, cause));
                        }
                        // 同一位置剩余的资源不再处理
                        break;
                    }
                }
            }
        }

        self.set_state(LifecycleState::Ready);

        if self.options.autowire_exports {
            if let Some(registry) = &self.registry {
                registry.autowire_exports();
            }
        }

        let failures = self.failures.read().len();
        if failures > 0 {
            warn!(
                "子作用域创建完成，但有 {} 个位置失败，请检查失败记录",
                failures
            );
        } else {
            info!("子作用域创建完成: {} 个", self.children.read().len());
        }
        Ok(())
    }

    fn abort(&self, location: &ConfigLocation, cause: NestedFailureCause) -> LifecycleError {
        error!("严格模式下中止子作用域创建: {}", location);
        self.set_state(LifecycleState::Failed);
        LifecycleError::NestedScopeFailed {
            location: location.to_string(),
            cause,
        }
    }

    /// 父作用域关闭时销毁全部子作用域：`* -> Destroyed`
    ///
    /// 按创建的逆序逐个关闭，单个关闭失败不影响其余子作用域，所有失败汇总后返回。
    pub async fn destroy(&self) -> LifecycleResult<()> {
        let _guard = self.transition.lock().await;
        if self.state() == LifecycleState::Destroyed {
            return Err(LifecycleError::InvalidTransition {
                operation: "destroy",
                state: LifecycleState::Destroyed,
            });
        }

        let children = std::mem::take(&mut *self.children.write());
        info!("销毁子作用域: {} 个", children.len());

        let mut failures = Vec::new();
        for child in children.into_iter().rev() {
            debug!("关闭子作用域: {}", child.name());
            if let Err(e) = child.close() {
                warn!("子作用域关闭失败: {}, 原因: {}", child.name(), e);
                failures.push(TeardownFailure {
                    scope: child.name().to_string(),
                    error: e,
                });
            }
        }

        self.set_state(LifecycleState::Destroyed);

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::TeardownFailed { failures })
        }
    }
}

impl fmt::Debug for ScopeLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeLifecycleManager")
            .field("parent", &self.parent.name())
            .field("state", &self.state())
            .field("resolver", &self.resolver)
            .field("factory", &self.factory)
            .field("children", &self.children.read().len())
            .field("failures", &self.failures.read().len())
            .finish()
    }
}
