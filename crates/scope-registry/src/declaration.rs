//! 导出/导入声明表

use crate::target_source::{ExportTargetSource, LookupTargetSource};
use parking_lot::{RwLock, RwLockWriteGuard};
use scopenest_common::{ScopeId, ServiceName};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 声明种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclarationKind {
    /// 导出声明
    Export,
    /// 导入声明
    Import,
}

/// 声明键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationKey {
    pub scope: ScopeId,
    pub service: ServiceName,
    pub kind: DeclarationKind,
}

impl DeclarationKey {
    /// 导出声明键
    pub fn export(scope: ScopeId, service: ServiceName) -> Self {
        Self {
            scope,
            service,
            kind: DeclarationKind::Export,
        }
    }

    /// 导入声明键
    pub fn import(scope: ScopeId, service: ServiceName) -> Self {
        Self {
            scope,
            service,
            kind: DeclarationKind::Import,
        }
    }

    /// 同一服务的导出声明键
    pub fn to_export(&self) -> Self {
        Self::export(self.scope, self.service.clone())
    }
}

impl fmt::Display for DeclarationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}:{}", self.scope, self.kind, self.service)
    }
}

/// 声明
#[derive(Debug, Clone)]
pub enum Declaration {
    /// 已导出的服务
    Exported(Arc<ExportTargetSource>),
    /// 等待首次使用时解析的导入
    PendingImport(Arc<LookupTargetSource>),
}

impl Declaration {
    /// 声明种类
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Self::Exported(_) => DeclarationKind::Export,
            Self::PendingImport(_) => DeclarationKind::Import,
        }
    }
}

/// 声明表
///
/// 每个根作用域一张，子作用域通过同一个注册表共享。写入由表内的锁串行化。
pub struct DeclarationTable {
    scope: ScopeId,
    entries: RwLock<HashMap<DeclarationKey, Declaration>>,
}

impl DeclarationTable {
    /// 为作用域创建空表
    pub fn new(scope: ScopeId) -> Arc<Self> {
        Arc::new(Self {
            scope,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// 所属作用域
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// 服务的导出声明键
    pub fn export_key(&self, service: &ServiceName) -> DeclarationKey {
        DeclarationKey::export(self.scope, service.clone())
    }

    /// 服务的导入声明键
    pub fn import_key(&self, service: &ServiceName) -> DeclarationKey {
        DeclarationKey::import(self.scope, service.clone())
    }

    /// 查询声明
    pub fn get(&self, key: &DeclarationKey) -> Option<Declaration> {
        self.entries.read().get(key).cloned()
    }

    /// 查询导出声明
    pub fn export(&self, key: &DeclarationKey) -> Option<Arc<ExportTargetSource>> {
        match self.entries.read().get(key) {
            Some(Declaration::Exported(source)) => Some(source.clone()),
            _ => None,
        }
    }

    /// 查询导入声明
    pub fn import(&self, key: &DeclarationKey) -> Option<Arc<LookupTargetSource>> {
        match self.entries.read().get(key) {
            Some(Declaration::PendingImport(source)) => Some(source.clone()),
            _ => None,
        }
    }

    /// 是否存在声明
    pub fn contains(&self, key: &DeclarationKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// 指定种类的服务名称（已排序）
    pub fn services(&self, kind: DeclarationKind) -> Vec<ServiceName> {
        let mut services: Vec<ServiceName> = self
            .entries
            .read()
            .keys()
            .filter(|key| key.kind == kind)
            .map(|key| key.service.clone())
            .collect();
        services.sort();
        services
    }

    /// 声明数量
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 表是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 获取写锁，检查与插入必须在同一把锁内完成
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, HashMap<DeclarationKey, Declaration>> {
        self.entries.write()
    }
}

impl fmt::Debug for DeclarationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarationTable")
            .field("scope", &self.scope)
            .field("entries", &self.len())
            .finish()
    }
}
