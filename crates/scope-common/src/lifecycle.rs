//! 作用域生命周期相关的基础类型

use crate::location::ConfigLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 作用域唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(uuid::Uuid);

impl ScopeId {
    /// 生成新的作用域标识
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// 内部 UUID
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 作用域描述信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeInfo {
    pub id: ScopeId,
    pub name: String,
    /// 子作用域的唯一配置来源，根作用域为空
    pub location: Option<ConfigLocation>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ScopeInfo {
    /// 创建根作用域信息
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            id: ScopeId::new(),
            name: name.into(),
            location: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// 创建子作用域信息，名称由父作用域名称和配置位置组成
    pub fn child(parent: &ScopeInfo, location: ConfigLocation) -> Self {
        Self {
            id: ScopeId::new(),
            name: format!("{}/{}", parent.name, location.file_name()),
            location: Some(location),
            created_at: chrono::Utc::now(),
        }
    }
}

/// 嵌套作用域管理器的生命周期状态
///
/// 状态只能线性前进：`Unstarted -> Resolved -> Ready -> Destroyed`。
/// 任一转换中止时进入 `Failed`，此后只允许销毁。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// 尚未解析配置
    Unstarted,
    /// 配置位置已解析
    Resolved,
    /// 子作用域已创建
    Ready,
    /// 转换中止
    Failed,
    /// 已销毁
    Destroyed,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Unstarted
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unstarted => "Unstarted",
            Self::Resolved => "Resolved",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
            Self::Destroyed => "Destroyed",
        };
        f.write_str(name)
    }
}
