//! 能力描述符
//!
//! 用显式声明的接口标识代替运行时类型反射来判断服务类型兼容性。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 能力描述符
///
/// `id` 是能力（接口）的标识，`implements` 是它实现的全部上级能力标识（已展开传递闭包）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    id: String,
    #[serde(default)]
    implements: BTreeSet<String>,
}

impl CapabilityDescriptor {
    /// 创建不继承任何能力的描述符
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            implements: BTreeSet::new(),
        }
    }

    /// 从 Rust 类型名称派生描述符
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    /// 声明实现了另一个能力，同时继承其全部上级能力
    pub fn implementing(mut self, parent: &CapabilityDescriptor) -> Self {
        self.implements.insert(parent.id.clone());
        self.implements.extend(parent.implements.iter().cloned());
        self.implements.remove(&self.id);
        self
    }

    /// 能力标识
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 上级能力标识
    pub fn implements(&self) -> impl Iterator<Item = &str> {
        self.implements.iter().map(String::as_str)
    }

    /// 当前能力能否接收 `other` 描述的实例
    pub fn accepts(&self, other: &CapabilityDescriptor) -> bool {
        self.id == other.id || other.implements.contains(&self.id)
    }

    /// 简短名称（不含模块路径）
    pub fn short_name(&self) -> &str {
        self.id.rsplit("::").next().unwrap_or(&self.id)
    }
}

impl fmt::Display for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
