//! 配置位置与服务名称

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// 配置位置
///
/// 不透明的资源标识（类 URI 字符串），可以是通配模式，也可以是精确地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigLocation(String);

impl ConfigLocation {
    /// 创建配置位置
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// 字符串形式
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 位置中最后一段路径，用于生成作用域名称
    pub fn file_name(&self) -> &str {
        self.0
            .rsplit(['/', '\\', ':'])
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ConfigLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConfigLocation {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ConfigLocation {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ConfigLocation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ConfigLocation {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// 服务名称，导出表中的唯一键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// 创建服务名称
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// 字符串形式
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ServiceName {
    fn from(value: String) -> Self {
        Self(value)
    }
}
