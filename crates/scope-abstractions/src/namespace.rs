//! 资源命名空间抽象接口

use async_trait::async_trait;
use scopenest_common::{ConfigLocation, ResolutionError};

/// 资源命名空间 trait
///
/// 把一个位置模式展开为零个或多个具体资源，并区分精确地址与通配模式
#[async_trait]
pub trait ResourceNamespace: Send + Sync {
    /// 展开位置模式
    async fn expand(&self, pattern: &str) -> Result<Vec<ConfigLocation>, ResolutionError>;

    /// 读取资源内容
    async fn read(&self, location: &ConfigLocation) -> Result<String, ResolutionError>;

    /// 判断位置是否为通配模式
    fn is_pattern(&self, location: &str) -> bool {
        is_wildcard(location)
    }

    /// 命名空间名称
    fn name(&self) -> &str;
}

/// 默认的通配判断：包含 `*`、`?` 或 `[` 即视为模式
pub fn is_wildcard(location: &str) -> bool {
    location.contains(['*', '?', '['])
}
