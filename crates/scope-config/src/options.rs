//! 嵌套作用域启动配置

use scopenest_common::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 嵌套作用域启动配置
///
/// 在 `finalize_config` 之前一次性提供
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedScopesOptions {
    /// 有序的原始位置模式
    pub config_locations: Vec<String>,
    /// 排除模式
    pub exclude_config_locations: Vec<String>,
    /// 任一子作用域失败时是否中止整个转换
    pub strict_error_handling: bool,
    /// 自定义子作用域构建器名称（父作用域中的 Bean 名称）
    pub child_scope_builder: Option<String>,
    /// 完全跳过的已解析位置
    pub ignored_locations: BTreeSet<String>,
    /// 就绪后为所有未被查找的导出服务补充导入声明
    pub autowire_exports: bool,
}

impl NestedScopesOptions {
    /// 配置节路径
    pub const SECTION: &'static str = "nested_scopes";

    /// 创建空配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加位置模式
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.config_locations.push(location.into());
        self
    }

    /// 追加排除模式
    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_config_locations.push(pattern.into());
        self
    }

    /// 设置严格模式
    pub fn with_strict_error_handling(mut self, strict: bool) -> Self {
        self.strict_error_handling = strict;
        self
    }

    /// 设置自定义子作用域构建器
    pub fn with_child_scope_builder(mut self, name: impl Into<String>) -> Self {
        self.child_scope_builder = Some(name.into());
        self
    }

    /// 追加忽略位置
    pub fn with_ignored_location(mut self, location: impl Into<String>) -> Self {
        self.ignored_locations.insert(location.into());
        self
    }

    /// 设置是否自动补充导出服务的导入声明
    pub fn with_autowire_exports(mut self, enabled: bool) -> Self {
        self.autowire_exports = enabled;
        self
    }

    /// 自定义构建器名称，空白名称视为未配置
    pub fn child_scope_builder_name(&self) -> Option<&str> {
        self.child_scope_builder
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// 验证配置
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (index, location) in self.config_locations.iter().enumerate() {
            if location.trim().is_empty() {
                errors.push(ValidationError::invalid_field_value(
                    format!("config_locations[{}]", index),
                    location,
                    "位置不能为空",
                ));
            }
        }

        for (index, pattern) in self.exclude_config_locations.iter().enumerate() {
            if pattern.trim().is_empty() {
                errors.push(ValidationError::invalid_field_value(
                    format!("exclude_config_locations[{}]", index),
                    pattern,
                    "排除模式不能为空",
                ));
            }
        }

        if self.config_locations.is_empty() {
            errors.push(ValidationError::new("未配置任何子作用域位置"));
        }

        errors
    }
}
