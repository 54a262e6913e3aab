//! 配置位置解析
//!
//! 把原始位置模式展开为有序、去重的具体位置列表：
//!
//! - 通配模式发现的资源按首次发现顺序追加，已存在的跳过
//! - 精确地址先移除已有的同一资源，再追加到末尾
//! - 最后展开排除模式并移除所有匹配的资源

use scopenest_abstractions::ResourceNamespace;
use scopenest_common::{ConfigLocation, ResolutionError};
use scopenest_config::PlaceholderResolver;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 依赖排序钩子，在排除之后、创建子作用域之前调整位置顺序
pub trait DependencyOrdering: Send + Sync {
    /// 调整顺序，不得引入重复项
    fn order(&self, locations: Vec<ConfigLocation>) -> Vec<ConfigLocation>;

    /// 排序器名称
    fn name(&self) -> &str {
        "identity"
    }
}

/// 保持原顺序
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityOrdering;

impl DependencyOrdering for IdentityOrdering {
    fn order(&self, locations: Vec<ConfigLocation>) -> Vec<ConfigLocation> {
        locations
    }
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct ResolvedLocations {
    /// 最终位置列表
    pub locations: Vec<ConfigLocation>,
    /// 宽松模式下被跳过的原始条目及其错误
    pub skipped: Vec<(String, Arc<ResolutionError>)>,
}

impl ResolvedLocations {
    /// 是否有条目被跳过
    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// 配置位置解析器
pub struct ConfigLocationResolver {
    namespace: Arc<dyn ResourceNamespace>,
    placeholders: PlaceholderResolver,
    ordering: Arc<dyn DependencyOrdering>,
    fail_fast: bool,
}

impl ConfigLocationResolver {
    /// 创建解析器，默认遇到展开失败立即返回
    pub fn new(namespace: Arc<dyn ResourceNamespace>) -> Self {
        Self {
            namespace,
            placeholders: PlaceholderResolver::from_env(),
            ordering: Arc::new(IdentityOrdering),
            fail_fast: true,
        }
    }

    /// 设置占位符展开器
    pub fn with_placeholders(mut self, placeholders: PlaceholderResolver) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// 设置依赖排序钩子
    pub fn with_ordering(mut self, ordering: Arc<dyn DependencyOrdering>) -> Self {
        self.ordering = ordering;
        self
    }

    /// 设置展开失败时是否立即返回
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// 资源命名空间
    pub fn namespace(&self) -> &Arc<dyn ResourceNamespace> {
        &self.namespace
    }

    /// 展开单个位置
    pub async fn expand(
        &self,
        location: &ConfigLocation,
    ) -> Result<Vec<ConfigLocation>, ResolutionError> {
        self.namespace.expand(location.as_str()).await
    }

    /// 解析原始位置与排除模式
    pub async fn resolve(
        &self,
        raw_locations: &[String],
        excludes: &[String],
    ) -> Result<ResolvedLocations, ResolutionError> {
        info!(
            "开始解析配置位置: {} 个位置, {} 个排除模式",
            raw_locations.len(),
            excludes.len()
        );

        let mut result = ResolvedLocations::default();
        let mut working: Vec<ConfigLocation> = Vec::new();

        for entry in raw_locations {
            let Some((pattern, resources)) = self.expand_entry(entry, &mut result).await? else {
                continue;
            };

            if self.namespace.is_pattern(&pattern) {
                for resource in resources {
                    if !working.contains(&resource) {
                        working.push(resource);
                    }
                }
            } else {
                for resource in resources {
                    working.retain(|existing| existing != &resource);
                    working.push(resource);
                }
            }
        }

        for entry in excludes {
            let Some((pattern, excluded)) = self.expand_entry(entry, &mut result).await? else {
                continue;
            };
            let before = working.len();
            working.retain(|location| !excluded.contains(location));
            debug!("排除模式 {} 移除了 {} 个位置", pattern, before - working.len());
        }

        result.locations = self.ordering.order(working);
        info!(
            "配置位置解析完成: {} 个位置 (排序器: {})",
            result.locations.len(),
            self.ordering.name()
        );
        Ok(result)
    }

    /// 展开占位符并交给命名空间展开，空条目返回 `None`
    async fn expand_entry(
        &self,
        entry: &str,
        result: &mut ResolvedLocations,
    ) -> Result<Option<(String, Vec<ConfigLocation>)>, ResolutionError> {
        match self.expand_pattern(entry).await {
            Ok(value) => Ok(value),
            Err(error) if !self.fail_fast => {
                warn!("跳过无法展开的位置: {}, 原因: {}", entry, error);
                result.skipped.push((entry.to_string(), Arc::new(error)));
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn expand_pattern(
        &self,
        entry: &str,
    ) -> Result<Option<(String, Vec<ConfigLocation>)>, ResolutionError> {
        let pattern = self.placeholders.resolve(entry)?;
        if pattern.is_empty() {
            return Ok(None);
        }
        let resources = self.namespace.expand(&pattern).await?;
        debug!("展开位置 {} -> {} 个资源", pattern, resources.len());
        Ok(Some((pattern, resources)))
    }
}

impl fmt::Debug for ConfigLocationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLocationResolver")
            .field("namespace", &self.namespace.name())
            .field("ordering", &self.ordering.name())
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::InMemoryResourceNamespace;
    use std::collections::HashMap;

    fn namespace() -> Arc<InMemoryResourceNamespace> {
        Arc::new(
            InMemoryResourceNamespace::new("mem")
                .with_resource("mem:modules/a.toml", "")
                .with_resource("mem:modules/b.toml", "")
                .with_resource("mem:modules/c.toml", "")
                .with_resource("mem:extra/d.toml", ""),
        )
    }

    fn resolver(namespace: Arc<InMemoryResourceNamespace>) -> ConfigLocationResolver {
        ConfigLocationResolver::new(namespace)
            .with_placeholders(PlaceholderResolver::from_map(HashMap::new()))
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn names(locations: &[ConfigLocation]) -> Vec<&str> {
        locations.iter().map(ConfigLocation::as_str).collect()
    }

    #[tokio::test]
    async fn test_exact_location_keeps_last_position() {
        let resolver = resolver(namespace());
        let raw = strings(&["mem:modules/a.toml", "mem:modules/b.toml", "mem:modules/a.toml"]);

        let resolved = resolver.resolve(&raw, &[]).await.unwrap();
        assert_eq!(
            names(&resolved.locations),
            vec!["mem:modules/b.toml", "mem:modules/a.toml"]
        );
    }

    #[tokio::test]
    async fn test_wildcard_keeps_first_discovery_order() {
        let resolver = resolver(namespace());
        let raw = strings(&["mem:modules/b.toml", "mem:modules/*.toml", "mem:*/*.toml"]);

        let resolved = resolver.resolve(&raw, &[]).await.unwrap();
        assert_eq!(
            names(&resolved.locations),
            vec![
                "mem:modules/b.toml",
                "mem:modules/a.toml",
                "mem:modules/c.toml",
                "mem:extra/d.toml",
            ]
        );
    }

    #[tokio::test]
    async fn test_excludes_remove_matches_and_preserve_order() {
        let resolver = resolver(namespace());
        let raw = strings(&["mem:*/*.toml"]);
        let excludes = strings(&["mem:modules/b.toml", "mem:extra/*"]);

        let resolved = resolver.resolve(&raw, &excludes).await.unwrap();
        assert_eq!(
            names(&resolved.locations),
            vec!["mem:modules/a.toml", "mem:modules/c.toml"]
        );
    }

    #[tokio::test]
    async fn test_placeholders_and_blank_entries() {
        let values = HashMap::from([("MODULE_DIR".to_string(), "modules".to_string())]);
        let resolver = ConfigLocationResolver::new(namespace())
            .with_placeholders(PlaceholderResolver::from_map(values));
        let raw = strings(&["  mem:${MODULE_DIR}/c.toml ", "   ", "mem:${OTHER:extra}/d.toml"]);

        let resolved = resolver.resolve(&raw, &[]).await.unwrap();
        assert_eq!(
            names(&resolved.locations),
            vec!["mem:modules/c.toml", "mem:extra/d.toml"]
        );
    }

    #[tokio::test]
    async fn test_expansion_failure_propagates_when_fail_fast() {
        let namespace = namespace();
        namespace.fail_expansion("mem:broken/*", "磁盘不可读");
        let resolver = resolver(namespace);

        let result = resolver
            .resolve(&strings(&["mem:modules/a.toml", "mem:broken/*"]), &[])
            .await;
        assert!(matches!(result, Err(ResolutionError::ExpansionFailed { .. })));
    }

    #[tokio::test]
    async fn test_lenient_resolution_skips_failing_entries() {
        let namespace = namespace();
        namespace.fail_expansion("mem:broken/*", "磁盘不可读");
        let resolver = resolver(namespace).with_fail_fast(false);

        let resolved = resolver
            .resolve(&strings(&["mem:broken/*", "mem:modules/a.toml", "${MISSING}"]), &[])
            .await
            .unwrap();

        assert_eq!(names(&resolved.locations), vec!["mem:modules/a.toml"]);
        let skipped: Vec<&str> = resolved.skipped.iter().map(|(raw, _)| raw.as_str()).collect();
        assert_eq!(skipped, vec!["mem:broken/*", "${MISSING}"]);
        assert!(matches!(
            *resolved.skipped[1].1,
            ResolutionError::UnresolvedPlaceholder { .. }
        ));
    }

    struct ReverseOrdering;

    impl DependencyOrdering for ReverseOrdering {
        fn order(&self, mut locations: Vec<ConfigLocation>) -> Vec<ConfigLocation> {
            locations.reverse();
            locations
        }

        fn name(&self) -> &str {
            "reverse"
        }
    }

    #[tokio::test]
    async fn test_dependency_ordering_runs_after_excludes() {
        let resolver = resolver(namespace()).with_ordering(Arc::new(ReverseOrdering));
        let resolved = resolver
            .resolve(&strings(&["mem:modules/*"]), &strings(&["mem:modules/b.toml"]))
            .await
            .unwrap();

        assert_eq!(
            names(&resolved.locations),
            vec!["mem:modules/c.toml", "mem:modules/a.toml"]
        );
    }
}
