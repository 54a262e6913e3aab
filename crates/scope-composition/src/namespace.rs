//! 资源命名空间实现
//!
//! - [`FileSystemResourceNamespace`] - 基于文件系统的 glob 展开，位置以 `file://` URL 表示
//! - [`InMemoryResourceNamespace`] - 内存中的资源集合，按插入顺序展开

use async_trait::async_trait;
use parking_lot::RwLock;
use scopenest_abstractions::ResourceNamespace;
use scopenest_common::{ConfigLocation, ResolutionError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// 文件系统资源命名空间
///
/// 相对位置以 `base_dir` 为基准。通配模式的结果按路径排序；精确地址不检查是否存在。
#[derive(Debug, Clone)]
pub struct FileSystemResourceNamespace {
    base_dir: PathBuf,
}

impl FileSystemResourceNamespace {
    /// 创建命名空间
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// 基准目录
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn to_path(&self, location: &str) -> Result<PathBuf, ResolutionError> {
        let path = if location.starts_with("file:") && !self.is_pattern(location) {
            let url = Url::parse(location).map_err(|e| ResolutionError::InvalidPattern {
                pattern: location.to_string(),
                message: e.to_string(),
            })?;
            url.to_file_path().map_err(|()| ResolutionError::InvalidPattern {
                pattern: location.to_string(),
                message: "不是文件系统位置".to_string(),
            })?
        } else if let Some(rest) = location.strip_prefix("file://") {
            PathBuf::from(rest)
        } else if let Some(rest) = location.strip_prefix("file:") {
            PathBuf::from(rest)
        } else {
            self.base_dir.join(location)
        };

        if path.is_absolute() {
            return Ok(path);
        }

        std::env::current_dir()
            .map(|dir| dir.join(path))
            .map_err(|e| ResolutionError::expansion_failed(location, e))
    }

    fn to_location(path: &Path) -> Result<ConfigLocation, ResolutionError> {
        Url::from_file_path(path)
            .map(|url| ConfigLocation::new(url.to_string()))
            .map_err(|()| ResolutionError::InvalidPattern {
                pattern: path.display().to_string(),
                message: "无法转换为 file:// URL".to_string(),
            })
    }

    fn to_read_path(location: &ConfigLocation) -> Result<PathBuf, ResolutionError> {
        let read_failed = |message: String| ResolutionError::ResourceReadFailed {
            location: location.to_string(),
            source: message.into(),
        };

        let url = Url::parse(location.as_str()).map_err(|e| read_failed(e.to_string()))?;
        url.to_file_path()
            .map_err(|()| read_failed("不是文件系统位置".to_string()))
    }
}

#[async_trait]
impl ResourceNamespace for FileSystemResourceNamespace {
    async fn expand(&self, pattern: &str) -> Result<Vec<ConfigLocation>, ResolutionError> {
        let path = self.to_path(pattern)?;

        if !self.is_pattern(pattern) {
            return Ok(vec![Self::to_location(&path)?]);
        }

        let glob_pattern = path.to_str().ok_or_else(|| ResolutionError::InvalidPattern {
            pattern: pattern.to_string(),
            message: "路径不是有效的 UTF-8".to_string(),
        })?;

        let entries = glob::glob(glob_pattern).map_err(|e| ResolutionError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ResolutionError::expansion_failed(pattern, e))?;
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        debug!("文件系统展开: {} -> {} 个文件", pattern, paths.len());
        paths.iter().map(|path| Self::to_location(path)).collect()
    }

    async fn read(&self, location: &ConfigLocation) -> Result<String, ResolutionError> {
        let path = Self::to_read_path(location)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ResolutionError::ResourceReadFailed {
                location: location.to_string(),
                source: Box::new(e),
            })
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}

/// 内存资源命名空间
///
/// 通配模式按 [`glob::Pattern`] 匹配已登记的位置，结果保持登记顺序；
/// 可以为指定模式注入展开失败。
#[derive(Debug, Default)]
pub struct InMemoryResourceNamespace {
    name: String,
    resources: RwLock<Vec<(ConfigLocation, String)>>,
    failures: RwLock<HashMap<String, String>>,
}

impl InMemoryResourceNamespace {
    /// 创建空命名空间
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 登记资源（构建者风格）
    pub fn with_resource(self, location: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(location, content);
        self
    }

    /// 登记或替换资源，替换时保留原位置
    pub fn insert(&self, location: impl Into<String>, content: impl Into<String>) {
        let location = ConfigLocation::new(location);
        let content = content.into();
        let mut resources = self.resources.write();
        match resources.iter_mut().find(|(existing, _)| existing == &location) {
            Some((_, existing)) => *existing = content,
            None => resources.push((location, content)),
        }
    }

    /// 让指定模式的展开失败
    pub fn fail_expansion(&self, pattern: impl Into<String>, message: impl Into<String>) {
        self.failures.write().insert(pattern.into(), message.into());
    }

    /// 已登记的位置
    pub fn locations(&self) -> Vec<ConfigLocation> {
        self.resources
            .read()
            .iter()
            .map(|(location, _)| location.clone())
            .collect()
    }
}

#[async_trait]
impl ResourceNamespace for InMemoryResourceNamespace {
    async fn expand(&self, pattern: &str) -> Result<Vec<ConfigLocation>, ResolutionError> {
        if let Some(message) = self.failures.read().get(pattern) {
            return Err(ResolutionError::expansion_failed(pattern, message.clone()));
        }

        if !self.is_pattern(pattern) {
            return Ok(vec![ConfigLocation::new(pattern)]);
        }

        let matcher = glob::Pattern::new(pattern).map_err(|e| ResolutionError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(self
            .resources
            .read()
            .iter()
            .filter(|(location, _)| matcher.matches(location.as_str()))
            .map(|(location, _)| location.clone())
            .collect())
    }

    async fn read(&self, location: &ConfigLocation) -> Result<String, ResolutionError> {
        self.resources
            .read()
            .iter()
            .find(|(existing, _)| existing == location)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| ResolutionError::ResourceReadFailed {
                location: location.to_string(),
                source: "资源不存在".into(),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_module(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), format!("module = \"{}\"", name)).unwrap();
    }

    #[tokio::test]
    async fn test_filesystem_expand_sorted_file_urls() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "b.toml");
        write_module(&dir, "a.toml");
        write_module(&dir, "notes.txt");
        std::fs::create_dir(dir.path().join("nested.toml")).unwrap();

        let namespace = FileSystemResourceNamespace::new(dir.path());
        let locations = namespace.expand("*.toml").await.unwrap();

        assert_eq!(locations.len(), 2);
        assert!(locations[0].as_str().starts_with("file://"));
        assert!(locations[0].as_str().ends_with("/a.toml"));
        assert!(locations[1].as_str().ends_with("/b.toml"));
    }

    #[tokio::test]
    async fn test_filesystem_exact_location_is_not_checked() {
        let dir = TempDir::new().unwrap();
        let namespace = FileSystemResourceNamespace::new(dir.path());

        let locations = namespace.expand("missing.toml").await.unwrap();
        assert_eq!(locations.len(), 1);
        assert!(locations[0].as_str().ends_with("/missing.toml"));

        let result = namespace.read(&locations[0]).await;
        assert!(matches!(result, Err(ResolutionError::ResourceReadFailed { .. })));
    }

    #[tokio::test]
    async fn test_filesystem_read_round_trips_expanded_location() {
        let dir = TempDir::new().unwrap();
        write_module(&dir, "billing.toml");
        let namespace = FileSystemResourceNamespace::new(dir.path());

        let locations = namespace.expand("*.toml").await.unwrap();
        let content = namespace.read(&locations[0]).await.unwrap();
        assert_eq!(content, "module = \"billing.toml\"");

        let again = namespace.expand(locations[0].as_str()).await.unwrap();
        assert_eq!(again, locations);
    }

    #[tokio::test]
    async fn test_in_memory_expand_keeps_insertion_order() {
        let namespace = InMemoryResourceNamespace::new("mem")
            .with_resource("mem:z.toml", "")
            .with_resource("mem:a.toml", "")
            .with_resource("mem:a.json", "");

        let locations = namespace.expand("mem:*.toml").await.unwrap();
        let names: Vec<&str> = locations.iter().map(ConfigLocation::as_str).collect();
        assert_eq!(names, vec!["mem:z.toml", "mem:a.toml"]);
    }

    #[tokio::test]
    async fn test_in_memory_injected_failure() {
        let namespace = InMemoryResourceNamespace::new("mem");
        namespace.fail_expansion("mem:*", "不可用");

        assert!(matches!(
            namespace.expand("mem:*").await,
            Err(ResolutionError::ExpansionFailed { .. })
        ));
        assert!(namespace.read(&ConfigLocation::new("mem:x")).await.is_err());
    }
}
