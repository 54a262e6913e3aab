//! 分层配置绑定器
//!
//! 文件配置源在前，环境变量覆盖在后。

use crate::options::NestedScopesOptions;
use scopenest_common::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "SCOPENEST";

/// 环境变量层级分隔符
pub const ENV_SEPARATOR: &str = "__";

/// 分层配置绑定器
#[derive(Debug, Clone)]
pub struct OptionsBinder {
    /// 配置文件列表（按顺序叠加）
    files: Vec<(PathBuf, bool)>,
    /// 环境变量前缀，为空时不读取环境变量
    env_prefix: Option<String>,
}

impl OptionsBinder {
    /// 创建新的绑定器，默认读取 `SCOPENEST__` 前缀的环境变量
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }

    /// 添加必需的配置文件
    pub fn add_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// 添加可选的配置文件
    pub fn add_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// 设置环境变量前缀
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// 不读取环境变量
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// 构建 `config` crate 的配置对象
    fn build(&self) -> ConfigResult<config::Config> {
        let mut builder = config::Config::builder();

        for (path, required) in &self.files {
            if *required && !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("添加配置文件: {} (必需: {})", path.display(), required);
            builder = builder.add_source(config::File::from(path.as_path()).required(*required));
        }

        if let Some(prefix) = &self.env_prefix {
            debug!("添加环境变量配置源，前缀: {}", prefix);
            let section = NestedScopesOptions::SECTION;
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .list_separator(",")
                    .with_list_parse_key(&format!("{}.config_locations", section))
                    .with_list_parse_key(&format!("{}.exclude_config_locations", section))
                    .with_list_parse_key(&format!("{}.ignored_locations", section))
                    .try_parsing(true),
            );
        }

        builder.build().map_err(|e| {
            error!("配置构建失败: {}", e);
            ConfigError::ParseError {
                source: Box::new(e),
            }
        })
    }

    /// 绑定指定配置节，配置节不存在时返回默认值
    pub fn bind<T>(&self, section: &str) -> ConfigResult<T>
    where
        T: DeserializeOwned + Default,
    {
        debug!("绑定配置到类型: {} -> {}", section, std::any::type_name::<T>());
        let settings = self.build()?;

        match settings.get::<T>(section) {
            Ok(value) => {
                debug!("配置绑定成功: {}", section);
                Ok(value)
            }
            Err(config::ConfigError::NotFound(_)) => {
                warn!("配置节不存在，使用默认值: {}", section);
                Ok(T::default())
            }
            Err(e) => {
                error!("配置绑定失败: section={}, error={}", section, e);
                Err(ConfigError::ParseError {
                    source: Box::new(e),
                })
            }
        }
    }

    /// 加载并验证嵌套作用域配置
    pub fn load_options(&self) -> ConfigResult<NestedScopesOptions> {
        let options: NestedScopesOptions = self.bind(NestedScopesOptions::SECTION)?;

        let errors = options.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            error!("嵌套作用域配置验证失败: {}", messages.join(", "));
            return Err(ConfigError::ValidationFailed { errors: messages });
        }

        info!(
            "嵌套作用域配置加载完成: {} 个位置, {} 个排除模式, 严格模式: {}",
            options.config_locations.len(),
            options.exclude_config_locations.len(),
            options.strict_error_handling
        );
        Ok(options)
    }
}

impl Default for OptionsBinder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_options_from_toml() {
        let file = write_temp(
            ".toml",
            r#"
[nested_scopes]
config_locations = ["modules/*.toml", "modules/core.toml"]
exclude_config_locations = ["modules/legacy-*.toml"]
strict_error_handling = true
child_scope_builder = "auditedBuilder"
ignored_locations = ["file:///opt/modules/broken.toml"]
"#,
        );

        let options = OptionsBinder::new()
            .without_env()
            .add_file(file.path())
            .load_options()
            .unwrap();

        assert_eq!(
            options.config_locations,
            vec!["modules/*.toml", "modules/core.toml"]
        );
        assert_eq!(options.exclude_config_locations, vec!["modules/legacy-*.toml"]);
        assert!(options.strict_error_handling);
        assert_eq!(options.child_scope_builder_name(), Some("auditedBuilder"));
        assert!(options.ignored_locations.contains("file:///opt/modules/broken.toml"));
    }

    #[test]
    fn test_load_options_from_json() {
        let file = write_temp(
            ".json",
            r#"{"nested_scopes": {"config_locations": ["a.toml"], "autowire_exports": true}}"#,
        );

        let options = OptionsBinder::new()
            .without_env()
            .add_file(file.path())
            .load_options()
            .unwrap();

        assert_eq!(options.config_locations, vec!["a.toml"]);
        assert!(options.autowire_exports);
        assert!(!options.strict_error_handling);
    }

    #[test]
    fn test_missing_required_file() {
        let result = OptionsBinder::new()
            .without_env()
            .add_file("/definitely/not/here/nested.toml")
            .load_options();

        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_missing_section_falls_back_to_default() {
        let file = write_temp(".toml", "[other]\nvalue = 1\n");

        let options: NestedScopesOptions = OptionsBinder::new()
            .without_env()
            .add_file(file.path())
            .bind(NestedScopesOptions::SECTION)
            .unwrap();

        assert_eq!(options, NestedScopesOptions::default());
    }

    #[test]
    fn test_empty_options_fail_validation() {
        let file = write_temp(".toml", "[nested_scopes]\nstrict_error_handling = true\n");

        let result = OptionsBinder::new()
            .without_env()
            .add_file(file.path())
            .load_options();

        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_temp(
            ".toml",
            "[nested_scopes]\nconfig_locations = [\"a.toml\"]\nstrict_error_handling = false\n",
        );

        std::env::set_var("SCOPENESTTEST__NESTED_SCOPES__STRICT_ERROR_HANDLING", "true");
        std::env::set_var(
            "SCOPENESTTEST__NESTED_SCOPES__CONFIG_LOCATIONS",
            "b.toml,c.toml",
        );

        let options = OptionsBinder::new()
            .with_env_prefix("SCOPENESTTEST")
            .add_file(file.path())
            .load_options()
            .unwrap();

        std::env::remove_var("SCOPENESTTEST__NESTED_SCOPES__STRICT_ERROR_HANDLING");
        std::env::remove_var("SCOPENESTTEST__NESTED_SCOPES__CONFIG_LOCATIONS");

        assert!(options.strict_error_handling);
        assert_eq!(options.config_locations, vec!["b.toml", "c.toml"]);
    }
}
