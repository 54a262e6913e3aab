//! 子作用域模块清单
//!
//! 每个已解析资源就是一份模块清单，它是子作用域唯一的配置来源。

use scopenest_common::{ScopeError, ValidationError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// 清单格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
    Yaml,
}

impl ManifestFormat {
    /// 根据位置后缀推断格式，默认 TOML
    pub fn from_location(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Self::Json
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Self::Yaml
        } else {
            Self::Toml
        }
    }
}

/// 导出声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    /// 服务名称
    pub service: String,
    /// 声明的能力标识
    pub capability: String,
    /// 子作用域内提供服务的 Bean 名称
    pub bean: String,
    /// 是否允许后续重新绑定
    #[serde(default)]
    pub rebindable: bool,
}

/// 导入声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportManifest {
    /// 服务名称
    pub service: String,
    /// 请求的能力标识
    pub capability: String,
}

/// 模块清单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// 模块初始化器名称
    pub module: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 传给模块初始化器的属性
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub exports: Vec<ExportManifest>,
    #[serde(default)]
    pub imports: Vec<ImportManifest>,
}

impl ModuleManifest {
    /// 解析清单内容
    pub fn parse(location: &str, content: &str) -> Result<Self, ScopeError> {
        let format = ManifestFormat::from_location(location);
        debug!("解析模块清单: {} ({:?})", location, format);

        let invalid = |message: String| ScopeError::ManifestInvalid {
            location: location.to_string(),
            message,
        };

        let manifest: Self = match format {
            ManifestFormat::Toml => toml::from_str(content).map_err(|e| invalid(e.to_string()))?,
            ManifestFormat::Json => {
                serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?
            }
            ManifestFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?
            }
        };

        let errors = manifest.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(invalid(messages.join(", ")));
        }

        Ok(manifest)
    }

    /// 验证清单
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.module.trim().is_empty() {
            errors.push(ValidationError::invalid_field_value(
                "module",
                &self.module,
                "模块名称不能为空",
            ));
        }

        for (index, export) in self.exports.iter().enumerate() {
            if export.service.trim().is_empty() || export.bean.trim().is_empty() {
                errors.push(ValidationError::invalid_field_value(
                    format!("exports[{}]", index),
                    &export.service,
                    "服务名称和 Bean 名称不能为空",
                ));
            }
        }

        for (index, import) in self.imports.iter().enumerate() {
            if import.service.trim().is_empty() {
                errors.push(ValidationError::invalid_field_value(
                    format!("imports[{}]", index),
                    &import.service,
                    "服务名称不能为空",
                ));
            }
        }

        errors
    }

    /// 读取类型化属性
    pub fn property<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}
