//! 位置占位符展开
//!
//! 支持 `${NAME}` 与 `${NAME:default}` 两种形式，值默认取自进程环境变量。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scopenest_common::{ResolutionError, ResolutionResult};
use std::collections::HashMap;

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("占位符正则表达式无效")
});

/// 占位符值来源
#[derive(Debug, Clone, Default)]
pub enum PlaceholderSource {
    /// 进程环境变量
    #[default]
    Environment,
    /// 固定的键值表
    Static(HashMap<String, String>),
}

/// 占位符展开器
#[derive(Debug, Clone, Default)]
pub struct PlaceholderResolver {
    source: PlaceholderSource,
}

impl PlaceholderResolver {
    /// 使用环境变量作为值来源
    pub fn from_env() -> Self {
        Self {
            source: PlaceholderSource::Environment,
        }
    }

    /// 使用固定键值表作为值来源
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self {
            source: PlaceholderSource::Static(values),
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match &self.source {
            PlaceholderSource::Environment => std::env::var(name).ok(),
            PlaceholderSource::Static(values) => values.get(name).cloned(),
        }
    }

    /// 展开占位符并去除首尾空白
    pub fn resolve(&self, location: &str) -> ResolutionResult<String> {
        let mut missing = None;

        let resolved = PLACEHOLDER_PATTERN.replace_all(location, |caps: &Captures<'_>| {
            let name = caps[1].trim();
            match (self.lookup(name), caps.get(2)) {
                (Some(value), _) => value,
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        if let Some(placeholder) = missing {
            return Err(ResolutionError::UnresolvedPlaceholder {
                placeholder,
                location: location.to_string(),
            });
        }

        Ok(resolved.trim().to_string())
    }
}
