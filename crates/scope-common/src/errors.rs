//! 错误类型定义

use crate::lifecycle::LifecycleState;
use std::sync::Arc;
use thiserror::Error;

/// 通用错误装箱类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError { source: BoxError },

    #[error("配置验证失败: {errors:?}")]
    ValidationFailed { errors: Vec<String> },
}

/// 位置解析错误类型
///
/// 对应资源命名空间展开失败等 I/O 类问题
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("位置展开失败: {pattern}, 原因: {source}")]
    ExpansionFailed { pattern: String, source: BoxError },

    #[error("位置模式无效: {pattern}, 原因: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("无法解析占位符: ${{{placeholder}}} (位置: {location})")]
    UnresolvedPlaceholder { placeholder: String, location: String },

    #[error("资源读取失败: {location}, 原因: {source}")]
    ResourceReadFailed { location: String, source: BoxError },
}

impl ResolutionError {
    /// 创建展开失败错误
    pub fn expansion_failed(
        pattern: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ExpansionFailed {
            pattern: pattern.into(),
            source: source.into(),
        }
    }
}

/// 作用域（对象图）错误类型
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Bean 不存在: {name} (作用域: {scope})")]
    BeanNotFound { name: String, scope: String },

    #[error("Bean 创建失败: {name}, 原因: {source}")]
    BeanCreationFailed { name: String, source: BoxError },

    #[error("Bean 类型不匹配: {name}, 期望 {expected}, 实际 {actual}")]
    BeanTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Bean 已存在: {name} (作用域: {scope})")]
    BeanAlreadyRegistered { name: String, scope: String },

    #[error("作用域已关闭: {scope}")]
    ScopeClosed { scope: String },

    #[error("资源加载失败: {location}, 原因: {source}")]
    ResourceLoadFailed {
        location: String,
        #[source]
        source: ResolutionError,
    },

    #[error("模块清单无效: {location}, 原因: {message}")]
    ManifestInvalid { location: String, message: String },

    #[error("模块初始化器未注册: {module}")]
    ModuleNotFound { module: String },

    #[error("子作用域构建失败: {location}, 原因: {message}")]
    BuilderFailed { location: String, message: String },

    #[error("作用域关闭失败: {scope}, 原因: {message}")]
    CloseFailed { scope: String, message: String },
}

/// 服务注册表错误类型
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("找不到服务导出声明: lookup({service}, {capability})")]
    NotFound { service: String, capability: String },

    #[error("服务类型不匹配: {service}, 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        service: String,
        expected: String,
        actual: String,
    },

    #[error("服务实例获取失败: {service}, 原因: {source}")]
    ProviderFailed {
        service: String,
        #[source]
        source: ScopeError,
    },
}

/// 嵌套作用域失败原因
///
/// 保存在失败记录中，可被多处共享读取
#[derive(Error, Debug, Clone)]
pub enum NestedFailureCause {
    #[error(transparent)]
    Build(Arc<ScopeError>),

    #[error(transparent)]
    Expansion(Arc<ResolutionError>),
}

/// 单个子作用域关闭失败
#[derive(Debug)]
pub struct TeardownFailure {
    /// 子作用域名称
    pub scope: String,
    /// 关闭错误
    pub error: ScopeError,
}

/// 生命周期管理错误类型
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("非法的生命周期转换: {operation} (当前状态: {state})")]
    InvalidTransition {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("配置位置解析失败: {source}")]
    Resolution {
        #[from]
        source: ResolutionError,
    },

    #[error("嵌套作用域处理失败: {location}, 原因: {cause}")]
    NestedScopeFailed {
        location: String,
        #[source]
        cause: NestedFailureCause,
    },

    #[error("子作用域关闭失败: {} 个", .failures.len())]
    TeardownFailed { failures: Vec<TeardownFailure> },
}

/// 验证错误类型
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("验证失败: {message}")]
    ValidationFailed { message: String },

    #[error("字段值无效: {field_name}, 值: {value}, 原因: {reason}")]
    InvalidFieldValue {
        field_name: String,
        value: String,
        reason: String,
    },
}

impl ValidationError {
    /// 创建新的验证错误
    pub fn new(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// 创建字段值无效错误
    pub fn invalid_field_value(
        field_name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFieldValue {
            field_name: field_name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// 顶层错误类型
#[derive(Error, Debug)]
pub enum NestedScopeError {
    #[error("配置错误: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("解析错误: {source}")]
    Resolution {
        #[from]
        source: ResolutionError,
    },

    #[error("作用域错误: {source}")]
    Scope {
        #[from]
        source: ScopeError,
    },

    #[error("注册表错误: {source}")]
    Registry {
        #[from]
        source: RegistryError,
    },

    #[error("生命周期错误: {source}")]
    Lifecycle {
        #[from]
        source: LifecycleError,
    },

    #[error("启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ResolutionResult<T> = Result<T, ResolutionError>;
pub type ScopeResult<T> = Result<T, ScopeError>;
pub type RegistryResult<T> = Result<T, RegistryError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
