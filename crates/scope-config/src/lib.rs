//! # scopenest Configuration
//!
//! 嵌套作用域的启动配置面与模块清单格式。
//!
//! ## 主要组件
//!
//! - [`NestedScopesOptions`] - 启动配置（位置模式、排除模式、严格模式等）
//! - [`OptionsBinder`] - 基于 `config` crate 的分层配置绑定（文件 + 环境变量）
//! - [`PlaceholderResolver`] - `${NAME:default}` 占位符展开
//! - [`ModuleManifest`] - 子作用域模块清单

pub mod binder;
pub mod manifest;
pub mod options;
pub mod placeholder;

pub use binder::*;
pub use manifest::*;
pub use options::*;
pub use placeholder::*;
