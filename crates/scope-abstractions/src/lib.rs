//! # scopenest Abstractions
//!
//! 嵌套作用域体系依赖的外部协作者接口。
//!
//! ## 核心接口
//!
//! - [`ResourceNamespace`] - 资源命名空间，把位置模式展开为具体资源
//! - [`ScopeContext`] - 作用域（对象图）接口
//! - [`ChildScopeBuilder`] - 子作用域构建器接口

pub mod builder;
pub mod namespace;
pub mod scope;

pub use builder::*;
pub use namespace::*;
pub use scope::*;
