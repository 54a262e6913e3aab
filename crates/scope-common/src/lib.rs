//! # scopenest Common
//!
//! 嵌套作用域体系的公共词汇与错误分类。
//!
//! ## 核心类型
//!
//! - [`ConfigLocation`] - 配置位置（资源标识）
//! - [`ServiceName`] - 跨作用域服务名称
//! - [`CapabilityDescriptor`] - 能力描述符，替代运行时类型检查
//! - [`ServiceInstance`] - 类型擦除的服务实例
//! - [`LifecycleState`] - 嵌套作用域管理器状态

pub mod capability;
pub mod errors;
pub mod instance;
pub mod lifecycle;
pub mod location;

pub use capability::*;
pub use errors::*;
pub use instance::*;
pub use lifecycle::*;
pub use location::*;
