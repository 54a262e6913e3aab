//! # 嵌套作用域组合层
//!
//! 把配置位置解析、子作用域工厂与生命周期管理组合成一个可运行的嵌套作用域体系。
//!
//! ## 主要功能
//!
//! - **配置位置解析**: 有序去重、排除模式、占位符展开
//! - **子作用域工厂**: 自定义构建器与默认构建器回退
//! - **生命周期管理**: 两阶段启动、宽松/严格失败策略、逆序销毁
//! - **模块清单加载**: 清单声明的导出与导入
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use scopenest_composition::{LoggingConfig, NestedScopesBuilder};
//! use scopenest_config::NestedScopesOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = NestedScopesBuilder::new()
//!         .with_options(NestedScopesOptions::new().with_location("modules/*.toml"))
//!         .with_logging(LoggingConfig::development())
//!         .build()?;
//!
//!     manager.finalize_config().await?;
//!     manager.on_parent_ready().await?;
//!
//!     // 宽松模式下需要主动检查失败记录
//!     for (location, cause) in manager.nested_failures().iter() {
//!         eprintln!("{}: {}", location, cause);
//!     }
//!
//!     manager.destroy().await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod child_factory;
pub mod lifecycle;
pub mod module_loader;
pub mod namespace;
pub mod resolver;


// 重新导出主要类型
pub use builder::{LoggingConfig, NestedScopesBuilder};
pub use child_factory::{ChildScopeFactory, DefaultChildScopeBuilder, ScopeLoader};
pub use lifecycle::{NestedFailureRecord, ScopeLifecycleManager};
pub use module_loader::{ManifestScopeLoader, ModuleCatalog, ModuleContext, ModuleInitializer};
pub use namespace::{FileSystemResourceNamespace, InMemoryResourceNamespace};
pub use resolver::{ConfigLocationResolver, DependencyOrdering, IdentityOrdering, ResolvedLocations};

// 重新导出错误类型
pub use scopenest_common::{LifecycleError, NestedScopeError};
