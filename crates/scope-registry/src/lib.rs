//! # scopenest Registry
//!
//! 跨作用域服务的导出/查找协议，以及一个最小的内存对象图实现。
//!
//! 导出方通过 [`ServiceRegistry::export`] 按名称发布服务；消费方通过
//! [`ServiceRegistry::lookup`] 获得 [`ServiceHandle`]，首次调用 [`ServiceHandle::get`]
//! 时才真正解析，解析结果只写入一次，并发调用者看到同一个实例。

pub mod catalog;
pub mod declaration;
pub mod handle;
pub mod registry;
pub mod scope;
pub mod target_source;

pub use catalog::CapabilityCatalog;
pub use declaration::{Declaration, DeclarationKey, DeclarationKind, DeclarationTable};
pub use handle::ServiceHandle;
pub use registry::{ExportOutcome, ServiceRegistry, EXPORT_BEAN_PREFIX};
pub use scope::{BeanFactoryFn, ObjectScope};
pub use target_source::{
    ExportKind, ExportRef, ExportTargetSource, LookupTargetSource, ServiceProvider, TargetSource,
};
