//! 演示模块
//!
//! `greeter` 模块在子作用域中注册问候服务并由清单导出；
//! `report` 模块通过注册表查找问候服务，首次使用时才解析。

use async_trait::async_trait;
use scopenest_abstractions::ScopeContext;
use scopenest_common::{CapabilityDescriptor, ScopeError};
use scopenest_composition::{ModuleContext, ModuleInitializer};
use std::sync::Arc;
use tracing::info;

/// 父作用域中问候前缀的 Bean 名称
pub const PREFIX_BEAN: &str = "greetingPrefix";

/// 问候服务
pub trait Greeter: Send + Sync {
    /// 生成问候语
    fn greet(&self, name: &str) -> String;
}

/// 问候服务的能力描述符
pub fn greeter_capability() -> CapabilityDescriptor {
    CapabilityDescriptor::new("demo.Greeter")
}

/// 报告服务的能力描述符
pub fn report_capability() -> CapabilityDescriptor {
    CapabilityDescriptor::new("demo.Report")
}

struct PrefixGreeter {
    prefix: String,
}

impl Greeter for PrefixGreeter {
    fn greet(&self, name: &str) -> String {
        format!("{}, {}!", self.prefix, name)
    }
}

/// 问候模块
pub struct GreeterModule;

#[async_trait]
impl ModuleInitializer for GreeterModule {
    fn name(&self) -> &str {
        "greeter"
    }

    async fn initialize(&self, context: &ModuleContext) -> Result<(), ScopeError> {
        // 清单属性优先，其次是父作用域中的前缀
        let prefix = match context.property::<String>("prefix") {
            Some(prefix) => prefix,
            None => context
                .scope
                .get::<String>(PREFIX_BEAN)
                .map(|prefix| prefix.as_ref().clone())
                .unwrap_or_else(|_| "Hello".to_string()),
        };

        context.scope.register_factory::<dyn Greeter, _>(
            "greeter",
            greeter_capability(),
            move |_scope| {
                info!("创建问候服务，前缀: {}", prefix);
                let greeter: Arc<dyn Greeter> = Arc::new(PrefixGreeter {
                    prefix: prefix.clone(),
                });
                Ok(greeter)
            },
        )?;

        let scope_name = context.scope.name().to_string();
        context.scope.on_close("greeter", move || {
            info!("问候服务随作用域关闭: {}", scope_name);
            Ok(())
        });
        Ok(())
    }
}

/// 报告模块
pub struct ReportModule;

#[async_trait]
impl ModuleInitializer for ReportModule {
    fn name(&self) -> &str {
        "report"
    }

    async fn initialize(&self, context: &ModuleContext) -> Result<(), ScopeError> {
        let audience: String = context
            .property("audience")
            .unwrap_or_else(|| "world".to_string());
        // 此时问候模块可能尚未加载，句柄在首次使用时才解析
        let greeter = context
            .registry
            .lookup::<dyn Greeter>("greeter", greeter_capability());

        context
            .scope
            .register_factory::<String, _>("report", report_capability(), move |_scope| {
                let greeter = greeter.get()?;
                Ok(Arc::new(greeter.greet(&audience)))
            })
    }
}
