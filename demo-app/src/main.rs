//! scopenest 演示程序
//!
//! 从模块清单目录构建嵌套子作用域，展示跨作用域的导出与延迟查找，
//! 最后按逆序销毁所有子作用域。

mod modules;

use anyhow::{Context, Result};
use clap::Parser;
use modules::{greeter_capability, Greeter, GreeterModule, ReportModule, PREFIX_BEAN};
use scopenest_abstractions::ScopeContext;
use scopenest_common::CapabilityDescriptor;
use scopenest_composition::{
    FileSystemResourceNamespace, LoggingConfig, NestedScopesBuilder, ScopeLifecycleManager,
};
use scopenest_config::{NestedScopesOptions, OptionsBinder};
use scopenest_registry::ObjectScope;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "scopenest-demo")]
#[command(about = "从模块清单构建嵌套作用域的演示程序")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 模块清单目录
    #[arg(short, long, default_value = "demo-app/modules")]
    modules: PathBuf,

    /// 启用严格错误处理
    #[arg(long)]
    strict: bool,

    /// 使用 JSON 格式日志
    #[arg(long)]
    json_logs: bool,

    /// 问候对象
    #[arg(long, default_value = "scopenest")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = if args.json_logs {
        LoggingConfig::production()
    } else {
        LoggingConfig::development()
    }
    .with_env_directives();

    let mut options = load_options(&args)?;
    if args.strict {
        options.strict_error_handling = true;
    }

    let root = ObjectScope::root("demo");
    root.register_instance(
        PREFIX_BEAN,
        CapabilityDescriptor::of::<String>(),
        Arc::new("Hello".to_string()),
    )?;

    let manager = NestedScopesBuilder::new()
        .with_options(options)
        .with_logging(logging)
        .with_parent(root)
        .with_namespace(Arc::new(FileSystemResourceNamespace::new(&args.modules)))
        .with_capability(greeter_capability())
        .with_module(Arc::new(GreeterModule))
        .with_module(Arc::new(ReportModule))
        .build()
        .context("构建嵌套作用域失败")?;

    info!("启动 scopenest 演示程序，模块目录: {}", args.modules.display());

    manager.finalize_config().await?;
    manager.on_parent_ready().await?;

    report(&manager);
    demonstrate_lookup(&manager, &args.name);

    manager.destroy().await?;
    info!("演示程序结束");
    Ok(())
}

/// 加载启动配置，未指定配置文件时加载目录下除已停用模块外的全部清单
fn load_options(args: &Args) -> Result<NestedScopesOptions> {
    match &args.config {
        Some(path) => OptionsBinder::new()
            .add_file(path)
            .load_options()
            .with_context(|| format!("加载配置文件失败: {}", path.display())),
        None => Ok(NestedScopesOptions::new()
            .with_location("*.toml")
            .with_exclude("*disabled*")),
    }
}

/// 输出子作用域与失败记录
fn report(manager: &ScopeLifecycleManager) {
    info!("当前状态: {}", manager.state());

    for child in manager.children() {
        info!("子作用域: {}", child.name());
    }

    for (location, cause) in manager.nested_failures().iter() {
        warn!("加载失败: {}: {}", location, cause);
    }

    if let Some(registry) = manager.registry() {
        let exports: Vec<String> = registry
            .exported_services()
            .iter()
            .map(ToString::to_string)
            .collect();
        info!("已导出服务: {:?}", exports);
    }
}

/// 演示跨作用域查找
fn demonstrate_lookup(manager: &ScopeLifecycleManager, name: &str) {
    let Some(registry) = manager.registry() else {
        return;
    };

    let greeter = registry.lookup::<dyn Greeter>("greeter", greeter_capability());
    match greeter.get() {
        Ok(greeter) => info!("查找问候服务成功: {}", greeter.greet(name)),
        Err(e) => error!("查找问候服务失败: {}", e),
    }

    for child in manager.children() {
        match child.get_bean("report") {
            Ok(report) => {
                if let Some(text) = report.downcast::<String>() {
                    info!("报告 ({}): {}", child.name(), text);
                }
            }
            Err(_) => continue,
        }
    }
}
