//! 能力目录
//!
//! 模块清单只能以字符串引用能力，目录负责把能力标识还原为带继承关系的描述符。

use parking_lot::RwLock;
use scopenest_common::CapabilityDescriptor;
use std::collections::HashMap;
use tracing::debug;

/// 能力目录
#[derive(Debug, Default)]
pub struct CapabilityCatalog {
    descriptors: RwLock<HashMap<String, CapabilityDescriptor>>,
}

impl CapabilityCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册能力描述符，同名描述符会被覆盖
    pub fn register(&self, descriptor: CapabilityDescriptor) {
        debug!("注册能力: {}", descriptor);
        self.descriptors
            .write()
            .insert(descriptor.id().to_string(), descriptor);
    }

    /// 按标识解析描述符，未注册的标识视为不继承任何能力
    pub fn resolve(&self, id: &str) -> CapabilityDescriptor {
        self.descriptors
            .read()
            .get(id)
            .cloned()
            .unwrap_or_else(|| CapabilityDescriptor::new(id))
    }

    /// 标识是否已注册
    pub fn contains(&self, id: &str) -> bool {
        self.descriptors.read().contains_key(id)
    }

    /// 已注册的能力数量
    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    /// 目录是否为空
    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }
}
