//! Metric 支持
//!
//! 提供全局的 Prometheus Registry，TimedAdvice 默认把指标注册到这里

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::sync::{Arc, RwLock};

/// 全局 Prometheus Registry
static GLOBAL_REGISTRY: Lazy<Arc<RwLock<Registry>>> =
    Lazy::new(|| Arc::new(RwLock::new(Registry::default())));

/// 获取全局 Registry
pub fn global_registry() -> Arc<RwLock<Registry>> {
    Arc::clone(&GLOBAL_REGISTRY)
}

/// 以 Prometheus 文本格式导出 Registry
pub fn encode_registry(registry: &Registry) -> Result<String> {
    let mut buffer = String::new();
    encode(&mut buffer, registry)?;
    Ok(buffer)
}

/// 以 Prometheus 文本格式导出全局 Registry
pub fn encode_global_registry() -> Result<String> {
    let registry = GLOBAL_REGISTRY
        .read()
        .map_err(|_| anyhow!("Failed to acquire read lock"))?;
    encode_registry(&registry)
}
