//! tracing_subscriber 初始化
//!
//! SpanAdvice 产生的 span 和引擎自身的诊断日志都走 `tracing`，
//! 这里提供一个按配置安装 fmt subscriber 的入口

use anyhow::Result;
use garde::Validate;
use serde::Deserialize;
use smart_default::SmartDefault;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

use crate::log::LogLevel;

/// Tracing 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, Validate, PartialEq)]
#[serde(default)]
pub struct TracingConfig {
    /// 日志级别: "trace", "debug", "info", "warn", "error"，不区分大小写
    #[default(LogLevel::Info)]
    #[garde(skip)]
    pub log_level: LogLevel,

    /// 是否输出 target
    #[default = true]
    #[garde(skip)]
    pub with_target: bool,

    /// span 关闭时是否输出一条事件（包含耗时）
    #[default = true]
    #[garde(skip)]
    pub with_span_close: bool,

    /// 是否使用 ANSI 颜色
    #[default = false]
    #[garde(skip)]
    pub ansi: bool,
}

impl TracingConfig {
    /// 获取日志级别对应的 Level
    pub fn level(&self) -> Level {
        match self.log_level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// 保证 init_tracing 只生效一次
static INIT_ONCE: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// 安装全局 tracing_subscriber
///
/// 多次调用只会初始化一次，后续调用返回第一次初始化的结果
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    INIT_ONCE
        .get_or_init(|| init_tracing_inner(config).map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| anyhow::anyhow!(e))
}

fn init_tracing_inner(config: &TracingConfig) -> Result<()> {
    config.validate()?;

    let span_events = if config.with_span_close {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.with_target)
        .with_level(true)
        .with_ansi(config.ansi)
        .with_span_events(span_events)
        .with_filter(LevelFilter::from_level(config.level()));

    tracing_subscriber::registry().with(fmt_layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.with_target);
        assert!(config.with_span_close);
        assert!(!config.ansi);
        assert_eq!(config.level(), Level::INFO);
    }

    #[test]
    fn test_tracing_config_from_json5() -> Result<()> {
        let config: TracingConfig = json5::from_str(r#"{ log_level: "DEBUG", ansi: true }"#)?;
        assert!(config.validate().is_ok());
        assert_eq!(config.level(), Level::DEBUG);
        assert!(config.ansi);
        Ok(())
    }

    #[test]
    fn test_tracing_config_levels() -> Result<()> {
        for (name, level) in [
            ("trace", Level::TRACE),
            ("Warn", Level::WARN),
            ("ERROR", Level::ERROR),
        ] {
            let config: TracingConfig = json5::from_str(&format!(r#"{{ log_level: "{}" }}"#, name))?;
            assert!(config.validate().is_ok());
            assert_eq!(config.level(), level);
        }
        Ok(())
    }

    #[test]
    fn test_tracing_config_invalid_level() {
        let result = json5::from_str::<TracingConfig>(r#"{ log_level: "verbose" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = TracingConfig::default();
        let first = init_tracing(&config).is_ok();
        let second = init_tracing(&config).is_ok();
        assert_eq!(first, second);
    }
}
