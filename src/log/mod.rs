//! 日志模块
//!
//! LoggingAdvice 使用的结构化日志器，也可以单独使用。
//!
//! # 特性
//!
//! - 日志级别：Trace, Debug, Info, Warn, Error
//! - 格式化器：TextFormatter、JsonFormatter
//! - 输出目标：ConsoleAppender、FileAppender、ChannelAppender（后台线程异步投递）
//! - MDC：保存在 Scope 中的诊断字段，随调用链传递
//! - 基于 TypeOptions 配置的动态创建
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use aspectx::log::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config: LoggerConfig = json5::from_str(r#"
//!         {
//!             level: "info",
//!             formatter: { type: "TextFormatter", options: { colored: false } },
//!             appender: { type: "ConsoleAppender", options: { target: "stdout" } }
//!         }
//!     "#)?;
//!
//!     // 组件会自动注册
//!     let logger = Logger::new(config)?;
//!
//!     logger.info("Application started")?;
//!     logger.error("Connection failed")?;
//!     logger.close()?;
//!
//!     Ok(())
//! }
//! ```

pub mod appender;
pub mod formatter;
pub mod log_record;
pub mod logger;
pub mod mdc;

use std::sync::Once;

pub use appender::{
    register_appenders, ChannelAppender, ChannelAppenderConfig, ConsoleAppender,
    ConsoleAppenderConfig, FileAppender, FileAppenderConfig, LogAppender, Target,
};
pub use formatter::{
    register_formatters, JsonFormatter, JsonFormatterConfig, LogFormatter, TextFormatter,
    TextFormatterConfig,
};
pub use log_record::{LogLevel, LogRecord, MetadataValue};
pub use logger::{Logger, LoggerConfig};
pub use mdc::{add_mdc, add_mdc_value, mdc, Mdc};

static REGISTER_ONCE: Once = Once::new();

/// 注册所有日志组件（只执行一次）
pub(crate) fn ensure_registered() {
    REGISTER_ONCE.call_once(|| {
        if let Err(e) = register_formatters().and_then(|_| register_appenders()) {
            tracing::error!(error = %e, "failed to register log components");
        }
    });
}
