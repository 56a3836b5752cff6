use anyhow::Result;
use garde::Validate;
use serde::Deserialize;
use smart_default::SmartDefault;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::aop::{Advice, Scope};
use crate::log::{LogLevel, LogRecord, Logger, LoggerConfig};

/// LoggingAdvice 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, Validate, PartialEq)]
#[serde(default)]
pub struct LoggingAdviceConfig {
    /// 日志器配置
    #[garde(skip)]
    pub logger: LoggerConfig,

    /// "starting" / "completed" 的日志级别
    #[default(LogLevel::Debug)]
    #[garde(skip)]
    pub level: LogLevel,

    /// 成功调用的采样率
    #[default = 1.0]
    #[garde(range(min = 0.0, max = 1.0))]
    pub info_sample_rate: f32,

    /// 失败调用的采样率
    #[default = 1.0]
    #[garde(range(min = 0.0, max = 1.0))]
    pub warn_sample_rate: f32,
}

#[derive(Clone)]
struct LogInvocation {
    start: Instant,
    sampled: bool,
}

/// 记录方法开始和结束的 Advice
///
/// - before：`starting`
/// - after 成功：`completed`，带 `duration_ms`
/// - after 失败：WARN 级别的 `completed with error`，带 `error` 和 `duration_ms`
///
/// 成功路径在 before 时按 `info_sample_rate` 决定是否记录，
/// 失败路径在 after 时按 `warn_sample_rate` 单独采样
pub struct LoggingAdvice {
    logger: Arc<Logger>,
    level: LogLevel,
    info_sample_rate: f32,
    warn_sample_rate: f32,
}

impl LoggingAdvice {
    pub fn new(config: LoggingAdviceConfig) -> Result<Self> {
        config.validate()?;
        let logger = Arc::new(Logger::new(config.logger)?);

        Ok(Self {
            logger,
            level: config.level,
            info_sample_rate: config.info_sample_rate,
            warn_sample_rate: config.warn_sample_rate,
        })
    }

    /// 使用已有的 Logger，采样率均为 1
    pub fn with_logger(logger: Arc<Logger>, level: LogLevel) -> Self {
        Self {
            logger,
            level,
            info_sample_rate: 1.0,
            warn_sample_rate: 1.0,
        }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    fn emit(&self, scope: &Scope, record: LogRecord) {
        if let Err(e) = self.logger.log_scoped(scope, record) {
            tracing::warn!(error = %e, "logging advice failed to write record");
        }
    }
}

fn sample(rate: f32) -> bool {
    rate >= 1.0 || (rate > 0.0 && rand::random::<f32>() < rate)
}

impl Advice for LoggingAdvice {
    fn before(&self, mut scope: Scope) -> Scope {
        let sampled = sample(self.info_sample_rate);
        scope.insert_frame_local(LogInvocation {
            start: Instant::now(),
            sampled,
        });

        if sampled {
            self.emit(&scope, LogRecord::new(self.level, "starting"));
        }
        scope
    }

    fn after(&self, mut scope: Scope, error: Option<&dyn fmt::Display>) -> Scope {
        let Some(invocation) = scope.take_frame_local::<LogInvocation>() else {
            return scope;
        };
        let duration_ms = invocation.start.elapsed().as_millis() as u64;

        match error {
            Some(e) => {
                if sample(self.warn_sample_rate) {
                    let record = LogRecord::new(LogLevel::Warn, "completed with error")
                        .with_metadata("error", e.to_string())
                        .with_metadata("duration_ms", duration_ms);
                    self.emit(&scope, record);
                }
            }
            None => {
                if invocation.sampled {
                    let record = LogRecord::new(self.level, "completed")
                        .with_metadata("duration_ms", duration_ms);
                    self.emit(&scope, record);
                }
            }
        }
        scope
    }
}

crate::impl_from!(LoggingAdviceConfig => LoggingAdvice, fallible);
crate::impl_box_from!(LoggingAdvice => dyn Advice);
