use crate::aop::Scope;
use crate::cfg::{create_trait_from_type_options, TypeOptions};
use crate::log::mdc::mdc;
use crate::log::{
    appender::LogAppender,
    formatter::LogFormatter,
    log_record::{LogLevel, LogRecord, MetadataValue},
};
use anyhow::Result;
use serde::Deserialize;
use smart_default::SmartDefault;
use std::sync::{Arc, PoisonError, RwLock};

/// Logger 配置
///
/// ```ignore
/// let config: LoggerConfig = json5::from_str(r#"{
///     level: "debug",
///     formatter: { type: "JsonFormatter" },
///     appender: {
///         type: "ChannelAppender",
///         options: { capacity: 1024, appender: { type: "FileAppender", options: { file_path: "log/app.log" } } },
///     },
/// }"#)?;
/// ```
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct LoggerConfig {
    /// 日志级别
    #[default(LogLevel::Info)]
    pub level: LogLevel,

    /// Formatter 配置
    #[default(TypeOptions::of("TextFormatter"))]
    pub formatter: TypeOptions,

    /// Appender 配置
    #[default(TypeOptions::of("ConsoleAppender"))]
    pub appender: TypeOptions,
}

/// 核心日志器
///
/// 负责日志的级别控制、格式化和输出
pub struct Logger {
    level: RwLock<LogLevel>,
    formatter: Arc<dyn LogFormatter>,
    appender: Arc<dyn LogAppender>,
}

impl Logger {
    pub fn new(config: LoggerConfig) -> Result<Self> {
        crate::log::ensure_registered();

        let formatter: Box<dyn LogFormatter> = create_trait_from_type_options(&config.formatter)?;
        let appender: Box<dyn LogAppender> = create_trait_from_type_options(&config.appender)?;

        Ok(Self::from_parts(
            config.level,
            Arc::from(formatter),
            Arc::from(appender),
        ))
    }

    /// 使用已经构造好的组件创建
    pub fn from_parts(
        level: LogLevel,
        formatter: Arc<dyn LogFormatter>,
        appender: Arc<dyn LogAppender>,
    ) -> Self {
        Self {
            level: RwLock::new(level),
            formatter,
            appender,
        }
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.level.write().unwrap_or_else(PoisonError::into_inner) = level;
    }

    pub fn level(&self) -> LogLevel {
        *self.level.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 该级别的日志是否会被输出
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    /// 记录日志
    pub fn log(&self, record: LogRecord) -> Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }

        let formatted = self.formatter.format(&record)?;
        self.appender.append(&formatted)
    }

    /// 在调用链上下文中记录日志
    ///
    /// 未指定方法时使用当前 frame 的方法，并附加 Scope 中的 MDC；
    /// 记录自身的元数据与 MDC 同名时以记录为准
    pub fn log_scoped(&self, scope: &Scope, mut record: LogRecord) -> Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }

        if record.method.is_none() {
            record.method = scope
                .current_frame()
                .map(|frame| frame.method_name().to_string());
        }

        let context = mdc(scope);
        if !context.is_empty() {
            let own = std::mem::take(&mut record.metadata);
            let mut metadata: Vec<_> = context
                .into_iter()
                .filter(|(key, _)| !own.iter().any(|(k, _)| k == key))
                .collect();
            metadata.extend(own);
            record.metadata = metadata;
        }

        self.log(record)
    }

    /// 记录带 metadata 的日志
    ///
    /// ```ignore
    /// logger.logm(LogLevel::Info, "user logged in", [("user_id", 12345.into())])?;
    /// ```
    pub fn logm(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        metadata: impl IntoIterator<Item = (impl Into<String>, MetadataValue)>,
    ) -> Result<()> {
        let mut record = LogRecord::new(level, message);
        for (key, value) in metadata {
            record.metadata.push((key.into(), value));
        }
        self.log(record)
    }

    pub fn trace(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Trace, message))
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Debug, message))
    }

    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Info, message))
    }

    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Warn, message))
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Error, message))
    }

    pub fn debugm(
        &self,
        message: impl Into<String>,
        metadata: impl IntoIterator<Item = (impl Into<String>, MetadataValue)>,
    ) -> Result<()> {
        self.logm(LogLevel::Debug, message, metadata)
    }

    pub fn infom(
        &self,
        message: impl Into<String>,
        metadata: impl IntoIterator<Item = (impl Into<String>, MetadataValue)>,
    ) -> Result<()> {
        self.logm(LogLevel::Info, message, metadata)
    }

    pub fn warnm(
        &self,
        message: impl Into<String>,
        metadata: impl IntoIterator<Item = (impl Into<String>, MetadataValue)>,
    ) -> Result<()> {
        self.logm(LogLevel::Warn, message, metadata)
    }

    pub fn errorm(
        &self,
        message: impl Into<String>,
        metadata: impl IntoIterator<Item = (impl Into<String>, MetadataValue)>,
    ) -> Result<()> {
        self.logm(LogLevel::Error, message, metadata)
    }

    /// 等待 appender 中的日志全部写出
    pub fn flush(&self) -> Result<()> {
        self.appender.flush()
    }

    /// 刷新并关闭 appender
    pub fn close(&self) -> Result<()> {
        self.appender.close()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::log::formatter::{JsonFormatter, JsonFormatterConfig};
    use crate::log::mdc::add_mdc_value;
    use std::sync::Mutex;

    /// 把日志保存在内存中的 Appender，其他模块的测试也会使用
    #[derive(Default)]
    pub(crate) struct MemoryAppender {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl MemoryAppender {
        pub(crate) fn json_lines(&self) -> Vec<serde_json::Value> {
            self.lines
                .lock()
                .unwrap()
                .iter()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    impl LogAppender for MemoryAppender {
        fn append(&self, formatted_message: &str) -> Result<()> {
            self.lines.lock().unwrap().push(formatted_message.to_string());
            Ok(())
        }
    }

    pub(crate) fn memory_logger(level: LogLevel) -> (Arc<Logger>, Arc<MemoryAppender>) {
        let memory = Arc::new(MemoryAppender::default());
        let logger = Logger::from_parts(
            level,
            Arc::new(JsonFormatter::new(JsonFormatterConfig::default())),
            memory.clone(),
        );
        (Arc::new(logger), memory)
    }

    #[test]
    fn test_level_filter() -> Result<()> {
        let (logger, memory) = memory_logger(LogLevel::Info);
        logger.debug("hidden")?;
        logger.info("shown")?;
        logger.error("also shown")?;
        assert_eq!(memory.lines.lock().unwrap().len(), 2);

        logger.set_level(LogLevel::Debug);
        assert_eq!(logger.level(), LogLevel::Debug);
        logger.debug("now shown")?;
        assert_eq!(memory.lines.lock().unwrap().len(), 3);
        Ok(())
    }

    #[test]
    fn test_logm() -> Result<()> {
        let (logger, memory) = memory_logger(LogLevel::Trace);
        logger.warnm("slow call", [("duration_ms", 1200u64.into())])?;

        let lines = memory.json_lines();
        assert_eq!(lines[0]["level"], "WARN");
        assert_eq!(lines[0]["duration_ms"], 1200);
        Ok(())
    }

    #[test]
    fn test_log_scoped_adds_mdc() -> Result<()> {
        let (logger, memory) = memory_logger(LogLevel::Debug);
        let scope = add_mdc_value(Scope::new(), "request_id", "r-1");
        let scope = add_mdc_value(scope, "tenant", "acme");

        logger.log_scoped(
            &scope,
            LogRecord::new(LogLevel::Info, "handled").with_metadata("tenant", "override"),
        )?;

        let lines = memory.json_lines();
        assert_eq!(lines[0]["request_id"], "r-1");
        assert_eq!(lines[0]["tenant"], "override");
        assert!(lines[0].get("method").is_none());
        // 同名字段只输出一次
        assert_eq!(memory.lines.lock().unwrap()[0].matches("\"tenant\"").count(), 1);
        Ok(())
    }

    #[test]
    fn test_new_from_config() -> Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        let config: LoggerConfig = json5::from_str(&format!(
            r#"{{
                level: "debug",
                formatter: {{ type: "JsonFormatter" }},
                appender: {{ type: "FileAppender", options: {{ file_path: "{}" }} }},
            }}"#,
            temp_file.path().display()
        ))?;

        let logger = Logger::new(config)?;
        logger.debug("written")?;
        logger.trace("dropped")?;
        logger.close()?;

        let contents = std::fs::read_to_string(temp_file.path())?;
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains(r#""message":"written""#));
        Ok(())
    }

    #[test]
    fn test_new_with_unknown_appender() {
        let config = LoggerConfig {
            appender: TypeOptions::of("KafkaAppender"),
            ..Default::default()
        };
        assert!(Logger::new(config).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.formatter.type_name, "TextFormatter");
        assert_eq!(config.appender.type_name, "ConsoleAppender");
    }
}
