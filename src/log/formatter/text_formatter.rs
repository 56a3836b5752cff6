use crate::log::formatter::LogFormatter;
use crate::log::log_record::{LogLevel, LogRecord};
use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde::Deserialize;
use smart_default::SmartDefault;
use std::fmt::Write;

/// TextFormatter 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct TextFormatterConfig {
    /// 是否启用颜色输出
    #[default = false]
    pub colored: bool,

    /// 是否输出线程 ID
    #[default = true]
    pub with_thread_id: bool,
}

/// 文本格式化器
///
/// 输出形如：
/// `[2025-01-19T12:34:56.789Z] [ThreadId(1)] INFO  [Sample::Method1] completed | duration_ms=3`
pub struct TextFormatter {
    config: TextFormatterConfig,
}

impl TextFormatter {
    pub fn new(config: TextFormatterConfig) -> Self {
        Self { config }
    }

    fn dimmed(&self, buffer: &mut String, text: &str) -> Result<()> {
        if self.config.colored {
            write!(buffer, "{}", text.dimmed())?;
        } else {
            buffer.push_str(text);
        }
        Ok(())
    }
}

impl LogFormatter for TextFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let mut result = String::with_capacity(96 + record.message.len());

        result.push('[');
        self.dimmed(&mut result, &record.timestamp_rfc3339())?;
        result.push_str("] ");

        if self.config.with_thread_id {
            result.push('[');
            self.dimmed(&mut result, &record.thread_id)?;
            result.push_str("] ");
        }

        if self.config.colored {
            write!(result, "{} ", colored_level(record.level))?;
        } else {
            write!(result, "{:<5} ", record.level)?;
        }

        if let Some(method) = &record.method {
            result.push('[');
            self.dimmed(&mut result, &crate::aop::basic_qualifier_from_method(method))?;
            result.push_str("] ");
        }

        if let (Some(file), Some(line)) = (&record.file, record.line) {
            result.push('[');
            self.dimmed(&mut result, &format!("{}:{}", file, line))?;
            result.push_str("] ");
        }

        result.push_str(&record.message);

        if !record.metadata.is_empty() {
            result.push_str(" |");
            for (key, value) in &record.metadata {
                result.push(' ');
                if self.config.colored {
                    write!(result, "{}", key.cyan())?;
                } else {
                    result.push_str(key);
                }
                write!(result, "={}", value)?;
            }
        }

        Ok(result)
    }
}

fn colored_level(level: LogLevel) -> ColoredString {
    let text = format!("{:<5}", level);
    match level {
        LogLevel::Error => text.red(),
        LogLevel::Warn => text.yellow(),
        LogLevel::Info => text.green(),
        LogLevel::Debug => text.cyan(),
        LogLevel::Trace => text.white().dimmed(),
    }
}

crate::impl_from!(TextFormatterConfig => TextFormatter);
crate::impl_box_from!(TextFormatter => dyn LogFormatter);
