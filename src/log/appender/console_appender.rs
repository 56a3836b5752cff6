use crate::log::appender::LogAppender;
use anyhow::Result;
use serde::Deserialize;
use smart_default::SmartDefault;
use std::io::{self, Write};

/// 输出目标
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Stdout,
    Stderr,
}

/// ConsoleAppender 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct ConsoleAppenderConfig {
    /// 输出到 stdout 还是 stderr
    pub target: Target,

    /// 每条日志后是否立即 flush
    #[default = true]
    pub auto_flush: bool,
}

/// 终端输出器
pub struct ConsoleAppender {
    config: ConsoleAppenderConfig,
}

impl ConsoleAppender {
    pub fn new(config: ConsoleAppenderConfig) -> Self {
        Self { config }
    }

    fn write_line(&self, out: &mut dyn Write, message: &str) -> Result<()> {
        writeln!(out, "{}", message)?;
        if self.config.auto_flush {
            out.flush()?;
        }
        Ok(())
    }
}

impl LogAppender for ConsoleAppender {
    fn append(&self, formatted_message: &str) -> Result<()> {
        match self.config.target {
            Target::Stdout => self.write_line(&mut io::stdout().lock(), formatted_message),
            Target::Stderr => self.write_line(&mut io::stderr().lock(), formatted_message),
        }
    }

    fn flush(&self) -> Result<()> {
        match self.config.target {
            Target::Stdout => io::stdout().flush()?,
            Target::Stderr => io::stderr().flush()?,
        }
        Ok(())
    }
}

crate::impl_from!(ConsoleAppenderConfig => ConsoleAppender);
crate::impl_box_from!(ConsoleAppender => dyn LogAppender);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_appender_append() -> Result<()> {
        let appender = ConsoleAppender::new(ConsoleAppenderConfig::default());
        appender.append("Test message")?;
        appender.flush()?;
        Ok(())
    }

    #[test]
    fn test_console_appender_stderr() -> Result<()> {
        let appender = ConsoleAppender::new(ConsoleAppenderConfig {
            target: Target::Stderr,
            auto_flush: false,
        });
        appender.append("Test message")?;
        appender.close()?;
        Ok(())
    }

    #[test]
    fn test_console_appender_config() -> Result<()> {
        let config: ConsoleAppenderConfig = json5::from_str(r#"{ target: "stderr" }"#)?;
        assert_eq!(config.target, Target::Stderr);
        assert!(config.auto_flush);

        let appender = ConsoleAppender::from(config);
        assert_eq!(appender.config.target, Target::Stderr);
        Ok(())
    }
}
