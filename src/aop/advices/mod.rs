//! 内置的 Advice
//!
//! - `LoggingAdvice`：结构化日志，记录开始、完成、失败和耗时
//! - `TimedAdvice`：Prometheus 耗时直方图
//! - `SpanAdvice`：tracing span
//!
//! 三者都注册在类型注册表中，可以通过 `AspectManagerConfig` 按类型名创建

mod logging;
mod span;
mod timed;

use anyhow::Result;
use std::sync::Once;

use crate::aop::Advice;
use crate::cfg::register_trait;

pub use logging::{LoggingAdvice, LoggingAdviceConfig};
pub use span::{SpanAdvice, SpanAdviceConfig};
pub use timed::{TimedAdvice, TimedAdviceConfig, TimedLabels};

/// 注册所有内置 Advice
pub fn register_advices() -> Result<()> {
    register_trait::<LoggingAdvice, dyn Advice, LoggingAdviceConfig>("LoggingAdvice")?;
    register_trait::<TimedAdvice, dyn Advice, TimedAdviceConfig>("TimedAdvice")?;
    register_trait::<SpanAdvice, dyn Advice, SpanAdviceConfig>("SpanAdvice")?;
    Ok(())
}

static REGISTER_ONCE: Once = Once::new();

pub(crate) fn ensure_registered() {
    REGISTER_ONCE.call_once(|| {
        if let Err(e) = register_advices() {
            tracing::error!(error = %e, "failed to register advices");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{create_trait_from_type_options, TypeOptions};

    #[test]
    fn test_create_registered_advices() -> anyhow::Result<()> {
        ensure_registered();

        for options in [
            r#"{ type: "SpanAdvice" }"#,
            r#"{ type: "TimedAdvice", options: { name: "registered_advice_seconds" } }"#,
            r#"{ type: "LoggingAdvice", options: { level: "info" } }"#,
        ] {
            let options = TypeOptions::from_json(options)?;
            let _advice: Box<dyn Advice> = create_trait_from_type_options(&options)?;
        }
        Ok(())
    }

    #[test]
    fn test_create_with_invalid_options() -> anyhow::Result<()> {
        ensure_registered();

        let options = TypeOptions::from_json(
            r#"{ type: "LoggingAdvice", options: { warn_sample_rate: 2.0 } }"#,
        )?;
        assert!(create_trait_from_type_options::<dyn Advice>(&options).is_err());
        Ok(())
    }
}
