use anyhow::{anyhow, Result};
use garde::Validate;
use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use serde::Deserialize;
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

use crate::aop::metric::global_registry;
use crate::aop::{Advice, Scope};

/// TimedAdvice 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, Validate, PartialEq)]
#[serde(default)]
pub struct TimedAdviceConfig {
    /// 指标名
    #[default = "aspect_method_duration_seconds"]
    #[garde(pattern(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$"))]
    pub name: String,

    /// 指标说明
    #[default = "Method execution duration in seconds"]
    #[garde(skip)]
    pub help: String,
}

/// 耗时指标的标签
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TimedLabels {
    pub service_name: String,
    pub calling_method: String,
    pub method: String,
    /// "success" 或 "failure"
    pub result: String,
}

type DurationFamily = Family<TimedLabels, Histogram, fn() -> Histogram>;

fn new_histogram() -> Histogram {
    // 1ms ~ 32s
    Histogram::new(exponential_buckets(0.001, 2.0, 16))
}

// 已注册到全局 Registry 的直方图族，按指标名索引
static GLOBAL_FAMILIES: Lazy<Mutex<HashMap<String, DurationFamily>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Clone)]
struct TimedStart(Instant);

/// 记录方法耗时的 Advice
///
/// 以 `service_name`、`calling_method`、`method`、`result` 为标签记录到 Prometheus 直方图
pub struct TimedAdvice {
    durations: DurationFamily,
}

impl TimedAdvice {
    /// 创建并注册到全局 Registry
    ///
    /// 同名指标只注册一次，之后创建的 TimedAdvice 共用已注册的直方图族
    pub fn new(config: TimedAdviceConfig) -> Result<Self> {
        config.validate()?;

        let mut families = GLOBAL_FAMILIES
            .lock()
            .map_err(|_| anyhow!("Failed to acquire metric families lock"))?;
        if let Some(durations) = families.get(&config.name) {
            tracing::debug!(metric = %config.name, "reusing registered duration histogram");
            return Ok(Self {
                durations: durations.clone(),
            });
        }

        let registry = global_registry();
        let mut registry = registry
            .write()
            .map_err(|_| anyhow!("Failed to acquire write lock"))?;
        let name = config.name.clone();
        let advice = Self::with_registry(config, &mut registry)?;
        families.insert(name, advice.durations.clone());
        Ok(advice)
    }

    /// 创建并注册到指定的 Registry，同名指标的去重由调用方负责
    pub fn with_registry(config: TimedAdviceConfig, registry: &mut Registry) -> Result<Self> {
        config.validate()?;

        let durations = DurationFamily::new_with_constructor(new_histogram);
        registry.register(config.name, config.help, durations.clone());

        Ok(Self { durations })
    }

    /// 直方图族，供查询和测试使用
    pub fn durations(&self) -> &Family<TimedLabels, Histogram, fn() -> Histogram> {
        &self.durations
    }
}

impl Advice for TimedAdvice {
    fn before(&self, mut scope: Scope) -> Scope {
        scope.insert_frame_local(TimedStart(Instant::now()));
        scope
    }

    fn after(&self, mut scope: Scope, error: Option<&dyn fmt::Display>) -> Scope {
        let Some(TimedStart(start)) = scope.take_frame_local::<TimedStart>() else {
            return scope;
        };
        let Some(frame) = scope.current_frame() else {
            return scope;
        };

        let labels = TimedLabels {
            service_name: frame.service_name().to_string(),
            calling_method: frame.simple_calling_method_name().to_string(),
            method: frame.simple_method_name().to_string(),
            result: if error.is_some() { "failure" } else { "success" }.to_string(),
        };
        self.durations
            .get_or_create(&labels)
            .observe(start.elapsed().as_secs_f64());

        scope
    }
}

crate::impl_from!(TimedAdviceConfig => TimedAdvice, fallible);
crate::impl_box_from!(TimedAdvice => dyn Advice);
