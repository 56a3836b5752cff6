use serde::Deserialize;
use smart_default::SmartDefault;
use std::fmt;
use tracing::field::{display, Empty};
use tracing::Span;

use crate::aop::{Advice, Scope};

/// SpanAdvice 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct SpanAdviceConfig {
    /// 失败时是否把错误信息记录到 span 的 `error` 字段
    #[default = true]
    pub record_error: bool,
}

#[derive(Clone)]
struct AspectSpan(Span);

/// 为每次调用创建一个 tracing span 的 Advice
///
/// span 名为 `aspect`，`otel.name` 为 `Type::method`。外层调用也由 SpanAdvice
/// 处理时，新 span 的父节点是外层的 span，否则沿用当前上下文中的 span。
/// span 不会被 enter，它只记录调用的起止和结果，可以跨越 `.await`
#[derive(Debug)]
pub struct SpanAdvice {
    record_error: bool,
}

impl SpanAdvice {
    pub fn new(config: SpanAdviceConfig) -> Self {
        Self {
            record_error: config.record_error,
        }
    }
}

impl Default for SpanAdvice {
    fn default() -> Self {
        Self::new(SpanAdviceConfig::default())
    }
}

impl Advice for SpanAdvice {
    fn before(&self, mut scope: Scope) -> Scope {
        let Some(frame) = scope.current_frame() else {
            return scope;
        };

        let qualifier = frame.qualifier();
        let component = frame.type_name();
        let span = match scope.enclosing_frame_local::<AspectSpan>() {
            Some(parent) => tracing::info_span!(
                parent: &parent.0,
                "aspect",
                otel.name = %qualifier,
                component = %component,
                service_name = %frame.service_name(),
                method = %frame.method_name(),
                calling_method = %frame.calling_method_name(),
                result = Empty,
                error = Empty,
            ),
            None => tracing::info_span!(
                "aspect",
                otel.name = %qualifier,
                component = %component,
                service_name = %frame.service_name(),
                method = %frame.method_name(),
                calling_method = %frame.calling_method_name(),
                result = Empty,
                error = Empty,
            ),
        };

        scope.insert_frame_local(AspectSpan(span));
        scope
    }

    fn after(&self, mut scope: Scope, error: Option<&dyn fmt::Display>) -> Scope {
        let Some(AspectSpan(span)) = scope.take_frame_local::<AspectSpan>() else {
            return scope;
        };

        match error {
            Some(e) => {
                span.record("result", "failure");
                if self.record_error {
                    span.record("error", display(e));
                }
            }
            None => {
                span.record("result", "success");
            }
        }
        // span 在这里被 drop 并关闭
        scope
    }
}

crate::impl_from!(SpanAdviceConfig => SpanAdvice);
crate::impl_box_from!(SpanAdvice => dyn Advice);
