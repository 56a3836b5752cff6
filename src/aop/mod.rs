//! AOP (Aspect-Oriented Programming) 模块
//!
//! 一个显式的切面调度引擎：被增强的方法在进入时调用 `before`、退出时调用 `after`，
//! 引擎根据方法标识找到匹配的 join point，按注册顺序执行 `before` 钩子，
//! 按注册逆序执行 `after` 钩子。
//!
//! - `Pointcut`：判断一个方法标识是否需要增强，默认实现是正则表达式
//! - `Advice`：`before` / `after` 钩子，内置 LoggingAdvice、TimedAdvice、SpanAdvice
//! - `Scope`：按值传递的调用上下文，保存 frame 栈和任意扩展值
//! - `AspectManager`：注册表和调度逻辑，可以独立使用，也可以安装为全局实例
//!
//! # 使用示例
//!
//! ```ignore
//! use aspectx::aop::{self, Scope};
//! use aspectx::aspect;
//!
//! aop::init_with_config(json5::from_str(r#"{
//!     service_name: "order-service",
//!     join_points: [{ pointcut: "Repository", advice: { type: "TimedAdvice" } }],
//! }"#)?)?;
//!
//! impl OrderRepository {
//!     fn save(&self, scope: &Scope, order: &Order) -> anyhow::Result<()> {
//!         aspect!(scope, |scope| self.insert(&scope, order))
//!     }
//! }
//! ```

pub mod advice;
pub mod advices;
pub mod aspect_manager;
pub mod global_aspect_manager;
pub mod invocation;
pub mod join_point;
pub mod macros;
pub mod metric;
pub mod method;
pub mod pointcut;
pub mod scope;
pub mod tracer;

pub use advice::{Advice, FnAdvice};
pub use advices::{
    register_advices, LoggingAdvice, LoggingAdviceConfig, SpanAdvice, SpanAdviceConfig,
    TimedAdvice, TimedAdviceConfig, TimedLabels,
};
pub use aspect_manager::{AspectManager, AspectManagerConfig, JoinPointConfig};
pub use global_aspect_manager::{
    after, before, current_frame, enter, global_aspect_manager, init, init_with_config, install,
    register_join_point, reset, service_name,
};
pub use invocation::{Invocation, InvocationError};
pub use join_point::{JoinPoint, JoinPointRegistry};
pub use method::{
    basic_qualifier_from_method, method_name_from_full_path, type_name_from_method,
    UNKNOWN_METHOD,
};
pub use metric::{encode_global_registry, encode_registry, global_registry};
pub use pointcut::{Pointcut, PredicatePointcut, RegexPointcut};
pub use scope::{AspectFrame, Scope};
pub use tracer::{init_tracing, TracingConfig};
