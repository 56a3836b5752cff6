//! AspectX - 切面调度引擎
//!
//! 为方法调用织入 before / after 钩子：日志、耗时指标、tracing span，
//! 或者任意自定义的 Advice。
//!
//! ## 模块
//!
//! - **aop**: 切面核心（Pointcut、Advice、Scope、AspectManager、全局实例、宏）
//! - **cfg**: 基于 TypeOptions 的组件注册与创建
//! - **log**: LoggingAdvice 使用的结构化日志器
//!
//! ## 织入方式
//!
//! - `#[advised]` 属性宏：自动包裹函数体
//! - `aspect!` 宏：包裹一个表达式
//! - `AspectManager::enter` / `Invocation::finish`：手动调用

extern crate self as aspectx;

pub mod aop;
pub mod cfg;
pub mod log;

// 重新导出主要的公共 API
pub use aop::{
    Advice, AspectFrame, AspectManager, AspectManagerConfig, Invocation, JoinPointConfig,
    Pointcut, RegexPointcut, Scope,
};

pub use cfg::{create_trait_from_type_options, register_trait, TypeOptions};

pub use log::{LogAppender, LogFormatter, LogLevel, LogRecord, Logger, LoggerConfig};

pub use aspectx_macros::advised;
