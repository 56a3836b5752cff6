use anyhow::Result;
use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

use super::advice::Advice;
use super::aspect_manager::{AspectManager, AspectManagerConfig};
use super::invocation::Invocation;
use super::method::UNKNOWN_METHOD;
use super::pointcut::Pointcut;
use super::scope::{AspectFrame, Scope};

/// 全局 AspectManager 单例，初始化之前为空
static GLOBAL_ASPECT_MANAGER: Lazy<ArcSwapOption<AspectManager>> =
    Lazy::new(ArcSwapOption::empty);

/// 以服务名初始化全局 AspectManager，已有的 join point 会被丢弃
///
/// # 示例
///
/// ```ignore
/// aspectx::aop::init("order-service");
/// aspectx::aop::register_join_point(
///     Arc::new(RegexPointcut::new(".*Repository")),
///     Arc::new(SpanAdvice::default()),
/// );
/// ```
pub fn init(service_name: impl Into<String>) {
    install(AspectManager::with_service_name(service_name));
}

/// 从配置初始化全局 AspectManager
pub fn init_with_config(config: AspectManagerConfig) -> Result<()> {
    install(AspectManager::new(config)?);
    Ok(())
}

/// 安装一个已经构造好的 AspectManager
pub fn install(manager: AspectManager) {
    tracing::debug!(service_name = %manager.service_name(), "global aspect manager installed");
    GLOBAL_ASPECT_MANAGER.store(Some(Arc::new(manager)));
}

/// 卸载全局 AspectManager，之后的 before / after 都变为空操作
pub fn reset() {
    GLOBAL_ASPECT_MANAGER.store(None);
}

/// 获取全局 AspectManager
pub fn global_aspect_manager() -> Option<Arc<AspectManager>> {
    GLOBAL_ASPECT_MANAGER.load_full()
}

/// 全局服务名，未初始化时为 `"Unknown"`
pub fn service_name() -> String {
    (*GLOBAL_ASPECT_MANAGER.load())
        .as_ref()
        .map(|manager| manager.service_name().to_string())
        .unwrap_or_else(|| UNKNOWN_METHOD.to_string())
}

/// 注册 join point（全局），未初始化时忽略
pub fn register_join_point(pointcut: Arc<dyn Pointcut>, advice: Arc<dyn Advice>) {
    match &*GLOBAL_ASPECT_MANAGER.load() {
        Some(manager) => manager.register_join_point(pointcut, advice),
        None => tracing::warn!(
            pointcut = %pointcut.describe(),
            "aspect manager not initialized, join point ignored"
        ),
    }
}

/// 方法进入（全局），未初始化时原样返回 scope
pub fn before(scope: Scope, method: &str) -> Scope {
    match &*GLOBAL_ASPECT_MANAGER.load() {
        Some(manager) => manager.before(scope, method),
        None => scope,
    }
}

/// 方法退出（全局），未初始化时原样返回 scope
pub fn after(scope: Scope, error: Option<&dyn fmt::Display>) -> Scope {
    match &*GLOBAL_ASPECT_MANAGER.load() {
        Some(manager) => manager.after(scope, error),
        None => scope,
    }
}

/// 进入一个被织入的方法（全局），未初始化时返回不执行钩子的守卫
pub fn enter(scope: &Scope, method: &str) -> Invocation {
    match global_aspect_manager() {
        Some(manager) => manager.enter(scope, method),
        None => Invocation::passthrough(scope.clone()),
    }
}

/// 当前调用链最内层的 frame
pub fn current_frame(scope: &Scope) -> Option<Arc<AspectFrame>> {
    scope.current_frame()
}
