use anyhow::Result;
use garde::Validate;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::fmt;
use std::sync::Arc;

use crate::cfg::{create_trait_from_type_options, TypeOptions};

use super::advice::Advice;
use super::invocation::Invocation;
use super::join_point::{JoinPoint, JoinPointRegistry};
use super::method::UNKNOWN_METHOD;
use super::pointcut::{Pointcut, RegexPointcut};
use super::scope::{AspectFrame, Scope};

/// 单个 join point 的配置
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Validate)]
pub struct JoinPointConfig {
    /// 方法标识的正则表达式
    #[garde(length(min = 1))]
    pub pointcut: String,

    /// Advice 的类型和参数，如 `{ type: "LoggingAdvice", options: {...} }`
    #[garde(skip)]
    pub advice: TypeOptions,
}

/// AspectManager 配置
///
/// # 示例
///
/// ```ignore
/// let config: AspectManagerConfig = json5::from_str(r#"{
///     service_name: "order-service",
///     join_points: [
///         { pointcut: ".*", advice: { type: "SpanAdvice" } },
///         { pointcut: "Repository", advice: { type: "TimedAdvice", options: { name: "repo_latency" } } },
///     ],
/// }"#)?;
/// let manager = AspectManager::new(config)?;
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault, PartialEq, Validate)]
#[serde(default)]
pub struct AspectManagerConfig {
    /// 服务名，会出现在指标标签和 span 字段中
    #[default = "Unknown"]
    #[garde(length(min = 1))]
    pub service_name: String,

    /// 按顺序注册的 join point
    #[garde(dive)]
    pub join_points: Vec<JoinPointConfig>,
}

/// 切面调度引擎
///
/// 持有服务名和 join point 注册表。`before` / `after` 负责 frame 的压栈、
/// 钩子的执行和出栈，保证 `A.before, B.before, <body>, B.after, A.after` 的洋葱顺序
pub struct AspectManager {
    service_name: Arc<str>,
    registry: JoinPointRegistry,
}

impl AspectManager {
    /// 从配置创建，配置中的 Advice 通过类型注册表实例化
    pub fn new(config: AspectManagerConfig) -> Result<Self> {
        config.validate()?;
        super::advices::ensure_registered();

        let manager = Self::with_service_name(config.service_name);
        for join_point in &config.join_points {
            let advice: Box<dyn Advice> = create_trait_from_type_options(&join_point.advice)?;
            manager.register_join_point(
                Arc::new(RegexPointcut::new(join_point.pointcut.as_str())),
                Arc::from(advice),
            );
        }

        Ok(manager)
    }

    /// 创建一个没有任何 join point 的 AspectManager
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        let service_name: String = service_name.into();
        let service_name = if service_name.is_empty() {
            UNKNOWN_METHOD.to_string()
        } else {
            service_name
        };

        Self {
            service_name: Arc::from(service_name),
            registry: JoinPointRegistry::new(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// 注册一个 join point，重复注册的 advice 会生效多次
    pub fn register_join_point(&self, pointcut: Arc<dyn Pointcut>, advice: Arc<dyn Advice>) {
        self.registry.register(JoinPoint::new(pointcut, advice));
    }

    /// 以正则表达式注册，非法的正则永远不匹配
    pub fn register_regex(&self, pattern: &str, advice: Arc<dyn Advice>) {
        self.register_join_point(Arc::new(RegexPointcut::new(pattern)), advice);
    }

    /// 按注册顺序返回匹配 `method` 的 join point
    pub fn join_points_for(&self, method: &str) -> Arc<[JoinPoint]> {
        self.registry.resolve(method)
    }

    pub fn registry(&self) -> &JoinPointRegistry {
        &self.registry
    }

    /// 方法进入
    ///
    /// 无论是否有匹配的 advice 都会压入一个 frame，使嵌套调用能拿到调用方标识，
    /// 然后按注册顺序执行匹配到的 `before` 钩子
    pub fn before(&self, mut scope: Scope, method: &str) -> Scope {
        let join_points = self.join_points_for(method);
        let calling_method = scope
            .current_frame()
            .map(|frame| frame.method_name().to_string())
            .unwrap_or_else(|| UNKNOWN_METHOD.to_string());

        scope.push_frame(AspectFrame::new(
            method,
            calling_method,
            Arc::clone(&self.service_name),
            Arc::clone(&join_points),
        ));

        let mut scope = join_points.iter().fold(scope, |mut scope, join_point| {
            scope.set_active_join_point(Some(join_point.seq()));
            join_point.advice().before(scope)
        });
        scope.set_active_join_point(None);
        scope
    }

    /// 方法退出
    ///
    /// 没有活跃 frame 时直接返回；否则按注册逆序执行 `after` 钩子，最后出栈
    pub fn after(&self, scope: Scope, error: Option<&dyn fmt::Display>) -> Scope {
        let Some(frame) = scope.current_frame() else {
            return scope;
        };

        let mut scope = frame
            .join_points()
            .iter()
            .rev()
            .fold(scope, |mut scope, join_point| {
                scope.set_active_join_point(Some(join_point.seq()));
                join_point.advice().after(scope, error)
            });
        scope.set_active_join_point(None);
        scope.pop_frame();
        scope
    }

    /// 执行 `before` 并返回一个保证 `after` 会被执行的守卫
    ///
    /// ```ignore
    /// let invocation = manager.enter(&scope, method_name!());
    /// let result = do_work(invocation.scope());
    /// invocation.finish(&result);
    /// ```
    pub fn enter(self: &Arc<Self>, scope: &Scope, method: &str) -> Invocation {
        let scope = self.before(scope.clone(), method);
        Invocation::new(Arc::clone(self), scope)
    }

    /// 清空所有 join point（测试和重新初始化使用）
    pub fn reset(&self) {
        self.registry.reset();
    }
}

impl fmt::Debug for AspectManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AspectManager")
            .field("service_name", &self.service_name)
            .field("registry", &self.registry)
            .finish()
    }
}
