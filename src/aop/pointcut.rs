//! Pointcut：决定一个 Advice 是否作用于某个方法

use regex_lite::Regex;
use std::fmt;

/// 方法匹配谓词
///
/// 输入是完整限定的方法标识（如 `my_app::service::UserService::get_user`），
/// 匹配必须是纯函数：相同输入总是得到相同结果
pub trait Pointcut: Send + Sync {
    /// 判断方法是否匹配
    fn matches(&self, method: &str) -> bool;

    /// 用于日志和调试的描述
    fn describe(&self) -> String {
        "<pointcut>".to_string()
    }
}

/// 基于正则表达式的 Pointcut
///
/// 使用非锚定搜索语义，`".*Method1$"` 匹配任何以 `Method1` 结尾的方法。
/// 非法的正则不会报错，只会永远不匹配
pub struct RegexPointcut {
    pattern: String,
    regex: Option<Regex>,
}

impl RegexPointcut {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let regex = match Regex::new(&pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(%pattern, error = %e, "invalid pointcut pattern, it will never match");
                None
            }
        };

        Self { pattern, regex }
    }

    /// 原始的正则表达式
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// 正则是否合法
    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }
}

impl Pointcut for RegexPointcut {
    fn matches(&self, method: &str) -> bool {
        self.regex
            .as_ref()
            .map_or(false, |regex| regex.is_match(method))
    }

    fn describe(&self) -> String {
        format!("regex({})", self.pattern)
    }
}

impl fmt::Debug for RegexPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexPointcut")
            .field("pattern", &self.pattern)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl From<&str> for RegexPointcut {
    fn from(pattern: &str) -> Self {
        RegexPointcut::new(pattern)
    }
}

impl From<String> for RegexPointcut {
    fn from(pattern: String) -> Self {
        RegexPointcut::new(pattern)
    }
}

/// 基于闭包的结构化 Pointcut
///
/// ```ignore
/// let pointcut = PredicatePointcut::new("repository methods", |method| {
///     method.contains("::repository::") && !method.ends_with("::new")
/// });
/// ```
pub struct PredicatePointcut<F> {
    description: String,
    predicate: F,
}

impl<F> PredicatePointcut<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    pub fn new(description: impl Into<String>, predicate: F) -> Self {
        Self {
            description: description.into(),
            predicate,
        }
    }
}

impl<F> Pointcut for PredicatePointcut<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, method: &str) -> bool {
        (self.predicate)(method)
    }

    fn describe(&self) -> String {
        format!("predicate({})", self.description)
    }
}
