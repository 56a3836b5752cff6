//! Advice：织入到方法前后的钩子

use std::fmt;

use super::scope::Scope;

/// 方法前后的钩子对
///
/// 引擎不关心 Advice 做了什么，只保证调用顺序：
/// `before` 按注册顺序执行，`after` 按注册逆序执行。
/// 每个钩子接收当前 Scope 并返回（可能扩展过的）Scope，返回值会传给下一个钩子
pub trait Advice: Send + Sync {
    /// 方法进入时调用，此时方法自身的 frame 已经压栈
    fn before(&self, scope: Scope) -> Scope;

    /// 方法退出时调用，`error` 为方法的业务错误，frame 在所有 after 执行完后才出栈
    fn after(&self, scope: Scope, error: Option<&dyn fmt::Display>) -> Scope;
}

/// 由两个闭包组成的 Advice，方便在测试和轻量场景中使用
///
/// ```ignore
/// let advice = FnAdvice::new(
///     |scope| { println!("enter"); scope },
///     |scope, err| { println!("exit {:?}", err.map(|e| e.to_string())); scope },
/// );
/// ```
pub struct FnAdvice<B, A> {
    before: B,
    after: A,
}

impl<B, A> FnAdvice<B, A>
where
    B: Fn(Scope) -> Scope + Send + Sync,
    A: Fn(Scope, Option<&dyn fmt::Display>) -> Scope + Send + Sync,
{
    pub fn new(before: B, after: A) -> Self {
        Self { before, after }
    }
}

impl<B, A> Advice for FnAdvice<B, A>
where
    B: Fn(Scope) -> Scope + Send + Sync,
    A: Fn(Scope, Option<&dyn fmt::Display>) -> Scope + Send + Sync,
{
    fn before(&self, scope: Scope) -> Scope {
        (self.before)(scope)
    }

    fn after(&self, scope: Scope, error: Option<&dyn fmt::Display>) -> Scope {
        (self.after)(scope, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fn_advice_calls_closures() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (e1, e2) = (events.clone(), events.clone());

        let advice = FnAdvice::new(
            move |scope| {
                e1.lock().unwrap().push("before".to_string());
                scope
            },
            move |scope, err: Option<&dyn fmt::Display>| {
                e2.lock()
                    .unwrap()
                    .push(format!("after:{}", err.map(|e| e.to_string()).unwrap_or_default()));
                scope
            },
        );

        let scope = advice.before(Scope::new());
        let scope = advice.after(scope, Some(&"boom"));
        advice.after(scope, None);

        assert_eq!(
            *events.lock().unwrap(),
            vec!["before", "after:boom", "after:"]
        );
    }

    #[test]
    fn test_advice_is_object_safe() {
        let advice: Arc<dyn Advice> = Arc::new(FnAdvice::new(|s| s, |s, _| s));
        let scope = advice.before(Scope::new());
        assert_eq!(scope.depth(), 0);
    }
}
