use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::aspect_manager::AspectManager;
use super::scope::Scope;

/// 调用未正常结束时传给 `after` 钩子的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    /// 守卫在 finish 之前被丢弃（提前返回、future 被取消）
    #[error("invocation abandoned before completion")]
    Abandoned,

    /// 方法体 panic
    #[error("invocation panicked")]
    Panicked,
}

/// `before` 之后的守卫，保证 `after` 恰好执行一次
///
/// 正常路径调用 [`Invocation::finish`] 系列方法；守卫未完成就被丢弃时，
/// `Drop` 会以 [`InvocationError`] 执行 `after`
#[must_use = "dropping an Invocation immediately reports it as abandoned"]
pub struct Invocation {
    manager: Option<Arc<AspectManager>>,
    scope: Scope,
    finished: bool,
}

impl Invocation {
    pub(crate) fn new(manager: Arc<AspectManager>, scope: Scope) -> Self {
        Self {
            manager: Some(manager),
            scope,
            finished: false,
        }
    }

    /// 不执行任何钩子的守卫，没有初始化 AspectManager 时使用
    pub fn passthrough(scope: Scope) -> Self {
        Self {
            manager: None,
            scope,
            finished: false,
        }
    }

    /// 压栈后的 Scope，传给方法体和嵌套调用
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// 以方法结果结束，`Err` 会传给 `after` 钩子
    pub fn finish<T, E: fmt::Display>(mut self, result: &Result<T, E>) -> Scope {
        match result {
            Ok(_) => self.complete(None),
            Err(e) => self.complete(Some(e)),
        }
    }

    pub fn finish_ok(mut self) -> Scope {
        self.complete(None)
    }

    pub fn finish_err(mut self, error: &dyn fmt::Display) -> Scope {
        self.complete(Some(error))
    }

    fn complete(&mut self, error: Option<&dyn fmt::Display>) -> Scope {
        self.finished = true;
        let scope = std::mem::take(&mut self.scope);
        match &self.manager {
            Some(manager) => manager.after(scope, error),
            None => scope,
        }
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let method = self
            .scope
            .current_frame()
            .map(|frame| frame.method_name().to_string())
            .unwrap_or_default();

        if std::thread::panicking() {
            tracing::warn!(%method, "invocation panicked, running after hooks");
            let error = InvocationError::Panicked;
            // 已经在 unwind 中，钩子的 panic 不能再向外传播
            let _ = catch_unwind(AssertUnwindSafe(|| self.complete(Some(&error))));
        } else {
            tracing::warn!(%method, "invocation abandoned, running after hooks");
            let error = InvocationError::Abandoned;
            self.complete(Some(&error));
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("scope", &self.scope)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aop::advice::FnAdvice;
    use std::sync::Mutex;

    fn manager_with_recorder() -> (Arc<AspectManager>, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (e1, e2) = (events.clone(), events.clone());
        let manager = Arc::new(AspectManager::with_service_name("svc"));
        manager.register_regex(
            ".*",
            Arc::new(FnAdvice::new(
                move |scope: Scope| {
                    e1.lock().unwrap().push("before".to_string());
                    scope
                },
                move |scope: Scope, err: Option<&dyn fmt::Display>| {
                    e2.lock().unwrap().push(match err {
                        Some(e) => format!("after:{}", e),
                        None => "after".to_string(),
                    });
                    scope
                },
            )),
        );
        (manager, events)
    }

    #[test]
    fn test_finish_ok() {
        let (manager, events) = manager_with_recorder();
        let invocation = manager.enter(&Scope::new(), "app::S::run");
        assert_eq!(invocation.scope().depth(), 1);

        let scope = invocation.finish(&Ok::<_, String>(1));
        assert_eq!(scope.depth(), 0);
        assert_eq!(*events.lock().unwrap(), vec!["before", "after"]);
    }

    #[test]
    fn test_finish_err() {
        let (manager, events) = manager_with_recorder();
        let invocation = manager.enter(&Scope::new(), "app::S::run");
        invocation.finish(&Err::<(), _>("not found"));
        assert_eq!(*events.lock().unwrap(), vec!["before", "after:not found"]);
    }

    #[test]
    fn test_drop_reports_abandoned() {
        let (manager, events) = manager_with_recorder();
        {
            let _invocation = manager.enter(&Scope::new(), "app::S::run");
        }
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "before".to_string(),
                format!("after:{}", InvocationError::Abandoned)
            ]
        );
    }

    #[test]
    fn test_drop_during_panic_reports_panicked() {
        let (manager, events) = manager_with_recorder();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _invocation = manager.enter(&Scope::new(), "app::S::run");
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(
            *events.lock().unwrap(),
            vec!["before".to_string(), "after:invocation panicked".to_string()]
        );
    }

    #[test]
    fn test_caller_scope_untouched() {
        let (manager, _events) = manager_with_recorder();
        let scope = Scope::new();
        let invocation = manager.enter(&scope, "app::S::run");
        drop(invocation);
        assert_eq!(scope.depth(), 0);
    }

    #[test]
    fn test_passthrough() {
        let invocation = Invocation::passthrough(Scope::new());
        assert_eq!(invocation.scope().depth(), 0);
        assert_eq!(invocation.finish_ok().depth(), 0);
    }
}
