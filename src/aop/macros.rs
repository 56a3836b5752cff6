/// 当前函数的完整限定路径，如 `my_app::service::UserService::get_user`
///
/// 必须直接在被织入的函数体内展开（不能放进辅助函数），
/// 闭包和 async 块引入的 `{{closure}}` 后缀会被去掉。
/// 结果在首次求值后缓存，返回 `&'static str`
///
/// ```
/// mod service {
///     pub struct UserService;
///
///     impl UserService {
///         pub fn get_user(&self) -> &'static str {
///             aspectx::method_name!()
///         }
///     }
/// }
///
/// assert!(service::UserService.get_user().ends_with("service::UserService::get_user"));
/// ```
#[macro_export]
macro_rules! method_name {
    () => {{
        fn __aspectx_probe() {}
        fn __aspectx_type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        static __ASPECTX_METHOD_NAME: ::std::sync::OnceLock<::std::string::String> =
            ::std::sync::OnceLock::new();
        __ASPECTX_METHOD_NAME
            .get_or_init(|| {
                $crate::aop::method::normalize_probe_path(
                    __aspectx_type_name_of(__aspectx_probe),
                    "__aspectx_probe",
                )
            })
            .as_str()
    }};
}

/// 在 `enter` 和 `finish` 之间执行一个表达式
///
/// 表达式应返回 `Result`，`Err` 会传给 `after` 钩子。
/// `|scope|` 绑定的是压栈后的 Scope，嵌套调用应该使用它
///
/// # 使用方式
///
/// ```ignore
/// // 使用全局 AspectManager
/// pub fn get_user(&self, scope: &Scope, id: u64) -> Result<User> {
///     aspect!(scope, |scope| self.repo.find(&scope, id))
/// }
///
/// // 使用指定的 AspectManager（Arc<AspectManager>）
/// pub async fn get_user(&self, scope: &Scope, id: u64) -> Result<User> {
///     aspect!(self.aspects, scope, |scope| self.repo.find(&scope, id).await)
/// }
/// ```
#[macro_export]
macro_rules! aspect {
    ($scope:expr, |$binding:ident| $body:expr) => {{
        let __invocation = $crate::aop::enter(&$scope, $crate::method_name!());
        let __result = {
            let $binding = __invocation.scope().clone();
            $body
        };
        __invocation.finish(&__result);
        __result
    }};

    ($manager:expr, $scope:expr, |$binding:ident| $body:expr) => {{
        let __invocation = $manager.enter(&$scope, $crate::method_name!());
        let __result = {
            let $binding = __invocation.scope().clone();
            $body
        };
        __invocation.finish(&__result);
        __result
    }};
}
