//! 方法标识解析
//!
//! 方法标识是完整限定路径，例如 `my_app::service::UserService::get_user`，
//! 由 [`method_name!`](crate::method_name) 在被织入的函数内部于编译期生成。
//! 这里提供从完整路径中提取方法名、类型名的工具函数

/// 无法解析方法标识时使用的占位名
pub const UNKNOWN_METHOD: &str = "Unknown";

/// 规整 `method_name!` 探针得到的类型名
///
/// 去掉探针自身的路径段以及闭包、async 块引入的 `{{closure}}` 后缀，
/// 结果为空时返回 [`UNKNOWN_METHOD`]
#[doc(hidden)]
pub fn normalize_probe_path(probe: &str, probe_name: &str) -> String {
    let mut path = probe.strip_suffix(probe_name).unwrap_or(probe);
    path = path.strip_suffix("::").unwrap_or(path);

    while let Some(stripped) = path.strip_suffix("::{{closure}}") {
        path = stripped;
    }

    if path.is_empty() || path == "{{closure}}" {
        UNKNOWN_METHOD.to_string()
    } else {
        path.to_string()
    }
}

/// 从完整路径中提取方法名
///
/// 取最后一个 `::` 或 `.` 之后的部分，都不存在时返回输入本身
///
/// ```
/// use aspectx::aop::method_name_from_full_path;
///
/// assert_eq!(method_name_from_full_path("app::UserService::get_user"), "get_user");
/// assert_eq!(method_name_from_full_path("pkg.(*Sample).Method1"), "Method1");
/// assert_eq!(method_name_from_full_path("main"), "main");
/// ```
pub fn method_name_from_full_path(full: &str) -> &str {
    let after_colons = full.rfind("::").map(|i| i + 2).unwrap_or(0);
    let after_dot = full.rfind('.').map(|i| i + 1).unwrap_or(0);
    &full[after_colons.max(after_dot)..]
}

/// 从完整路径中提取所属类型名，无类型时返回空字符串
///
/// 支持三种形式：
/// - `pkg.(*T).M`：取括号中的内容，去掉 `*` / `&` / `&mut ` 前缀
/// - `<a::T as b::Trait>::m`：取 `a::T` 的最后一段
/// - `a::T::m`：方法前一段以大写字母开头时视为类型名，去掉泛型参数
pub fn type_name_from_method(full: &str) -> String {
    if let Some(close) = full.rfind(')') {
        if let Some(open) = full[..close].rfind('(') {
            let inner = full[open + 1..close].trim();
            let inner = inner
                .trim_start_matches("&mut ")
                .trim_start_matches(['*', '&']);
            return inner.to_string();
        }
    }

    if let Some(as_pos) = full.rfind(" as ") {
        if let Some(open) = matching_open_angle(&full[..as_pos]) {
            let self_ty = &full[open + 1..as_pos];
            return strip_generics(last_segment(self_ty)).to_string();
        }
    }

    let segments = split_path(full);
    if segments.len() >= 2 {
        let candidate = strip_generics(segments[segments.len() - 2]);
        if candidate.chars().next().is_some_and(|c| c.is_uppercase()) {
            return candidate.to_string();
        }
    }

    String::new()
}

/// 生成 `T::m` 形式的基础限定名，没有类型时只返回方法名
///
/// ```
/// use aspectx::aop::basic_qualifier_from_method;
///
/// assert_eq!(basic_qualifier_from_method("app::UserService::get_user"), "UserService::get_user");
/// assert_eq!(basic_qualifier_from_method("app::handlers::index"), "index");
/// ```
pub fn basic_qualifier_from_method(full: &str) -> String {
    let method = method_name_from_full_path(full);
    let type_name = type_name_from_method(full);
    if type_name.is_empty() {
        method.to_string()
    } else {
        format!("{}::{}", type_name, method)
    }
}

fn last_segment(path: &str) -> &str {
    split_path(path).last().copied().unwrap_or(path)
}

// 向前查找尚未闭合的 `<`
fn matching_open_angle(prefix: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in prefix.bytes().enumerate().rev() {
        match b {
            b'>' => depth += 1,
            b'<' if depth == 0 => return Some(i),
            b'<' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn strip_generics(segment: &str) -> &str {
    segment.split('<').next().unwrap_or(segment)
}

// 按顶层的 `::` 切分，忽略尖括号内部的分隔符
fn split_path(path: &str) -> Vec<&str> {
    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                segments.push(&path[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&path[start..]);
    segments
}
