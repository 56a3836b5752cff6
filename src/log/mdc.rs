//! MDC（mapped diagnostic context）
//!
//! 保存在 Scope 中的键值对，同一调用链上通过 `Logger::log_scoped` 输出的每条日志都会带上它们。
//! Scope 按值传递，嵌套调用继承外层的 MDC，内层的修改不会影响外层

use std::collections::BTreeMap;

use crate::aop::Scope;
use crate::log::log_record::MetadataValue;

/// 一组按键排序的诊断字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mdc(BTreeMap<String, MetadataValue>);

impl Mdc {
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    fn insert(&mut self, key: String, value: MetadataValue) {
        self.0.insert(key, value);
    }
}

impl IntoIterator for Mdc {
    type Item = (String, MetadataValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, MetadataValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// 批量添加 MDC 字段，同名字段被覆盖
///
/// ```ignore
/// let scope = add_mdc(scope, [("request_id", "r-1"), ("tenant", "acme")]);
/// ```
pub fn add_mdc<K, V>(mut scope: Scope, values: impl IntoIterator<Item = (K, V)>) -> Scope
where
    K: Into<String>,
    V: Into<MetadataValue>,
{
    let mut current = scope.remove::<Mdc>().unwrap_or_default();
    for (key, value) in values {
        current.insert(key.into(), value.into());
    }
    scope.insert(current);
    scope
}

/// 添加单个 MDC 字段
pub fn add_mdc_value(
    scope: Scope,
    key: impl Into<String>,
    value: impl Into<MetadataValue>,
) -> Scope {
    add_mdc(scope, [(key.into(), value.into())])
}

/// 读取 Scope 中的 MDC，没有时返回空集合
pub fn mdc(scope: &Scope) -> Mdc {
    scope.get::<Mdc>().cloned().unwrap_or_default()
}
