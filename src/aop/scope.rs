//! 调用链作用域：aspect frame 栈和 Advice 的附加状态

use std::fmt;
use std::sync::Arc;

use super::join_point::JoinPoint;
use super::method::{basic_qualifier_from_method, method_name_from_full_path, type_name_from_method};

/// 一次正在执行的被织入调用
///
/// 在 `before` 中创建，在 `after` 中丢弃，期间对 Advice 只读
pub struct AspectFrame {
    method_name: String,
    calling_method_name: String,
    service_name: Arc<str>,
    join_points: Arc<[JoinPoint]>,
}

impl AspectFrame {
    pub(crate) fn new(
        method_name: impl Into<String>,
        calling_method_name: impl Into<String>,
        service_name: Arc<str>,
        join_points: Arc<[JoinPoint]>,
    ) -> Self {
        Self {
            method_name: method_name.into(),
            calling_method_name: calling_method_name.into(),
            service_name,
            join_points,
        }
    }

    /// 当前执行方法的完整标识
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// 外层被织入方法的完整标识，没有外层时为 `"Unknown"`
    pub fn calling_method_name(&self) -> &str {
        &self.calling_method_name
    }

    /// 创建该 frame 的 AspectManager 的服务名
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn simple_method_name(&self) -> &str {
        method_name_from_full_path(&self.method_name)
    }

    pub fn simple_calling_method_name(&self) -> &str {
        method_name_from_full_path(&self.calling_method_name)
    }

    pub fn type_name(&self) -> String {
        type_name_from_method(&self.method_name)
    }

    /// `Type::method` 形式的限定名
    pub fn qualifier(&self) -> String {
        basic_qualifier_from_method(&self.method_name)
    }

    /// 匹配到的 join point，按注册顺序
    pub fn join_points(&self) -> &[JoinPoint] {
        &self.join_points
    }
}

impl fmt::Debug for AspectFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AspectFrame")
            .field("method_name", &self.method_name)
            .field("calling_method_name", &self.calling_method_name)
            .field("join_points", &self.join_points.len())
            .finish()
    }
}

/// 调用链作用域
///
/// 按值在调用链中传递：`before` 消费一个 Scope 并返回压栈后的 Scope，
/// `after` 消费它并返回出栈后的 Scope。调用方手里的 Scope 从不被修改，
/// 因此丢失的 `after` 不会留下过期的 frame。
///
/// 除 frame 栈外，Scope 还携带一个按类型索引的扩展表，
/// Advice 用它保存单次调用的状态（开始时间、span、MDC 等），嵌套调用会继承
#[derive(Clone, Default)]
pub struct Scope {
    frames: Vec<Arc<AspectFrame>>,
    extensions: http::Extensions,
    // 正在执行钩子的 join point 序号，只在钩子执行期间有值
    active_join_point: Option<u64>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 栈顶 frame，即最内层正在执行的被织入调用
    pub fn current_frame(&self) -> Option<Arc<AspectFrame>> {
        self.frames.last().cloned()
    }

    /// 活跃 frame 数量
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// 从栈顶到栈底遍历 frame
    pub fn frames(&self) -> impl Iterator<Item = &Arc<AspectFrame>> {
        self.frames.iter().rev()
    }

    pub(crate) fn push_frame(&mut self, frame: AspectFrame) {
        self.frames.push(Arc::new(frame));
    }

    pub(crate) fn pop_frame(&mut self) -> Option<Arc<AspectFrame>> {
        self.frames.pop()
    }

    /// 正在执行钩子的 join point 序号
    ///
    /// AspectManager 在调用每个钩子前设置，钩子之外为 `None`
    pub fn active_join_point(&self) -> Option<u64> {
        self.active_join_point
    }

    pub(crate) fn set_active_join_point(&mut self, seq: Option<u64>) {
        self.active_join_point = seq;
    }

    /// 保存一个附加值，同类型的旧值会被替换并返回
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }

    /// 链式版本的 [`Scope::insert`]
    pub fn with<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions.get_mut::<T>()
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions.remove::<T>()
    }

    /// 为当前 frame 保存一个值
    ///
    /// 与 [`Scope::insert`] 不同，每层嵌套调用各自保存一份，
    /// 内层调用的值不会覆盖外层的值。同一 frame 上的多个 join point
    /// 按序号各自保存，同类型的 Advice 重复注册也互不干扰。
    /// Advice 在 `before` 中保存，在 `after` 中取回
    pub fn insert_frame_local<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        let key = self.slot_key();
        if self.extensions.get::<FrameSlots<T>>().is_none() {
            self.extensions.insert(FrameSlots::<T>(Vec::new()));
        }
        let Some(slots) = self.extensions.get_mut::<FrameSlots<T>>() else {
            return;
        };
        // 丢弃已经结束的更深层调用，以及同一位置上遗留的旧值
        slots.0.retain(|(k, _)| k.depth < key.depth || (k.depth == key.depth && *k != key));
        slots.0.push((key, value));
    }

    /// 当前 frame 保存的值
    pub fn frame_local<T: Send + Sync + 'static>(&self) -> Option<&T> {
        let key = self.slot_key();
        self.extensions
            .get::<FrameSlots<T>>()?
            .0
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// 外层 frame 保存的最近一个值
    pub fn enclosing_frame_local<T: Send + Sync + 'static>(&self) -> Option<&T> {
        let depth = self.depth();
        self.extensions
            .get::<FrameSlots<T>>()?
            .0
            .iter()
            .rev()
            .find(|(k, _)| k.depth < depth)
            .map(|(_, v)| v)
    }

    /// 取出当前 frame 保存的值
    pub fn take_frame_local<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        let key = self.slot_key();
        let slots = self.extensions.get_mut::<FrameSlots<T>>()?;
        let index = slots.0.iter().rposition(|(k, _)| *k == key)?;
        Some(slots.0.remove(index).1)
    }

    fn slot_key(&self) -> SlotKey {
        SlotKey {
            depth: self.depth(),
            join_point: self.active_join_point,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct SlotKey {
    depth: usize,
    join_point: Option<u64>,
}

// 按深度递增
#[derive(Clone)]
struct FrameSlots<T>(Vec<(SlotKey, T)>);

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("frames", &self.frames)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
