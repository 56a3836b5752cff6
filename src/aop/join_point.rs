//! Join point 注册表和按方法的解析缓存

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::advice::Advice;
use super::pointcut::Pointcut;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// 一个已注册的 (pointcut, advice) 对
#[derive(Clone)]
pub struct JoinPoint {
    pointcut: Arc<dyn Pointcut>,
    advice: Arc<dyn Advice>,
    seq: u64,
}

impl JoinPoint {
    pub fn new(pointcut: Arc<dyn Pointcut>, advice: Arc<dyn Advice>) -> Self {
        Self {
            pointcut,
            advice,
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn pointcut(&self) -> &Arc<dyn Pointcut> {
        &self.pointcut
    }

    pub fn advice(&self) -> &Arc<dyn Advice> {
        &self.advice
    }

    /// 注册序号，进程内单调递增
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn matches(&self, method: &str) -> bool {
        self.pointcut.matches(method)
    }
}

impl fmt::Debug for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("pointcut", &self.pointcut.describe())
            .field("seq", &self.seq)
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    join_points: Vec<JoinPoint>,
    cache: HashMap<String, Arc<[JoinPoint]>>,
}

/// 有序的 join point 列表，加上 method -> 匹配结果 的缓存
///
/// 命中缓存只需读锁；未命中或注册新 join point 时取写锁。
/// 注册时会用新的 pointcut 重新测试所有已缓存的方法，保证缓存与全量扫描结果一致
#[derive(Default)]
pub struct JoinPointRegistry {
    state: RwLock<RegistryState>,
}

impl JoinPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个 join point，重复注册的 advice 会被调用多次
    pub fn register(&self, join_point: JoinPoint) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        for (method, cached) in state.cache.iter_mut() {
            if join_point.matches(method) {
                let mut extended = cached.to_vec();
                extended.push(join_point.clone());
                *cached = Arc::from(extended);
            }
        }

        tracing::debug!(
            pointcut = %join_point.pointcut.describe(),
            seq = join_point.seq,
            "join point registered"
        );
        state.join_points.push(join_point);
    }

    /// 按注册顺序返回匹配 `method` 的所有 join point
    pub fn resolve(&self, method: &str) -> Arc<[JoinPoint]> {
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = state.cache.get(method) {
                return Arc::clone(cached);
            }
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // 获取写锁期间可能已被其他线程填充
        if let Some(cached) = state.cache.get(method) {
            return Arc::clone(cached);
        }

        let matched: Arc<[JoinPoint]> = state
            .join_points
            .iter()
            .filter(|jp| jp.matches(method))
            .cloned()
            .collect();
        state.cache.insert(method.to_string(), Arc::clone(&matched));
        matched
    }

    /// 不经过缓存的全量扫描
    pub fn resolve_uncached(&self, method: &str) -> Vec<JoinPoint> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .join_points
            .iter()
            .filter(|jp| jp.matches(method))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .join_points
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清空所有 join point 和缓存
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.join_points.clear();
        state.cache.clear();
    }
}

impl fmt::Debug for JoinPointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("JoinPointRegistry")
            .field("join_points", &state.join_points)
            .field("cached_methods", &state.cache.len())
            .finish()
    }
}
