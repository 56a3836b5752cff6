use anyhow::Result;

/// 日志输出器 trait
///
/// 负责将格式化后的日志输出到目标介质。
/// 调用发生在被织入方法的执行线程上，实现不应长时间阻塞，
/// 需要异步投递时使用 ChannelAppender 包装
pub trait LogAppender: Send + Sync {
    /// 输出一行日志（不含换行符）
    fn append(&self, formatted_message: &str) -> Result<()>;

    /// 等待之前写入的日志全部落地
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// 刷新并释放资源，之后的 append 可能失败
    fn close(&self) -> Result<()> {
        self.flush()
    }
}
