use crate::cfg::TypeOptions;
use crate::log::appender::{create_appender_from_options, LogAppender};
use anyhow::{anyhow, Result};
use crossbeam::channel::{self, Receiver, Sender};
use serde::Deserialize;
use smart_default::SmartDefault;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;

/// ChannelAppender 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct ChannelAppenderConfig {
    /// 队列容量，0 表示无界；队列满时 append 会阻塞
    #[default = 0]
    pub capacity: usize,

    /// 实际写入的下游 Appender
    #[default(TypeOptions::of("ConsoleAppender"))]
    pub appender: TypeOptions,
}

enum Message {
    Line(String),
    Flush(Sender<()>),
}

/// 异步投递的 Appender
///
/// 多个生产者把日志行写入 crossbeam channel，由单个后台线程按顺序交给下游 Appender。
/// `flush` 在队列中放入一个标记，等消费线程处理到它时返回，
/// 因此返回时之前 append 的所有日志都已写入下游
pub struct ChannelAppender {
    sender: RwLock<Option<Sender<Message>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    downstream: Arc<dyn LogAppender>,
}

impl ChannelAppender {
    pub fn new(config: ChannelAppenderConfig) -> Result<Self> {
        crate::log::ensure_registered();
        let downstream: Arc<dyn LogAppender> =
            Arc::from(create_appender_from_options(&config.appender)?);
        Self::with_appender(downstream, config.capacity)
    }

    /// 包装一个已经构造好的 Appender
    pub fn with_appender(downstream: Arc<dyn LogAppender>, capacity: usize) -> Result<Self> {
        let (tx, rx) = if capacity == 0 {
            channel::unbounded()
        } else {
            channel::bounded(capacity)
        };

        let consumer = Arc::clone(&downstream);
        let worker = std::thread::Builder::new()
            .name("aspectx-log-appender".to_string())
            .spawn(move || consume(rx, consumer))?;

        Ok(Self {
            sender: RwLock::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            downstream,
        })
    }

    fn send(&self, message: Message) -> Result<()> {
        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => tx
                .send(message)
                .map_err(|_| anyhow!("log appender consumer has stopped")),
            None => Err(anyhow!("log appender is closed")),
        }
    }
}

fn consume(rx: Receiver<Message>, downstream: Arc<dyn LogAppender>) {
    for message in rx.iter() {
        match message {
            Message::Line(line) => {
                if let Err(e) = downstream.append(&line) {
                    tracing::warn!(error = %e, "failed to deliver log line");
                }
            }
            Message::Flush(ack) => {
                if let Err(e) = downstream.flush() {
                    tracing::warn!(error = %e, "failed to flush log appender");
                }
                let _ = ack.send(());
            }
        }
    }
}

impl LogAppender for ChannelAppender {
    fn append(&self, formatted_message: &str) -> Result<()> {
        self.send(Message::Line(formatted_message.to_string()))
    }

    fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = channel::bounded(1);
        self.send(Message::Flush(ack_tx))?;
        ack_rx
            .recv()
            .map_err(|_| anyhow!("log appender consumer stopped before flush completed"))
    }

    /// 刷新队列、断开 channel 并等待消费线程退出，可重复调用
    fn close(&self) -> Result<()> {
        let sender = self
            .sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(sender) = sender else {
            return Ok(());
        };
        // 断开后消费线程处理完剩余消息即退出
        drop(sender);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker
                .join()
                .map_err(|_| anyhow!("log appender consumer panicked"))?;
        }

        self.downstream.close()
    }
}

impl Drop for ChannelAppender {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close channel appender");
        }
    }
}

crate::impl_from!(ChannelAppenderConfig => ChannelAppender, fallible);
crate::impl_box_from!(ChannelAppender => dyn LogAppender);
