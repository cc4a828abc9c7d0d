//! 通知分发
//!
//! 广播循环与外部协作方通过 [`SinkRegistry::publish`] 把 [`Notification`] 推送给所有订阅者。
//! 订阅者实现 [`NotificationSink`]；传输层（WebSocket 等）为每个连接注册一个 sink。
//!
//! # 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use stiffrig_driver::notify::{ChannelSink, Notification, SinkRegistry, Topic};
//!
//! let registry = SinkRegistry::new();
//! let (sink, rx) = ChannelSink::bounded(16);
//! let id = registry.subscribe(Arc::new(sink.with_topics(&[Topic::ConnectionStatus])));
//!
//! registry.publish(&Notification::connection_status(true, "192.168.0.1"));
//! assert_eq!(rx.try_recv().unwrap().topic(), Topic::ConnectionStatus);
//!
//! registry.unsubscribe(id);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use stiffrig_protocol::RejectReason;
use tracing::{trace, warn};

use crate::error::DriverError;
use crate::telemetry::{TelemetrySnapshot, TestResults};

/// 通知主题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    LiveData,
    ConnectionStatus,
    TestComplete,
    Alarm,
    JogRejected,
    JogResponse,
    JogSpeedResponse,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::LiveData => "live_data",
            Topic::ConnectionStatus => "connection_status",
            Topic::TestComplete => "test_complete",
            Topic::Alarm => "alarm",
            Topic::JogRejected => "jog_rejected",
            Topic::JogResponse => "jog_response",
            Topic::JogSpeedResponse => "jog_speed_response",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 点动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JogDirection {
    Forward,
    Backward,
}

impl JogDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            JogDirection::Forward => "forward",
            JogDirection::Backward => "backward",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            JogDirection::Forward => JogDirection::Backward,
            JogDirection::Backward => JogDirection::Forward,
        }
    }
}

impl fmt::Display for JogDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(rename = "ip")]
    pub address: String,
}

/// 报警事件（由外部观察方触发）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmEvent {
    pub code: i16,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JogRejected {
    pub direction: JogDirection,
    pub reason: RejectReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JogResponse {
    pub direction: JogDirection,
    pub state: bool,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JogSpeedResponse {
    /// 实际写入的速度（钳位后）
    pub velocity: f32,
    pub success: bool,
}

/// 通知
///
/// 序列化为 `{"topic": "...", "payload": {...}}`。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "topic", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    LiveData(Arc<TelemetrySnapshot>),
    ConnectionStatus(ConnectionStatus),
    TestComplete(TestResults),
    Alarm(AlarmEvent),
    JogRejected(JogRejected),
    JogResponse(JogResponse),
    JogSpeedResponse(JogSpeedResponse),
}

impl Notification {
    pub fn connection_status(connected: bool, address: impl Into<String>) -> Self {
        Notification::ConnectionStatus(ConnectionStatus {
            connected,
            address: address.into(),
        })
    }

    pub fn topic(&self) -> Topic {
        match self {
            Notification::LiveData(_) => Topic::LiveData,
            Notification::ConnectionStatus(_) => Topic::ConnectionStatus,
            Notification::TestComplete(_) => Topic::TestComplete,
            Notification::Alarm(_) => Topic::Alarm,
            Notification::JogRejected(_) => Topic::JogRejected,
            Notification::JogResponse(_) => Topic::JogResponse,
            Notification::JogSpeedResponse(_) => Topic::JogSpeedResponse,
        }
    }
}

/// 通知接收端
///
/// `publish` 在广播线程中调用，实现应尽快返回（推荐 `try_send`）。
pub trait NotificationSink: Send + Sync {
    /// 推送一条通知
    ///
    /// 返回 [`DriverError::SinkDisconnected`] 表示该订阅者已失效，注册表会将其移除。
    fn publish(&self, notification: &Notification) -> Result<(), DriverError>;

    /// 是否订阅该主题（默认全部）
    fn accepts(&self, topic: Topic) -> bool {
        let _ = topic;
        true
    }
}

/// 基于 crossbeam channel 的 sink
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<Notification>,
    topics: Option<Vec<Topic>>,
}

impl ChannelSink {
    /// 创建有界 channel，满时丢弃新通知（下一个节拍会有新的快照）
    pub fn bounded(capacity: usize) -> (Self, Receiver<Notification>) {
        let (sender, receiver) = bounded(capacity);
        (
            Self {
                sender,
                topics: None,
            },
            receiver,
        )
    }

    /// 只接收指定主题
    pub fn with_topics(mut self, topics: &[Topic]) -> Self {
        self.topics = Some(topics.to_vec());
        self
    }
}

impl NotificationSink for ChannelSink {
    fn publish(&self, notification: &Notification) -> Result<(), DriverError> {
        match self.sender.try_send(notification.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                trace!("Channel sink full, dropping {} notification", dropped.topic());
                Ok(())
            },
            Err(TrySendError::Disconnected(_)) => {
                Err(DriverError::SinkDisconnected("channel receiver dropped".to_string()))
            },
        }
    }

    fn accepts(&self, topic: Topic) -> bool {
        self.topics.as_ref().is_none_or(|topics| topics.contains(&topic))
    }
}

/// 订阅者 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber#{}", self.0)
    }
}

/// 订阅者注册表
///
/// 内部使用读写锁：发布只持读锁，失效订阅者在发布结束后统一移除。
#[derive(Default)]
pub struct SinkRegistry {
    sinks: RwLock<Vec<(SubscriberId, Arc<dyn NotificationSink>)>>,
    next_id: AtomicU64,
}

impl fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sink: Arc<dyn NotificationSink>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sinks.write().push((id, sink));
        id
    }

    /// 返回是否确实移除了订阅者
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut sinks = self.sinks.write();
        let before = sinks.len();
        sinks.retain(|(sid, _)| *sid != id);
        sinks.len() != before
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 推送给所有订阅了该主题的 sink，返回成功投递的数量
    pub fn publish(&self, notification: &Notification) -> usize {
        let topic = notification.topic();
        let mut delivered = 0;
        let mut lost = Vec::new();

        for (id, sink) in self.sinks.read().iter() {
            if !sink.accepts(topic) {
                continue;
            }
            match sink.publish(notification) {
                Ok(()) => delivered += 1,
                Err(DriverError::SinkDisconnected(reason)) => {
                    warn!("{} lost ({}), unsubscribing", id, reason);
                    lost.push(*id);
                },
                Err(e) => warn!("Failed to publish {} to {}: {}", topic, id, e),
            }
        }

        if !lost.is_empty() {
            self.sinks.write().retain(|(id, _)| !lost.contains(id));
        }
        delivered
    }
}
