//! 驱动层模块
//!
//! 本模块提供试验机控制层的遥测与广播功能，包括：
//! - 遥测聚合（逐寄存器读取 → 一致的快照，断连降级）
//! - 通知分发（订阅者注册表、channel sink）
//! - 广播与重连循环（独立线程，ArcSwap 发布最新快照）
//!
//! # 使用场景
//!
//! 大多数调用方应该使用 `stiffrig-client` 提供的 `RigContext`，它会组装本模块的组件。

pub mod broadcast;
mod error;
pub mod notify;
pub mod telemetry;

pub use broadcast::{
    BroadcastHandle, BroadcastLoop, LoopConfig, LoopMetrics, LoopMetricsSnapshot, emit_alarm,
    emit_test_complete,
};
pub use error::DriverError;
pub use notify::{
    ChannelSink, JogDirection, Notification, NotificationSink, SinkRegistry, SubscriberId, Topic,
};
pub use telemetry::{
    AlarmStatus, ControllerInfo, ParameterUpdate, SafetyStatus, StepStatus, TelemetryAggregator,
    TelemetrySnapshot, TestParameters, TestResults,
};
