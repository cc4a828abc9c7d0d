//! 试验机上下文
//!
//! 启动时构造一次，持有会话、命令调度器、订阅者注册表和最新快照，
//! 显式传递给需要它们的组件（HTTP/WebSocket 层等）。
//!
//! # Example
//!
//! ```
//! use stiffrig_client::RigBuilder;
//! use stiffrig_session::SimulatedSession;
//! use stiffrig_tools::RigConfig;
//!
//! let rig = RigBuilder::new(SimulatedSession::new("192.168.0.1"))
//!     .config(RigConfig::default())
//!     .build()
//!     .unwrap();
//!
//! let outcome = rig.dispatcher().enable_servo();
//! assert!(outcome.success());
//! ```

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use stiffrig_driver::{
    BroadcastHandle, BroadcastLoop, DriverError, LoopConfig, LoopMetrics, NotificationSink,
    SinkRegistry, SubscriberId, TelemetryAggregator, TelemetrySnapshot, emit_alarm,
    emit_test_complete,
};
use stiffrig_protocol::{HardwareProfile, RegisterMap};
use stiffrig_session::{ControllerSession, SessionHandle};
use stiffrig_tools::{ConfigError, RigConfig};
use tracing::info;

use crate::dispatcher::CommandDispatcher;
use crate::relay::JogRelay;

/// 试验机上下文
pub struct RigContext {
    config: RigConfig,
    session: SessionHandle,
    aggregator: TelemetryAggregator,
    dispatcher: Arc<CommandDispatcher>,
    sinks: Arc<SinkRegistry>,
    latest: Arc<ArcSwap<TelemetrySnapshot>>,
    running: Arc<AtomicBool>,
    broadcast: Mutex<Option<(BroadcastHandle, Arc<LoopMetrics>)>>,
}

impl RigContext {
    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn register_map(&self) -> &'static RegisterMap {
        self.aggregator.register_map()
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn jog_relay(&self) -> JogRelay {
        JogRelay::new(self.dispatcher.clone())
    }

    pub fn sinks(&self) -> &Arc<SinkRegistry> {
        &self.sinks
    }

    pub fn subscribe(&self, sink: Arc<dyn NotificationSink>) -> SubscriberId {
        self.sinks.subscribe(sink)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.sinks.unsubscribe(id)
    }

    /// 广播循环最近一次发布的快照（无锁读取，不访问控制器）
    pub fn latest_snapshot(&self) -> Arc<TelemetrySnapshot> {
        self.latest.load_full()
    }

    /// 广播循环的运行标志（协作式停止）
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// 启动后台广播循环
    pub fn start_broadcast(&self) -> Result<(), DriverError> {
        let mut slot = self.broadcast.lock();
        if slot.as_ref().is_some_and(|(handle, _)| handle.is_running()) {
            return Err(DriverError::AlreadyRunning);
        }
        // 上一次的线程已自行退出，回收后重新启动
        if let Some((handle, _)) = slot.take() {
            handle.stop();
        }

        let config = LoopConfig {
            tick: self.config.broadcast.tick(),
            reconnect_threshold: self.config.broadcast.reconnect_threshold(),
        };
        let broadcast = BroadcastLoop::new(
            self.aggregator.clone(),
            self.sinks.clone(),
            self.latest.clone(),
            config,
        );
        let metrics = broadcast.metrics();
        let handle = broadcast.spawn(self.running.clone())?;
        *slot = Some((handle, metrics));
        Ok(())
    }

    /// 停止广播循环并等待线程退出
    pub fn stop_broadcast(&self) {
        if let Some((handle, metrics)) = self.broadcast.lock().take() {
            handle.stop();
            let stats = metrics.snapshot();
            info!(
                "Broadcast loop finished: {} ticks, {} reconnect attempts, {} panics",
                stats.ticks, stats.reconnect_attempts, stats.tick_panics
            );
        }
    }

    pub fn is_broadcasting(&self) -> bool {
        self.broadcast
            .lock()
            .as_ref()
            .is_some_and(|(handle, _)| handle.is_running())
    }

    /// 读取试验结果并通知所有订阅者
    pub fn emit_test_complete(&self) {
        emit_test_complete(&self.sinks, self.dispatcher.test_results());
    }

    /// 通知所有订阅者发生报警
    pub fn emit_alarm(&self, code: i16, message: impl Into<String>) {
        emit_alarm(&self.sinks, code, message);
    }
}

impl Drop for RigContext {
    fn drop(&mut self) {
        self.stop_broadcast();
    }
}

/// [`RigContext`] 构造器
pub struct RigBuilder {
    session: SessionHandle,
    config: RigConfig,
    profile: Option<HardwareProfile>,
}

impl RigBuilder {
    pub fn new(session: impl ControllerSession + Send + 'static) -> Self {
        Self::from_handle(SessionHandle::new(session))
    }

    /// 使用已有的会话句柄（与其他组件共享同一会话）
    pub fn from_handle(session: SessionHandle) -> Self {
        Self {
            session,
            config: RigConfig::default(),
            profile: None,
        }
    }

    pub fn config(mut self, config: RigConfig) -> Self {
        self.config = config;
        self
    }

    /// 覆盖配置中的控制器版本
    pub fn profile(mut self, profile: HardwareProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn build(self) -> Result<RigContext, ConfigError> {
        let mut config = self.config;
        if let Some(profile) = self.profile {
            config.controller.profile = profile;
        }
        config.validate()?;

        let map = RegisterMap::for_profile(config.controller.profile);
        let aggregator = TelemetryAggregator::new(self.session.clone(), map);
        let dispatcher = Arc::new(CommandDispatcher::new(
            aggregator.clone(),
            config.jog,
            config.step,
            config.pulse,
        ));
        let latest = Arc::new(ArcSwap::from_pointee(TelemetrySnapshot::disconnected(
            self.session.address(),
        )));

        info!(
            "Rig context ready (controller: {}, profile: {})",
            self.session.address(),
            map.profile.as_str()
        );

        Ok(RigContext {
            config,
            session: self.session,
            aggregator,
            dispatcher,
            sinks: Arc::new(SinkRegistry::new()),
            latest,
            running: Arc::new(AtomicBool::new(false)),
            broadcast: Mutex::new(None),
        })
    }
}
