//! 广播与重连循环
//!
//! 单个后台线程按固定节拍执行 [`BroadcastLoop::tick`]：
//!
//! 1. 断连：重连计数器 +1，达到阈值后清零并尝试重连；成功则发布连接事件
//! 2. 已连接且上次观察为断连：发布连接事件（覆盖任何途径完成的重连）
//! 3. 读取快照，写入 `ArcSwap`，推送给所有订阅者
//!
//! 单次节拍中的 panic 被捕获并记录，循环继续运行。
//! 停止是协作式的：`running` 标志只在节拍之间检查，不会中断进行中的读写。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tracing::{debug, error, info, trace, warn};

use crate::error::DriverError;
use crate::notify::{AlarmEvent, Notification, SinkRegistry};
use crate::telemetry::{TelemetryAggregator, TelemetrySnapshot, TestResults};

/// 循环配置（POD）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// 节拍周期
    pub tick: Duration,
    /// 断连状态下每隔多少个节拍尝试一次重连（至少为 1）
    pub reconnect_threshold: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            reconnect_threshold: 50,
        }
    }
}

/// 循环计数器
#[derive(Debug, Default)]
pub struct LoopMetrics {
    pub ticks: AtomicU64,
    pub reconnect_attempts: AtomicU64,
    pub reconnect_successes: AtomicU64,
    pub tick_panics: AtomicU64,
    /// 节拍执行时间超过周期的次数
    pub overruns: AtomicU64,
}

/// [`LoopMetrics`] 的快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopMetricsSnapshot {
    pub ticks: u64,
    pub reconnect_attempts: u64,
    pub reconnect_successes: u64,
    pub tick_panics: u64,
    pub overruns: u64,
}

impl LoopMetrics {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        LoopMetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            reconnect_successes: self.reconnect_successes.load(Ordering::Relaxed),
            tick_panics: self.tick_panics.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

/// 广播循环状态
///
/// 重连计数器与"上次观察到的连接状态"只存在于循环生命周期内，不持久化。
pub struct BroadcastLoop {
    aggregator: TelemetryAggregator,
    sinks: Arc<SinkRegistry>,
    latest: Arc<ArcSwap<TelemetrySnapshot>>,
    metrics: Arc<LoopMetrics>,
    config: LoopConfig,
    reconnect_counter: u32,
    last_connected: bool,
}

impl BroadcastLoop {
    pub fn new(
        aggregator: TelemetryAggregator,
        sinks: Arc<SinkRegistry>,
        latest: Arc<ArcSwap<TelemetrySnapshot>>,
        config: LoopConfig,
    ) -> Self {
        Self {
            aggregator,
            sinks,
            latest,
            metrics: Arc::new(LoopMetrics::default()),
            config: LoopConfig {
                reconnect_threshold: config.reconnect_threshold.max(1),
                ..config
            },
            reconnect_counter: 0,
            last_connected: false,
        }
    }

    pub fn metrics(&self) -> Arc<LoopMetrics> {
        self.metrics.clone()
    }

    /// 上次观察到的连接状态
    pub fn last_connected(&self) -> bool {
        self.last_connected
    }

    /// 执行一个节拍
    pub fn tick(&mut self) {
        self.metrics.ticks.fetch_add(1, Ordering::Relaxed);
        let session = self.aggregator.session();

        if session.is_connected() {
            self.reconnect_counter = 0;
            if !self.last_connected {
                self.last_connected = true;
                info!("Controller at {} connected", session.address());
                self.sinks
                    .publish(&Notification::connection_status(true, session.address()));
            }
        } else {
            if self.last_connected {
                self.last_connected = false;
                warn!("Controller at {} disconnected", session.address());
                self.sinks
                    .publish(&Notification::connection_status(false, session.address()));
            }

            self.reconnect_counter += 1;
            if self.reconnect_counter >= self.config.reconnect_threshold {
                self.reconnect_counter = 0;
                self.metrics.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
                info!("Attempting to reconnect to controller at {}...", session.address());

                if session.connect() {
                    self.metrics.reconnect_successes.fetch_add(1, Ordering::Relaxed);
                    self.last_connected = true;
                    info!("Reconnected to controller at {}", session.address());
                    self.sinks
                        .publish(&Notification::connection_status(true, session.address()));
                } else {
                    debug!("Reconnect to {} failed, retrying later", session.address());
                }
            }
        }

        let snapshot = Arc::new(self.aggregator.snapshot());
        self.latest.store(snapshot.clone());
        let delivered = self.sinks.publish(&Notification::LiveData(snapshot));
        trace!("Live data delivered to {} subscriber(s)", delivered);
    }

    /// 在当前线程运行，直到 `running` 变为 false
    pub fn run(mut self, running: Arc<AtomicBool>) {
        info!(
            "Broadcast loop started (tick: {:?}, reconnect every {} ticks)",
            self.config.tick, self.config.reconnect_threshold
        );

        let mut next_tick = Instant::now();
        while running.load(Ordering::Acquire) {
            if catch_unwind(AssertUnwindSafe(|| self.tick())).is_err() {
                self.metrics.tick_panics.fetch_add(1, Ordering::Relaxed);
                error!("Broadcast tick panicked, continuing");
            }

            next_tick += self.config.tick;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                // 落后超过一个周期时不追赶，从当前时刻重新对齐
                self.metrics.overruns.fetch_add(1, Ordering::Relaxed);
                next_tick = now;
            }
        }

        info!("Broadcast loop stopped");
    }

    /// 在独立线程中运行
    pub fn spawn(self, running: Arc<AtomicBool>) -> Result<BroadcastHandle, DriverError> {
        running.store(true, Ordering::Release);
        let flag = running.clone();
        let thread = std::thread::Builder::new()
            .name("stiffrig-broadcast".to_string())
            .spawn(move || self.run(flag))?;

        Ok(BroadcastHandle {
            running,
            thread: Some(thread),
        })
    }
}

/// 后台广播线程句柄
///
/// Drop 时停止循环并等待线程退出（最多一个节拍）。
pub struct BroadcastHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl BroadcastHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 停止循环并等待线程退出
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("Broadcast thread panicked during shutdown");
        }
    }
}

impl Drop for BroadcastHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 试验完成事件：推送给所有订阅者
pub fn emit_test_complete(sinks: &SinkRegistry, results: TestResults) {
    info!(
        "Test complete: ring stiffness {:.3}, SN {}, passed: {}",
        results.ring_stiffness, results.sn_class, results.test_passed
    );
    sinks.publish(&Notification::TestComplete(results));
}

/// 报警事件：推送给所有订阅者
pub fn emit_alarm(sinks: &SinkRegistry, code: i16, message: impl Into<String>) {
    let message = message.into();
    warn!("Alarm {}: {}", code, message);
    sinks.publish(&Notification::Alarm(AlarmEvent { code, message }));
}
