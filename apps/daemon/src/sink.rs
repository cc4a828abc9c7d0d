//! 日志订阅者
//!
//! 守护进程自身作为一个订阅者：连接、报警、试验完成事件写 info/warn 日志，
//! 实时数据按间隔输出摘要，`trace` 级别输出完整 JSON。

use std::sync::atomic::{AtomicU64, Ordering};

use stiffrig_driver::{DriverError, Notification, NotificationSink};
use tracing::{info, trace, warn};

pub struct LogSink {
    summary_every: u64,
    live_count: AtomicU64,
}

impl LogSink {
    /// `summary_every`：每隔多少条实时数据输出一次摘要（0 = 不输出）
    pub fn new(summary_every: u64) -> Self {
        Self {
            summary_every,
            live_count: AtomicU64::new(0),
        }
    }
}

impl NotificationSink for LogSink {
    fn publish(&self, notification: &Notification) -> Result<(), DriverError> {
        match notification {
            Notification::LiveData(snapshot) => {
                let n = self.live_count.fetch_add(1, Ordering::Relaxed) + 1;
                if self.summary_every > 0 && n % self.summary_every == 0 {
                    info!(
                        "[live #{}] connected={} cpu={} force={:.3} kN position={:.2} mm remote={} safety_ok={}",
                        n,
                        snapshot.connected,
                        snapshot.controller.cpu_state,
                        snapshot.force.kn,
                        snapshot.position.servo,
                        snapshot.mode.remote,
                        snapshot.safety.safety_ok
                    );
                }
                if tracing::enabled!(tracing::Level::TRACE)
                    && let Ok(json) = serde_json::to_string(snapshot.as_ref())
                {
                    trace!("live_data {}", json);
                }
            },
            Notification::ConnectionStatus(status) => {
                if status.connected {
                    info!("Controller {} online", status.address);
                } else {
                    warn!("Controller {} offline", status.address);
                }
            },
            Notification::Alarm(alarm) => warn!("Alarm {}: {}", alarm.code, alarm.message),
            Notification::TestComplete(results) => info!(
                "Test complete: ring stiffness {:.3} kN/m², SN {}, passed={}",
                results.ring_stiffness, results.sn_class, results.test_passed
            ),
            other => trace!("{} notification", other.topic()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stiffrig_driver::TelemetrySnapshot;

    #[test]
    fn test_log_sink_counts_live_data() {
        let sink = LogSink::new(2);
        let snapshot = Arc::new(TelemetrySnapshot::disconnected("sim"));
        for _ in 0..5 {
            sink.publish(&Notification::LiveData(snapshot.clone())).unwrap();
        }
        sink.publish(&Notification::connection_status(true, "sim")).unwrap();
        assert_eq!(sink.live_count.load(Ordering::Relaxed), 5);
    }
}
