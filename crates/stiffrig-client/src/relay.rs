//! 订阅者通道上的点动请求
//!
//! 传输层收到订阅者发来的点动请求后交给 [`JogRelay`]，结果通过该订阅者自己的 sink 回复：
//! - 总是回复 `jog_response`
//! - 因本地模式被拒绝时额外回复 `jog_rejected`
//!
//! 订阅者连接断开时传输层调用 [`JogRelay::on_subscriber_lost`]，停止所有点动。

use std::sync::Arc;

use stiffrig_driver::notify::{JogRejected, JogResponse, JogSpeedResponse};
use stiffrig_driver::{JogDirection, Notification, NotificationSink};
use stiffrig_protocol::{CommandOutcome, RejectReason};
use tracing::{debug, warn};

use crate::dispatcher::CommandDispatcher;

#[derive(Debug, Clone)]
pub struct JogRelay {
    dispatcher: Arc<CommandDispatcher>,
}

impl JogRelay {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// 执行点动请求并回复请求方
    pub fn jog(
        &self,
        direction: JogDirection,
        state: bool,
        reply: &dyn NotificationSink,
    ) -> CommandOutcome {
        let outcome = self.dispatcher.jog(direction, state);

        if outcome.reason() == Some(RejectReason::LocalMode) {
            Self::send(
                reply,
                Notification::JogRejected(JogRejected {
                    direction,
                    reason: RejectReason::LocalMode,
                    message: outcome.message().to_string(),
                }),
            );
        }
        Self::send(
            reply,
            Notification::JogResponse(JogResponse {
                direction,
                state,
                success: outcome.success(),
            }),
        );
        outcome
    }

    /// 设置点动速度并回复实际写入的（钳位后）值
    pub fn set_jog_speed(&self, velocity: f32, reply: &dyn NotificationSink) -> CommandOutcome {
        let outcome = self.dispatcher.set_jog_velocity(velocity);
        Self::send(
            reply,
            Notification::JogSpeedResponse(JogSpeedResponse {
                velocity: self.dispatcher.jog_policy().clamp(velocity),
                success: outcome.success(),
            }),
        );
        outcome
    }

    /// 订阅者断开：停止所有点动
    pub fn on_subscriber_lost(&self) -> CommandOutcome {
        warn!("Subscriber lost, stopping all jog");
        self.dispatcher.stop_all_jog()
    }

    fn send(reply: &dyn NotificationSink, notification: Notification) {
        if let Err(e) = reply.publish(&notification) {
            debug!("Could not deliver {} to requester: {}", notification.topic(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stiffrig_driver::{ChannelSink, TelemetryAggregator, Topic};
    use stiffrig_protocol::map::db3;
    use stiffrig_protocol::{HardwareProfile, RegisterMap};
    use stiffrig_session::{SessionHandle, SimulatedSession};
    use stiffrig_tools::{JogPolicy, PulseTiming, StepPolicy};

    fn relay(sim: &SimulatedSession) -> JogRelay {
        let aggregator = TelemetryAggregator::new(
            SessionHandle::new(sim.clone()),
            RegisterMap::for_profile(HardwareProfile::Servo),
        );
        JogRelay::new(Arc::new(CommandDispatcher::new(
            aggregator,
            JogPolicy::default(),
            StepPolicy::default(),
            PulseTiming::default(),
        )))
    }

    #[test]
    fn test_local_mode_jog_sends_rejection_and_response() {
        let sim = SimulatedSession::new("sim");
        let relay = relay(&sim);
        let (sink, rx) = ChannelSink::bounded(8);

        let outcome = relay.jog(JogDirection::Forward, true, &sink);
        assert_eq!(outcome.reason(), Some(RejectReason::LocalMode));

        let replies: Vec<_> = rx.try_iter().collect();
        assert_eq!(replies.len(), 2);
        match &replies[0] {
            Notification::JogRejected(rejected) => {
                assert_eq!(rejected.direction, JogDirection::Forward);
                assert_eq!(rejected.message, "Jog disabled - System in LOCAL mode");
            },
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            replies[1],
            Notification::JogResponse(JogResponse {
                direction: JogDirection::Forward,
                state: true,
                success: false,
            })
        );
    }

    #[test]
    fn test_motion_blocked_sends_only_response() {
        let sim = SimulatedSession::new("sim");
        sim.set_bool(db3::REMOTE_MODE, true);
        let relay = relay(&sim);
        let (sink, rx) = ChannelSink::bounded(8);

        relay.jog(JogDirection::Backward, true, &sink);
        let topics: Vec<_> = rx.try_iter().map(|n| n.topic()).collect();
        assert_eq!(topics, vec![Topic::JogResponse]);
    }

    #[test]
    fn test_jog_speed_reply_carries_clamped_value() {
        let sim = SimulatedSession::new("sim");
        let relay = relay(&sim);
        let (sink, rx) = ChannelSink::bounded(8);

        assert!(relay.set_jog_speed(9000.0, &sink).success());
        match rx.try_recv().unwrap() {
            Notification::JogSpeedResponse(reply) => {
                assert_eq!(reply.velocity, 6000.0);
                assert!(reply.success);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_subscriber_lost_stops_jog() {
        let sim = SimulatedSession::new("sim");
        sim.set_bool(db3::JOG_FORWARD, true);
        let relay = relay(&sim);

        assert!(relay.on_subscriber_lost().success());
        assert!(!sim.get_bool(db3::JOG_FORWARD));
        assert!(!sim.get_bool(db3::JOG_BACKWARD));
    }
}
