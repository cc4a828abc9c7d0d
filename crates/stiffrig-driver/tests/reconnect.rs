//! 广播循环重连行为测试

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use stiffrig_driver::{
    BroadcastLoop, ChannelSink, LoopConfig, Notification, SinkRegistry, TelemetryAggregator,
    TelemetrySnapshot,
};
use stiffrig_protocol::{HardwareProfile, RegisterMap};
use stiffrig_session::{SessionHandle, SimulatedSession};

fn connection_events(rx: &crossbeam_channel::Receiver<Notification>) -> Vec<bool> {
    rx.try_iter()
        .filter_map(|n| match n {
            Notification::ConnectionStatus(status) => Some(status.connected),
            _ => None,
        })
        .collect()
}

#[test]
fn reconnect_mid_run_emits_exactly_one_connected_event() {
    let sim = SimulatedSession::disconnected("192.168.0.1");
    // 前两次重连失败，第三次成功
    sim.script_connect([false, false, true]);

    let session = SessionHandle::new(sim.clone());
    let aggregator =
        TelemetryAggregator::new(session.clone(), RegisterMap::for_profile(HardwareProfile::Servo));
    let sinks = Arc::new(SinkRegistry::new());
    let (sink, rx) = ChannelSink::bounded(1024);
    sinks.subscribe(Arc::new(sink));

    let latest = Arc::new(ArcSwap::from_pointee(TelemetrySnapshot::disconnected(
        session.address(),
    )));
    let mut broadcast = BroadcastLoop::new(
        aggregator,
        sinks,
        latest.clone(),
        LoopConfig {
            tick: Duration::from_millis(100),
            reconnect_threshold: 50,
        },
    );

    // 149 个节拍：两次失败的尝试（第 50、100 个节拍）
    for _ in 0..149 {
        broadcast.tick();
    }
    assert_eq!(sim.connect_attempts(), 2);
    assert!(connection_events(&rx).is_empty());
    assert!(!latest.load().connected);

    // 第 150 个节拍：重连成功，立即发布一次
    broadcast.tick();
    assert_eq!(sim.connect_attempts(), 3);
    assert_eq!(connection_events(&rx), vec![true]);
    assert!(latest.load().connected);

    // 之后保持连接，不再重复发布
    for _ in 0..100 {
        broadcast.tick();
    }
    assert!(connection_events(&rx).is_empty());
    assert_eq!(sim.connect_attempts(), 3);
}

#[test]
fn external_reconnect_is_reported_on_next_tick() {
    let sim = SimulatedSession::disconnected("192.168.0.1");
    sim.set_connect_default(false);
    let session = SessionHandle::new(sim.clone());
    let aggregator =
        TelemetryAggregator::new(session, RegisterMap::for_profile(HardwareProfile::Servo));
    let sinks = Arc::new(SinkRegistry::new());
    let (sink, rx) = ChannelSink::bounded(1024);
    sinks.subscribe(Arc::new(sink));
    let latest = Arc::new(ArcSwap::from_pointee(TelemetrySnapshot::disconnected("x")));
    let mut broadcast = BroadcastLoop::new(aggregator, sinks, latest, LoopConfig::default());

    for _ in 0..10 {
        broadcast.tick();
    }
    assert!(connection_events(&rx).is_empty());

    // 连接由其他途径恢复
    sim.set_connected(true);
    broadcast.tick();
    broadcast.tick();
    assert_eq!(connection_events(&rx), vec![true]);
    assert_eq!(sim.connect_attempts(), 0);
}
