//! 遥测聚合
//!
//! [`TelemetryAggregator::snapshot`] 逐个读取映射表中的所有状态寄存器，组装成一个
//! [`TelemetrySnapshot`]。
//!
//! # 降级规则
//!
//! - 会话断开：跳过所有读取，返回 [`TelemetrySnapshot::disconnected`]
//! - 已连接但单个字段读取失败：该字段取零值，记录日志，其余字段照常
//! - 聚合过程中会话断开：整份快照退回断连默认值（不混合新旧数据）
//!
//! 断连快照与正常快照的 JSON 结构完全一致，订阅方只需看 `connected` 字段。

use serde::{Deserialize, Serialize};
use stiffrig_protocol::{BitAddress, RegisterMap, WordAddress};
use stiffrig_session::SessionHandle;
use tracing::{debug, trace, warn};

/// 力（kN / N）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ForceGroup {
    pub raw: f32,
    pub actual: f32,
    pub filtered: f32,
    #[serde(rename = "kN")]
    pub kn: f32,
    #[serde(rename = "N")]
    pub n: f32,
}

/// 位移（mm）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PositionGroup {
    pub raw: f32,
    pub actual: f32,
    pub servo: f32,
    pub target: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeflectionGroup {
    pub actual: f32,
    pub percent: f32,
    pub target: f32,
}

/// 试验进程
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TestGroup {
    /// `-1` 表示无数据（断连）
    pub status: i16,
    pub stage: i16,
    pub progress: i16,
    pub recording: bool,
    pub preload_reached: bool,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResultsGroup {
    pub ring_stiffness: f32,
    pub force_at_target: f32,
    pub sn_class: i16,
    pub contact_position: f32,
    #[serde(rename = "data_points")]
    pub data_point_count: i16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ServoGroup {
    pub ready: bool,
    pub error: bool,
    pub enabled: bool,
    pub at_home: bool,
    pub mc_power: bool,
    pub mc_busy: bool,
    pub mc_error: bool,
    #[serde(rename = "speed")]
    pub actual_speed: f32,
    pub jog_velocity: f32,
}

/// 步进运动状态
///
/// 控制器版本不支持步进时恒为默认值。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StepStatus {
    pub distance: f32,
    pub forward_cmd: bool,
    pub backward_cmd: bool,
    pub active: bool,
    pub done: bool,
}

/// 安全位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SafetyStatus {
    pub e_stop: bool,
    pub upper_limit: bool,
    pub lower_limit: bool,
    pub home: bool,
    #[serde(rename = "ok")]
    pub safety_ok: bool,
    pub motion_allowed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClampStatus {
    pub upper: bool,
    pub lower: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeStatus {
    pub remote: bool,
    #[serde(rename = "can_change")]
    pub mode_change_allowed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmStatus {
    pub active: bool,
    pub code: i16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LampStatus {
    pub ready: bool,
    pub running: bool,
    pub error: bool,
}

/// 控制器连接信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerInfo {
    pub connected: bool,
    pub cpu_state: String,
    #[serde(rename = "ip")]
    pub address: String,
}

/// 一次完整的遥测读取
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub force: ForceGroup,
    pub position: PositionGroup,
    pub deflection: DeflectionGroup,
    pub test: TestGroup,
    pub results: ResultsGroup,
    pub servo: ServoGroup,
    pub step: StepStatus,
    pub safety: SafetyStatus,
    pub clamps: ClampStatus,
    pub mode: ModeStatus,
    pub alarm: AlarmStatus,
    pub lamps: LampStatus,
    pub connected: bool,
    #[serde(rename = "plc")]
    pub controller: ControllerInfo,
}

impl TelemetrySnapshot {
    /// 断连默认值：布尔全 false，数值全 0，`test.status = -1`
    pub fn disconnected(address: impl Into<String>) -> Self {
        Self {
            force: ForceGroup::default(),
            position: PositionGroup::default(),
            deflection: DeflectionGroup::default(),
            test: TestGroup {
                status: -1,
                ..TestGroup::default()
            },
            results: ResultsGroup::default(),
            servo: ServoGroup::default(),
            step: StepStatus::default(),
            safety: SafetyStatus::default(),
            clamps: ClampStatus::default(),
            mode: ModeStatus::default(),
            alarm: AlarmStatus::default(),
            lamps: LampStatus::default(),
            connected: false,
            controller: ControllerInfo {
                connected: false,
                cpu_state: "unknown".to_string(),
                address: address.into(),
            },
        }
    }
}

/// 试验参数（DB1）
///
/// 读取失败或读到 0 时使用各字段的出厂值（控制器未初始化的数据块全为 0）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestParameters {
    pub pipe_diameter: f32,
    pub pipe_length: f32,
    pub deflection_percent: f32,
    pub deflection_target: f32,
    pub test_speed: f32,
    pub max_stroke: f32,
    pub max_force: f32,
    pub preload_force: f32,
    pub approach_speed: f32,
    pub contact_speed: f32,
    pub return_speed: f32,
}

impl Default for TestParameters {
    fn default() -> Self {
        Self {
            pipe_diameter: 0.0,
            pipe_length: 300.0,
            deflection_percent: 3.0,
            deflection_target: 0.0,
            test_speed: 12.0,
            max_stroke: 100.0,
            max_force: 50_000.0,
            preload_force: 10.0,
            approach_speed: 50.0,
            contact_speed: 2.0,
            return_speed: 100.0,
        }
    }
}

/// 参数更新：只写入 `Some` 的字段
///
/// `deflection_target` 由控制器根据管径与挠度百分比计算，不可写。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterUpdate {
    pub pipe_diameter: Option<f32>,
    pub pipe_length: Option<f32>,
    pub deflection_percent: Option<f32>,
    pub test_speed: Option<f32>,
    pub max_stroke: Option<f32>,
    pub max_force: Option<f32>,
    pub preload_force: Option<f32>,
    pub approach_speed: Option<f32>,
    pub contact_speed: Option<f32>,
    pub return_speed: Option<f32>,
}

impl ParameterUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// 试验结果（DB2），同时作为试验完成通知的负载
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub ring_stiffness: f32,
    pub force_at_target: f32,
    pub sn_class: i16,
    pub test_passed: bool,
    pub deflection_percent: f32,
}

/// 逐字段读取，失败计数
struct FieldReader<'a> {
    session: &'a SessionHandle,
    unavailable: usize,
}

impl<'a> FieldReader<'a> {
    fn new(session: &'a SessionHandle) -> Self {
        Self {
            session,
            unavailable: 0,
        }
    }

    fn real(&mut self, addr: WordAddress) -> f32 {
        self.session.read_real(addr).unwrap_or_else(|| {
            self.unavailable += 1;
            trace!("Field {} unavailable, using 0.0", addr);
            0.0
        })
    }

    fn int(&mut self, addr: WordAddress) -> i16 {
        self.session.read_int(addr).unwrap_or_else(|| {
            self.unavailable += 1;
            trace!("Field {} unavailable, using 0", addr);
            0
        })
    }

    fn bool(&mut self, addr: BitAddress) -> bool {
        self.session.read_bool(addr).unwrap_or_else(|| {
            self.unavailable += 1;
            trace!("Field {} unavailable, using false", addr);
            false
        })
    }

    /// 读取 REAL，失败或为 0 时使用出厂值
    fn real_or(&mut self, addr: WordAddress, fallback: f32) -> f32 {
        match self.session.read_real(addr) {
            Some(v) if v != 0.0 => v,
            _ => fallback,
        }
    }
}

/// 遥测聚合器
#[derive(Debug, Clone)]
pub struct TelemetryAggregator {
    session: SessionHandle,
    map: &'static RegisterMap,
}

impl TelemetryAggregator {
    pub fn new(session: SessionHandle, map: &'static RegisterMap) -> Self {
        Self { session, map }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn register_map(&self) -> &'static RegisterMap {
        self.map
    }

    /// 读取一份完整快照
    pub fn snapshot(&self) -> TelemetrySnapshot {
        if !self.session.is_connected() {
            return TelemetrySnapshot::disconnected(self.session.address());
        }

        let s = &self.map.status;
        let mut r = FieldReader::new(&self.session);

        let force = ForceGroup {
            raw: r.real(s.force_raw),
            actual: r.real(s.force_actual),
            filtered: r.real(s.force_filtered),
            kn: r.real(s.force_kn),
            n: r.real(s.force_n),
        };
        let position = PositionGroup {
            raw: r.real(s.position_raw),
            actual: r.real(s.position_actual),
            servo: r.real(s.position_servo),
            target: r.real(s.position_target),
        };
        let deflection = DeflectionGroup {
            actual: r.real(s.deflection_actual),
            percent: r.real(s.deflection_percent),
            target: r.real(s.deflection_target),
        };
        let test = TestGroup {
            status: r.int(s.test_status),
            stage: r.int(s.test_stage),
            progress: r.int(s.test_progress),
            recording: r.bool(s.recording_active),
            preload_reached: r.bool(s.preload_reached),
            passed: r.bool(s.test_passed),
        };
        let results = ResultsGroup {
            ring_stiffness: r.real(s.ring_stiffness),
            force_at_target: r.real(s.force_at_target),
            sn_class: r.int(s.sn_class),
            contact_position: r.real(s.contact_position),
            data_point_count: r.int(s.data_point_count),
        };
        let servo = ServoGroup {
            ready: r.bool(s.servo_ready),
            error: r.bool(s.servo_error),
            enabled: r.bool(s.servo_enabled),
            at_home: r.bool(s.at_home),
            mc_power: r.bool(s.mc_power),
            mc_busy: r.bool(s.mc_busy),
            mc_error: r.bool(s.mc_error),
            actual_speed: r.real(s.actual_speed),
            jog_velocity: r.real(s.jog_velocity),
        };
        let step = match self.map.step {
            Some(regs) => StepStatus {
                distance: r.real(regs.distance),
                forward_cmd: r.bool(regs.forward),
                backward_cmd: r.bool(regs.backward),
                active: r.bool(regs.active),
                done: r.bool(regs.done),
            },
            None => StepStatus::default(),
        };
        let safety = SafetyStatus {
            e_stop: r.bool(s.safety.estop),
            upper_limit: r.bool(s.safety.upper_limit),
            lower_limit: r.bool(s.safety.lower_limit),
            home: r.bool(s.safety.home),
            safety_ok: r.bool(s.safety.safety_ok),
            motion_allowed: r.bool(s.safety.motion_allowed),
        };
        let clamps = ClampStatus {
            upper: r.bool(s.clamp_upper),
            lower: r.bool(s.clamp_lower),
        };
        let mode = ModeStatus {
            remote: r.bool(s.remote_mode),
            mode_change_allowed: r.bool(s.mode_change_allowed),
        };
        let alarm = AlarmStatus {
            active: r.bool(s.alarm_active),
            code: r.int(s.alarm_code),
        };
        let lamps = LampStatus {
            ready: r.bool(s.lamp_ready),
            running: r.bool(s.lamp_running),
            error: r.bool(s.lamp_error),
        };
        let unavailable = r.unavailable;

        // 读取期间掉线：不发布半新半旧的数据
        if !self.session.is_connected() {
            warn!("Controller disconnected while reading telemetry, using disconnected defaults");
            return TelemetrySnapshot::disconnected(self.session.address());
        }
        if unavailable > 0 {
            debug!("{} telemetry field(s) unavailable, substituted with zero", unavailable);
        }

        TelemetrySnapshot {
            force,
            position,
            deflection,
            test,
            results,
            servo,
            step,
            safety,
            clamps,
            mode,
            alarm,
            lamps,
            connected: true,
            controller: ControllerInfo {
                connected: true,
                cpu_state: self.session.cpu_state(),
                address: self.session.address().to_string(),
            },
        }
    }

    /// 安全位；断连时全部为 false
    pub fn safety_status(&self) -> SafetyStatus {
        if !self.session.is_connected() {
            return SafetyStatus::default();
        }
        let safety = &self.map.status.safety;
        let mut r = FieldReader::new(&self.session);
        SafetyStatus {
            e_stop: r.bool(safety.estop),
            upper_limit: r.bool(safety.upper_limit),
            lower_limit: r.bool(safety.lower_limit),
            home: r.bool(safety.home),
            safety_ok: r.bool(safety.safety_ok),
            motion_allowed: r.bool(safety.motion_allowed),
        }
    }

    /// 步进状态；断连或不支持步进时为默认值
    pub fn step_status(&self) -> StepStatus {
        match self.map.step {
            Some(regs) if self.session.is_connected() => {
                let mut r = FieldReader::new(&self.session);
                StepStatus {
                    distance: r.real(regs.distance),
                    forward_cmd: r.bool(regs.forward),
                    backward_cmd: r.bool(regs.backward),
                    active: r.bool(regs.active),
                    done: r.bool(regs.done),
                }
            },
            _ => StepStatus::default(),
        }
    }

    /// 远程模式；断连或读取失败时为 false
    pub fn remote_mode(&self) -> bool {
        self.session
            .read_bool(self.map.status.remote_mode)
            .unwrap_or(false)
    }

    /// 读取试验参数
    pub fn parameters(&self) -> TestParameters {
        let defaults = TestParameters::default();
        if !self.session.is_connected() {
            return defaults;
        }
        let p = &self.map.parameters;
        let mut r = FieldReader::new(&self.session);
        TestParameters {
            pipe_diameter: r.real_or(p.pipe_diameter, defaults.pipe_diameter),
            pipe_length: r.real_or(p.pipe_length, defaults.pipe_length),
            deflection_percent: r.real_or(p.deflection_percent, defaults.deflection_percent),
            deflection_target: r.real_or(p.deflection_target, defaults.deflection_target),
            test_speed: r.real_or(p.test_speed, defaults.test_speed),
            max_stroke: r.real_or(p.max_stroke, defaults.max_stroke),
            max_force: r.real_or(p.max_force, defaults.max_force),
            preload_force: r.real_or(p.preload_force, defaults.preload_force),
            approach_speed: r.real_or(p.approach_speed, defaults.approach_speed),
            contact_speed: r.real_or(p.contact_speed, defaults.contact_speed),
            return_speed: r.real_or(p.return_speed, defaults.return_speed),
        }
    }

    /// 读取试验结果
    pub fn test_results(&self) -> TestResults {
        if !self.session.is_connected() {
            return TestResults::default();
        }
        let s = &self.map.status;
        let mut r = FieldReader::new(&self.session);
        TestResults {
            ring_stiffness: r.real(s.ring_stiffness),
            force_at_target: r.real(s.force_at_target),
            sn_class: r.int(s.sn_class),
            test_passed: r.bool(s.test_passed),
            deflection_percent: r.real(s.deflection_percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stiffrig_protocol::HardwareProfile;
    use stiffrig_protocol::map::{db1, db2, db3, db4};
    use stiffrig_session::SimulatedSession;

    fn aggregator(sim: &SimulatedSession) -> TelemetryAggregator {
        TelemetryAggregator::new(
            SessionHandle::new(sim.clone()),
            RegisterMap::for_profile(HardwareProfile::Servo),
        )
    }

    #[test]
    fn test_disconnected_snapshot_defaults() {
        let sim = SimulatedSession::disconnected("192.168.0.1");
        let snapshot = aggregator(&sim).snapshot();

        assert_eq!(snapshot, TelemetrySnapshot::disconnected("192.168.0.1"));
        assert!(!snapshot.connected);
        assert_eq!(snapshot.test.status, -1);
        assert_eq!(snapshot.controller.cpu_state, "unknown");
        assert_eq!(snapshot.controller.address, "192.168.0.1");
    }

    #[test]
    fn test_connected_snapshot_reads_registers() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_real(db2::FORCE_KN, 4.25);
        sim.set_real(db3::ACTUAL_POSITION, 12.5);
        sim.set_int(db2::TEST_STATUS, 2);
        sim.set_int(db2::SN_CLASS, 8000);
        sim.set_bool(db3::SAFETY_OK, true);
        sim.set_bool(db3::REMOTE_MODE, true);
        sim.set_bool(db3::LOCK_UPPER, true);
        sim.set_bool(db3::STEP_ACTIVE, true);
        sim.set_bool(db4::LAMP_RUNNING, true);
        sim.set_int(db4::ALARM_CODE, 17);

        let snapshot = aggregator(&sim).snapshot();
        assert!(snapshot.connected);
        assert!(snapshot.controller.connected);
        assert_eq!(snapshot.controller.cpu_state, "run");
        assert_eq!(snapshot.force.kn, 4.25);
        assert_eq!(snapshot.position.servo, 12.5);
        assert_eq!(snapshot.test.status, 2);
        assert_eq!(snapshot.results.sn_class, 8000);
        assert!(snapshot.safety.safety_ok);
        assert!(snapshot.mode.remote);
        assert!(snapshot.clamps.upper && !snapshot.clamps.lower);
        assert!(snapshot.step.active);
        assert!(snapshot.lamps.running);
        assert_eq!(snapshot.alarm.code, 17);
        // 只读，不应产生写入
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_partial_read_failure_substitutes_zero() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_real(db2::FORCE_KN, 4.25);
        sim.set_real(db3::ACTUAL_POSITION, 12.5);
        sim.fail_reads_at(db2::FORCE_KN);

        let snapshot = aggregator(&sim).snapshot();
        assert!(snapshot.connected);
        assert_eq!(snapshot.force.kn, 0.0);
        assert_eq!(snapshot.position.servo, 12.5);
    }

    #[test]
    fn test_disconnect_during_aggregation_falls_back() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_real(db2::LOAD_CELL_RAW, 99.0);
        sim.drop_connection_after_reads(5);

        let snapshot = aggregator(&sim).snapshot();
        assert_eq!(snapshot, TelemetrySnapshot::disconnected("192.168.0.1"));
    }

    #[test]
    fn test_hmi_profile_has_no_step_reads() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_bool(db3::STEP_ACTIVE, true);
        sim.set_bool(db4::ESTOP_STATUS, true);
        let aggregator = TelemetryAggregator::new(
            SessionHandle::new(sim),
            RegisterMap::for_profile(HardwareProfile::HmiPanel),
        );

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.step, StepStatus::default());
        assert!(snapshot.safety.e_stop);
        assert_eq!(aggregator.step_status(), StepStatus::default());
    }

    #[test]
    fn test_safety_and_step_status() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_bool(db3::MOTION_ALLOWED, true);
        sim.set_bool(db3::UPPER_LIMIT, true);
        sim.set_real(db3::STEP_DISTANCE, 2.5);
        sim.set_bool(db3::STEP_DONE, true);
        let aggregator = aggregator(&sim);

        let safety = aggregator.safety_status();
        assert!(safety.motion_allowed && safety.upper_limit);
        assert!(!safety.e_stop);

        let step = aggregator.step_status();
        assert_eq!(step.distance, 2.5);
        assert!(step.done && !step.active);

        sim.set_connected(false);
        assert_eq!(aggregator.safety_status(), SafetyStatus::default());
        assert_eq!(aggregator.step_status(), StepStatus::default());
        assert!(!aggregator.remote_mode());
    }

    #[test]
    fn test_parameters_fallbacks() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_real(db1::PIPE_DIAMETER, 110.0);
        sim.set_real(db1::MAX_FORCE, 20_000.0);
        let aggregator = aggregator(&sim);

        let params = aggregator.parameters();
        assert_eq!(params.pipe_diameter, 110.0);
        assert_eq!(params.max_force, 20_000.0);
        // 未写入的字段读到 0，使用出厂值
        assert_eq!(params.pipe_length, 300.0);
        assert_eq!(params.contact_speed, 2.0);

        sim.set_connected(false);
        assert_eq!(aggregator.parameters(), TestParameters::default());
    }

    #[test]
    fn test_results_read() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_real(db2::RING_STIFFNESS, 8.6);
        sim.set_int(db2::SN_CLASS, 8);
        sim.set_bool(db2::TEST_PASSED, true);
        sim.set_real(db2::DEFLECTION_PERCENT, 3.0);

        let results = aggregator(&sim).test_results();
        assert_eq!(results.ring_stiffness, 8.6);
        assert_eq!(results.sn_class, 8);
        assert!(results.test_passed);
        assert_eq!(results.deflection_percent, 3.0);
    }

    #[test]
    fn test_parameter_update_is_empty() {
        assert!(ParameterUpdate::default().is_empty());
        let update = ParameterUpdate {
            test_speed: Some(5.0),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
