//! 命令调度器
//!
//! 把一组命令动词翻译为寄存器写入，并在写入**之前**检查联锁条件。
//!
//! # 联锁规则
//!
//! | 命令 | 远程模式 | 允许运动 | 安全 OK | 其他 |
//! |---|---|---|---|---|
//! | 点动（激活） | ✓ | ✓ | | 先清除反方向 |
//! | 点动（停止） | | | | 总是允许 |
//! | 开始试验 | ✓ | | ✓ | |
//! | 回零 | ✓ | | | |
//! | 步进 | ✓ | ✓ | ✓ | 上一步未完成时拒绝 |
//! | 切换模式 | | | | 需要 `mode_change_allowed` |
//!
//! 所有命令首先检查连接，断连时不访问总线，返回 `Rejected(Disconnected)`。
//!
//! # 脉冲命令
//!
//! 去皮、位移清零、报警复位、急停：写 `true` → 保持 → 写 `false`。
//! 保持期间同步阻塞调用线程；一旦开始，即使调用方放弃也会写完 `false`。
//! 会话锁只在每次写入时持有，保持期间广播循环可以照常读取。
//!
//! # 命令锁
//!
//! 多步序列（联锁检查 + 写入、先清反方向再置位、先清点动再撤使能/急停）
//! 在命令锁内整体执行，并发请求不会交错。遥测读取不经过命令锁。

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use stiffrig_driver::{
    JogDirection, ParameterUpdate, SafetyStatus, StepStatus, TelemetryAggregator,
    TelemetrySnapshot, TestParameters, TestResults,
};
use stiffrig_protocol::{
    BitAddress, CommandOutcome, RegisterMap, RejectReason, StepRegisters, WordAddress,
};
use stiffrig_session::SessionHandle;
use stiffrig_tools::{JogPolicy, PulseTiming, StepPolicy};
use tracing::{error, info, warn};

/// 命令调度器
///
/// 可在多个请求线程间共享（`Arc<CommandDispatcher>`）；克隆体共用同一把命令锁。
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    session: SessionHandle,
    command_lock: Arc<Mutex<()>>,
    aggregator: TelemetryAggregator,
    map: &'static RegisterMap,
    jog: JogPolicy,
    step: StepPolicy,
    pulse: PulseTiming,
}

impl CommandDispatcher {
    pub fn new(
        aggregator: TelemetryAggregator,
        jog: JogPolicy,
        step: StepPolicy,
        pulse: PulseTiming,
    ) -> Self {
        Self {
            session: aggregator.session().clone(),
            command_lock: Arc::new(Mutex::new(())),
            map: aggregator.register_map(),
            aggregator,
            jog,
            step,
            pulse,
        }
    }

    pub fn jog_policy(&self) -> &JogPolicy {
        &self.jog
    }

    pub fn step_policy(&self) -> &StepPolicy {
        &self.step
    }

    // ==================== 称重 / 位移 ====================

    /// 称重去皮（脉冲）
    pub fn tare_load_cell(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("tare load cell");
        }
        self.pulse(
            "Tare",
            self.map.commands.tare_load_cell,
            self.pulse.short_hold(),
            "Load cell tared",
        )
    }

    /// 位移清零（脉冲）
    pub fn zero_position(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("zero position");
        }
        self.pulse(
            "Zero position",
            self.map.commands.zero_position,
            self.pulse.short_hold(),
            "Position zeroed",
        )
    }

    // ==================== 伺服 ====================

    pub fn enable_servo(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("enable servo");
        }
        self.write_bit(self.map.commands.enable, true, "Servo enabled")
    }

    /// 关闭伺服：先清除两个点动方向，再撤销使能
    pub fn disable_servo(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("disable servo");
        }
        let _guard = self.command_lock.lock();
        let jog = self.clear_jog();
        if !jog.success() {
            // 仍然继续撤销使能
            warn!("Jog clear before servo disable failed: {}", jog);
        }
        self.write_bit(self.map.commands.enable, false, "Servo disabled")
    }

    /// 报警复位（脉冲，较长保持时间）
    pub fn reset_alarm(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("reset alarm");
        }
        self.pulse(
            "Alarm reset",
            self.map.commands.reset,
            self.pulse.reset_hold(),
            "Alarm reset",
        )
    }

    // ==================== 点动 ====================

    pub fn jog_forward(&self, state: bool) -> CommandOutcome {
        self.jog(JogDirection::Forward, state)
    }

    pub fn jog_backward(&self, state: bool) -> CommandOutcome {
        self.jog(JogDirection::Backward, state)
    }

    /// 点动
    ///
    /// 激活需要远程模式与允许运动，并先清除反方向；停止总是允许。
    pub fn jog(&self, direction: JogDirection, state: bool) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("jog");
        }

        let _guard = self.command_lock.lock();
        let target = self.jog_register(direction);
        if state {
            if !self.remote_mode() {
                warn!("Jog {} rejected: system in LOCAL mode", direction);
                return CommandOutcome::rejected(
                    RejectReason::LocalMode,
                    "Jog disabled - System in LOCAL mode",
                );
            }
            if !self.flag(self.map.status.safety.motion_allowed) {
                warn!("Jog {} rejected: motion not allowed", direction);
                return CommandOutcome::rejected(
                    RejectReason::MotionBlocked,
                    "Motion not allowed - Check safety",
                );
            }

            let opposite = self.jog_register(direction.opposite());
            if !self.session.write_bool(opposite, false) {
                return CommandOutcome::failed(format!(
                    "Failed to clear jog {} before jog {}",
                    direction.opposite(),
                    direction
                ));
            }
        }

        info!("Jog {} = {} ({})", direction, state, target);
        CommandOutcome::from_write(
            self.session.write_bool(target, state),
            format!("Jog {} {}", direction, if state { "started" } else { "stopped" }),
            format!("Failed to write jog {} command", direction),
        )
    }

    /// 设置点动速度
    ///
    /// 超出范围时钳位后写入（不拒绝），返回消息中是实际写入的值。
    pub fn set_jog_velocity(&self, velocity: f32) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("set jog velocity");
        }
        let clamped = self.jog.clamp(velocity);
        if clamped != velocity {
            info!("Jog velocity {} clamped to {}", velocity, clamped);
        }
        self.write_word(
            self.map.commands.jog_velocity_setpoint,
            clamped,
            format!("Jog velocity set to {} mm/min", clamped),
        )
    }

    /// 清除两个点动方向
    pub fn stop_all_jog(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("stop all jog");
        }
        let _guard = self.command_lock.lock();
        self.clear_jog()
    }

    /// 调用方需持有命令锁
    fn clear_jog(&self) -> CommandOutcome {
        let forward = self.session.write_bool(self.map.commands.jog_forward, false);
        let backward = self.session.write_bool(self.map.commands.jog_backward, false);
        info!("All jog stopped");
        CommandOutcome::from_write(
            forward && backward,
            "All jog stopped",
            "Failed to clear jog commands",
        )
    }

    // ==================== 夹具 ====================

    pub fn lock_upper(&self) -> CommandOutcome {
        self.clamp_command("lock upper", self.map.commands.lock_upper, true, "Upper clamp locked")
    }

    pub fn lock_lower(&self) -> CommandOutcome {
        self.clamp_command("lock lower", self.map.commands.lock_lower, true, "Lower clamp locked")
    }

    pub fn unlock_upper(&self) -> CommandOutcome {
        self.clamp_command(
            "unlock upper",
            self.map.commands.lock_upper,
            false,
            "Upper clamp unlocked",
        )
    }

    pub fn unlock_lower(&self) -> CommandOutcome {
        self.clamp_command(
            "unlock lower",
            self.map.commands.lock_lower,
            false,
            "Lower clamp unlocked",
        )
    }

    pub fn unlock_all(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("unlock all");
        }
        let _guard = self.command_lock.lock();
        let upper = self.session.write_bool(self.map.commands.lock_upper, false);
        let lower = self.session.write_bool(self.map.commands.lock_lower, false);
        info!("Unlock all clamps");
        CommandOutcome::from_write(upper && lower, "All clamps unlocked", "Failed to unlock clamps")
    }

    // ==================== 试验 ====================

    pub fn start_test(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("start test");
        }
        let _guard = self.command_lock.lock();
        if !self.remote_mode() {
            warn!("Start test rejected: system in LOCAL mode");
            return CommandOutcome::rejected(
                RejectReason::LocalMode,
                "Start disabled - System in LOCAL mode",
            );
        }
        if !self.flag(self.map.status.safety.safety_ok) {
            warn!("Start test rejected: safety not OK");
            return CommandOutcome::rejected(RejectReason::SafetyNotOk, "Safety not OK");
        }
        self.write_bit(self.map.commands.start_test, true, "Test started")
    }

    /// 急停：先清除点动，再脉冲停止位
    ///
    /// 不检查模式与安全位，停止总是允许。
    pub fn stop(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("stop");
        }
        warn!("Emergency stop requested");
        // 脉冲保持期间持锁，点动请求等待急停完成
        let _guard = self.command_lock.lock();
        let jog = self.clear_jog();
        if !jog.success() {
            warn!("Jog clear before stop failed: {}", jog);
        }
        self.pulse(
            "Stop",
            self.map.commands.stop,
            self.pulse.short_hold(),
            "Stop executed",
        )
    }

    pub fn home(&self) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("home");
        }
        let _guard = self.command_lock.lock();
        if !self.remote_mode() {
            warn!("Home rejected: system in LOCAL mode");
            return CommandOutcome::rejected(
                RejectReason::LocalMode,
                "Home disabled - System in LOCAL mode",
            );
        }
        self.write_bit(self.map.commands.home, true, "Homing started")
    }

    // ==================== 步进 ====================

    /// 设置步进距离
    ///
    /// 先取绝对值；不在 `[min_distance, max_distance]` 内时拒绝（不钳位）。
    pub fn set_step_distance(&self, distance: f32) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("set step distance");
        }
        let Some(regs) = self.step_registers() else {
            return self.step_unsupported();
        };
        let Some(accepted) = self.step.accept(distance) else {
            warn!("Step distance {} rejected", distance);
            return CommandOutcome::rejected(RejectReason::OutOfRange, self.step.range_message());
        };
        self.write_word(
            regs.distance,
            accepted,
            format!("Step distance set to {} mm", accepted),
        )
    }

    pub fn step_forward(&self) -> CommandOutcome {
        self.step(JogDirection::Forward)
    }

    pub fn step_backward(&self) -> CommandOutcome {
        self.step(JogDirection::Backward)
    }

    fn step(&self, direction: JogDirection) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("step");
        }
        let Some(regs) = self.step_registers() else {
            return self.step_unsupported();
        };
        let _guard = self.command_lock.lock();
        if self.flag(regs.active) {
            warn!("Step {} rejected: step already in progress", direction);
            return CommandOutcome::rejected(
                RejectReason::StepInProgress,
                "Step already in progress",
            );
        }
        if !self.remote_mode() {
            warn!("Step {} rejected: system in LOCAL mode", direction);
            return CommandOutcome::rejected(RejectReason::LocalMode, "System in LOCAL mode");
        }
        if !self.flag(self.map.status.safety.motion_allowed) {
            warn!("Step {} rejected: motion not allowed", direction);
            return CommandOutcome::rejected(
                RejectReason::MotionBlocked,
                "Motion not allowed - Check safety",
            );
        }
        if !self.flag(self.map.status.safety.safety_ok) {
            warn!("Step {} rejected: safety not OK", direction);
            return CommandOutcome::rejected(RejectReason::SafetyNotOk, "Safety not OK");
        }

        let bit = match direction {
            JogDirection::Forward => regs.forward,
            JogDirection::Backward => regs.backward,
        };
        self.write_bit(bit, true, format!("Step {} started", direction))
    }

    pub fn step_status(&self) -> StepStatus {
        self.aggregator.step_status()
    }

    // ==================== 模式 ====================

    /// 切换本地/远程模式
    ///
    /// 需要控制器允许切换（试验进行中通常不允许）。
    pub fn set_remote_mode(&self, remote: bool) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("set remote mode");
        }
        let _guard = self.command_lock.lock();
        if !self.flag(self.map.status.mode_change_allowed) {
            warn!("Mode change rejected: not allowed by controller");
            return CommandOutcome::rejected(
                RejectReason::ModeChangeBlocked,
                "Mode change not allowed - Test may be running",
            );
        }
        let name = if remote { "Remote" } else { "Local" };
        self.write_bit(
            self.map.commands.remote_mode,
            remote,
            format!("Switched to {} mode", name),
        )
    }

    /// 当前是否为远程模式（断连时为 false）
    pub fn remote_mode(&self) -> bool {
        self.aggregator.remote_mode()
    }

    pub fn safety_status(&self) -> SafetyStatus {
        self.aggregator.safety_status()
    }

    pub fn live_data(&self) -> TelemetrySnapshot {
        self.aggregator.snapshot()
    }

    // ==================== 参数与结果 ====================

    pub fn parameters(&self) -> TestParameters {
        self.aggregator.parameters()
    }

    /// 写入试验参数，只写 `Some` 的字段
    pub fn write_parameters(&self, update: &ParameterUpdate) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected("write parameters");
        }
        if update.is_empty() {
            warn!("Write parameters rejected: no fields present");
            return CommandOutcome::failed("No parameters to write");
        }
        let p = &self.map.parameters;
        let fields = [
            ("pipe_diameter", p.pipe_diameter, update.pipe_diameter),
            ("pipe_length", p.pipe_length, update.pipe_length),
            ("deflection_percent", p.deflection_percent, update.deflection_percent),
            ("test_speed", p.test_speed, update.test_speed),
            ("max_stroke", p.max_stroke, update.max_stroke),
            ("max_force", p.max_force, update.max_force),
            ("preload_force", p.preload_force, update.preload_force),
            ("approach_speed", p.approach_speed, update.approach_speed),
            ("contact_speed", p.contact_speed, update.contact_speed),
            ("return_speed", p.return_speed, update.return_speed),
        ];

        let mut written = Vec::new();
        let mut failed = Vec::new();
        for (name, addr, value) in fields {
            let Some(value) = value else { continue };
            if self.session.write_real(addr, value) {
                written.push(name);
            } else {
                failed.push(name);
            }
        }

        if !failed.is_empty() {
            return CommandOutcome::failed(format!(
                "Failed to write parameters: {}",
                failed.join(", ")
            ));
        }
        info!("Parameters written: {:?}", written);
        CommandOutcome::accepted(format!("{} parameter(s) written", written.len()))
    }

    pub fn test_results(&self) -> TestResults {
        self.aggregator.test_results()
    }

    // ==================== 内部 ====================

    fn disconnected(&self, action: &str) -> CommandOutcome {
        warn!("Cannot {}: controller not connected", action);
        CommandOutcome::disconnected()
    }

    fn jog_register(&self, direction: JogDirection) -> BitAddress {
        match direction {
            JogDirection::Forward => self.map.commands.jog_forward,
            JogDirection::Backward => self.map.commands.jog_backward,
        }
    }

    fn step_registers(&self) -> Option<StepRegisters> {
        self.map.step
    }

    fn step_unsupported(&self) -> CommandOutcome {
        CommandOutcome::failed(format!(
            "Step movement not supported by the {} controller profile",
            self.map.profile.as_str()
        ))
    }

    /// 读取联锁位；读取失败视为 false
    fn flag(&self, addr: BitAddress) -> bool {
        self.session.read_bool(addr).unwrap_or(false)
    }

    fn clamp_command(&self, action: &str, addr: BitAddress, lock: bool, message: &str) -> CommandOutcome {
        if !self.session.is_connected() {
            return self.disconnected(action);
        }
        self.write_bit(addr, lock, message)
    }

    fn write_bit(&self, addr: BitAddress, value: bool, message: impl Into<String>) -> CommandOutcome {
        let message = message.into();
        info!("{} ({} = {})", message, addr, value);
        CommandOutcome::from_write(
            self.session.write_bool(addr, value),
            message,
            format!("Failed to write {}", addr),
        )
    }

    fn write_word(&self, addr: WordAddress, value: f32, message: String) -> CommandOutcome {
        info!("{} ({} = {})", message, addr, value);
        CommandOutcome::from_write(
            self.session.write_real(addr, value),
            message,
            format!("Failed to write {}", addr),
        )
    }

    /// 写 `true` → 保持 `hold` → 写 `false`
    fn pulse(&self, label: &str, addr: BitAddress, hold: Duration, message: &str) -> CommandOutcome {
        info!("{} pulse on {} ({:?})", label, addr, hold);
        if !self.session.write_bool(addr, true) {
            return CommandOutcome::failed(format!("{} failed: could not set {}", label, addr));
        }
        spin_sleep::sleep(hold);
        if !self.session.write_bool(addr, false) {
            error!("{} pulse release failed, {} may remain asserted", label, addr);
            return CommandOutcome::failed(format!("{} failed: could not release {}", label, addr));
        }
        CommandOutcome::accepted(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stiffrig_protocol::HardwareProfile;
    use stiffrig_protocol::map::{db3, db4};
    use stiffrig_session::{SimulatedSession, WriteValue};

    fn dispatcher(sim: &SimulatedSession, profile: HardwareProfile) -> CommandDispatcher {
        let aggregator =
            TelemetryAggregator::new(SessionHandle::new(sim.clone()), RegisterMap::for_profile(profile));
        CommandDispatcher::new(
            aggregator,
            JogPolicy::default(),
            StepPolicy::default(),
            PulseTiming {
                short_hold_ms: 1,
                reset_hold_ms: 2,
            },
        )
    }

    #[test]
    fn test_disconnected_commands_touch_nothing() {
        let sim = SimulatedSession::disconnected("sim");
        let d = dispatcher(&sim, HardwareProfile::Servo);

        for outcome in [
            d.tare_load_cell(),
            d.enable_servo(),
            d.disable_servo(),
            d.jog_forward(true),
            d.jog_forward(false),
            d.stop_all_jog(),
            d.set_jog_velocity(10.0),
            d.unlock_all(),
            d.start_test(),
            d.stop(),
            d.home(),
            d.set_step_distance(5.0),
            d.step_forward(),
            d.set_remote_mode(true),
            d.write_parameters(&ParameterUpdate::default()),
        ] {
            assert_eq!(outcome.reason(), Some(RejectReason::Disconnected), "{}", outcome);
        }
        assert!(sim.writes().is_empty());
        assert!(!d.remote_mode());
        assert_eq!(d.safety_status(), SafetyStatus::default());
    }

    #[test]
    fn test_hmi_profile_step_is_unsupported() {
        let sim = SimulatedSession::new("sim");
        sim.set_bool(db3::REMOTE_MODE, true);
        let d = dispatcher(&sim, HardwareProfile::HmiPanel);

        let outcome = d.set_step_distance(5.0);
        assert!(matches!(outcome, CommandOutcome::Failed { .. }));
        assert!(outcome.message().contains("hmi-panel"));
        assert!(matches!(d.step_forward(), CommandOutcome::Failed { .. }));
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_hmi_profile_jog_routes_to_panel_bits() {
        let sim = SimulatedSession::new("sim");
        sim.set_bool(db3::REMOTE_MODE, true);
        sim.set_bool(db3::MOTION_ALLOWED, true);
        let d = dispatcher(&sim, HardwareProfile::HmiPanel);

        assert!(d.jog_forward(true).success());
        assert!(sim.get_bool(db4::JOG_DOWN));
        assert!(!sim.get_bool(db4::JOG_UP));
        assert!(!sim.get_bool(db3::JOG_FORWARD));
    }

    #[test]
    fn test_home_requires_remote() {
        let sim = SimulatedSession::new("sim");
        let d = dispatcher(&sim, HardwareProfile::Servo);
        assert_eq!(d.home().reason(), Some(RejectReason::LocalMode));
        assert!(sim.writes_to(db3::HOME).is_empty());

        sim.set_bool(db3::REMOTE_MODE, true);
        assert!(d.home().success());
        assert_eq!(sim.writes_to(db3::HOME), vec![WriteValue::Bool(true)]);
    }

    #[test]
    fn test_remote_mode_read_failure_counts_as_local() {
        let sim = SimulatedSession::new("sim");
        sim.set_bool(db3::REMOTE_MODE, true);
        sim.set_bool(db3::MOTION_ALLOWED, true);
        sim.fail_reads_at(db3::REMOTE_MODE);
        let d = dispatcher(&sim, HardwareProfile::Servo);

        assert_eq!(d.jog_forward(true).reason(), Some(RejectReason::LocalMode));
    }

    #[test]
    fn test_failed_write_is_reported() {
        let sim = SimulatedSession::new("sim");
        sim.fail_writes_at(db3::ENABLE);
        let d = dispatcher(&sim, HardwareProfile::Servo);

        let outcome = d.enable_servo();
        assert!(matches!(outcome, CommandOutcome::Failed { .. }));
        assert!(outcome.message().contains("DB3.DBX0.0"));
    }

    #[test]
    fn test_pulse_set_failure_skips_release() {
        let sim = SimulatedSession::new("sim");
        let d = dispatcher(&sim, HardwareProfile::Servo);

        sim.fail_writes_at(db3::RESET);
        let outcome = d.reset_alarm();
        assert!(!outcome.success());
        assert!(sim.writes_to(db3::RESET).is_empty());
    }

    #[test]
    fn test_empty_parameter_update_writes_nothing() {
        let sim = SimulatedSession::new("sim");
        let d = dispatcher(&sim, HardwareProfile::Servo);

        let outcome = d.write_parameters(&ParameterUpdate::default());
        assert!(matches!(outcome, CommandOutcome::Failed { .. }));
        assert_eq!(outcome.message(), "No parameters to write");
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_clones_share_command_lock() {
        let sim = SimulatedSession::new("sim");
        let d = dispatcher(&sim, HardwareProfile::Servo);
        let other = d.clone();

        let _guard = d.command_lock.lock();
        assert!(other.command_lock.try_lock().is_none());
    }
}
