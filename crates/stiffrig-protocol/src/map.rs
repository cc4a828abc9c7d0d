//! 寄存器映射表
//!
//! 控制器上的所有信号都在本模块中定义一次（按数据块分组的常量），
//! 命令侧（[`CommandRegisters`]）与遥测侧（[`StatusRegisters`]）都从同一组常量组装，
//! 同一个物理信号不会出现两份定义。
//!
//! # 数据块
//!
//! | 块 | 内容 |
//! |---|---|
//! | DB1 | 试验参数（读写） |
//! | DB2 | 试验结果、称重/位移原始值 |
//! | DB3 | 伺服控制与状态、安全位、步进 |
//! | DB4 | HMI 面板接口 |
//!
//! # 硬件版本
//!
//! 现场存在两种控制器程序布局，见 [`HardwareProfile`]。

use serde::{Deserialize, Serialize};

use crate::address::{BitAddress, WordAddress};

/// DB1 - 试验参数
pub mod db1 {
    use crate::address::WordAddress;

    pub const BLOCK: u16 = 1;

    pub const PIPE_DIAMETER: WordAddress = WordAddress::new(BLOCK, 0);
    pub const PIPE_LENGTH: WordAddress = WordAddress::new(BLOCK, 4);
    pub const DEFLECTION_PERCENT: WordAddress = WordAddress::new(BLOCK, 8);
    pub const DEFLECTION_TARGET: WordAddress = WordAddress::new(BLOCK, 12);
    pub const TEST_SPEED: WordAddress = WordAddress::new(BLOCK, 16);
    pub const MAX_STROKE: WordAddress = WordAddress::new(BLOCK, 20);
    pub const MAX_FORCE: WordAddress = WordAddress::new(BLOCK, 24);
    pub const PRELOAD_FORCE: WordAddress = WordAddress::new(BLOCK, 38);
    pub const APPROACH_SPEED: WordAddress = WordAddress::new(BLOCK, 42);
    pub const CONTACT_SPEED: WordAddress = WordAddress::new(BLOCK, 46);
    pub const RETURN_SPEED: WordAddress = WordAddress::new(BLOCK, 50);
}

/// DB2 - 试验结果
pub mod db2 {
    use crate::address::{BitAddress, WordAddress};

    pub const BLOCK: u16 = 2;

    pub const ACTUAL_FORCE: WordAddress = WordAddress::new(BLOCK, 0);
    pub const ACTUAL_DEFLECTION: WordAddress = WordAddress::new(BLOCK, 4);
    pub const DEFLECTION_PERCENT: WordAddress = WordAddress::new(BLOCK, 8);
    pub const FORCE_AT_TARGET: WordAddress = WordAddress::new(BLOCK, 12);
    pub const RING_STIFFNESS: WordAddress = WordAddress::new(BLOCK, 16);
    /// INT
    pub const SN_CLASS: WordAddress = WordAddress::new(BLOCK, 20);
    /// INT，-1 表示无数据
    pub const TEST_STATUS: WordAddress = WordAddress::new(BLOCK, 22);
    pub const TEST_PASSED: BitAddress = BitAddress::new(BLOCK, 24, 0);
    pub const FORCE_FILTERED: WordAddress = WordAddress::new(BLOCK, 36);
    pub const FORCE_KN: WordAddress = WordAddress::new(BLOCK, 44);
    pub const LOAD_CELL_RAW: WordAddress = WordAddress::new(BLOCK, 48);
    pub const LOAD_CELL_ACTUAL: WordAddress = WordAddress::new(BLOCK, 56);
    /// 称重去皮（脉冲）
    pub const TARE_LOAD_CELL: BitAddress = BitAddress::new(BLOCK, 60, 0);
    pub const POSITION_RAW: WordAddress = WordAddress::new(BLOCK, 62);
    pub const POSITION_ACTUAL: WordAddress = WordAddress::new(BLOCK, 70);
    /// INT
    pub const TEST_STAGE: WordAddress = WordAddress::new(BLOCK, 74);
    pub const PRELOAD_REACHED: BitAddress = BitAddress::new(BLOCK, 76, 0);
    pub const CONTACT_POSITION: WordAddress = WordAddress::new(BLOCK, 78);
    /// INT
    pub const DATA_POINT_COUNT: WordAddress = WordAddress::new(BLOCK, 82);
    pub const RECORDING_ACTIVE: BitAddress = BitAddress::new(BLOCK, 84, 0);
}

/// DB3 - 伺服控制
pub mod db3 {
    use crate::address::{BitAddress, WordAddress};

    pub const BLOCK: u16 = 3;

    // Byte 0/1：主控制位与伺服状态
    pub const ENABLE: BitAddress = BitAddress::new(BLOCK, 0, 0);
    pub const JOG_FORWARD: BitAddress = BitAddress::new(BLOCK, 0, 1);
    pub const JOG_BACKWARD: BitAddress = BitAddress::new(BLOCK, 0, 2);
    pub const START_TEST: BitAddress = BitAddress::new(BLOCK, 0, 3);
    pub const STOP: BitAddress = BitAddress::new(BLOCK, 0, 4);
    pub const RESET: BitAddress = BitAddress::new(BLOCK, 0, 5);
    pub const HOME: BitAddress = BitAddress::new(BLOCK, 0, 6);
    pub const SERVO_READY: BitAddress = BitAddress::new(BLOCK, 0, 7);
    pub const SERVO_ERROR: BitAddress = BitAddress::new(BLOCK, 1, 0);
    pub const AT_HOME: BitAddress = BitAddress::new(BLOCK, 1, 1);

    pub const ACTUAL_POSITION: WordAddress = WordAddress::new(BLOCK, 2);
    pub const TARGET_POSITION: WordAddress = WordAddress::new(BLOCK, 6);
    pub const ACTUAL_SPEED: WordAddress = WordAddress::new(BLOCK, 10);
    /// 当前生效的点动速度（只读）
    pub const JOG_VELOCITY: WordAddress = WordAddress::new(BLOCK, 16);

    // Byte 14：夹具
    pub const LOCK_UPPER: BitAddress = BitAddress::new(BLOCK, 14, 0);
    pub const LOCK_LOWER: BitAddress = BitAddress::new(BLOCK, 14, 1);

    // Byte 20：运动控制器
    pub const MC_POWER: BitAddress = BitAddress::new(BLOCK, 20, 0);
    pub const MC_BUSY: BitAddress = BitAddress::new(BLOCK, 20, 1);
    pub const MC_ERROR: BitAddress = BitAddress::new(BLOCK, 20, 2);

    // Byte 25：模式与安全
    pub const REMOTE_MODE: BitAddress = BitAddress::new(BLOCK, 25, 0);
    pub const ESTOP_ACTIVE: BitAddress = BitAddress::new(BLOCK, 25, 1);
    pub const UPPER_LIMIT: BitAddress = BitAddress::new(BLOCK, 25, 2);
    pub const LOWER_LIMIT: BitAddress = BitAddress::new(BLOCK, 25, 3);
    pub const HOME_POSITION: BitAddress = BitAddress::new(BLOCK, 25, 4);
    pub const SAFETY_OK: BitAddress = BitAddress::new(BLOCK, 25, 5);
    pub const MOTION_ALLOWED: BitAddress = BitAddress::new(BLOCK, 25, 6);

    /// 点动速度设定值（REAL，mm/min）
    pub const JOG_VELOCITY_SETPOINT: WordAddress = WordAddress::new(BLOCK, 26);

    // Byte 30
    pub const MODE_CHANGE_ALLOWED: BitAddress = BitAddress::new(BLOCK, 30, 0);

    // Byte 32-36：步进运动
    pub const STEP_DISTANCE: WordAddress = WordAddress::new(BLOCK, 32);
    pub const STEP_FORWARD: BitAddress = BitAddress::new(BLOCK, 36, 0);
    pub const STEP_BACKWARD: BitAddress = BitAddress::new(BLOCK, 36, 1);
    pub const STEP_ACTIVE: BitAddress = BitAddress::new(BLOCK, 36, 2);
    pub const STEP_DONE: BitAddress = BitAddress::new(BLOCK, 36, 3);
}

/// DB4 - HMI 面板
pub mod db4 {
    use crate::address::{BitAddress, WordAddress};

    pub const BLOCK: u16 = 4;

    pub const MODE_AUTO: BitAddress = BitAddress::new(BLOCK, 2, 0);
    pub const MODE_MANUAL: BitAddress = BitAddress::new(BLOCK, 2, 1);
    pub const ALARM_ACTIVE: BitAddress = BitAddress::new(BLOCK, 2, 2);
    /// INT
    pub const ALARM_CODE: WordAddress = WordAddress::new(BLOCK, 4);

    // Byte 58/59：面板按钮镜像
    pub const ZERO_LOAD_CELL: BitAddress = BitAddress::new(BLOCK, 58, 0);
    pub const LOCK_UPPER: BitAddress = BitAddress::new(BLOCK, 58, 1);
    pub const LOCK_LOWER: BitAddress = BitAddress::new(BLOCK, 58, 2);
    pub const ENABLE: BitAddress = BitAddress::new(BLOCK, 58, 4);
    pub const START: BitAddress = BitAddress::new(BLOCK, 58, 5);
    pub const STOP: BitAddress = BitAddress::new(BLOCK, 58, 6);
    pub const RESET: BitAddress = BitAddress::new(BLOCK, 58, 7);
    pub const JOG_UP: BitAddress = BitAddress::new(BLOCK, 59, 0);
    pub const JOG_DOWN: BitAddress = BitAddress::new(BLOCK, 59, 1);
    pub const HOME: BitAddress = BitAddress::new(BLOCK, 59, 2);
    pub const LAMP_READY: BitAddress = BitAddress::new(BLOCK, 59, 3);
    pub const LAMP_RUNNING: BitAddress = BitAddress::new(BLOCK, 59, 4);
    pub const LAMP_ERROR: BitAddress = BitAddress::new(BLOCK, 59, 5);
    pub const TARE_LOAD_CELL: BitAddress = BitAddress::new(BLOCK, 59, 6);
    /// 位移清零（脉冲）
    pub const ZERO_POSITION: BitAddress = BitAddress::new(BLOCK, 59, 7);

    // Byte 60：安全位镜像
    pub const ESTOP_STATUS: BitAddress = BitAddress::new(BLOCK, 60, 0);
    pub const UPPER_LIMIT: BitAddress = BitAddress::new(BLOCK, 60, 1);
    pub const LOWER_LIMIT: BitAddress = BitAddress::new(BLOCK, 60, 2);
    pub const HOME_STATUS: BitAddress = BitAddress::new(BLOCK, 60, 3);

    /// INT，百分比
    pub const TEST_PROGRESS: WordAddress = WordAddress::new(BLOCK, 62);
}

/// 控制器程序版本
///
/// - `Servo`：命令直接写入 DB3 伺服控制字节，支持步进运动（当前版本）
/// - `HmiPanel`：早期版本，运动命令通过 DB4 面板镜像位下发，安全位从 DB4 读取，无步进
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HardwareProfile {
    #[default]
    Servo,
    HmiPanel,
}

impl HardwareProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            HardwareProfile::Servo => "servo",
            HardwareProfile::HmiPanel => "hmi-panel",
        }
    }
}

impl std::str::FromStr for HardwareProfile {
    type Err = crate::ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "servo" => Ok(HardwareProfile::Servo),
            "hmi-panel" | "hmi_panel" | "hmi" => Ok(HardwareProfile::HmiPanel),
            other => Err(crate::ProtocolError::UnknownProfile(other.to_string())),
        }
    }
}

/// 命令侧寄存器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRegisters {
    pub enable: BitAddress,
    pub jog_forward: BitAddress,
    pub jog_backward: BitAddress,
    pub start_test: BitAddress,
    pub stop: BitAddress,
    pub reset: BitAddress,
    pub home: BitAddress,
    pub lock_upper: BitAddress,
    pub lock_lower: BitAddress,
    pub remote_mode: BitAddress,
    pub tare_load_cell: BitAddress,
    pub zero_position: BitAddress,
    pub jog_velocity_setpoint: WordAddress,
}

/// 步进运动寄存器（仅部分控制器版本支持）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRegisters {
    pub distance: WordAddress,
    pub forward: BitAddress,
    pub backward: BitAddress,
    pub active: BitAddress,
    pub done: BitAddress,
}

/// 安全位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyRegisters {
    pub estop: BitAddress,
    pub upper_limit: BitAddress,
    pub lower_limit: BitAddress,
    pub home: BitAddress,
    pub safety_ok: BitAddress,
    pub motion_allowed: BitAddress,
}

/// 遥测侧寄存器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegisters {
    // 力
    pub force_raw: WordAddress,
    pub force_actual: WordAddress,
    pub force_filtered: WordAddress,
    pub force_kn: WordAddress,
    pub force_n: WordAddress,

    // 位移
    pub position_raw: WordAddress,
    pub position_actual: WordAddress,
    pub position_servo: WordAddress,
    pub position_target: WordAddress,

    // 挠度
    pub deflection_actual: WordAddress,
    pub deflection_percent: WordAddress,
    pub deflection_target: WordAddress,

    // 试验状态
    pub test_status: WordAddress,
    pub test_stage: WordAddress,
    pub test_progress: WordAddress,
    pub recording_active: BitAddress,
    pub preload_reached: BitAddress,
    pub test_passed: BitAddress,

    // 结果
    pub ring_stiffness: WordAddress,
    pub force_at_target: WordAddress,
    pub sn_class: WordAddress,
    pub contact_position: WordAddress,
    pub data_point_count: WordAddress,

    // 伺服
    pub servo_ready: BitAddress,
    pub servo_error: BitAddress,
    pub servo_enabled: BitAddress,
    pub at_home: BitAddress,
    pub mc_power: BitAddress,
    pub mc_busy: BitAddress,
    pub mc_error: BitAddress,
    pub actual_speed: WordAddress,
    pub jog_velocity: WordAddress,

    // 夹具
    pub clamp_upper: BitAddress,
    pub clamp_lower: BitAddress,

    // 模式
    pub remote_mode: BitAddress,
    pub mode_change_allowed: BitAddress,

    // 报警与指示灯
    pub alarm_active: BitAddress,
    pub alarm_code: WordAddress,
    pub lamp_ready: BitAddress,
    pub lamp_running: BitAddress,
    pub lamp_error: BitAddress,

    pub safety: SafetyRegisters,
}

/// 试验参数寄存器（DB1）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterRegisters {
    pub pipe_diameter: WordAddress,
    pub pipe_length: WordAddress,
    pub deflection_percent: WordAddress,
    pub deflection_target: WordAddress,
    pub test_speed: WordAddress,
    pub max_stroke: WordAddress,
    pub max_force: WordAddress,
    pub preload_force: WordAddress,
    pub approach_speed: WordAddress,
    pub contact_speed: WordAddress,
    pub return_speed: WordAddress,
}

/// 完整寄存器映射
///
/// 由 [`RegisterMap::for_profile`] 构造，命令调度器与遥测聚合器共享同一实例。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    pub profile: HardwareProfile,
    pub commands: CommandRegisters,
    pub status: StatusRegisters,
    pub parameters: ParameterRegisters,
    pub step: Option<StepRegisters>,
}

const PARAMETERS: ParameterRegisters = ParameterRegisters {
    pipe_diameter: db1::PIPE_DIAMETER,
    pipe_length: db1::PIPE_LENGTH,
    deflection_percent: db1::DEFLECTION_PERCENT,
    deflection_target: db1::DEFLECTION_TARGET,
    test_speed: db1::TEST_SPEED,
    max_stroke: db1::MAX_STROKE,
    max_force: db1::MAX_FORCE,
    preload_force: db1::PRELOAD_FORCE,
    approach_speed: db1::APPROACH_SPEED,
    contact_speed: db1::CONTACT_SPEED,
    return_speed: db1::RETURN_SPEED,
};

const SERVO_STEP: StepRegisters = StepRegisters {
    distance: db3::STEP_DISTANCE,
    forward: db3::STEP_FORWARD,
    backward: db3::STEP_BACKWARD,
    active: db3::STEP_ACTIVE,
    done: db3::STEP_DONE,
};

const SERVO_SAFETY: SafetyRegisters = SafetyRegisters {
    estop: db3::ESTOP_ACTIVE,
    upper_limit: db3::UPPER_LIMIT,
    lower_limit: db3::LOWER_LIMIT,
    home: db3::HOME_POSITION,
    safety_ok: db3::SAFETY_OK,
    motion_allowed: db3::MOTION_ALLOWED,
};

const HMI_SAFETY: SafetyRegisters = SafetyRegisters {
    estop: db4::ESTOP_STATUS,
    upper_limit: db4::UPPER_LIMIT,
    lower_limit: db4::LOWER_LIMIT,
    home: db4::HOME_STATUS,
    // 面板版本没有独立的汇总位，仍读取伺服块
    safety_ok: db3::SAFETY_OK,
    motion_allowed: db3::MOTION_ALLOWED,
};

const SERVO_COMMANDS: CommandRegisters = CommandRegisters {
    enable: db3::ENABLE,
    jog_forward: db3::JOG_FORWARD,
    jog_backward: db3::JOG_BACKWARD,
    start_test: db3::START_TEST,
    stop: db3::STOP,
    reset: db3::RESET,
    home: db3::HOME,
    lock_upper: db3::LOCK_UPPER,
    lock_lower: db3::LOCK_LOWER,
    remote_mode: db3::REMOTE_MODE,
    tare_load_cell: db2::TARE_LOAD_CELL,
    zero_position: db4::ZERO_POSITION,
    jog_velocity_setpoint: db3::JOG_VELOCITY_SETPOINT,
};

const HMI_COMMANDS: CommandRegisters = CommandRegisters {
    enable: db4::ENABLE,
    // 向下点动 = 正向（朝试样）
    jog_forward: db4::JOG_DOWN,
    jog_backward: db4::JOG_UP,
    start_test: db4::START,
    stop: db4::STOP,
    reset: db4::RESET,
    home: db4::HOME,
    lock_upper: db4::LOCK_UPPER,
    lock_lower: db4::LOCK_LOWER,
    remote_mode: db3::REMOTE_MODE,
    tare_load_cell: db4::TARE_LOAD_CELL,
    zero_position: db4::ZERO_POSITION,
    jog_velocity_setpoint: db3::JOG_VELOCITY_SETPOINT,
};

const fn status_registers(safety: SafetyRegisters) -> StatusRegisters {
    StatusRegisters {
        force_raw: db2::LOAD_CELL_RAW,
        force_actual: db2::LOAD_CELL_ACTUAL,
        force_filtered: db2::FORCE_FILTERED,
        force_kn: db2::FORCE_KN,
        force_n: db2::ACTUAL_FORCE,

        position_raw: db2::POSITION_RAW,
        position_actual: db2::POSITION_ACTUAL,
        position_servo: db3::ACTUAL_POSITION,
        position_target: db3::TARGET_POSITION,

        deflection_actual: db2::ACTUAL_DEFLECTION,
        deflection_percent: db2::DEFLECTION_PERCENT,
        deflection_target: db1::DEFLECTION_TARGET,

        test_status: db2::TEST_STATUS,
        test_stage: db2::TEST_STAGE,
        test_progress: db4::TEST_PROGRESS,
        recording_active: db2::RECORDING_ACTIVE,
        preload_reached: db2::PRELOAD_REACHED,
        test_passed: db2::TEST_PASSED,

        ring_stiffness: db2::RING_STIFFNESS,
        force_at_target: db2::FORCE_AT_TARGET,
        sn_class: db2::SN_CLASS,
        contact_position: db2::CONTACT_POSITION,
        data_point_count: db2::DATA_POINT_COUNT,

        servo_ready: db3::SERVO_READY,
        servo_error: db3::SERVO_ERROR,
        servo_enabled: db3::ENABLE,
        at_home: db3::AT_HOME,
        mc_power: db3::MC_POWER,
        mc_busy: db3::MC_BUSY,
        mc_error: db3::MC_ERROR,
        actual_speed: db3::ACTUAL_SPEED,
        jog_velocity: db3::JOG_VELOCITY,

        clamp_upper: db3::LOCK_UPPER,
        clamp_lower: db3::LOCK_LOWER,

        remote_mode: db3::REMOTE_MODE,
        mode_change_allowed: db3::MODE_CHANGE_ALLOWED,

        alarm_active: db4::ALARM_ACTIVE,
        alarm_code: db4::ALARM_CODE,
        lamp_ready: db4::LAMP_READY,
        lamp_running: db4::LAMP_RUNNING,
        lamp_error: db4::LAMP_ERROR,

        safety,
    }
}

impl RegisterMap {
    /// 当前版本（DB3 伺服控制）
    pub const SERVO: RegisterMap = RegisterMap {
        profile: HardwareProfile::Servo,
        commands: SERVO_COMMANDS,
        status: status_registers(SERVO_SAFETY),
        parameters: PARAMETERS,
        step: Some(SERVO_STEP),
    };

    /// 早期版本（DB4 面板镜像位）
    pub const HMI_PANEL: RegisterMap = RegisterMap {
        profile: HardwareProfile::HmiPanel,
        commands: HMI_COMMANDS,
        status: status_registers(HMI_SAFETY),
        parameters: PARAMETERS,
        step: None,
    };

    pub fn for_profile(profile: HardwareProfile) -> &'static RegisterMap {
        match profile {
            HardwareProfile::Servo => &Self::SERVO,
            HardwareProfile::HmiPanel => &Self::HMI_PANEL,
        }
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::SERVO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_and_status_share_physical_signals() {
        // 伺服版本中，命令位与状态位是同一个物理信号
        let map = RegisterMap::for_profile(HardwareProfile::Servo);
        assert_eq!(map.commands.enable, map.status.servo_enabled);
        assert_eq!(map.commands.lock_upper, map.status.clamp_upper);
        assert_eq!(map.commands.lock_lower, map.status.clamp_lower);
        assert_eq!(map.commands.remote_mode, map.status.remote_mode);
    }

    #[test]
    fn test_servo_profile_layout() {
        let map = RegisterMap::SERVO;
        assert_eq!(map.commands.jog_forward.to_string(), "DB3.DBX0.1");
        assert_eq!(map.commands.tare_load_cell.to_string(), "DB2.DBX60.0");
        assert_eq!(map.commands.zero_position.to_string(), "DB4.DBX59.7");
        assert_eq!(map.commands.jog_velocity_setpoint.to_string(), "DB3.DBD26");
        assert_eq!(map.status.safety.safety_ok.to_string(), "DB3.DBX25.5");

        let step = map.step.expect("servo profile supports step movement");
        assert_eq!(step.distance.to_string(), "DB3.DBD32");
        assert_eq!(step.active.to_string(), "DB3.DBX36.2");
    }

    #[test]
    fn test_hmi_panel_profile_layout() {
        let map = RegisterMap::for_profile(HardwareProfile::HmiPanel);
        assert_eq!(map.profile, HardwareProfile::HmiPanel);
        assert_eq!(map.commands.jog_forward, db4::JOG_DOWN);
        assert_eq!(map.commands.jog_backward, db4::JOG_UP);
        assert_eq!(map.status.safety.estop, db4::ESTOP_STATUS);
        assert!(map.step.is_none());
        // 模式位在两个版本中一致
        assert_eq!(map.commands.remote_mode, RegisterMap::SERVO.commands.remote_mode);
    }

    #[test]
    fn test_jog_directions_are_distinct() {
        for profile in [HardwareProfile::Servo, HardwareProfile::HmiPanel] {
            let map = RegisterMap::for_profile(profile);
            assert_ne!(map.commands.jog_forward, map.commands.jog_backward);
        }
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("servo".parse::<HardwareProfile>().unwrap(), HardwareProfile::Servo);
        assert_eq!(
            "hmi-panel".parse::<HardwareProfile>().unwrap(),
            HardwareProfile::HmiPanel
        );
        assert!("plc-v9".parse::<HardwareProfile>().is_err());
        assert_eq!(HardwareProfile::default(), HardwareProfile::Servo);
    }
}
