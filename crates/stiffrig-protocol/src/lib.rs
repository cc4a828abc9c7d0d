//! # Stiffrig Protocol
//!
//! 管材环刚度试验机控制器的寄存器映射层（无 IO）。
//!
//! - [`address`]：`DB/字节/位` 坐标类型
//! - [`map`]：按数据块组织的寄存器常量，以及两种控制器版本的映射表
//! - [`outcome`]：命令结果（tagged union）

pub mod address;
pub mod map;
pub mod outcome;

use thiserror::Error;

pub use address::{BitAddress, BlockNumber, RegisterAddress, WordAddress};
pub use map::{
    CommandRegisters, HardwareProfile, ParameterRegisters, RegisterMap, SafetyRegisters,
    StatusRegisters, StepRegisters,
};
pub use outcome::{CommandOutcome, RejectReason};

/// 协议层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 未知的控制器版本名称
    #[error("Unknown hardware profile: {0} (expected \"servo\" or \"hmi-panel\")")]
    UnknownProfile(String),
}
