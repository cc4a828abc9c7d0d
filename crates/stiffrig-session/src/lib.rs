//! # Stiffrig Session Layer
//!
//! 控制器会话抽象：把 `(块, 字节, 位)` 坐标变成实际的总线访问。
//!
//! - [`ControllerSession`]：传输层需要实现的能力（真实控制器或模拟器）
//! - [`SessionHandle`]：串行化访问的共享句柄，提供 `Option` 风格的类型化读写
//! - [`SimulatedSession`]：内存中的控制器，用于测试和无硬件运行

mod handle;
pub mod simulated;

use stiffrig_protocol::{BitAddress, WordAddress};
use thiserror::Error;

pub use handle::SessionHandle;
pub use simulated::{SimulatedSession, WriteRecord, WriteValue};

/// 会话层统一错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 没有活动连接
    #[error("Controller not connected")]
    NotConnected,
    /// 读写超时
    #[error("Controller request timed out")]
    Timeout,
    /// 传输层错误（协议、网络等）
    #[error("Transport error: {0}")]
    Transport(String),
    /// 控制器拒绝访问该地址（块不存在、越界等）
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl SessionError {
    /// 该错误是否意味着连接已断开
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SessionError::NotConnected)
    }
}

/// 控制器会话
///
/// 由传输层实现。实现**不需要**线程安全：所有访问都经过 [`SessionHandle`] 的互斥锁。
///
/// 同一时刻只应存在一个到控制器的活动连接；`connect()` 在已连接时应直接返回 `Ok(())`。
pub trait ControllerSession {
    /// 当前连接标志
    fn is_connected(&self) -> bool;

    /// 控制器地址（IP 等），用于状态展示
    fn address(&self) -> &str;

    /// 尝试（重新）建立连接
    fn connect(&mut self) -> Result<(), SessionError>;

    /// CPU 运行状态（如 `"run"` / `"stop"`）
    fn cpu_state(&mut self) -> Result<String, SessionError>;

    fn read_bool(&mut self, addr: BitAddress) -> Result<bool, SessionError>;
    fn write_bool(&mut self, addr: BitAddress, value: bool) -> Result<(), SessionError>;

    /// 读取 32 位 REAL
    fn read_real(&mut self, addr: WordAddress) -> Result<f32, SessionError>;
    fn write_real(&mut self, addr: WordAddress, value: f32) -> Result<(), SessionError>;

    /// 读取 16 位 INT
    fn read_int(&mut self, addr: WordAddress) -> Result<i16, SessionError>;

    /// 读取模拟量输入通道原始值
    fn read_analog_input(&mut self, channel: u16) -> Result<i16, SessionError>;
}

impl<S: ControllerSession + ?Sized> ControllerSession for Box<S> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn address(&self) -> &str {
        (**self).address()
    }

    fn connect(&mut self) -> Result<(), SessionError> {
        (**self).connect()
    }

    fn cpu_state(&mut self) -> Result<String, SessionError> {
        (**self).cpu_state()
    }

    fn read_bool(&mut self, addr: BitAddress) -> Result<bool, SessionError> {
        (**self).read_bool(addr)
    }

    fn write_bool(&mut self, addr: BitAddress, value: bool) -> Result<(), SessionError> {
        (**self).write_bool(addr, value)
    }

    fn read_real(&mut self, addr: WordAddress) -> Result<f32, SessionError> {
        (**self).read_real(addr)
    }

    fn write_real(&mut self, addr: WordAddress, value: f32) -> Result<(), SessionError> {
        (**self).write_real(addr, value)
    }

    fn read_int(&mut self, addr: WordAddress) -> Result<i16, SessionError> {
        (**self).read_int(addr)
    }

    fn read_analog_input(&mut self, channel: u16) -> Result<i16, SessionError> {
        (**self).read_analog_input(channel)
    }
}
