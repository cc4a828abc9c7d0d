//! 串行化会话句柄
//!
//! 控制器会话不是线程安全的：命令请求（多个调用方并发）与广播循环都要访问它。
//! `SessionHandle` 用互斥锁包装唯一的会话实例，每次读写单独持锁，
//! 并把 [`SessionError`] 折叠为 `Option` / `bool`：
//! - 读取失败（断连、超时、传输错误）→ `None`，调用方按字段默认值处理
//! - 写入失败 → `false`

use std::sync::Arc;

use parking_lot::Mutex;
use stiffrig_protocol::{BitAddress, WordAddress};
use tracing::{debug, warn};

use crate::{ControllerSession, SessionError};

type BoxedSession = Box<dyn ControllerSession + Send>;

/// 会话共享句柄（可克隆，克隆体指向同一会话）
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<BoxedSession>>,
    address: Arc<str>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn new(session: impl ControllerSession + Send + 'static) -> Self {
        let address: Arc<str> = Arc::from(session.address());
        Self {
            inner: Arc::new(Mutex::new(Box::new(session))),
            address,
        }
    }

    /// 控制器地址
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().is_connected()
    }

    /// 尝试（重新）连接，成功返回 `true`
    pub fn connect(&self) -> bool {
        match self.inner.lock().connect() {
            Ok(()) => true,
            Err(e) => {
                debug!("Connect to {} failed: {}", self.address, e);
                false
            },
        }
    }

    /// CPU 状态；不可用时返回 `"unknown"`
    pub fn cpu_state(&self) -> String {
        self.inner
            .lock()
            .cpu_state()
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn read_bool(&self, addr: BitAddress) -> Option<bool> {
        let result = self.inner.lock().read_bool(addr);
        Self::unavailable_as_none(result, || addr.to_string())
    }

    pub fn write_bool(&self, addr: BitAddress, value: bool) -> bool {
        let result = self.inner.lock().write_bool(addr, value);
        Self::write_ok(result, || format!("{} = {}", addr, value))
    }

    pub fn read_real(&self, addr: WordAddress) -> Option<f32> {
        let result = self.inner.lock().read_real(addr);
        Self::unavailable_as_none(result, || addr.to_string())
    }

    pub fn write_real(&self, addr: WordAddress, value: f32) -> bool {
        let result = self.inner.lock().write_real(addr, value);
        Self::write_ok(result, || format!("{} = {}", addr, value))
    }

    pub fn read_int(&self, addr: WordAddress) -> Option<i16> {
        let result = self.inner.lock().read_int(addr);
        Self::unavailable_as_none(result, || addr.to_string())
    }

    pub fn read_analog_input(&self, channel: u16) -> Option<i16> {
        let result = self.inner.lock().read_analog_input(channel);
        Self::unavailable_as_none(result, || format!("AI{}", channel))
    }

    fn unavailable_as_none<T>(
        result: Result<T, SessionError>,
        what: impl FnOnce() -> String,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(SessionError::NotConnected) => None,
            Err(e) => {
                debug!("Read {} unavailable: {}", what(), e);
                None
            },
        }
    }

    fn write_ok(result: Result<(), SessionError>, what: impl FnOnce() -> String) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Write {} failed: {}", what(), e);
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedSession;
    use proptest::prelude::*;
    use stiffrig_protocol::map::{db2, db3};

    #[test]
    fn test_handle_reads_through_to_session() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_bool(db3::SAFETY_OK, true);
        sim.set_real(db2::FORCE_KN, 12.5);
        sim.set_int(db2::SN_CLASS, 8000);

        let handle = SessionHandle::new(sim.clone());
        assert_eq!(handle.address(), "192.168.0.1");
        assert!(handle.is_connected());
        assert_eq!(handle.read_bool(db3::SAFETY_OK), Some(true));
        assert_eq!(handle.read_real(db2::FORCE_KN), Some(12.5));
        assert_eq!(handle.read_int(db2::SN_CLASS), Some(8000));
        assert_eq!(handle.cpu_state(), "run");
    }

    #[test]
    fn test_disconnected_reads_are_unavailable() {
        let sim = SimulatedSession::disconnected("192.168.0.1");
        let handle = SessionHandle::new(sim.clone());
        assert_eq!(handle.read_bool(db3::ENABLE), None);
        assert_eq!(handle.read_real(db2::FORCE_KN), None);
        assert_eq!(handle.read_int(db2::TEST_STATUS), None);
        assert!(!handle.write_bool(db3::ENABLE, true));
        assert_eq!(handle.cpu_state(), "unknown");
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_timeout_is_unavailable() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.fail_reads_at(db2::FORCE_KN);
        let handle = SessionHandle::new(sim);
        assert_eq!(handle.read_real(db2::FORCE_KN), None);
        assert!(handle.is_connected());
    }

    #[test]
    fn test_analog_input_via_handle() {
        let sim = SimulatedSession::new("192.168.0.1");
        sim.set_analog_input(0, 13_824);
        let handle = SessionHandle::new(sim.clone());
        assert_eq!(handle.read_analog_input(0), Some(13_824));
        // 未配置的通道
        assert_eq!(handle.read_analog_input(7), None);

        sim.set_connected(false);
        assert_eq!(handle.read_analog_input(0), None);
    }

    #[test]
    fn test_connect_via_handle() {
        let sim = SimulatedSession::disconnected("192.168.0.1");
        sim.script_connect([false]);
        let handle = SessionHandle::new(sim.clone());
        assert!(!handle.connect());
        assert!(handle.connect());
        assert!(handle.is_connected());
    }

    #[test]
    fn test_handle_is_shared_across_threads() {
        let sim = SimulatedSession::new("192.168.0.1");
        let handle = SessionHandle::new(sim.clone());

        let workers: Vec<_> = (0..4u8)
            .map(|bit| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    let addr = BitAddress::new(3, 40, bit);
                    for _ in 0..100 {
                        assert!(handle.write_bool(addr, true));
                        assert_eq!(handle.read_bool(addr), Some(true));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(sim.writes().len(), 400);
    }

    proptest! {
        #[test]
        fn prop_bool_write_read_round_trip(
            block in 1u16..=4,
            byte in 0u16..128,
            bit in 0u8..8,
            value: bool,
        ) {
            let handle = SessionHandle::new(SimulatedSession::new("sim"));
            let addr = BitAddress::new(block, byte, bit);
            prop_assert!(handle.write_bool(addr, value));
            prop_assert_eq!(handle.read_bool(addr), Some(value));
        }

        #[test]
        fn prop_real_write_read_round_trip(
            block in 1u16..=4,
            byte in 0u16..128,
            value in -1.0e6f32..1.0e6,
        ) {
            let handle = SessionHandle::new(SimulatedSession::new("sim"));
            let addr = WordAddress::new(block, byte);
            prop_assert!(handle.write_real(addr, value));
            prop_assert_eq!(handle.read_real(addr), Some(value));
        }
    }
}
