//! 模拟控制器
//!
//! 内存中的数据块，按控制器的字节序（大端）存储 REAL / INT。
//! `SimulatedSession` 可克隆：克隆体共享同一块状态，测试代码可以在会话被
//! [`SessionHandle`](crate::SessionHandle) 持有时继续修改寄存器、切换连接状态、查看写入记录。

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use stiffrig_protocol::{BitAddress, RegisterAddress, WordAddress};

use crate::{ControllerSession, SessionError};

/// 写入值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteValue {
    Bool(bool),
    Real(f32),
}

/// 一次成功的写入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteRecord {
    pub address: RegisterAddress,
    pub value: WriteValue,
}

#[derive(Debug)]
struct SimState {
    connected: bool,
    cpu_state: String,
    blocks: HashMap<u16, Vec<u8>>,
    analog_inputs: HashMap<u16, i16>,
    writes: Vec<WriteRecord>,
    failing_reads: HashSet<RegisterAddress>,
    failing_writes: HashSet<RegisterAddress>,
    /// 依次消费的连接结果；为空时使用 `connect_default`
    connect_script: VecDeque<bool>,
    connect_default: bool,
    connect_attempts: usize,
    /// 剩余可成功读取次数，耗尽后连接断开
    reads_before_drop: Option<usize>,
}

impl SimState {
    fn block_mut(&mut self, block: u16, len: usize) -> &mut [u8] {
        let data = self.blocks.entry(block).or_default();
        if data.len() < len {
            data.resize(len, 0);
        }
        data.as_mut_slice()
    }

    fn bytes(&self, block: u16, byte: u16, len: usize) -> [u8; 4] {
        let mut out = [0u8; 4];
        if let Some(data) = self.blocks.get(&block) {
            let start = byte as usize;
            for (i, slot) in out.iter_mut().take(len).enumerate() {
                *slot = data.get(start + i).copied().unwrap_or(0);
            }
        }
        out
    }

    fn check_read(&mut self, addr: RegisterAddress) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        if let Some(remaining) = self.reads_before_drop.as_mut() {
            if *remaining == 0 {
                self.connected = false;
                self.reads_before_drop = None;
                return Err(SessionError::NotConnected);
            }
            *remaining -= 1;
        }
        if self.failing_reads.contains(&addr) {
            return Err(SessionError::Timeout);
        }
        Ok(())
    }

    fn check_write(&self, addr: RegisterAddress) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        if self.failing_writes.contains(&addr) {
            return Err(SessionError::Transport(format!("write to {} refused", addr)));
        }
        Ok(())
    }
}

/// 模拟控制器会话
#[derive(Debug, Clone)]
pub struct SimulatedSession {
    address: Arc<str>,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSession {
    /// 创建已连接的模拟控制器
    pub fn new(address: impl Into<String>) -> Self {
        let address: String = address.into();
        Self {
            address: Arc::from(address),
            state: Arc::new(Mutex::new(SimState {
                connected: true,
                cpu_state: "run".to_string(),
                blocks: HashMap::new(),
                analog_inputs: HashMap::new(),
                writes: Vec::new(),
                failing_reads: HashSet::new(),
                failing_writes: HashSet::new(),
                connect_script: VecDeque::new(),
                connect_default: true,
                connect_attempts: 0,
                reads_before_drop: None,
            })),
        }
    }

    /// 创建未连接的模拟控制器
    pub fn disconnected(address: impl Into<String>) -> Self {
        let sim = Self::new(address);
        sim.set_connected(false);
        sim
    }

    // ==================== 连接控制 ====================

    /// 直接设置连接标志（模拟网线拔插）
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// 之后的 `connect()` 调用依次返回给定结果
    pub fn script_connect(&self, results: impl IntoIterator<Item = bool>) {
        self.state.lock().connect_script.extend(results);
    }

    /// 脚本耗尽后 `connect()` 的结果
    pub fn set_connect_default(&self, succeeds: bool) {
        self.state.lock().connect_default = succeeds;
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    /// 再成功读取 `reads` 次后断开连接
    pub fn drop_connection_after_reads(&self, reads: usize) {
        self.state.lock().reads_before_drop = Some(reads);
    }

    pub fn set_cpu_state(&self, cpu_state: impl Into<String>) {
        self.state.lock().cpu_state = cpu_state.into();
    }

    // ==================== 故障注入 ====================

    /// 让某个地址的读取超时
    pub fn fail_reads_at(&self, addr: impl Into<RegisterAddress>) {
        self.state.lock().failing_reads.insert(addr.into());
    }

    /// 让某个地址的写入失败
    pub fn fail_writes_at(&self, addr: impl Into<RegisterAddress>) {
        self.state.lock().failing_writes.insert(addr.into());
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.failing_reads.clear();
        state.failing_writes.clear();
    }

    // ==================== 寄存器访问（绕过连接检查）====================

    /// 设置布尔位（模拟控制器侧变化，不记录写入）
    pub fn set_bool(&self, addr: BitAddress, value: bool) {
        let mut state = self.state.lock();
        let data = state.block_mut(addr.block, addr.byte as usize + 1);
        let byte = &mut data[addr.byte as usize];
        if value {
            *byte |= addr.mask();
        } else {
            *byte &= !addr.mask();
        }
    }

    pub fn get_bool(&self, addr: BitAddress) -> bool {
        let state = self.state.lock();
        state.bytes(addr.block, addr.byte, 1)[0] & addr.mask() != 0
    }

    pub fn set_real(&self, addr: WordAddress, value: f32) {
        let mut state = self.state.lock();
        let start = addr.byte as usize;
        let data = state.block_mut(addr.block, start + 4);
        data[start..start + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn get_real(&self, addr: WordAddress) -> f32 {
        let state = self.state.lock();
        f32::from_be_bytes(state.bytes(addr.block, addr.byte, 4))
    }

    pub fn set_int(&self, addr: WordAddress, value: i16) {
        let mut state = self.state.lock();
        let start = addr.byte as usize;
        let data = state.block_mut(addr.block, start + 2);
        data[start..start + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub fn get_int(&self, addr: WordAddress) -> i16 {
        let state = self.state.lock();
        let bytes = state.bytes(addr.block, addr.byte, 2);
        i16::from_be_bytes([bytes[0], bytes[1]])
    }

    pub fn set_analog_input(&self, channel: u16, value: i16) {
        self.state.lock().analog_inputs.insert(channel, value);
    }

    // ==================== 写入记录 ====================

    /// 所有成功写入（按时间顺序）
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().writes.clone()
    }

    /// 某个地址上的写入值序列
    pub fn writes_to(&self, addr: impl Into<RegisterAddress>) -> Vec<WriteValue> {
        let addr = addr.into();
        self.state
            .lock()
            .writes
            .iter()
            .filter(|w| w.address == addr)
            .map(|w| w.value)
            .collect()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }
}

impl ControllerSession for SimulatedSession {
    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn connect(&mut self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;
        if state.connected {
            return Ok(());
        }
        let succeeds = state
            .connect_script
            .pop_front()
            .unwrap_or(state.connect_default);
        if succeeds {
            state.connected = true;
            Ok(())
        } else {
            Err(SessionError::Transport(format!(
                "connection to {} refused",
                self.address
            )))
        }
    }

    fn cpu_state(&mut self) -> Result<String, SessionError> {
        let state = self.state.lock();
        if !state.connected {
            return Err(SessionError::NotConnected);
        }
        Ok(state.cpu_state.clone())
    }

    fn read_bool(&mut self, addr: BitAddress) -> Result<bool, SessionError> {
        self.state.lock().check_read(addr.into())?;
        Ok(self.get_bool(addr))
    }

    fn write_bool(&mut self, addr: BitAddress, value: bool) -> Result<(), SessionError> {
        self.state.lock().check_write(addr.into())?;
        self.set_bool(addr, value);
        self.state.lock().writes.push(WriteRecord {
            address: addr.into(),
            value: WriteValue::Bool(value),
        });
        Ok(())
    }

    fn read_real(&mut self, addr: WordAddress) -> Result<f32, SessionError> {
        self.state.lock().check_read(addr.into())?;
        Ok(self.get_real(addr))
    }

    fn write_real(&mut self, addr: WordAddress, value: f32) -> Result<(), SessionError> {
        self.state.lock().check_write(addr.into())?;
        self.set_real(addr, value);
        self.state.lock().writes.push(WriteRecord {
            address: addr.into(),
            value: WriteValue::Real(value),
        });
        Ok(())
    }

    fn read_int(&mut self, addr: WordAddress) -> Result<i16, SessionError> {
        self.state.lock().check_read(addr.into())?;
        Ok(self.get_int(addr))
    }

    fn read_analog_input(&mut self, channel: u16) -> Result<i16, SessionError> {
        let state = self.state.lock();
        if !state.connected {
            return Err(SessionError::NotConnected);
        }
        state
            .analog_inputs
            .get(&channel)
            .copied()
            .ok_or_else(|| SessionError::InvalidAddress(format!("analog input {}", channel)))
    }
}
