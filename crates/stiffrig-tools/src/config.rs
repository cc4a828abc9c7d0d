//! # 试验机配置
//!
//! 配置文件为 TOML，所有字段都有默认值，空文件即默认配置：
//!
//! ```toml
//! [controller]
//! address = "192.168.0.1"
//! profile = "servo"        # 或 "hmi-panel"
//!
//! [broadcast]
//! tick_ms = 100
//! reconnect_interval_ms = 5000
//!
//! [jog]
//! min_velocity = 1.2
//! max_velocity = 6000.0
//!
//! [step]
//! min_distance = 0.1
//! max_distance = 100.0
//!
//! [pulse]
//! short_hold_ms = 100
//! reset_hold_ms = 500
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stiffrig_protocol::HardwareProfile;

use crate::ConfigError;
use crate::policy::{JogPolicy, StepPolicy};

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RigConfig {
    pub controller: ControllerConfig,
    pub broadcast: BroadcastConfig,
    pub jog: JogPolicy,
    pub step: StepPolicy,
    pub pulse: PulseTiming,
}

/// 控制器连接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub address: String,
    pub profile: HardwareProfile,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            address: "192.168.0.1".to_string(),
            profile: HardwareProfile::Servo,
        }
    }
}

/// 广播循环节拍
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub tick_ms: u64,
    pub reconnect_interval_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            reconnect_interval_ms: 5000,
        }
    }
}

impl BroadcastConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// 断连状态下每隔多少个节拍尝试一次重连
    ///
    /// `max(1, reconnect_interval / tick)`，默认值为 50。
    pub fn reconnect_threshold(&self) -> u32 {
        let ticks = self.reconnect_interval_ms / self.tick_ms.max(1);
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }
}

/// 脉冲命令保持时间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseTiming {
    /// 去皮 / 位移清零 / 急停
    pub short_hold_ms: u64,
    /// 报警复位
    pub reset_hold_ms: u64,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            short_hold_ms: 100,
            reset_hold_ms: 500,
        }
    }
}

impl PulseTiming {
    pub fn short_hold(&self) -> Duration {
        Duration::from_millis(self.short_hold_ms)
    }

    pub fn reset_hold(&self) -> Duration {
        Duration::from_millis(self.reset_hold_ms)
    }
}

impl RigConfig {
    /// 从文件加载并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RigConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 检查字段之间的约束
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.address.trim().is_empty() {
            return Err(ConfigError::Invalid("controller.address must not be empty".into()));
        }
        if self.broadcast.tick_ms == 0 {
            return Err(ConfigError::Invalid("broadcast.tick_ms must be > 0".into()));
        }
        if !(self.jog.min_velocity > 0.0 && self.jog.min_velocity < self.jog.max_velocity) {
            return Err(ConfigError::Invalid(format!(
                "jog velocity range invalid: min={} max={}",
                self.jog.min_velocity, self.jog.max_velocity
            )));
        }
        if !(self.step.min_distance > 0.0 && self.step.min_distance < self.step.max_distance) {
            return Err(ConfigError::Invalid(format!(
                "step distance range invalid: min={} max={}",
                self.step.min_distance, self.step.max_distance
            )));
        }
        Ok(())
    }
}
