//! # Stiffrig Tools
//!
//! 共享配置与命令策略（无 IO 依赖，除配置文件读取外）
//!
//! ## 模块
//!
//! - `config`: 试验机配置（TOML）
//! - `policy`: 点动速度 / 步进距离策略

pub mod config;
pub mod policy;

use std::path::PathBuf;

use thiserror::Error;

pub use config::{BroadcastConfig, ControllerConfig, PulseTiming, RigConfig};
pub use policy::{JogPolicy, StepPolicy};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// 字段取值非法（如 min >= max）
    #[error("Invalid config: {0}")]
    Invalid(String),
}
