//! 客户端接口模块
//!
//! 本模块提供试验机的命令接口，包括：
//! - 命令调度器（联锁检查、脉冲命令、点动互斥）
//! - 订阅者点动请求转发
//! - 显式上下文对象（替代进程级全局句柄）
//!
//! # 使用场景
//!
//! 请求处理层持有一个 [`RigContext`]，命令通过 [`RigContext::dispatcher`] 下发，
//! 遥测通过订阅者注册表或 [`RigContext::latest_snapshot`] 获取。

pub mod context;
pub mod dispatcher;
pub mod relay;

pub use context::{RigBuilder, RigContext};
pub use dispatcher::CommandDispatcher;
pub use relay::JogRelay;
