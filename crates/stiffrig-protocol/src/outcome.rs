//! 命令结果类型
//!
//! 每个会写入控制器的命令都返回 [`CommandOutcome`]，调用方据此区分：
//! - 命令已下发（`Accepted`）
//! - 联锁拒绝（`Rejected`，带 [`RejectReason`]）
//! - 传输层写入失败（`Failed`）

use std::fmt;

use serde::{Deserialize, Serialize};

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// 控制器未连接，未访问总线
    Disconnected,
    /// 本地模式（面板控制），禁止远程运动
    LocalMode,
    /// 控制器报告不允许运动
    MotionBlocked,
    /// 安全回路未就绪
    SafetyNotOk,
    /// 上一次步进尚未完成
    StepInProgress,
    /// 当前不允许切换本地/远程模式（通常是试验进行中）
    ModeChangeBlocked,
    /// 参数超出允许范围
    OutOfRange,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::Disconnected => "DISCONNECTED",
            RejectReason::LocalMode => "LOCAL_MODE",
            RejectReason::MotionBlocked => "MOTION_BLOCKED",
            RejectReason::SafetyNotOk => "SAFETY_NOT_OK",
            RejectReason::StepInProgress => "STEP_IN_PROGRESS",
            RejectReason::ModeChangeBlocked => "MODE_CHANGE_BLOCKED",
            RejectReason::OutOfRange => "OUT_OF_RANGE",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 命令执行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// 所有写入均成功
    Accepted { message: String },
    /// 联锁条件不满足，未写入目标寄存器
    Rejected {
        reason: RejectReason,
        message: String,
    },
    /// 已连接，但写入返回失败（不自动重试）
    Failed { message: String },
}

impl CommandOutcome {
    pub fn accepted(message: impl Into<String>) -> Self {
        CommandOutcome::Accepted {
            message: message.into(),
        }
    }

    pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        CommandOutcome::Rejected {
            reason,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        CommandOutcome::Failed {
            message: message.into(),
        }
    }

    /// 控制器未连接
    pub fn disconnected() -> Self {
        Self::rejected(RejectReason::Disconnected, "Controller not connected")
    }

    /// 根据写入结果构造：成功 → `Accepted`，失败 → `Failed`
    pub fn from_write(ok: bool, success: impl Into<String>, failure: impl Into<String>) -> Self {
        if ok {
            Self::accepted(success)
        } else {
            Self::failed(failure)
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, CommandOutcome::Accepted { .. })
    }

    /// 拒绝原因；`Accepted` 与 `Failed` 返回 `None`
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            CommandOutcome::Rejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CommandOutcome::Accepted { message }
            | CommandOutcome::Rejected { message, .. }
            | CommandOutcome::Failed { message } => message,
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Accepted { message } => write!(f, "ok: {}", message),
            CommandOutcome::Rejected { reason, message } => {
                write!(f, "rejected ({}): {}", reason, message)
            },
            CommandOutcome::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = CommandOutcome::accepted("Tare command sent");
        assert!(ok.success());
        assert_eq!(ok.reason(), None);
        assert_eq!(ok.message(), "Tare command sent");

        let rejected = CommandOutcome::rejected(RejectReason::LocalMode, "System in LOCAL mode");
        assert!(!rejected.success());
        assert_eq!(rejected.reason(), Some(RejectReason::LocalMode));

        let failed = CommandOutcome::failed("write failed");
        assert!(!failed.success());
        assert_eq!(failed.reason(), None);
    }

    #[test]
    fn test_disconnected_outcome() {
        let outcome = CommandOutcome::disconnected();
        assert_eq!(outcome.reason(), Some(RejectReason::Disconnected));
        assert_eq!(outcome.message(), "Controller not connected");
    }

    #[test]
    fn test_from_write() {
        assert!(CommandOutcome::from_write(true, "done", "oops").success());
        let failed = CommandOutcome::from_write(false, "done", "oops");
        assert_eq!(failed, CommandOutcome::failed("oops"));
    }

    #[test]
    fn test_outcome_serialization() {
        let rejected = CommandOutcome::rejected(RejectReason::StepInProgress, "busy");
        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["reason"], "STEP_IN_PROGRESS");
        assert_eq!(json["message"], "busy");
    }

    #[test]
    fn test_display() {
        let rejected = CommandOutcome::rejected(RejectReason::SafetyNotOk, "Safety not OK");
        assert_eq!(rejected.to_string(), "rejected (SAFETY_NOT_OK): Safety not OK");
    }
}
