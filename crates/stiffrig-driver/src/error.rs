//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 无法创建广播线程
    #[error("Failed to spawn broadcast thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// 广播循环已经在运行
    #[error("Broadcast loop already running")]
    AlreadyRunning,

    /// 订阅者的接收端已关闭
    #[error("Subscriber disconnected: {0}")]
    SinkDisconnected(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::ThreadSpawn(std::io::Error::other("no threads left"));
        assert!(err.to_string().contains("no threads left"));

        assert_eq!(
            DriverError::AlreadyRunning.to_string(),
            "Broadcast loop already running"
        );

        let err = DriverError::SinkDisconnected("channel#3".to_string());
        assert!(err.to_string().contains("channel#3"));
    }
}
