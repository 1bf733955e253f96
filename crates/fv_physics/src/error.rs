// crates/fv_physics/src/error.rs

//! 物理核心错误类型
//!
//! 几何退化（插值降阶、梯度奇异）在局部恢复，不会出现在这里；
//! 这里只收录需要中止运行的错误。

use fv_config::ConfigError;

/// 物理核心错误
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 网格不合法
    #[error("无效网格: {0}")]
    InvalidMesh(String),

    /// 外部线性求解失败
    #[error("线性求解失败 (第 {step} 步, 子步 {substep}): {reason}")]
    LinearSolve {
        /// 物理时间步
        step: usize,
        /// 伪时间子步
        substep: usize,
        /// 失败原因
        reason: String,
    },

    /// 输出 IO 错误
    #[error("输出错误: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 其他分区在集体阶段出错，本分区随之中止
    #[error("分区 {rank} 在{stage}阶段出错，运行中止")]
    PeerFailed {
        /// 本分区编号
        rank: usize,
        /// 出错阶段
        stage: &'static str,
    },

    /// 重启快照与当前分区不匹配
    #[error("重启快照不匹配 (分区 {rank}): {reason}")]
    RestartMismatch {
        /// 分区编号
        rank: usize,
        /// 原因
        reason: String,
    },
}

impl PhysicsError {
    /// 构造网格错误
    pub fn invalid_mesh(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }
}

/// 物理核心结果类型
pub type PhysicsResult<T> = Result<T, PhysicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_solve_display() {
        let err = PhysicsError::LinearSolve {
            step: 3,
            substep: 2,
            reason: "diverged".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("第 3 步"));
        assert!(msg.contains("diverged"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: PhysicsError = ConfigError::Missing("fluid_properties".into()).into();
        assert!(matches!(err, PhysicsError::Config(_)));
    }
}
