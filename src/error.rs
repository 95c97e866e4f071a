//! 错误类型
//!
//! 只覆盖初始化阶段的配置错误；每帧求解路径不返回错误。

use thiserror::Error;

/// IK 引擎错误
#[derive(Debug, Error)]
pub enum IkError {
    /// 关节索引越界
    #[error("joint index {0} out of range")]
    JointIndex(usize),

    /// 旋转限制轴为零向量
    #[error("rotation limit axis must be non-zero")]
    ZeroAxis,

    /// 多边形限制点不足
    #[error("polygonal limit needs at least 3 points, got {0}")]
    TooFewLimitPoints(usize),

    /// 曲线没有关键帧
    #[error("limit curve has no keyframes")]
    EmptyCurve,

    /// 骨骼链无效（长度、层级、重复）
    #[error("invalid chain: {0}")]
    InvalidChain(String),

    /// 双足骨骼引用无效
    #[error("invalid biped references: {0} error(s)")]
    InvalidReferences(usize),

    /// 求解器尚未初始化
    #[error("solver has not been initiated")]
    NotInitiated,
}

pub type Result<T> = std::result::Result<T, IkError>;
