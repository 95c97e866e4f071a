//! 骨骼系统
//!
//! 核心设计思想：
//! - Joint: 单个关节节点，父索引链接
//! - Skeleton: 关节 arena，管理层级与正向运动学

mod joint;
mod arena;

pub use joint::{Joint, JointFlags};
pub use arena::Skeleton;
