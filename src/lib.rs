//! 肢体 IK 引擎
//!
//! 核心设计思想：
//! - Skeleton: 关节 arena，父索引组成层级
//! - RotationLimit: 角度 / 铰链 / 多边形 / 样条四种旋转限制
//! - IkSolver: 三点、肢体、CCD、瞄准、双足求解器
//! - IkRig: 宿主每帧显式调用 tick

pub mod biped;
pub mod config;
pub mod curve;
pub mod diagnostics;
pub mod error;
pub mod limits;
pub mod math;
pub mod rig;
pub mod skeleton;
pub mod solver;

pub use biped::{BipedIk, BipedReferences, HumanBone, HumanoidMapping, Limb};
pub use config::{get_config, reset_config, set_config, SolverConfig};
pub use curve::{Curve, Keyframe, LimitCurve};
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Diagnostics, Severity};
pub use error::{IkError, Result};
pub use limits::{LimitKind, RotationLimit};
pub use rig::{tick_all, IkRig, UpdateMode};
pub use skeleton::{Joint, JointFlags, Skeleton};
pub use solver::{
    solve_three_point_chain, AimSolver, BendModifier, CcdSolver, ChainBone, IkSolver, LimbSolver,
    ThreePointChain, ThreePointPose, TrigonometricSolver,
};
