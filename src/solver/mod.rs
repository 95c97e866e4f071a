//! IK 求解器
//!
//! 所有求解器是一个封闭集合，通过 `IkSolver` 统一派发。

mod aim;
mod ccd;
mod limb;
mod trigonometric;

pub use aim::AimSolver;
pub use ccd::CcdSolver;
pub use limb::{BendModifier, LimbSolver};
pub use trigonometric::{
    bend_point_offset, solve_three_point_chain, ThreePointChain, ThreePointPose, TrigonometricSolver,
};

use crate::biped::BipedIk;
use crate::diagnostics::DiagnosticSink;
use crate::error::{IkError, Result};
use crate::limits::RotationLimit;
use crate::skeleton::Skeleton;

/// 链上的一根骨骼
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainBone {
    pub joint: usize,
    /// 旋转权重 [0, 1]
    pub weight: f32,
}

impl ChainBone {
    pub fn new(joint: usize) -> Self {
        Self { joint, weight: 1.0 }
    }

    pub fn with_weight(joint: usize, weight: f32) -> Self {
        Self { joint, weight }
    }
}

/// 检查骨骼链：索引有效、数量足够、每根都是下一根的祖先
pub(crate) fn check_chain(skeleton: &Skeleton, bones: &[ChainBone], min_len: usize) -> Result<()> {
    if bones.len() < min_len {
        return Err(IkError::InvalidChain(format!(
            "need at least {} bones, got {}",
            min_len,
            bones.len()
        )));
    }
    for bone in bones {
        skeleton.check(bone.joint)?;
    }
    for pair in bones.windows(2) {
        if !skeleton.is_ancestor(pair[0].joint, pair[1].joint) {
            return Err(IkError::InvalidChain(format!(
                "joint {} is not an ancestor of {}",
                pair[0].joint, pair[1].joint
            )));
        }
    }
    Ok(())
}

/// 求解器
#[derive(Clone, Debug)]
pub enum IkSolver {
    Trigonometric(TrigonometricSolver),
    Limb(LimbSolver),
    Ccd(CcdSolver),
    Aim(AimSolver),
    Biped(Box<BipedIk>),
}

impl IkSolver {
    pub fn initiate(&mut self, skeleton: &mut Skeleton, diag: &mut dyn DiagnosticSink) -> Result<()> {
        match self {
            Self::Trigonometric(s) => s.initiate(skeleton, diag),
            Self::Limb(s) => s.initiate(skeleton, diag),
            Self::Ccd(s) => s.initiate(skeleton, diag),
            Self::Aim(s) => s.initiate(skeleton, diag),
            Self::Biped(s) => s.initiate(skeleton, diag),
        }
    }

    pub fn solve(&mut self, skeleton: &mut Skeleton, limits: &mut [Option<RotationLimit>]) {
        match self {
            Self::Trigonometric(s) => s.solve(skeleton),
            Self::Limb(s) => s.solve(skeleton),
            Self::Ccd(s) => s.solve(skeleton, limits),
            Self::Aim(s) => s.solve(skeleton, limits),
            Self::Biped(s) => s.solve(skeleton, limits),
        }
    }

    pub fn is_initiated(&self) -> bool {
        match self {
            Self::Trigonometric(s) => s.is_initiated(),
            Self::Limb(s) => s.is_initiated(),
            Self::Ccd(s) => s.is_initiated(),
            Self::Aim(s) => s.is_initiated(),
            Self::Biped(s) => s.is_initiated(),
        }
    }

    /// 求解器名称（日志用）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Trigonometric(_) => "trigonometric",
            Self::Limb(_) => "limb",
            Self::Ccd(_) => "ccd",
            Self::Aim(_) => "aim",
            Self::Biped(_) => "biped",
        }
    }
}

impl From<TrigonometricSolver> for IkSolver {
    fn from(s: TrigonometricSolver) -> Self {
        Self::Trigonometric(s)
    }
}

impl From<LimbSolver> for IkSolver {
    fn from(s: LimbSolver) -> Self {
        Self::Limb(s)
    }
}

impl From<CcdSolver> for IkSolver {
    fn from(s: CcdSolver) -> Self {
        Self::Ccd(s)
    }
}

impl From<AimSolver> for IkSolver {
    fn from(s: AimSolver) -> Self {
        Self::Aim(s)
    }
}

impl From<BipedIk> for IkSolver {
    fn from(s: BipedIk) -> Self {
        Self::Biped(Box::new(s))
    }
}
