//! 瞄准 IK
//!
//! 旋转一条骨骼链，使瞄准关节的局部轴指向目标（头部注视、持枪）。
//! 越靠近末端的骨骼分到的旋转越多。

use glam::{Quat, Vec3};

use crate::config::get_config;
use crate::diagnostics::DiagnosticSink;
use crate::error::{IkError, Result};
use crate::limits::RotationLimit;
use crate::math::{from_to_rotation, vector_angle_degrees};
use crate::skeleton::{JointFlags, Skeleton};
use super::{check_chain, ChainBone};

/// 瞄准求解器
#[derive(Clone, Debug)]
pub struct AimSolver {
    /// 根 → 末端，全部参与旋转
    pub bones: Vec<ChainBone>,
    /// 瞄准关节（末端骨骼或其后代）
    pub aim_joint: usize,
    /// 瞄准关节的局部瞄准轴
    pub axis: Vec3,
    /// 目标位置
    pub target: Vec3,
    /// 权重 [0, 1]
    pub position_weight: f32,
    /// 最大迭代次数
    pub max_iterations: u32,
    /// 角度容差（度）
    pub tolerance: f32,
    pub use_rotation_limits: bool,
    initiated: bool,
}

impl AimSolver {
    pub fn new(bones: Vec<ChainBone>, aim_joint: usize, axis: Vec3) -> Self {
        Self {
            bones,
            aim_joint,
            axis,
            target: Vec3::ZERO,
            position_weight: 1.0,
            max_iterations: get_config().ccd_default_iterations,
            tolerance: 0.0,
            use_rotation_limits: true,
            initiated: false,
        }
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.initiated
    }

    /// 瞄准轴的世界方向
    #[inline]
    pub fn aim_direction(&self, skeleton: &Skeleton) -> Vec3 {
        skeleton.rotation(self.aim_joint) * self.axis
    }

    /// 瞄准轴与目标方向的夹角（度）
    pub fn angle_to_target(&self, skeleton: &Skeleton) -> f32 {
        let to_target = self.target - skeleton.position(self.aim_joint);
        vector_angle_degrees(self.aim_direction(skeleton), to_target)
    }

    pub fn initiate(&mut self, skeleton: &mut Skeleton, _diag: &mut dyn DiagnosticSink) -> Result<()> {
        self.initiated = false;
        check_chain(skeleton, &self.bones, 1)?;
        skeleton.check(self.aim_joint)?;
        self.axis = self.axis.try_normalize().ok_or(IkError::ZeroAxis)?;

        let last = self.bones[self.bones.len() - 1].joint;
        if self.aim_joint != last && !skeleton.is_ancestor(last, self.aim_joint) {
            return Err(IkError::InvalidChain(format!(
                "aim joint {} is not driven by chain end {}",
                self.aim_joint, last
            )));
        }

        for bone in &self.bones {
            skeleton.set_flag(bone.joint, JointFlags::IK_DRIVEN, true);
        }
        self.target = skeleton.position(self.aim_joint) + self.aim_direction(skeleton);
        self.initiated = true;
        Ok(())
    }

    pub fn solve(&mut self, skeleton: &mut Skeleton, limits: &mut [Option<RotationLimit>]) {
        if !self.initiated {
            return;
        }
        let weight = self.position_weight.clamp(0.0, 1.0);
        if weight <= 0.0 {
            return;
        }

        let epsilon = get_config().epsilon;
        for _ in 0..self.max_iterations {
            if self.angle_to_target(skeleton) <= self.tolerance {
                break;
            }
            let count = self.bones.len();
            for (i, bone) in self.bones.iter().enumerate() {
                let to_target = self.target - skeleton.position(self.aim_joint);
                if to_target.length_squared() <= epsilon {
                    return;
                }
                // 第 i 根骨骼承担剩余旋转的 1/(n-i)
                let fraction = (bone.weight * weight).clamp(0.0, 1.0) / (count - i) as f32;
                if fraction <= 0.0 {
                    continue;
                }
                let delta = from_to_rotation(self.aim_direction(skeleton), to_target);
                skeleton.rotate(bone.joint, Quat::IDENTITY.slerp(delta, fraction));

                if self.use_rotation_limits {
                    if let Some(Some(limit)) = limits.get_mut(bone.joint) {
                        limit.apply(skeleton, bone.joint);
                        skeleton.set_flag(bone.joint, JointFlags::SOLVER_LIMITED, true);
                    }
                }
            }
        }
    }
}
