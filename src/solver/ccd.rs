//! CCD IK 求解器
//!
//! 设计原则：
//! - 从末端向根逐骨骼旋转，让末端指向目标
//! - 每根骨骼旋转后立即应用旋转限制
//! - 距离不再缩短时回退到最佳结果并退出

use glam::{Quat, Vec3};

use crate::config::get_config;
use crate::diagnostics::{DiagnosticCode, DiagnosticSink};
use crate::error::Result;
use crate::limits::RotationLimit;
use crate::math::from_to_rotation;
use crate::skeleton::{JointFlags, Skeleton};
use super::{check_chain, ChainBone};

/// CCD 求解器
#[derive(Clone, Debug)]
pub struct CcdSolver {
    /// 根 → 末端，最后一根是末端执行器（只取位置，不旋转）
    pub bones: Vec<ChainBone>,
    /// 目标位置
    pub target: Vec3,
    /// 位置权重 [0, 1]
    pub position_weight: f32,
    /// 最大迭代次数
    pub max_iterations: u32,
    /// 距离容差，达到后提前退出
    pub tolerance: f32,
    /// 迭代内应用旋转限制
    pub use_rotation_limits: bool,
    initiated: bool,
}

impl CcdSolver {
    pub fn new(bones: Vec<ChainBone>) -> Self {
        let config = get_config();
        Self {
            bones,
            target: Vec3::ZERO,
            position_weight: 1.0,
            max_iterations: config.ccd_default_iterations,
            tolerance: config.ccd_default_tolerance,
            use_rotation_limits: true,
            initiated: false,
        }
    }

    /// 由关节索引创建，权重全为 1
    pub fn from_joints(joints: &[usize]) -> Self {
        Self::new(joints.iter().map(|&j| ChainBone::new(j)).collect())
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.initiated
    }

    /// 末端执行器
    #[inline]
    pub fn tip(&self) -> Option<usize> {
        self.bones.last().map(|b| b.joint)
    }

    pub fn initiate(&mut self, skeleton: &mut Skeleton, diag: &mut dyn DiagnosticSink) -> Result<()> {
        self.initiated = false;
        check_chain(skeleton, &self.bones, 2)?;

        let epsilon = get_config().epsilon;
        for pair in self.bones.windows(2) {
            let length = (skeleton.position(pair[1].joint) - skeleton.position(pair[0].joint)).length();
            if length <= epsilon {
                diag.warning(
                    DiagnosticCode::DegenerateChain,
                    format!("zero length segment between joints {} and {}", pair[0].joint, pair[1].joint),
                );
            }
        }

        for bone in &self.bones[..self.bones.len() - 1] {
            skeleton.set_flag(bone.joint, JointFlags::IK_DRIVEN, true);
        }
        if let Some(tip) = self.tip() {
            self.target = skeleton.position(tip);
        }
        self.initiated = true;
        Ok(())
    }

    /// 求解
    pub fn solve(&mut self, skeleton: &mut Skeleton, limits: &mut [Option<RotationLimit>]) {
        if !self.initiated {
            return;
        }
        let Some(tip) = self.tip() else {
            return;
        };
        let weight = self.position_weight.clamp(0.0, 1.0);
        if weight <= 0.0 {
            return;
        }

        let target = skeleton.position(tip).lerp(self.target, weight);
        let mut best_distance = (skeleton.position(tip) - target).length();
        let mut best_rotations = self.local_rotations(skeleton);

        for _ in 0..self.max_iterations {
            if best_distance <= self.tolerance {
                break;
            }
            self.solve_iteration(skeleton, limits, tip, target);

            let distance = (skeleton.position(tip) - target).length();
            if distance < best_distance {
                best_distance = distance;
                best_rotations = self.local_rotations(skeleton);
            } else {
                // 恢复最佳结果并退出
                self.restore(skeleton, &best_rotations);
                break;
            }
        }
    }

    fn solve_iteration(
        &self,
        skeleton: &mut Skeleton,
        limits: &mut [Option<RotationLimit>],
        tip: usize,
        target: Vec3,
    ) {
        let epsilon = get_config().epsilon;
        for bone in self.bones[..self.bones.len() - 1].iter().rev() {
            let weight = bone.weight.clamp(0.0, 1.0);
            if weight <= 0.0 {
                continue;
            }
            let position = skeleton.position(bone.joint);
            let to_tip = skeleton.position(tip) - position;
            let to_target = target - position;
            if to_tip.length_squared() <= epsilon || to_target.length_squared() <= epsilon {
                continue;
            }

            let mut delta = from_to_rotation(to_tip, to_target);
            if weight < 1.0 {
                delta = Quat::IDENTITY.slerp(delta, weight);
            }
            skeleton.rotate(bone.joint, delta);

            if self.use_rotation_limits {
                if let Some(Some(limit)) = limits.get_mut(bone.joint) {
                    limit.apply(skeleton, bone.joint);
                    skeleton.set_flag(bone.joint, JointFlags::SOLVER_LIMITED, true);
                }
            }
        }
    }

    fn local_rotations(&self, skeleton: &Skeleton) -> Vec<Quat> {
        self.bones
            .iter()
            .map(|b| skeleton.joint(b.joint).map(|j| j.local_rotation).unwrap_or(Quat::IDENTITY))
            .collect()
    }

    fn restore(&self, skeleton: &mut Skeleton, rotations: &[Quat]) {
        for (bone, &rotation) in self.bones.iter().zip(rotations) {
            skeleton.set_local_rotation(bone.joint, rotation);
        }
    }
}
