//! 三点解析 IK
//!
//! 三根骨骼（上臂-前臂-手 / 大腿-小腿-脚），长度在初始化时冻结。
//! 用余弦定理求出中间关节位置，bone1 转向中间关节，bone2 直接指向目标，
//! bone3 直接取目标旋转。

use glam::{Quat, Vec3};

use crate::config::get_config;
use crate::diagnostics::{DiagnosticCode, DiagnosticSink};
use crate::error::{IkError, Result};
use crate::math::{from_to_rotation, look_rotation};
use crate::skeleton::{JointFlags, Skeleton};

// ============================================================================
// 纯函数求解
// ============================================================================

/// 三点链的当前世界姿态
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreePointChain {
    pub positions: [Vec3; 3],
    pub rotations: [Quat; 3],
}

impl ThreePointChain {
    /// 从骨骼读取
    pub fn from_skeleton(skeleton: &Skeleton, bones: [usize; 3]) -> Self {
        Self {
            positions: bones.map(|b| skeleton.position(b)),
            rotations: bones.map(|b| skeleton.rotation(b)),
        }
    }

    /// 当前两段长度
    pub fn lengths(&self) -> (f32, f32) {
        (
            (self.positions[1] - self.positions[0]).length(),
            (self.positions[2] - self.positions[1]).length(),
        )
    }
}

/// 求解结果（世界空间）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreePointPose {
    pub rotations: [Quat; 3],
    pub positions: [Vec3; 3],
}

/// bone1 到中间关节的方向（长度为 bone1 长度）
///
/// x = (d² + L1² - L2²) / 2d，y = sqrt(L1² - x²)，
/// y 沿 direction × bend_normal 方向。
pub fn bend_point_offset(direction: Vec3, length1: f32, length2: f32, bend_normal: Vec3) -> Vec3 {
    let distance = direction.length();
    if distance <= f32::EPSILON {
        return Vec3::ZERO;
    }
    let sqr1 = length1 * length1;
    let sqr2 = length2 * length2;
    let x = (distance * distance + sqr1 - sqr2) / 2.0 / distance;
    let y = (sqr1 - x * x).max(0.0).sqrt();

    let bend_direction = direction.cross(bend_normal);
    look_rotation(direction, bend_direction) * Vec3::new(0.0, y, x)
}

/// 三点链求解
///
/// 目标超出 L1 + L2 时沿 bone1→目标 方向截断到最大长度（完全伸直）。
/// 目标与 bone1 重合时返回 None，调用方保持原旋转不变。
pub fn solve_three_point_chain(
    chain: &ThreePointChain,
    lengths: (f32, f32),
    target_position: Vec3,
    target_rotation: Quat,
    bend_normal: Vec3,
) -> Option<ThreePointPose> {
    let [p1, p2, p3] = chain.positions;
    let [r1, r2, _] = chain.rotations;
    let (length1, length2) = lengths;

    let mut direction = target_position - p1;
    let distance = direction.length();
    if distance <= get_config().epsilon {
        return None;
    }

    let reach = length1 + length2;
    let mut target = target_position;
    if distance > reach {
        direction *= reach / distance;
        target = p1 + direction;
    }

    let to_bend = bend_point_offset(direction, length1, length2, bend_normal);

    // bone1 转向中间关节
    let q1 = from_to_rotation(p2 - p1, to_bend);
    let new_p2 = p1 + q1 * (p2 - p1);
    let rotated_p3 = p1 + q1 * (p3 - p1);

    // bone2 指向目标
    let q2 = from_to_rotation(rotated_p3 - new_p2, target - new_p2);
    let new_p3 = new_p2 + q2 * (rotated_p3 - new_p2);

    Some(ThreePointPose {
        rotations: [
            (q1 * r1).normalize(),
            (q2 * q1 * r2).normalize(),
            target_rotation,
        ],
        positions: [p1, new_p2, new_p3],
    })
}

// ============================================================================
// 骨骼上的求解器
// ============================================================================

/// 三点 IK 求解器
#[derive(Clone, Debug)]
pub struct TrigonometricSolver {
    pub bone1: usize,
    pub bone2: usize,
    pub bone3: usize,
    /// 目标位置
    pub target_position: Vec3,
    /// 目标旋转（bone3）
    pub target_rotation: Quat,
    /// 位置权重 [0, 1]
    pub position_weight: f32,
    /// 旋转权重 [0, 1]
    pub rotation_weight: f32,
    /// 弯曲平面法线（世界空间）
    pub bend_normal: Vec3,
    /// 冻结的骨骼长度
    lengths: (f32, f32),
    initiated: bool,
}

impl TrigonometricSolver {
    pub fn new(bone1: usize, bone2: usize, bone3: usize) -> Self {
        Self {
            bone1,
            bone2,
            bone3,
            target_position: Vec3::ZERO,
            target_rotation: Quat::IDENTITY,
            position_weight: 1.0,
            rotation_weight: 1.0,
            bend_normal: Vec3::X,
            lengths: (0.0, 0.0),
            initiated: false,
        }
    }

    #[inline]
    pub fn bones(&self) -> [usize; 3] {
        [self.bone1, self.bone2, self.bone3]
    }

    #[inline]
    pub fn lengths(&self) -> (f32, f32) {
        self.lengths
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.initiated
    }

    /// 检查骨骼链并冻结长度
    pub fn initiate(&mut self, skeleton: &mut Skeleton, diag: &mut dyn DiagnosticSink) -> Result<()> {
        self.initiated = false;
        for b in self.bones() {
            skeleton.check(b)?;
        }
        let [b1, b2, b3] = self.bones();
        if b1 == b2 || b2 == b3 || b1 == b3 {
            return Err(IkError::InvalidChain(format!("duplicate bones {:?}", self.bones())));
        }
        if !skeleton.is_ancestor(b1, b2) || !skeleton.is_ancestor(b2, b3) {
            return Err(IkError::InvalidChain(format!("bones {:?} are not an ancestor chain", self.bones())));
        }

        let chain = ThreePointChain::from_skeleton(skeleton, self.bones());
        let lengths = chain.lengths();
        let epsilon = get_config().epsilon;
        if lengths.0 <= epsilon || lengths.1 <= epsilon {
            return Err(IkError::InvalidChain(format!("zero length bone in {:?}", self.bones())));
        }
        self.lengths = lengths;

        if !self.set_bend_plane_to_current(skeleton) {
            diag.warning(
                DiagnosticCode::StretchedLimb,
                format!(
                    "chain {:?} is completely stretched; keeping bend normal {:?}",
                    self.bones(),
                    self.bend_normal
                ),
            );
        }

        self.target_position = chain.positions[2];
        self.target_rotation = chain.rotations[2];
        for b in [b1, b2, b3] {
            skeleton.set_flag(b, JointFlags::IK_DRIVEN, true);
        }
        self.initiated = true;
        Ok(())
    }

    /// 以当前姿态的弯曲平面作为 bend normal，伸直时返回 false
    pub fn set_bend_plane_to_current(&mut self, skeleton: &Skeleton) -> bool {
        let p1 = skeleton.position(self.bone1);
        let p2 = skeleton.position(self.bone2);
        let p3 = skeleton.position(self.bone3);
        let normal = (p2 - p1).cross(p3 - p2);
        if normal.length_squared() <= get_config().epsilon {
            return false;
        }
        self.bend_normal = normal.normalize();
        true
    }

    /// 让肢体朝 goal 弯曲
    pub fn set_bend_goal_position(&mut self, skeleton: &Skeleton, goal: Vec3, weight: f32) {
        if weight <= 0.0 {
            return;
        }
        let p1 = skeleton.position(self.bone1);
        let normal = (goal - p1).cross(self.target_position - p1);
        if normal.length_squared() <= get_config().epsilon {
            return;
        }
        self.bend_normal = if weight >= 1.0 {
            normal
        } else {
            self.bend_normal.lerp(normal, weight)
        };
    }

    /// 当前 bend normal 下的求解（不处理 bend 修饰器）
    pub fn solve(&mut self, skeleton: &mut Skeleton) {
        if !self.initiated {
            return;
        }
        let position_weight = self.position_weight.clamp(0.0, 1.0);
        let rotation_weight = self.rotation_weight.clamp(0.0, 1.0);

        if position_weight > 0.0 {
            let chain = ThreePointChain::from_skeleton(skeleton, self.bones());
            let target = chain.positions[2].lerp(self.target_position, position_weight);
            if let Some(pose) =
                solve_three_point_chain(&chain, self.lengths, target, self.target_rotation, self.bend_normal)
            {
                skeleton.set_rotation(self.bone1, pose.rotations[0]);
                skeleton.set_rotation(self.bone2, pose.rotations[1]);
            }
        }

        if rotation_weight > 0.0 {
            let current = skeleton.rotation(self.bone3);
            skeleton.set_rotation(self.bone3, current.slerp(self.target_rotation, rotation_weight));
        }
    }
}
