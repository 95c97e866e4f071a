//! 肢体 IK
//!
//! 在三点求解器外面加一层弯曲平面修饰：每帧先决定 bend normal，
//! 再交给三点求解。手臂一般跟随父骨骼（锁骨），腿跟随目标朝向（脚）。

use glam::{Quat, Vec3};

use crate::config::get_config;
use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::skeleton::Skeleton;
use super::trigonometric::TrigonometricSolver;

/// 弯曲平面来源
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BendModifier {
    /// 当前动画姿态的弯曲平面
    Animation,
    /// 跟随目标旋转
    Target,
    /// 跟随 bone1 的父骨骼
    Parent,
    /// 固定世界轴
    Fixed(Vec3),
    /// 朝向某个世界位置弯曲
    Goal(Vec3),
}

impl Default for BendModifier {
    fn default() -> Self {
        Self::Animation
    }
}

/// 肢体求解器
#[derive(Clone, Debug)]
pub struct LimbSolver {
    pub chain: TrigonometricSolver,
    pub bend_modifier: BendModifier,
    /// 修饰器权重，0 时使用当前姿态的弯曲平面
    pub bend_modifier_weight: f32,
    /// 保持 bone3 求解前的世界旋转，0 时完全取目标旋转
    pub maintain_rotation_weight: f32,

    // 初始化时记录的相对法线
    normal_in_bone1: Vec3,
    normal_relative_to_target: Vec3,
    normal_relative_to_parent: Vec3,
}

impl LimbSolver {
    pub fn new(bone1: usize, bone2: usize, bone3: usize) -> Self {
        Self {
            chain: TrigonometricSolver::new(bone1, bone2, bone3),
            bend_modifier: BendModifier::Animation,
            bend_modifier_weight: 1.0,
            maintain_rotation_weight: 0.0,
            normal_in_bone1: Vec3::X,
            normal_relative_to_target: Vec3::X,
            normal_relative_to_parent: Vec3::X,
        }
    }

    pub fn with_bend_modifier(mut self, modifier: BendModifier) -> Self {
        self.bend_modifier = modifier;
        self
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.chain.is_initiated()
    }

    pub fn initiate(&mut self, skeleton: &mut Skeleton, diag: &mut dyn DiagnosticSink) -> Result<()> {
        self.chain.initiate(skeleton, diag)?;
        self.store_relative_normals(skeleton);
        Ok(())
    }

    fn store_relative_normals(&mut self, skeleton: &Skeleton) {
        let normal = self.chain.bend_normal;
        self.normal_in_bone1 = skeleton.rotation(self.chain.bone1).inverse() * normal;
        self.normal_relative_to_target = self.chain.target_rotation.inverse() * normal;
        self.normal_relative_to_parent = skeleton.parent_rotation(self.chain.bone1).inverse() * normal;
    }

    /// 当前姿态的弯曲法线，伸直时退回 bone1 空间里记录的法线
    fn animated_normal(&self, skeleton: &Skeleton) -> Vec3 {
        let p1 = skeleton.position(self.chain.bone1);
        let p2 = skeleton.position(self.chain.bone2);
        let p3 = skeleton.position(self.chain.bone3);
        let normal = (p2 - p1).cross(p3 - p2);
        normal
            .try_normalize()
            .unwrap_or_else(|| skeleton.rotation(self.chain.bone1) * self.normal_in_bone1)
    }

    /// 修饰器给出的法线，None 表示保持动画法线
    fn modified_normal(&self, skeleton: &Skeleton) -> Option<Vec3> {
        match self.bend_modifier {
            BendModifier::Animation => None,
            BendModifier::Target => Some(self.chain.target_rotation * self.normal_relative_to_target),
            BendModifier::Parent => {
                Some(skeleton.parent_rotation(self.chain.bone1) * self.normal_relative_to_parent)
            }
            BendModifier::Fixed(axis) => axis.try_normalize(),
            BendModifier::Goal(goal) => {
                let p1 = skeleton.position(self.chain.bone1);
                (goal - p1).cross(self.chain.target_position - p1).try_normalize()
            }
        }
    }

    /// 求解前决定 bend normal
    pub fn update_bend_normal(&mut self, skeleton: &Skeleton) {
        let animated = self.animated_normal(skeleton);
        let weight = self.bend_modifier_weight.clamp(0.0, 1.0);
        let normal = match self.modified_normal(skeleton) {
            Some(modified) if weight > 0.0 => animated.lerp(modified, weight),
            _ => animated,
        };
        if normal.length_squared() > get_config().epsilon {
            self.chain.bend_normal = normal;
        }
    }

    pub fn solve(&mut self, skeleton: &mut Skeleton) {
        if !self.chain.is_initiated() {
            return;
        }
        let maintain = skeleton.rotation(self.chain.bone3);

        self.update_bend_normal(skeleton);
        self.chain.solve(skeleton);

        let weight = self.maintain_rotation_weight.clamp(0.0, 1.0);
        if weight > 0.0 {
            let current = skeleton.rotation(self.chain.bone3);
            skeleton.set_rotation(self.chain.bone3, current.slerp(maintain, weight));
        }
    }

    /// 目标位置 + 旋转
    #[inline]
    pub fn set_target(&mut self, position: Vec3, rotation: Quat) {
        self.chain.target_position = position;
        self.chain.target_rotation = rotation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;

    /// 肩 - 肘 - 腕，肘部略向 -Z 弯
    fn arm() -> (Skeleton, [usize; 3]) {
        let mut s = Skeleton::new();
        let root = s.add_joint("clavicle", None, Vec3::ZERO, Quat::IDENTITY).unwrap();
        let upper = s.add_joint("upper", Some(root), Vec3::new(0.2, 0.0, 0.0), Quat::IDENTITY).unwrap();
        let fore = s.add_joint("fore", Some(upper), Vec3::new(1.0, 0.0, -0.2), Quat::IDENTITY).unwrap();
        let hand = s.add_joint("hand", Some(fore), Vec3::new(1.0, 0.0, 0.2), Quat::IDENTITY).unwrap();
        (s, [upper, fore, hand])
    }

    #[test]
    fn test_parent_modifier_follows_parent() {
        let (mut s, [u, f, h]) = arm();
        let mut limb = LimbSolver::new(u, f, h).with_bend_modifier(BendModifier::Parent);
        let mut diag = Diagnostics::with_policy(false);
        limb.initiate(&mut s, &mut diag).unwrap();
        let initial = limb.chain.bend_normal;

        // 父骨骼绕 X 转 90°，法线随之转动
        let q = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
        s.set_local_rotation(0, q);
        limb.update_bend_normal(&s);
        assert!((limb.chain.bend_normal.normalize() - q * initial).length() < 1e-4);
    }

    #[test]
    fn test_fixed_modifier_and_reach() {
        let (mut s, [u, f, h]) = arm();
        let mut limb = LimbSolver::new(u, f, h).with_bend_modifier(BendModifier::Fixed(Vec3::Y));
        let mut diag = Diagnostics::with_policy(false);
        limb.initiate(&mut s, &mut diag).unwrap();

        let target = Vec3::new(1.2, 0.8, 0.3);
        limb.set_target(target, Quat::IDENTITY);
        limb.solve(&mut s);
        assert!((limb.chain.bend_normal - Vec3::Y).length() < 1e-5);
        assert!((s.position(h) - target).length() < 1e-3);
    }

    #[test]
    fn test_target_modifier_follows_target_rotation() {
        let (mut s, [u, f, h]) = arm();
        let mut limb = LimbSolver::new(u, f, h).with_bend_modifier(BendModifier::Target);
        let mut diag = Diagnostics::with_policy(false);
        limb.initiate(&mut s, &mut diag).unwrap();
        let initial = limb.chain.bend_normal;
        let initial_rotation = limb.chain.target_rotation;

        // 目标绕 X 转 90°，法线跟着目标转
        let q = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
        limb.set_target(Vec3::new(1.4, 0.0, 0.0), q * initial_rotation);
        limb.update_bend_normal(&s);
        assert!((limb.chain.bend_normal.normalize() - q * initial).length() < 1e-4);

        // 权重为 0 时保持动画法线
        limb.bend_modifier_weight = 0.0;
        limb.update_bend_normal(&s);
        assert!((limb.chain.bend_normal.normalize() - initial).length() < 1e-4);
    }

    #[test]
    fn test_goal_modifier_bends_towards_goal() {
        let (mut s, [u, f, h]) = arm();
        let goal = Vec3::new(1.0, 1.0, 0.0);
        let mut limb = LimbSolver::new(u, f, h).with_bend_modifier(BendModifier::Goal(goal));
        let mut diag = Diagnostics::with_policy(false);
        limb.initiate(&mut s, &mut diag).unwrap();

        let target = Vec3::new(1.4, 0.0, 0.0);
        limb.set_target(target, Quat::IDENTITY);
        limb.solve(&mut s);

        let p1 = s.position(u);
        let elbow = s.position(f) - p1;
        assert!((s.position(h) - target).length() < 1e-3);
        // 肘部落在 {bone1, 目标, goal} 平面内，偏向 goal 一侧
        let plane = (goal - p1).cross(target - p1).normalize();
        assert!(elbow.dot(plane).abs() < 1e-3);
        assert!(elbow.y > 0.1, "elbow {:?}", elbow);
    }

    #[test]
    fn test_maintain_rotation() {
        let (mut s, [u, f, h]) = arm();
        let mut limb = LimbSolver::new(u, f, h);
        let mut diag = Diagnostics::with_policy(false);
        limb.initiate(&mut s, &mut diag).unwrap();
        limb.maintain_rotation_weight = 1.0;

        let before = s.rotation(h);
        limb.set_target(Vec3::new(0.9, 0.9, 0.0), Quat::from_rotation_y(1.0));
        limb.solve(&mut s);
        assert!(s.rotation(h).dot(before).abs() > 0.9999);
    }
}
