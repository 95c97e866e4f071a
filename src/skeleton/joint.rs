//! 关节节点
//!
//! Joint 是骨骼 arena 中的单个节点，通过父索引组成层级。
//! 默认旋转在初始化时记录一次，之后所有限制都以它为参考系。

use glam::{Mat4, Quat, Vec3};
use bitflags::bitflags;

// ============================================================================
// 关节标志
// ============================================================================

bitflags! {
    /// 关节标志位
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct JointFlags: u32 {
        /// 默认旋转已记录
        const DEFAULT_CAPTURED = 1 << 0;
        /// 挂有旋转限制
        const LIMITED = 1 << 1;
        /// 由 IK 求解器驱动
        const IK_DRIVEN = 1 << 2;
        /// 本次 tick 的旋转限制已由求解器在迭代内应用（rig 跳过）
        const SOLVER_LIMITED = 1 << 3;
    }
}

// ============================================================================
// 关节节点
// ============================================================================

/// 关节节点
///
/// - 静态数据：名称、父索引、绑定姿态
/// - 动态数据：每帧更新的局部旋转与世界变换缓存
#[derive(Clone, Debug)]
pub struct Joint {
    // ========================================
    // 静态数据（初始化后不变）
    // ========================================

    /// 关节名称
    pub name: String,

    /// 父关节索引（None 表示根）
    pub parent: Option<usize>,

    /// 相对父关节的偏移（刚性，不随求解变化）
    pub local_translation: Vec3,

    /// 默认局部旋转（capture_default_pose 时记录）
    pub default_local_rotation: Quat,

    /// 关节标志
    pub flags: JointFlags,

    // ========================================
    // 动态数据（每帧更新）
    // ========================================

    /// 局部旋转
    pub local_rotation: Quat,

    /// 世界位置（缓存）
    pub(crate) world_position: Vec3,

    /// 世界旋转（缓存）
    pub(crate) world_rotation: Quat,
}

impl Joint {
    /// 创建新关节
    pub fn new(name: impl Into<String>, parent: Option<usize>, local_translation: Vec3, local_rotation: Quat) -> Self {
        Self {
            name: name.into(),
            parent,
            local_translation,
            default_local_rotation: local_rotation,
            flags: JointFlags::empty(),
            local_rotation,
            world_position: Vec3::ZERO,
            world_rotation: Quat::IDENTITY,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// 世界位置
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.world_position
    }

    /// 世界旋转
    #[inline]
    pub fn rotation(&self) -> Quat {
        self.world_rotation
    }

    /// 世界变换矩阵
    #[inline]
    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.world_rotation, self.world_position)
    }

    /// 记录默认旋转（只记录一次）
    pub fn capture_default(&mut self) {
        if self.flags.contains(JointFlags::DEFAULT_CAPTURED) {
            return;
        }
        self.default_local_rotation = self.local_rotation;
        self.flags.insert(JointFlags::DEFAULT_CAPTURED);
    }

    /// 回到默认旋转
    #[inline]
    pub fn reset_rotation(&mut self) {
        self.local_rotation = self.default_local_rotation;
    }

    /// 由父世界变换计算本关节世界变换
    #[inline]
    pub(crate) fn compute_world(&mut self, parent_position: Vec3, parent_rotation: Quat) {
        self.world_rotation = (parent_rotation * self.local_rotation).normalize();
        self.world_position = parent_position + parent_rotation * self.local_translation;
    }

    #[inline]
    pub fn is_limited(&self) -> bool {
        self.flags.contains(JointFlags::LIMITED)
    }

    #[inline]
    pub fn is_ik_driven(&self) -> bool {
        self.flags.contains(JointFlags::IK_DRIVEN)
    }
}
