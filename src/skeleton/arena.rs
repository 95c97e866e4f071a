//! 骨骼 arena
//!
//! 关节按索引存放，父关节索引必须小于子关节索引，
//! 因此顺序遍历即可完成整棵树的正向运动学。

use glam::{Quat, Vec3};

use crate::error::{IkError, Result};
use super::joint::{Joint, JointFlags};

/// 骨骼
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
    /// 子关节缓存
    children: Vec<Vec<usize>>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加关节，返回索引
    ///
    /// 父关节必须已存在。
    pub fn add_joint(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        local_translation: Vec3,
        local_rotation: Quat,
    ) -> Result<usize> {
        if let Some(p) = parent {
            if p >= self.joints.len() {
                return Err(IkError::JointIndex(p));
            }
        }
        let idx = self.joints.len();
        let mut joint = Joint::new(name, parent, local_translation, local_rotation.normalize());
        match parent {
            Some(p) => {
                let parent_joint = &self.joints[p];
                joint.compute_world(parent_joint.world_position, parent_joint.world_rotation);
                self.children[p].push(idx);
            }
            None => joint.compute_world(Vec3::ZERO, Quat::IDENTITY),
        }
        self.joints.push(joint);
        self.children.push(Vec::new());
        Ok(idx)
    }

    // ========================================
    // 访问器
    // ========================================

    #[inline]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    #[inline]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    pub fn joint(&self, idx: usize) -> Option<&Joint> {
        self.joints.get(idx)
    }

    #[inline]
    pub fn joint_mut(&mut self, idx: usize) -> Option<&mut Joint> {
        self.joints.get_mut(idx)
    }

    /// 检查索引有效
    pub fn check(&self, idx: usize) -> Result<()> {
        if idx < self.joints.len() {
            Ok(())
        } else {
            Err(IkError::JointIndex(idx))
        }
    }

    /// 按名称查找
    pub fn find(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    #[inline]
    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.joints.get(idx).and_then(|j| j.parent)
    }

    #[inline]
    pub fn children(&self, idx: usize) -> &[usize] {
        self.children.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 世界位置
    #[inline]
    pub fn position(&self, idx: usize) -> Vec3 {
        self.joints[idx].world_position
    }

    /// 世界旋转
    #[inline]
    pub fn rotation(&self, idx: usize) -> Quat {
        self.joints[idx].world_rotation
    }

    /// 父关节世界旋转（根返回单位四元数）
    #[inline]
    pub fn parent_rotation(&self, idx: usize) -> Quat {
        self.parent(idx)
            .map(|p| self.joints[p].world_rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    /// `ancestor` 是否是 `idx` 的（严格）祖先
    pub fn is_ancestor(&self, ancestor: usize, idx: usize) -> bool {
        let mut current = self.parent(idx);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// 先序遍历 `root` 及其所有后代
    pub fn descendants(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::new();
        if root >= self.joints.len() {
            return out;
        }
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            out.push(idx);
            for &child in self.children[idx].iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    // ========================================
    // 变换
    // ========================================

    /// 设置局部旋转并更新子树
    pub fn set_local_rotation(&mut self, idx: usize, rotation: Quat) {
        if idx >= self.joints.len() {
            return;
        }
        self.joints[idx].local_rotation = rotation.normalize();
        self.update_from(idx);
    }

    /// 设置世界旋转并更新子树
    pub fn set_rotation(&mut self, idx: usize, rotation: Quat) {
        if idx >= self.joints.len() {
            return;
        }
        let local = self.parent_rotation(idx).inverse() * rotation;
        self.set_local_rotation(idx, local);
    }

    /// 在世界空间中叠加旋转
    #[inline]
    pub fn rotate(&mut self, idx: usize, delta: Quat) {
        let current = self.rotation(idx);
        self.set_rotation(idx, delta * current);
    }

    /// 更新全部世界变换
    pub fn update_world_transforms(&mut self) {
        for idx in 0..self.joints.len() {
            let (pos, rot) = match self.joints[idx].parent {
                Some(p) => (self.joints[p].world_position, self.joints[p].world_rotation),
                None => (Vec3::ZERO, Quat::IDENTITY),
            };
            self.joints[idx].compute_world(pos, rot);
        }
    }

    /// 递归更新 idx 及其子树的世界变换
    pub fn update_from(&mut self, idx: usize) {
        if idx >= self.joints.len() {
            return;
        }
        let (pos, rot) = match self.joints[idx].parent {
            Some(p) => (self.joints[p].world_position, self.joints[p].world_rotation),
            None => (Vec3::ZERO, Quat::IDENTITY),
        };
        self.joints[idx].compute_world(pos, rot);

        // 子关节索引总是更大，借用缓存副本避免与 joints 冲突
        let children = std::mem::take(&mut self.children[idx]);
        for &child in &children {
            self.update_from(child);
        }
        self.children[idx] = children;
    }

    // ========================================
    // 默认姿态
    // ========================================

    /// 记录默认姿态（每个关节只记录一次）
    pub fn capture_default_pose(&mut self) {
        for joint in &mut self.joints {
            joint.capture_default();
        }
    }

    /// 恢复默认姿态
    pub fn restore_default_pose(&mut self) {
        for joint in &mut self.joints {
            joint.reset_rotation();
        }
        self.update_world_transforms();
    }

    /// 设置 / 清除标志
    pub(crate) fn set_flag(&mut self, idx: usize, flag: JointFlags, enabled: bool) {
        if let Some(joint) = self.joints.get_mut(idx) {
            joint.flags.set(flag, enabled);
        }
    }
}
