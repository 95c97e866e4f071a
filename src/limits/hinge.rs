//! 铰链限制
//!
//! 单自由度，角度累加而不是取模，因此上下限可以超过一圈
//! （例如 -350° ~ 350° 的门轴）。累加器依赖历史，不是当前输入的纯函数。

use glam::{Quat, Vec3};

use crate::math::{angle_degrees, secondary_axis};
use super::limit_1dof;

/// 铰链限制参数（度）
#[derive(Clone, Debug)]
pub struct HingeLimit {
    /// 下限
    pub min: f32,
    /// 上限
    pub max: f32,
    /// 关闭时只投影到单自由度，不限制角度
    pub use_limits: bool,
    /// 累加角度
    last_angle: f32,
    /// 上一次的限制结果
    last_rotation: Quat,
}

impl HingeLimit {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
            use_limits: true,
            last_angle: 0.0,
            last_rotation: Quat::IDENTITY,
        }
    }

    /// 当前累加角度
    #[inline]
    pub fn last_angle(&self) -> f32 {
        self.last_angle
    }

    /// 清空累加器
    pub fn reset(&mut self) {
        self.last_angle = 0.0;
        self.last_rotation = Quat::IDENTITY;
    }

    pub(crate) fn limit_rotation(&mut self, axis: Vec3, rotation: Quat) -> Quat {
        self.last_rotation = self.limit_hinge(axis, rotation);
        self.last_rotation
    }

    fn limit_hinge(&mut self, axis: Vec3, rotation: Quat) -> Quat {
        // 上下限都为 0：锁死
        if self.use_limits && self.min == 0.0 && self.max == 0.0 {
            return Quat::IDENTITY;
        }

        let free_1dof = limit_1dof(rotation, axis);
        if !self.use_limits {
            return free_1dof;
        }

        // 与上一次结果的增量，方向由叉积符号决定
        let delta = free_1dof * self.last_rotation.inverse();
        let mut delta_angle = angle_degrees(Quat::IDENTITY, delta);

        let secondary = secondary_axis(axis);
        let cross = secondary.cross(axis);
        if (delta * secondary).dot(cross) > 0.0 {
            delta_angle = -delta_angle;
        }

        self.last_angle = (self.last_angle + delta_angle).clamp(self.min, self.max);
        Quat::from_axis_angle(axis, self.last_angle.to_radians())
    }
}
