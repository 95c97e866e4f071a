//! 样条限制
//!
//! swing 上限随方位角变化：方位角以次轴为 0°，绕主轴一圈 360°，
//! 由曲线给出每个方位角的最大 swing（度）。

use glam::{Quat, Vec3};

use crate::curve::{Curve, Keyframe, LimitCurve};
use crate::error::Result;
use crate::math::{
    cross_axis, from_to_rotation, is_identity, orthogonal_angle, rotate_towards, secondary_axis,
};
use super::limit_twist;

/// 样条限制参数
#[derive(Clone, Debug)]
pub struct SplineLimit {
    /// 方位角(度) -> swing 上限(度)
    curve: LimitCurve,
    /// twist 上限（度）
    pub twist_limit: f32,
}

impl SplineLimit {
    pub fn new(curve: LimitCurve, twist_limit: f32) -> Self {
        Self {
            curve,
            twist_limit: twist_limit.clamp(0.0, 180.0),
        }
    }

    #[inline]
    pub fn curve(&self) -> &LimitCurve {
        &self.curve
    }

    /// 替换曲线关键帧
    pub fn set_spline(&mut self, keys: Vec<Keyframe>) -> Result<()> {
        self.curve = LimitCurve::new(keys)?;
        Ok(())
    }

    /// swing 方向的方位角 [0, 360)
    pub fn azimuth(axis: Vec3, swing_axis: Vec3) -> f32 {
        let angle = orthogonal_angle(swing_axis, secondary_axis(axis), axis);
        // 在交叉轴反侧时折叠到 180°~360°
        if swing_axis.dot(cross_axis(axis)) < 0.0 {
            360.0 - angle
        } else {
            angle
        }
    }

    /// 指定方位角的 swing 上限
    #[inline]
    pub fn max_swing(&self, azimuth: f32) -> f32 {
        self.curve.value(azimuth).clamp(0.0, 180.0)
    }

    pub(crate) fn limit_rotation(&self, axis: Vec3, rotation: Quat) -> Quat {
        let swing = self.limit_swing(axis, rotation);
        limit_twist(swing, axis, secondary_axis(axis), self.twist_limit)
    }

    fn limit_swing(&self, axis: Vec3, rotation: Quat) -> Quat {
        if is_identity(rotation) {
            return rotation;
        }

        let swing_axis = rotation * axis;
        let max_angle = self.max_swing(Self::azimuth(axis, swing_axis));
        if max_angle >= 180.0 {
            return rotation;
        }

        let swing_rotation = from_to_rotation(axis, swing_axis);
        let limited_swing = rotate_towards(Quat::IDENTITY, swing_rotation, max_angle);
        let to_limits = from_to_rotation(swing_axis, limited_swing * axis);
        to_limits * rotation
    }
}
