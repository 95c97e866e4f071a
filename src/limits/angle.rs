//! 锥形限制
//!
//! swing 限制在以主轴为中心、半角 `limit` 的圆锥内，twist 独立限制。

use glam::{Quat, Vec3};

use crate::math::{from_to_rotation, is_identity, rotate_towards, secondary_axis};
use super::limit_twist;

/// 锥形限制参数（度）
#[derive(Clone, Debug, PartialEq)]
pub struct AngleLimit {
    /// swing 半角 [0, 180]
    pub limit: f32,
    /// twist 上限 [0, 180]
    pub twist_limit: f32,
}

impl AngleLimit {
    pub fn new(limit: f32, twist_limit: f32) -> Self {
        Self {
            limit: limit.clamp(0.0, 180.0),
            twist_limit: twist_limit.clamp(0.0, 180.0),
        }
    }

    pub(crate) fn limit_rotation(&self, axis: Vec3, rotation: Quat) -> Quat {
        let swing = self.limit_swing(axis, rotation);
        limit_twist(swing, axis, secondary_axis(axis), self.twist_limit)
    }

    fn limit_swing(&self, axis: Vec3, rotation: Quat) -> Quat {
        // 初始姿态总是合法的
        if is_identity(rotation) || self.limit >= 180.0 {
            return rotation;
        }

        let swing_axis = rotation * axis;
        let swing_rotation = from_to_rotation(axis, swing_axis);
        let limited_swing = rotate_towards(Quat::IDENTITY, swing_rotation, self.limit);
        let to_limits = from_to_rotation(swing_axis, limited_swing * axis);
        to_limits * rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::{swing_angle, twist_angle};

    #[test]
    fn test_identity_passes() {
        let limit = AngleLimit::new(10.0, 5.0);
        assert_eq!(limit.limit_rotation(Vec3::Z, Quat::IDENTITY), Quat::IDENTITY);
    }

    #[test]
    fn test_inside_cone_unchanged() {
        let limit = AngleLimit::new(45.0, 180.0);
        let q = Quat::from_axis_angle(Vec3::X, 20f32.to_radians());
        let r = limit.limit_rotation(Vec3::Z, q);
        assert!(r.dot(q).abs() > 0.99999);
    }

    #[test]
    fn test_swing_and_twist_bounded() {
        let limit = AngleLimit::new(35.0, 15.0);
        let axis = Vec3::Z;
        let ortho = secondary_axis(axis);
        for i in 0..12 {
            for j in 0..8 {
                for k in 0..6 {
                    let q = Quat::from_euler(
                        glam::EulerRot::XYZ,
                        i as f32 * 0.5 - 3.0,
                        j as f32 * 0.4 - 1.5,
                        k as f32 * 1.1 - 3.0,
                    );
                    let r = limit.limit_rotation(axis, q);
                    assert!(swing_angle(r, axis) <= 35.0 + 1e-2, "swing {}", swing_angle(r, axis));
                    assert!(twist_angle(r, axis, ortho) <= 15.0 + 0.1, "twist {}", twist_angle(r, axis, ortho));
                }
            }
        }
    }
}
