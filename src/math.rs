//! 四元数 / 向量工具
//!
//! 所有角度参数以度为单位（与限制配置一致），内部换算成弧度。

use glam::{Mat3, Quat, Vec3};

use crate::config::get_config;

/// 四元数相等判定（点积阈值）
const DOT_EQUAL: f32 = 0.999_999;

/// 最短弧旋转，输入可以不是单位向量；任一为零返回单位四元数
pub fn from_to_rotation(from: Vec3, to: Vec3) -> Quat {
    match (from.try_normalize(), to.try_normalize()) {
        (Some(f), Some(t)) => Quat::from_rotation_arc(f, t),
        _ => Quat::IDENTITY,
    }
}

/// 两个旋转之间的夹角（度）
pub fn angle_degrees(a: Quat, b: Quat) -> f32 {
    let dot = a.dot(b).abs().min(1.0);
    (dot.acos() * 2.0).to_degrees()
}

/// 两个向量之间的夹角（度），零向量返回 0
pub fn vector_angle_degrees(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    let epsilon = get_config().epsilon;
    if denom < epsilon * epsilon {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// 是否近似单位旋转（含 -identity）
#[inline]
pub fn is_identity(q: Quat) -> bool {
    q.w.abs() > DOT_EQUAL
}

/// 两个旋转是否近似相等
#[inline]
pub fn rotations_equal(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > DOT_EQUAL
}

/// 从 `from` 向 `to` 旋转，最多 `max_degrees`
pub fn rotate_towards(from: Quat, to: Quat, max_degrees: f32) -> Quat {
    let angle = angle_degrees(from, to);
    if angle == 0.0 {
        return to;
    }
    let t = (max_degrees.max(0.0) / angle).min(1.0);
    from.slerp(to, t)
}

/// Gram-Schmidt 正交化
///
/// 返回 (单位 normal, 与 normal 正交的单位 tangent)。
/// tangent 与 normal 平行时任取一个垂直方向。
pub fn ortho_normalize(normal: Vec3, tangent: Vec3) -> (Vec3, Vec3) {
    let n = normal.try_normalize().unwrap_or(Vec3::X);
    let t = tangent - n * n.dot(tangent);
    let t = t.try_normalize().unwrap_or_else(|| n.any_orthonormal_vector());
    (n, t)
}

/// v1、v2 在 normal 垂直平面上投影之间的夹角（度）
pub fn orthogonal_angle(v1: Vec3, v2: Vec3, normal: Vec3) -> f32 {
    let (_, a) = ortho_normalize(normal, v1);
    let (_, b) = ortho_normalize(normal, v2);
    vector_angle_degrees(a, b)
}

/// 次轴：(y, z, x)，与主轴平行时退化为任意垂直方向
pub fn secondary_axis(axis: Vec3) -> Vec3 {
    let s = Vec3::new(axis.y, axis.z, axis.x);
    if s.cross(axis).length_squared() < get_config().epsilon {
        return axis.normalize_or_zero().any_orthonormal_vector();
    }
    s
}

/// 交叉轴：axis × secondary
#[inline]
pub fn cross_axis(axis: Vec3) -> Vec3 {
    axis.cross(secondary_axis(axis))
}

/// Swing/Twist 分解：rotation = swing * twist，twist 绕 axis
pub fn swing_twist(rotation: Quat, axis: Vec3) -> (Quat, Quat) {
    let axis = axis.normalize_or_zero();
    let v = Vec3::new(rotation.x, rotation.y, rotation.z);
    let p = axis * v.dot(axis);
    let twist = Quat::from_xyzw(p.x, p.y, p.z, rotation.w);
    let twist = if twist.length_squared() < get_config().epsilon {
        // 180° swing，twist 不确定
        Quat::IDENTITY
    } else {
        twist.normalize()
    };
    let swing = rotation * twist.inverse();
    (swing, twist)
}

/// 朝向旋转：局部 +Z 指向 forward，+Y 尽量贴近 up
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let Some(z) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let x = up.cross(z).try_normalize().unwrap_or_else(|| z.any_orthonormal_vector());
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_to_rotation_zero_input() {
        assert_eq!(from_to_rotation(Vec3::ZERO, Vec3::X), Quat::IDENTITY);
        let q = from_to_rotation(Vec3::X * 3.0, Vec3::Y * 0.5);
        assert!((q * Vec3::X - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_rotate_towards_limits_angle() {
        let to = Quat::from_axis_angle(Vec3::Z, 90f32.to_radians());
        let r = rotate_towards(Quat::IDENTITY, to, 30.0);
        assert!((angle_degrees(Quat::IDENTITY, r) - 30.0).abs() < 1e-3);

        let r = rotate_towards(Quat::IDENTITY, to, 120.0);
        assert!(rotations_equal(r, to));
    }

    #[test]
    fn test_ortho_normalize_degenerate() {
        let (n, t) = ortho_normalize(Vec3::Y * 2.0, Vec3::Y);
        assert!((n - Vec3::Y).length() < 1e-6);
        assert!(t.dot(n).abs() < 1e-6);
        assert!((t.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_secondary_axis_never_parallel() {
        let axis = Vec3::ONE.normalize();
        let s = secondary_axis(axis);
        assert!(s.cross(axis).length() > 0.5);
        assert_eq!(secondary_axis(Vec3::Z), Vec3::Y);
        assert_eq!(cross_axis(Vec3::Z), Vec3::NEG_X);
    }

    #[test]
    fn test_swing_twist_recomposes() {
        let q = Quat::from_euler(glam::EulerRot::XYZ, 0.3, -0.7, 1.1);
        let (swing, twist) = swing_twist(q, Vec3::Z);
        assert!(rotations_equal(swing * twist, q));
        // twist 只绕 Z
        let t_axis = Vec3::new(twist.x, twist.y, twist.z);
        assert!(t_axis.cross(Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_look_rotation_identity() {
        let q = look_rotation(Vec3::Z, Vec3::Y);
        assert!(rotations_equal(q, Quat::IDENTITY));
        let q = look_rotation(Vec3::X, Vec3::Y);
        assert!((q * Vec3::Z - Vec3::X).length() < 1e-5);
    }
}
