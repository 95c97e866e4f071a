//! 球面多边形限制
//!
//! swing 方向必须落在单位球面上由限制点围成的多边形内。
//! 每对相邻限制点与主轴构成一个 reach cone（四面体），
//! 先按侧面法线的符号变化找到方向所在的 cone，再用边界法线判断是否越界。
//!
//! 限制点按绕主轴逆时针排列（从主轴尖端看），此时所有 cone 体积为正。
//! 体积为负说明多边形非凸或顺序反了，属于配置错误。

use glam::{Quat, Vec3};

use crate::config::get_config;
use crate::diagnostics::{DiagnosticCode, DiagnosticSink};
use crate::error::{IkError, Result};
use crate::math::{from_to_rotation, is_identity, secondary_axis};
use super::limit_twist;

/// 边界判定容差（点积），需大于平滑后限制点的浮点误差
const BOUNDARY_TOLERANCE: f32 = 1.0e-4;

// ============================================================================
// Reach cone
// ============================================================================

/// 四面体 {原点, 主轴, 限制点 i, 限制点 i+1}
#[derive(Clone, Debug, PartialEq)]
pub struct ReachCone {
    pub tetrahedron: [Vec3; 4],
    /// 有向体积
    pub volume: f32,
    /// 侧面法线（主轴 × 限制点 i）
    pub side_normal: Vec3,
    /// 边界法线（限制点 i × 限制点 i+1）
    pub bound_normal: Vec3,
}

impl ReachCone {
    pub fn new(o: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Self {
        let mut cone = Self {
            tetrahedron: [o, a, b, c],
            volume: 0.0,
            side_normal: Vec3::ZERO,
            bound_normal: Vec3::ZERO,
        };
        cone.calculate();
        cone
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.volume > 0.0
    }

    fn calculate(&mut self) {
        let [_, a, b, c] = self.tetrahedron;
        let cross_ab = a.cross(b);
        self.volume = cross_ab.dot(c) / 6.0;
        self.side_normal = cross_ab.normalize_or_zero();
        self.bound_normal = b.cross(c).normalize_or_zero();
    }
}

// ============================================================================
// 多边形限制
// ============================================================================

/// 多边形限制参数
#[derive(Clone, Debug)]
pub struct PolygonalLimit {
    /// 原始限制点
    points: Vec<Vec3>,
    /// 平滑迭代次数 [0, 3]
    smooth_iterations: u32,
    /// twist 上限（度）
    pub twist_limit: f32,
    /// 平滑后的单位限制点
    smoothed: Vec<Vec3>,
    reach_cones: Vec<ReachCone>,
}

impl PolygonalLimit {
    pub fn new(axis: Vec3, points: Vec<Vec3>, smooth_iterations: u32, twist_limit: f32) -> Result<Self> {
        let mut limit = Self {
            points: Vec::new(),
            smooth_iterations: smooth_iterations.min(get_config().max_smooth_iterations),
            twist_limit: twist_limit.clamp(0.0, 180.0),
            smoothed: Vec::new(),
            reach_cones: Vec::new(),
        };
        limit.set_limit_points(axis, points)?;
        Ok(limit)
    }

    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// 平滑后的限制点
    #[inline]
    pub fn smoothed_points(&self) -> &[Vec3] {
        &self.smoothed
    }

    #[inline]
    pub fn reach_cones(&self) -> &[ReachCone] {
        &self.reach_cones
    }

    #[inline]
    pub fn smooth_iterations(&self) -> u32 {
        self.smooth_iterations
    }

    /// 无效（负体积）cone 的索引
    pub fn invalid_cones(&self) -> impl Iterator<Item = usize> + '_ {
        self.reach_cones
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_valid())
            .map(|(i, _)| i)
    }

    pub(crate) fn set_limit_points(&mut self, axis: Vec3, points: Vec<Vec3>) -> Result<()> {
        if points.len() < 3 {
            return Err(IkError::TooFewLimitPoints(points.len()));
        }
        self.points = points;
        self.build_reach_cones(axis);
        Ok(())
    }

    pub fn set_smooth_iterations(&mut self, axis: Vec3, iterations: u32) {
        self.smooth_iterations = iterations.min(get_config().max_smooth_iterations);
        self.build_reach_cones(axis);
    }

    pub(crate) fn report_invalid_cones(&self, diag: &mut dyn DiagnosticSink) {
        for i in self.invalid_cones() {
            diag.warning(
                DiagnosticCode::InvalidReachCone,
                format!(
                    "reach cone {} has non-positive volume {:.6}; limit points must be convex and wound counter-clockwise around the axis",
                    i, self.reach_cones[i].volume
                ),
            );
        }
    }

    /// 重建 reach cone（限制点或平滑参数变化后调用）
    pub fn build_reach_cones(&mut self, axis: Vec3) {
        let axis = axis.normalize_or_zero();
        self.smoothed = self.points.iter().map(|p| p.normalize_or_zero()).collect();
        for _ in 0..self.smooth_iterations {
            self.smoothed = Self::smooth_points(axis, &self.smoothed);
        }

        let n = self.smoothed.len();
        self.reach_cones = (0..n)
            .map(|i| ReachCone::new(Vec3::ZERO, axis, self.smoothed[i], self.smoothed[(i + 1) % n]))
            .collect();
    }

    /// 找到包含方向 l 的 cone
    pub fn reach_cone_for(&self, l: Vec3) -> Option<usize> {
        let n = self.reach_cones.len();
        if n == 0 {
            return None;
        }
        let mut p1 = self.reach_cones[0].side_normal.dot(l);
        for i in 0..n {
            let p = p1;
            p1 = self.reach_cones[(i + 1) % n].side_normal.dot(l);
            if p >= 0.0 && p1 < 0.0 {
                return Some(i);
            }
        }
        None
    }

    /// 方向 l 是否在多边形内（边界算在内）
    pub fn contains(&self, axis: Vec3, l: Vec3) -> bool {
        let Some(l) = l.try_normalize() else {
            return false;
        };
        if l.dot(axis.normalize_or_zero()) > 1.0 - get_config().epsilon {
            return true;
        }
        match self.reach_cone_for(l) {
            Some(i) => self.reach_cones[i].bound_normal.dot(l) >= -BOUNDARY_TOLERANCE,
            None => false,
        }
    }

    pub(crate) fn limit_rotation(&self, axis: Vec3, rotation: Quat) -> Quat {
        let swing = self.limit_swing(axis, rotation);
        limit_twist(swing, axis, secondary_axis(axis), self.twist_limit)
    }

    fn limit_swing(&self, axis: Vec3, rotation: Quat) -> Quat {
        if is_identity(rotation) {
            return rotation;
        }

        let l = rotation * axis;
        // 找不到 cone 时 cone 配置无效，原样返回
        let Some(r) = self.reach_cone_for(l) else {
            return rotation;
        };

        let cone = &self.reach_cones[r];
        if cone.bound_normal.dot(l) >= -BOUNDARY_TOLERANCE {
            return rotation;
        }

        // 两个平面的交线：边界平面 与 {主轴, l} 平面
        let rotation_normal = axis.cross(l);
        let limited = (-cone.bound_normal).cross(rotation_normal);
        let to_limits = from_to_rotation(l, limited);
        to_limits * rotation
    }

    // ========================================
    // 平滑
    // ========================================

    /// 四点细分：点数翻倍，在切平面上插值后投影回球面
    fn smooth_points(axis: Vec3, p: &[Vec3]) -> Vec<Vec3> {
        let n = p.len() * 2;
        let scalar = Self::scalar(p.len());
        let mut q = vec![Vec3::ZERO; n];

        for i in (0..n).step_by(2) {
            q[i] = Self::point_to_tangent_plane(axis, p[i / 2]);
        }
        for i in (1..n).step_by(2) {
            let prev = q[i - 1];
            let minus2 = q[(i + n - 3) % n];
            let plus1 = q[(i + 1) % n];
            let plus2 = q[(i + 3) % n];
            q[i] = 0.5 * (prev + plus1) + scalar * (prev - minus2) + scalar * (plus1 - plus2);
        }

        q.into_iter()
            .map(|v| Self::tangent_point_to_sphere(axis, v))
            .collect()
    }

    /// 细分权重（经验值，按多边形点数查表）
    fn scalar(k: usize) -> f32 {
        match k {
            0..=3 => 0.1667,
            4 => 0.1036,
            5 => 0.0850,
            6 => 0.0773,
            7 => 0.0700,
            _ => 0.0625,
        }
    }

    /// 从 -axis 极点做球极投影到 axis 处的切平面
    fn point_to_tangent_plane(axis: Vec3, p: Vec3) -> Vec3 {
        let d = axis.dot(p);
        let u = 2.0 / (1.0 + d).max(get_config().epsilon);
        u * p + (u - 1.0) * axis
    }

    /// point_to_tangent_plane 的逆变换
    fn tangent_point_to_sphere(axis: Vec3, q: Vec3) -> Vec3 {
        let d = (q - axis).length_squared();
        let u = 4.0 / (4.0 + d);
        u * q + (u - 1.0) * axis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::limits::swing_angle;
    use crate::math::vector_angle_degrees;

    /// 绕 Z 轴的正方形，四个角偏离主轴 45°
    fn square() -> Vec<Vec3> {
        vec![
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(0.0, -1.0, 1.0),
        ]
    }

    #[test]
    fn test_counter_clockwise_cones_valid() {
        let limit = PolygonalLimit::new(Vec3::Z, square(), 0, 180.0).unwrap();
        assert_eq!(limit.reach_cones().len(), 4);
        assert!(limit.reach_cones().iter().all(ReachCone::is_valid));
    }

    #[test]
    fn test_reversed_order_negative_volume() {
        let mut points = square();
        points.reverse();
        let limit = PolygonalLimit::new(Vec3::Z, points, 0, 180.0).unwrap();
        assert!(limit.reach_cones().iter().all(|c| c.volume < 0.0));
        assert_eq!(limit.invalid_cones().count(), 4);

        let mut diag = Diagnostics::with_policy(true);
        limit.report_invalid_cones(&mut diag);
        assert!(diag.contains(DiagnosticCode::InvalidReachCone));
        assert!(!diag.has_errors());
        // 每个 cone 都有记录，但只浮出第一条
        assert_eq!(diag.entries().len(), 4);
        assert_eq!(diag.surfaced().len(), 1);
    }

    #[test]
    fn test_too_few_points() {
        let err = PolygonalLimit::new(Vec3::Z, vec![Vec3::X, Vec3::Y], 0, 180.0).unwrap_err();
        assert!(matches!(err, IkError::TooFewLimitPoints(2)));
    }

    #[test]
    fn test_limit_point_is_inside() {
        let limit = PolygonalLimit::new(Vec3::Z, square(), 0, 180.0).unwrap();
        for p in square() {
            assert!(limit.contains(Vec3::Z, p), "{:?}", p);
        }
        assert!(limit.contains(Vec3::Z, Vec3::Z));
        assert!(!limit.contains(Vec3::Z, Vec3::new(1.0, 1.0, 0.2)));
    }

    #[test]
    fn test_outside_swing_projected_to_boundary() {
        let limit = PolygonalLimit::new(Vec3::Z, square(), 0, 180.0).unwrap();
        // 朝 +X 方向摆 80°，超出 45° 的角点
        let q = Quat::from_axis_angle(Vec3::Y, 80f32.to_radians());
        let r = limit.limit_rotation(Vec3::Z, q);
        let dir = r * Vec3::Z;
        assert!(limit.contains(Vec3::Z, dir));
        assert!((swing_angle(r, Vec3::Z) - 45.0).abs() < 0.1);

        // 内部方向不变
        let q = Quat::from_axis_angle(Vec3::Y, 20f32.to_radians());
        let r = limit.limit_rotation(Vec3::Z, q);
        assert!(r.dot(q).abs() > 0.99999);
    }

    #[test]
    fn test_smoothing_doubles_points() {
        let limit = PolygonalLimit::new(Vec3::Z, square(), 2, 180.0).unwrap();
        assert_eq!(limit.smoothed_points().len(), 16);
        for p in limit.smoothed_points() {
            assert!((p.length() - 1.0).abs() < 1e-4);
        }
        // 原始角点被保留
        let corner = Vec3::new(1.0, 0.0, 1.0).normalize();
        assert!(limit
            .smoothed_points()
            .iter()
            .any(|p| vector_angle_degrees(*p, corner) < 0.1));
        assert!(limit.reach_cones().iter().all(ReachCone::is_valid));
    }

    #[test]
    fn test_smoothed_limit_result_is_contained() {
        let limit = PolygonalLimit::new(Vec3::Z, square(), 2, 180.0).unwrap();
        for i in 0..36 {
            let azimuth = (i as f32 * 10.0 + 3.0).to_radians();
            let swing_axis = Vec3::new(-azimuth.sin(), azimuth.cos(), 0.0);
            let q = Quat::from_axis_angle(swing_axis, 75f32.to_radians());
            let r = limit.limit_rotation(Vec3::Z, q);
            assert!(limit.contains(Vec3::Z, r * Vec3::Z), "azimuth {}", i * 10 + 3);
        }
    }

    #[test]
    fn test_set_smooth_iterations_rebuilds_and_clamps() {
        let mut limit = PolygonalLimit::new(Vec3::Z, square(), 0, 180.0).unwrap();
        limit.set_smooth_iterations(Vec3::Z, 1);
        assert_eq!(limit.smooth_iterations(), 1);
        assert_eq!(limit.smoothed_points().len(), 8);
        assert_eq!(limit.reach_cones().len(), 8);

        limit.set_smooth_iterations(Vec3::Z, 10);
        assert_eq!(limit.smooth_iterations(), get_config().max_smooth_iterations);
        assert_eq!(limit.reach_cones().len(), 4 << get_config().max_smooth_iterations);
    }

    #[test]
    fn test_tangent_projection_round_trip() {
        let p = Vec3::new(0.3, -0.5, 0.8).normalize();
        let q = PolygonalLimit::point_to_tangent_plane(Vec3::Z, p);
        assert!((q.z - 1.0).abs() < 1e-5);
        let back = PolygonalLimit::tangent_point_to_sphere(Vec3::Z, q);
        assert!((back - p).length() < 1e-5);
    }
}
