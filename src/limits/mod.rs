//! 旋转限制
//!
//! 四种限制共享同一个基础结构（主轴 + 默认局部旋转），
//! 通过 `LimitKind` 分派：
//! - Angle: 锥形 swing + twist
//! - Hinge: 单轴铰链，可累加超过 ±180°
//! - Polygonal: 球面多边形 reach cone
//! - Spline: 按方位角变化的 swing 上限
//!
//! 所有 `limit` 的输入都是相对默认旋转的旋转。

mod angle;
mod hinge;
mod polygonal;
mod spline;

pub use angle::AngleLimit;
pub use hinge::HingeLimit;
pub use polygonal::{PolygonalLimit, ReachCone};
pub use spline::SplineLimit;

use glam::{Quat, Vec3};

use crate::curve::LimitCurve;
use crate::diagnostics::{DiagnosticCode, DiagnosticSink};
use crate::error::{IkError, Result};
use crate::math::{self, from_to_rotation, ortho_normalize, rotate_towards, rotations_equal, swing_twist};
use crate::skeleton::Skeleton;

// ============================================================================
// 共享工具
// ============================================================================

/// 只保留绕 axis 的一个自由度（swing/twist 分解中的 twist）
pub fn limit_1dof(rotation: Quat, axis: Vec3) -> Quat {
    swing_twist(rotation, axis).1
}

/// 限制绕 axis 的扭转角度（度）
///
/// 扭转以 ortho_axis 在 swing 后法平面上的投影为参考。
pub fn limit_twist(rotation: Quat, axis: Vec3, ortho_axis: Vec3, twist_limit: f32) -> Quat {
    let twist_limit = twist_limit.clamp(0.0, 180.0);
    if twist_limit >= 180.0 {
        return rotation;
    }

    let (normal, ortho_tangent) = ortho_normalize(rotation * axis, ortho_axis);
    let (_, rotated_ortho_tangent) = ortho_normalize(normal, rotation * ortho_axis);

    let fixed = from_to_rotation(rotated_ortho_tangent, ortho_tangent) * rotation;
    if twist_limit <= 0.0 {
        return fixed;
    }
    rotate_towards(fixed, rotation, twist_limit)
}

/// swing 角：主轴被旋转后偏离的角度（度）
#[inline]
pub fn swing_angle(rotation: Quat, axis: Vec3) -> f32 {
    math::vector_angle_degrees(axis, rotation * axis)
}

/// twist 角：与 `limit_twist` 使用同一度量（度）
#[inline]
pub fn twist_angle(rotation: Quat, axis: Vec3, ortho_axis: Vec3) -> f32 {
    math::orthogonal_angle(rotation * ortho_axis, ortho_axis, rotation * axis)
}

// ============================================================================
// 基础结构
// ============================================================================

/// 所有限制共享的字段
#[derive(Clone, Debug)]
pub struct LimitBase {
    /// 主轴（单位向量，子骨骼延伸方向）
    axis: Vec3,
    /// 默认局部旋转
    default_local_rotation: Quat,
    /// 默认旋转是否已记录
    initiated: bool,
}

impl LimitBase {
    fn new(axis: Vec3) -> Result<Self> {
        let axis = axis.try_normalize().ok_or(IkError::ZeroAxis)?;
        Ok(Self {
            axis,
            default_local_rotation: Quat::IDENTITY,
            initiated: false,
        })
    }
}

/// 限制变体
#[derive(Clone, Debug)]
pub enum LimitKind {
    Angle(AngleLimit),
    Hinge(HingeLimit),
    Polygonal(PolygonalLimit),
    Spline(SplineLimit),
}

/// 旋转限制
#[derive(Clone, Debug)]
pub struct RotationLimit {
    base: LimitBase,
    kind: LimitKind,
}

impl RotationLimit {
    // ========================================
    // 构造
    // ========================================

    /// 锥形限制
    pub fn angle(axis: Vec3, limit: f32, twist_limit: f32) -> Result<Self> {
        Ok(Self {
            base: LimitBase::new(axis)?,
            kind: LimitKind::Angle(AngleLimit::new(limit, twist_limit)),
        })
    }

    /// 铰链限制
    pub fn hinge(axis: Vec3, min: f32, max: f32) -> Result<Self> {
        Ok(Self {
            base: LimitBase::new(axis)?,
            kind: LimitKind::Hinge(HingeLimit::new(min, max)),
        })
    }

    /// 多边形限制，points 按绕主轴逆时针排列
    pub fn polygonal(axis: Vec3, points: Vec<Vec3>, smooth_iterations: u32, twist_limit: f32) -> Result<Self> {
        let base = LimitBase::new(axis)?;
        let polygonal = PolygonalLimit::new(base.axis, points, smooth_iterations, twist_limit)?;
        Ok(Self {
            base,
            kind: LimitKind::Polygonal(polygonal),
        })
    }

    /// 样条限制
    pub fn spline(axis: Vec3, curve: LimitCurve, twist_limit: f32) -> Result<Self> {
        Ok(Self {
            base: LimitBase::new(axis)?,
            kind: LimitKind::Spline(SplineLimit::new(curve, twist_limit)),
        })
    }

    // ========================================
    // 访问器
    // ========================================

    #[inline]
    pub fn axis(&self) -> Vec3 {
        self.base.axis
    }

    /// 修改主轴（多边形限制会重建 reach cone 并报告无效 cone）
    pub fn set_axis(&mut self, axis: Vec3, diag: &mut dyn DiagnosticSink) -> Result<()> {
        self.base.axis = axis.try_normalize().ok_or(IkError::ZeroAxis)?;
        if let LimitKind::Polygonal(p) = &mut self.kind {
            p.build_reach_cones(self.base.axis);
            p.report_invalid_cones(diag);
        }
        Ok(())
    }

    #[inline]
    pub fn kind(&self) -> &LimitKind {
        &self.kind
    }

    #[inline]
    pub fn kind_mut(&mut self) -> &mut LimitKind {
        &mut self.kind
    }

    #[inline]
    pub fn default_local_rotation(&self) -> Quat {
        self.base.default_local_rotation
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.base.initiated
    }

    /// 次轴
    #[inline]
    pub fn secondary_axis(&self) -> Vec3 {
        math::secondary_axis(self.base.axis)
    }

    /// 交叉轴
    #[inline]
    pub fn cross_axis(&self) -> Vec3 {
        math::cross_axis(self.base.axis)
    }

    /// 多边形限制：替换限制点并重建 reach cone
    pub fn set_limit_points(&mut self, points: Vec<Vec3>, diag: &mut dyn DiagnosticSink) -> Result<()> {
        let axis = self.base.axis;
        let LimitKind::Polygonal(p) = &mut self.kind else {
            return Ok(());
        };
        if let Err(e) = p.set_limit_points(axis, points) {
            diag.warning(DiagnosticCode::TooFewLimitPoints, e.to_string());
            return Err(e);
        }
        p.report_invalid_cones(diag);
        Ok(())
    }

    // ========================================
    // 初始化
    // ========================================

    /// 记录默认局部旋转（只记录一次），并报告配置问题
    pub fn initiate(&mut self, default_local_rotation: Quat, diag: &mut dyn DiagnosticSink) {
        if !self.base.initiated {
            self.base.default_local_rotation = default_local_rotation.normalize();
            self.base.initiated = true;
        }
        if let LimitKind::Polygonal(p) = &self.kind {
            p.report_invalid_cones(diag);
        }
    }

    /// 强制覆盖默认局部旋转
    pub fn set_default_local_rotation(&mut self, rotation: Quat) {
        self.base.default_local_rotation = rotation.normalize();
        self.base.initiated = true;
        if let LimitKind::Hinge(h) = &mut self.kind {
            h.reset();
        }
    }

    // ========================================
    // 限制
    // ========================================

    /// 限制相对默认旋转的旋转
    pub fn limit(&mut self, rotation: Quat) -> Quat {
        let axis = self.base.axis;
        match &mut self.kind {
            LimitKind::Angle(a) => a.limit_rotation(axis, rotation),
            LimitKind::Hinge(h) => h.limit_rotation(axis, rotation),
            LimitKind::Polygonal(p) => p.limit_rotation(axis, rotation),
            LimitKind::Spline(s) => s.limit_rotation(axis, rotation),
        }
    }

    /// 限制局部旋转，返回 (结果, 是否被修改)
    pub fn get_limited_local_rotation(&mut self, local_rotation: Quat) -> (Quat, bool) {
        let default = self.base.default_local_rotation;
        let rotation = default.inverse() * local_rotation;
        let limited = self.limit(rotation);
        if rotations_equal(limited, rotation) {
            return (local_rotation, false);
        }
        ((default * limited).normalize(), true)
    }

    /// 对骨骼上的关节应用限制
    pub fn apply(&mut self, skeleton: &mut Skeleton, joint: usize) -> bool {
        let Some(local) = skeleton.joint(joint).map(|j| j.local_rotation) else {
            return false;
        };
        let (limited, changed) = self.get_limited_local_rotation(local);
        if changed {
            skeleton.set_local_rotation(joint, limited);
        }
        changed
    }
}
