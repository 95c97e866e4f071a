//! 旋转限制的整体行为（通过公开接口）

use glam::{EulerRot, Quat, Vec3};
use limb_ik_engine::limits::{swing_angle, twist_angle};
use limb_ik_engine::math::secondary_axis;
use limb_ik_engine::{
    DiagnosticCode, Diagnostics, IkError, Keyframe, LimitCurve, LimitKind, RotationLimit, Skeleton,
};

#[test]
fn test_angle_limit_bounds_swing_and_twist() {
    let axis = Vec3::new(0.3, 1.0, -0.2).normalize();
    let mut limit = RotationLimit::angle(axis, 40.0, 25.0).unwrap();
    let ortho = secondary_axis(axis);

    for i in 0..12 {
        for j in 0..12 {
            let q = Quat::from_euler(EulerRot::XYZ, i as f32 * 0.55 - 3.0, j as f32 * 0.5 - 2.8, 0.9 - i as f32 * 0.2);
            let r = limit.limit(q);
            assert!(swing_angle(r, axis) <= 40.0 + 1e-2, "swing {}", swing_angle(r, axis));
            assert!(twist_angle(r, axis, ortho) <= 25.0 + 0.1, "twist {}", twist_angle(r, axis, ortho));
        }
    }
    assert_eq!(limit.limit(Quat::IDENTITY), Quat::IDENTITY);
}

#[test]
fn test_hinge_unwrapped_accumulation() {
    let mut limit = RotationLimit::hinge(Vec3::X, -10.0, 370.0).unwrap();
    for step in 1..=80 {
        limit.limit(Quat::from_axis_angle(Vec3::X, (5.0 * step as f32).to_radians()));
    }
    let LimitKind::Hinge(hinge) = limit.kind() else {
        panic!("expected hinge");
    };
    assert!((hinge.last_angle() - 370.0).abs() < 1e-2, "angle {}", hinge.last_angle());
}

#[test]
fn test_polygonal_boundary_inclusive_and_reversed_warns() {
    // 绕 Y 逆时针：+X → -Z → -X → +Z
    let points = vec![
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 1.0),
    ];
    let limit = RotationLimit::polygonal(Vec3::Y, points.clone(), 0, 180.0).unwrap();
    let LimitKind::Polygonal(poly) = limit.kind() else {
        panic!("expected polygonal");
    };
    assert!(poly.reach_cones().iter().all(|c| c.is_valid()));
    for p in &points {
        assert!(poly.contains(Vec3::Y, *p));
    }

    let mut reversed = points;
    reversed.reverse();
    let mut limit = RotationLimit::polygonal(Vec3::Y, reversed, 0, 180.0).unwrap();
    let mut diag = Diagnostics::with_policy(true);
    limit.initiate(Quat::IDENTITY, &mut diag);
    assert!(diag.contains(DiagnosticCode::InvalidReachCone));
    assert!(!diag.has_errors());
}

#[test]
fn test_spline_seam_continuity() {
    let mut curve = LimitCurve::new(vec![
        Keyframe::new(0.0, 25.0),
        Keyframe::new(90.0, 60.0),
        Keyframe::new(200.0, 40.0),
        Keyframe::new(360.0, 25.0),
    ])
    .unwrap();
    curve.smooth_tangents();
    let slope = curve.max_slope();
    let mut limit = RotationLimit::spline(Vec3::Z, curve, 180.0).unwrap();

    let swing_at = |limit: &mut RotationLimit, azimuth: f32| {
        let a = azimuth.to_radians();
        let dir = limit.secondary_axis() * a.cos() + limit.cross_axis() * a.sin();
        let q = Quat::from_axis_angle(Vec3::Z.cross(dir).normalize(), 100f32.to_radians());
        swing_angle(limit.limit(q), Vec3::Z)
    };
    let before = swing_at(&mut limit, 359.5);
    let after = swing_at(&mut limit, 0.5);
    assert!((before - after).abs() <= slope + 0.05, "{} vs {}", before, after);
}

#[test]
fn test_apply_relative_to_default_rotation() {
    let mut s = Skeleton::new();
    let root = s.add_joint("root", None, Vec3::ZERO, Quat::IDENTITY).unwrap();
    let default = Quat::from_rotation_x(0.4);
    let joint = s.add_joint("joint", Some(root), Vec3::Y, default).unwrap();

    let mut limit = RotationLimit::angle(Vec3::Y, 20.0, 180.0).unwrap();
    let mut diag = Diagnostics::with_policy(false);
    limit.initiate(default, &mut diag);

    // 默认姿态本身不被修改
    assert!(!limit.apply(&mut s, joint));

    s.set_local_rotation(joint, default * Quat::from_rotation_z(1.0));
    assert!(limit.apply(&mut s, joint));
    let relative = default.inverse() * s.joint(joint).unwrap().local_rotation;
    assert!((swing_angle(relative, Vec3::Y) - 20.0).abs() < 0.05);
}

#[test]
fn test_set_limit_points_rebuilds_cones() {
    let square = vec![
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(-1.0, 0.0, 1.0),
        Vec3::new(0.0, -1.0, 1.0),
    ];
    let mut limit = RotationLimit::polygonal(Vec3::Z, square, 0, 180.0).unwrap();
    let mut diag = Diagnostics::with_policy(false);

    // 逆时针五边形
    let pentagon: Vec<Vec3> = (0..5)
        .map(|i| {
            let a = (i as f32 * 72.0).to_radians();
            Vec3::new(a.cos(), a.sin(), 1.2)
        })
        .collect();
    limit.set_limit_points(pentagon.clone(), &mut diag).unwrap();
    assert!(diag.is_empty());
    let LimitKind::Polygonal(poly) = limit.kind() else {
        panic!("expected polygonal");
    };
    assert_eq!(poly.points(), pentagon.as_slice());
    assert_eq!(poly.reach_cones().len(), 5);
    assert!(poly.reach_cones().iter().all(|c| c.is_valid()));

    // 点数不足：返回错误并记录警告，原有 cone 保留
    let err = limit.set_limit_points(vec![Vec3::X, Vec3::Y], &mut diag).unwrap_err();
    assert!(matches!(err, IkError::TooFewLimitPoints(2)));
    assert!(diag.contains(DiagnosticCode::TooFewLimitPoints));
    assert!(!diag.has_errors());
    let LimitKind::Polygonal(poly) = limit.kind() else {
        panic!("expected polygonal");
    };
    assert_eq!(poly.reach_cones().len(), 5);

    // 顺时针：接受但警告
    let mut reversed = pentagon;
    reversed.reverse();
    limit.set_limit_points(reversed, &mut diag).unwrap();
    assert!(diag.contains(DiagnosticCode::InvalidReachCone));
}

#[test]
fn test_set_limit_points_ignored_by_other_kinds() {
    let mut limit = RotationLimit::angle(Vec3::Z, 30.0, 180.0).unwrap();
    let mut diag = Diagnostics::with_policy(false);
    assert!(limit.set_limit_points(vec![Vec3::X], &mut diag).is_ok());
    assert!(diag.is_empty());
}

#[test]
fn test_set_smooth_iterations_through_kind() {
    let square = vec![
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(-1.0, 0.0, 1.0),
        Vec3::new(0.0, -1.0, 1.0),
    ];
    let mut limit = RotationLimit::polygonal(Vec3::Z, square, 0, 180.0).unwrap();
    let axis = limit.axis();
    if let LimitKind::Polygonal(poly) = limit.kind_mut() {
        poly.set_smooth_iterations(axis, 2);
        assert_eq!(poly.smoothed_points().len(), 16);
        assert!(poly.reach_cones().iter().all(|c| c.is_valid()));
    } else {
        panic!("expected polygonal");
    }

    // 平滑后的边界仍然包含限制结果
    let q = Quat::from_axis_angle(Vec3::new(1.0, -1.0, 0.0).normalize(), 80f32.to_radians());
    let r = limit.limit(q);
    let LimitKind::Polygonal(poly) = limit.kind() else {
        panic!("expected polygonal");
    };
    assert!(poly.contains(Vec3::Z, r * Vec3::Z));
    assert!(swing_angle(r, Vec3::Z) < 80.0);
}
