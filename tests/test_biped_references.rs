//! 双足引用识别与校验

use glam::{Quat, Vec3};
use limb_ik_engine::{
    BipedIk, BipedReferences, DiagnosticCode, Diagnostics, HumanBone, HumanoidMapping, IkError,
    Limb, Skeleton,
};

/// 标准人形：面朝 +Z，左侧在 +X，肘 / 膝略弯
fn humanoid() -> Skeleton {
    let mut s = Skeleton::new();
    let q = Quat::IDENTITY;
    let root = s.add_joint("Character", None, Vec3::ZERO, q).unwrap();
    let hips = s.add_joint("Hips", Some(root), Vec3::new(0.0, 1.0, 0.0), q).unwrap();
    let spine = s.add_joint("Spine", Some(hips), Vec3::new(0.0, 0.1, 0.0), q).unwrap();
    let spine1 = s.add_joint("Spine1", Some(spine), Vec3::new(0.0, 0.15, 0.0), q).unwrap();
    let spine2 = s.add_joint("Spine2", Some(spine1), Vec3::new(0.0, 0.15, 0.0), q).unwrap();
    let neck = s.add_joint("Neck", Some(spine2), Vec3::new(0.0, 0.12, 0.0), q).unwrap();
    let head = s.add_joint("Head", Some(neck), Vec3::new(0.0, 0.1, 0.02), q).unwrap();
    s.add_joint("LeftEye", Some(head), Vec3::new(0.03, 0.08, 0.08), q).unwrap();
    s.add_joint("RightEye", Some(head), Vec3::new(-0.03, 0.08, 0.08), q).unwrap();

    for (side, x) in [("Left", 1.0f32), ("Right", -1.0f32)] {
        let shoulder = s.add_joint(format!("{}Shoulder", side), Some(spine2), Vec3::new(0.05 * x, 0.08, 0.0), q).unwrap();
        let arm = s.add_joint(format!("{}Arm", side), Some(shoulder), Vec3::new(0.12 * x, 0.0, 0.0), q).unwrap();
        let fore = s.add_joint(format!("{}ForeArm", side), Some(arm), Vec3::new(0.28 * x, 0.0, -0.03), q).unwrap();
        s.add_joint(format!("{}Hand", side), Some(fore), Vec3::new(0.25 * x, 0.0, 0.03), q).unwrap();

        let up_leg = s.add_joint(format!("{}UpLeg", side), Some(hips), Vec3::new(0.1 * x, -0.05, 0.0), q).unwrap();
        let leg = s.add_joint(format!("{}Leg", side), Some(up_leg), Vec3::new(0.0, -0.42, 0.02), q).unwrap();
        let foot = s.add_joint(format!("{}Foot", side), Some(leg), Vec3::new(0.0, -0.42, -0.02), q).unwrap();
        s.add_joint(format!("{}ToeBase", side), Some(foot), Vec3::new(0.0, -0.05, 0.12), q).unwrap();
    }
    s
}

fn find(s: &Skeleton, name: &str) -> usize {
    s.find(name).unwrap()
}

#[test]
fn test_auto_detect_standard_humanoid() {
    let s = humanoid();
    let refs = BipedReferences::auto_detect(&s, 0);

    assert_eq!(refs.pelvis, Some(find(&s, "Hips")));
    assert_eq!(refs.head, Some(find(&s, "Head")));
    assert_eq!(
        refs.limb(Limb::LeftArm).bones(),
        Some([find(&s, "LeftArm"), find(&s, "LeftForeArm"), find(&s, "LeftHand")])
    );
    assert_eq!(
        refs.limb(Limb::RightLeg).bones(),
        Some([find(&s, "RightUpLeg"), find(&s, "RightLeg"), find(&s, "RightFoot")])
    );
    assert_eq!(refs.spine, vec![find(&s, "Spine"), find(&s, "Spine1"), find(&s, "Spine2")]);
    assert_eq!(refs.eyes, vec![find(&s, "LeftEye"), find(&s, "RightEye")]);
}

#[test]
fn test_valid_humanoid_passes_without_warnings() {
    let s = humanoid();
    let refs = BipedReferences::auto_detect(&s, 0);
    let mut diag = Diagnostics::with_policy(false);
    assert!(refs.validate(&s, &mut diag));
    assert!(diag.is_empty(), "{:?}", diag.entries());
}

#[test]
fn test_duplicated_bone_rejected() {
    let s = humanoid();
    let mut refs = BipedReferences::auto_detect(&s, 0);
    let upper = refs.limb(Limb::LeftArm).upper;
    refs.limb_mut(Limb::LeftArm).middle = upper;

    let mut diag = Diagnostics::with_policy(false);
    assert!(!refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::DuplicateBone));
}

#[test]
fn test_missing_bone_rejected() {
    let s = humanoid();
    let mut refs = BipedReferences::auto_detect(&s, 0);
    refs.head = None;
    let mut diag = Diagnostics::with_policy(false);
    assert!(!refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::MissingBone));
}

#[test]
fn test_broken_hierarchy_rejected() {
    let s = humanoid();
    let mut refs = BipedReferences::auto_detect(&s, 0);
    // 手与前臂交换
    let limb = refs.limb_mut(Limb::RightArm);
    std::mem::swap(&mut limb.middle, &mut limb.end);
    let mut diag = Diagnostics::with_policy(false);
    assert!(!refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::BrokenHierarchy));
}

#[test]
fn test_spine_order_rejected() {
    let s = humanoid();
    let mut refs = BipedReferences::auto_detect(&s, 0);
    refs.spine.reverse();
    let mut diag = Diagnostics::with_policy(false);
    assert!(!refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::SpineOrder));
}

#[test]
fn test_warnings_do_not_block() {
    let mut s = humanoid();
    // 根节点抬到腰部高度
    let hips = find(&s, "Hips");
    s.joint_mut(hips).unwrap().local_translation = Vec3::new(0.0, 0.1, 0.0);
    s.joint_mut(0).unwrap().local_translation = Vec3::new(0.0, 0.9, 0.0);
    s.update_world_transforms();

    let refs = BipedReferences::auto_detect(&s, 0);
    let mut diag = Diagnostics::with_policy(false);
    assert!(refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::RootHeight));
    assert!(!diag.has_errors());
}

#[test]
fn test_mirrored_character_warns_facing() {
    let mut s = humanoid();
    // 绕 Y 转 180°，根节点不动
    let hips = find(&s, "Hips");
    s.set_local_rotation(hips, Quat::from_rotation_y(std::f32::consts::PI));

    let refs = BipedReferences::auto_detect(&s, 0);
    let mut diag = Diagnostics::with_policy(false);
    assert!(refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::FacingAxis));
}

fn full_mapping(s: &Skeleton) -> HumanoidMapping {
    HumanoidMapping::from_names(
        s,
        &[
            (HumanBone::Hips, "Hips"),
            (HumanBone::Spine, "Spine"),
            (HumanBone::Chest, "Spine1"),
            (HumanBone::UpperChest, "Spine2"),
            (HumanBone::Head, "Head"),
            (HumanBone::LeftEye, "LeftEye"),
            (HumanBone::RightEye, "RightEye"),
            (HumanBone::LeftUpperArm, "LeftArm"),
            (HumanBone::LeftLowerArm, "LeftForeArm"),
            (HumanBone::LeftHand, "LeftHand"),
            (HumanBone::RightUpperArm, "RightArm"),
            (HumanBone::RightLowerArm, "RightForeArm"),
            (HumanBone::RightHand, "RightHand"),
            (HumanBone::LeftUpperLeg, "LeftUpLeg"),
            (HumanBone::LeftLowerLeg, "LeftLeg"),
            (HumanBone::LeftFoot, "LeftFoot"),
            (HumanBone::RightUpperLeg, "RightUpLeg"),
            (HumanBone::RightLowerLeg, "RightLeg"),
            (HumanBone::RightFoot, "RightFoot"),
        ],
    )
}

#[test]
fn test_humanoid_mapping_matches_naming() {
    let s = humanoid();
    let from_mapping = BipedReferences::from_humanoid(0, &full_mapping(&s));
    assert_eq!(from_mapping, BipedReferences::auto_detect(&s, 0));
}

#[test]
fn test_humanoid_mapping_bad_spine_index_rejected() {
    let s = humanoid();
    let mut mapping = full_mapping(&s);
    mapping.insert(HumanBone::Spine, 999);

    let refs = BipedReferences::from_humanoid(0, &mapping);
    assert!(refs.spine.contains(&999));
    let mut diag = Diagnostics::with_policy(false);
    assert!(!refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::MissingBone));
}

#[test]
fn test_root_as_pelvis_is_duplicate_only() {
    let s = humanoid();
    let mut refs = BipedReferences::auto_detect(&s, 0);
    refs.root = refs.pelvis;

    let mut diag = Diagnostics::with_policy(false);
    assert!(!refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::DuplicateBone));
    assert!(!diag.contains(DiagnosticCode::BrokenHierarchy));
}

#[test]
fn test_pelvis_outside_root_rejected() {
    let s = humanoid();
    let mut refs = BipedReferences::auto_detect(&s, 0);
    // 根节点放到脊柱上，骨盆不再是它的后代
    refs.root = Some(find(&s, "Neck"));

    let mut diag = Diagnostics::with_policy(false);
    assert!(!refs.validate(&s, &mut diag));
    assert!(diag.contains(DiagnosticCode::BrokenHierarchy));
}

#[test]
fn test_biped_ik_requires_valid_references() {
    let mut s = humanoid();
    let mut refs = BipedReferences::auto_detect(&s, 0);
    refs.limb_mut(Limb::LeftLeg).end = None;

    let mut biped = BipedIk::new(refs);
    let mut diag = Diagnostics::with_policy(false);
    let err = biped.initiate(&mut s, &mut diag).unwrap_err();
    assert!(matches!(err, IkError::InvalidReferences(n) if n > 0));
    assert!(!biped.is_initiated());

    let mut biped = BipedIk::new(BipedReferences::auto_detect(&s, 0));
    let mut diag = Diagnostics::with_policy(false);
    biped.initiate(&mut s, &mut diag).unwrap();
    assert!(biped.is_initiated());
    assert!(biped.spine.is_some());
    assert!(biped.look_at.is_some());
}

#[test]
fn test_stretched_limb_reported_once() {
    let mut s = humanoid();
    let fore = find(&s, "LeftForeArm");
    let hand = find(&s, "LeftHand");
    s.joint_mut(fore).unwrap().local_translation = Vec3::new(0.28, 0.0, 0.0);
    s.joint_mut(hand).unwrap().local_translation = Vec3::new(0.25, 0.0, 0.0);
    s.update_world_transforms();

    let mut biped = BipedIk::new(BipedReferences::auto_detect(&s, 0));
    let mut diag = Diagnostics::with_policy(false);
    biped.initiate(&mut s, &mut diag).unwrap();

    let stretched = diag
        .entries()
        .iter()
        .filter(|d| d.code == DiagnosticCode::StretchedLimb)
        .count();
    assert_eq!(stretched, 1);
    assert!(!diag.has_errors());
}
