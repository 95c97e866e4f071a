//! 双足骨骼引用
//!
//! 两种来源：
//! - 按命名规则自动识别（`auto_detect`）
//! - 引擎提供的人形骨骼映射（`from_humanoid`）
//!
//! `validate` 分两级报告：错误使整套引用失效，警告只记录不阻止初始化。

use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::config::get_config;
use crate::diagnostics::{DiagnosticCode, DiagnosticSink, Severity};
use crate::skeleton::Skeleton;
use super::naming::{self, BoneSide, BoneType};

/// 根节点高度与头部高度之比的警告阈值
const ROOT_HEIGHT_RATIO: f32 = 0.2;

/// 四肢
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Limb {
    LeftArm = 0,
    RightArm = 1,
    LeftLeg = 2,
    RightLeg = 3,
}

impl Limb {
    pub const ALL: [Limb; 4] = [Limb::LeftArm, Limb::RightArm, Limb::LeftLeg, Limb::RightLeg];

    #[inline]
    pub fn is_arm(self) -> bool {
        matches!(self, Limb::LeftArm | Limb::RightArm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Limb::LeftArm => "left arm",
            Limb::RightArm => "right arm",
            Limb::LeftLeg => "left leg",
            Limb::RightLeg => "right leg",
        }
    }
}

/// 单个肢体的三根骨骼（上臂/大腿、前臂/小腿、手/脚）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LimbReferences {
    pub upper: Option<usize>,
    pub middle: Option<usize>,
    pub end: Option<usize>,
}

impl LimbReferences {
    pub fn new(upper: usize, middle: usize, end: usize) -> Self {
        Self {
            upper: Some(upper),
            middle: Some(middle),
            end: Some(end),
        }
    }

    /// 三根都已指定
    pub fn bones(&self) -> Option<[usize; 3]> {
        Some([self.upper?, self.middle?, self.end?])
    }
}

/// 人形骨骼槽位
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HumanBone {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftEye,
    RightEye,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
}

/// 引擎提供的人形骨骼映射
#[derive(Clone, Debug, Default)]
pub struct HumanoidMapping {
    bones: HashMap<HumanBone, usize>,
}

impl HumanoidMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按名称建立映射，找不到的名称跳过
    pub fn from_names(skeleton: &Skeleton, names: &[(HumanBone, &str)]) -> Self {
        let mut mapping = Self::new();
        for &(bone, name) in names {
            if let Some(idx) = skeleton.find(name) {
                mapping.insert(bone, idx);
            }
        }
        mapping
    }

    pub fn insert(&mut self, bone: HumanBone, joint: usize) {
        self.bones.insert(bone, joint);
    }

    #[inline]
    pub fn get(&self, bone: HumanBone) -> Option<usize> {
        self.bones.get(&bone).copied()
    }
}

/// 双足骨骼引用
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BipedReferences {
    pub root: Option<usize>,
    pub pelvis: Option<usize>,
    pub limbs: [LimbReferences; 4],
    /// 骨盆之后，从下到上
    pub spine: Vec<usize>,
    pub head: Option<usize>,
    pub eyes: Vec<usize>,
}

impl BipedReferences {
    #[inline]
    pub fn limb(&self, limb: Limb) -> &LimbReferences {
        &self.limbs[limb as usize]
    }

    #[inline]
    pub fn limb_mut(&mut self, limb: Limb) -> &mut LimbReferences {
        &mut self.limbs[limb as usize]
    }

    // ========================================
    // 自动识别
    // ========================================

    /// 按命名规则识别 root 之下的骨骼
    pub fn auto_detect(skeleton: &Skeleton, root: usize) -> Self {
        let mut refs = Self {
            root: Some(root),
            ..Self::default()
        };
        let candidates = skeleton.descendants(root);
        if candidates.is_empty() {
            return refs;
        }

        for limb in Limb::ALL {
            let (bone_type, side) = match limb {
                Limb::LeftArm => (BoneType::Arm, BoneSide::Left),
                Limb::RightArm => (BoneType::Arm, BoneSide::Right),
                Limb::LeftLeg => (BoneType::Leg, BoneSide::Left),
                Limb::RightLeg => (BoneType::Leg, BoneSide::Right),
            };
            let bones = naming::bones_of_type_and_side(skeleton, &candidates, bone_type, side);
            let end_names = if limb.is_arm() { naming::HAND } else { naming::FOOT };
            *refs.limb_mut(limb) = Self::detect_limb(skeleton, &bones, end_names);
        }

        let spine_bones = naming::bones_of_type(skeleton, &candidates, BoneType::Spine);
        let thigh_parent = refs
            .limb(Limb::LeftLeg)
            .upper
            .and_then(|thigh| skeleton.parent(thigh));
        refs.pelvis = naming::naming_match(skeleton, &spine_bones, &[naming::PELVIS]).or(thigh_parent);

        refs.spine = Self::detect_spine(skeleton, &refs);

        let heads = naming::bones_of_type(skeleton, &candidates, BoneType::Head);
        refs.head = naming::naming_match(skeleton, &heads, &[naming::HEAD]).or(heads.first().copied());

        let eyes = naming::bones_of_type(skeleton, &candidates, BoneType::Eye);
        for side in [BoneSide::Left, BoneSide::Right] {
            if let Some(&eye) = eyes
                .iter()
                .find(|&&e| skeleton.joint(e).is_some_and(|j| naming::bone_side(&j.name) == side))
            {
                refs.eyes.push(eye);
            }
        }

        refs
    }

    /// 三根正好；多于三根取首、第三，末端优先按手/脚命名
    fn detect_limb(skeleton: &Skeleton, bones: &[usize], end_names: &[&str]) -> LimbReferences {
        match bones.len() {
            3 => LimbReferences::new(bones[0], bones[1], bones[2]),
            n if n > 3 => {
                let end = naming::naming_match(skeleton, &bones[3..], &[end_names]).unwrap_or(bones[n - 1]);
                LimbReferences::new(bones[0], bones[2], end)
            }
            _ => LimbReferences::default(),
        }
    }

    /// 两条上臂的公共祖先一路向上到骨盆（不含）
    fn detect_spine(skeleton: &Skeleton, refs: &Self) -> Vec<usize> {
        let (Some(pelvis), Some(left), Some(right)) = (
            refs.pelvis,
            refs.limb(Limb::LeftArm).upper,
            refs.limb(Limb::RightArm).upper,
        ) else {
            return Vec::new();
        };

        let mut ancestor = skeleton.parent(left);
        while let Some(a) = ancestor {
            if skeleton.is_ancestor(a, right) {
                break;
            }
            ancestor = skeleton.parent(a);
        }

        let mut spine = Vec::new();
        let mut current = ancestor;
        while let Some(c) = current {
            if c == pelvis {
                spine.reverse();
                return spine;
            }
            spine.push(c);
            current = skeleton.parent(c);
        }
        // 没走到骨盆，说明公共祖先不在骨盆之下
        Vec::new()
    }

    // ========================================
    // 人形映射
    // ========================================

    pub fn from_humanoid(root: usize, mapping: &HumanoidMapping) -> Self {
        let limb = |upper, middle, end| LimbReferences {
            upper: mapping.get(upper),
            middle: mapping.get(middle),
            end: mapping.get(end),
        };

        // 不存在的索引保留下来，由 validate 报告
        let spine = [HumanBone::Spine, HumanBone::Chest, HumanBone::UpperChest, HumanBone::Neck]
            .into_iter()
            .filter_map(|b| mapping.get(b))
            .collect();

        Self {
            root: Some(root),
            pelvis: mapping.get(HumanBone::Hips),
            limbs: [
                limb(HumanBone::LeftUpperArm, HumanBone::LeftLowerArm, HumanBone::LeftHand),
                limb(HumanBone::RightUpperArm, HumanBone::RightLowerArm, HumanBone::RightHand),
                limb(HumanBone::LeftUpperLeg, HumanBone::LeftLowerLeg, HumanBone::LeftFoot),
                limb(HumanBone::RightUpperLeg, HumanBone::RightLowerLeg, HumanBone::RightFoot),
            ],
            spine,
            head: mapping.get(HumanBone::Head),
            eyes: [HumanBone::LeftEye, HumanBone::RightEye]
                .into_iter()
                .filter_map(|b| mapping.get(b))
                .collect(),
        }
    }

    // ========================================
    // 校验
    // ========================================

    /// 校验引用，无错误时返回 true
    pub fn validate(&self, skeleton: &Skeleton, diag: &mut dyn DiagnosticSink) -> bool {
        self.validate_count(skeleton, diag) == 0
    }

    /// 校验并返回错误数
    pub(crate) fn validate_count(&self, skeleton: &Skeleton, diag: &mut dyn DiagnosticSink) -> usize {
        let mut counter = ErrorCounter { inner: diag, errors: 0 };
        self.check_errors(skeleton, &mut counter);
        if counter.errors == 0 {
            self.check_warnings(skeleton, &mut counter);
        }
        counter.errors
    }

    fn check_errors(&self, skeleton: &Skeleton, diag: &mut dyn DiagnosticSink) {
        // 缺失
        let mut required: Vec<(&str, Option<usize>)> = vec![
            ("root", self.root),
            ("pelvis", self.pelvis),
            ("head", self.head),
        ];
        for limb in Limb::ALL {
            let refs = self.limb(limb);
            required.push((limb.as_str(), refs.upper));
            required.push((limb.as_str(), refs.middle));
            required.push((limb.as_str(), refs.end));
        }
        let mut missing = false;
        for (slot, bone) in &required {
            match bone {
                None => {
                    diag.error(DiagnosticCode::MissingBone, format!("{} bone is not assigned", slot));
                    missing = true;
                }
                Some(idx) if skeleton.check(*idx).is_err() => {
                    diag.error(DiagnosticCode::MissingBone, format!("{} bone {} does not exist", slot, idx));
                    missing = true;
                }
                _ => {}
            }
        }
        for &idx in self.spine.iter().chain(&self.eyes) {
            if skeleton.check(idx).is_err() {
                diag.error(DiagnosticCode::MissingBone, format!("bone {} does not exist", idx));
                missing = true;
            }
        }
        if missing {
            return;
        }

        // 重复（根节点也不能兼任骨盆）
        let mut duplicated = false;
        let mut seen = HashSet::new();
        let all = required
            .iter()
            .filter_map(|(_, b)| *b)
            .chain(self.spine.iter().copied())
            .chain(self.eyes.iter().copied());
        for idx in all {
            if !seen.insert(idx) {
                diag.error(
                    DiagnosticCode::DuplicateBone,
                    format!("bone '{}' is assigned to more than one slot", joint_name(skeleton, idx)),
                );
                duplicated = true;
            }
        }
        if duplicated {
            return;
        }

        let (Some(root), Some(pelvis), Some(head)) = (self.root, self.pelvis, self.head) else {
            return;
        };
        if !skeleton.is_ancestor(root, pelvis) {
            diag.error(DiagnosticCode::BrokenHierarchy, "pelvis is not a descendant of root".to_string());
        }

        // 肢体层级与长度
        let epsilon = get_config().epsilon;
        for limb in Limb::ALL {
            let Some([upper, middle, end]) = self.limb(limb).bones() else {
                continue;
            };
            if !skeleton.is_ancestor(upper, middle) || !skeleton.is_ancestor(middle, end) {
                diag.error(
                    DiagnosticCode::BrokenHierarchy,
                    format!("{} bones are not an ancestor chain", limb.as_str()),
                );
                continue;
            }
            if !limb.is_arm() && !skeleton.is_ancestor(pelvis, upper) {
                diag.error(
                    DiagnosticCode::BrokenHierarchy,
                    format!("{} is not a descendant of pelvis", limb.as_str()),
                );
            }
            let p = [upper, middle, end].map(|b| skeleton.position(b));
            if (p[1] - p[0]).length() <= epsilon || (p[2] - p[1]).length() <= epsilon {
                diag.error(
                    DiagnosticCode::ZeroLengthBone,
                    format!("{} has a zero length bone", limb.as_str()),
                );
            }
        }

        // 脊柱顺序
        let mut previous = pelvis;
        for &bone in &self.spine {
            if !skeleton.is_ancestor(previous, bone) {
                diag.error(
                    DiagnosticCode::SpineOrder,
                    format!(
                        "spine bone '{}' is not a descendant of '{}'",
                        joint_name(skeleton, bone),
                        joint_name(skeleton, previous)
                    ),
                );
                return;
            }
            previous = bone;
        }
        if !skeleton.is_ancestor(previous, head) {
            diag.error(
                DiagnosticCode::BrokenHierarchy,
                "head is not a descendant of the last spine bone".to_string(),
            );
        }
    }

    /// 只在没有错误时调用，所有槽位都已指定
    fn check_warnings(&self, skeleton: &Skeleton, diag: &mut dyn DiagnosticSink) {
        let epsilon = get_config().epsilon;

        // 伸直的肢体
        for limb in Limb::ALL {
            let Some([upper, middle, end]) = self.limb(limb).bones() else {
                continue;
            };
            let p = [upper, middle, end].map(|b| skeleton.position(b));
            let normal = (p[1] - p[0]).cross(p[2] - p[1]);
            if normal.length_squared() <= epsilon * (p[1] - p[0]).length_squared() {
                diag.warning(
                    DiagnosticCode::StretchedLimb,
                    format!("{} is completely stretched, bend direction can not be calculated", limb.as_str()),
                );
            }
        }

        let (Some(root), Some(head)) = (self.root, self.head) else {
            return;
        };
        let root_position = skeleton.position(root);
        let root_rotation = skeleton.rotation(root);
        let up = root_rotation * Vec3::Y;

        // 根节点应在地面高度
        if let Some(left_foot) = self.limb(Limb::LeftLeg).end {
            let foot = skeleton.position(left_foot);
            let root_height = (root_position - foot).dot(up).abs();
            let head_height = (skeleton.position(head) - foot).dot(up).abs();
            if head_height > epsilon && root_height / head_height > ROOT_HEIGHT_RATIO {
                diag.warning(
                    DiagnosticCode::RootHeight,
                    format!(
                        "root is not at feet level (height ratio {:.2}), root should be the character's ground position",
                        root_height / head_height
                    ),
                );
            }
        }

        // 角色应朝向根节点 +Z，左侧在 +X
        let right = root_rotation * Vec3::NEG_X;
        let pairs = [
            (Limb::LeftArm, Limb::RightArm, "hands"),
            (Limb::LeftLeg, Limb::RightLeg, "feet"),
        ];
        for (left, right_limb, what) in pairs {
            let (Some(l), Some(r)) = (self.limb(left).end, self.limb(right_limb).end) else {
                continue;
            };
            let left_to_right = skeleton.position(r) - skeleton.position(l);
            if left_to_right.dot(right) < 0.0 {
                diag.warning(
                    DiagnosticCode::FacingAxis,
                    format!("{} are mirrored relative to the root, character should face root +Z", what),
                );
            }
        }
    }
}

fn joint_name(skeleton: &Skeleton, idx: usize) -> &str {
    skeleton.joint(idx).map(|j| j.name.as_str()).unwrap_or("?")
}

/// 统计错误数并转发
struct ErrorCounter<'a> {
    inner: &'a mut dyn DiagnosticSink,
    errors: usize,
}

impl DiagnosticSink for ErrorCounter<'_> {
    fn record(&mut self, severity: Severity, code: DiagnosticCode, context: String) {
        if severity == Severity::Error {
            self.errors += 1;
        }
        self.inner.record(severity, code, context);
    }
}
