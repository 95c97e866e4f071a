//! 骨骼命名规则
//!
//! 根据常见 DCC / 动捕软件的命名习惯猜测骨骼类型与左右侧。
//! 类型按 spine → head → arm → leg → tail → eye 的顺序匹配，先命中者优先。

use crate::skeleton::Skeleton;

/// 骨骼类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoneType {
    Unassigned,
    Spine,
    Head,
    Arm,
    Leg,
    Tail,
    Eye,
}

/// 骨骼侧
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoneSide {
    Center,
    Left,
    Right,
}

// ============================================================================
// 命名表
// ============================================================================

const TYPE_LEFT: &[&str] = &[" L ", "_L_", "-L-", " l ", "_l_", "-l-", "Left", "left", "CATRigL"];
const TYPE_RIGHT: &[&str] = &[" R ", "_R_", "-R-", " r ", "_r_", "-r-", "Right", "right", "CATRigR"];

const TYPE_SPINE: &[&str] = &[
    "Spine", "spine", "Pelvis", "pelvis", "Root", "root", "Torso", "torso", "Body", "body",
    "Hips", "hips", "Neck", "neck", "Chest", "chest",
];
const TYPE_HEAD: &[&str] = &["Head", "head"];
const TYPE_ARM: &[&str] = &[
    "Arm", "arm", "Hand", "hand", "Wrist", "wrist", "Elbow", "elbow", "Palm", "palm",
];
const TYPE_LEG: &[&str] = &[
    "Leg", "leg", "Thigh", "thigh", "Calf", "calf", "Femur", "femur", "Knee", "knee",
    "Foot", "foot", "Ankle", "ankle", "Hip", "hip",
];
const TYPE_TAIL: &[&str] = &["Tail", "tail"];
const TYPE_EYE: &[&str] = &["Eye", "eye"];

const EXCLUDE: &[&str] = &["Nub", "Dummy", "dummy", "Tip", "IK", "Mesh"];
const EXCLUDE_SPINE: &[&str] = &["Head", "head"];
const EXCLUDE_HEAD: &[&str] = &["Top", "End"];
const EXCLUDE_ARM: &[&str] = &[
    "Collar", "collar", "Clavicle", "clavicle", "Finger", "finger", "Index", "index", "Mid",
    "mid", "Pinky", "pinky", "Ring", "Thumb", "thumb", "Adjust", "adjust", "Twist", "twist",
];
const EXCLUDE_LEG: &[&str] = &["Toe", "toe", "Platform", "Adjust", "adjust", "Twist", "twist"];
const EXCLUDE_TAIL: &[&str] = &[];
const EXCLUDE_EYE: &[&str] = &["Lid", "lid", "Brow", "brow", "Lash", "lash"];

/// 骨盆
pub const PELVIS: &[&str] = &["Pelvis", "pelvis", "Hip", "hip"];
/// 头
pub const HEAD: &[&str] = TYPE_HEAD;
/// 手
pub const HAND: &[&str] = &["Hand", "hand", "Wrist", "wrist", "Palm", "palm"];
/// 脚
pub const FOOT: &[&str] = &["Foot", "foot", "Ankle", "ankle"];

// ============================================================================
// 匹配
// ============================================================================

#[inline]
fn matches(name: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| name.contains(t))
}

fn is_type(name: &str, include: &[&str], exclude: &[&str]) -> bool {
    matches(name, include) && !matches(name, EXCLUDE) && !matches(name, exclude)
}

/// 按名称判断骨骼类型
pub fn bone_type(name: &str) -> BoneType {
    if is_type(name, TYPE_SPINE, EXCLUDE_SPINE) {
        BoneType::Spine
    } else if is_type(name, TYPE_HEAD, EXCLUDE_HEAD) {
        BoneType::Head
    } else if is_type(name, TYPE_ARM, EXCLUDE_ARM) {
        BoneType::Arm
    } else if is_type(name, TYPE_LEG, EXCLUDE_LEG) {
        BoneType::Leg
    } else if is_type(name, TYPE_TAIL, EXCLUDE_TAIL) {
        BoneType::Tail
    } else if is_type(name, TYPE_EYE, EXCLUDE_EYE) {
        BoneType::Eye
    } else {
        BoneType::Unassigned
    }
}

/// 单字母前缀 / 后缀（"L_Arm"、"arm.R"）
fn single_letter_side(name: &str, letter: char) -> bool {
    const SEPARATORS: [char; 4] = ['_', '.', '-', ' '];
    let lower = letter.to_ascii_lowercase();
    let mut chars = name.chars();
    let prefix = matches!((chars.next(), chars.next()), (Some(c), Some(s)) if (c == letter || c == lower) && SEPARATORS.contains(&s));
    let mut rev = name.chars().rev();
    let suffix = matches!((rev.next(), rev.next()), (Some(c), Some(s)) if (c == letter || c == lower) && SEPARATORS.contains(&s));
    prefix || suffix
}

/// 按名称判断左右侧
pub fn bone_side(name: &str) -> BoneSide {
    if matches(name, TYPE_LEFT) || single_letter_side(name, 'L') {
        BoneSide::Left
    } else if matches(name, TYPE_RIGHT) || single_letter_side(name, 'R') {
        BoneSide::Right
    } else {
        BoneSide::Center
    }
}

/// candidates 中指定类型的骨骼（保持原顺序）
pub fn bones_of_type(skeleton: &Skeleton, candidates: &[usize], bone_type_: BoneType) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&i| skeleton.joint(i).is_some_and(|j| bone_type(&j.name) == bone_type_))
        .collect()
}

/// candidates 中指定类型与侧的骨骼（保持原顺序）
pub fn bones_of_type_and_side(
    skeleton: &Skeleton,
    candidates: &[usize],
    bone_type_: BoneType,
    side: BoneSide,
) -> Vec<usize> {
    bones_of_type(skeleton, candidates, bone_type_)
        .into_iter()
        .filter(|&i| skeleton.joint(i).is_some_and(|j| bone_side(&j.name) == side))
        .collect()
}

/// 第一个同时命中每一组名称的骨骼
pub fn naming_match(skeleton: &Skeleton, candidates: &[usize], namings: &[&[&str]]) -> Option<usize> {
    candidates.iter().copied().find(|&i| {
        skeleton
            .joint(i)
            .is_some_and(|j| namings.iter().all(|group| matches(&j.name, group)))
    })
}
