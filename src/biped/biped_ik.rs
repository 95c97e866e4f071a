//! 双足 IK
//!
//! 四肢各一个肢体求解器，脊柱 CCD，头部瞄准。
//! 所有权重默认为 0，由调用方逐项打开。

use glam::{Quat, Vec3};

use crate::diagnostics::{DiagnosticCode, DiagnosticSink, Severity};
use crate::error::{IkError, Result};
use crate::limits::RotationLimit;
use crate::skeleton::Skeleton;
use crate::solver::{AimSolver, BendModifier, CcdSolver, ChainBone, LimbSolver};
use super::references::{BipedReferences, Limb};

/// 双足 IK
#[derive(Clone, Debug)]
pub struct BipedIk {
    references: BipedReferences,
    limbs: Vec<LimbSolver>,
    pub spine: Option<CcdSolver>,
    pub look_at: Option<AimSolver>,
    initiated: bool,
}

impl BipedIk {
    pub fn new(references: BipedReferences) -> Self {
        Self {
            references,
            limbs: Vec::new(),
            spine: None,
            look_at: None,
            initiated: false,
        }
    }

    #[inline]
    pub fn references(&self) -> &BipedReferences {
        &self.references
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.initiated
    }

    pub fn limb(&self, limb: Limb) -> Option<&LimbSolver> {
        self.limbs.get(limb as usize)
    }

    pub fn limb_mut(&mut self, limb: Limb) -> Option<&mut LimbSolver> {
        self.limbs.get_mut(limb as usize)
    }

    /// 肢体目标与权重
    pub fn set_limb_goal(&mut self, limb: Limb, position: Vec3, rotation: Quat, position_weight: f32, rotation_weight: f32) {
        if let Some(solver) = self.limb_mut(limb) {
            solver.set_target(position, rotation);
            solver.chain.position_weight = position_weight;
            solver.chain.rotation_weight = rotation_weight;
        }
    }

    /// 头部注视目标与权重
    pub fn set_look_at(&mut self, target: Vec3, weight: f32) {
        if let Some(aim) = &mut self.look_at {
            aim.target = target;
            aim.position_weight = weight;
        }
    }

    /// 脊柱末端（头）目标与权重
    pub fn set_spine_target(&mut self, target: Vec3, weight: f32) {
        if let Some(ccd) = &mut self.spine {
            ccd.target = target;
            ccd.position_weight = weight;
        }
    }

    /// 校验引用并建立子求解器，有错误时返回 InvalidReferences
    pub fn initiate(&mut self, skeleton: &mut Skeleton, diag: &mut dyn DiagnosticSink) -> Result<()> {
        self.initiated = false;
        let errors = self.references.validate_count(skeleton, diag);
        if errors > 0 {
            return Err(IkError::InvalidReferences(errors));
        }
        let refs = &self.references;
        let (Some(root), Some(head)) = (refs.root, refs.head) else {
            return Err(IkError::InvalidReferences(1));
        };

        let mut limbs = Vec::with_capacity(4);
        for limb in Limb::ALL {
            let Some([upper, middle, end]) = refs.limb(limb).bones() else {
                return Err(IkError::InvalidReferences(1));
            };
            let modifier = if limb.is_arm() {
                BendModifier::Parent
            } else {
                BendModifier::Target
            };
            let mut solver = LimbSolver::new(upper, middle, end).with_bend_modifier(modifier);
            // 伸直警告已由 validate 按肢体名报告过
            let mut limb_diag = SkipCode { inner: &mut *diag, skip: DiagnosticCode::StretchedLimb };
            solver.initiate(skeleton, &mut limb_diag)?;
            solver.chain.position_weight = 0.0;
            solver.chain.rotation_weight = 0.0;
            limbs.push(solver);
        }
        self.limbs = limbs;

        // 脊柱：骨盆之后的脊柱骨骼，头作为末端
        self.spine = if refs.spine.is_empty() {
            None
        } else {
            let mut bones: Vec<ChainBone> = refs.spine.iter().map(|&j| ChainBone::new(j)).collect();
            bones.push(ChainBone::new(head));
            let mut ccd = CcdSolver::new(bones);
            ccd.initiate(skeleton, diag)?;
            ccd.position_weight = 0.0;
            Some(ccd)
        };

        // 注视：最后一根脊柱骨骼分担一部分，头负责剩余
        let mut aim_bones = Vec::new();
        if let Some(&last) = refs.spine.last() {
            aim_bones.push(ChainBone::with_weight(last, 0.5));
        }
        aim_bones.push(ChainBone::new(head));
        let forward = skeleton.rotation(root) * Vec3::Z;
        let axis = skeleton.rotation(head).inverse() * forward;
        let mut aim = AimSolver::new(aim_bones, head, axis);
        aim.initiate(skeleton, diag)?;
        aim.position_weight = 0.0;
        self.look_at = Some(aim);

        self.initiated = true;
        Ok(())
    }

    /// 脊柱 → 注视 → 四肢
    pub fn solve(&mut self, skeleton: &mut Skeleton, limits: &mut [Option<RotationLimit>]) {
        if !self.initiated {
            return;
        }
        if let Some(spine) = &mut self.spine {
            spine.solve(skeleton, limits);
        }
        if let Some(aim) = &mut self.look_at {
            aim.solve(skeleton, limits);
        }
        for limb in &mut self.limbs {
            limb.solve(skeleton);
        }
    }
}

/// 丢弃指定诊断码，其余转发
struct SkipCode<'a> {
    inner: &'a mut dyn DiagnosticSink,
    skip: DiagnosticCode,
}

impl DiagnosticSink for SkipCode<'_> {
    fn record(&mut self, severity: Severity, code: DiagnosticCode, context: String) {
        if code != self.skip {
            self.inner.record(severity, code, context);
        }
    }
}
