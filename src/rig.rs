//! IK 角色
//!
//! 每帧由宿主显式调用 `tick`，顺序固定：
//! 1. 求解前回调
//! 2. 按添加顺序执行求解器
//! 3. 求解后回调
//! 4. 对求解器没处理过的关节应用旋转限制
//!
//! 不同角色之间没有共享可变状态，`tick_all` 并行更新。

use rayon::prelude::*;

use crate::config::get_config;
use crate::diagnostics::{DiagnosticCode, DiagnosticSink, Diagnostics};
use crate::error::{IkError, Result};
use crate::limits::RotationLimit;
use crate::skeleton::{JointFlags, Skeleton};
use crate::solver::IkSolver;

/// 骨骼回调
pub type SkeletonCallback = Box<dyn FnMut(&mut Skeleton) + Send>;

/// 更新模式
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpdateMode {
    /// 每次 tick 求解一次
    EveryFrame,
    /// 按固定步长求解（跟随物理步）
    FixedStep(f32),
}

impl Default for UpdateMode {
    fn default() -> Self {
        Self::EveryFrame
    }
}

/// IK 角色
pub struct IkRig {
    pub skeleton: Skeleton,
    limits: Vec<Option<RotationLimit>>,
    solvers: Vec<IkSolver>,
    pre_solve: Vec<SkeletonCallback>,
    post_solve: Vec<SkeletonCallback>,
    pub update_mode: UpdateMode,
    diagnostics: Diagnostics,
    accumulator: f32,
    initiated: bool,
}

impl IkRig {
    pub fn new(skeleton: Skeleton) -> Self {
        let limits = (0..skeleton.len()).map(|_| None).collect();
        Self {
            skeleton,
            limits,
            solvers: Vec::new(),
            pre_solve: Vec::new(),
            post_solve: Vec::new(),
            update_mode: UpdateMode::EveryFrame,
            diagnostics: Diagnostics::new(),
            accumulator: 0.0,
            initiated: false,
        }
    }

    // ========================================
    // 配置
    // ========================================

    /// 给关节挂旋转限制（替换已有的）
    pub fn set_limit(&mut self, joint: usize, limit: RotationLimit) -> Result<()> {
        self.skeleton.check(joint)?;
        if self.limits.len() < self.skeleton.len() {
            self.limits.resize_with(self.skeleton.len(), || None);
        }
        self.limits[joint] = Some(limit);
        self.skeleton.set_flag(joint, JointFlags::LIMITED, true);
        if self.initiated {
            self.initiate_limit(joint);
        }
        Ok(())
    }

    /// 移除关节的旋转限制
    pub fn remove_limit(&mut self, joint: usize) -> Option<RotationLimit> {
        let limit = self.limits.get_mut(joint)?.take();
        self.skeleton.set_flag(joint, JointFlags::LIMITED, false);
        limit
    }

    #[inline]
    pub fn limit(&self, joint: usize) -> Option<&RotationLimit> {
        self.limits.get(joint)?.as_ref()
    }

    #[inline]
    pub fn limit_mut(&mut self, joint: usize) -> Option<&mut RotationLimit> {
        self.limits.get_mut(joint)?.as_mut()
    }

    /// 添加求解器，返回求解器索引
    pub fn add_solver(&mut self, solver: impl Into<IkSolver>) -> usize {
        let mut solver = solver.into();
        if self.initiated {
            Self::initiate_solver(&mut solver, &mut self.skeleton, &mut self.diagnostics);
        }
        self.solvers.push(solver);
        self.solvers.len() - 1
    }

    #[inline]
    pub fn solver(&self, idx: usize) -> Option<&IkSolver> {
        self.solvers.get(idx)
    }

    #[inline]
    pub fn solver_mut(&mut self, idx: usize) -> Option<&mut IkSolver> {
        self.solvers.get_mut(idx)
    }

    #[inline]
    pub fn solvers(&self) -> &[IkSolver] {
        &self.solvers
    }

    pub fn on_pre_solve(&mut self, callback: impl FnMut(&mut Skeleton) + Send + 'static) {
        self.pre_solve.push(Box::new(callback));
    }

    pub fn on_post_solve(&mut self, callback: impl FnMut(&mut Skeleton) + Send + 'static) {
        self.post_solve.push(Box::new(callback));
    }

    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[inline]
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.initiated
    }

    // ========================================
    // 初始化
    // ========================================

    /// 记录默认姿态，初始化所有限制与求解器
    ///
    /// 单个求解器失败只记录诊断并跳过，不影响其他求解器。
    pub fn initiate(&mut self) {
        self.skeleton.update_world_transforms();
        self.skeleton.capture_default_pose();

        for joint in 0..self.limits.len() {
            self.initiate_limit(joint);
        }
        for solver in &mut self.solvers {
            Self::initiate_solver(solver, &mut self.skeleton, &mut self.diagnostics);
        }
        self.accumulator = 0.0;
        self.initiated = true;

        log::info!(
            "[IK] 初始化完成: 关节 {}, 限制 {}, 求解器 {}, 错误 {}",
            self.skeleton.len(),
            self.limits.iter().filter(|l| l.is_some()).count(),
            self.solvers.len(),
            self.diagnostics.error_count()
        );
    }

    fn initiate_limit(&mut self, joint: usize) {
        let Some(Some(limit)) = self.limits.get_mut(joint) else {
            return;
        };
        let Some(default) = self.skeleton.joint(joint).map(|j| j.default_local_rotation) else {
            return;
        };
        limit.initiate(default, &mut self.diagnostics);
    }

    fn initiate_solver(solver: &mut IkSolver, skeleton: &mut Skeleton, diagnostics: &mut Diagnostics) {
        if let Err(e) = solver.initiate(skeleton, diagnostics) {
            let code = match &e {
                IkError::InvalidReferences(_) => DiagnosticCode::MissingBone,
                IkError::ZeroAxis => DiagnosticCode::ZeroAxis,
                _ => DiagnosticCode::DegenerateChain,
            };
            diagnostics.error(code, format!("{} solver skipped: {}", solver.name(), e));
        }
    }

    /// 恢复默认姿态并清空限制状态
    pub fn reset(&mut self) {
        self.skeleton.restore_default_pose();
        for limit in self.limits.iter_mut().flatten() {
            let default = limit.default_local_rotation();
            limit.set_default_local_rotation(default);
        }
        self.accumulator = 0.0;
    }

    // ========================================
    // 每帧更新
    // ========================================

    /// 推进一帧，返回本次是否执行了求解
    pub fn tick(&mut self, delta_time: f32) -> bool {
        if !self.initiated {
            return false;
        }
        match self.update_mode {
            UpdateMode::EveryFrame => {
                self.step();
                true
            }
            UpdateMode::FixedStep(step) => {
                if step <= 0.0 {
                    self.step();
                    return true;
                }
                self.accumulator += delta_time.max(0.0);
                let max_steps = get_config().fixed_step_max_catchup.max(1);
                let mut steps = 0;
                while self.accumulator >= step && steps < max_steps {
                    self.accumulator -= step;
                    self.step();
                    steps += 1;
                }
                // 追不上时丢弃积压
                if steps == max_steps && self.accumulator >= step {
                    self.accumulator %= step;
                }
                steps > 0
            }
        }
    }

    /// 一次完整求解
    fn step(&mut self) {
        for joint in 0..self.skeleton.len() {
            self.skeleton.set_flag(joint, JointFlags::SOLVER_LIMITED, false);
        }

        for callback in &mut self.pre_solve {
            callback(&mut self.skeleton);
        }
        for solver in &mut self.solvers {
            if solver.is_initiated() {
                solver.solve(&mut self.skeleton, &mut self.limits);
            }
        }
        for callback in &mut self.post_solve {
            callback(&mut self.skeleton);
        }

        // 父关节先于子关节（arena 中父索引总是更小）
        for joint in 0..self.limits.len() {
            let handled = self
                .skeleton
                .joint(joint)
                .map_or(true, |j| j.flags.contains(JointFlags::SOLVER_LIMITED));
            if handled {
                continue;
            }
            if let Some(limit) = self.limits[joint].as_mut() {
                limit.apply(&mut self.skeleton, joint);
            }
        }

        if get_config().debug_log {
            log::debug!("[IK] tick: 求解器 {}", self.solvers.len());
        }
    }
}

/// 并行推进多个独立角色
pub fn tick_all(rigs: &mut [IkRig], delta_time: f32) -> usize {
    rigs.par_iter_mut()
        .map(|rig| usize::from(rig.tick(delta_time)))
        .sum()
}
