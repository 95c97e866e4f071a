//! 求解器配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 求解器配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct SolverConfig {
    // ========== 数值 ==========
    /// 零长度阈值（方向向量长度低于此值视为零），默认 1e-6
    pub epsilon: f32,

    // ========== 多边形限制 ==========
    /// 多边形平滑最大迭代次数，默认 3
    /// 每次迭代点数翻倍，超过 3 次收益很小
    pub max_smooth_iterations: u32,

    // ========== CCD ==========
    /// CCD 默认迭代次数，默认 4
    pub ccd_default_iterations: u32,
    /// CCD 默认容差（距离），默认 0.0（不提前退出）
    pub ccd_default_tolerance: f32,

    // ========== 诊断 ==========
    /// 同一诊断码只输出第一条日志，默认 true
    pub diagnostics_first_only: bool,

    // ========== 固定步长 ==========
    /// 固定步长模式下每次 tick 最多追赶的步数，默认 5
    pub fixed_step_max_catchup: u32,

    // ========== 调试 ==========
    /// 是否输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            // ====== 数值 ======
            epsilon: 1.0e-6,

            // ====== 多边形限制 ======
            max_smooth_iterations: 3,

            // ====== CCD ======
            // 迭代越多越精确，肢体链一般 4 次足够
            ccd_default_iterations: 4,
            ccd_default_tolerance: 0.0,

            // ====== 诊断 ======
            diagnostics_first_only: true,

            // ====== 固定步长 ======
            // 与物理子步上限保持一致
            fixed_step_max_catchup: 5,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

/// 全局配置实例
static SOLVER_CONFIG: Lazy<RwLock<SolverConfig>> = Lazy::new(|| {
    RwLock::new(SolverConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> SolverConfig {
    SOLVER_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: SolverConfig) {
    *SOLVER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *SOLVER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = SolverConfig::default();
}
