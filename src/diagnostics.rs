//! 诊断收集器
//!
//! 配置问题分两级：
//! - Error: 求解器无法运行（缺骨骼、重复骨骼、零长度、层级断裂）
//! - Warning: 可以运行但效果会退化（肢体完全伸直、根节点高度、朝向）
//!
//! 每个会话持有自己的收集器，调用方决定只看第一条还是全部。

use std::collections::HashSet;
use std::fmt;

use crate::config::get_config;

/// 严重程度
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// 诊断码
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    ZeroAxis,
    InvalidReachCone,
    TooFewLimitPoints,
    MissingBone,
    DuplicateBone,
    ZeroLengthBone,
    BrokenHierarchy,
    SpineOrder,
    StretchedLimb,
    RootHeight,
    FacingAxis,
    DegenerateChain,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZeroAxis => "zero-axis",
            Self::InvalidReachCone => "invalid-reach-cone",
            Self::TooFewLimitPoints => "too-few-limit-points",
            Self::MissingBone => "missing-bone",
            Self::DuplicateBone => "duplicate-bone",
            Self::ZeroLengthBone => "zero-length-bone",
            Self::BrokenHierarchy => "broken-hierarchy",
            Self::SpineOrder => "spine-order",
            Self::StretchedLimb => "stretched-limb",
            Self::RootHeight => "root-height",
            Self::FacingAxis => "facing-axis",
            Self::DegenerateChain => "degenerate-chain",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条诊断
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub context: String,
}

/// 诊断输出端
pub trait DiagnosticSink {
    fn record(&mut self, severity: Severity, code: DiagnosticCode, context: String);

    fn warning(&mut self, code: DiagnosticCode, context: String) {
        self.record(Severity::Warning, code, context);
    }

    fn error(&mut self, code: DiagnosticCode, context: String) {
        self.record(Severity::Error, code, context);
    }
}

/// 会话级诊断收集器
///
/// 所有记录都会保存；`first_only` 只影响日志转发和 `surfaced()`。
#[derive(Clone, Debug)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    logged: HashSet<DiagnosticCode>,
    pub first_only: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::with_policy(get_config().diagnostics_first_only)
    }

    pub fn with_policy(first_only: bool) -> Self {
        Self {
            entries: Vec::new(),
            logged: HashSet::new(),
            first_only,
        }
    }

    /// 全部记录
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// 按策略过滤后的记录（first_only 时每个诊断码只保留第一条）
    pub fn surfaced(&self) -> Vec<&Diagnostic> {
        if !self.first_only {
            return self.entries.iter().collect();
        }
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|d| seen.insert(d.code))
            .collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.entries.iter().any(|d| d.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.logged.clear();
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink for Diagnostics {
    fn record(&mut self, severity: Severity, code: DiagnosticCode, context: String) {
        let first = self.logged.insert(code);
        if first || !self.first_only {
            match severity {
                Severity::Error => log::error!("[IK] {}: {}", code, context),
                Severity::Warning => log::warn!("[IK] {}: {}", code, context),
            }
        }
        self.entries.push(Diagnostic { severity, code, context });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_only_surfaces_one_per_code() {
        let mut diag = Diagnostics::with_policy(true);
        diag.warning(DiagnosticCode::InvalidReachCone, "cone 0".into());
        diag.warning(DiagnosticCode::InvalidReachCone, "cone 1".into());
        diag.error(DiagnosticCode::MissingBone, "pelvis".into());

        assert_eq!(diag.entries().len(), 3);
        let surfaced = diag.surfaced();
        assert_eq!(surfaced.len(), 2);
        assert_eq!(surfaced[0].context, "cone 0");
        assert!(diag.has_errors());
        assert_eq!(diag.warnings().count(), 2);
    }

    #[test]
    fn test_all_policy_surfaces_everything() {
        let mut diag = Diagnostics::with_policy(false);
        diag.warning(DiagnosticCode::StretchedLimb, "left arm".into());
        diag.warning(DiagnosticCode::StretchedLimb, "right arm".into());
        assert_eq!(diag.surfaced().len(), 2);
        assert!(!diag.has_errors());

        diag.clear();
        assert!(diag.is_empty());
    }
}
