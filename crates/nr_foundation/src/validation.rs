// crates/nr_foundation/src/validation.rs

//! 网格状态验证
//!
//! 初始数据填充后、演化开始前对每个单元做一次检查，
//! 结果收集到 [`ValidationReport`]。单元以 `(i, j, k)` 坐标标识。
//!
//! # 示例
//!
//! ```
//! use nr_foundation::validation::{self, ValidationReport};
//!
//! let mut report = ValidationReport::new();
//! validation::check_lapse(&mut report, (1, 2, 3), -0.4, 1e-3);
//! assert!(report.has_errors());
//! assert!(report.to_string().contains("(1, 2, 3)"));
//! ```

use std::fmt;

/// 单元坐标 `(i, j, k)`
pub type CellCoords = (usize, usize, usize);

/// 验证报告
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// 错误列表
    pub errors: Vec<ValidationError>,
    /// 警告列表
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// 报告显示时每类最多列出的条目数
    pub const DISPLAY_LIMIT: usize = 20;

    /// 创建空的验证报告
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加错误
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// 警告数量
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// 是否通过（无错误）
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "验证报告: {} 个错误, {} 个警告",
            self.error_count(),
            self.warning_count()
        )?;
        for err in self.errors.iter().take(Self::DISPLAY_LIMIT) {
            writeln!(f, "  [错误] {}", err)?;
        }
        if self.error_count() > Self::DISPLAY_LIMIT {
            writeln!(f, "  ... 另有 {} 个错误", self.error_count() - Self::DISPLAY_LIMIT)?;
        }
        for warn in self.warnings.iter().take(Self::DISPLAY_LIMIT) {
            writeln!(f, "  [警告] {}", warn)?;
        }
        if self.warning_count() > Self::DISPLAY_LIMIT {
            writeln!(f, "  ... 另有 {} 个警告", self.warning_count() - Self::DISPLAY_LIMIT)?;
        }
        Ok(())
    }
}

/// 单元状态错误
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// 非有限值
    NonFinite {
        /// 字段名称
        field: &'static str,
        /// 单元坐标
        at: CellCoords,
    },
    /// lapse 非正
    NonPositiveLapse {
        /// 单元坐标
        at: CellCoords,
        /// α
        alpha: f64,
    },
    /// 3-度规行列式低于奇异阈值
    DegenerateMetric {
        /// 单元坐标
        at: CellCoords,
        /// det γ
        det: f64,
        /// 阈值
        threshold: f64,
    },
    /// 对称张量不对称
    Asymmetric {
        /// 字段名称
        field: &'static str,
        /// 单元坐标
        at: CellCoords,
        /// 最大非对称分量 |T_ab - T_ba|
        defect: f64,
    },
}

impl ValidationError {
    /// 出错的单元
    pub fn cell(&self) -> CellCoords {
        match self {
            Self::NonFinite { at, .. }
            | Self::NonPositiveLapse { at, .. }
            | Self::DegenerateMetric { at, .. }
            | Self::Asymmetric { at, .. } => *at,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { field, at } => write!(f, "单元{:?}: {} 含非有限值", at, field),
            Self::NonPositiveLapse { at, alpha } => {
                write!(f, "单元{:?}: lapse α={} 必须为正", at, alpha)
            }
            Self::DegenerateMetric { at, det, threshold } => {
                write!(f, "单元{:?}: det(γ)={:e} 低于奇异阈值 {:e}", at, det, threshold)
            }
            Self::Asymmetric { field, at, defect } => {
                write!(f, "单元{:?}: {} 不对称, 偏差={:e}", at, field, defect)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// 单元状态警告
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// lapse 接近坍缩
    CollapsedLapse {
        /// 单元坐标
        at: CellCoords,
        /// α
        alpha: f64,
        /// 警告阈值
        threshold: f64,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CollapsedLapse { at, alpha, threshold } => {
                write!(f, "单元{:?}: lapse α={:e} 低于 {:e}，接近坍缩", at, alpha, threshold)
            }
        }
    }
}

// ============================================================================
// 单元检查
// ============================================================================

/// 所有值有限，否则记一条 [`ValidationError::NonFinite`]
pub fn check_finite<'a>(
    report: &mut ValidationReport,
    field: &'static str,
    at: CellCoords,
    values: impl IntoIterator<Item = &'a f64>,
) -> bool {
    if values.into_iter().all(|v| v.is_finite()) {
        true
    } else {
        report.add_error(ValidationError::NonFinite { field, at });
        false
    }
}

/// α > 0 为错误条件，α < `warn_below` 为警告条件
pub fn check_lapse(report: &mut ValidationReport, at: CellCoords, alpha: f64, warn_below: f64) -> bool {
    if alpha.is_nan() || alpha <= 0.0 {
        report.add_error(ValidationError::NonPositiveLapse { at, alpha });
        return false;
    }
    if alpha < warn_below {
        report.add_warning(ValidationWarning::CollapsedLapse {
            at,
            alpha,
            threshold: warn_below,
        });
    }
    true
}

/// det γ 不低于奇异阈值
pub fn check_metric_det(report: &mut ValidationReport, at: CellCoords, det: f64, threshold: f64) -> bool {
    if det.is_nan() || det < threshold {
        report.add_error(ValidationError::DegenerateMetric { at, det, threshold });
        false
    } else {
        true
    }
}

/// 3x3 张量对称（相对于最大分量与 1 中较大者的容差）
pub fn check_symmetric(
    report: &mut ValidationReport,
    field: &'static str,
    at: CellCoords,
    m: &[[f64; 3]; 3],
    rel_tol: f64,
) -> bool {
    let mut defect = 0.0f64;
    let mut scale = 0.0f64;
    for a in 0..3 {
        for b in 0..3 {
            scale = scale.max(m[a][b].abs());
            if a < b {
                defect = defect.max((m[a][b] - m[b][a]).abs());
            }
        }
    }
    if defect > rel_tol * scale.max(1.0) {
        report.add_error(ValidationError::Asymmetric { field, at, defect });
        false
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_check_finite() {
        let mut report = ValidationReport::new();
        assert!(check_finite(&mut report, "beta", (0, 0, 0), &[0.0, 1.0, -2.0]));
        assert!(!check_finite(&mut report, "beta", (1, 0, 2), &[0.0, f64::NAN, 1.0]));
        assert_eq!(
            report.errors,
            vec![ValidationError::NonFinite {
                field: "beta",
                at: (1, 0, 2)
            }]
        );
    }

    #[test]
    fn test_check_lapse() {
        let mut report = ValidationReport::new();
        assert!(check_lapse(&mut report, (1, 1, 1), 0.5, 1e-3));
        assert!(check_lapse(&mut report, (1, 1, 2), 1e-4, 1e-3));
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 1);

        assert!(!check_lapse(&mut report, (2, 1, 1), 0.0, 1e-3));
        assert!(!check_lapse(&mut report, (2, 1, 2), f64::NAN, 1e-3));
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.errors[0].cell(), (2, 1, 1));
    }

    #[test]
    fn test_check_metric_det() {
        let mut report = ValidationReport::new();
        assert!(check_metric_det(&mut report, (0, 0, 0), 1.0, 1e-14));
        assert!(!check_metric_det(&mut report, (0, 0, 1), 1e-16, 1e-14));
        assert!(matches!(
            report.errors[0],
            ValidationError::DegenerateMetric { at: (0, 0, 1), .. }
        ));
    }

    #[test]
    fn test_check_symmetric() {
        let mut report = ValidationReport::new();
        let sym = [[1.0, 0.2, 0.0], [0.2, 1.0, 0.1], [0.0, 0.1, 1.0]];
        assert!(check_symmetric(&mut report, "gamma", (3, 0, 0), &sym, 1e-12));
        assert!(report.is_valid());

        let asym = [[1.0, 0.2, 0.0], [0.3, 1.0, 0.1], [0.0, 0.1, 1.0]];
        assert!(!check_symmetric(&mut report, "gamma", (3, 0, 0), &asym, 1e-12));
        assert!(report.errors[0].to_string().contains("gamma"));
    }

    #[test]
    fn test_display_truncates() {
        let mut report = ValidationReport::new();
        for i in 0..(ValidationReport::DISPLAY_LIMIT + 5) {
            check_lapse(&mut report, (i, 0, 0), -1.0, 1e-3);
        }
        let s = report.to_string();
        assert!(s.contains("25 个错误"));
        assert!(s.contains("另有 5 个错误"));
        assert_eq!(s.matches("[错误]").count(), ValidationReport::DISPLAY_LIMIT);
    }
}
