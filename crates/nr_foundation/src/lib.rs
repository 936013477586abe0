// crates/nr_foundation/src/lib.rs

//! NumRel Foundation Layer
//!
//! 基础层，提供整个项目共享的错误类型、验证工具与数值容差。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型与 `ensure!` 宏
//! - [`validation`]: 单元状态验证报告
//! - [`tolerance`]: 数值容差
//!
//! # 示例
//!
//! ```
//! use nr_foundation::{NrError, NrResult, NumericalTolerance};
//!
//! fn check_det(det: f64, tol: &NumericalTolerance) -> NrResult<f64> {
//!     if det.abs() < tol.singular_det {
//!         return Err(NrError::singular_metric((0, 0, 0), det));
//!     }
//!     Ok(det)
//! }
//!
//! assert!(check_det(1.0, &NumericalTolerance::default()).is_ok());
//! assert!(check_det(0.0, &NumericalTolerance::default()).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod tolerance;
pub mod validation;

// 重导出常用类型
pub use error::{NrError, NrResult};
pub use tolerance::NumericalTolerance;
pub use validation::{ValidationError, ValidationReport, ValidationWarning};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{NrError, NrResult};
    pub use crate::tolerance::NumericalTolerance;
    pub use crate::validation::{ValidationError, ValidationReport, ValidationWarning};
    pub use crate::ensure;
}
