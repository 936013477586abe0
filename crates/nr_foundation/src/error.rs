// crates/nr_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `NrError` 枚举和 `NrResult` 类型别名。
//! 配置文件错误在 `nr_config::ConfigError` 中定义，这里只有输入错误与数值退化。
//!
//! # 示例
//!
//! ```
//! use nr_foundation::error::{NrError, NrResult};
//!
//! fn lapse(alpha: f64) -> NrResult<f64> {
//!     NrError::check_range("alpha", alpha, f64::MIN_POSITIVE, f64::MAX)?;
//!     Ok(alpha)
//! }
//! assert!(lapse(0.5).is_ok());
//! assert!(lapse(-0.5).is_err());
//! ```

use thiserror::Error;

/// 统一结果类型
pub type NrResult<T> = Result<T, NrError>;

/// NumRel 错误类型
#[derive(Error, Debug)]
pub enum NrError {
    /// IO 错误（切片导出等）
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    // ========================================================================
    // 输入错误
    // ========================================================================

    /// 无效输入（网格尺寸不一致、非物理参数）
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数值超出允许区间
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    // ========================================================================
    // 数值退化
    // ========================================================================

    /// 3-度规接近奇异，无法求逆
    #[error("度规奇异: 单元 ({i}, {j}, {k}) det(γ)={det:e}")]
    SingularMetric {
        /// x 方向索引
        i: usize,
        /// y 方向索引
        j: usize,
        /// z 方向索引
        k: usize,
        /// 行列式
        det: f64,
    },

    /// 非有限值（NaN/Inf）
    #[error("非有限值: 字段 {field} 在单元 ({i}, {j}, {k})")]
    NonFinite {
        /// 字段名
        field: &'static str,
        /// x 方向索引
        i: usize,
        /// y 方向索引
        j: usize,
        /// z 方向索引
        k: usize,
    },

    /// 时间步长坍缩
    #[error("时间步长坍缩: dt={dt:e} < dt_min={dt_min:e}")]
    TimestepCollapse {
        /// 计算得到的时间步长
        dt: f64,
        /// 允许的最小时间步长
        dt_min: f64,
    },
}

impl NrError {
    /// IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 度规奇异
    pub fn singular_metric(ijk: (usize, usize, usize), det: f64) -> Self {
        Self::SingularMetric {
            i: ijk.0,
            j: ijk.1,
            k: ijk.2,
            det,
        }
    }

    /// 非有限值
    pub fn non_finite(field: &'static str, ijk: (usize, usize, usize)) -> Self {
        Self::NonFinite {
            field,
            i: ijk.0,
            j: ijk.1,
            k: ijk.2,
        }
    }

    /// 是否为数值退化类错误（度规奇异、非有限值、步长坍缩）
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::SingularMetric { .. } | Self::NonFinite { .. } | Self::TimestepCollapse { .. }
        )
    }

    /// 检查值是否在闭区间 `[min, max]` 内，NaN 总是越界
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> NrResult<()> {
        if value < min || value > max || value.is_nan() {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }
}

/// 条件不满足时提前返回错误
///
/// ```
/// use nr_foundation::{ensure, NrError, NrResult};
///
/// fn cells(n: usize) -> NrResult<usize> {
///     ensure!(n >= 3, NrError::invalid_input("至少需要 3 个单元"));
///     Ok(n)
/// }
/// assert!(cells(2).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

impl From<std::io::Error> for NrError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
