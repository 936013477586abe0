// crates/nr_physics/src/gauge.rs

//! 规范条件：lapse 与 shift 的时间导数
//!
//! | 条件 | 方程 |
//! |------|------|
//! | 1+log 切片 | `∂t α = −2 α K + β^i ∂_i α` |
//! | 调和切片 | `∂t α = −α² K + β^i ∂_i α` |
//! | 测地切片 | `∂t α = 0` |
//! | 冻结 shift | `∂t β^i = 0` |
//! | 阻尼平流 shift | `∂t β^i = β^j ∂_j β^i − η β^i` |

use nr_config::{GaugeConfig, ShiftKind, SlicingKind};

use crate::grid::{Cell, Grid};

/// 规范条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeConditions {
    /// lapse 切片条件
    pub slicing: SlicingKind,
    /// shift 条件
    pub shift: ShiftKind,
    /// shift 阻尼系数 η
    pub shift_damping: f64,
    /// lapse 是否含平流项
    pub advect_lapse: bool,
}

impl Default for GaugeConditions {
    fn default() -> Self {
        Self::from_config(&GaugeConfig::default())
    }
}

impl GaugeConditions {
    /// 从配置创建
    pub fn from_config(config: &GaugeConfig) -> Self {
        Self {
            slicing: config.slicing,
            shift: config.shift,
            shift_damping: config.shift_damping,
            advect_lapse: config.advect_lapse,
        }
    }

    /// 完全冻结的规范（∂t α = 0, ∂t β = 0）
    pub fn frozen() -> Self {
        Self {
            slicing: SlicingKind::Geodesic,
            shift: ShiftKind::Frozen,
            shift_damping: 0.0,
            advect_lapse: false,
        }
    }

    /// lapse 变化率
    ///
    /// `dalpha[i] = ∂_i α`
    pub fn lapse_rate(&self, alpha: f64, k_trace: f64, beta: &[f64; 3], dalpha: &[f64; 3]) -> f64 {
        let source = match self.slicing {
            SlicingKind::OnePlusLog => -2.0 * alpha * k_trace,
            SlicingKind::Harmonic => -alpha * alpha * k_trace,
            SlicingKind::Geodesic => return 0.0,
        };
        if self.advect_lapse {
            source + beta[0] * dalpha[0] + beta[1] * dalpha[1] + beta[2] * dalpha[2]
        } else {
            source
        }
    }

    /// shift 变化率
    ///
    /// `dbeta[j][i] = ∂_j β^i`
    pub fn shift_rate(&self, beta: &[f64; 3], dbeta: &[[f64; 3]; 3]) -> [f64; 3] {
        match self.shift {
            ShiftKind::Frozen => [0.0; 3],
            ShiftKind::Damped => {
                let mut out = [0.0; 3];
                for (i, o) in out.iter_mut().enumerate() {
                    let mut adv = 0.0;
                    for j in 0..3 {
                        adv += beta[j] * dbeta[j][i];
                    }
                    *o = adv - self.shift_damping * beta[i];
                }
                out
            }
        }
    }

    /// 单元处的规范变化率 `(∂t α, ∂t β)`
    pub fn rates(&self, grid: &Grid, idx: usize, k_trace: f64) -> (f64, [f64; 3]) {
        let cell = &grid.cells()[idx];
        let stencil = grid.stencil();

        let d_alpha = match self.slicing {
            SlicingKind::Geodesic => 0.0,
            _ => {
                let dalpha = if self.advect_lapse {
                    stencil.gradient(idx, |c: &Cell| c.gauge.alpha)
                } else {
                    [0.0; 3]
                };
                self.lapse_rate(cell.gauge.alpha, k_trace, &cell.gauge.beta, &dalpha)
            }
        };

        let d_beta = match self.shift {
            ShiftKind::Frozen => [0.0; 3],
            ShiftKind::Damped => {
                let dbeta = stencil.gradient_vec3(idx, |c: &Cell| c.gauge.beta);
                self.shift_rate(&cell.gauge.beta, &dbeta)
            }
        };

        (d_alpha, d_beta)
    }
}
