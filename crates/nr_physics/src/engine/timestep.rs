// crates/nr_physics/src/engine/timestep.rs

//! 时间步长控制模块
//!
//! 提供基于 CFL 条件的自适应时间步长：
//!
//! $$ \Delta t = C \cdot \frac{\min(\Delta x, \Delta y, \Delta z)}{v_{max}} $$
//!
//! 其中 $v_{max}$ 取特征速度与各单元局部光锥速度
//! $\alpha \sqrt{\max_i \gamma^{ii}} + |\beta|$ 的最大值，
//! 因此 $\Delta t$ 永远不超过 $C \cdot \Delta x_{min} / c$。
//!
//! 每步重新计算，并受调用方给定的上限约束。

use nr_config::TimeConfig;
use nr_foundation::{NrError, NrResult};

use crate::engine::parallel::ParallelVolume;
use crate::grid::{Cell, Grid};

/// CFL 时间步计算器
#[derive(Debug, Clone)]
pub struct CflCalculator {
    /// CFL 数
    cfl: f64,
    /// 特征传播速度（下限）
    characteristic_speed: f64,
    /// 最小时间步长
    dt_min: f64,
}

impl Default for CflCalculator {
    fn default() -> Self {
        Self {
            cfl: 0.5,
            characteristic_speed: 1.0,
            dt_min: 1e-12,
        }
    }
}

impl CflCalculator {
    /// 创建计算器
    pub fn new(cfl: f64, characteristic_speed: f64, dt_min: f64) -> Self {
        Self {
            cfl,
            characteristic_speed,
            dt_min,
        }
    }

    /// 从配置创建
    pub fn from_config(config: &TimeConfig) -> Self {
        Self::new(config.cfl, config.characteristic_speed, config.dt_min)
    }

    /// CFL 数
    pub fn cfl(&self) -> f64 {
        self.cfl
    }

    /// 特征速度
    pub fn characteristic_speed(&self) -> f64 {
        self.characteristic_speed
    }

    /// 理论上限 `C · dx_min / c`
    pub fn upper_bound(&self, grid: &Grid) -> f64 {
        self.cfl * grid.spacing().min() / self.characteristic_speed
    }

    /// 计算时间步长
    ///
    /// 结果不超过 `dt_cap`；低于 `dt_min` 时返回 [`NrError::TimestepCollapse`]。
    pub fn compute_dt(&self, grid: &Grid, volume: &ParallelVolume, dt_cap: f64) -> NrResult<f64> {
        let max_speed = self.max_signal_speed(grid, volume);
        let dt = (self.cfl * grid.spacing().min() / max_speed).min(dt_cap);

        if dt.is_nan() || dt < self.dt_min {
            return Err(NrError::TimestepCollapse {
                dt,
                dt_min: self.dt_min,
            });
        }
        Ok(dt)
    }

    /// 最大信号速度，不低于特征速度
    ///
    /// 非有限的局部速度被忽略，留给演化后的有限性检查处理。
    pub fn max_signal_speed(&self, grid: &Grid, volume: &ParallelVolume) -> f64 {
        let cells = grid.cells();
        volume.max_all(self.characteristic_speed, |idx| local_speed(&cells[idx]))
    }
}

/// 单元局部光锥速度 `α √(max γ^ii) + |β|`
#[inline]
fn local_speed(cell: &Cell) -> f64 {
    let g = &cell.geom.gamma_inv;
    let max_diag = g[0][0].max(g[1][1]).max(g[2][2]).max(0.0);
    let beta = cell.gauge.beta;
    let beta_norm = (beta[0] * beta[0] + beta[1] * beta[1] + beta[2] * beta[2]).sqrt();
    cell.gauge.alpha.abs() * max_diag.sqrt() + beta_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parallel::ParallelStrategy;
    use crate::grid::{Extent, Spacing};

    fn grid() -> Grid {
        Grid::centered(Extent::new(5, 5, 5).unwrap(), Spacing::new(0.2, 0.1, 0.3).unwrap())
    }

    fn seq(grid: &Grid) -> ParallelVolume {
        ParallelVolume::new(grid.extent(), ParallelStrategy::Sequential)
    }

    #[test]
    fn test_flat_dt() {
        let calc = CflCalculator::default();
        let g = grid();
        let dt = calc.compute_dt(&g, &seq(&g), 1.0).unwrap();
        assert!((dt - 0.05).abs() < 1e-15);
        assert!(dt <= calc.upper_bound(&g));
    }

    #[test]
    fn test_cap_applies() {
        let calc = CflCalculator::default();
        let g = grid();
        assert_eq!(calc.compute_dt(&g, &seq(&g), 0.01).unwrap(), 0.01);
    }

    #[test]
    fn test_shift_reduces_dt() {
        let mut g = grid();
        g.cell_mut(2, 2, 2).gauge.beta = [3.0, 0.0, 0.0];
        let calc = CflCalculator::default();
        let dt = calc.compute_dt(&g, &seq(&g), 1.0).unwrap();
        assert!((dt - 0.5 * 0.1 / 4.0).abs() < 1e-15);
        assert!(dt <= calc.upper_bound(&g));
    }

    #[test]
    fn test_slow_cells_never_exceed_bound() {
        let mut g = grid();
        for cell in g.cells_mut() {
            cell.gauge.alpha = 0.1;
        }
        let calc = CflCalculator::default();
        assert!(calc.compute_dt(&g, &seq(&g), 1.0).unwrap() <= calc.upper_bound(&g));
    }

    #[test]
    fn test_collapse() {
        let calc = CflCalculator::new(0.5, 1.0, 1e-3);
        let g = grid();
        let err = calc.compute_dt(&g, &seq(&g), 1e-6).unwrap_err();
        assert!(matches!(err, NrError::TimestepCollapse { .. }));
    }

    #[test]
    fn test_strategies_agree() {
        let mut g = grid();
        for (idx, cell) in g.cells_mut().iter_mut().enumerate() {
            cell.gauge.beta = [0.01 * idx as f64, 0.0, -0.5];
        }
        let par = ParallelVolume::new(g.extent(), ParallelStrategy::Parallel);
        let calc = CflCalculator::default();
        assert_eq!(calc.max_signal_speed(&g, &seq(&g)), calc.max_signal_speed(&g, &par));
        assert!(calc.max_signal_speed(&g, &par) > 1.0);
    }
}
