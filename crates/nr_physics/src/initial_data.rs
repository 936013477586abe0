// crates/nr_physics/src/initial_data.rs

//! 初始数据
//!
//! 在首次演化前填充所有单元的规范变量、γ、γ⁻¹、γ̃ 与 K。
//! 要求 γ 对称正定，γ⁻¹ 为其精确逆。

use glam::DVec3;
use nr_config::{InitialDataConfig, InitialDataKind};
use nr_foundation::{NrError, NrResult};
use tracing::debug;

use crate::grid::Grid;
use crate::numerics::tensor::{self, IDENTITY, ZERO};

/// 初始数据
pub trait InitialData: Send + Sync {
    /// 名称
    fn name(&self) -> &'static str;

    /// 填充网格
    fn populate(&self, grid: &mut Grid) -> NrResult<()>;
}

/// 从配置创建初始数据
pub fn from_config(config: &InitialDataConfig) -> Box<dyn InitialData> {
    match config.kind {
        InitialDataKind::Flat => Box::new(FlatSpace),
        InitialDataKind::Schwarzschild => Box::new(SchwarzschildPuncture {
            mass: config.mass,
            center: DVec3::from_array(config.center),
        }),
    }
}

// ============================================================
// 平直时空
// ============================================================

/// 平直时空：α=1, β=0, γ=I, K=0
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatSpace;

impl InitialData for FlatSpace {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn populate(&self, grid: &mut Grid) -> NrResult<()> {
        for cell in grid.cells_mut() {
            cell.gauge.alpha = 1.0;
            cell.gauge.beta = [0.0; 3];
            cell.geom.gamma = IDENTITY;
            cell.geom.gamma_inv = IDENTITY;
            cell.geom.tilde_gamma = IDENTITY;
            cell.curv.k = ZERO;
        }
        Ok(())
    }
}

// ============================================================
// Schwarzschild 穿刺
// ============================================================

/// 各向同性坐标下的 Schwarzschild 时间对称切片
///
/// ```text
/// ψ = 1 + M / 2r
/// γ_ij = ψ⁴ δ_ij
/// α = ψ⁻²
/// K_ij = 0
/// ```
///
/// lapse 取预坍缩形式 ψ⁻²，处处为正，穿刺点附近趋于零。
/// 穿刺点附近 r 被截断到半个最小网格间距。
#[derive(Debug, Clone, Copy)]
pub struct SchwarzschildPuncture {
    /// 质量 M
    pub mass: f64,
    /// 穿刺中心
    pub center: DVec3,
}

impl SchwarzschildPuncture {
    /// 原点处的穿刺
    pub fn at_origin(mass: f64) -> Self {
        Self {
            mass,
            center: DVec3::ZERO,
        }
    }

    /// 共形因子 ψ(r)
    #[inline]
    pub fn psi(&self, r: f64) -> f64 {
        1.0 + self.mass / (2.0 * r)
    }

    /// 预坍缩 lapse α(r)
    #[inline]
    pub fn lapse(&self, r: f64) -> f64 {
        self.psi(r).powi(-2)
    }
}

impl InitialData for SchwarzschildPuncture {
    fn name(&self) -> &'static str {
        "schwarzschild"
    }

    fn populate(&self, grid: &mut Grid) -> NrResult<()> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(NrError::invalid_input(format!("黑洞质量必须为正: M = {}", self.mass)));
        }
        let r_min = 0.5 * grid.spacing().min();
        debug!(mass = self.mass, r_min, "填充 Schwarzschild 穿刺初始数据");

        for idx in 0..grid.n_cells() {
            let r = (grid.position(idx) - self.center).length().max(r_min);
            let psi4 = self.psi(r).powi(4);
            let cell = &mut grid.cells_mut()[idx];
            cell.gauge.alpha = self.lapse(r);
            cell.gauge.beta = [0.0; 3];
            cell.geom.gamma = tensor::scale(&IDENTITY, psi4);
            cell.geom.gamma_inv = tensor::scale(&IDENTITY, 1.0 / psi4);
            // χ = ψ⁻⁴，γ̃ = χ γ = δ
            cell.geom.tilde_gamma = IDENTITY;
            cell.curv.k = ZERO;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Extent, Spacing};

    #[test]
    fn test_flat_space() {
        let mut grid = Grid::centered(Extent::new(4, 4, 4).unwrap(), Spacing::uniform(1.0).unwrap());
        grid.cells_mut()[5].gauge.alpha = 3.0;
        FlatSpace.populate(&mut grid).unwrap();
        assert!(grid.cells().iter().all(|c| c.gauge.alpha == 1.0 && c.geom.gamma == IDENTITY));
    }

    #[test]
    fn test_puncture_profile() {
        let bh = SchwarzschildPuncture::at_origin(1.0);
        // r = M/2 为视界（各向同性坐标）
        assert_eq!(bh.psi(0.5), 2.0);
        assert_eq!(bh.lapse(0.5), 0.25);
        assert!(bh.lapse(1e6) > 0.999);
        // 视界以内仍为正
        for r in [0.25, 0.1, 1e-3] {
            assert!(bh.lapse(r) > 0.0);
            assert!(bh.lapse(r) < bh.lapse(0.5));
        }
    }

    #[test]
    fn test_puncture_populates_inverse() {
        let mut grid = Grid::centered(Extent::new(6, 6, 6).unwrap(), Spacing::uniform(0.5).unwrap());
        SchwarzschildPuncture::at_origin(0.5).populate(&mut grid).unwrap();
        for cell in grid.cells() {
            let prod = tensor::matmul(&cell.geom.gamma, &cell.geom.gamma_inv);
            for i in 0..3 {
                assert!((prod[i][i] - 1.0).abs() < 1e-14);
            }
            assert!(cell.gauge.alpha.is_finite());
            assert!((cell.chi() * cell.geom.gamma[0][0] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_puncture_inside_grid_passes_validation() {
        // 默认配置：24³、h = 0.25、M = 1，穿刺点附近的单元在视界以内
        let mut grid = Grid::centered(Extent::new(24, 24, 24).unwrap(), Spacing::uniform(0.25).unwrap());
        SchwarzschildPuncture::at_origin(1.0).populate(&mut grid).unwrap();
        let report = grid.validate(&nr_foundation::NumericalTolerance::default());
        assert!(report.is_valid(), "{}", report);
        let min_alpha = grid.cells().iter().map(|c| c.gauge.alpha).fold(f64::MAX, f64::min);
        assert!(min_alpha > 0.0 && min_alpha < 0.2);
    }

    #[test]
    fn test_invalid_mass() {
        let mut grid = Grid::centered(Extent::new(3, 3, 3).unwrap(), Spacing::uniform(1.0).unwrap());
        assert!(SchwarzschildPuncture::at_origin(-1.0).populate(&mut grid).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = InitialDataConfig {
            kind: InitialDataKind::Schwarzschild,
            mass: 2.0,
            center: [0.0; 3],
        };
        assert_eq!(from_config(&config).name(), "schwarzschild");
        assert_eq!(from_config(&InitialDataConfig::default()).name(), "flat");
    }
}
