// crates/nr_physics/src/grid.rs

//! 网格状态存储
//!
//! 三维笛卡尔网格，单元以扁平 `Vec<Cell>` 存储，
//! 索引约定 `idx = (i * ny + j) * nz + k`（i 最慢、k 最快）。
//!
//! 网格尺寸与间距在分配后不可变，只提供读访问器。
//! Hamiltonian 诊断场 [`ScalarField`] 由网格持有，随约束计算更新。

use glam::DVec3;
use nr_config::GridConfig;
use nr_foundation::validation::{self, ValidationReport};
use nr_foundation::{ensure, NrError, NrResult, NumericalTolerance};
use serde::{Deserialize, Serialize};

use crate::numerics::fd::{Axis, Stencil};
use crate::numerics::tensor::{self, Christoffel, Mat3, IDENTITY, ZERO, ZERO_CHRISTOFFEL};

// ============================================================
// 尺寸与间距
// ============================================================

/// 网格尺寸 NX × NY × NZ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    nx: usize,
    ny: usize,
    nz: usize,
}

impl Extent {
    /// 每个方向允许的最小单元数（保证存在内部单元）
    pub const MIN_CELLS: usize = 3;

    /// 创建网格尺寸
    pub fn new(nx: usize, ny: usize, nz: usize) -> NrResult<Self> {
        for (name, n) in [("nx", nx), ("ny", ny), ("nz", nz)] {
            ensure!(
                n >= Self::MIN_CELLS,
                NrError::invalid_input(format!("{} = {} 小于最小单元数 {}", name, n, Self::MIN_CELLS))
            );
        }
        Ok(Self { nx, ny, nz })
    }

    /// x 方向单元数
    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// y 方向单元数
    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// z 方向单元数
    #[inline]
    pub fn nz(&self) -> usize {
        self.nz
    }

    /// 指定轴向的单元数
    #[inline]
    pub fn len(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.nx,
            Axis::Y => self.ny,
            Axis::Z => self.nz,
        }
    }

    /// 单元总数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// 内部单元总数
    #[inline]
    pub fn n_interior(&self) -> usize {
        (self.nx - 2) * (self.ny - 2) * (self.nz - 2)
    }

    /// 沿轴向移动一格时扁平索引的步长
    #[inline]
    pub fn stride(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.ny * self.nz,
            Axis::Y => self.nz,
            Axis::Z => 1,
        }
    }

    /// (i, j, k) → 扁平索引
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.ny + j) * self.nz + k
    }

    /// 扁平索引 → (i, j, k)
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let k = idx % self.nz;
        let j = (idx / self.nz) % self.ny;
        let i = idx / (self.ny * self.nz);
        (i, j, k)
    }

    /// 扁平索引沿指定轴的坐标
    #[inline]
    pub fn coord(&self, idx: usize, axis: Axis) -> usize {
        (idx / self.stride(axis)) % self.len(axis)
    }

    /// 是否为内部单元（任一轴都不在 0 或 N-1）
    #[inline]
    pub fn is_interior(&self, idx: usize) -> bool {
        let (i, j, k) = self.coords(idx);
        i >= 1 && i + 1 < self.nx && j >= 1 && j + 1 < self.ny && k >= 1 && k + 1 < self.nz
    }

    /// 中心线 (j = ny/2, k = nz/2) 上的 x 方向单元索引
    pub fn central_line(&self) -> impl Iterator<Item = usize> + '_ {
        let (j, k) = (self.ny / 2, self.nz / 2);
        (0..self.nx).map(move |i| self.index(i, j, k))
    }

    /// 网格中心单元
    pub fn center(&self) -> usize {
        self.index(self.nx / 2, self.ny / 2, self.nz / 2)
    }
}

/// 网格间距 DX, DY, DZ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    dx: f64,
    dy: f64,
    dz: f64,
}

impl Spacing {
    /// 创建网格间距（必须为有限正数）
    pub fn new(dx: f64, dy: f64, dz: f64) -> NrResult<Self> {
        for (name, h) in [("dx", dx), ("dy", dy), ("dz", dz)] {
            NrError::check_range(name, h, f64::MIN_POSITIVE, f64::MAX)?;
        }
        Ok(Self { dx, dy, dz })
    }

    /// 各向同性间距
    pub fn uniform(h: f64) -> NrResult<Self> {
        Self::new(h, h, h)
    }

    /// 指定轴向的间距
    #[inline]
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.dx,
            Axis::Y => self.dy,
            Axis::Z => self.dz,
        }
    }

    /// 最小间距
    #[inline]
    pub fn min(&self) -> f64 {
        self.dx.min(self.dy).min(self.dz)
    }

    /// 作为向量
    #[inline]
    pub fn as_dvec3(&self) -> DVec3 {
        DVec3::new(self.dx, self.dy, self.dz)
    }
}

// ============================================================
// 单元
// ============================================================

/// 规范变量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeVars {
    /// lapse α
    pub alpha: f64,
    /// shift β^i
    pub beta: [f64; 3],
}

/// 空间几何
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// 3-度规 γ_ij（对称）
    pub gamma: Mat3,
    /// 逆度规 γ^ij
    pub gamma_inv: Mat3,
    /// 共形度规 γ̃_ij = χ γ_ij
    pub tilde_gamma: Mat3,
}

/// 外曲率
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curvature {
    /// K_ij（对称）
    pub k: Mat3,
}

/// 共形变量的时间导数（诊断量）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConformalRates {
    /// ∂t Ã_ij
    pub dt_atilde: Mat3,
    /// ∂t χ
    pub dt_chi: f64,
}

/// 物质与约束诊断
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatterDiagnostics {
    /// Hamiltonian 约束
    pub hamiltonian: f64,
    /// 动量约束
    pub momentum: [f64; 3],
    /// 能动张量 T_μν（随单元携带，不参与演化）
    pub t: [[f64; 4]; 4],
}

/// 联络
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Γ^a_bc，由几何遍历写入，其余阶段只读
    pub christoffel: Christoffel,
}

/// 网格单元
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// 规范变量
    pub gauge: GaugeVars,
    /// 空间几何
    pub geom: Geometry,
    /// 外曲率
    pub curv: Curvature,
    /// 共形诊断
    pub conformal: ConformalRates,
    /// 物质与约束诊断
    pub matter: MatterDiagnostics,
    /// 联络
    pub conn: Connection,
}

impl Default for Cell {
    /// 平直时空：α=1, β=0, γ=γ⁻¹=γ̃=I, K=0
    fn default() -> Self {
        Self {
            gauge: GaugeVars {
                alpha: 1.0,
                beta: [0.0; 3],
            },
            geom: Geometry {
                gamma: IDENTITY,
                gamma_inv: IDENTITY,
                tilde_gamma: IDENTITY,
            },
            curv: Curvature { k: ZERO },
            conformal: ConformalRates {
                dt_atilde: ZERO,
                dt_chi: 0.0,
            },
            matter: MatterDiagnostics {
                hamiltonian: 0.0,
                momentum: [0.0; 3],
                t: [[0.0; 4]; 4],
            },
            conn: Connection {
                christoffel: ZERO_CHRISTOFFEL,
            },
        }
    }
}

impl Cell {
    /// 平均曲率 K = γ^ij K_ij
    #[inline]
    pub fn k_trace(&self) -> f64 {
        tensor::contract(&self.geom.gamma_inv, &self.curv.k)
    }

    /// 共形因子 χ = det(γ)^(-1/3)
    #[inline]
    pub fn chi(&self) -> f64 {
        tensor::det(&self.geom.gamma).powf(-1.0 / 3.0)
    }
}

// ============================================================
// 标量场
// ============================================================

/// 与网格同尺寸的标量场
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    extent: Extent,
    values: Vec<f64>,
}

impl ScalarField {
    /// 创建零场
    pub fn zeros(extent: Extent) -> Self {
        Self {
            extent,
            values: vec![0.0; extent.n_cells()],
        }
    }

    /// 场尺寸
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// 读取值
    #[inline]
    pub fn get(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    /// 写入值
    #[inline]
    pub fn set(&mut self, idx: usize, value: f64) {
        self.values[idx] = value;
    }

    /// 只读切片
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// 可变切片
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// 最大绝对值
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0f64, |m, v| m.max(v.abs()))
    }

    /// 差分模板视图
    pub fn stencil(&self, spacing: Spacing) -> Stencil<'_, f64> {
        Stencil::new(&self.values, self.extent, spacing)
    }
}

// ============================================================
// 网格
// ============================================================

/// 三维网格
#[derive(Debug, Clone)]
pub struct Grid {
    extent: Extent,
    spacing: Spacing,
    origin: DVec3,
    time: f64,
    cells: Vec<Cell>,
    hamiltonian: ScalarField,
}

impl Grid {
    /// 分配网格，所有单元处于平直时空默认状态
    pub fn allocate(extent: Extent, spacing: Spacing, origin: DVec3) -> Self {
        Self {
            extent,
            spacing,
            origin,
            time: 0.0,
            cells: vec![Cell::default(); extent.n_cells()],
            hamiltonian: ScalarField::zeros(extent),
        }
    }

    /// 以原点为中心分配网格
    pub fn centered(extent: Extent, spacing: Spacing) -> Self {
        let half = DVec3::new(
            (extent.nx() as f64 - 1.0) * 0.5,
            (extent.ny() as f64 - 1.0) * 0.5,
            (extent.nz() as f64 - 1.0) * 0.5,
        );
        Self::allocate(extent, spacing, -half * spacing.as_dvec3())
    }

    /// 从配置分配网格
    pub fn from_config(config: &GridConfig) -> NrResult<Self> {
        let extent = Extent::new(config.nx, config.ny, config.nz)?;
        let [dx, dy, dz] = config.spacing;
        let spacing = Spacing::new(dx, dy, dz)?;
        Ok(Self::allocate(
            extent,
            spacing,
            DVec3::from_array(config.resolved_origin()),
        ))
    }

    /// 网格尺寸
    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// 网格间距
    #[inline]
    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// 单元 (0,0,0) 的物理坐标
    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// 已演化的模拟时间
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    pub(crate) fn advance_time(&mut self, dt: f64) {
        self.time += dt;
    }

    /// 单元总数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// 所有单元
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// 所有单元（可变）
    #[inline]
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// 按 (i, j, k) 读取单元
    #[inline]
    pub fn cell(&self, i: usize, j: usize, k: usize) -> &Cell {
        &self.cells[self.extent.index(i, j, k)]
    }

    /// 按 (i, j, k) 读取单元（可变）
    #[inline]
    pub fn cell_mut(&mut self, i: usize, j: usize, k: usize) -> &mut Cell {
        let idx = self.extent.index(i, j, k);
        &mut self.cells[idx]
    }

    /// 单元中心的物理坐标
    #[inline]
    pub fn position(&self, idx: usize) -> DVec3 {
        let (i, j, k) = self.extent.coords(idx);
        self.origin + DVec3::new(i as f64, j as f64, k as f64) * self.spacing.as_dvec3()
    }

    /// Hamiltonian 诊断场
    #[inline]
    pub fn hamiltonian_field(&self) -> &ScalarField {
        &self.hamiltonian
    }

    /// 同时借出单元与 Hamiltonian 诊断场
    pub(crate) fn split_diagnostics_mut(&mut self) -> (&mut [Cell], &mut ScalarField) {
        (&mut self.cells, &mut self.hamiltonian)
    }

    /// 单元数组上的差分模板视图
    #[inline]
    pub fn stencil(&self) -> Stencil<'_, Cell> {
        Stencil::new(&self.cells, self.extent, self.spacing)
    }

    /// 检查网格状态
    ///
    /// 有限性、γ 与 K 的对称性、α > 0、det γ 高于奇异阈值。
    pub fn validate(&self, tol: &NumericalTolerance) -> ValidationReport {
        let mut report = ValidationReport::new();
        for (idx, cell) in self.cells.iter().enumerate() {
            let at = self.extent.coords(idx);
            let finite = validation::check_finite(&mut report, "alpha", at, [&cell.gauge.alpha])
                & validation::check_finite(&mut report, "beta", at, &cell.gauge.beta)
                & validation::check_finite(&mut report, "gamma", at, cell.geom.gamma.iter().flatten())
                & validation::check_finite(&mut report, "K", at, cell.curv.k.iter().flatten());
            if !finite {
                continue;
            }
            validation::check_symmetric(&mut report, "gamma", at, &cell.geom.gamma, tol.symmetry_rel);
            validation::check_symmetric(&mut report, "K", at, &cell.curv.k, tol.symmetry_rel);
            validation::check_lapse(&mut report, at, cell.gauge.alpha, tol.lapse_warn);
            validation::check_metric_det(&mut report, at, tensor::det(&cell.geom.gamma), tol.singular_det);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_foundation::ValidationError;

    fn small_grid() -> Grid {
        Grid::centered(Extent::new(4, 5, 6).unwrap(), Spacing::uniform(0.5).unwrap())
    }

    #[test]
    fn test_extent_rejects_tiny() {
        assert!(Extent::new(2, 5, 5).is_err());
        assert!(Extent::new(3, 3, 3).is_ok());
    }

    #[test]
    fn test_spacing_rejects_nonpositive() {
        assert!(Spacing::new(0.1, 0.0, 0.1).is_err());
        assert!(Spacing::new(0.1, f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_index_roundtrip() {
        let e = Extent::new(4, 5, 6).unwrap();
        for idx in 0..e.n_cells() {
            let (i, j, k) = e.coords(idx);
            assert_eq!(e.index(i, j, k), idx);
            assert_eq!(e.coord(idx, Axis::X), i);
            assert_eq!(e.coord(idx, Axis::Y), j);
            assert_eq!(e.coord(idx, Axis::Z), k);
        }
        assert_eq!(e.index(0, 0, 1), 1);
        assert_eq!(e.index(1, 0, 0), 30);
    }

    #[test]
    fn test_interior_count() {
        let e = Extent::new(4, 5, 6).unwrap();
        let n = (0..e.n_cells()).filter(|&i| e.is_interior(i)).count();
        assert_eq!(n, e.n_interior());
        assert_eq!(n, 2 * 3 * 4);
    }

    #[test]
    fn test_allocate_is_flat() {
        let grid = small_grid();
        assert_eq!(grid.n_cells(), 120);
        assert_eq!(grid.hamiltonian_field().as_slice().len(), 120);
        for cell in grid.cells() {
            assert_eq!(cell.gauge.alpha, 1.0);
            assert_eq!(cell.geom.gamma, IDENTITY);
            assert_eq!(cell.k_trace(), 0.0);
            assert!((cell.chi() - 1.0).abs() < 1e-15);
        }
        assert!(grid.validate(&NumericalTolerance::default()).is_valid());
    }

    #[test]
    fn test_centered_position() {
        let grid = Grid::centered(Extent::new(5, 5, 5).unwrap(), Spacing::uniform(0.5).unwrap());
        let c = grid.position(grid.extent().center());
        assert!(c.length() < 1e-15);
        assert_eq!(grid.position(0), DVec3::splat(-1.0));
    }

    #[test]
    fn test_validate_catches_asymmetry_and_lapse() {
        let mut grid = small_grid();
        grid.cell_mut(1, 1, 1).curv.k[0][1] = 0.5;
        grid.cell_mut(2, 2, 2).gauge.alpha = -0.1;
        grid.cell_mut(2, 3, 4).geom.gamma = ZERO;
        grid.cell_mut(3, 1, 1).gauge.beta[1] = f64::INFINITY;
        let report = grid.validate(&NumericalTolerance::default());
        assert_eq!(report.error_count(), 4);
        let cells: Vec<_> = report.errors.iter().map(|e| e.cell()).collect();
        assert_eq!(cells, vec![(1, 1, 1), (2, 2, 2), (2, 3, 4), (3, 1, 1)]);
        assert!(matches!(report.errors[1], ValidationError::NonPositiveLapse { .. }));
        assert!(matches!(report.errors[2], ValidationError::DegenerateMetric { .. }));
        assert!(matches!(report.errors[3], ValidationError::NonFinite { field: "beta", .. }));
    }
}
