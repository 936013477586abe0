// crates/nr_physics/src/constraints.rs

//! Hamiltonian 与动量约束
//!
//! ```text
//! H   = R + K² − K_ij K^ij
//! M_i = γ^jk D_k K_ij − ∂_i K
//! ```
//!
//! 其中 `K = γ^ij K_ij`，`K_ij K^ij = Σ_ijkl K_ij γ^ik γ^jl K_kl`，
//! `D_k K_ij = ∂_k K_ij − Γ^m_ki K_mj − Γ^m_kj K_im`。
//!
//! 求值是纯函数；写回单元与诊断场在单独的遍历中完成。
//! 调用前 `gamma_inv`、`K`、`conn` 必须已是当前状态，
//! 过期的逆度规会静默地给出错误的约束值。

use serde::Serialize;

use crate::engine::parallel::ParallelVolume;
use crate::geometry;
use crate::grid::{Cell, Grid};
use crate::numerics::tensor::{self, Mat3};

/// 单元的约束值
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstraintValues {
    /// Hamiltonian 约束
    pub hamiltonian: f64,
    /// 动量约束
    pub momentum: [f64; 3],
}

/// `K_ij K^ij`，显式四重循环全收缩
pub fn k_squared(gamma_inv: &Mat3, k: &Mat3) -> f64 {
    let mut sum = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            for a in 0..3 {
                for b in 0..3 {
                    sum += k[i][j] * gamma_inv[i][a] * gamma_inv[j][b] * k[a][b];
                }
            }
        }
    }
    sum
}

/// 由 Ricci 标量计算 Hamiltonian 约束
#[inline]
pub fn hamiltonian_from_parts(ricci_scalar: f64, gamma_inv: &Mat3, k: &Mat3) -> f64 {
    let trace = tensor::contract(gamma_inv, k);
    ricci_scalar + trace * trace - k_squared(gamma_inv, k)
}

/// 单元处的 Hamiltonian 约束
pub fn hamiltonian_constraint(grid: &Grid, idx: usize) -> f64 {
    let cell = &grid.cells()[idx];
    hamiltonian_from_parts(geometry::ricci_scalar(grid, idx), &cell.geom.gamma_inv, &cell.curv.k)
}

/// 单元处的动量约束
pub fn momentum_constraint(grid: &Grid, idx: usize) -> [f64; 3] {
    let stencil = grid.stencil();
    let cell = &grid.cells()[idx];
    let gamma_inv = &cell.geom.gamma_inv;
    let k = &cell.curv.k;
    let chr = &cell.conn.christoffel;

    let dk = stencil.gradient_sym(idx, |c: &Cell| &c.curv.k);
    let dtrace = stencil.gradient(idx, Cell::k_trace);

    let mut out = [0.0; 3];
    for (i, m_i) in out.iter_mut().enumerate() {
        let mut div = 0.0;
        for j in 0..3 {
            for kk in 0..3 {
                // D_k K_ij
                let mut cov = dk[kk][i][j];
                for m in 0..3 {
                    cov -= chr[m][kk][i] * k[m][j] + chr[m][kk][j] * k[i][m];
                }
                div += gamma_inv[j][kk] * cov;
            }
        }
        *m_i = div - dtrace[i];
    }
    out
}

/// 用已算好的 Ricci 张量求值约束对
pub fn evaluate_with_ricci(grid: &Grid, idx: usize, ricci: &Mat3) -> ConstraintValues {
    let cell = &grid.cells()[idx];
    let r = tensor::contract(&cell.geom.gamma_inv, ricci);
    ConstraintValues {
        hamiltonian: hamiltonian_from_parts(r, &cell.geom.gamma_inv, &cell.curv.k),
        momentum: momentum_constraint(grid, idx),
    }
}

/// 求值单元的约束对
pub fn evaluate(grid: &Grid, idx: usize) -> ConstraintValues {
    evaluate_with_ricci(grid, idx, &geometry::ricci_tensor(grid, idx))
}

/// 约束写回
pub struct ConstraintEvaluator;

impl ConstraintEvaluator {
    /// 把单个单元的约束值写入单元与 Hamiltonian 诊断场
    pub fn record(grid: &mut Grid, idx: usize, values: ConstraintValues) {
        let (cells, field) = grid.split_diagnostics_mut();
        cells[idx].matter.hamiltonian = values.hamiltonian;
        cells[idx].matter.momentum = values.momentum;
        field.set(idx, values.hamiltonian);
    }

    /// 批量写回，`None` 的单元保持不变
    pub fn record_all(grid: &mut Grid, values: &[Option<ConstraintValues>]) {
        let (cells, field) = grid.split_diagnostics_mut();
        for (idx, v) in values.iter().enumerate() {
            if let Some(v) = v {
                cells[idx].matter.hamiltonian = v.hamiltonian;
                cells[idx].matter.momentum = v.momentum;
                field.set(idx, v.hamiltonian);
            }
        }
    }

    /// 对所有内部单元求值并写回（需要联络已是当前状态）
    pub fn evaluate_all(grid: &mut Grid, volume: &ParallelVolume) {
        let values: Vec<Option<ConstraintValues>> = {
            let view: &Grid = grid;
            volume.map_interior(|idx| Some(evaluate(view, idx)))
        };
        Self::record_all(grid, &values);
    }
}

/// 约束范数（内部单元）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ConstraintNorms {
    /// max |H|
    pub max_abs_h: f64,
    /// 均方根 H
    pub l2_h: f64,
    /// max |M_i|
    pub max_abs_m: f64,
}

impl ConstraintNorms {
    /// 统计单元中已记录的约束值
    pub fn measure(grid: &Grid) -> Self {
        let extent = grid.extent();
        let mut norms = Self::default();
        let mut sum_sq = 0.0;
        let mut count = 0usize;

        for (idx, cell) in grid.cells().iter().enumerate() {
            if !extent.is_interior(idx) {
                continue;
            }
            let h = cell.matter.hamiltonian;
            norms.max_abs_h = norms.max_abs_h.max(h.abs());
            sum_sq += h * h;
            count += 1;
            for m in cell.matter.momentum {
                norms.max_abs_m = norms.max_abs_m.max(m.abs());
            }
        }

        if count > 0 {
            norms.l2_h = (sum_sq / count as f64).sqrt();
        }
        norms
    }
}
