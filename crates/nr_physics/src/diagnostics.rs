// crates/nr_physics/src/diagnostics.rs

//! 全局诊断量
//!
//! - ADM 质量：共形因子 `ψ = det(γ)^(1/12)` 穿过远场盒面的通量
//!
//!   ```text
//!   M = −(1/2π) ∮ ∂_i ψ dS^i
//!   ```
//!
//!   对共形平直的真空数据，ψ 在盒外调和，结果与所取曲面无关。
//! - Hamiltonian 体积分：读取网格持有的 Hamiltonian 诊断场。

use std::f64::consts::PI;

use serde::Serialize;

use crate::grid::{Cell, Grid};
use crate::numerics::fd::Axis;

/// 积分盒面距网格边缘的单元层数
pub const SURFACE_LAYER: usize = 2;

/// 每步记录的全局诊断量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GlobalDiagnostics {
    /// ADM 质量估计（网格太小无法放置积分盒时为 `None`）
    pub adm_mass: Option<f64>,
    /// 内部单元上的 `∫ |H| dV`
    pub hamiltonian_l1: f64,
}

impl GlobalDiagnostics {
    /// 在当前网格上测量
    pub fn measure(grid: &Grid) -> Self {
        Self {
            adm_mass: adm_mass(grid),
            hamiltonian_l1: hamiltonian_l1(grid),
        }
    }
}

/// 共形因子 ψ = χ^(-1/4)
#[inline]
pub fn conformal_factor(cell: &Cell) -> f64 {
    cell.chi().powf(-0.25)
}

/// 在默认盒面上估计 ADM 质量
pub fn adm_mass(grid: &Grid) -> Option<f64> {
    adm_mass_at(grid, SURFACE_LAYER)
}

/// 在距边缘 `layer` 层的盒面上估计 ADM 质量
///
/// 盒面每个面上按梯形规则求和，法向导数用网格的差分模板。
pub fn adm_mass_at(grid: &Grid, layer: usize) -> Option<f64> {
    let extent = grid.extent();
    if Axis::ALL.iter().any(|&a| extent.len(a) < 2 * layer + 2) {
        return None;
    }
    let spacing = grid.spacing();
    let stencil = grid.stencil();
    let upper = |axis: Axis| extent.len(axis) - 1 - layer;
    let weight = |c: usize, axis: Axis| if c == layer || c == upper(axis) { 0.5 } else { 1.0 };

    let mut flux = 0.0;
    for normal in Axis::ALL {
        let [t1, t2] = tangents(normal);
        let area = spacing.along(t1) * spacing.along(t2);
        for (side, sign) in [(layer, -1.0), (upper(normal), 1.0)] {
            for u in layer..=upper(t1) {
                for v in layer..=upper(t2) {
                    let mut c = [0usize; 3];
                    c[normal.index()] = side;
                    c[t1.index()] = u;
                    c[t2.index()] = v;
                    let idx = extent.index(c[0], c[1], c[2]);
                    let dpsi = stencil.partial(idx, normal, conformal_factor);
                    flux += sign * weight(u, t1) * weight(v, t2) * area * dpsi;
                }
            }
        }
    }
    Some(-flux / (2.0 * PI))
}

fn tangents(normal: Axis) -> [Axis; 2] {
    match normal {
        Axis::X => [Axis::Y, Axis::Z],
        Axis::Y => [Axis::X, Axis::Z],
        Axis::Z => [Axis::X, Axis::Y],
    }
}

/// 内部单元上 Hamiltonian 诊断场的 `∫ |H| dV`
pub fn hamiltonian_l1(grid: &Grid) -> f64 {
    let extent = grid.extent();
    let s = grid.spacing();
    let dv = s.along(Axis::X) * s.along(Axis::Y) * s.along(Axis::Z);
    let field = grid.hamiltonian_field();
    (0..extent.n_cells())
        .filter(|&idx| extent.is_interior(idx))
        .map(|idx| field.get(idx).abs())
        .sum::<f64>()
        * dv
}
