// crates/nr_physics/src/geometry.rs

//! 空间几何：Christoffel 符号与 Ricci 张量
//!
//! ```text
//! Γ^a_bc = ½ γ^ad (∂_b γ_dc + ∂_c γ_db − ∂_d γ_bc)
//! R_ab   = ∂_c Γ^c_ab − ∂_b Γ^c_ac + Γ^c_cd Γ^d_ab − Γ^c_ad Γ^d_bc
//! R      = γ^ab R_ab
//! ```
//!
//! Ricci 张量对单元中存储的 Christoffel 场做差分，
//! 因此调用前必须先完成一次联络遍历 [`compute_connection`]。

use crate::engine::parallel::ParallelVolume;
use crate::grid::{Cell, Grid};
use crate::numerics::fd::Axis;
use crate::numerics::tensor::{self, Christoffel, Mat3, ZERO, ZERO_CHRISTOFFEL};

/// 由逆度规与度规一阶导计算 Christoffel 符号
///
/// `dgamma[c][a][b] = ∂_c γ_ab`
pub fn christoffel_from(gamma_inv: &Mat3, dgamma: &[Mat3; 3]) -> Christoffel {
    let mut gamma_lower = ZERO_CHRISTOFFEL;
    // 第一类 Christoffel 符号 Γ_dbc
    for d in 0..3 {
        for b in 0..3 {
            for c in b..3 {
                let v = 0.5 * (dgamma[b][d][c] + dgamma[c][d][b] - dgamma[d][b][c]);
                gamma_lower[d][b][c] = v;
                gamma_lower[d][c][b] = v;
            }
        }
    }

    let mut out = ZERO_CHRISTOFFEL;
    for a in 0..3 {
        for b in 0..3 {
            for c in b..3 {
                let mut sum = 0.0;
                for d in 0..3 {
                    sum += gamma_inv[a][d] * gamma_lower[d][b][c];
                }
                out[a][b][c] = sum;
                out[a][c][b] = sum;
            }
        }
    }
    out
}

/// 单元处的 Christoffel 符号（度规差分 + 当前逆度规）
pub fn christoffel_at(grid: &Grid, idx: usize) -> Christoffel {
    let dgamma = grid.stencil().gradient_sym(idx, |c: &Cell| &c.geom.gamma);
    christoffel_from(&grid.cells()[idx].geom.gamma_inv, &dgamma)
}

/// 联络遍历：为所有单元（含边界）写入 `conn.christoffel`
///
/// 先并行只读求值，再逐单元写回。
pub fn compute_connection(grid: &mut Grid, volume: &ParallelVolume) {
    let symbols: Vec<Christoffel> = {
        let view: &Grid = grid;
        volume.map_all(|idx| christoffel_at(view, idx))
    };
    volume.update_all(grid.cells_mut(), |idx, cell| {
        cell.conn.christoffel = symbols[idx];
    });
}

/// 单元处的 Ricci 张量（对称）
///
/// 读取相邻单元已存储的 Christoffel 场。
pub fn ricci_tensor(grid: &Grid, idx: usize) -> Mat3 {
    let stencil = grid.stencil();
    let gam = &grid.cells()[idx].conn.christoffel;

    // ∂_b Γ^c_ac，先收缩再求导
    let mut d_contracted = [[0.0; 3]; 3]; // [b][a]
    for b in Axis::ALL {
        for a in 0..3 {
            d_contracted[b.index()][a] = stencil.partial(idx, b, |cell: &Cell| {
                let g = &cell.conn.christoffel;
                g[0][a][0] + g[1][a][1] + g[2][a][2]
            });
        }
    }

    // Γ^c_cd
    let mut trace = [0.0; 3];
    for (d, t) in trace.iter_mut().enumerate() {
        *t = gam[0][0][d] + gam[1][1][d] + gam[2][2][d];
    }

    let mut ricci = ZERO;
    for a in 0..3 {
        for b in a..3 {
            let mut r = 0.0;
            for c in Axis::ALL {
                let ci = c.index();
                r += stencil.partial(idx, c, |cell: &Cell| cell.conn.christoffel[ci][a][b]);
            }
            r -= d_contracted[b][a];
            for d in 0..3 {
                r += trace[d] * gam[d][a][b];
            }
            for c in 0..3 {
                for d in 0..3 {
                    r -= gam[c][a][d] * gam[d][b][c];
                }
            }
            ricci[a][b] = r;
            ricci[b][a] = r;
        }
    }
    ricci
}

/// 单元处的 Ricci 标量
pub fn ricci_scalar(grid: &Grid, idx: usize) -> f64 {
    let ricci = ricci_tensor(grid, idx);
    tensor::contract(&grid.cells()[idx].geom.gamma_inv, &ricci)
}
