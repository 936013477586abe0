// crates/nr_physics/src/adm.rs

//! ADM 演化方程右端项
//!
//! ```text
//! ∂t γ_ij = −2 α K_ij + L_β γ_ij
//! ∂t K_ij = −D_i D_j α + α (R_ij + K K_ij − 2 K_ik K^k_j) + L_β K_ij
//! ```
//!
//! 其中 `D_i D_j α = ∂_i ∂_j α − Γ^k_ij ∂_k α`，
//! 对称张量的 Lie 导数 `L_β T_ij = β^k ∂_k T_ij + T_kj ∂_i β^k + T_ik ∂_j β^k`。
//!
//! 同时给出共形诊断量：
//!
//! ```text
//! χ      = det(γ)^(−1/3)
//! ∂t χ   = ⅔ χ (α K − ∂_i β^i)
//! ∂t Ã_ij = χ (∂t K_ij − ⅓ γ_ij γ^kl ∂t K_kl)
//! ```

use crate::grid::{Cell, Grid};
use crate::numerics::tensor::{self, Mat3, ZERO};

/// 单元处 ADM 右端项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmRates {
    /// ∂t γ_ij
    pub d_gamma: Mat3,
    /// ∂t K_ij
    pub d_k: Mat3,
    /// ∂t χ
    pub dt_chi: f64,
    /// ∂t Ã_ij
    pub dt_atilde: Mat3,
}

impl Default for AdmRates {
    fn default() -> Self {
        Self {
            d_gamma: ZERO,
            d_k: ZERO,
            dt_chi: 0.0,
            dt_atilde: ZERO,
        }
    }
}

/// 对称张量的 Lie 导数
///
/// `dt[k][i][j] = ∂_k T_ij`，`dbeta[i][k] = ∂_i β^k`
fn lie_derivative(t: &Mat3, dt: &[Mat3; 3], beta: &[f64; 3], dbeta: &[[f64; 3]; 3]) -> Mat3 {
    let mut out = ZERO;
    for i in 0..3 {
        for j in i..3 {
            let mut v = 0.0;
            for k in 0..3 {
                v += beta[k] * dt[k][i][j] + t[k][j] * dbeta[i][k] + t[i][k] * dbeta[j][k];
            }
            out[i][j] = v;
            out[j][i] = v;
        }
    }
    out
}

/// 计算单元处的 ADM 右端项
///
/// `ricci` 为该单元的 Ricci 张量，`k_trace` 为 `γ^ij K_ij`。
/// 要求 `gamma_inv` 与 `conn` 已是当前状态。
pub fn adm_rates(grid: &Grid, idx: usize, ricci: &Mat3, k_trace: f64) -> AdmRates {
    let stencil = grid.stencil();
    let cell = &grid.cells()[idx];
    let alpha = cell.gauge.alpha;
    let beta = cell.gauge.beta;
    let gamma = &cell.geom.gamma;
    let gamma_inv = &cell.geom.gamma_inv;
    let k = &cell.curv.k;
    let chr = &cell.conn.christoffel;

    let dgamma = stencil.gradient_sym(idx, |c: &Cell| &c.geom.gamma);
    let dk = stencil.gradient_sym(idx, |c: &Cell| &c.curv.k);
    let dbeta = stencil.gradient_vec3(idx, |c: &Cell| c.gauge.beta);
    let dalpha = stencil.gradient(idx, |c: &Cell| c.gauge.alpha);
    let hess = stencil.hessian(idx, |c: &Cell| c.gauge.alpha);

    // K^k_j = γ^kl K_lj
    let k_mixed = tensor::matmul(gamma_inv, k);

    let lie_gamma = lie_derivative(gamma, &dgamma, &beta, &dbeta);
    let lie_k = lie_derivative(k, &dk, &beta, &dbeta);

    // 只算上三角并镜像，右端项逐位对称
    let mut d_gamma = ZERO;
    let mut d_k = ZERO;
    for i in 0..3 {
        for j in i..3 {
            let mut dd_alpha = hess[i][j];
            let mut kk = 0.0;
            for m in 0..3 {
                dd_alpha -= chr[m][i][j] * dalpha[m];
                kk += k[i][m] * k_mixed[m][j];
            }

            let g = -2.0 * alpha * k[i][j] + lie_gamma[i][j];
            let kr = -dd_alpha + alpha * (ricci[i][j] + k_trace * k[i][j] - 2.0 * kk) + lie_k[i][j];
            d_gamma[i][j] = g;
            d_gamma[j][i] = g;
            d_k[i][j] = kr;
            d_k[j][i] = kr;
        }
    }

    let chi = cell.chi();
    let div_beta = dbeta[0][0] + dbeta[1][1] + dbeta[2][2];
    let dt_chi = (2.0 / 3.0) * chi * (alpha * k_trace - div_beta);

    let dk_trace = tensor::contract(gamma_inv, &d_k);
    let mut dt_atilde = ZERO;
    for i in 0..3 {
        for j in 0..3 {
            dt_atilde[i][j] = chi * (d_k[i][j] - gamma[i][j] * dk_trace / 3.0);
        }
    }

    AdmRates {
        d_gamma,
        d_k,
        dt_chi,
        dt_atilde,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parallel::{ParallelStrategy, ParallelVolume};
    use crate::geometry;
    use crate::grid::{Extent, Spacing};

    fn grid() -> Grid {
        Grid::centered(Extent::new(7, 7, 7).unwrap(), Spacing::uniform(0.1).unwrap())
    }

    #[test]
    fn test_flat_rates_vanish() {
        let g = grid();
        for idx in 0..g.n_cells() {
            let r = adm_rates(&g, idx, &ZERO, 0.0);
            assert_eq!(r.d_gamma, ZERO);
            assert_eq!(r.d_k, ZERO);
            assert_eq!(r.dt_chi, 0.0);
        }
    }

    #[test]
    fn test_uniform_curvature_drives_metric() {
        // 常数 K_ij, α=1, β=0：∂t γ = −2K，∂t K = K K_ij − 2 K_ik K^k_j
        let mut g = grid();
        let k = [[0.1, 0.02, 0.0], [0.02, 0.2, 0.0], [0.0, 0.0, 0.3]];
        for cell in g.cells_mut() {
            cell.curv.k = k;
        }
        let center = g.extent().center();
        let trace = g.cells()[center].k_trace();
        assert!((trace - 0.6).abs() < 1e-15);

        let r = adm_rates(&g, center, &ZERO, trace);
        for i in 0..3 {
            for j in 0..3 {
                assert!((r.d_gamma[i][j] + 2.0 * k[i][j]).abs() < 1e-15);
                let kk: f64 = (0..3).map(|m| k[i][m] * k[m][j]).sum();
                assert!((r.d_k[i][j] - (trace * k[i][j] - 2.0 * kk)).abs() < 1e-14);
            }
        }
        assert!((r.dt_chi - (2.0 / 3.0) * 0.6).abs() < 1e-14);
        // Ã 导数无迹
        assert!(tensor::contract(&g.cells()[center].geom.gamma_inv, &r.dt_atilde).abs() < 1e-14);
    }

    #[test]
    fn test_lapse_hessian_enters_curvature_rate() {
        // α = 1 + a x²，平直度规：∂t K_xx = −2a
        let mut g = grid();
        let a = 0.3;
        for idx in 0..g.n_cells() {
            let x = g.position(idx).x;
            g.cells_mut()[idx].gauge.alpha = 1.0 + a * x * x;
        }
        let volume = ParallelVolume::new(g.extent(), ParallelStrategy::Sequential);
        geometry::compute_connection(&mut g, &volume);
        let center = g.extent().center();
        let r = adm_rates(&g, center, &ZERO, 0.0);
        assert!((r.d_k[0][0] + 2.0 * a).abs() < 1e-10);
        assert!(r.d_k[1][1].abs() < 1e-12);
        assert_eq!(r.d_gamma, ZERO);
    }

    #[test]
    fn test_rates_symmetric() {
        let mut g = grid();
        for idx in 0..g.n_cells() {
            let p = g.position(idx);
            let cell = &mut g.cells_mut()[idx];
            cell.gauge.beta = [0.1 * p.y, 0.05 * p.z, 0.02 * p.x];
            cell.curv.k = [[0.1 * p.x, 0.03, 0.01], [0.03, 0.2, p.y * 0.1], [0.01, p.y * 0.1, 0.05]];
            cell.geom.gamma[0][1] = 0.01 * p.z;
            cell.geom.gamma[1][0] = 0.01 * p.z;
            cell.geom.gamma_inv = tensor::invert_3x3(&cell.geom.gamma, 1e-14).unwrap();
        }
        let volume = ParallelVolume::new(g.extent(), ParallelStrategy::Sequential);
        geometry::compute_connection(&mut g, &volume);
        let center = g.extent().center();
        let ricci = geometry::ricci_tensor(&g, center);
        let trace = g.cells()[center].k_trace();
        let r = adm_rates(&g, center, &ricci, trace);
        assert_eq!(tensor::asymmetry(&r.d_gamma), 0.0);
        assert_eq!(tensor::asymmetry(&r.d_k), 0.0);
    }
}
