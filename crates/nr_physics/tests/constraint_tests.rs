// tests/constraint_tests.rs

//! 约束诊断验证测试
//!
//! - Schwarzschild 穿刺初始数据在远离穿刺点处满足 H ≈ 0
//! - 规范脉冲（平直时空的非平凡切片）演化中约束不发散
//! - 约束诊断场与单元记录一致

use nr_physics::constraints::{ConstraintEvaluator, ConstraintNorms};
use nr_physics::engine::{ParallelStrategy, ParallelVolume};
use nr_physics::geometry;
use nr_physics::initial_data::{InitialData, SchwarzschildPuncture};
use nr_physics::{Extent, Grid, Rk4Evolver, Spacing};

fn schwarzschild_grid(n: usize, h: f64, mass: f64) -> Grid {
    let mut grid = Grid::centered(Extent::new(n, n, n).unwrap(), Spacing::uniform(h).unwrap());
    SchwarzschildPuncture::at_origin(mass).populate(&mut grid).unwrap();
    let volume = ParallelVolume::new(grid.extent(), ParallelStrategy::Auto);
    geometry::compute_connection(&mut grid, &volume);
    ConstraintEvaluator::evaluate_all(&mut grid, &volume);
    grid
}

#[test]
fn schwarzschild_hamiltonian_small_away_from_puncture() {
    let n = 24;
    let grid = schwarzschild_grid(n, 0.25, 0.5);
    let extent = grid.extent();

    let mut checked = 0;
    let mut near_max: f64 = 0.0;
    for idx in 0..grid.n_cells() {
        let (i, j, k) = extent.coords(idx);
        // 只看四阶模板完全覆盖的区域
        let deep = [i, j, k].iter().all(|&c| (4..=n - 5).contains(&c));
        if !deep {
            continue;
        }
        let r = grid.position(idx).length();
        let h = grid.cells()[idx].matter.hamiltonian;
        assert!(h.is_finite());
        if r > 1.5 {
            assert!(h.abs() < 2e-2, "r = {r}, H = {h}");
            checked += 1;
        } else if r < 1.0 {
            near_max = near_max.max(h.abs());
        }
    }
    assert!(checked > 0);
    // 截断误差集中在穿刺点附近
    assert!(near_max > 0.1);
}

#[test]
fn hamiltonian_field_mirrors_cells() {
    let grid = schwarzschild_grid(10, 0.3, 0.5);
    for (idx, cell) in grid.cells().iter().enumerate() {
        assert_eq!(grid.hamiltonian_field().get(idx), cell.matter.hamiltonian);
    }
    let norms = ConstraintNorms::measure(&grid);
    assert!(norms.max_abs_h > 0.0);
    assert!(norms.l2_h <= norms.max_abs_h);
}

/// 平直时空中的高斯 lapse 脉冲：H 仅由截断误差产生，不应指数增长
#[test]
fn gauge_pulse_constraints_stay_bounded() {
    let amplitude = 1e-3;
    let sigma: f64 = 0.3;
    let mut grid = Grid::centered(Extent::new(16, 16, 16).unwrap(), Spacing::uniform(0.1).unwrap());
    for idx in 0..grid.n_cells() {
        let r2 = grid.position(idx).length_squared();
        grid.cells_mut()[idx].gauge.alpha = 1.0 + amplitude * (-r2 / (sigma * sigma)).exp();
    }

    let mut evolver = Rk4Evolver::new(grid.extent());
    let mut history = Vec::new();
    for _ in 0..12 {
        let report = evolver.step(&mut grid, 0.02).unwrap();
        assert_eq!(report.dt, 0.02);
        assert!(report.norms.max_abs_h.is_finite());
        let min_alpha = grid.cells().iter().map(|c| c.gauge.alpha).fold(f64::INFINITY, f64::min);
        assert!(min_alpha > 0.0, "第 {} 步 min α = {min_alpha}", report.step);
        history.push(report.norms.max_abs_h);
    }

    let early = history[..6].iter().cloned().fold(0.0, f64::max);
    let late = history[6..].iter().cloned().fold(0.0, f64::max);
    assert!(early > 0.0);
    assert!(late < 1e-2, "max|H| = {late}");
    assert!(late <= 2.0 * early, "early = {early}, late = {late}");
}
