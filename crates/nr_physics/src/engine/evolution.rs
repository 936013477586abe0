// crates/nr_physics/src/engine/evolution.rs

//! 经典四阶 Runge-Kutta 演化驱动
//!
//! ## 单步流程
//!
//! ```text
//! Idle
//!  └─ CFL 时间步 → 边界条件 → 刷新 γ⁻¹ → 快照 U⁰        (BoundaryApplied)
//!      └─ for k in 0..4:
//!           联络遍历 → 右端项求值 r_k (+ 约束)          (StageComputed(k))
//!           k < 3: U = U⁰ + c_k·dt·r_k, 刷新 γ⁻¹        (StageBlended(k))
//!      └─ U = U⁰ + dt/6 (r₀ + 2r₁ + 2r₂ + r₃)          (Combined)
//!      └─ 刷新 γ⁻¹, t += dt, 约束诊断, 观察者
//! Idle / Terminal
//! ```
//!
//! 其中 `c = (½, ½, 1)`。中间状态总是由原始快照混合而来，
//! 不在前一级混合结果上累积。
//!
//! ## 并行约定
//!
//! 每个遍历都通过 [`ParallelVolume`] 完成：求值遍历只读网格、
//! 结果写入独立缓冲；写回遍历只访问单元自身。
//! 边界单元不参与内部演化，只由边界条件设置。

use nr_config::EvolutionConfig;
use nr_foundation::{NrError, NrResult, NumericalTolerance};
use tracing::{debug, info, warn};

use crate::adm;
use crate::boundary::{BoundaryCondition, EdgeCopy};
use crate::constraints::{self, ConstraintEvaluator, ConstraintNorms, ConstraintValues};
use crate::engine::parallel::{ParallelStrategy, ParallelVolume};
use crate::engine::timestep::CflCalculator;
use crate::gauge::GaugeConditions;
use crate::geometry;
use crate::grid::{Cell, Extent, Grid};
use crate::numerics::tensor::{self, Mat3};
use crate::observer::StepObserver;

// ============================================================
// RK 级
// ============================================================

/// RK4 的四个级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RkStage {
    /// 第 1 级（t）
    First,
    /// 第 2 级（t + dt/2）
    Second,
    /// 第 3 级（t + dt/2）
    Third,
    /// 第 4 级（t + dt）
    Fourth,
}

impl RkStage {
    /// 按顺序排列的全部级
    pub const ALL: [RkStage; 4] = [
        RkStage::First,
        RkStage::Second,
        RkStage::Third,
        RkStage::Fourth,
    ];

    /// 级序号 0..4
    #[inline]
    pub fn index(self) -> usize {
        match self {
            RkStage::First => 0,
            RkStage::Second => 1,
            RkStage::Third => 2,
            RkStage::Fourth => 3,
        }
    }

    /// 合成权重 (1/6, 1/3, 1/3, 1/6)
    #[inline]
    pub fn weight(self) -> f64 {
        self.multiplier() / 6.0
    }

    /// 合成时的整数倍数 (1, 2, 2, 1)
    #[inline]
    pub fn multiplier(self) -> f64 {
        match self {
            RkStage::First | RkStage::Fourth => 1.0,
            RkStage::Second | RkStage::Third => 2.0,
        }
    }

    /// 产生下一级输入时的 dt 系数；最后一级返回 `None`
    #[inline]
    pub fn blend_factor(self) -> Option<f64> {
        match self {
            RkStage::First | RkStage::Second => Some(0.5),
            RkStage::Third => Some(1.0),
            RkStage::Fourth => None,
        }
    }
}

/// 驱动状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// 空闲，可以开始新的一步
    Idle,
    /// 已施加边界条件并完成快照
    BoundaryApplied,
    /// 已求得该级右端项
    StageComputed(RkStage),
    /// 已混合出下一级输入
    StageBlended(RkStage),
    /// 已完成四级合成
    Combined,
    /// 演化结束（步数用尽或出错）
    Terminal,
}

/// 各级是否计算约束诊断
///
/// 默认跳过第 2 级，只在第 1、3、4 级计算。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintSchedule([bool; 4]);

impl Default for ConstraintSchedule {
    fn default() -> Self {
        Self([true, false, true, true])
    }
}

impl ConstraintSchedule {
    /// 自定义各级开关
    pub fn new(stages: [bool; 4]) -> Self {
        Self(stages)
    }

    /// 每级都计算
    pub fn every_stage() -> Self {
        Self([true; 4])
    }

    /// 从不在级内计算
    pub fn never() -> Self {
        Self([false; 4])
    }

    /// 该级是否计算约束
    #[inline]
    pub fn includes(&self, stage: RkStage) -> bool {
        self.0[stage.index()]
    }
}

// ============================================================
// 状态与级缓冲
// ============================================================

/// 被演化的变量 (α, β, γ, K)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvolvedState {
    /// lapse
    pub alpha: f64,
    /// shift
    pub beta: [f64; 3],
    /// 3-度规
    pub gamma: Mat3,
    /// 外曲率
    pub k: Mat3,
}

impl EvolvedState {
    /// 取出单元的演化变量
    #[inline]
    pub fn of(cell: &Cell) -> Self {
        Self {
            alpha: cell.gauge.alpha,
            beta: cell.gauge.beta,
            gamma: cell.geom.gamma,
            k: cell.curv.k,
        }
    }

    /// `self + h · rates`
    #[inline]
    pub fn advanced(&self, rates: &StageRates, h: f64) -> Self {
        let mut beta = self.beta;
        for (b, d) in beta.iter_mut().zip(rates.d_beta) {
            *b += h * d;
        }
        Self {
            alpha: self.alpha + h * rates.d_alpha,
            beta,
            gamma: tensor::add_scaled(&self.gamma, &rates.d_gamma, h),
            k: tensor::add_scaled(&self.k, &rates.d_k, h),
        }
    }

    /// 写回单元
    #[inline]
    pub fn write_to(&self, cell: &mut Cell) {
        cell.gauge.alpha = self.alpha;
        cell.gauge.beta = self.beta;
        cell.geom.gamma = self.gamma;
        cell.curv.k = self.k;
    }

    /// 第一个非有限的字段
    pub fn non_finite_field(&self) -> Option<&'static str> {
        if !self.alpha.is_finite() {
            Some("alpha")
        } else if !self.beta.iter().all(|b| b.is_finite()) {
            Some("beta")
        } else if !tensor::is_finite(&self.gamma) {
            Some("gamma")
        } else if !tensor::is_finite(&self.k) {
            Some("K")
        } else {
            None
        }
    }
}

/// 单元在某一级的时间导数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageRates {
    /// ∂t α
    pub d_alpha: f64,
    /// ∂t β
    pub d_beta: [f64; 3],
    /// ∂t γ
    pub d_gamma: Mat3,
    /// ∂t K
    pub d_k: Mat3,
}

impl StageRates {
    /// 累加 `s · other`
    #[inline]
    fn accumulate(&mut self, other: &StageRates, s: f64) {
        self.d_alpha += s * other.d_alpha;
        for (a, b) in self.d_beta.iter_mut().zip(other.d_beta) {
            *a += s * b;
        }
        self.d_gamma = tensor::add_scaled(&self.d_gamma, &other.d_gamma, s);
        self.d_k = tensor::add_scaled(&self.d_k, &other.d_k, s);
    }
}

/// 四级右端项缓冲，按 [`RkStage`] 索引
///
/// 仅在一步之内有意义，下一步开始时覆盖。
#[derive(Debug, Clone)]
pub struct StageBuffers {
    rates: [Vec<StageRates>; 4],
}

impl StageBuffers {
    /// 为 `n_cells` 个单元分配缓冲
    pub fn new(n_cells: usize) -> Self {
        Self {
            rates: std::array::from_fn(|_| vec![StageRates::default(); n_cells]),
        }
    }

    /// 某一级的右端项
    #[inline]
    pub fn stage(&self, stage: RkStage) -> &[StageRates] {
        &self.rates[stage.index()]
    }

    /// 保存某一级的右端项
    pub fn store(&mut self, stage: RkStage, rates: Vec<StageRates>) {
        self.rates[stage.index()] = rates;
    }

    /// `r₀ + 2r₁ + 2r₂ + r₃`
    pub fn combined(&self, idx: usize) -> StageRates {
        let mut out = StageRates::default();
        for stage in RkStage::ALL {
            out.accumulate(&self.rates[stage.index()][idx], stage.multiplier());
        }
        out
    }
}

/// 单元求值结果（右端项与诊断量）
#[derive(Debug, Clone, Copy, Default)]
struct CellEvaluation {
    rates: StageRates,
    dt_chi: f64,
    dt_atilde: Mat3,
    constraints: Option<ConstraintValues>,
}

// ============================================================
// 报告
// ============================================================

/// 单步报告
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// 步序号（从 0 开始）
    pub step: usize,
    /// 本步时间步长
    pub dt: f64,
    /// 步后模拟时间
    pub time: f64,
    /// 是否为本次演化的最后一步
    pub is_final: bool,
    /// 合成状态上的约束范数
    pub norms: ConstraintNorms,
}

/// 演化汇总
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolutionSummary {
    /// 完成的步数
    pub steps: usize,
    /// 最终模拟时间
    pub final_time: f64,
    /// 最后一步的时间步长
    pub last_dt: f64,
    /// 最终约束范数
    pub constraint_norms: ConstraintNorms,
}

// ============================================================
// 演化器
// ============================================================

/// RK4 演化驱动
pub struct Rk4Evolver {
    volume: ParallelVolume,
    cfl: CflCalculator,
    gauge: GaugeConditions,
    boundary: Box<dyn BoundaryCondition>,
    schedule: ConstraintSchedule,
    tolerance: NumericalTolerance,
    check_finite: bool,
    buffers: StageBuffers,
    snapshot: Vec<EvolvedState>,
    phase: StepPhase,
    steps_taken: usize,
    observers: Vec<Box<dyn StepObserver>>,
}

impl Rk4Evolver {
    /// 使用默认参数创建
    pub fn new(extent: Extent) -> Self {
        Self {
            volume: ParallelVolume::new(extent, ParallelStrategy::Auto),
            cfl: CflCalculator::default(),
            gauge: GaugeConditions::default(),
            boundary: Box::new(EdgeCopy::new(extent)),
            schedule: ConstraintSchedule::default(),
            tolerance: NumericalTolerance::default(),
            check_finite: true,
            buffers: StageBuffers::new(extent.n_cells()),
            snapshot: Vec::with_capacity(extent.n_cells()),
            phase: StepPhase::Idle,
            steps_taken: 0,
            observers: Vec::new(),
        }
    }

    /// 从配置创建
    pub fn from_config(config: &EvolutionConfig) -> NrResult<Self> {
        let g = &config.grid;
        let extent = Extent::new(g.nx, g.ny, g.nz)?;
        Ok(Self::new(extent)
            .with_parallel(ParallelVolume::from_config(extent, &config.parallel))
            .with_cfl(CflCalculator::from_config(&config.time))
            .with_gauge(GaugeConditions::from_config(&config.gauge))
            .with_schedule(ConstraintSchedule::new(config.diagnostics.constraint_stages))
            .with_check_finite(config.time.check_finite))
    }

    /// 设置并行遍历器
    pub fn with_parallel(mut self, volume: ParallelVolume) -> Self {
        self.volume = volume;
        self
    }

    /// 设置 CFL 计算器
    pub fn with_cfl(mut self, cfl: CflCalculator) -> Self {
        self.cfl = cfl;
        self
    }

    /// 设置规范条件
    pub fn with_gauge(mut self, gauge: GaugeConditions) -> Self {
        self.gauge = gauge;
        self
    }

    /// 设置边界条件
    pub fn with_boundary(mut self, boundary: Box<dyn BoundaryCondition>) -> Self {
        self.boundary = boundary;
        self
    }

    /// 设置约束计算的级
    pub fn with_schedule(mut self, schedule: ConstraintSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// 设置数值容差
    pub fn with_tolerance(mut self, tolerance: NumericalTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// 是否在每步合成后检查有限性
    pub fn with_check_finite(mut self, enabled: bool) -> Self {
        self.check_finite = enabled;
        self
    }

    /// 注册步观察者
    pub fn add_observer(&mut self, observer: Box<dyn StepObserver>) {
        self.observers.push(observer);
    }

    /// 当前状态机阶段
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    /// 已完成的步数
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// 规范条件
    pub fn gauge(&self) -> &GaugeConditions {
        &self.gauge
    }

    /// 最近一步的级缓冲
    pub fn stage_buffers(&self) -> &StageBuffers {
        &self.buffers
    }

    /// 演化 `step_count` 步
    ///
    /// `initial_dt` 同时作为每步自适应时间步长的上限。
    pub fn evolve(
        &mut self,
        grid: &mut Grid,
        initial_dt: f64,
        step_count: usize,
    ) -> NrResult<EvolutionSummary> {
        info!(
            steps = step_count,
            initial_dt,
            cells = grid.n_cells(),
            boundary = self.boundary.name(),
            parallel = self.volume.is_parallel(),
            "开始 RK4 演化"
        );

        let mut last_dt = 0.0;
        let mut norms = ConstraintNorms::measure(grid);
        for n in 0..step_count {
            let report = if n + 1 == step_count {
                self.final_step(grid, initial_dt)?
            } else {
                self.step(grid, initial_dt)?
            };
            last_dt = report.dt;
            norms = report.norms;
        }
        self.phase = StepPhase::Terminal;

        info!(
            final_time = grid.time(),
            max_abs_h = norms.max_abs_h,
            "演化完成"
        );
        Ok(EvolutionSummary {
            steps: step_count,
            final_time: grid.time(),
            last_dt,
            constraint_norms: norms,
        })
    }

    /// 推进一步
    ///
    /// 报告的 `is_final` 为 `false`，只在最后一步导出的观察者不会被触发；
    /// 手动驱动时用 [`Rk4Evolver::final_step`] 结束演化。
    pub fn step(&mut self, grid: &mut Grid, dt_cap: f64) -> NrResult<StepReport> {
        self.step_with(grid, dt_cap, false)
    }

    /// 推进最后一步，之后状态机进入 [`StepPhase::Terminal`]
    pub fn final_step(&mut self, grid: &mut Grid, dt_cap: f64) -> NrResult<StepReport> {
        self.step_with(grid, dt_cap, true)
    }

    fn step_with(&mut self, grid: &mut Grid, dt_cap: f64, is_final: bool) -> NrResult<StepReport> {
        let result = self.advance(grid, dt_cap, is_final);
        match result {
            Ok(report) => {
                self.notify(grid, &report);
                self.phase = if is_final {
                    StepPhase::Terminal
                } else {
                    StepPhase::Idle
                };
                Ok(report)
            }
            Err(e) => {
                self.phase = StepPhase::Terminal;
                Err(e)
            }
        }
    }

    /// 单步的计算部分（不含观察者）
    fn advance(&mut self, grid: &mut Grid, dt_cap: f64, is_final: bool) -> NrResult<StepReport> {
        let extent = self.volume.extent();
        if grid.extent() != extent {
            return Err(NrError::invalid_input(format!(
                "网格尺寸 {:?} 与演化器 {:?} 不一致",
                grid.extent(),
                extent
            )));
        }
        self.phase = StepPhase::Idle;

        let dt = self.cfl.compute_dt(grid, &self.volume, dt_cap)?;

        self.boundary.apply(grid);
        self.refresh_inverse_metric(grid)?;
        self.snapshot = self.volume.map_all(|idx| EvolvedState::of(&grid.cells()[idx]));
        self.phase = StepPhase::BoundaryApplied;

        // 快照之后的任何错误都回滚到步起点，网格始终对应某个时间层
        if let Err(e) = self.integrate(grid, dt) {
            warn!(time = grid.time(), error = %e, "RK4 步失败，回滚到步起点");
            self.rollback(grid);
            return Err(e);
        }
        grid.advance_time(dt);

        geometry::compute_connection(grid, &self.volume);
        ConstraintEvaluator::evaluate_all(grid, &self.volume);
        let norms = ConstraintNorms::measure(grid);

        let report = StepReport {
            step: self.steps_taken,
            dt,
            time: grid.time(),
            is_final,
            norms,
        };
        self.steps_taken += 1;
        debug!(step = report.step, dt, time = report.time, max_abs_h = norms.max_abs_h, "RK4 步完成");
        Ok(report)
    }

    /// 四级求值、混合与合成；成功时网格持有 t + dt 的状态
    fn integrate(&mut self, grid: &mut Grid, dt: f64) -> NrResult<()> {
        for stage in RkStage::ALL {
            self.compute_stage(grid, stage);
            self.phase = StepPhase::StageComputed(stage);

            if let Some(factor) = stage.blend_factor() {
                let h = factor * dt;
                let snapshot = &self.snapshot;
                let rates = self.buffers.stage(stage);
                self.volume.update_interior(grid.cells_mut(), |idx, cell| {
                    snapshot[idx].advanced(&rates[idx], h).write_to(cell);
                });
                self.refresh_inverse_metric(grid)?;
                self.phase = StepPhase::StageBlended(stage);
            }
        }

        {
            let snapshot = &self.snapshot;
            let buffers = &self.buffers;
            let h = dt / 6.0;
            self.volume.update_interior(grid.cells_mut(), |idx, cell| {
                snapshot[idx].advanced(&buffers.combined(idx), h).write_to(cell);
            });
        }
        self.phase = StepPhase::Combined;

        if self.check_finite {
            self.check_finite_state(grid)?;
        }
        self.refresh_inverse_metric(grid)
    }

    /// 把快照写回内部单元并重建 γ⁻¹ 与 γ̃
    ///
    /// 快照在步起点通过了求逆，重建不会失败。
    fn rollback(&self, grid: &mut Grid) {
        let snapshot = &self.snapshot;
        let threshold = self.tolerance.singular_det;
        self.volume.update_interior(grid.cells_mut(), |idx, cell| {
            snapshot[idx].write_to(cell);
            if let Some(inv) = tensor::invert_3x3(&cell.geom.gamma, threshold) {
                cell.geom.gamma_inv = inv;
            }
            cell.geom.tilde_gamma = tensor::scale(&cell.geom.gamma, cell.chi());
        });
    }

    /// 单级：联络遍历、右端项求值、诊断写回
    fn compute_stage(&mut self, grid: &mut Grid, stage: RkStage) {
        geometry::compute_connection(grid, &self.volume);

        let with_constraints = self.schedule.includes(stage);
        let gauge = self.gauge;
        let evaluations: Vec<CellEvaluation> = {
            let view: &Grid = grid;
            self.volume
                .map_interior(|idx| evaluate_cell(view, idx, &gauge, with_constraints))
        };

        self.buffers
            .store(stage, evaluations.iter().map(|e| e.rates).collect());

        self.volume.update_interior(grid.cells_mut(), |idx, cell| {
            let e = &evaluations[idx];
            cell.conformal.dt_chi = e.dt_chi;
            cell.conformal.dt_atilde = e.dt_atilde;
        });
        if with_constraints {
            let values: Vec<Option<ConstraintValues>> =
                evaluations.iter().map(|e| e.constraints).collect();
            ConstraintEvaluator::record_all(grid, &values);
        }
    }

    /// 为所有单元刷新 γ⁻¹ 与 γ̃
    ///
    /// 任一单元度规接近奇异时返回 [`NrError::SingularMetric`]。
    pub fn refresh_inverse_metric(&self, grid: &mut Grid) -> NrResult<()> {
        let extent = grid.extent();
        let threshold = self.tolerance.singular_det;
        self.volume.try_update_all(grid.cells_mut(), |idx, cell| {
            let gamma = &cell.geom.gamma;
            let inv = tensor::invert_3x3(gamma, threshold)
                .ok_or_else(|| NrError::singular_metric(extent.coords(idx), tensor::det(gamma)))?;
            cell.geom.gamma_inv = inv;
            cell.geom.tilde_gamma = tensor::scale(&cell.geom.gamma, cell.chi());
            Ok(())
        })
    }

    fn check_finite_state(&self, grid: &Grid) -> NrResult<()> {
        let extent = grid.extent();
        for (idx, cell) in grid.cells().iter().enumerate() {
            if let Some(field) = EvolvedState::of(cell).non_finite_field() {
                return Err(NrError::non_finite(field, extent.coords(idx)));
            }
        }
        Ok(())
    }

    fn notify(&mut self, grid: &Grid, report: &StepReport) {
        for observer in &mut self.observers {
            if let Err(e) = observer.on_step(grid, report) {
                warn!(observer = observer.name(), step = report.step, error = %e, "观察者执行失败");
            }
        }
    }
}

/// 单元求值：ADM 与规范右端项，按需附带约束
fn evaluate_cell(
    grid: &Grid,
    idx: usize,
    gauge: &GaugeConditions,
    with_constraints: bool,
) -> CellEvaluation {
    let k_trace = grid.cells()[idx].k_trace();
    let ricci = geometry::ricci_tensor(grid, idx);
    let adm = adm::adm_rates(grid, idx, &ricci, k_trace);
    let (d_alpha, d_beta) = gauge.rates(grid, idx, k_trace);

    CellEvaluation {
        rates: StageRates {
            d_alpha,
            d_beta,
            d_gamma: adm.d_gamma,
            d_k: adm.d_k,
        },
        dt_chi: adm.dt_chi,
        dt_atilde: adm.dt_atilde,
        constraints: with_constraints.then(|| constraints::evaluate_with_ricci(grid, idx, &ricci)),
    }
}

/// 用默认演化器演化 `step_count` 步
pub fn evolve(grid: &mut Grid, initial_dt: f64, step_count: usize) -> NrResult<EvolutionSummary> {
    Rk4Evolver::new(grid.extent()).evolve(grid, initial_dt, step_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Spacing;
    use crate::numerics::tensor::IDENTITY;

    fn flat_grid(n: usize) -> Grid {
        Grid::centered(Extent::new(n, n, n).unwrap(), Spacing::uniform(0.2).unwrap())
    }

    #[test]
    fn test_stage_weights() {
        let sum: f64 = RkStage::ALL.iter().map(|s| s.weight()).sum();
        assert!((sum - 1.0).abs() < 1e-15);
        assert_eq!(RkStage::Fourth.blend_factor(), None);
        assert_eq!(RkStage::Third.blend_factor(), Some(1.0));
    }

    #[test]
    fn test_default_schedule_skips_second_stage() {
        let s = ConstraintSchedule::default();
        assert!(s.includes(RkStage::First));
        assert!(!s.includes(RkStage::Second));
        assert!(s.includes(RkStage::Third));
        assert!(s.includes(RkStage::Fourth));
    }

    #[test]
    fn test_rk4_on_scalar_ode() {
        // dα/dt = −α 经四级缓冲合成，与 RK4 闭式一致
        let dt = 0.1;
        let mut buffers = StageBuffers::new(1);
        let y0 = EvolvedState {
            alpha: 1.0,
            ..EvolvedState::default()
        };
        let mut y = y0;
        for stage in RkStage::ALL {
            let r = StageRates {
                d_alpha: -y.alpha,
                ..StageRates::default()
            };
            buffers.store(stage, vec![r]);
            if let Some(f) = stage.blend_factor() {
                y = y0.advanced(&r, f * dt);
            }
        }
        let y1 = y0.advanced(&buffers.combined(0), dt / 6.0);
        let exact_rk4 = 1.0 - dt + dt * dt / 2.0 - dt.powi(3) / 6.0 + dt.powi(4) / 24.0;
        assert!((y1.alpha - exact_rk4).abs() < 1e-15);
        assert!((y1.alpha - (-dt).exp()).abs() < 1e-7);
    }

    #[test]
    fn test_flat_step_phase_and_time() {
        let mut grid = flat_grid(6);
        let mut evolver = Rk4Evolver::new(grid.extent());
        assert_eq!(evolver.phase(), StepPhase::Idle);
        let report = evolver.step(&mut grid, 0.01).unwrap();
        assert_eq!(report.dt, 0.01);
        assert_eq!(grid.time(), 0.01);
        assert_eq!(evolver.phase(), StepPhase::Idle);
        assert_eq!(evolver.steps_taken(), 1);
        for cell in grid.cells() {
            assert_eq!(cell.gauge.alpha, 1.0);
            assert_eq!(cell.geom.gamma, IDENTITY);
        }
    }

    #[test]
    fn test_extent_mismatch_rejected() {
        let mut grid = flat_grid(6);
        let mut evolver = Rk4Evolver::new(Extent::new(5, 5, 5).unwrap());
        assert!(evolver.step(&mut grid, 0.01).is_err());
        assert_eq!(evolver.phase(), StepPhase::Terminal);
    }

    #[test]
    fn test_singular_metric_is_hard_stop() {
        let mut grid = flat_grid(6);
        grid.cell_mut(2, 3, 2).geom.gamma = tensor::ZERO;
        let before = grid.cells().to_vec();
        let mut evolver = Rk4Evolver::new(grid.extent());
        let err = evolver.step(&mut grid, 0.01).unwrap_err();
        assert!(matches!(err, NrError::SingularMetric { i: 2, j: 3, k: 2, .. }));
        assert_eq!(evolver.phase(), StepPhase::Terminal);
        assert_eq!(grid.time(), 0.0);
        // 中止前只施加了边界条件，平直区域的演化变量未改动
        for (a, b) in before.iter().zip(grid.cells()) {
            assert_eq!(EvolvedState::of(a), EvolvedState::of(b));
        }
    }

    #[test]
    fn test_evolve_summary() {
        let mut grid = flat_grid(5);
        let summary = evolve(&mut grid, 0.02, 3).unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.last_dt, 0.02);
        assert!((summary.final_time - 0.06).abs() < 1e-15);
        assert_eq!(summary.constraint_norms, ConstraintNorms::default());
    }
}
