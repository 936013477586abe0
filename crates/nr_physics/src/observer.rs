// crates/nr_physics/src/observer.rs

//! 步观察者
//!
//! 每步合成完成后在调用线程上依次调用，只读访问网格。
//! 观察者的错误由演化器以 `warn!` 记录，不中断演化。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use nr_foundation::NrResult;
use tracing::info;

use crate::diagnostics::GlobalDiagnostics;
use crate::engine::evolution::StepReport;
use crate::grid::{Cell, Grid};

/// 步观察者
pub trait StepObserver: Send {
    /// 名称
    fn name(&self) -> &str;

    /// 一步完成后调用
    fn on_step(&mut self, grid: &Grid, report: &StepReport) -> NrResult<()>;
}

// ============================================================
// 日志
// ============================================================

/// 以 tracing 输出中心单元的状态、约束范数与全局诊断量
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    every: usize,
    last: Option<GlobalDiagnostics>,
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new(1)
    }
}

impl LoggingObserver {
    /// 每 `every` 步输出一次（最后一步总是输出）
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            last: None,
        }
    }

    /// 最近一次输出时测得的全局诊断量
    pub fn last_diagnostics(&self) -> Option<&GlobalDiagnostics> {
        self.last.as_ref()
    }
}

impl StepObserver for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_step(&mut self, grid: &Grid, report: &StepReport) -> NrResult<()> {
        if report.step % self.every != 0 && !report.is_final {
            return Ok(());
        }
        let center = &grid.cells()[grid.extent().center()];
        let diag = GlobalDiagnostics::measure(grid);
        info!(
            step = report.step,
            time = report.time,
            dt = report.dt,
            alpha = center.gauge.alpha,
            beta_x = center.gauge.beta[0],
            h = center.matter.hamiltonian,
            m_x = center.matter.momentum[0],
            dt_chi = center.conformal.dt_chi,
            dt_atilde_xx = center.conformal.dt_atilde[0][0],
            max_abs_h = report.norms.max_abs_h,
            l2_h = report.norms.l2_h,
            max_abs_m = report.norms.max_abs_m,
            adm_mass = ?diag.adm_mass,
            l1_h = diag.hamiltonian_l1,
            "步诊断"
        );
        self.last = Some(diag);
        Ok(())
    }
}

// ============================================================
// CSV 切片导出
// ============================================================

/// 中心线切片的导出量
const SLICE_FIELDS: [(&str, fn(&Cell) -> f64); 5] = [
    ("alpha", slice_alpha),
    ("beta_x", slice_beta_x),
    ("tilde_gamma_xx", slice_tilde_gamma_xx),
    ("K_xx", slice_k_xx),
    ("Gamma_x_xx", slice_gamma_x_xx),
];

fn slice_alpha(c: &Cell) -> f64 {
    c.gauge.alpha
}

fn slice_beta_x(c: &Cell) -> f64 {
    c.gauge.beta[0]
}

fn slice_tilde_gamma_xx(c: &Cell) -> f64 {
    c.geom.tilde_gamma[0][0]
}

fn slice_k_xx(c: &Cell) -> f64 {
    c.curv.k[0][0]
}

fn slice_gamma_x_xx(c: &Cell) -> f64 {
    c.conn.christoffel[0][0][0]
}

/// 沿中心线 (j = ny/2, k = nz/2) 导出 CSV 切片
///
/// 每个量一个文件，`<field>_t=<time>.csv`，两列 `x,<field>`。
#[derive(Debug, Clone)]
pub struct SliceExporter {
    directory: PathBuf,
    final_only: bool,
    last_written: Vec<PathBuf>,
    exports: usize,
}

impl SliceExporter {
    /// 只在最后一步导出
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            final_only: true,
            last_written: Vec::new(),
            exports: 0,
        }
    }

    /// 每一步都导出
    pub fn every_step(mut self) -> Self {
        self.final_only = false;
        self
    }

    /// 输出目录
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 最近一次导出写出的文件
    pub fn last_written(&self) -> &[PathBuf] {
        &self.last_written
    }

    /// 已完成的导出次数
    pub fn export_count(&self) -> usize {
        self.exports
    }

    /// 立即导出当前网格的所有切片
    pub fn export(&mut self, grid: &Grid) -> NrResult<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.directory)?;
        let mut paths = Vec::with_capacity(SLICE_FIELDS.len());
        for (field, value) in SLICE_FIELDS {
            let path = self
                .directory
                .join(format!("{}_t={:.6}.csv", field, grid.time()));
            write_slice(&path, grid, field, value)?;
            paths.push(path);
        }
        self.last_written.clone_from(&paths);
        self.exports += 1;
        Ok(paths)
    }
}

fn write_slice(path: &Path, grid: &Grid, field: &str, value: fn(&Cell) -> f64) -> NrResult<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "x,{}", field)?;
    for idx in grid.extent().central_line() {
        writeln!(w, "{},{}", grid.position(idx).x, value(&grid.cells()[idx]))?;
    }
    w.flush()?;
    Ok(())
}

impl StepObserver for SliceExporter {
    fn name(&self) -> &str {
        "slice-exporter"
    }

    fn on_step(&mut self, grid: &Grid, report: &StepReport) -> NrResult<()> {
        if self.final_only && !report.is_final {
            return Ok(());
        }
        let paths = self.export(grid)?;
        info!(count = paths.len(), dir = %self.directory.display(), "导出中心线切片");
        Ok(())
    }
}
