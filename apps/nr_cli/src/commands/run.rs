// apps/nr_cli/src/commands/run.rs

//! 运行演化命令
//!
//! 从配置文件（或默认配置）出发，命令行参数覆盖对应字段，
//! 填充初始数据后执行固定步数的 RK4 演化。

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use nr_config::{EvolutionConfig, InitialDataKind};
use nr_foundation::NumericalTolerance;
use nr_physics::initial_data;
use nr_physics::{GlobalDiagnostics, Grid, LoggingObserver, Rk4Evolver, SliceExporter};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// 初始数据类型
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum InitialDataArg {
    /// 平直时空
    Flat,
    /// Schwarzschild 穿刺
    Schwarzschild,
}

impl From<InitialDataArg> for InitialDataKind {
    fn from(arg: InitialDataArg) -> Self {
        match arg {
            InitialDataArg::Flat => InitialDataKind::Flat,
            InitialDataArg::Schwarzschild => InitialDataKind::Schwarzschild,
        }
    }
}

/// 运行演化参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// x 方向单元数
    #[arg(long)]
    pub nx: Option<usize>,

    /// y 方向单元数
    #[arg(long)]
    pub ny: Option<usize>,

    /// z 方向单元数
    #[arg(long)]
    pub nz: Option<usize>,

    /// 均匀网格间距
    #[arg(long)]
    pub spacing: Option<f64>,

    /// 演化步数
    #[arg(short = 'n', long)]
    pub steps: Option<usize>,

    /// 初始时间步长（同时作为每步上限）
    #[arg(long)]
    pub initial_dt: Option<f64>,

    /// 初始数据
    #[arg(long, value_enum)]
    pub initial_data: Option<InitialDataArg>,

    /// 黑洞质量（Schwarzschild）
    #[arg(long)]
    pub mass: Option<f64>,

    /// 输出目录
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 不导出中心线切片
    #[arg(long)]
    pub no_export: bool,
}

impl RunArgs {
    /// 合成最终配置
    fn resolve(&self) -> Result<EvolutionConfig> {
        let mut config = match &self.config {
            Some(path) => EvolutionConfig::from_file(path)
                .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
            None => EvolutionConfig::default(),
        };

        if let Some(nx) = self.nx {
            config.grid.nx = nx;
        }
        if let Some(ny) = self.ny {
            config.grid.ny = ny;
        }
        if let Some(nz) = self.nz {
            config.grid.nz = nz;
        }
        if let Some(h) = self.spacing {
            config.grid.spacing = [h; 3];
        }
        if let Some(steps) = self.steps {
            config.time.steps = steps;
        }
        if let Some(dt) = self.initial_dt {
            config.time.initial_dt = dt;
        }
        if let Some(kind) = self.initial_data {
            config.initial_data.kind = kind.into();
        }
        if let Some(mass) = self.mass {
            config.initial_data.mass = mass;
        }
        if let Some(dir) = &self.output {
            config.output.directory = dir.clone();
        }
        if self.no_export {
            config.output.export_slices = false;
        }

        config.validate().context("配置无效")?;
        Ok(config)
    }
}

/// 分配网格、填充初始数据并验证
pub fn prepare_grid(config: &EvolutionConfig) -> Result<Grid> {
    let mut grid = Grid::from_config(&config.grid).context("分配网格失败")?;
    let data = initial_data::from_config(&config.initial_data);
    data.populate(&mut grid)
        .with_context(|| format!("填充初始数据失败: {}", data.name()))?;

    let report = grid.validate(&NumericalTolerance::default());
    for w in &report.warnings {
        warn!("初始数据: {}", w);
    }
    if report.has_errors() {
        bail!("初始数据无效:\n{}", report);
    }
    Ok(grid)
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== NumRel 演化启动 ===");

    let config = args.resolve()?;
    let g = &config.grid;
    info!(
        "网格: {}×{}×{}, 间距 {:?}, 初始数据 {:?}",
        g.nx, g.ny, g.nz, g.spacing, config.initial_data.kind
    );
    info!(
        "时间: CFL={}, initial_dt={}, 步数={}",
        config.time.cfl, config.time.initial_dt, config.time.steps
    );

    let mut grid = prepare_grid(&config)?;

    let mut evolver = Rk4Evolver::from_config(&config).context("构建演化器失败")?;
    evolver.add_observer(Box::new(LoggingObserver::new(config.diagnostics.log_every)));
    if config.output.export_slices {
        std::fs::create_dir_all(&config.output.directory)?;
        evolver.add_observer(Box::new(SliceExporter::new(&config.output.directory)));
    }

    let start = Instant::now();
    let summary = evolver
        .evolve(&mut grid, config.time.initial_dt, config.time.steps)
        .context("演化失败")?;
    let elapsed = start.elapsed();
    let diagnostics = GlobalDiagnostics::measure(&grid);

    info!("=== 演化完成 ===");
    info!("总步数: {}", summary.steps);
    info!("最终时间: {:.6}", summary.final_time);
    info!("最后步长: {:.6}", summary.last_dt);
    info!(
        "约束: max|H|={:.3e}, L2(H)={:.3e}, max|M|={:.3e}",
        summary.constraint_norms.max_abs_h,
        summary.constraint_norms.l2_h,
        summary.constraint_norms.max_abs_m
    );
    match diagnostics.adm_mass {
        Some(mass) => info!("ADM 质量: {:.6}", mass),
        None => warn!("网格太小，无法估计 ADM 质量"),
    }
    info!("计算时间: {:.2} s", elapsed.as_secs_f64());

    if config.output.export_slices {
        let path = config.output.directory.join("summary.json");
        let json = serde_json::json!({
            "steps": summary.steps,
            "final_time": summary.final_time,
            "last_dt": summary.last_dt,
            "constraint_norms": summary.constraint_norms,
            "adm_mass": diagnostics.adm_mass,
            "hamiltonian_l1": diagnostics.hamiltonian_l1,
            "elapsed_seconds": elapsed.as_secs_f64(),
        });
        std::fs::write(&path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("无法写入 {}", path.display()))?;
        info!("汇总已写入: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(argv: &[&str]) -> RunArgs {
        TestCli::parse_from(std::iter::once("nr_cli").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&[
            "--nx", "8", "--spacing", "0.5", "--steps", "4",
            "--initial-data", "schwarzschild", "--mass", "0.3", "--no-export",
        ]);
        let config = args.resolve().unwrap();
        assert_eq!(config.grid.nx, 8);
        assert_eq!(config.grid.ny, EvolutionConfig::default().grid.ny);
        assert_eq!(config.grid.spacing, [0.5; 3]);
        assert_eq!(config.time.steps, 4);
        assert_eq!(config.initial_data.kind, InitialDataKind::Schwarzschild);
        assert_eq!(config.initial_data.mass, 0.3);
        assert!(!config.output.export_slices);
    }

    #[test]
    fn test_default_schwarzschild_run_validates() {
        let config = parse(&["--initial-data", "schwarzschild"]).resolve().unwrap();
        assert_eq!(config.initial_data.mass, 1.0);
        let grid = prepare_grid(&config).unwrap();
        assert!(grid.cells().iter().all(|c| c.gauge.alpha > 0.0));
    }

    #[test]
    fn test_short_schwarzschild_run_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_str().unwrap();
        let args = parse(&[
            "--initial-data", "schwarzschild", "--nx", "12", "--ny", "12", "--nz", "12",
            "--steps", "2", "--output", out,
        ]);
        execute(args).unwrap();
        let summary = std::fs::read_to_string(dir.path().join("summary.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(json["steps"], 2);
        assert!(json["adm_mass"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(parse(&["--nx", "2"]).resolve().is_err());
        assert!(parse(&["--initial-dt", "0"]).resolve().is_err());
    }
}
