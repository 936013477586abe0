// apps/nr_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 检查配置文件的 JSON 格式、字段取值与若干易错的组合。

use anyhow::{bail, Context, Result};
use clap::Args;
use nr_config::{EvolutionConfig, InitialDataKind};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// 配置文件允许的顶层字段
const KNOWN_SECTIONS: [&str; 7] = [
    "grid",
    "time",
    "gauge",
    "initial_data",
    "diagnostics",
    "parallel",
    "output",
];

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn is_ok_strict(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== NumRel 配置验证 ===");

    let Some(config_path) = &args.config else {
        println!("用法: nr_cli validate --config <配置文件> [--strict]");
        return Ok(());
    };

    let mut result = ValidationResult::default();
    validate_config(config_path, &mut result)?;
    print_validation_result(&result, args.strict)
}

fn validate_config(path: &Path, result: &mut ValidationResult) -> Result<()> {
    println!("\n检查配置文件: {}", path.display());

    if !path.exists() {
        result.add_error(format!("配置文件不存在: {}", path.display()));
        return Ok(());
    }

    let content = std::fs::read_to_string(path).context("无法读取配置文件")?;

    let json: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            result.add_error(format!("JSON 解析错误: {}", e));
            return Ok(());
        }
    };

    match json.as_object() {
        Some(map) => {
            for key in map.keys() {
                if !KNOWN_SECTIONS.contains(&key.as_str()) {
                    result.add_warning(format!("未知的配置段: {}（将被忽略）", key));
                }
            }
        }
        None => {
            result.add_error("配置文件顶层必须是 JSON 对象");
            return Ok(());
        }
    }

    match EvolutionConfig::from_json(&content) {
        Ok(config) => {
            check_combinations(&config, result);
            println!("  ✓ 配置文件格式有效");
        }
        Err(e) => result.add_error(e.to_string()),
    }

    Ok(())
}

fn check_combinations(config: &EvolutionConfig, result: &mut ValidationResult) {
    let g = &config.grid;
    let n_cells = g.nx * g.ny * g.nz;
    if n_cells > 10_000_000 {
        result.add_warning(format!("网格单元数 {} 较大，内存占用可能过高", n_cells));
    }

    if config.time.steps == 0 {
        result.add_warning("time.steps = 0，不会执行任何演化步");
    }

    let h_min = g.spacing.iter().cloned().fold(f64::INFINITY, f64::min);
    let cfl_dt = config.time.cfl * h_min / config.time.characteristic_speed;
    if config.time.initial_dt > cfl_dt {
        result.add_warning(format!(
            "initial_dt = {} 超过 CFL 上界 {:.6}，实际步长将被限制",
            config.time.initial_dt, cfl_dt
        ));
    }

    if config.initial_data.kind == InitialDataKind::Schwarzschild {
        let origin = g.resolved_origin();
        let n = [g.nx, g.ny, g.nz];
        let inside = (0..3).all(|a| {
            let lo = origin[a];
            let hi = origin[a] + (n[a] as f64 - 1.0) * g.spacing[a];
            (lo..=hi).contains(&config.initial_data.center[a])
        });
        if !inside {
            result.add_warning("Schwarzschild 穿刺中心位于网格之外");
        }
        if config.initial_data.mass > 0.25 * h_min * (n_cells as f64).cbrt() {
            result.add_warning(format!(
                "黑洞质量 {} 相对于网格范围较大，边界可能影响演化",
                config.initial_data.mass
            ));
        }
    }

    if !config.diagnostics.constraint_stages.iter().any(|&s| s) {
        result.add_warning("所有 RK 级均未计算约束，中间诊断不可用");
    }
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!("\n=== 验证结果 ===");

    if !result.errors.is_empty() {
        println!("\n错误 ({}):", result.errors.len());
        for err in &result.errors {
            error!("  ✗ {}", err);
            println!("  ✗ {}", err);
        }
    }

    if !result.warnings.is_empty() {
        println!("\n警告 ({}):", result.warnings.len());
        for warning in &result.warnings {
            warn!("  ⚠ {}", warning);
            println!("  ⚠ {}", warning);
        }
    }

    let success = if strict {
        result.is_ok_strict()
    } else {
        result.is_ok()
    };

    if success {
        println!("\n✓ 验证通过");
        Ok(())
    } else {
        println!("\n✗ 验证失败");
        bail!(
            "验证失败：发现 {} 个错误，{} 个警告",
            result.errors.len(),
            result.warnings.len()
        )
    }
}
