// apps/nr_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示系统信息与默认配置。

use anyhow::Result;
use clap::Args;
use nr_config::EvolutionConfig;
use nr_foundation::NumericalTolerance;
use std::path::PathBuf;
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 配置文件路径（显示其解析结果）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 显示系统信息
    #[arg(long)]
    pub system: bool,

    /// 显示默认配置
    #[arg(long)]
    pub defaults: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== NumRel 信息 ===");

    if args.system {
        print_system_info();
    }

    if args.defaults {
        print_config("默认配置", &EvolutionConfig::default())?;
    }

    if let Some(path) = &args.config {
        let config = EvolutionConfig::from_file(path)?;
        print_config(&format!("配置 {}", path.display()), &config)?;
    }

    if args.config.is_none() && !args.system && !args.defaults {
        print_system_info();
        println!();
        print_config("默认配置", &EvolutionConfig::default())?;
    }

    Ok(())
}

fn print_system_info() {
    println!("=== 系统信息 ===");
    println!("NumRel CLI 版本: {}", env!("CARGO_PKG_VERSION"));
    println!("物理层级: {}", nr_physics::LAYER);
    println!("目标平台: {}", std::env::consts::ARCH);
    println!("操作系统: {}", std::env::consts::OS);
    println!("可用线程: {}", std::thread::available_parallelism().map_or(1, |n| n.get()));

    let tol = NumericalTolerance::default();
    println!("\n数值容差:");
    println!("  奇异行列式阈值: {:e}", tol.singular_det);
    println!("  对称性相对容差: {:e}", tol.symmetry_rel);
    println!("  lapse 警告阈值: {:e}", tol.lapse_warn);
}

fn print_config(title: &str, config: &EvolutionConfig) -> Result<()> {
    println!("=== {} ===", title);
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
