// apps/nr_cli/src/main.rs

//! NumRel 命令行界面
//!
//! `run` 执行 RK4 演化，`info` 打印默认配置与数值容差，
//! `validate` 检查配置文件。全局参数 `--log-level` 控制 tracing 输出。

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// NumRel ADM 演化命令行工具
#[derive(Parser)]
#[command(name = "nr_cli", version, about = "NumRel ADM time-evolution engine", long_about = None)]
struct Cli {
    /// 日志级别
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// 日志中显示线程名（并行遍历时有用）
    #[arg(long, global = true)]
    log_threads: bool,

    #[command(subcommand)]
    command: Commands,
}

/// tracing 日志级别
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// 运行演化
    Run(commands::run::RunArgs),
    /// 显示默认配置与系统信息
    Info(commands::info::InfoArgs),
    /// 验证配置文件
    Validate(commands::validate::ValidateArgs),
}

impl Commands {
    fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Run(args) => commands::run::execute(args),
            Self::Info(args) => commands::info::execute(args),
            Self::Validate(args) => commands::validate::execute(args),
        }
    }
}

fn init_tracing(level: LogLevel, thread_names: bool) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(level))
        .with_target(false)
        .with_thread_names(thread_names)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level, cli.log_threads)?;
    cli.command.execute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_after_subcommand() {
        let cli = Cli::parse_from(["nr_cli", "info", "--defaults", "--log-level", "debug"]);
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(matches!(cli.command, Commands::Info(_)));
        assert_eq!(Level::from(cli.log_level), Level::DEBUG);
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        assert!(Cli::try_parse_from(["nr_cli", "-l", "verbose", "info"]).is_err());
    }
}
