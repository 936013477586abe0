// crates/nr_config/src/lib.rs

//! NumRel Config Layer (Layer 2)
//!
//! 配置层，提供演化参数的加载、验证与保存。
//!
//! # 模块概览
//!
//! - [`evolution_config`]: EvolutionConfig 演化配置（全 f64）
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 4: nr_cli        ─> uses EvolutionConfig
//! Layer 3: nr_physics    ─> Grid, Rk4Evolver::from_config
//! Layer 2: nr_config     ─> EvolutionConfig (本层)
//! Layer 1: nr_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod evolution_config;

/// 层级标识
pub const LAYER: u8 = 2;

// 重导出核心类型
pub use error::ConfigError;
pub use evolution_config::{
    DiagnosticsConfig, EvolutionConfig, GaugeConfig, GridConfig, InitialDataConfig,
    InitialDataKind, OutputConfig, ParallelConfig, ParallelKind, ShiftKind, SlicingKind,
    TimeConfig,
};
