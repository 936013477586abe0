// crates/nr_physics/src/engine/mod.rs

//! 演化引擎模块
//!
//! # 模块结构
//!
//! - `evolution` - RK4 演化驱动与级缓冲
//! - `timestep` - CFL 时间步控制
//! - `parallel` - 单元级并行遍历

pub mod evolution;
pub mod parallel;
pub mod timestep;

// 重导出常用类型
pub use evolution::{
    evolve, ConstraintSchedule, EvolutionSummary, EvolvedState, Rk4Evolver, RkStage,
    StageBuffers, StageRates, StepPhase, StepReport,
};
pub use parallel::{ParallelStrategy, ParallelVolume};
pub use timestep::CflCalculator;
