// crates/nr_physics/src/lib.rs

//! NumRel 物理层
//!
//! 在三维笛卡尔网格上以 ADM 形式演化 3+1 时空，包括：
//! - 网格状态 (grid)
//! - 张量代数与有限差分 (numerics)
//! - Christoffel/Ricci (geometry)
//! - 规范条件与 ADM 右端项 (gauge, adm)
//! - Hamiltonian/动量约束 (constraints)
//! - ADM 质量等全局诊断量 (diagnostics)
//! - 边界条件与初始数据 (boundary, initial_data)
//! - 演化引擎 (engine) - RK4 驱动、CFL 时间步、并行遍历
//! - 步观察者 (observer)
//!
//! # 示例
//!
//! ```
//! use nr_physics::prelude::*;
//!
//! let extent = Extent::new(6, 6, 6).unwrap();
//! let mut grid = Grid::centered(extent, Spacing::uniform(0.2).unwrap());
//! FlatSpace.populate(&mut grid).unwrap();
//!
//! let summary = evolve(&mut grid, 0.05, 2).unwrap();
//! assert_eq!(summary.steps, 2);
//! assert_eq!(grid.cells()[extent.center()].gauge.alpha, 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adm;
pub mod boundary;
pub mod constraints;
pub mod diagnostics;
pub mod engine;
pub mod gauge;
pub mod geometry;
pub mod grid;
pub mod initial_data;
pub mod numerics;
pub mod observer;

pub use engine::evolution;
pub use numerics::fd;

/// 层级标识
pub const LAYER: u8 = 3;

// 重导出常用类型
pub use adm::{adm_rates, AdmRates};
pub use boundary::{BoundaryCondition, EdgeCopy};
pub use constraints::{ConstraintEvaluator, ConstraintNorms, ConstraintValues};
pub use diagnostics::GlobalDiagnostics;
pub use engine::{
    evolve, CflCalculator, ConstraintSchedule, EvolutionSummary, EvolvedState, ParallelStrategy,
    ParallelVolume, Rk4Evolver, RkStage, StageBuffers, StageRates, StepPhase, StepReport,
};
pub use gauge::GaugeConditions;
pub use grid::{Cell, Extent, Grid, ScalarField, Spacing};
pub use initial_data::{FlatSpace, InitialData, SchwarzschildPuncture};
pub use numerics::{Axis, Christoffel, Mat3, Stencil, StencilOrder};
pub use observer::{LoggingObserver, SliceExporter, StepObserver};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::diagnostics::GlobalDiagnostics;
    pub use crate::engine::{evolve, Rk4Evolver, StepPhase, StepReport};
    pub use crate::grid::{Cell, Extent, Grid, Spacing};
    pub use crate::initial_data::{FlatSpace, InitialData, SchwarzschildPuncture};
    pub use crate::observer::{LoggingObserver, SliceExporter, StepObserver};
    pub use nr_foundation::{NrError, NrResult};
}
