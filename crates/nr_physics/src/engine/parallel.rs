// crates/nr_physics/src/engine/parallel.rs

//! 体积并行遍历
//!
//! 把"对每个单元执行操作"的三重循环封装为高阶函数，
//! 每次遍历是一个独立的 fork-join 并行区域。
//!
//! 遍历分为两类，且从不混用：
//! - `map_*`：只读访问网格，产出按扁平索引排列的结果数组
//! - `update_*`：每个单元只拿到自己的 `&mut`，写入前一遍历的结果
//!
//! 同一遍历内不存在"读邻居、写自己"的交叉，因此无需加锁，
//! 结果与执行顺序无关。

use nr_config::{ParallelConfig, ParallelKind};
use nr_foundation::NrResult;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::grid::Extent;

// ============================================================
// 配置
// ============================================================

/// 并行策略
///
/// - `Sequential`: 完全串行执行，适用于小规模问题与调试
/// - `Parallel`: 始终使用 rayon 并行
/// - `Auto`: 单元数达到阈值时并行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParallelStrategy {
    /// 串行执行
    Sequential,
    /// 并行执行
    Parallel,
    /// 自动选择（根据问题规模）
    #[default]
    Auto,
}

impl From<ParallelKind> for ParallelStrategy {
    fn from(kind: ParallelKind) -> Self {
        match kind {
            ParallelKind::Sequential => Self::Sequential,
            ParallelKind::Parallel => Self::Parallel,
            ParallelKind::Auto => Self::Auto,
        }
    }
}

// ============================================================
// 并行体积遍历器
// ============================================================

/// 体积遍历器
#[derive(Debug, Clone, Copy)]
pub struct ParallelVolume {
    extent: Extent,
    strategy: ParallelStrategy,
    min_parallel_cells: usize,
}

impl ParallelVolume {
    /// Auto 策略的默认并行阈值
    pub const DEFAULT_MIN_PARALLEL_CELLS: usize = 4096;

    /// 创建遍历器
    pub fn new(extent: Extent, strategy: ParallelStrategy) -> Self {
        Self {
            extent,
            strategy,
            min_parallel_cells: Self::DEFAULT_MIN_PARALLEL_CELLS,
        }
    }

    /// 从配置创建
    pub fn from_config(extent: Extent, config: &ParallelConfig) -> Self {
        Self::new(extent, config.strategy.into()).with_min_parallel_cells(config.min_parallel_cells)
    }

    /// 设置 Auto 策略的并行阈值
    pub fn with_min_parallel_cells(mut self, n: usize) -> Self {
        self.min_parallel_cells = n;
        self
    }

    /// 网格尺寸
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// 当前策略
    pub fn strategy(&self) -> ParallelStrategy {
        self.strategy
    }

    /// 本网格是否走并行路径
    pub fn is_parallel(&self) -> bool {
        match self.strategy {
            ParallelStrategy::Sequential => false,
            ParallelStrategy::Parallel => true,
            ParallelStrategy::Auto => self.extent.n_cells() >= self.min_parallel_cells,
        }
    }

    /// 对所有单元求值
    pub fn map_all<R, F>(&self, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync + Send,
    {
        let n = self.extent.n_cells();
        if self.is_parallel() {
            (0..n).into_par_iter().map(f).collect()
        } else {
            (0..n).map(f).collect()
        }
    }

    /// 所有单元上 `f` 的最大值，下限为 `floor`
    ///
    /// 只接受有限非负值，其余被忽略。并行路径使用原子归约，
    /// 非负 f64 的位模式与数值同序，因此结果与串行路径逐位一致。
    pub fn max_all<F>(&self, floor: f64, f: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync + Send,
    {
        let accept = |v: f64| v.is_finite() && v >= 0.0;
        let n = self.extent.n_cells();
        if self.is_parallel() {
            let max = AtomicU64::new(floor.to_bits());
            (0..n).into_par_iter().for_each(|idx| {
                let v = f(idx);
                if accept(v) {
                    max.fetch_max(v.to_bits(), Ordering::Relaxed);
                }
            });
            f64::from_bits(max.load(Ordering::Relaxed))
        } else {
            (0..n).map(f).filter(|&v| accept(v)).fold(floor, f64::max)
        }
    }

    /// 对内部单元求值，边界单元填充 `R::default()`
    ///
    /// 返回数组长度为 `n_cells`，按扁平索引对齐。
    pub fn map_interior<R, F>(&self, f: F) -> Vec<R>
    where
        R: Send + Default,
        F: Fn(usize) -> R + Sync + Send,
    {
        let extent = self.extent;
        self.map_all(|idx| if extent.is_interior(idx) { f(idx) } else { R::default() })
    }

    /// 更新所有单元
    pub fn update_all<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        debug_assert_eq!(items.len(), self.extent.n_cells());
        if self.is_parallel() {
            items.par_iter_mut().enumerate().for_each(|(idx, item)| f(idx, item));
        } else {
            items.iter_mut().enumerate().for_each(|(idx, item)| f(idx, item));
        }
    }

    /// 只更新内部单元，边界单元保持不变
    pub fn update_interior<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        let extent = self.extent;
        self.update_all(items, |idx, item| {
            if extent.is_interior(idx) {
                f(idx, item)
            }
        });
    }

    /// 可失败的全单元更新
    ///
    /// 串行路径在第一个错误处停止；并行路径返回任意一个失败单元的错误。
    pub fn try_update_all<T, F>(&self, items: &mut [T], f: F) -> NrResult<()>
    where
        T: Send,
        F: Fn(usize, &mut T) -> NrResult<()> + Sync + Send,
    {
        debug_assert_eq!(items.len(), self.extent.n_cells());
        if self.is_parallel() {
            items
                .par_iter_mut()
                .enumerate()
                .try_for_each(|(idx, item)| f(idx, item))
        } else {
            items
                .iter_mut()
                .enumerate()
                .try_for_each(|(idx, item)| f(idx, item))
        }
    }
}
