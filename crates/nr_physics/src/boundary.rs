// crates/nr_physics/src/boundary.rs

//! 边界条件
//!
//! 边界单元（任一轴坐标为 0 或 N-1）不参与内部演化，
//! 每步开始前由边界条件一次性设置。

use crate::grid::{Extent, Grid};

/// 边界条件
pub trait BoundaryCondition: Send + Sync {
    /// 名称
    fn name(&self) -> &'static str;

    /// 设置所有边界单元
    fn apply(&self, grid: &mut Grid);
}

/// 边缘复制外推
///
/// 每个边界单元复制其坐标钳制到 `[1, N-2]` 后的最近内部单元的
/// 规范变量、几何与外曲率。
#[derive(Debug, Clone, Default)]
pub struct EdgeCopy {
    /// (边界单元, 源内部单元)
    pairs: Vec<(usize, usize)>,
}

impl EdgeCopy {
    /// 为给定网格尺寸预计算复制对
    pub fn new(extent: Extent) -> Self {
        let clamp = |c: usize, n: usize| c.clamp(1, n - 2);
        let pairs = (0..extent.n_cells())
            .filter(|&idx| !extent.is_interior(idx))
            .map(|idx| {
                let (i, j, k) = extent.coords(idx);
                let src = extent.index(
                    clamp(i, extent.nx()),
                    clamp(j, extent.ny()),
                    clamp(k, extent.nz()),
                );
                (idx, src)
            })
            .collect();
        Self { pairs }
    }

    /// 边界单元数
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// 是否没有边界单元
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl BoundaryCondition for EdgeCopy {
    fn name(&self) -> &'static str {
        "edge-copy"
    }

    fn apply(&self, grid: &mut Grid) {
        let cells = grid.cells_mut();
        for &(dst, src) in &self.pairs {
            let source = cells[src];
            let target = &mut cells[dst];
            target.gauge = source.gauge;
            target.geom = source.geom;
            target.curv = source.curv;
        }
    }
}
