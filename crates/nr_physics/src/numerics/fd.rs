// crates/nr_physics/src/numerics/fd.rs

//! 有限差分引擎
//!
//! 按到边界的距离逐轴选择模板阶数：
//!
//! | 轴向坐标 i | 模板 |
//! |-----------|------|
//! | `2 ≤ i ≤ n-3` | 四阶中心 `(-f[i+2] + 8f[i+1] - 8f[i-1] + f[i-2]) / 12h` |
//! | `1 ≤ i ≤ n-2` | 二阶中心 `(f[i+1] - f[i-1]) / 2h` |
//! | `i = 0` | 一阶前向 `(f[i+1] - f[i]) / h` |
//! | `i = n-1` | 一阶后向 `(f[i] - f[i-1]) / h` |
//!
//! 二阶导数直接使用差分公式，不组合两次一阶导数。
//! 所有模板在构造上保证读取范围不超出 `[0, n-1]`。
//!
//! 模板对单元类型泛型，通过访问器 `Fn(&T) -> f64` 取出任意张量分量。

use crate::grid::{Extent, Spacing};
use crate::numerics::tensor::{Mat3, ZERO};

// ============================================================
// 轴与模板阶数
// ============================================================

/// 空间轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// x 轴
    X,
    /// y 轴
    Y,
    /// z 轴
    Z,
}

impl Axis {
    /// 全部三个轴
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// 张量下标
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// 一阶导数模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOrder {
    /// 四阶中心（5 点）
    Fourth,
    /// 二阶中心（3 点）
    Second,
    /// 一阶前向（低端边界）
    ForwardFirst,
    /// 一阶后向（高端边界）
    BackwardFirst,
}

/// 按轴向坐标选择模板
#[inline]
pub fn stencil_order(i: usize, n: usize) -> StencilOrder {
    if i >= 2 && i + 2 < n {
        StencilOrder::Fourth
    } else if i >= 1 && i + 1 < n {
        StencilOrder::Second
    } else if i == 0 {
        StencilOrder::ForwardFirst
    } else {
        StencilOrder::BackwardFirst
    }
}

/// 四阶中心差分
#[inline]
pub fn fourth_order_diff(f_p2: f64, f_p1: f64, f_m1: f64, f_m2: f64, h: f64) -> f64 {
    (-f_p2 + 8.0 * f_p1 - 8.0 * f_m1 + f_m2) / (12.0 * h)
}

/// 二阶中心差分
#[inline]
pub fn second_order_diff(f_p1: f64, f_m1: f64, h: f64) -> f64 {
    (f_p1 - f_m1) / (2.0 * h)
}

// ============================================================
// 模板视图
// ============================================================

/// 网格值上的差分模板视图
///
/// 借用扁平存储的数组，与网格索引约定一致。
#[derive(Debug, Clone, Copy)]
pub struct Stencil<'a, T> {
    values: &'a [T],
    extent: Extent,
    spacing: Spacing,
}

impl<'a, T> Stencil<'a, T> {
    /// 创建模板视图
    ///
    /// `values.len()` 必须等于 `extent.n_cells()`。
    pub fn new(values: &'a [T], extent: Extent, spacing: Spacing) -> Self {
        debug_assert_eq!(values.len(), extent.n_cells());
        Self {
            values,
            extent,
            spacing,
        }
    }

    /// 网格尺寸
    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// 沿轴把索引从坐标 `from` 移到 `to`
    #[inline]
    fn shift(&self, idx: usize, axis: Axis, from: usize, to: usize) -> usize {
        let s = self.extent.stride(axis);
        idx - from * s + to * s
    }

    /// 一阶偏导 ∂f/∂axis
    pub fn partial<F>(&self, idx: usize, axis: Axis, accessor: F) -> f64
    where
        F: Fn(&T) -> f64,
    {
        let n = self.extent.len(axis);
        let i = self.extent.coord(idx, axis);
        let s = self.extent.stride(axis);
        let h = self.spacing.along(axis);
        let f = |at: usize| accessor(&self.values[at]);

        match stencil_order(i, n) {
            StencilOrder::Fourth => {
                fourth_order_diff(f(idx + 2 * s), f(idx + s), f(idx - s), f(idx - 2 * s), h)
            }
            StencilOrder::Second => second_order_diff(f(idx + s), f(idx - s), h),
            StencilOrder::ForwardFirst => (f(idx + s) - f(idx)) / h,
            StencilOrder::BackwardFirst => (f(idx) - f(idx - s)) / h,
        }
    }

    /// 梯度 [∂x f, ∂y f, ∂z f]
    pub fn gradient<F>(&self, idx: usize, accessor: F) -> [f64; 3]
    where
        F: Fn(&T) -> f64,
    {
        Axis::ALL.map(|axis| self.partial(idx, axis, &accessor))
    }

    /// 二阶张量场的一阶偏导 ∂_axis M_ab
    pub fn partial_mat3<F>(&self, idx: usize, axis: Axis, accessor: F) -> Mat3
    where
        F: Fn(&T) -> &Mat3,
    {
        let mut out = ZERO;
        for a in 0..3 {
            for b in 0..3 {
                out[a][b] = self.partial(idx, axis, |c| accessor(c)[a][b]);
            }
        }
        out
    }

    /// 对称二阶张量场的一阶偏导，只计算上三角后镜像
    pub fn partial_sym<F>(&self, idx: usize, axis: Axis, accessor: F) -> Mat3
    where
        F: Fn(&T) -> &Mat3,
    {
        let mut out = ZERO;
        for a in 0..3 {
            for b in a..3 {
                let d = self.partial(idx, axis, |c| accessor(c)[a][b]);
                out[a][b] = d;
                out[b][a] = d;
            }
        }
        out
    }

    /// 对称二阶张量场的梯度，`out[c][a][b] = ∂_c M_ab`
    pub fn gradient_sym<F>(&self, idx: usize, accessor: F) -> [Mat3; 3]
    where
        F: Fn(&T) -> &Mat3,
    {
        Axis::ALL.map(|axis| self.partial_sym(idx, axis, &accessor))
    }

    /// 向量场的梯度，`out[c][a] = ∂_c V^a`
    pub fn gradient_vec3<F>(&self, idx: usize, accessor: F) -> [[f64; 3]; 3]
    where
        F: Fn(&T) -> [f64; 3],
    {
        Axis::ALL.map(|axis| [0, 1, 2].map(|a| self.partial(idx, axis, |c| accessor(c)[a])))
    }

    /// 二阶偏导 ∂²f/∂a∂b，对 (a, b) 对称
    ///
    /// 纯二阶导 `(f₊ - 2f + f₋)/h²`，在边界处改用单侧 `(f_i - 2f_{i±1} + f_{i±2})/h²`；
    /// 混合导 `(f₊₊ - f₊₋ - f₋₊ + f₋₋)/(4 hₐ h_b)`，边界处邻点钳制到网格内，
    /// 分母使用实际跨度。
    pub fn second_partial<F>(&self, idx: usize, a: Axis, b: Axis, accessor: F) -> f64
    where
        F: Fn(&T) -> f64,
    {
        let f = |at: usize| accessor(&self.values[at]);

        if a == b {
            let n = self.extent.len(a);
            let i = self.extent.coord(idx, a);
            let s = self.extent.stride(a);
            let h = self.spacing.along(a);
            let h2 = h * h;
            return if i >= 1 && i + 1 < n {
                (f(idx + s) - 2.0 * f(idx) + f(idx - s)) / h2
            } else if i == 0 {
                (f(idx) - 2.0 * f(idx + s) + f(idx + 2 * s)) / h2
            } else {
                (f(idx) - 2.0 * f(idx - s) + f(idx - 2 * s)) / h2
            };
        }

        let (a, b) = if a.index() < b.index() { (a, b) } else { (b, a) };
        let (ia, na) = (self.extent.coord(idx, a), self.extent.len(a));
        let (ib, nb) = (self.extent.coord(idx, b), self.extent.len(b));
        let (lo_a, hi_a) = (ia.saturating_sub(1), (ia + 1).min(na - 1));
        let (lo_b, hi_b) = (ib.saturating_sub(1), (ib + 1).min(nb - 1));

        let at = |pa: usize, pb: usize| {
            let moved = self.shift(idx, a, ia, pa);
            f(self.shift(moved, b, ib, pb))
        };

        let span_a = (hi_a - lo_a) as f64 * self.spacing.along(a);
        let span_b = (hi_b - lo_b) as f64 * self.spacing.along(b);

        (at(hi_a, hi_b) - at(hi_a, lo_b) - at(lo_a, hi_b) + at(lo_a, lo_b)) / (span_a * span_b)
    }

    /// Hessian 矩阵 `H_ab = ∂a∂b f`（对称）
    pub fn hessian<F>(&self, idx: usize, accessor: F) -> Mat3
    where
        F: Fn(&T) -> f64,
    {
        let mut out = ZERO;
        for a in Axis::ALL {
            for b in Axis::ALL {
                if b.index() < a.index() {
                    continue;
                }
                let v = self.second_partial(idx, a, b, &accessor);
                out[a.index()][b.index()] = v;
                out[b.index()][a.index()] = v;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// 在 n×n×n 网格上采样 f(x, y, z)，x = i·h
    fn sample<F: Fn(f64, f64, f64) -> f64>(n: usize, h: f64, f: F) -> (Vec<f64>, Extent, Spacing) {
        let extent = Extent::new(n, n, n).unwrap();
        let spacing = Spacing::uniform(h).unwrap();
        let values = (0..extent.n_cells())
            .map(|idx| {
                let (i, j, k) = extent.coords(idx);
                f(i as f64 * h, j as f64 * h, k as f64 * h)
            })
            .collect();
        (values, extent, spacing)
    }

    /// 固定物理点 x0 处的误差，网格需覆盖 [0, 1]
    fn error_at(n: usize, x0: f64, which: usize) -> f64 {
        let h = 1.0 / (n as f64 - 1.0);
        let (values, extent, spacing) = sample(n, h, |x, _, _| (x + 0.3).sin());
        let st = Stencil::new(&values, extent, spacing);
        let i = match which {
            0 => (x0 / h).round() as usize,
            1 => 1,
            _ => 0,
        };
        let x = i as f64 * h;
        let idx = extent.index(i, n / 2, n / 2);
        (st.partial(idx, Axis::X, |v| *v) - (x + 0.3).cos()).abs()
    }

    #[test]
    fn test_stencil_thresholds() {
        assert_eq!(stencil_order(0, 10), StencilOrder::ForwardFirst);
        assert_eq!(stencil_order(1, 10), StencilOrder::Second);
        assert_eq!(stencil_order(2, 10), StencilOrder::Fourth);
        assert_eq!(stencil_order(7, 10), StencilOrder::Fourth);
        assert_eq!(stencil_order(8, 10), StencilOrder::Second);
        assert_eq!(stencil_order(9, 10), StencilOrder::BackwardFirst);
        assert_eq!(stencil_order(1, 3), StencilOrder::Second);
        assert_eq!(stencil_order(2, 4), StencilOrder::Second);
    }

    #[test]
    fn test_primitives() {
        assert_eq!(second_order_diff(3.0, 1.0, 0.5), 2.0);
        // f(x) = x³ 在 x=0, h=1: 精确导数 0
        assert_eq!(fourth_order_diff(8.0, 1.0, -1.0, -8.0, 1.0), 0.0);
    }

    #[test]
    fn test_fourth_order_convergence() {
        let e1 = error_at(17, 0.5, 0);
        let e2 = error_at(33, 0.5, 0);
        let rate = (e1 / e2).log2();
        assert!(rate > 3.7, "rate = {}", rate);
    }

    #[test]
    fn test_second_order_near_boundary() {
        // 在 i = 1 处，x = h，误差 O(h²)
        let e1 = error_at(17, 0.0, 1);
        let e2 = error_at(33, 0.0, 1);
        let rate = (e1 / e2).log2();
        assert!(rate > 1.8 && rate < 2.5, "rate = {}", rate);
    }

    #[test]
    fn test_first_order_at_boundary() {
        let e1 = error_at(17, 0.0, 2);
        let e2 = error_at(33, 0.0, 2);
        let rate = (e1 / e2).log2();
        assert!(rate > 0.8 && rate < 1.3, "rate = {}", rate);
    }

    #[test]
    fn test_linear_field_exact_everywhere() {
        let (values, extent, spacing) = sample(6, 0.2, |x, y, z| 2.0 * x - 3.0 * y + 0.5 * z);
        let st = Stencil::new(&values, extent, spacing);
        for idx in 0..extent.n_cells() {
            let g = st.gradient(idx, |v| *v);
            assert!((g[0] - 2.0).abs() < 1e-12);
            assert!((g[1] + 3.0).abs() < 1e-12);
            assert!((g[2] - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hessian_of_quadratic() {
        let (values, extent, spacing) =
            sample(7, 0.1, |x, y, z| x * x + 3.0 * x * y - 2.0 * z * z + y * z);
        let st = Stencil::new(&values, extent, spacing);
        let expected = [[2.0, 3.0, 0.0], [3.0, 0.0, 1.0], [0.0, 1.0, -4.0]];
        // 二次函数的中心差分和单侧差分都精确
        for idx in 0..extent.n_cells() {
            let h = st.hessian(idx, |v| *v);
            for a in 0..3 {
                for b in 0..3 {
                    assert!(
                        (h[a][b] - expected[a][b]).abs() < 1e-8,
                        "idx {} [{}][{}] = {}",
                        idx,
                        a,
                        b,
                        h[a][b]
                    );
                }
            }
        }
    }

    #[test]
    fn test_mixed_partial_symmetric() {
        let (values, extent, spacing) = sample(5, 0.3, |x, y, z| (x * y).sin() + z * x);
        let st = Stencil::new(&values, extent, spacing);
        for idx in 0..extent.n_cells() {
            for a in Axis::ALL {
                for b in Axis::ALL {
                    assert_eq!(
                        st.second_partial(idx, a, b, |v| *v),
                        st.second_partial(idx, b, a, |v| *v)
                    );
                }
            }
        }
    }

    #[test]
    fn test_no_out_of_range_reads() {
        // 记录每次读取的索引，检查所有轴向坐标都在 [0, n-1]
        let extent = Extent::new(3, 4, 5).unwrap();
        let spacing = Spacing::uniform(1.0).unwrap();
        let values: Vec<usize> = (0..extent.n_cells()).collect();
        let reads = RefCell::new(Vec::new());
        let st = Stencil::new(&values, extent, spacing);
        let acc = |v: &usize| {
            reads.borrow_mut().push(*v);
            *v as f64
        };

        for idx in 0..extent.n_cells() {
            let (i0, j0, k0) = extent.coords(idx);
            reads.borrow_mut().clear();
            st.gradient(idx, acc);
            st.hessian(idx, acc);
            for &r in reads.borrow().iter() {
                assert!(r < extent.n_cells());
                let (i, j, k) = extent.coords(r);
                // 单次模板只沿所选轴移动，其余坐标最多偏离 1（混合导）或 2（单轴）
                assert!(i.abs_diff(i0) <= 2 && j.abs_diff(j0) <= 2 && k.abs_diff(k0) <= 2);
            }
        }
    }
}
