// crates/nr_physics/src/numerics/mod.rs

//! 数值基础模块
//!
//! - `tensor` - 3×3 对称张量代数与求逆
//! - `fd` - 有限差分模板（四阶/二阶中心、一阶单侧）

pub mod fd;
pub mod tensor;

// 重导出常用类型
pub use fd::{Axis, Stencil, StencilOrder};
pub use tensor::{Christoffel, Mat3};
