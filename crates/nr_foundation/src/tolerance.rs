// crates/nr_foundation/src/tolerance.rs

//! 数值容差配置
//!
//! 集中管理演化过程中用到的阈值，通过参数注入传递，不使用全局状态。

use serde::{Deserialize, Serialize};

/// 数值容差配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericalTolerance {
    /// 3x3 求逆的行列式阈值，|det| 低于此值视为奇异
    pub singular_det: f64,
    /// 张量对称性相对容差
    pub symmetry_rel: f64,
    /// 最小特征速度，防止 CFL 除零
    pub min_speed: f64,
    /// 低 lapse 警告阈值
    pub lapse_warn: f64,
}

impl Default for NumericalTolerance {
    fn default() -> Self {
        Self {
            singular_det: 1e-14,
            symmetry_rel: 1e-12,
            min_speed: 1e-12,
            lapse_warn: 1e-3,
        }
    }
}

impl NumericalTolerance {
    /// 创建保守配置（更严格的容差）
    pub fn conservative() -> Self {
        Self {
            singular_det: 1e-12,
            symmetry_rel: 1e-14,
            min_speed: 1e-10,
            lapse_warn: 1e-2,
        }
    }
}
