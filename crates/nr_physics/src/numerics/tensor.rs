// crates/nr_physics/src/numerics/tensor.rs

//! 小型定长张量代数
//!
//! 所有张量都是 `[f64; 3]` 嵌套数组，收缩运算写成显式的定长循环，
//! 便于编译器展开与自动向量化。

/// 3x3 矩阵（度规、外曲率等二阶张量）
pub type Mat3 = [[f64; 3]; 3];

/// Christoffel 符号 `Γ^a_bc`，下标顺序 `[a][b][c]`
pub type Christoffel = [[[f64; 3]; 3]; 3];

/// 单位矩阵
pub const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// 零矩阵
pub const ZERO: Mat3 = [[0.0; 3]; 3];

/// 零 Christoffel 符号
pub const ZERO_CHRISTOFFEL: Christoffel = [[[0.0; 3]; 3]; 3];

/// 行列式
#[inline]
pub fn det(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// 3x3 求逆
///
/// `|det| < threshold` 时视为奇异并返回 `None`，调用方决定如何处理。
pub fn invert_3x3(m: &Mat3, threshold: f64) -> Option<Mat3> {
    let d = det(m);
    if d.is_nan() || d.abs() < threshold {
        return None;
    }
    let inv_det = 1.0 / d;

    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}

/// 全收缩 `Σ_ij A^ij B_ij`（例如 `K = γ^ij K_ij`）
#[inline]
pub fn contract(upper: &Mat3, lower: &Mat3) -> f64 {
    let mut sum = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            sum += upper[i][j] * lower[i][j];
        }
    }
    sum
}

/// 矩阵乘积 `A·B`
#[inline]
pub fn matmul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = ZERO;
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                out[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    out
}

/// 对称化 `(M + Mᵀ)/2`
///
/// 结果的 `[i][j]` 与 `[j][i]` 逐位相等。
#[inline]
pub fn symmetrize(m: &Mat3) -> Mat3 {
    let mut out = *m;
    for i in 0..3 {
        for j in (i + 1)..3 {
            let s = 0.5 * (m[i][j] + m[j][i]);
            out[i][j] = s;
            out[j][i] = s;
        }
    }
    out
}

/// `a + s·b`
#[inline]
pub fn add_scaled(a: &Mat3, b: &Mat3, s: f64) -> Mat3 {
    let mut out = *a;
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] += s * b[i][j];
        }
    }
    out
}

/// `s·m`
#[inline]
pub fn scale(m: &Mat3, s: f64) -> Mat3 {
    add_scaled(&ZERO, m, s)
}

/// 最大非对称分量 `max |M_ij - M_ji|`
pub fn asymmetry(m: &Mat3) -> f64 {
    let mut defect = 0.0f64;
    for i in 0..3 {
        for j in (i + 1)..3 {
            defect = defect.max((m[i][j] - m[j][i]).abs());
        }
    }
    defect
}

/// 所有分量是否有限
#[inline]
pub fn is_finite(m: &Mat3) -> bool {
    m.iter().flatten().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Mat3 {
        [[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]]
    }

    #[test]
    fn test_det_identity() {
        assert_eq!(det(&IDENTITY), 1.0);
        assert_eq!(det(&ZERO), 0.0);
    }

    #[test]
    fn test_invert_roundtrip() {
        let m = sample();
        let inv = invert_3x3(&m, 1e-14).unwrap();
        let prod = matmul(&m, &inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[i][j] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_invert_singular() {
        let m = [[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]];
        assert!(invert_3x3(&m, 1e-14).is_none());
        assert!(invert_3x3(&ZERO, 1e-14).is_none());
    }

    #[test]
    fn test_invert_nan_is_singular() {
        let mut m = IDENTITY;
        m[1][1] = f64::NAN;
        assert!(invert_3x3(&m, 1e-14).is_none());
    }

    #[test]
    fn test_contract_trace() {
        let m = sample();
        assert_eq!(contract(&IDENTITY, &m), 9.0);
    }

    #[test]
    fn test_symmetrize_exact() {
        let m = [[1.0, 0.1, 0.3], [0.2, 1.0, 0.7], [0.9, 0.4, 1.0]];
        let s = symmetrize(&m);
        assert_eq!(asymmetry(&s), 0.0);
        assert!((s[0][1] - 0.15).abs() < 1e-15);
    }
}
