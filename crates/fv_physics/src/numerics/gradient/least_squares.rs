// crates/fv_physics/src/numerics/gradient/least_squares.rs

//! 最小二乘梯度
//!
//! 通过最小化加权最小二乘误差来计算梯度:
//! min Σ w_j (φ_j − φ_i − ∇φ_i · r_ij)²，w_j = 1/|r_ij|²
//!
//! 求解 3x3 法方程；1D/2D 网格中未使用的维度固定为单位行，梯度分量为零。
//! 邻居不足或法方程奇异时返回 `None`，由调用方置零。

use glam::{DMat3, DVec3};

use crate::state::N_VARS;

/// 法方程奇异判定的相对阈值
const DET_REL_MIN: f64 = 1e-12;

/// 最小距离平方（更近的邻居忽略）
const DIST_SQ_MIN: f64 = 1e-24;

/// 多变量加权最小二乘拟合
///
/// `offsets[j]` 为第 j 个邻居相对单元中心的偏移，`deltas[j]` 为各变量的差值。
/// 只使用前 `dimension` 个坐标分量。
pub fn fit_gradients(
    offsets: &[DVec3],
    deltas: &[[f64; N_VARS]],
    dimension: usize,
) -> Option<[DVec3; N_VARS]> {
    let mask = DVec3::new(
        1.0,
        if dimension > 1 { 1.0 } else { 0.0 },
        if dimension > 2 { 1.0 } else { 0.0 },
    );

    let mut a = DMat3::ZERO;
    let mut b = [DVec3::ZERO; N_VARS];
    let mut count = 0;

    for (offset, delta) in offsets.iter().zip(deltas) {
        let r = *offset * mask;
        let dist_sq = r.length_squared();
        if dist_sq < DIST_SQ_MIN {
            continue;
        }
        let w = 1.0 / dist_sq;
        a += DMat3::from_cols(r * (w * r.x), r * (w * r.y), r * (w * r.z));
        for k in 0..N_VARS {
            b[k] += r * (w * delta[k]);
        }
        count += 1;
    }

    if count < dimension {
        return None;
    }

    for k in dimension..3 {
        a.col_mut(k)[k] = 1.0;
    }

    let diag = a.x_axis.x * a.y_axis.y * a.z_axis.z;
    let det = a.determinant();
    if !(det.abs() > DET_REL_MIN * diag.abs()) {
        return None;
    }

    let inv = a.inverse();
    let mut grads = [DVec3::ZERO; N_VARS];
    for k in 0..N_VARS {
        let g = inv * b[k];
        if !g.is_finite() {
            return None;
        }
        grads[k] = g;
    }
    Some(grads)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_deltas(offsets: &[DVec3], g: DVec3) -> Vec<[f64; N_VARS]> {
        offsets.iter().map(|o| [g.dot(*o); N_VARS]).collect()
    }

    #[test]
    fn test_exact_for_linear_field_3d() {
        let offsets = vec![
            DVec3::new(1.0, 0.1, 0.0),
            DVec3::new(-0.5, 1.0, 0.2),
            DVec3::new(0.3, -0.4, 1.1),
            DVec3::new(-1.0, -0.2, -0.3),
        ];
        let g = DVec3::new(2.0, -1.0, 0.5);
        let grads = fit_gradients(&offsets, &linear_deltas(&offsets, g), 3).unwrap();
        for k in 0..N_VARS {
            assert!((grads[k] - g).length() < 1e-12);
        }
    }

    #[test]
    fn test_one_dimensional_pins_yz() {
        let offsets = vec![DVec3::new(1.0, 0.3, 0.0)];
        let deltas = vec![[2.0; N_VARS]];
        let grads = fit_gradients(&offsets, &deltas, 1).unwrap();
        assert!((grads[0].x - 2.0).abs() < 1e-14);
        assert_eq!(grads[0].y, 0.0);
        assert_eq!(grads[0].z, 0.0);
    }

    #[test]
    fn test_too_few_neighbours() {
        let offsets = vec![DVec3::X];
        assert!(fit_gradients(&offsets, &[[1.0; N_VARS]], 2).is_none());
    }

    #[test]
    fn test_collinear_neighbours_singular() {
        let offsets = vec![DVec3::X, -DVec3::X, 2.0 * DVec3::X];
        assert!(fit_gradients(&offsets, &linear_deltas(&offsets, DVec3::X), 2).is_none());
    }
}
