// crates/fv_physics/src/numerics/gradient/curvilinear.rs

//! 曲线坐标梯度（8 节点六面体）
//!
//! 三线性映射 x(ξ, η, ζ) 在单元中心的 Jacobian：
//!
//! ```text
//! J = [∂x/∂ξ  ∂x/∂η  ∂x/∂ζ],   ∂x/∂ξ = Σ ξ_i x_i / 8
//! ```
//!
//! 邻居偏移经 J⁻¹ 映射到计算空间，在计算空间做加权最小二乘得到 ∇_ξ φ，
//! 再由 ∇_x φ = J⁻ᵀ ∇_ξ φ 变换回物理空间。节点按 VTK 六面体顺序排列。

use glam::{DMat3, DVec3};

use super::least_squares::fit_gradients;
use crate::state::N_VARS;

/// Jacobian 奇异判定的相对阈值
const JACOBIAN_REL_MIN: f64 = 1e-12;

/// VTK 六面体节点的计算坐标符号
const HEX_SIGNS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// 单元中心处的 Jacobian，奇异时返回 `None`
pub fn center_jacobian(nodes: &[DVec3]) -> Option<DMat3> {
    if nodes.len() != 8 {
        return None;
    }
    let mut cols = [DVec3::ZERO; 3];
    for (x, s) in nodes.iter().zip(HEX_SIGNS.iter()) {
        for a in 0..3 {
            cols[a] += s[a] * *x;
        }
    }
    let j = DMat3::from_cols(cols[0] / 8.0, cols[1] / 8.0, cols[2] / 8.0);

    let scale = cols.iter().map(|c| c.length() / 8.0).product::<f64>();
    if !(j.determinant().abs() > JACOBIAN_REL_MIN * scale) {
        return None;
    }
    Some(j)
}

/// 曲线坐标拟合结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurvilinearFit {
    /// 物理空间梯度
    Gradient([DVec3; N_VARS]),
    /// 计算空间法方程奇异或邻居不足
    Underdetermined,
    /// Jacobian 奇异，应改用最小二乘
    SingularJacobian,
}

/// 曲线坐标梯度
pub fn curvilinear_gradients(
    nodes: &[DVec3],
    offsets: &[DVec3],
    deltas: &[[f64; N_VARS]],
) -> CurvilinearFit {
    let Some(j) = center_jacobian(nodes) else {
        return CurvilinearFit::SingularJacobian;
    };
    let j_inv = j.inverse();
    let j_inv_t = j_inv.transpose();

    let xi_offsets: Vec<DVec3> = offsets.iter().map(|o| j_inv * *o).collect();
    match fit_gradients(&xi_offsets, deltas, 3) {
        Some(grads) => CurvilinearFit::Gradient(grads.map(|g| j_inv_t * g)),
        None => CurvilinearFit::Underdetermined,
    }
}
