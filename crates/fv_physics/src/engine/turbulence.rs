// crates/fv_physics/src/engine/turbulence.rs

//! 湍流模型挂钩
//!
//! 湍流方程本身由外部实现。编排器在第一个物理步的梯度准备完成后调用
//! `initialize`，在每个物理步的子迭代结束后调用 `solve`。

use crate::mesh::Mesh;
use crate::state::{CellGradient, FlowState};

/// 湍流模型
pub trait TurbulenceModel {
    /// 初始化（首个物理步）
    fn initialize(&mut self, mesh: &Mesh, state: &FlowState, gradients: &[CellGradient]);

    /// 推进一步，返回 (k 残差, ω 残差)
    fn solve(&mut self, mesh: &Mesh, state: &FlowState, gradients: &[CellGradient]) -> (f64, f64);

    /// 名称
    fn name(&self) -> &'static str {
        "turbulence"
    }
}
