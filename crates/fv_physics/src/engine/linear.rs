// crates/fv_physics/src/engine/linear.rs

//! 线性系统接口
//!
//! 系数组装与稀疏求解由外部实现，编排器只通过 [`LinearSystem`] 调用。
//! 每个物理步先 `initialize`，每个子步依次 `assemble` →
//! `add_pseudo_time_terms`（多子步时）→ `solve`。
//!
//! [`FixedIncrementSystem`] 是确定性的替身实现：每次求解给出固定增量
//! （可按子步衰减），并按欧拉通量积分边界通量，供测试和 CLI 试运行使用。

use std::collections::BTreeMap;

use fv_config::LinearSolverConfig;
use thiserror::Error;

use crate::eos::EquationOfState;
use crate::mesh::{BoundaryTag, Mesh};
use crate::state::{CellGradient, FlowState, Increment};

/// 边界通量分量数 (质量, 动量 x/y/z, 能量)
pub const N_FLUX: usize = 5;

/// 线性求解报告
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearSolveReport {
    /// 迭代次数
    pub iterations: usize,
    /// 最终残差范数
    pub residual_norm: f64,
}

/// 线性求解失败
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct LinearSolveError(pub String);

/// 外部线性系统
pub trait LinearSystem {
    /// 物理步开始时调用一次
    fn initialize(&mut self, mesh: &Mesh, state: &FlowState, eos: &dyn EquationOfState);

    /// 组装系数矩阵与右端项
    fn assemble(
        &mut self,
        mesh: &Mesh,
        state: &FlowState,
        gradients: &[CellGradient],
        eos: &dyn EquationOfState,
    );

    /// 加入伪时间项（仅多子步时调用）
    fn add_pseudo_time_terms(&mut self, mesh: &Mesh, state: &FlowState);

    /// 求解，增量写入 `update`（长度为单元总数）
    fn solve(&mut self, update: &mut [Increment]) -> Result<LinearSolveReport, LinearSolveError>;

    /// 清零累积的边界通量
    fn reset_boundary_fluxes(&mut self);

    /// 本分区在某边界上累积的通量
    fn boundary_fluxes(&self, boundary: usize) -> [f64; N_FLUX];
}

/// 借用的线性系统，调用方在运行后仍可检查其状态
impl<T: LinearSystem + ?Sized> LinearSystem for &mut T {
    fn initialize(&mut self, mesh: &Mesh, state: &FlowState, eos: &dyn EquationOfState) {
        (**self).initialize(mesh, state, eos)
    }

    fn assemble(
        &mut self,
        mesh: &Mesh,
        state: &FlowState,
        gradients: &[CellGradient],
        eos: &dyn EquationOfState,
    ) {
        (**self).assemble(mesh, state, gradients, eos)
    }

    fn add_pseudo_time_terms(&mut self, mesh: &Mesh, state: &FlowState) {
        (**self).add_pseudo_time_terms(mesh, state)
    }

    fn solve(&mut self, update: &mut [Increment]) -> Result<LinearSolveReport, LinearSolveError> {
        (**self).solve(update)
    }

    fn reset_boundary_fluxes(&mut self) {
        (**self).reset_boundary_fluxes()
    }

    fn boundary_fluxes(&self, boundary: usize) -> [f64; N_FLUX] {
        (**self).boundary_fluxes(boundary)
    }
}

// ============================================================
// 确定性替身
// ============================================================

/// 固定增量线性系统
#[derive(Debug, Clone)]
pub struct FixedIncrementSystem {
    increment: Increment,
    /// 子步衰减因子：第 k 个子步的增量为 increment · decay^k
    decay: f64,
    /// 在第几次求解（从 1 计）时失败
    fail_at: Option<usize>,
    max_iterations: usize,
    n_owned: usize,
    substep: usize,
    solves: usize,
    assembled: bool,
    pseudo_terms: usize,
    fluxes: BTreeMap<usize, [f64; N_FLUX]>,
}

impl Default for FixedIncrementSystem {
    fn default() -> Self {
        Self::new(&LinearSolverConfig::default())
    }
}

impl FixedIncrementSystem {
    /// 创建零增量系统
    pub fn new(config: &LinearSolverConfig) -> Self {
        Self {
            increment: Increment::default(),
            decay: 1.0,
            fail_at: None,
            max_iterations: config.max_iterations.max(1),
            n_owned: 0,
            substep: 0,
            solves: 0,
            assembled: false,
            pseudo_terms: 0,
            fluxes: BTreeMap::new(),
        }
    }

    /// 设置每个拥有单元的增量
    pub fn with_increment(mut self, increment: Increment) -> Self {
        self.increment = increment;
        self
    }

    /// 设置子步衰减因子
    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    /// 第 n 次求解时返回错误
    pub fn fail_at_solve(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    /// 累计求解次数
    pub fn solve_count(&self) -> usize {
        self.solves
    }

    /// 累计伪时间项调用次数
    pub fn pseudo_term_count(&self) -> usize {
        self.pseudo_terms
    }
}

impl LinearSystem for FixedIncrementSystem {
    fn initialize(&mut self, mesh: &Mesh, state: &FlowState, eos: &dyn EquationOfState) {
        self.n_owned = mesh.n_owned();
        self.substep = 0;
        self.assembled = false;

        // 每个物理步按当前状态积分一次边界通量
        for face in mesh.faces() {
            let BoundaryTag::Boundary(id) = face.tag else {
                continue;
            };
            let s = &state.cells[face.parent];
            let dt = state.dt.get(face.parent).copied().unwrap_or(0.0);
            let p_abs = s.p + eos.p_ref();
            let un = s.v.dot(face.normal) * face.area;
            let mass = s.rho * un;
            let momentum = s.v * mass + face.normal * (p_abs * face.area);
            let energy = (p_abs + 0.5 * s.rho * s.v.length_squared()) * un;

            let acc = self.fluxes.entry(id).or_insert([0.0; N_FLUX]);
            acc[0] += mass * dt;
            acc[1] += momentum.x * dt;
            acc[2] += momentum.y * dt;
            acc[3] += momentum.z * dt;
            acc[4] += energy * dt;
        }
    }

    fn assemble(
        &mut self,
        mesh: &Mesh,
        _state: &FlowState,
        _gradients: &[CellGradient],
        _eos: &dyn EquationOfState,
    ) {
        self.n_owned = mesh.n_owned();
        self.assembled = true;
    }

    fn add_pseudo_time_terms(&mut self, _mesh: &Mesh, _state: &FlowState) {
        self.pseudo_terms += 1;
    }

    fn solve(&mut self, update: &mut [Increment]) -> Result<LinearSolveReport, LinearSolveError> {
        self.solves += 1;
        if self.fail_at == Some(self.solves) {
            return Err(LinearSolveError(format!(
                "迭代 {} 次后未收敛",
                self.max_iterations
            )));
        }
        if !self.assembled {
            return Err(LinearSolveError("求解前未组装系统".into()));
        }
        self.assembled = false;

        let scale = self.decay.powi(self.substep as i32);
        self.substep += 1;
        let inc = Increment {
            dp: self.increment.dp * scale,
            dv: self.increment.dv * scale,
            dt: self.increment.dt * scale,
        };
        for (c, u) in update.iter_mut().enumerate() {
            *u = if c < self.n_owned { inc } else { Increment::default() };
        }

        Ok(LinearSolveReport { iterations: 1, residual_norm: 0.0 })
    }

    fn reset_boundary_fluxes(&mut self) {
        self.fluxes.clear();
    }

    fn boundary_fluxes(&self, boundary: usize) -> [f64; N_FLUX] {
        self.fluxes.get(&boundary).copied().unwrap_or([0.0; N_FLUX])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::IdealGas;
    use crate::mesh::BoxMeshParams;
    use crate::state::PrimitiveState;
    use glam::DVec3;

    #[test]
    fn test_increment_only_on_owned_cells() {
        let mesh = BoxMeshParams::line(3, 3.0).build_partitions(1).unwrap().remove(0);
        let gas = IdealGas::new(28.97, 1.4).unwrap();
        let state = FlowState::uniform(mesh.n_cells(), PrimitiveState::from_eos(&gas, 1e5, DVec3::ZERO, 300.0), 1e-3);
        let mut sys = FixedIncrementSystem::default()
            .with_increment(Increment { dp: 2.0, dv: DVec3::X, dt: 0.5 })
            .with_decay(0.5);

        sys.initialize(&mesh, &state, &gas);
        let mut update = vec![Increment::default(); mesh.n_cells()];
        for expected in [2.0, 1.0] {
            sys.assemble(&mesh, &state, &[], &gas);
            sys.solve(&mut update).unwrap();
            assert_eq!(update[0].dp, expected);
            assert_eq!(update[mesh.n_owned()].dp, 0.0);
        }
        assert_eq!(sys.solve_count(), 2);
    }

    #[test]
    fn test_solve_requires_assemble_and_can_fail() {
        let mut sys = FixedIncrementSystem::default().fail_at_solve(2);
        let mut update = vec![Increment::default(); 2];
        assert!(sys.solve(&mut update).is_err());
        let err = sys.solve(&mut update).unwrap_err();
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_boundary_mass_flux_balances_for_uniform_flow() {
        let mesh = BoxMeshParams::line(4, 4.0).build_partitions(1).unwrap().remove(0);
        let gas = IdealGas::new(28.97, 1.4).unwrap();
        let s = PrimitiveState::from_eos(&gas, 1e5, DVec3::new(3.0, 0.0, 0.0), 300.0);
        let state = FlowState::uniform(mesh.n_cells(), s, 0.1);
        let mut sys = FixedIncrementSystem::default();
        sys.initialize(&mesh, &state, &gas);

        // x- 边界 0 流入，x+ 边界 1 流出
        let inflow = sys.boundary_fluxes(0);
        let outflow = sys.boundary_fluxes(1);
        assert!((inflow[0] + outflow[0]).abs() < 1e-12);
        assert!((outflow[0] - s.rho * 3.0 * 0.1).abs() < 1e-12);

        sys.reset_boundary_fluxes();
        assert_eq!(sys.boundary_fluxes(1), [0.0; N_FLUX]);
    }
}
