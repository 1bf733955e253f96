// crates/fv_physics/src/state.rs

//! 流动状态
//!
//! 原始变量按单元存储（含幽灵单元），另有每单元物理时间步、伪时间步
//! 和线性求解得到的更新增量。

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::eos::EquationOfState;

/// 参与梯度重构的原始变量个数 (p, u, v, w, T)
pub const N_VARS: usize = 5;

/// 单元原始变量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrimitiveState {
    /// 压力（相对 p_ref）
    pub p: f64,
    /// 速度
    pub v: DVec3,
    /// 温度（相对 t_ref）
    pub t: f64,
    /// 密度
    pub rho: f64,
}

impl PrimitiveState {
    /// 由压力、速度、温度构造，密度由状态方程给出
    pub fn from_eos(eos: &dyn EquationOfState, p: f64, v: DVec3, t: f64) -> Self {
        Self { p, v, t, rho: eos.density(p, t) }
    }

    /// 第 k 个梯度变量 (p, u, v, w, T)
    #[inline]
    pub fn component(&self, k: usize) -> f64 {
        match k {
            0 => self.p,
            1 => self.v.x,
            2 => self.v.y,
            3 => self.v.z,
            _ => self.t,
        }
    }
}

/// 线性求解得到的更新增量 (Δp, Δu, Δv, Δw, ΔT)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Increment {
    /// 压力增量
    pub dp: f64,
    /// 速度增量
    pub dv: DVec3,
    /// 温度增量
    pub dt: f64,
}

/// 单元梯度，每个变量一个三维向量
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellGradient(pub [DVec3; N_VARS]);

impl CellGradient {
    /// 第 k 个变量的梯度
    #[inline]
    pub fn get(&self, k: usize) -> DVec3 {
        self.0[k]
    }

    /// 打包为连续数组（用于幽灵同步）
    pub fn pack(&self, out: &mut Vec<f64>) {
        for g in &self.0 {
            out.extend_from_slice(&g.to_array());
        }
    }

    /// 从连续数组解包
    pub fn unpack(values: &[f64]) -> Self {
        let mut grad = Self::default();
        for (k, chunk) in values.chunks_exact(3).take(N_VARS).enumerate() {
            grad.0[k] = DVec3::new(chunk[0], chunk[1], chunk[2]);
        }
        grad
    }
}

/// 分区流动状态
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    /// 原始变量（含幽灵单元）
    pub cells: Vec<PrimitiveState>,
    /// 物理时间步（按单元）
    pub dt: Vec<f64>,
    /// 伪时间步（按单元）
    pub pseudo_dt: Vec<f64>,
    /// 最近一次更新增量
    pub update: Vec<Increment>,
}

impl FlowState {
    /// 用统一初值创建
    pub fn uniform(n_cells: usize, initial: PrimitiveState, dt: f64) -> Self {
        Self {
            cells: vec![initial; n_cells],
            dt: vec![dt; n_cells],
            pseudo_dt: vec![dt; n_cells],
            update: vec![Increment::default(); n_cells],
        }
    }

    /// 单元数（含幽灵）
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::IdealGas;

    #[test]
    fn test_component_order() {
        let s = PrimitiveState { p: 1.0, v: DVec3::new(2.0, 3.0, 4.0), t: 5.0, rho: 6.0 };
        let values: Vec<f64> = (0..N_VARS).map(|k| s.component(k)).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_from_eos_density() {
        let gas = IdealGas::new(28.97, 1.4).unwrap();
        let s = PrimitiveState::from_eos(&gas, 101325.0, DVec3::ZERO, 300.0);
        assert!((s.rho - gas.density(101325.0, 300.0)).abs() < 1e-15);
    }

    #[test]
    fn test_gradient_pack_unpack() {
        let mut g = CellGradient::default();
        g.0[4] = DVec3::new(1.0, -2.0, 3.0);
        let mut buf = Vec::new();
        g.pack(&mut buf);
        assert_eq!(buf.len(), 3 * N_VARS);
        assert_eq!(CellGradient::unpack(&buf), g);
    }
}
