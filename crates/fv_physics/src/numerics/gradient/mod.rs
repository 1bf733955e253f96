// crates/fv_physics/src/numerics/gradient/mod.rs

//! 梯度计算模块
//!
//! 按单元拓扑选择算法：
//! - 3D 网格中恰有 8 个节点的单元：曲线坐标梯度 ([`curvilinear`])
//! - 其他单元：加权最小二乘梯度 ([`least_squares`])
//!
//! 梯度每次场更新后重新计算，不跨子迭代缓存。限制在计算之后单独执行，
//! 保证面外推值不超出邻居取值范围。

pub mod curvilinear;
pub mod least_squares;

pub use curvilinear::{center_jacobian, curvilinear_gradients, CurvilinearFit};
pub use least_squares::fit_gradients;

use glam::DVec3;

use crate::mesh::Mesh;
use crate::numerics::limiter::LimiterKind;
use crate::state::{CellGradient, PrimitiveState, N_VARS};

/// 梯度重构方案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientScheme {
    /// 加权最小二乘
    LeastSquares,
    /// 曲线坐标（8 节点单元）
    Curvilinear,
}

impl GradientScheme {
    /// 按单元拓扑选择
    pub fn for_cell(node_count: usize, dimension: usize) -> Self {
        if dimension == 3 && node_count == 8 {
            Self::Curvilinear
        } else {
            Self::LeastSquares
        }
    }
}

/// 梯度引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientEngine {
    limiter: LimiterKind,
}

impl GradientEngine {
    /// 创建
    pub fn new(limiter: LimiterKind) -> Self {
        Self { limiter }
    }

    /// 当前限制器
    pub fn limiter(&self) -> LimiterKind {
        self.limiter
    }

    /// 计算单个单元的原始梯度
    pub fn cell_gradient(&self, mesh: &Mesh, cells: &[PrimitiveState], c: usize) -> CellGradient {
        let cell = mesh.cell(c);
        let center = cell.centroid;
        let state = cells[c];

        let offsets: Vec<DVec3> = cell
            .neighbors
            .iter()
            .map(|&n| mesh.cell(n).centroid - center)
            .collect();
        let deltas: Vec<[f64; N_VARS]> = cell
            .neighbors
            .iter()
            .map(|&n| std::array::from_fn(|k| cells[n].component(k) - state.component(k)))
            .collect();

        let least_squares = || fit_gradients(&offsets, &deltas, mesh.dimension());
        let grads = match GradientScheme::for_cell(cell.node_count(), mesh.dimension()) {
            GradientScheme::Curvilinear => match curvilinear_gradients(&cell.nodes, &offsets, &deltas) {
                CurvilinearFit::Gradient(g) => Some(g),
                CurvilinearFit::Underdetermined => None,
                CurvilinearFit::SingularJacobian => {
                    log::trace!("单元 {} 的 Jacobian 奇异，改用最小二乘", c);
                    least_squares()
                }
            },
            GradientScheme::LeastSquares => least_squares(),
        };

        CellGradient(grads.unwrap_or([DVec3::ZERO; N_VARS]))
    }

    /// 计算所有拥有单元的原始梯度；幽灵单元的梯度由同步填充
    pub fn compute(&self, mesh: &Mesh, cells: &[PrimitiveState], gradients: &mut Vec<CellGradient>) {
        gradients.resize(mesh.n_cells(), CellGradient::default());
        for c in 0..mesh.n_owned() {
            gradients[c] = self.cell_gradient(mesh, cells, c);
        }
    }

    /// 限制所有拥有单元的梯度
    ///
    /// 对每个变量，单元因子取各面因子的最小值，梯度乘以该因子。
    pub fn limit(&self, mesh: &Mesh, cells: &[PrimitiveState], gradients: &mut [CellGradient]) {
        if !self.limiter.is_active() {
            return;
        }
        for c in 0..mesh.n_owned() {
            let cell = mesh.cell(c);
            let others = cell
                .neighbors
                .iter()
                .copied()
                .chain(cell.faces.iter().filter_map(|&f| mesh.face(f).other(c)));

            let mut phi_min = [f64::INFINITY; N_VARS];
            let mut phi_max = [f64::NEG_INFINITY; N_VARS];
            for n in others {
                for k in 0..N_VARS {
                    let v = cells[n].component(k);
                    phi_min[k] = phi_min[k].min(v);
                    phi_max[k] = phi_max[k].max(v);
                }
            }

            for k in 0..N_VARS {
                if !phi_min[k].is_finite() {
                    continue;
                }
                let phi_c = cells[c].component(k);
                let grad = gradients[c].0[k];
                let factor = cell
                    .faces
                    .iter()
                    .map(|&f| {
                        let delta_face = grad.dot(mesh.face(f).centroid - cell.centroid);
                        self.limiter.face_factor(delta_face, phi_max[k] - phi_c, phi_min[k] - phi_c)
                    })
                    .fold(1.0_f64, f64::min);
                gradients[c].0[k] = grad * factor;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BoxMeshParams;

    fn linear_state(mesh: &Mesh, g: DVec3) -> Vec<PrimitiveState> {
        mesh.cells()
            .iter()
            .map(|c| {
                let phi = g.dot(c.centroid);
                PrimitiveState { p: phi, v: DVec3::splat(phi), t: phi, rho: 1.0 }
            })
            .collect()
    }

    #[test]
    fn test_scheme_selection() {
        assert_eq!(GradientScheme::for_cell(8, 3), GradientScheme::Curvilinear);
        assert_eq!(GradientScheme::for_cell(4, 3), GradientScheme::LeastSquares);
        assert_eq!(GradientScheme::for_cell(8, 2), GradientScheme::LeastSquares);
    }

    #[test]
    fn test_linear_field_on_quads() {
        let mesh = BoxMeshParams::rectangle(4, 4, 2.0, 1.0).build_partitions(1).unwrap().remove(0);
        let g = DVec3::new(1.5, -2.0, 0.0);
        let cells = linear_state(&mesh, g);
        let mut grads = Vec::new();
        GradientEngine::default().compute(&mesh, &cells, &mut grads);
        for c in 0..mesh.n_owned() {
            for k in 0..N_VARS {
                assert!((grads[c].get(k) - g).length() < 1e-10);
            }
        }
    }

    #[test]
    fn test_linear_field_on_hexes() {
        let mesh = BoxMeshParams::cuboid([3, 3, 3], [1.0, 2.0, 1.5]).build_partitions(1).unwrap().remove(0);
        let g = DVec3::new(0.3, 1.0, -0.7);
        let cells = linear_state(&mesh, g);
        let mut grads = Vec::new();
        GradientEngine::default().compute(&mesh, &cells, &mut grads);
        for c in 0..mesh.n_owned() {
            assert!((grads[c].get(0) - g).length() < 1e-10);
        }
    }

    #[test]
    fn test_limited_face_values_within_range() {
        let mesh = BoxMeshParams::line(6, 6.0).build_partitions(1).unwrap().remove(0);
        // 阶跃场
        let mut cells: Vec<PrimitiveState> = mesh
            .cells()
            .iter()
            .map(|c| {
                let phi = if c.centroid.x < 3.0 { 0.0 } else { 1.0 };
                PrimitiveState { p: phi, v: DVec3::ZERO, t: phi, rho: 1.0 }
            })
            .collect();
        // 边界映像取父单元的值
        for (g, kind) in mesh.ghosts().collect::<Vec<_>>() {
            if let crate::mesh::GhostKind::Boundary { face } = kind {
                cells[g] = cells[mesh.face(face).parent];
            }
        }

        let engine = GradientEngine::new(LimiterKind::Minmod);
        let mut grads = Vec::new();
        engine.compute(&mesh, &cells, &mut grads);
        engine.limit(&mesh, &cells, &mut grads);

        for c in 0..mesh.n_owned() {
            let cell = mesh.cell(c);
            let range: Vec<f64> = cell.neighbors.iter().map(|&n| cells[n].p).chain([cells[c].p]).collect();
            let lo = range.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = range.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            for &f in &cell.faces {
                let v = cells[c].p + grads[c].get(0).dot(mesh.face(f).centroid - cell.centroid);
                assert!(v >= lo - 1e-12 && v <= hi + 1e-12, "cell {} face {} value {}", c, f, v);
            }
        }
    }
}
