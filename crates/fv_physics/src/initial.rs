// crates/fv_physics/src/initial.rs

//! 初始条件
//!
//! 按配置顺序遍历区域，形心落在区域内的单元取该区域的 (p, v, T)，
//! 后面的区域覆盖前面的。密度由状态方程给出。

use fv_config::{InitialRegionConfig, RegionConfig};
use glam::DVec3;

use crate::eos::EquationOfState;
use crate::mesh::Mesh;
use crate::state::PrimitiveState;

/// 点是否位于区域内（边界算在内）
pub fn region_contains(region: &RegionConfig, point: DVec3) -> bool {
    match *region {
        RegionConfig::All => true,
        RegionConfig::Box { corner_1, corner_2 } => {
            let lo = DVec3::from_array(corner_1).min(DVec3::from_array(corner_2));
            let hi = DVec3::from_array(corner_1).max(DVec3::from_array(corner_2));
            point.cmpge(lo).all() && point.cmple(hi).all()
        }
        RegionConfig::Cylinder { center, radius, axis, height } => {
            let d = point - DVec3::from_array(center);
            let axis = DVec3::from_array(axis).normalize_or_zero();
            let on_axis = d.dot(axis) * axis;
            on_axis.length() <= 0.5 * height && (d - on_axis).length() <= radius
        }
        RegionConfig::Sphere { center, radius } => (point - DVec3::from_array(center)).length() <= radius,
    }
}

/// 所有单元（含幽灵）的初始状态
pub fn initial_state(
    mesh: &Mesh,
    regions: &[InitialRegionConfig],
    eos: &dyn EquationOfState,
) -> Vec<PrimitiveState> {
    let mut covered = 0usize;
    let states: Vec<PrimitiveState> = mesh
        .cells()
        .iter()
        .enumerate()
        .map(|(c, cell)| {
            let hit = regions
                .iter()
                .rev()
                .find(|ic| region_contains(&ic.region, cell.centroid));
            if hit.is_some() && c < mesh.n_owned() {
                covered += 1;
            }
            let (p, v, t) = hit.map_or((0.0, DVec3::ZERO, 0.0), |ic| {
                (ic.pressure, DVec3::from_array(ic.velocity), ic.temperature)
            });
            PrimitiveState::from_eos(eos, p, v, t)
        })
        .collect();

    if covered < mesh.n_owned() {
        log::warn!(
            "{} 个单元不在任何初始条件区域内，取 p = v = T = 0",
            mesh.n_owned() - covered
        );
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::IdealGas;
    use crate::mesh::BoxMeshParams;

    fn region(region: RegionConfig, pressure: f64) -> InitialRegionConfig {
        InitialRegionConfig { region, pressure, velocity: [1.0, 0.0, 0.0], temperature: 300.0 }
    }

    #[test]
    fn test_box_corners_in_any_order() {
        let r = RegionConfig::Box { corner_1: [1.0, 1.0, 1.0], corner_2: [0.0, 0.0, 0.0] };
        assert!(region_contains(&r, DVec3::splat(0.5)));
        assert!(region_contains(&r, DVec3::ONE));
        assert!(!region_contains(&r, DVec3::new(0.5, 1.5, 0.5)));
    }

    #[test]
    fn test_cylinder_height_and_radius() {
        let r = RegionConfig::Cylinder { center: [0.0; 3], radius: 1.0, axis: [0.0, 0.0, 2.0], height: 2.0 };
        assert!(region_contains(&r, DVec3::new(0.5, 0.5, 0.9)));
        assert!(!region_contains(&r, DVec3::new(0.0, 0.0, 1.1)));
        assert!(!region_contains(&r, DVec3::new(1.1, 0.0, 0.0)));
    }

    #[test]
    fn test_sphere() {
        let r = RegionConfig::Sphere { center: [1.0, 0.0, 0.0], radius: 0.5 };
        assert!(region_contains(&r, DVec3::new(1.4, 0.0, 0.0)));
        assert!(!region_contains(&r, DVec3::new(1.4, 0.4, 0.0)));
    }

    #[test]
    fn test_later_regions_override() {
        let mesh = BoxMeshParams::line(4, 4.0).build_partitions(1).unwrap().remove(0);
        let gas = IdealGas::new(28.97, 1.4).unwrap();
        let regions = vec![
            region(RegionConfig::All, 1e5),
            region(RegionConfig::Box { corner_1: [2.0, -1.0, -1.0], corner_2: [4.0, 1.0, 1.0] }, 2e5),
        ];
        let states = initial_state(&mesh, &regions, &gas);
        for c in 0..mesh.n_owned() {
            let x = mesh.cell(c).centroid.x;
            let expected = if x > 2.0 { 2e5 } else { 1e5 };
            assert_eq!(states[c].p, expected);
            assert!((states[c].rho - gas.density(expected, 300.0)).abs() < 1e-12);
        }
    }
}
