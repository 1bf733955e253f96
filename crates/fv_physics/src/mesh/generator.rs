// crates/fv_physics/src/mesh/generator.rs

//! 长方体结构化网格生成（按 x 方向切片分区）
//!
//! 维度决定单元形状：1D 线段（2 个顶点）、2D 四边形（4 个）、3D 六面体（8 个，
//! VTK 顶点顺序）。边界编号：`2·axis`（负侧）、`2·axis + 1`（正侧）。

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{CellId, Mesh, MeshBuilder};
use crate::error::{PhysicsError, PhysicsResult};

/// 长方体网格参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxMeshParams {
    /// 维度
    pub dimension: usize,
    /// 原点
    pub origin: [f64; 3],
    /// 各方向长度
    pub extent: [f64; 3],
    /// 各方向单元数（超出维度的方向忽略）
    pub divisions: [usize; 3],
}

impl BoxMeshParams {
    /// 1D 线段网格
    pub fn line(n: usize, length: f64) -> Self {
        Self {
            dimension: 1,
            origin: [0.0; 3],
            extent: [length, 1.0, 1.0],
            divisions: [n, 1, 1],
        }
    }

    /// 2D 矩形网格
    pub fn rectangle(nx: usize, ny: usize, lx: f64, ly: f64) -> Self {
        Self {
            dimension: 2,
            origin: [0.0; 3],
            extent: [lx, ly, 1.0],
            divisions: [nx, ny, 1],
        }
    }

    /// 3D 长方体网格
    pub fn cuboid(divisions: [usize; 3], extent: [f64; 3]) -> Self {
        Self {
            dimension: 3,
            origin: [0.0; 3],
            extent,
            divisions,
        }
    }

    fn counts(&self) -> [usize; 3] {
        let mut n = [1; 3];
        n[..self.dimension].copy_from_slice(&self.divisions[..self.dimension]);
        n
    }

    fn spacing(&self) -> DVec3 {
        let n = self.counts();
        let mut h = DVec3::ONE;
        for a in 0..self.dimension {
            h[a] = self.extent[a] / n[a] as f64;
        }
        h
    }

    fn centroid(&self, idx: [usize; 3]) -> DVec3 {
        let h = self.spacing();
        let mut c = DVec3::from_array(self.origin);
        for a in 0..3 {
            if a < self.dimension {
                c[a] += (idx[a] as f64 + 0.5) * h[a];
            }
        }
        c
    }

    fn nodes(&self, idx: [usize; 3]) -> Vec<DVec3> {
        let c = self.centroid(idx);
        let half = 0.5 * self.spacing();
        let corner = |sx: f64, sy: f64, sz: f64| {
            DVec3::new(
                c.x + sx * half.x,
                if self.dimension > 1 { c.y + sy * half.y } else { c.y },
                if self.dimension > 2 { c.z + sz * half.z } else { c.z },
            )
        };
        match self.dimension {
            1 => vec![corner(-1.0, 0.0, 0.0), corner(1.0, 0.0, 0.0)],
            2 => vec![
                corner(-1.0, -1.0, 0.0),
                corner(1.0, -1.0, 0.0),
                corner(1.0, 1.0, 0.0),
                corner(-1.0, 1.0, 0.0),
            ],
            _ => vec![
                corner(-1.0, -1.0, -1.0),
                corner(1.0, -1.0, -1.0),
                corner(1.0, 1.0, -1.0),
                corner(-1.0, 1.0, -1.0),
                corner(-1.0, -1.0, 1.0),
                corner(1.0, -1.0, 1.0),
                corner(1.0, 1.0, 1.0),
                corner(-1.0, 1.0, 1.0),
            ],
        }
    }

    fn volume(&self) -> f64 {
        let h = self.spacing();
        (0..self.dimension).map(|a| h[a]).product()
    }

    fn face_area(&self, axis: usize) -> f64 {
        let h = self.spacing();
        (0..self.dimension).filter(|&a| a != axis).map(|a| h[a]).product()
    }

    /// x 方向切片的起止
    fn slab(&self, rank: usize, partitions: usize) -> (usize, usize) {
        let nx = self.counts()[0];
        (rank * nx / partitions, (rank + 1) * nx / partitions)
    }

    fn owner_of(&self, i: usize, partitions: usize) -> usize {
        (0..partitions)
            .find(|&r| {
                let (lo, hi) = self.slab(r, partitions);
                i >= lo && i < hi
            })
            .unwrap_or(partitions - 1)
    }

    /// 单元在所属分区中的局部编号（x 最快）
    fn local_index(&self, idx: [usize; 3], partitions: usize) -> usize {
        let n = self.counts();
        let (lo, hi) = self.slab(self.owner_of(idx[0], partitions), partitions);
        let w = hi - lo;
        (idx[2] * n[1] + idx[1]) * w + (idx[0] - lo)
    }

    /// 生成 `partitions` 个分区网格
    pub fn build_partitions(&self, partitions: usize) -> PhysicsResult<Vec<Mesh>> {
        if !(1..=3).contains(&self.dimension) {
            return Err(PhysicsError::invalid_mesh(format!("不支持的维度 {}", self.dimension)));
        }
        let n = self.counts();
        if n.iter().any(|&k| k == 0) {
            return Err(PhysicsError::invalid_mesh("各方向单元数必须为正"));
        }
        if partitions == 0 || partitions > n[0] {
            return Err(PhysicsError::invalid_mesh(format!(
                "分区数 {} 必须在 1..={} 之间",
                partitions, n[0]
            )));
        }
        (0..partitions).map(|rank| self.build_rank(rank, partitions)).collect()
    }

    fn build_rank(&self, rank: usize, partitions: usize) -> PhysicsResult<Mesh> {
        let n = self.counts();
        let (lo, hi) = self.slab(rank, partitions);
        let h = self.spacing();
        let volume = self.volume();
        let mut builder = MeshBuilder::new(self.dimension);

        let mut ids = Vec::new();
        for k in 0..n[2] {
            for j in 0..n[1] {
                for i in lo..hi {
                    let idx = [i, j, k];
                    ids.push((idx, builder.add_cell(self.centroid(idx), volume, self.nodes(idx))));
                }
            }
        }
        let lookup: HashMap<[usize; 3], CellId> = ids.iter().copied().collect();
        let mut ghosts: HashMap<[usize; 3], CellId> = HashMap::new();

        for &(idx, id) in &ids {
            let c = self.centroid(idx);
            for axis in 0..self.dimension {
                for side in [0usize, 1] {
                    let mut normal = DVec3::ZERO;
                    normal[axis] = if side == 1 { 1.0 } else { -1.0 };
                    let centroid = c + normal * (0.5 * h[axis]);
                    let area = self.face_area(axis);

                    let outside = (side == 0 && idx[axis] == 0) || (side == 1 && idx[axis] + 1 == n[axis]);
                    if outside {
                        builder.add_boundary_face(id, 2 * axis + side, centroid, normal, area)?;
                        continue;
                    }

                    let mut other = idx;
                    if side == 1 {
                        other[axis] += 1;
                    } else {
                        other[axis] -= 1;
                    }

                    if let Some(&nid) = lookup.get(&other) {
                        // 内部面只由正侧登记一次
                        if side == 1 {
                            builder.add_internal_face(id, nid, centroid, normal, area)?;
                        }
                    } else {
                        let gid = match ghosts.get(&other) {
                            Some(&g) => g,
                            None => {
                                let g = builder.add_partition_ghost(
                                    self.centroid(other),
                                    volume,
                                    self.owner_of(other[0], partitions),
                                    self.local_index(other, partitions),
                                );
                                ghosts.insert(other, g);
                                g
                            }
                        };
                        builder.add_internal_face(id, gid, centroid, normal, area)?;
                    }
                }
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::GhostKind;

    #[test]
    fn test_line_counts() {
        let mesh = BoxMeshParams::line(5, 1.0).build_partitions(1).unwrap().remove(0);
        assert_eq!(mesh.n_owned(), 5);
        assert_eq!(mesh.n_faces(), 6);
        assert_eq!(mesh.cell(0).node_count(), 2);
    }

    #[test]
    fn test_cuboid_hex_nodes() {
        let mesh = BoxMeshParams::cuboid([2, 2, 2], [1.0, 1.0, 1.0])
            .build_partitions(1)
            .unwrap()
            .remove(0);
        assert_eq!(mesh.n_owned(), 8);
        assert_eq!(mesh.cell(0).node_count(), 8);
        // 12 个内部面 + 24 个边界面
        assert_eq!(mesh.n_faces(), 36);
        assert_eq!(mesh.n_ghosts(), 24);
    }

    #[test]
    fn test_partition_ghosts_reference_owner() {
        let box_mesh = BoxMeshParams::rectangle(4, 2, 4.0, 2.0);
        let parts = box_mesh.build_partitions(2).unwrap();
        assert_eq!(parts[0].n_owned(), 4);
        assert_eq!(parts[1].n_owned(), 4);

        for (rank, mesh) in parts.iter().enumerate() {
            for (c, kind) in mesh.ghosts() {
                if let GhostKind::Partition { owner_rank, owner_index } = kind {
                    assert_ne!(owner_rank, rank);
                    let owner_cell = parts[owner_rank].cell(owner_index);
                    assert!(owner_cell.centroid.distance(mesh.cell(c).centroid) < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_too_many_partitions() {
        assert!(BoxMeshParams::line(2, 1.0).build_partitions(3).is_err());
    }
}
