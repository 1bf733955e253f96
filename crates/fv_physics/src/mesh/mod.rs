// crates/fv_physics/src/mesh/mod.rs

//! 分区网格模型
//!
//! 每个分区持有一个 [`Mesh`]：
//!
//! ```text
//! cells: [ 0 .. n_owned )          本分区拥有的单元
//!        [ n_owned .. n_cells )    幽灵单元（分区镜像 / 边界映像）
//! ```
//!
//! 物理边界面的邻居是边界映像幽灵单元（父单元关于面心的镜像），
//! 分区交界面的邻居是分区幽灵单元。幽灵单元只通过同步更新。

pub mod builder;
pub mod generator;

pub use builder::{CellId, MeshBuilder};
pub use generator::BoxMeshParams;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{PhysicsError, PhysicsResult};

/// 单元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// 形心
    pub centroid: DVec3,
    /// 体积（1D 为长度，2D 为面积）
    pub volume: f64,
    /// 特征长度
    pub length_scale: f64,
    /// 顶点坐标
    #[serde(default)]
    pub nodes: Vec<DVec3>,
    /// 相邻单元（不含边界映像）
    #[serde(default)]
    pub neighbors: Vec<usize>,
    /// 所属面
    #[serde(default)]
    pub faces: Vec<usize>,
}

impl Cell {
    /// 顶点数
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// 面的边界标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryTag {
    /// 内部面（含分区交界面）
    Internal,
    /// 物理边界
    Boundary(usize),
}

/// 面
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    /// 面心
    pub centroid: DVec3,
    /// 单位法向（由父单元指向外）
    pub normal: DVec3,
    /// 面积
    pub area: f64,
    /// 父单元（本分区拥有）
    pub parent: usize,
    /// 邻居单元
    pub neighbor: usize,
    /// 边界标记
    pub tag: BoundaryTag,
    /// 插值权重：贡献单元 -> 权重
    #[serde(default)]
    pub average: BTreeMap<usize, f64>,
}

impl Face {
    /// 是否物理边界面
    #[inline]
    pub fn is_boundary(&self) -> bool {
        matches!(self.tag, BoundaryTag::Boundary(_))
    }

    /// 面另一侧的单元
    #[inline]
    pub fn other(&self, cell: usize) -> Option<usize> {
        if cell == self.parent {
            Some(self.neighbor)
        } else if cell == self.neighbor {
            Some(self.parent)
        } else {
            None
        }
    }

    /// 用权重映射插值面值
    pub fn interpolate<F: Fn(usize) -> f64>(&self, value: F) -> f64 {
        self.average.iter().map(|(&c, &w)| w * value(c)).sum()
    }

    /// 权重和
    pub fn weight_sum(&self) -> f64 {
        self.average.values().sum()
    }
}

/// 幽灵单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GhostKind {
    /// 相邻分区单元的镜像
    Partition {
        /// 所属分区
        owner_rank: usize,
        /// 在所属分区中的局部编号
        owner_index: usize,
    },
    /// 物理边界面上的映像
    Boundary {
        /// 对应边界面
        face: usize,
    },
}

/// 分区网格
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    dimension: usize,
    n_owned: usize,
    cells: Vec<Cell>,
    ghosts: Vec<GhostKind>,
    faces: Vec<Face>,
}

impl Mesh {
    /// 由原始部件构造并校验
    pub fn from_parts(
        dimension: usize,
        n_owned: usize,
        cells: Vec<Cell>,
        ghosts: Vec<GhostKind>,
        faces: Vec<Face>,
    ) -> PhysicsResult<Self> {
        let mesh = Self { dimension, n_owned, cells, ghosts, faces };
        mesh.validate()?;
        Ok(mesh)
    }

    /// 空间维度
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 单元总数（含幽灵）
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// 本分区拥有的单元数
    #[inline]
    pub fn n_owned(&self) -> usize {
        self.n_owned
    }

    /// 幽灵单元数
    #[inline]
    pub fn n_ghosts(&self) -> usize {
        self.ghosts.len()
    }

    /// 面数
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// 单元
    #[inline]
    pub fn cell(&self, i: usize) -> &Cell {
        &self.cells[i]
    }

    /// 所有单元
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// 面
    #[inline]
    pub fn face(&self, i: usize) -> &Face {
        &self.faces[i]
    }

    /// 所有面
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// 幽灵单元类型，`cell` 为全局局部编号（≥ n_owned）
    #[inline]
    pub fn ghost_kind(&self, cell: usize) -> Option<GhostKind> {
        cell.checked_sub(self.n_owned).and_then(|g| self.ghosts.get(g).copied())
    }

    /// 遍历幽灵单元 (单元编号, 类型)
    pub fn ghosts(&self) -> impl Iterator<Item = (usize, GhostKind)> + '_ {
        self.ghosts.iter().enumerate().map(move |(g, &k)| (self.n_owned + g, k))
    }

    /// 写入面的插值权重
    pub fn set_face_weights(&mut self, face: usize, weights: BTreeMap<usize, f64>) {
        self.faces[face].average = weights;
    }

    /// 离给定点最近的本分区单元及其距离
    pub fn nearest_owned_cell(&self, point: DVec3) -> Option<(usize, f64)> {
        self.cells[..self.n_owned]
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.centroid.distance(point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// 校验拓扑一致性
    pub fn validate(&self) -> PhysicsResult<()> {
        if !(1..=3).contains(&self.dimension) {
            return Err(PhysicsError::invalid_mesh(format!(
                "维度必须为 1..=3，实际 {}",
                self.dimension
            )));
        }
        if self.n_owned > self.cells.len() {
            return Err(PhysicsError::invalid_mesh("拥有单元数超过单元总数"));
        }
        if self.cells.len() - self.n_owned != self.ghosts.len() {
            return Err(PhysicsError::invalid_mesh(format!(
                "幽灵单元数 {} 与类型表长度 {} 不一致",
                self.cells.len() - self.n_owned,
                self.ghosts.len()
            )));
        }

        let n_cells = self.cells.len();
        for (i, cell) in self.cells[..self.n_owned].iter().enumerate() {
            if !(cell.volume > 0.0) || !(cell.length_scale > 0.0) {
                return Err(PhysicsError::invalid_mesh(format!(
                    "单元 {} 的体积或特征长度非正",
                    i
                )));
            }
            if let Some(&bad) = cell.faces.iter().find(|&&f| f >= self.faces.len()) {
                return Err(PhysicsError::invalid_mesh(format!(
                    "单元 {} 的面编号 {} 越界",
                    i, bad
                )));
            }
        }

        // 幽灵单元的邻居表同样参与模板扩展
        for (i, cell) in self.cells.iter().enumerate() {
            if let Some(&bad) = cell.neighbors.iter().find(|&&n| n >= n_cells || n == i) {
                return Err(PhysicsError::invalid_mesh(format!(
                    "单元 {} 的邻居编号 {} 无效",
                    i, bad
                )));
            }
        }

        for (f, face) in self.faces.iter().enumerate() {
            if face.parent >= self.n_owned {
                return Err(PhysicsError::invalid_mesh(format!(
                    "面 {} 的父单元 {} 不属于本分区",
                    f, face.parent
                )));
            }
            if face.neighbor >= n_cells || face.neighbor == face.parent {
                return Err(PhysicsError::invalid_mesh(format!(
                    "面 {} 的邻居单元 {} 无效",
                    f, face.neighbor
                )));
            }
            if face.is_boundary() != matches!(self.ghost_kind(face.neighbor), Some(GhostKind::Boundary { .. })) {
                return Err(PhysicsError::invalid_mesh(format!(
                    "面 {} 的边界标记与邻居单元类型不符",
                    f
                )));
            }
        }

        for (c, kind) in self.ghosts() {
            if let GhostKind::Boundary { face } = kind {
                if self.faces.get(face).map(|fc| fc.neighbor) != Some(c) {
                    return Err(PhysicsError::invalid_mesh(format!(
                        "边界映像 {} 与面 {} 不对应",
                        c, face
                    )));
                }
            }
        }
        Ok(())
    }
}

/// 读取分区网格文件（每个分区一个网格）
pub fn read_partitions<P: AsRef<Path>>(path: P) -> PhysicsResult<Vec<Mesh>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let parts: Vec<Mesh> = serde_json::from_str(&content)?;
    if parts.is_empty() {
        return Err(PhysicsError::invalid_mesh("网格文件不含任何分区"));
    }
    for mesh in &parts {
        mesh.validate()?;
    }
    Ok(parts)
}

/// 写出分区网格文件
pub fn write_partitions<P: AsRef<Path>>(path: P, parts: &[Mesh]) -> PhysicsResult<()> {
    let content = serde_json::to_string(parts)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cell_line() -> Mesh {
        BoxMeshParams::line(2, 2.0).build_partitions(1).unwrap().remove(0)
    }

    #[test]
    fn test_counts() {
        let mesh = two_cell_line();
        assert_eq!(mesh.dimension(), 1);
        assert_eq!(mesh.n_owned(), 2);
        // 两端各一个边界映像
        assert_eq!(mesh.n_ghosts(), 2);
        assert_eq!(mesh.n_faces(), 3);
    }

    #[test]
    fn test_boundary_image_is_mirror() {
        let mesh = two_cell_line();
        for (c, kind) in mesh.ghosts() {
            let GhostKind::Boundary { face } = kind else {
                panic!("单分区不应有分区幽灵");
            };
            let f = mesh.face(face);
            let parent = mesh.cell(f.parent).centroid;
            let mirrored = 2.0 * f.centroid - parent;
            assert!(mesh.cell(c).centroid.distance(mirrored) < 1e-14);
        }
    }

    #[test]
    fn test_nearest_owned_cell() {
        let mesh = two_cell_line();
        let (cell, dist) = mesh.nearest_owned_cell(DVec3::new(1.6, 0.0, 0.0)).unwrap();
        assert_eq!(cell, 1);
        assert!((dist - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.mesh.json");
        let parts = BoxMeshParams::line(4, 1.0).build_partitions(2).unwrap();
        write_partitions(&path, &parts).unwrap();
        let loaded = read_partitions(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].n_owned(), parts[1].n_owned());
    }

    #[test]
    fn test_invalid_parent_rejected() {
        let mesh = two_cell_line();
        let mut faces = mesh.faces().to_vec();
        faces[0].parent = 99;
        let result = Mesh::from_parts(
            mesh.dimension(),
            mesh.n_owned(),
            mesh.cells().to_vec(),
            mesh.ghosts().map(|(_, k)| k).collect(),
            faces,
        );
        assert!(matches!(result, Err(PhysicsError::InvalidMesh(_))));
    }

    #[test]
    fn test_ghost_neighbor_out_of_range_rejected() {
        let mesh = BoxMeshParams::line(4, 4.0).build_partitions(2).unwrap().remove(0);
        let mut cells = mesh.cells().to_vec();
        let ghost = mesh.n_owned();
        cells[ghost].neighbors.push(1000);
        let result = Mesh::from_parts(
            mesh.dimension(),
            mesh.n_owned(),
            cells,
            mesh.ghosts().map(|(_, k)| k).collect(),
            mesh.faces().to_vec(),
        );
        assert!(matches!(result, Err(PhysicsError::InvalidMesh(_))));
    }
}
