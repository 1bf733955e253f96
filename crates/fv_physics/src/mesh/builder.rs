// crates/fv_physics/src/mesh/builder.rs

//! 网格构建器
//!
//! 拥有单元与幽灵单元分开登记，`build()` 时幽灵单元统一排到拥有单元之后。
//!
//! ```ignore
//! let mut b = MeshBuilder::new(1);
//! let c0 = b.add_cell(DVec3::new(0.5, 0.0, 0.0), 1.0, nodes0);
//! let c1 = b.add_cell(DVec3::new(1.5, 0.0, 0.0), 1.0, nodes1);
//! b.add_internal_face(c0, c1, DVec3::new(1.0, 0.0, 0.0), DVec3::X, 1.0)?;
//! b.add_boundary_face(c0, 0, DVec3::ZERO, -DVec3::X, 1.0)?;
//! let mesh = b.build()?;
//! ```

use glam::DVec3;
use std::collections::BTreeMap;

use super::{BoundaryTag, Cell, Face, GhostKind, Mesh};
use crate::error::{PhysicsError, PhysicsResult};

/// 构建期单元引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellId {
    /// 拥有单元（按登记顺序）
    Owned(usize),
    /// 幽灵单元（按登记顺序）
    Ghost(usize),
}

#[derive(Debug, Clone)]
struct PendingFace {
    centroid: DVec3,
    normal: DVec3,
    area: f64,
    parent: usize,
    neighbor: CellId,
    tag: BoundaryTag,
}

/// 网格构建器
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    dimension: usize,
    owned: Vec<Cell>,
    owned_links: Vec<Vec<CellId>>,
    ghosts: Vec<(Cell, GhostKind)>,
    faces: Vec<PendingFace>,
}

impl MeshBuilder {
    /// 创建指定维度的构建器
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            owned: Vec::new(),
            owned_links: Vec::new(),
            ghosts: Vec::new(),
            faces: Vec::new(),
        }
    }

    fn default_length(&self, volume: f64) -> f64 {
        volume.powf(1.0 / self.dimension.max(1) as f64)
    }

    /// 添加拥有单元，特征长度取 volume^(1/dim)
    pub fn add_cell(&mut self, centroid: DVec3, volume: f64, nodes: Vec<DVec3>) -> CellId {
        let length_scale = self.default_length(volume);
        self.owned.push(Cell {
            centroid,
            volume,
            length_scale,
            nodes,
            neighbors: Vec::new(),
            faces: Vec::new(),
        });
        self.owned_links.push(Vec::new());
        CellId::Owned(self.owned.len() - 1)
    }

    /// 覆盖单元特征长度
    pub fn set_length_scale(&mut self, id: CellId, length_scale: f64) {
        match id {
            CellId::Owned(i) => self.owned[i].length_scale = length_scale,
            CellId::Ghost(g) => self.ghosts[g].0.length_scale = length_scale,
        }
    }

    /// 添加相邻分区单元的镜像
    pub fn add_partition_ghost(
        &mut self,
        centroid: DVec3,
        volume: f64,
        owner_rank: usize,
        owner_index: usize,
    ) -> CellId {
        let length_scale = self.default_length(volume);
        self.ghosts.push((
            Cell {
                centroid,
                volume,
                length_scale,
                nodes: Vec::new(),
                neighbors: Vec::new(),
                faces: Vec::new(),
            },
            GhostKind::Partition { owner_rank, owner_index },
        ));
        CellId::Ghost(self.ghosts.len() - 1)
    }

    /// 登记相邻关系（只记录在拥有单元一侧）
    pub fn connect(&mut self, a: CellId, b: CellId) {
        if a == b {
            return;
        }
        for (x, y) in [(a, b), (b, a)] {
            if let CellId::Owned(i) = x {
                if !self.owned_links[i].contains(&y) {
                    self.owned_links[i].push(y);
                }
            }
        }
    }

    /// 添加内部面（含分区交界面），同时登记相邻关系
    pub fn add_internal_face(
        &mut self,
        parent: CellId,
        neighbor: CellId,
        centroid: DVec3,
        normal: DVec3,
        area: f64,
    ) -> PhysicsResult<usize> {
        let parent = self.owned_index(parent)?;
        self.connect(CellId::Owned(parent), neighbor);
        self.faces.push(PendingFace {
            centroid,
            normal,
            area,
            parent,
            neighbor,
            tag: BoundaryTag::Internal,
        });
        Ok(self.faces.len() - 1)
    }

    /// 添加物理边界面，自动生成父单元关于面心的映像
    pub fn add_boundary_face(
        &mut self,
        parent: CellId,
        boundary: usize,
        centroid: DVec3,
        normal: DVec3,
        area: f64,
    ) -> PhysicsResult<usize> {
        let parent = self.owned_index(parent)?;
        let face = self.faces.len();
        let source = &self.owned[parent];
        let image = Cell {
            centroid: 2.0 * centroid - source.centroid,
            volume: source.volume,
            length_scale: source.length_scale,
            nodes: Vec::new(),
            neighbors: Vec::new(),
            faces: Vec::new(),
        };
        self.ghosts.push((image, GhostKind::Boundary { face }));
        self.faces.push(PendingFace {
            centroid,
            normal,
            area,
            parent,
            neighbor: CellId::Ghost(self.ghosts.len() - 1),
            tag: BoundaryTag::Boundary(boundary),
        });
        Ok(face)
    }

    fn owned_index(&self, id: CellId) -> PhysicsResult<usize> {
        match id {
            CellId::Owned(i) if i < self.owned.len() => Ok(i),
            other => Err(PhysicsError::invalid_mesh(format!(
                "面的父单元必须是已登记的拥有单元: {:?}",
                other
            ))),
        }
    }

    /// 生成网格
    pub fn build(self) -> PhysicsResult<Mesh> {
        let n_owned = self.owned.len();
        let resolve = |id: CellId| match id {
            CellId::Owned(i) => i,
            CellId::Ghost(g) => n_owned + g,
        };

        let mut cells = self.owned;
        for (i, links) in self.owned_links.iter().enumerate() {
            cells[i].neighbors = links.iter().map(|&id| resolve(id)).collect();
        }

        let mut faces = Vec::with_capacity(self.faces.len());
        for (f, pending) in self.faces.into_iter().enumerate() {
            let neighbor = resolve(pending.neighbor);
            cells[pending.parent].faces.push(f);
            if neighbor < n_owned {
                cells[neighbor].faces.push(f);
            }
            faces.push(Face {
                centroid: pending.centroid,
                normal: pending.normal,
                area: pending.area,
                parent: pending.parent,
                neighbor,
                tag: pending.tag,
                average: BTreeMap::new(),
            });
        }

        let mut ghosts = Vec::with_capacity(self.ghosts.len());
        for (cell, kind) in self.ghosts {
            cells.push(cell);
            ghosts.push(kind);
        }

        Mesh::from_parts(self.dimension, n_owned, cells, ghosts, faces)
    }
}
