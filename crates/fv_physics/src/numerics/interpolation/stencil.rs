// crates/fv_physics/src/numerics/interpolation/stencil.rs

//! 面插值模板
//!
//! 模板总是以父单元、邻居单元开头。上限只决定是否扩展：种子未达上限时
//! 并入父单元的相邻单元，内部面再并入邻居单元的相邻单元，去重后按编号
//! 升序全部追加。

use glam::DVec3;
use std::collections::BTreeSet;

use crate::mesh::Mesh;

/// 模板条目
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilEntry {
    /// 单元编号
    pub cell: usize,
    /// 单元形心
    pub position: DVec3,
}

/// 面插值模板（临时对象）
#[derive(Debug, Clone, Default)]
pub struct Stencil {
    entries: Vec<StencilEntry>,
}

impl Stencil {
    /// 为指定面构建模板
    pub fn for_face(mesh: &Mesh, face: usize, max_size: usize) -> Self {
        let f = mesh.face(face);
        let entry = |cell: usize| StencilEntry {
            cell,
            position: mesh.cell(cell).centroid,
        };
        let mut entries = vec![entry(f.parent), entry(f.neighbor)];
        if entries.len() >= max_size {
            return Self { entries };
        }

        let mut extension: BTreeSet<usize> = mesh.cell(f.parent).neighbors.iter().copied().collect();
        if !f.is_boundary() {
            extension.extend(mesh.cell(f.neighbor).neighbors.iter().copied());
        }
        extension.remove(&f.parent);
        extension.remove(&f.neighbor);

        entries.extend(extension.into_iter().map(entry));
        Self { entries }
    }

    /// 条目
    #[inline]
    pub fn entries(&self) -> &[StencilEntry] {
        &self.entries
    }

    /// 条目数
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 离给定点最近的条目下标
    pub fn nearest_to(&self, point: DVec3) -> usize {
        self.entries
            .iter()
            .enumerate()
            .min_by(|a, b| {
                a.1.position
                    .distance_squared(point)
                    .total_cmp(&b.1.position.distance_squared(point))
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}
