// crates/fv_physics/src/numerics/interpolation/mod.rs

//! 面插值权重
//!
//! 三种方案，启动时选定：
//!
//! | 方案 | 模板上限 | 权重 |
//! |------|----------|------|
//! | WTLI | 配置值（<1 时 1D/2D/3D 取 2/6/12） | 子空间加权最小二乘 |
//! | IDW | 99 | 1/|x_f − x_i| 归一化 |
//! | SIMPLE | 2 | 父/邻各 0.5 |
//!
//! 结果写入 [`Face::average`](crate::mesh::Face)，权重和为 1，父/邻单元总在映射中。

pub mod stencil;
pub mod wtli;

pub use stencil::{Stencil, StencilEntry};
pub use wtli::{independent_directions, wtli_weights, FitKind};

use fv_config::{InterpolationConfig, InterpolationMethod};
use glam::DVec3;
use std::collections::BTreeMap;

use crate::mesh::Mesh;

/// IDW 的模板上限
pub const IDW_STENCIL_SIZE: usize = 99;

/// 按维度的默认 WTLI 模板上限
pub fn default_stencil_size(dimension: usize) -> usize {
    match dimension {
        1 => 2,
        2 => 6,
        _ => 12,
    }
}

/// 插值方案
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpolationScheme {
    /// 几何加权最小二乘
    Wtli {
        /// 模板上限
        stencil_size: usize,
        /// 偏斜容差
        skewness_tolerance: f64,
    },
    /// 反距离加权
    Idw,
    /// 父/邻平分
    Simple,
}

impl InterpolationScheme {
    /// 由配置创建
    pub fn from_config(config: &InterpolationConfig, dimension: usize) -> Self {
        match config.method {
            InterpolationMethod::Wtli => Self::Wtli {
                stencil_size: if config.stencil_size < 1 {
                    default_stencil_size(dimension)
                } else {
                    config.stencil_size as usize
                },
                skewness_tolerance: config.skewness_tolerance,
            },
            InterpolationMethod::Idw => Self::Idw,
            InterpolationMethod::Simple => Self::Simple,
        }
    }

    /// 模板上限
    pub fn max_stencil_size(&self) -> usize {
        match *self {
            Self::Wtli { stencil_size, .. } => stencil_size,
            Self::Idw => IDW_STENCIL_SIZE,
            Self::Simple => 2,
        }
    }

    /// 计算单个模板的权重（按模板顺序）
    pub fn weights(&self, stencil: &Stencil, face_centroid: DVec3, dimension: usize) -> (Vec<f64>, Option<FitKind>) {
        match *self {
            Self::Wtli { skewness_tolerance, .. } => {
                let (w, kind) = wtli_weights(stencil, face_centroid, skewness_tolerance, dimension);
                (w, Some(kind))
            }
            Self::Idw => (idw_weights(stencil, face_centroid), None),
            Self::Simple => {
                let mut w = vec![0.0; stencil.len()];
                w[..2.min(stencil.len())].fill(0.5);
                (w, None)
            }
        }
    }

    /// 名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wtli { .. } => "WTLI",
            Self::Idw => "IDW",
            Self::Simple => "SIMPLE",
        }
    }
}

/// 反距离权重；与面心重合的点独占权重 1
pub fn idw_weights(stencil: &Stencil, face_centroid: DVec3) -> Vec<f64> {
    let distances: Vec<f64> = stencil
        .entries()
        .iter()
        .map(|e| e.position.distance(face_centroid))
        .collect();

    if let Some(hit) = distances.iter().position(|&d| d <= f64::MIN_POSITIVE) {
        let mut w = vec![0.0; distances.len()];
        w[hit] = 1.0;
        return w;
    }

    let inv: Vec<f64> = distances.iter().map(|d| 1.0 / d).collect();
    let sum: f64 = inv.iter().sum();
    inv.into_iter().map(|w| w / sum).collect()
}

/// 各拟合类型的面数统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpolationStats {
    /// 点拟合
    pub point: usize,
    /// 线拟合
    pub line: usize,
    /// 面拟合
    pub planar: usize,
    /// 体拟合
    pub volumetric: usize,
}

impl InterpolationStats {
    fn record(&mut self, kind: FitKind) {
        match kind {
            FitKind::Point => self.point += 1,
            FitKind::Line => self.line += 1,
            FitKind::Planar => self.planar += 1,
            FitKind::Volumetric => self.volumetric += 1,
        }
    }
}

/// 面插值模板构建器
#[derive(Debug, Clone, Copy)]
pub struct StencilBuilder {
    scheme: InterpolationScheme,
}

impl StencilBuilder {
    /// 创建
    pub fn new(scheme: InterpolationScheme) -> Self {
        Self { scheme }
    }

    /// 当前方案
    pub fn scheme(&self) -> InterpolationScheme {
        self.scheme
    }

    /// 计算单个面的权重映射
    pub fn face_weights(&self, mesh: &Mesh, face: usize) -> (BTreeMap<usize, f64>, Option<FitKind>) {
        let stencil = Stencil::for_face(mesh, face, self.scheme.max_stencil_size());
        let (weights, kind) = self.scheme.weights(&stencil, mesh.face(face).centroid, mesh.dimension());
        let map = stencil
            .entries()
            .iter()
            .zip(weights)
            .map(|(e, w)| (e.cell, w))
            .collect();
        (map, kind)
    }

    /// 为网格所有面写入权重
    pub fn apply(&self, mesh: &mut Mesh) -> InterpolationStats {
        let mut stats = InterpolationStats::default();
        for f in 0..mesh.n_faces() {
            let (map, kind) = self.face_weights(mesh, f);
            if let Some(kind) = kind {
                stats.record(kind);
            }
            mesh.set_face_weights(f, map);
        }
        log::debug!(
            "{} 插值权重: {} 个面 (点 {}, 线 {}, 面 {}, 体 {})",
            self.scheme.name(),
            mesh.n_faces(),
            stats.point,
            stats.line,
            stats.planar,
            stats.volumetric
        );
        stats
    }
}
