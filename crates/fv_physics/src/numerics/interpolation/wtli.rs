// crates/fv_physics/src/numerics/interpolation/wtli.rs

//! 几何加权最小二乘线性插值 (WTLI)
//!
//! 1. 以父单元为原点，对方向 d_i = x_i − x_0 做 Gram-Schmidt 正交化；
//!    正交分量不超过 `tol·|d_i|` 的方向视为冗余，接受的方向数不超过网格维度。
//! 2. 拟合类型 = 接受方向数 + 1（点=1、线=2、面=3、体=4）。
//! 3. 在张成的子空间内做加权最小二乘线性拟合（权重 1/|x_f − x_i|²），
//!    面值即拟合常数项，对应的行向量就是各点的插值权重。
//! 4. 法方程奇异时降低一级重试；点拟合直接复制最近点的值。

use glam::{DMat4, DVec3, DVec4};

use super::stencil::Stencil;

/// 重合判定的相对阈值
const COINCIDENT_TOL: f64 = 1e-12;

/// 法方程奇异判定的相对阈值
const SINGULAR_TOL: f64 = 1e-12;

/// 拟合类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FitKind {
    /// 点（直接复制）
    Point = 1,
    /// 线
    Line = 2,
    /// 面
    Planar = 3,
    /// 体
    Volumetric = 4,
}

impl FitKind {
    fn from_directions(n: usize) -> Self {
        match n {
            0 => Self::Point,
            1 => Self::Line,
            2 => Self::Planar,
            _ => Self::Volumetric,
        }
    }

    fn lower(self) -> Self {
        match self {
            Self::Volumetric => Self::Planar,
            Self::Planar => Self::Line,
            _ => Self::Point,
        }
    }

    /// 拟合方向数
    #[inline]
    pub fn directions(self) -> usize {
        self as usize - 1
    }
}

/// 选取独立方向（单位正交基）
pub fn independent_directions(stencil: &Stencil, tolerance: f64, dimension: usize) -> Vec<DVec3> {
    let entries = stencil.entries();
    let Some(origin) = entries.first().map(|e| e.position) else {
        return Vec::new();
    };

    let mut basis: Vec<DVec3> = Vec::with_capacity(dimension);
    for e in &entries[1..] {
        if basis.len() >= dimension {
            break;
        }
        let d = e.position - origin;
        let len = d.length();
        if len <= 0.0 {
            continue;
        }
        let r = basis.iter().fold(d, |r, b| r - r.dot(*b) * *b);
        let r_len = r.length();
        if r_len > tolerance * len {
            basis.push(r / r_len);
        }
    }
    basis
}

/// 计算 WTLI 权重，返回 (按模板顺序的权重, 实际拟合类型)
pub fn wtli_weights(
    stencil: &Stencil,
    face_centroid: DVec3,
    tolerance: f64,
    dimension: usize,
) -> (Vec<f64>, FitKind) {
    let n = stencil.len();
    let entries = stencil.entries();
    let scale = entries
        .iter()
        .map(|e| e.position.distance(face_centroid))
        .fold(0.0_f64, f64::max);

    let nearest = stencil.nearest_to(face_centroid);
    let copy_nearest = || {
        let mut w = vec![0.0; n];
        if n > 0 {
            w[nearest] = 1.0;
        }
        w
    };

    if n == 0 || entries[nearest].position.distance(face_centroid) <= COINCIDENT_TOL * scale {
        return (copy_nearest(), FitKind::Point);
    }

    let basis = independent_directions(stencil, tolerance, dimension);
    let mut kind = FitKind::from_directions(basis.len());

    while kind != FitKind::Point {
        if let Some(w) = least_squares_weights(stencil, face_centroid, &basis[..kind.directions()]) {
            return (w, kind);
        }
        log::trace!("WTLI 法方程奇异，拟合类型 {:?} 降级", kind);
        kind = kind.lower();
    }
    (copy_nearest(), FitKind::Point)
}

/// 子空间内的加权最小二乘，返回面心常数项对应的权重
fn least_squares_weights(stencil: &Stencil, face_centroid: DVec3, basis: &[DVec3]) -> Option<Vec<f64>> {
    let rows: Vec<(DVec4, f64)> = stencil
        .entries()
        .iter()
        .map(|e| {
            let rel = e.position - face_centroid;
            let mut r = DVec4::new(1.0, 0.0, 0.0, 0.0);
            for (k, b) in basis.iter().enumerate() {
                r[k + 1] = rel.dot(*b);
            }
            (r, 1.0 / rel.length_squared())
        })
        .collect();

    let mut m = DMat4::ZERO;
    for &(r, w) in &rows {
        m += DMat4::from_cols(r * (w * r.x), r * (w * r.y), r * (w * r.z), r * (w * r.w));
    }
    // 未使用的维度固定为单位阵
    for k in basis.len() + 1..4 {
        m.col_mut(k)[k] = 1.0;
    }

    let diag_product: f64 = (0..4).map(|k| m.col(k)[k]).product();
    let det = m.determinant();
    if !(det.abs() > SINGULAR_TOL * diag_product.abs()) {
        return None;
    }

    let inv = m.inverse();
    // 对称矩阵：第 0 列即第 0 行
    let row0 = inv.col(0);
    let mut weights: Vec<f64> = rows.iter().map(|&(r, w)| w * row0.dot(r)).collect();

    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() || sum.abs() < f64::EPSILON {
        return None;
    }
    for w in &mut weights {
        *w /= sum;
    }
    Some(weights)
}
