// crates/fv_physics/src/numerics/limiter/mod.rs

//! # 梯度限制器模块
//!
//! - [`functions`] - 纯标量限制函数
//! - [`LimiterKind`] - 启动时选定的限制器变体
//!
//! 限制器对比重构增量 Δf 与朝邻居极值允许的增量 Δallowed：
//!
//! ```text
//! α_face = clamp(L(Δf, Δallowed) / Δf, 0, 1)，并且不超过 Δallowed / Δf
//! ```
//!
//! ## 限制器选择指南
//!
//! | 限制器 | 耗散性 | 适用场景 |
//! |--------|--------|----------|
//! | minmod | 高 | 强间断 |
//! | doubleMinmod | 中 | 通用 |
//! | harmonic | 中低 | 光滑流动 |
//! | superbee | 低 | 接触间断 |

pub mod functions;

pub use functions::{double_minmod, harmonic, maxmod, minmod, sign, superbee};

use fv_config::LimiterChoice;

/// 视为零增量的阈值
const DELTA_EPS: f64 = 1e-14;

/// 限制器变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimiterKind {
    /// 不限制
    #[default]
    None,
    /// Minmod
    Minmod,
    /// 双 Minmod
    DoubleMinmod,
    /// 调和平均
    Harmonic,
    /// Superbee
    Superbee,
}

impl From<LimiterChoice> for LimiterKind {
    fn from(choice: LimiterChoice) -> Self {
        match choice {
            LimiterChoice::None => Self::None,
            LimiterChoice::Minmod => Self::Minmod,
            LimiterChoice::DoubleMinmod => Self::DoubleMinmod,
            LimiterChoice::Harmonic => Self::Harmonic,
            LimiterChoice::Superbee => Self::Superbee,
        }
    }
}

impl LimiterKind {
    /// 是否启用限制
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// 应用限制函数 L(a, b)
    #[inline]
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::None => a,
            Self::Minmod => minmod(a, b),
            Self::DoubleMinmod => double_minmod(a, b),
            Self::Harmonic => harmonic(a, b),
            Self::Superbee => superbee(a, b),
        }
    }

    /// 单个面的限制因子 α ∈ [0, 1]
    ///
    /// `delta_face` 为外推增量 ∇φ·(x_f − x_c)，
    /// `delta_max` / `delta_min` 为邻居极值相对单元值的增量。
    pub fn face_factor(&self, delta_face: f64, delta_max: f64, delta_min: f64) -> f64 {
        if !self.is_active() || delta_face.abs() < DELTA_EPS {
            return 1.0;
        }
        let allowed = if delta_face > 0.0 { delta_max } else { delta_min };
        let ratio = allowed / delta_face;
        let limited = (self.apply(delta_face, allowed) / delta_face).clamp(0.0, 1.0);
        limited.min(ratio.max(0.0))
    }

    /// 名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minmod => "minmod",
            Self::DoubleMinmod => "doubleMinmod",
            Self::Harmonic => "harmonic",
            Self::Superbee => "superbee",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [LimiterKind; 4] = [
        LimiterKind::Minmod,
        LimiterKind::DoubleMinmod,
        LimiterKind::Harmonic,
        LimiterKind::Superbee,
    ];

    #[test]
    fn test_none_never_limits() {
        assert_eq!(LimiterKind::None.face_factor(10.0, 0.1, -0.1), 1.0);
    }

    #[test]
    fn test_face_value_stays_in_range() {
        for kind in ALL {
            for &(df, dmax, dmin) in &[(2.0, 0.5, -1.0), (-3.0, 1.0, -0.3), (0.4, 1.0, -1.0)] {
                let alpha = kind.face_factor(df, dmax, dmin);
                assert!((0.0..=1.0).contains(&alpha), "{:?}", kind);
                let limited = alpha * df;
                assert!(limited <= dmax + 1e-12 && limited >= dmin - 1e-12, "{:?}", kind);
            }
        }
    }

    #[test]
    fn test_local_extremum_gives_zero() {
        for kind in ALL {
            // 单元是极大值：Δmax = 0
            assert_eq!(kind.face_factor(1.0, 0.0, -2.0), 0.0);
        }
    }

    #[test]
    fn test_from_choice() {
        assert_eq!(LimiterKind::from(LimiterChoice::Superbee), LimiterKind::Superbee);
        assert!(!LimiterKind::from(LimiterChoice::None).is_active());
    }
}
