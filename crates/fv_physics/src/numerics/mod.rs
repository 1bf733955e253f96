// crates/fv_physics/src/numerics/mod.rs

//! 数值方法模块
//!
//! 包含：
//! - interpolation/ - 面插值模板与权重 (WTLI, IDW, SIMPLE)
//! - gradient/ - 单元梯度 (加权最小二乘, 曲线坐标)
//! - limiter/ - 梯度限制器 (minmod, doubleMinmod, harmonic, superbee)

pub mod gradient;
pub mod interpolation;
pub mod limiter;

pub use gradient::{GradientEngine, GradientScheme};
pub use interpolation::{FitKind, InterpolationScheme, InterpolationStats, Stencil, StencilBuilder};
pub use limiter::LimiterKind;
