// crates/fv_physics/src/engine/mod.rs

//! 求解引擎
//!
//! # 模块结构
//!
//! - `timestep` - 时间步长控制（FIXED / CFL_MAX / CFL_LOCAL / ADAPTIVE + 爬升）
//! - `residual` - 子迭代残差与收敛跟踪
//! - `linear` - 外部线性系统接口与确定性替身
//! - `turbulence` - 湍流模型挂钩
//! - `solver` - 外层/内层循环编排

pub mod linear;
pub mod residual;
pub mod solver;
pub mod timestep;
pub mod turbulence;

pub use linear::{FixedIncrementSystem, LinearSolveError, LinearSolveReport, LinearSystem, N_FLUX};
pub use residual::{ResidualSums, ResidualTracker, Residuals};
pub use solver::{RunSummary, Solver, StepReport};
pub use timestep::{wave_speed, TimeStepController, TimeStepMode};
pub use turbulence::TurbulenceModel;
