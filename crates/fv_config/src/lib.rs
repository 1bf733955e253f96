// crates/fv_config/src/lib.rs

//! FreeVolume Config Layer
//!
//! 配置层，提供按节组织的求解器配置、类型化节查询和启动期验证。
//!
//! # 模块概览
//!
//! - [`methods`]: 插值/限制器/时间步/状态方程的封闭选项集合
//! - [`solver_config`]: SolverConfig 求解器配置（全 f64）
//! - [`tree`]: 按 "节/子节/键" 的类型化查询
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! fv_cli      ─> SolverConfig::from_file, ConfigTree
//! fv_physics  ─> 由 SolverConfig 构建各策略组件
//! fv_config   ─> 本层
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod methods;
pub mod solver_config;
pub mod tree;

// 重导出核心类型
pub use error::ConfigError;
pub use methods::{EosKind, InterpolationMethod, LimiterChoice, MethodParseError, TimeStepType};
pub use solver_config::{
    BoundaryFluxConfig, FluidConfig, GradientConfig, GridConfig, InitialRegionConfig,
    InterpolationConfig, LinearSolverConfig, OutputConfig, ProbeConfig, PseudoTimeConfig,
    RampConfig, ReferenceConfig, RegionConfig, SolverConfig, TimeMarchingConfig, TimeStepConfig,
};
pub use tree::{ConfigSection, ConfigTree};
