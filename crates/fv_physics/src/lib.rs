// crates/fv_physics/src/lib.rs

//! 非结构化有限体积离散与时间推进核心
//!
//! 提供分区网格上的：
//! - 网格模型 (mesh) - 拥有单元 + 幽灵单元，面插值权重
//! - 状态方程 (eos) - 理想气体
//! - 数值方法 (numerics) - 面插值模板、梯度重构、限制器
//! - 分区通信 (parallel) - 集体归约、幽灵同步
//! - 运行期上下文 (context)
//! - 求解引擎 (engine) - 时间步控制、子迭代编排
//! - 周期输出 (output) - 诊断、重启、场、探针、边界通量
//!
//! # 外部协作者
//!
//! 线性系统的组装与求解、湍流方程都通过 trait 注入：
//! [`LinearSystem`], [`TurbulenceModel`]。
//!
//! # 示例
//!
//! ```rust,ignore
//! use fv_physics::{BoxMeshParams, SerialComm, Solver};
//!
//! let mesh = BoxMeshParams::line(10, 1.0).build_partitions(1)?.remove(0);
//! let mut solver = Solver::new(config, mesh, &SerialComm)?;
//! let summary = solver.run()?;
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod engine;
pub mod eos;
pub mod error;
pub mod initial;
pub mod mesh;
pub mod numerics;
pub mod output;
pub mod parallel;
pub mod state;

// 重导出常用类型
pub use context::SimulationContext;
pub use engine::{
    FixedIncrementSystem, LinearSolveError, LinearSolveReport, LinearSystem, Residuals, RunSummary,
    Solver, StepReport, TimeStepController, TimeStepMode, TurbulenceModel,
};
pub use eos::{create_eos, EquationOfState, IdealGas, UNIV_GAS_CONST};
pub use error::{PhysicsError, PhysicsResult};
pub use mesh::{BoundaryTag, BoxMeshParams, Cell, CellId, Face, GhostKind, Mesh, MeshBuilder};
pub use numerics::{
    FitKind, GradientEngine, GradientScheme, InterpolationScheme, InterpolationStats, LimiterKind,
    StencilBuilder,
};
pub use output::{FileOutputs, OutputSink, RestartSnapshot};
pub use parallel::{agree, Communicator, GhostExchanger, LocalCluster, ReduceOp, SerialComm, ThreadComm};
pub use state::{CellGradient, FlowState, Increment, PrimitiveState, N_VARS};
