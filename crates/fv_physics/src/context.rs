// crates/fv_physics/src/context.rs

//! 运行期上下文
//!
//! 启动时建立一次、之后只读的全局量：分区编号与分区数、状态方程、
//! 全局单元数。`initialize` 包含一次 SUM 归约，所有分区都必须调用。

use std::fmt;
use std::time::{Duration, Instant};

use fv_config::SolverConfig;

use crate::eos::{create_eos, EquationOfState};
use crate::error::PhysicsResult;
use crate::mesh::Mesh;
use crate::parallel::{Communicator, ReduceOp};

/// 运行期上下文
pub struct SimulationContext {
    rank: usize,
    size: usize,
    eos: Box<dyn EquationOfState>,
    global_cell_count: usize,
    started: Instant,
}

impl fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("eos", &self.eos.name())
            .field("global_cell_count", &self.global_cell_count)
            .finish()
    }
}

impl SimulationContext {
    /// 建立上下文（集体操作）
    pub fn initialize(config: &SolverConfig, mesh: &Mesh, comm: &dyn Communicator) -> PhysicsResult<Self> {
        let eos = create_eos(&config.fluid_properties)?;
        let global = comm.all_reduce_scalar(mesh.n_owned() as f64, ReduceOp::Sum);
        let ctx = Self {
            rank: comm.rank(),
            size: comm.size(),
            eos,
            global_cell_count: global.round() as usize,
            started: Instant::now(),
        };
        if comm.is_root() {
            log::info!(
                "分区数 {}, 全局单元数 {}, 状态方程 {}",
                ctx.size,
                ctx.global_cell_count,
                ctx.eos.name()
            );
        }
        Ok(ctx)
    }

    /// 分区编号
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// 分区数
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// 状态方程
    #[inline]
    pub fn eos(&self) -> &dyn EquationOfState {
        self.eos.as_ref()
    }

    /// 全局拥有单元数
    #[inline]
    pub fn global_cell_count(&self) -> usize {
        self.global_cell_count
    }

    /// 自建立以来的墙钟时间
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 结束运行，根分区报告墙钟时间
    pub fn teardown(self) -> Duration {
        let elapsed = self.elapsed();
        if self.rank == 0 {
            log::info!("墙钟时间 {:.3} s", elapsed.as_secs_f64());
        }
        elapsed
    }
}
