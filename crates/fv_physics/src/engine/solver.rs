// crates/fv_physics/src/engine/solver.rs

//! 求解编排器
//!
//! 外层物理时间循环套内层伪时间子迭代。每个物理步：
//!
//! ```text
//! 同步幽灵 → (首步: 梯度 → 同步 → 限制 → 同步 → 湍流初始化)
//!   → 计算 dt + 最大 CFL → 线性系统初始化
//!   → 子迭代 {
//!        [多子步: 伪时间步] → 组装 → [多子步: 伪时间项] → 线性求解
//!        → 应用增量 + 残差 → 同步幽灵 → 梯度 → 同步 → 限制 → 同步
//!        → 收敛判断
//!     }
//!   → 计算 dt + 最大 CFL → 湍流求解 → 推进时间 → 诊断 → 爬升
//!   → 周期输出
//! ```
//!
//! 所有分区以锁步执行；dt、CFL、残差、边界通量、探针归属都经集体归约。
//! 线性求解、输出与重启读取的错误同样经表决，任一分区出错则全部中止。

use std::path::Path;
use std::time::Duration;

use fv_config::SolverConfig;

use super::linear::{FixedIncrementSystem, LinearSolveReport, LinearSystem, N_FLUX};
use super::residual::{ResidualSums, ResidualTracker, Residuals};
use super::timestep::TimeStepController;
use super::turbulence::TurbulenceModel;
use crate::context::SimulationContext;
use crate::error::{PhysicsError, PhysicsResult};
use crate::initial::initial_state;
use crate::mesh::Mesh;
use crate::numerics::gradient::GradientEngine;
use crate::numerics::interpolation::{InterpolationScheme, InterpolationStats, StencilBuilder};
use crate::output::{OutputSink, RestartSnapshot};
use crate::parallel::{agree, Communicator, GhostExchanger, ReduceOp};
use crate::state::{CellGradient, FlowState, Increment};

/// 单个物理步的结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    /// 物理步编号
    pub step: usize,
    /// 步末物理时间
    pub time: f64,
    /// 本步时间推进量
    pub dt: f64,
    /// 全局最大 CFL
    pub cfl_max: f64,
    /// 最后一个子步的残差
    pub residuals: Residuals,
    /// 执行的子步数
    pub substeps: usize,
    /// 是否在子步上限前收敛
    pub converged: bool,
    /// 最后一次线性求解
    pub linear: LinearSolveReport,
    /// 湍流残差 (k, ω)
    pub turbulence: Option<(f64, f64)>,
}

/// 整个运行的结果
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// 完成的物理步数
    pub steps: usize,
    /// 最后的物理步编号
    pub final_step: usize,
    /// 最终物理时间
    pub final_time: f64,
    /// 最后一步的报告
    pub last: Option<StepReport>,
    /// 墙钟时间
    pub wall_time: Duration,
}

/// 分区求解器
pub struct Solver<'a> {
    config: SolverConfig,
    mesh: Mesh,
    comm: &'a dyn Communicator,
    ctx: SimulationContext,
    ghosts: GhostExchanger,
    state: FlowState,
    gradients: Vec<CellGradient>,
    gradient_engine: GradientEngine,
    time_step: TimeStepController,
    pseudo_step: TimeStepController,
    tracker: ResidualTracker,
    linear: Box<dyn LinearSystem + 'a>,
    turbulence: Option<Box<dyn TurbulenceModel + 'a>>,
    outputs: Option<Box<dyn OutputSink + 'a>>,
    interpolation: InterpolationStats,
    /// 已完成的最后一步
    step: usize,
    /// 本次运行的起始步（重启步或 0）
    start_step: usize,
    time: f64,
}

impl std::fmt::Debug for Solver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("rank", &self.ctx.rank())
            .field("step", &self.step)
            .field("time", &self.time)
            .field("n_cells", &self.mesh.n_cells())
            .finish()
    }
}

impl<'a> Solver<'a> {
    /// 建立求解器（集体操作）
    ///
    /// 校验配置与网格、建立上下文、写入面插值权重、建立幽灵收发表、
    /// 施加初始条件。线性系统默认为零增量替身。
    pub fn new(config: SolverConfig, mut mesh: Mesh, comm: &'a dyn Communicator) -> PhysicsResult<Self> {
        config.validate()?;
        agree(comm, mesh.validate(), "网格校验")?;
        let ctx = SimulationContext::initialize(&config, &mesh, comm)?;

        let scheme = InterpolationScheme::from_config(&config.grid.interpolation, mesh.dimension());
        let interpolation = StencilBuilder::new(scheme).apply(&mut mesh);
        let ghosts = agree(comm, GhostExchanger::new(&mesh, comm), "幽灵收发表")?;

        let cells = initial_state(&mesh, &config.initial_conditions, ctx.eos());
        let n = mesh.n_cells();
        let state = FlowState {
            cells,
            dt: vec![config.time_marching.step.dt; n],
            pseudo_dt: vec![config.pseudo_time.step.dt; n],
            update: vec![Increment::default(); n],
        };

        let time_step = TimeStepController::from_config(&config.time_marching.step)
            .with_ramp(config.time_marching.ramp.as_ref());
        let pseudo_step = TimeStepController::from_config(&config.pseudo_time.step);
        let linear: Box<dyn LinearSystem + 'a> = Box::new(FixedIncrementSystem::new(&config.linear_solver));

        if comm.is_root() {
            log::info!(
                "插值 {}, 限制器 {}, 时间步 {:?}, 伪时间步 {:?} (最多 {} 子步)",
                scheme.name(),
                config.gradients.limiter.name(),
                time_step.mode(),
                pseudo_step.mode(),
                config.pseudo_time.max_steps
            );
        }

        Ok(Self {
            gradient_engine: GradientEngine::new(config.gradients.limiter.into()),
            config,
            mesh,
            comm,
            ctx,
            ghosts,
            state,
            gradients: Vec::new(),
            time_step,
            pseudo_step,
            tracker: ResidualTracker::default(),
            linear,
            turbulence: None,
            outputs: None,
            interpolation,
            step: 0,
            start_step: 0,
            time: 0.0,
        })
    }

    /// 替换线性系统
    pub fn with_linear_system(mut self, linear: impl LinearSystem + 'a) -> Self {
        self.linear = Box::new(linear);
        self
    }

    /// 启用湍流模型
    pub fn with_turbulence(mut self, model: impl TurbulenceModel + 'a) -> Self {
        self.turbulence = Some(Box::new(model));
        self
    }

    /// 设置输出
    pub fn with_outputs(mut self, outputs: impl OutputSink + 'a) -> Self {
        self.outputs = Some(Box::new(outputs));
        self
    }

    /// 从快照继续：步号与时间取自快照，关闭爬升（集体操作）
    pub fn resume(mut self, snapshot: RestartSnapshot) -> PhysicsResult<Self> {
        let checked = snapshot.check(&self.mesh, self.ctx.rank(), self.ctx.size());
        agree(self.comm, checked, "重启校验")?;
        self.state.cells = snapshot.cells;
        self.state.dt = snapshot.dt;
        self.step = snapshot.step;
        self.start_step = snapshot.step;
        self.time = snapshot.time;
        self.time_step.disable_ramp();
        if self.comm.is_root() {
            log::info!("从第 {} 步 (t = {:.6e}) 继续", self.step, self.time);
        }
        Ok(self)
    }

    /// 从输出目录中的快照继续（集体操作）
    pub fn resume_from(self, directory: &Path, step: usize) -> PhysicsResult<Self> {
        let loaded = RestartSnapshot::load(directory, step, self.ctx.rank());
        let snapshot = agree(self.comm, loaded, "重启读取")?;
        self.resume(snapshot)
    }

    /// 网格
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// 流动状态
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// 梯度（首个物理步之前为空）
    pub fn gradients(&self) -> &[CellGradient] {
        &self.gradients
    }

    /// 运行期上下文
    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// 物理时间步控制器
    pub fn time_step(&self) -> &TimeStepController {
        &self.time_step
    }

    /// 面插值统计
    pub fn interpolation_stats(&self) -> InterpolationStats {
        self.interpolation
    }

    /// 已完成的最后一步
    pub fn step(&self) -> usize {
        self.step
    }

    /// 物理时间
    pub fn time(&self) -> f64 {
        self.time
    }

    /// 梯度 → 同步 → 限制 → 同步
    fn update_gradients(&mut self) {
        self.gradient_engine.compute(&self.mesh, &self.state.cells, &mut self.gradients);
        self.ghosts.sync_gradients(&mut self.gradients, self.comm);
        self.gradient_engine.limit(&self.mesh, &self.state.cells, &mut self.gradients);
        self.ghosts.sync_gradients(&mut self.gradients, self.comm);
    }

    /// 把增量加到拥有单元，返回全局残差（集体操作）
    fn apply_update(&mut self) -> Residuals {
        let eos = self.ctx.eos();
        let mut sums = ResidualSums::default();
        for c in 0..self.mesh.n_owned() {
            let inc = self.state.update[c];
            let s = &mut self.state.cells[c];
            s.p += inc.dp;
            s.v += inc.dv;
            s.t += inc.dt;
            s.rho = eos.density(s.p, s.t);
            sums.add(&inc);
        }
        sums.reduce(&self.config.reference, self.ctx.global_cell_count(), self.comm)
    }

    fn compute_dt(&mut self) -> f64 {
        let eos = self.ctx.eos();
        self.time_step.compute(
            &self.mesh,
            &self.state.cells,
            &self.state.update,
            &mut self.state.dt,
            eos,
            self.comm,
        );
        self.time_step.max_cfl(&self.mesh, &self.state.cells, &self.state.dt, eos, self.comm)
    }

    /// 推进一个物理步
    pub fn advance_step(&mut self) -> PhysicsResult<StepReport> {
        let step = self.step + 1;
        let flux_freq = self.config.output.integrate_boundary_freq;
        if flux_freq > 0 && step % flux_freq == 0 {
            self.linear.reset_boundary_fluxes();
        }

        self.ghosts.sync_state(&mut self.state.cells, self.comm);
        if step == self.start_step + 1 {
            self.update_gradients();
            if let Some(turb) = self.turbulence.as_mut() {
                turb.initialize(&self.mesh, &self.state, &self.gradients);
            }
        }

        self.compute_dt();
        self.linear.initialize(&self.mesh, &self.state, self.ctx.eos());

        let max_steps = self.config.pseudo_time.max_steps;
        let tolerance = self.config.pseudo_time.tolerance;
        let multi = max_steps > 1;
        self.tracker.reset();

        let mut residuals = Residuals::default();
        let mut linear = LinearSolveReport::default();
        let mut substeps = 0;
        let mut converged = false;
        for substep in 1..=max_steps {
            if multi {
                self.pseudo_step.compute(
                    &self.mesh,
                    &self.state.cells,
                    &self.state.update,
                    &mut self.state.pseudo_dt,
                    self.ctx.eos(),
                    self.comm,
                );
            }
            self.linear.assemble(&self.mesh, &self.state, &self.gradients, self.ctx.eos());
            if multi {
                self.linear.add_pseudo_time_terms(&self.mesh, &self.state);
            }
            let solved = self.linear.solve(&mut self.state.update);
            let failed = self.comm.all_reduce_scalar(if solved.is_err() { 1.0 } else { 0.0 }, ReduceOp::Max);
            linear = match solved {
                Err(e) => return Err(PhysicsError::LinearSolve { step, substep, reason: e.to_string() }),
                Ok(_) if failed > 0.0 => {
                    return Err(PhysicsError::LinearSolve {
                        step,
                        substep,
                        reason: "其他分区线性求解失败".to_string(),
                    })
                }
                Ok(report) => report,
            };

            residuals = self.apply_update();
            self.ghosts.sync_state(&mut self.state.cells, self.comm);
            self.update_gradients();

            self.tracker.record(residuals);
            substeps = substep;
            if self.tracker.converged(&residuals, tolerance) {
                converged = true;
                break;
            }
        }
        if !converged {
            log::debug!("第 {} 步达到子步上限 {}", step, max_steps);
        }

        let cfl_max = self.compute_dt();
        let turbulence = self
            .turbulence
            .as_mut()
            .map(|turb| turb.solve(&self.mesh, &self.state, &self.gradients));

        let dt = self.time_step.time_advance();
        self.time += dt;
        self.step = step;

        let report = StepReport {
            step,
            time: self.time,
            dt,
            cfl_max,
            residuals,
            substeps,
            converged,
            linear,
            turbulence,
        };
        if self.comm.is_root() {
            log::info!(
                "步 {} t={:.6e} dt={:.4e} CFLmax={:.4} resP={:.4e} resV={:.4e} resT={:.4e} 子步={}",
                step,
                self.time,
                dt,
                cfl_max,
                residuals.p,
                residuals.v,
                residuals.t,
                substeps
            );
        }
        let diagnostics = match self.outputs.as_mut() {
            Some(out) if self.comm.is_root() => out.diagnostics(&report),
            _ => Ok(()),
        };

        self.time_step.ramp_adjust();
        // 出错后仍走完所有集体调用，再统一表决
        let written = diagnostics.and(self.write_outputs(step));
        agree(self.comm, written, "输出")?;
        Ok(report)
    }

    fn write_outputs(&mut self, step: usize) -> PhysicsResult<()> {
        let Some(out) = self.outputs.as_mut() else {
            return Ok(());
        };
        let cfg = &self.config.output;
        let due = |freq: usize| freq > 0 && step % freq == 0;

        let mut result: PhysicsResult<()> = Ok(());
        if due(cfg.restart_freq) {
            let snapshot = RestartSnapshot {
                step,
                time: self.time,
                rank: self.ctx.rank(),
                partitions: self.ctx.size(),
                cells: self.state.cells.clone(),
                dt: self.state.dt.clone(),
            };
            result = result.and(out.restart(&snapshot, self.comm));
        }
        if due(cfg.output_freq) && result.is_ok() {
            result = out.fields(step, self.time, &self.mesh, &self.state.cells);
        }
        if due(cfg.probe_freq) && result.is_ok() {
            result = out.probes(step, self.time, &self.state.cells);
        }
        if due(cfg.integrate_boundary_freq) {
            for report in &cfg.boundary_fluxes {
                let local = self.linear.boundary_fluxes(report.boundary);
                if let Some(global) = self.comm.reduce_to_root(&local, ReduceOp::Sum) {
                    let mut flux = [0.0; N_FLUX];
                    flux.copy_from_slice(&global[..N_FLUX]);
                    if result.is_ok() {
                        result = out.boundary_fluxes(step, self.time, &report.name, &flux);
                    }
                }
            }
        }
        result
    }

    /// 执行 `time_marching.number_of_steps` 个物理步
    pub fn run(&mut self) -> PhysicsResult<RunSummary> {
        let n = self.config.time_marching.number_of_steps;
        let mut last = None;
        for _ in 0..n {
            last = Some(self.advance_step()?);
        }
        Ok(RunSummary {
            steps: n,
            final_step: self.step,
            final_time: self.time,
            last,
            wall_time: self.ctx.elapsed(),
        })
    }

    /// 结束运行，交出最终状态
    pub fn finish(self) -> (Mesh, FlowState) {
        self.ctx.teardown();
        (self.mesh, self.state)
    }
}
