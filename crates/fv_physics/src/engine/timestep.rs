// crates/fv_physics/src/engine/timestep.rs

//! 时间步长控制模块
//!
//! ## CFL 条件
//!
//! 单元 CFL 数：
//!
//! $$ C_c = \frac{(|v_c| + a_c)\,\Delta t}{L_c}, \quad a_c = \sqrt{\gamma (p_c + p_{ref}) / \rho_c} $$
//!
//! ## 模式
//!
//! | 模式 | 每单元 dt | 分区间归约 |
//! |------|-----------|------------|
//! | FIXED | 配置值（或爬升值） | 无 |
//! | CFL_MAX | 全局最小 CFL·L/(|v|+a) | MIN |
//! | CFL_LOCAL | 各自的 CFL·L/(|v|+a) | 无 |
//! | ADAPTIVE | 按上一次更新量放大/减半，夹到 [dt_min, dt_max] | 无 |
//!
//! 物理时间步与伪时间步各用一个控制器，可独立选择模式。

use fv_config::{RampConfig, TimeStepConfig, TimeStepType};

use crate::eos::EquationOfState;
use crate::mesh::Mesh;
use crate::parallel::{Communicator, ReduceOp};
use crate::state::{Increment, PrimitiveState};

/// 时间步模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStepMode {
    /// 固定步长
    Fixed,
    /// 全局 CFL
    CflMax,
    /// 局部 CFL
    CflLocal,
    /// 自适应
    Adaptive,
}

impl From<TimeStepType> for TimeStepMode {
    fn from(t: TimeStepType) -> Self {
        match t {
            TimeStepType::Fixed => Self::Fixed,
            TimeStepType::CflMax => Self::CflMax,
            TimeStepType::CflLocal => Self::CflLocal,
            TimeStepType::Adaptive => Self::Adaptive,
        }
    }
}

/// 单元波速 |v| + a
#[inline]
pub fn wave_speed(state: &PrimitiveState, eos: &dyn EquationOfState) -> f64 {
    state.v.length() + eos.sound_speed(state.p, state.rho)
}

/// 时间步长控制器
#[derive(Debug, Clone)]
pub struct TimeStepController {
    mode: TimeStepMode,
    /// 配置的目标步长
    dt_target: f64,
    /// 配置的目标 CFL
    cfl_target: f64,
    /// 当前全局步长
    dt_current: f64,
    /// 当前 CFL（爬升中可能低于目标）
    cfl_current: f64,
    dt_min: f64,
    dt_max: f64,
    relax: f64,
    /// 爬升增长因子，None 表示不爬升
    ramp_growth: Option<f64>,
}

impl TimeStepController {
    /// 由配置创建
    pub fn from_config(config: &TimeStepConfig) -> Self {
        Self {
            mode: config.step_type.into(),
            dt_target: config.dt,
            cfl_target: config.cfl,
            dt_current: config.dt,
            cfl_current: config.cfl,
            dt_min: config.dt_min,
            dt_max: config.dt_max,
            relax: config.relax,
            ramp_growth: None,
        }
    }

    /// 设置爬升：FIXED 爬升步长，CFL 模式爬升 CFL，ADAPTIVE 忽略
    pub fn with_ramp(mut self, ramp: Option<&RampConfig>) -> Self {
        let Some(ramp) = ramp else {
            return self;
        };
        match self.mode {
            TimeStepMode::Fixed => self.dt_current = ramp.initial.min(self.dt_target),
            TimeStepMode::CflMax | TimeStepMode::CflLocal => {
                self.cfl_current = ramp.initial.min(self.cfl_target)
            }
            TimeStepMode::Adaptive => {
                log::warn!("ADAPTIVE 时间步不支持爬升，忽略 ramp 配置");
                return self;
            }
        }
        self.ramp_growth = Some(ramp.growth);
        self
    }

    /// 关闭爬升并恢复目标值（从重启快照继续时使用）
    pub fn disable_ramp(&mut self) {
        if self.ramp_growth.take().is_some() {
            self.dt_current = self.dt_target;
            self.cfl_current = self.cfl_target;
            log::info!("从重启继续，关闭时间步爬升");
        }
    }

    /// 模式
    #[inline]
    pub fn mode(&self) -> TimeStepMode {
        self.mode
    }

    /// 当前全局步长
    #[inline]
    pub fn dt_current(&self) -> f64 {
        self.dt_current
    }

    /// 当前 CFL 值
    #[inline]
    pub fn cfl_current(&self) -> f64 {
        self.cfl_current
    }

    /// 是否正在爬升
    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.ramp_growth.is_some()
    }

    /// 物理时间推进量：全局模式取当前步长，局部模式取配置步长
    pub fn time_advance(&self) -> f64 {
        match self.mode {
            TimeStepMode::Fixed | TimeStepMode::CflMax => self.dt_current,
            TimeStepMode::CflLocal | TimeStepMode::Adaptive => self.dt_target,
        }
    }

    /// 计算拥有单元的时间步，写入 `dt`
    ///
    /// CFL_MAX 模式包含一次 MIN 归约（集体操作）。
    pub fn compute(
        &mut self,
        mesh: &Mesh,
        cells: &[PrimitiveState],
        update: &[Increment],
        dt: &mut [f64],
        eos: &dyn EquationOfState,
        comm: &dyn Communicator,
    ) {
        let n = mesh.n_owned();
        match self.mode {
            TimeStepMode::Fixed => dt[..n].fill(self.dt_current),
            TimeStepMode::CflMax => {
                let local = (0..n)
                    .map(|c| self.cfl_current * mesh.cell(c).length_scale / wave_speed(&cells[c], eos))
                    .fold(f64::INFINITY, f64::min);
                let global = comm.all_reduce_scalar(local, ReduceOp::Min);
                if global.is_finite() {
                    self.dt_current = global;
                }
                dt[..n].fill(self.dt_current);
            }
            TimeStepMode::CflLocal => {
                for c in 0..n {
                    dt[c] = self.cfl_current * mesh.cell(c).length_scale / wave_speed(&cells[c], eos);
                }
            }
            TimeStepMode::Adaptive => {
                let (p_ref, t_ref) = (eos.p_ref(), eos.t_ref());
                for c in 0..n {
                    let p_scale = self.relax * (cells[c].p + p_ref).abs();
                    let t_scale = self.relax * (cells[c].t + t_ref).abs();
                    let dp = update[c].dp.abs();
                    let dtemp = update[c].dt.abs();
                    if dp > p_scale || dtemp > t_scale {
                        dt[c] *= 0.5;
                    } else if dp < 0.5 * p_scale || dtemp < 0.5 * t_scale {
                        dt[c] *= 1.0 + self.relax;
                    }
                    dt[c] = dt[c].clamp(self.dt_min, self.dt_max);
                }
            }
        }
    }

    /// 全局最大 CFL（MAX 归约，集体操作）
    pub fn max_cfl(
        &self,
        mesh: &Mesh,
        cells: &[PrimitiveState],
        dt: &[f64],
        eos: &dyn EquationOfState,
        comm: &dyn Communicator,
    ) -> f64 {
        let local = (0..mesh.n_owned())
            .map(|c| wave_speed(&cells[c], eos) * dt[c] / mesh.cell(c).length_scale)
            .fold(0.0_f64, f64::max);
        comm.all_reduce_scalar(local, ReduceOp::Max)
    }

    /// 每个外层步结束时推进爬升
    pub fn ramp_adjust(&mut self) {
        let Some(growth) = self.ramp_growth else {
            return;
        };
        match self.mode {
            TimeStepMode::Fixed => {
                if self.dt_current < self.dt_target {
                    self.dt_current = (self.dt_current * growth).min(self.dt_target);
                }
            }
            TimeStepMode::CflMax | TimeStepMode::CflLocal => {
                self.cfl_current = (self.cfl_current * growth).min(self.cfl_target);
            }
            TimeStepMode::Adaptive => {}
        }
    }
}
