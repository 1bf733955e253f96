// crates/fv_physics/src/engine/residual.rs

//! 子迭代残差
//!
//! ```text
//! res_p = sqrt(Σ Δp²)            / (p_norm · N)
//! res_v = sqrt(Σ Δu²+Δv²+Δw²)    / (v_norm · N)
//! res_T = sqrt(Σ ΔT²)            / (T_norm · N)
//! ```
//!
//! 求和跨所有分区（SUM 归约），N 为全局单元数。收敛判据是相对于
//! 第一个子步的比值。

use fv_config::ReferenceConfig;

use crate::parallel::{Communicator, ReduceOp};
use crate::state::Increment;

/// 残差三元组
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Residuals {
    /// 压力
    pub p: f64,
    /// 速度
    pub v: f64,
    /// 温度
    pub t: f64,
}

/// 本分区的增量平方和
#[derive(Debug, Clone, Copy, Default)]
pub struct ResidualSums {
    p: f64,
    v: f64,
    t: f64,
}

impl ResidualSums {
    /// 累加一个单元的增量
    #[inline]
    pub fn add(&mut self, inc: &Increment) {
        self.p += inc.dp * inc.dp;
        self.v += inc.dv.length_squared();
        self.t += inc.dt * inc.dt;
    }

    /// 全局归约并归一化（集体操作）
    pub fn reduce(
        &self,
        reference: &ReferenceConfig,
        global_cells: usize,
        comm: &dyn Communicator,
    ) -> Residuals {
        let sums = comm.all_reduce(&[self.p, self.v, self.t], ReduceOp::Sum);
        let n = global_cells.max(1) as f64;
        Residuals {
            p: sums[0].sqrt() / (reference.res_p_norm * n),
            v: sums[1].sqrt() / (reference.res_v_norm * n),
            t: sums[2].sqrt() / (reference.res_t_norm * n),
        }
    }
}

/// 每个物理步的收敛跟踪器
#[derive(Debug, Clone, Default)]
pub struct ResidualTracker {
    first: Option<Residuals>,
}

impl ResidualTracker {
    /// 新的子迭代序列
    pub fn reset(&mut self) {
        self.first = None;
    }

    /// 记录残差，首次记录作为基准
    pub fn record(&mut self, res: Residuals) {
        if self.first.is_none() {
            self.first = Some(res);
        }
    }

    /// 基准残差
    pub fn first(&self) -> Option<Residuals> {
        self.first
    }

    /// 相对基准的比值；基准为零时比值记为 0
    pub fn ratio(&self, res: &Residuals) -> Residuals {
        let first = self.first.unwrap_or(*res);
        let rel = |r: f64, f: f64| if f > 0.0 { r / f } else { 0.0 };
        Residuals {
            p: rel(res.p, first.p),
            v: rel(res.v, first.v),
            t: rel(res.t, first.t),
        }
    }

    /// 压力与速度比值都低于容差
    pub fn converged(&self, res: &Residuals, tolerance: f64) -> bool {
        let ratio = self.ratio(res);
        ratio.p < tolerance && ratio.v < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::SerialComm;
    use glam::DVec3;

    #[test]
    fn test_normalization() {
        let mut sums = ResidualSums::default();
        for _ in 0..4 {
            sums.add(&Increment { dp: 1.0, dv: DVec3::new(0.0, 2.0, 0.0), dt: 0.5 });
        }
        let reference = ReferenceConfig { res_p_norm: 2.0, res_v_norm: 1.0, res_t_norm: 1.0 };
        let res = sums.reduce(&reference, 4, &SerialComm);
        assert!((res.p - 2.0 / 8.0).abs() < 1e-15);
        assert!((res.v - 4.0 / 4.0).abs() < 1e-15);
        assert!((res.t - 1.0 / 4.0).abs() < 1e-15);
    }

    #[test]
    fn test_convergence_against_first() {
        let mut tracker = ResidualTracker::default();
        let first = Residuals { p: 1.0, v: 2.0, t: 3.0 };
        tracker.record(first);
        assert!(!tracker.converged(&first, 1e-3));
        let later = Residuals { p: 1e-4, v: 1e-3, t: 3.0 };
        tracker.record(later);
        assert_eq!(tracker.first(), Some(first));
        // 速度比值 5e-4，压力比值 1e-4，温度不参与
        assert!(tracker.converged(&later, 1e-3));
    }

    #[test]
    fn test_zero_first_counts_as_converged() {
        let mut tracker = ResidualTracker::default();
        let zero = Residuals::default();
        tracker.record(zero);
        assert!(tracker.converged(&zero, 1e-6));
        tracker.reset();
        assert!(tracker.first().is_none());
    }
}
