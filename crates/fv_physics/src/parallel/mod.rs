// crates/fv_physics/src/parallel/mod.rs

//! 分区间通信
//!
//! 所有分区以锁步方式执行外层/内层循环，以下调用都是集体操作，
//! 每个分区必须以相同顺序到达：
//!
//! | 操作 | 用途 |
//! |------|------|
//! | `all_reduce(Min)` | 全局 dt、探针归属 |
//! | `all_reduce(Max)` | 全局最大 CFL |
//! | `all_reduce(Sum)` | 残差、全局单元数 |
//! | `reduce_to_root(Sum)` | 边界通量 |
//! | `exchange` | 幽灵单元同步 |
//! | `barrier` | 重启快照轮流写出 |
//!
//! 某个分区缺席集体调用会使其他分区永久等待，这里不做检测。
//! 求解器自身的致命错误经 [`agree`] 表决，所有分区一起返回。

pub mod ghost;
pub mod local;

pub use ghost::GhostExchanger;
pub use local::{LocalCluster, ThreadComm};

use crate::error::{PhysicsError, PhysicsResult};

/// 归约运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// 求和
    Sum,
    /// 最小值
    Min,
    /// 最大值
    Max,
}

impl ReduceOp {
    /// 合并两个值
    #[inline]
    pub fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Sum => a + b,
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

/// 点对点数据包：发送时 `peer` 为目标分区，接收时为来源分区
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// 对端分区
    pub peer: usize,
    /// 数据
    pub values: Vec<f64>,
}

/// 通信器
pub trait Communicator {
    /// 本分区编号
    fn rank(&self) -> usize;

    /// 分区总数
    fn size(&self) -> usize;

    /// 逐元素全归约，所有分区得到相同结果
    fn all_reduce(&self, values: &[f64], op: ReduceOp) -> Vec<f64>;

    /// 点对点交换，返回按来源分区排序的数据包
    fn exchange(&self, outgoing: Vec<Packet>) -> Vec<Packet>;

    /// 同步屏障
    fn barrier(&self);

    /// 归约到根分区，只有根分区得到结果
    fn reduce_to_root(&self, values: &[f64], op: ReduceOp) -> Option<Vec<f64>> {
        let result = self.all_reduce(values, op);
        self.is_root().then_some(result)
    }

    /// 标量全归约
    fn all_reduce_scalar(&self, value: f64, op: ReduceOp) -> f64 {
        self.all_reduce(&[value], op).first().copied().unwrap_or(value)
    }

    /// 是否根分区
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// 对局部结果做集体表决（集体操作）
///
/// 任一分区为 `Err` 时所有分区都返回错误：出错的分区返回自己的错误，
/// 其余分区返回 [`PhysicsError::PeerFailed`]。
pub fn agree<T>(comm: &dyn Communicator, local: PhysicsResult<T>, stage: &'static str) -> PhysicsResult<T> {
    let failed = comm.all_reduce_scalar(if local.is_err() { 1.0 } else { 0.0 }, ReduceOp::Max);
    match local {
        Ok(_) if failed > 0.0 => Err(PhysicsError::PeerFailed { rank: comm.rank(), stage }),
        other => other,
    }
}

/// 单分区通信器
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce(&self, values: &[f64], _op: ReduceOp) -> Vec<f64> {
        values.to_vec()
    }

    fn exchange(&self, outgoing: Vec<Packet>) -> Vec<Packet> {
        outgoing.into_iter().filter(|p| p.peer == 0).collect()
    }

    fn barrier(&self) {}
}
