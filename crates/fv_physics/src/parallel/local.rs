// crates/fv_physics/src/parallel/local.rs

//! 进程内多分区通信
//!
//! 每个分区一个 OS 线程，共享屏障与邮箱。归约按分区编号顺序合并，
//! 所有分区得到逐位相同的结果。

use parking_lot::Mutex;
use std::sync::{Arc, Barrier};

use super::{Communicator, Packet, ReduceOp};

#[derive(Debug)]
struct Shared {
    size: usize,
    barrier: Barrier,
    slots: Mutex<Vec<Vec<f64>>>,
    mailbox: Mutex<Vec<Vec<Packet>>>,
}

/// 线程分区通信器
#[derive(Debug, Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn all_reduce(&self, values: &[f64], op: ReduceOp) -> Vec<f64> {
        self.shared.slots.lock()[self.rank] = values.to_vec();
        self.shared.barrier.wait();

        let result = {
            let slots = self.shared.slots.lock();
            let mut acc = slots[0].clone();
            for slot in &slots[1..] {
                for (a, &b) in acc.iter_mut().zip(slot) {
                    *a = op.combine(*a, b);
                }
            }
            acc
        };

        // 所有分区读完后才允许下一次写入
        self.shared.barrier.wait();
        result
    }

    fn exchange(&self, outgoing: Vec<Packet>) -> Vec<Packet> {
        {
            let mut mailbox = self.shared.mailbox.lock();
            for packet in outgoing {
                if packet.peer < self.shared.size {
                    mailbox[packet.peer].push(Packet {
                        peer: self.rank,
                        values: packet.values,
                    });
                } else {
                    log::warn!("分区 {} 丢弃发往不存在分区 {} 的数据包", self.rank, packet.peer);
                }
            }
        }
        self.shared.barrier.wait();

        let mut received = std::mem::take(&mut self.shared.mailbox.lock()[self.rank]);
        self.shared.barrier.wait();

        received.sort_by_key(|p| p.peer);
        received
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }
}

/// 进程内分区集群
#[derive(Debug, Clone, Copy)]
pub struct LocalCluster {
    size: usize,
}

impl LocalCluster {
    /// 创建 `size` 个分区的集群
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    /// 分区数
    pub fn size(&self) -> usize {
        self.size
    }

    /// 每个分区一个线程执行 `f`，按分区编号返回结果
    ///
    /// 工作线程 panic 时在调用线程上重新抛出。
    pub fn run<F, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let shared = Arc::new(Shared {
            size: self.size,
            barrier: Barrier::new(self.size),
            slots: Mutex::new(vec![Vec::new(); self.size]),
            mailbox: Mutex::new(vec![Vec::new(); self.size]),
        });

        std::thread::scope(|scope| {
            let f = &f;
            let handles: Vec<_> = (0..self.size)
                .map(|rank| {
                    let comm = ThreadComm {
                        rank,
                        shared: Arc::clone(&shared),
                    };
                    scope.spawn(move || f(comm))
                })
                .collect();

            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_reduce_identical_on_every_rank() {
        let results = LocalCluster::new(4).run(|comm| {
            let r = comm.rank() as f64;
            (
                comm.all_reduce_scalar(r + 1.0, ReduceOp::Sum),
                comm.all_reduce_scalar(0.1 * r, ReduceOp::Min),
                comm.all_reduce_scalar(0.1 * r, ReduceOp::Max),
            )
        });
        for res in &results {
            assert_eq!(res.0, 10.0);
            assert_eq!(res.1, 0.0);
            assert_eq!(res.2.to_bits(), results[0].2.to_bits());
        }
    }

    #[test]
    fn test_exchange_ring() {
        let results = LocalCluster::new(3).run(|comm| {
            let next = (comm.rank() + 1) % comm.size();
            let received = comm.exchange(vec![Packet {
                peer: next,
                values: vec![comm.rank() as f64],
            }]);
            received
        });
        for (rank, received) in results.iter().enumerate() {
            let prev = (rank + 2) % 3;
            assert_eq!(received.len(), 1);
            assert_eq!(received[0].peer, prev);
            assert_eq!(received[0].values, vec![prev as f64]);
        }
    }

    #[test]
    fn test_reduce_to_root_only_root() {
        let results = LocalCluster::new(2).run(|comm| comm.reduce_to_root(&[1.0, 2.0], ReduceOp::Sum));
        assert_eq!(results[0], Some(vec![2.0, 4.0]));
        assert_eq!(results[1], None);
    }

    #[test]
    fn test_repeated_collectives() {
        let results = LocalCluster::new(3).run(|comm| {
            let mut total = 0.0;
            for i in 0..50 {
                total += comm.all_reduce_scalar((comm.rank() * i) as f64, ReduceOp::Sum);
                comm.barrier();
            }
            total
        });
        assert!(results.iter().all(|&t| t == results[0]));
    }
}
