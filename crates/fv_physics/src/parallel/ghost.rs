// crates/fv_physics/src/parallel/ghost.rs

//! 幽灵单元同步
//!
//! 构造时做一次握手：每个分区把自己需要的 `owner_index` 发给所属分区，
//! 所属分区据此得到发送列表。之后每次同步按列表打包、交换、按序解包。
//! 边界映像直接复制父单元的值。原始变量和梯度各有独立的同步点。

use std::collections::BTreeMap;

use super::{Communicator, Packet};
use crate::error::{PhysicsError, PhysicsResult};
use crate::mesh::{GhostKind, Mesh};
use crate::state::{CellGradient, PrimitiveState, N_VARS};

/// 原始变量打包宽度 (p, u, v, w, T, ρ)
const STATE_WIDTH: usize = 6;

/// 梯度打包宽度
const GRADIENT_WIDTH: usize = 3 * N_VARS;

/// 幽灵单元同步器
#[derive(Debug, Clone, Default)]
pub struct GhostExchanger {
    /// 对端分区 -> 本地幽灵单元（按对端发送顺序）
    recv: BTreeMap<usize, Vec<usize>>,
    /// 对端分区 -> 本地拥有单元
    send: BTreeMap<usize, Vec<usize>>,
    /// (边界映像, 父单元)
    images: Vec<(usize, usize)>,
}

impl GhostExchanger {
    /// 建立收发列表（集体操作）
    pub fn new(mesh: &Mesh, comm: &dyn Communicator) -> PhysicsResult<Self> {
        let mut recv: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut requests: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
        let mut images = Vec::new();
        // 出错也要参与交换，错误在交换之后返回
        let mut invalid = None;

        for (cell, kind) in mesh.ghosts() {
            match kind {
                GhostKind::Partition { owner_rank, owner_index } => {
                    if owner_rank >= comm.size() || owner_rank == comm.rank() {
                        invalid.get_or_insert_with(|| {
                            PhysicsError::invalid_mesh(format!(
                                "幽灵单元 {} 的所属分区 {} 无效",
                                cell, owner_rank
                            ))
                        });
                        continue;
                    }
                    recv.entry(owner_rank).or_default().push(cell);
                    requests.entry(owner_rank).or_default().push(owner_index as f64);
                }
                GhostKind::Boundary { face } => images.push((cell, mesh.face(face).parent)),
            }
        }

        let outgoing = requests
            .into_iter()
            .map(|(peer, values)| Packet { peer, values })
            .collect();
        let mut send = BTreeMap::new();
        let incoming = comm.exchange(outgoing);
        if let Some(err) = invalid {
            return Err(err);
        }
        for packet in incoming {
            let cells: Vec<usize> = packet.values.iter().map(|&v| v as usize).collect();
            if let Some(&bad) = cells.iter().find(|&&c| c >= mesh.n_owned()) {
                return Err(PhysicsError::invalid_mesh(format!(
                    "分区 {} 请求的单元 {} 不属于分区 {}",
                    packet.peer,
                    bad,
                    comm.rank()
                )));
            }
            send.insert(packet.peer, cells);
        }

        log::debug!(
            "分区 {}: 接收 {} 个分区幽灵, 发送 {} 个单元, {} 个边界映像",
            comm.rank(),
            recv.values().map(Vec::len).sum::<usize>(),
            send.values().map(Vec::len).sum::<usize>(),
            images.len()
        );
        Ok(Self { recv, send, images })
    }

    /// 同步原始变量
    pub fn sync_state(&self, cells: &mut [PrimitiveState], comm: &dyn Communicator) {
        self.sync_with(
            cells,
            STATE_WIDTH,
            |s, out| out.extend_from_slice(&[s.p, s.v.x, s.v.y, s.v.z, s.t, s.rho]),
            |v| PrimitiveState {
                p: v[0],
                v: glam::DVec3::new(v[1], v[2], v[3]),
                t: v[4],
                rho: v[5],
            },
            comm,
        );
    }

    /// 同步梯度
    pub fn sync_gradients(&self, gradients: &mut [CellGradient], comm: &dyn Communicator) {
        self.sync_with(gradients, GRADIENT_WIDTH, CellGradient::pack, CellGradient::unpack, comm);
    }

    fn sync_with<T, P, U>(&self, data: &mut [T], width: usize, pack: P, unpack: U, comm: &dyn Communicator)
    where
        T: Copy,
        P: Fn(&T, &mut Vec<f64>),
        U: Fn(&[f64]) -> T,
    {
        let outgoing = self
            .send
            .iter()
            .map(|(&peer, cells)| {
                let mut values = Vec::with_capacity(cells.len() * width);
                for &c in cells {
                    pack(&data[c], &mut values);
                }
                Packet { peer, values }
            })
            .collect();

        for packet in comm.exchange(outgoing) {
            let Some(ghosts) = self.recv.get(&packet.peer) else {
                log::warn!("收到未预期分区 {} 的幽灵数据", packet.peer);
                continue;
            };
            if packet.values.len() != ghosts.len() * width {
                log::warn!(
                    "分区 {} 的幽灵数据长度 {} 与期望 {} 不符",
                    packet.peer,
                    packet.values.len(),
                    ghosts.len() * width
                );
                continue;
            }
            for (&g, chunk) in ghosts.iter().zip(packet.values.chunks_exact(width)) {
                data[g] = unpack(chunk);
            }
        }

        for &(image, parent) in &self.images {
            data[image] = data[parent];
        }
    }

    /// 本分区的分区幽灵数
    pub fn n_partition_ghosts(&self) -> usize {
        self.recv.values().map(Vec::len).sum()
    }
}
