// crates/fv_physics/src/output/restart.rs

//! 重启快照
//!
//! 每个分区一个 JSON 文件 `restart_<step>_<rank>.json`，保存全部单元
//! （含幽灵）的原始变量与每单元物理时间步。读回时校验分区编号、
//! 分区数与单元数。

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{PhysicsError, PhysicsResult};
use crate::mesh::Mesh;
use crate::state::PrimitiveState;

/// 单个分区的重启快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartSnapshot {
    /// 写出时的物理步
    pub step: usize,
    /// 物理时间 [s]
    pub time: f64,
    /// 分区编号
    pub rank: usize,
    /// 分区总数
    pub partitions: usize,
    /// 原始变量
    pub cells: Vec<PrimitiveState>,
    /// 每单元物理时间步
    pub dt: Vec<f64>,
}

impl RestartSnapshot {
    /// 快照文件路径
    pub fn path(dir: &Path, step: usize, rank: usize) -> PathBuf {
        dir.join(format!("restart_{}_{}.json", step, rank))
    }

    /// 写入目录，返回文件路径
    pub fn save(&self, dir: &Path) -> PhysicsResult<PathBuf> {
        let path = Self::path(dir, self.step, self.rank);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(path)
    }

    /// 从目录读取
    pub fn load(dir: &Path, step: usize, rank: usize) -> PhysicsResult<Self> {
        let path = Self::path(dir, step, rank);
        let reader = BufReader::new(File::open(&path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// 校验快照与当前分区一致
    pub fn check(&self, mesh: &Mesh, rank: usize, partitions: usize) -> PhysicsResult<()> {
        let mismatch = |reason: String| PhysicsError::RestartMismatch { rank, reason };
        if self.rank != rank {
            return Err(mismatch(format!("快照属于分区 {}", self.rank)));
        }
        if self.partitions != partitions {
            return Err(mismatch(format!(
                "快照分区数 {}, 当前 {}",
                self.partitions, partitions
            )));
        }
        if self.cells.len() != mesh.n_cells() || self.dt.len() != mesh.n_cells() {
            return Err(mismatch(format!(
                "快照单元数 {}, 网格单元数 {}",
                self.cells.len(),
                mesh.n_cells()
            )));
        }
        Ok(())
    }
}
