// crates/fv_physics/src/output/mod.rs

//! 周期输出
//!
//! | 输出 | 文件 | 写出者 |
//! |------|------|--------|
//! | 诊断日志 | `diagnostics.log` | 根分区 |
//! | 重启快照 | `restart_<step>_<rank>.json` | 各分区轮流 |
//! | 场快照 | `field_<step>_<rank>.dat` | 各分区 |
//! | 探针序列 | `probe_<name>.dat` | 探针所在分区 |
//! | 边界通量 | `flux_<name>.dat` | 根分区 |
//!
//! 文本文件均为制表符分隔，首行为列名。

pub mod restart;

pub use restart::RestartSnapshot;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fv_config::{OutputConfig, ProbeConfig};

use crate::engine::{StepReport, N_FLUX};
use crate::error::{PhysicsError, PhysicsResult};
use crate::mesh::Mesh;
use crate::parallel::{agree, Communicator, ReduceOp};
use crate::state::PrimitiveState;

/// 诊断日志列名
pub const DIAGNOSTICS_HEADER: &str = "step\ttime\tdt\tcfl_max\tres_p\tres_v\tres_t\tlin_iters\tlin_rnorm";

const PROBE_HEADER: &str = "step\ttime\tp\tu\tv\tw\tT\trho";
const FLUX_HEADER: &str = "step\ttime\tmass\tmx\tmy\tmz\tenergy";
const FIELD_HEADER: &str = "cell\tx\ty\tz\tp\tu\tv\tw\tT\trho";

/// 输出接收端
///
/// `diagnostics` 与 `boundary_fluxes` 只在根分区调用；`restart` 是集体操作。
pub trait OutputSink {
    /// 追加一行诊断
    fn diagnostics(&mut self, report: &StepReport) -> PhysicsResult<()>;

    /// 写重启快照
    fn restart(&mut self, snapshot: &RestartSnapshot, comm: &dyn Communicator) -> PhysicsResult<()>;

    /// 写场快照（拥有单元）
    fn fields(&mut self, step: usize, time: f64, mesh: &Mesh, cells: &[PrimitiveState]) -> PhysicsResult<()>;

    /// 追加本分区负责的探针值
    fn probes(&mut self, step: usize, time: f64, cells: &[PrimitiveState]) -> PhysicsResult<()>;

    /// 追加一条全局边界通量
    fn boundary_fluxes(&mut self, step: usize, time: f64, name: &str, flux: &[f64; N_FLUX]) -> PhysicsResult<()>;
}

// ============================================================
// 探针定位
// ============================================================

/// 已定位到本分区的探针
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedProbe {
    /// 名称
    pub name: String,
    /// 本分区单元编号
    pub cell: usize,
    /// 探针到单元形心的距离
    pub distance: f64,
}

/// 为每个探针找全局最近的拥有单元（集体操作）
///
/// 距离取 MIN 归约，距离相同时编号最小的分区负责。只返回本分区负责的探针。
pub fn locate_probes(mesh: &Mesh, probes: &[ProbeConfig], comm: &dyn Communicator) -> Vec<LocatedProbe> {
    if probes.is_empty() {
        return Vec::new();
    }
    let local: Vec<Option<(usize, f64)>> = probes
        .iter()
        .map(|p| mesh.nearest_owned_cell(glam::DVec3::from_array(p.position)))
        .collect();
    let distances: Vec<f64> = local.iter().map(|l| l.map_or(f64::INFINITY, |(_, d)| d)).collect();
    let global = comm.all_reduce(&distances, ReduceOp::Min);

    let me = comm.rank() as f64;
    let candidates: Vec<f64> = distances
        .iter()
        .zip(&global)
        .map(|(&d, &g)| if d.is_finite() && d == g { me } else { f64::INFINITY })
        .collect();
    let owners = comm.all_reduce(&candidates, ReduceOp::Min);

    probes
        .iter()
        .zip(local)
        .zip(owners)
        .filter(|(_, owner)| *owner == me)
        .filter_map(|((probe, local), _)| {
            local.map(|(cell, distance)| LocatedProbe { name: probe.name.clone(), cell, distance })
        })
        .collect()
}

// ============================================================
// 文件输出
// ============================================================

/// 写入输出目录的文件输出
#[derive(Debug)]
pub struct FileOutputs {
    directory: PathBuf,
    rank: usize,
    probes: Vec<LocatedProbe>,
    diagnostics: Option<BufWriter<File>>,
}

impl FileOutputs {
    /// 创建输出目录并定位探针（集体操作）
    pub fn new(config: &OutputConfig, mesh: &Mesh, comm: &dyn Communicator) -> PhysicsResult<Self> {
        let created = std::fs::create_dir_all(&config.directory).map_err(PhysicsError::from);
        agree(comm, created, "创建输出目录")?;
        let probes = locate_probes(mesh, &config.probes, comm);
        for p in &probes {
            log::debug!(
                "探针 {} 位于分区 {} 单元 {} (距离 {:.3e})",
                p.name,
                comm.rank(),
                p.cell,
                p.distance
            );
        }

        let diagnostics = if comm.is_root() {
            create_diagnostics(&config.directory).map(Some)
        } else {
            Ok(None)
        };
        let diagnostics = agree(comm, diagnostics, "创建诊断日志")?;

        Ok(Self {
            directory: config.directory.clone(),
            rank: comm.rank(),
            probes,
            diagnostics,
        })
    }

    /// 输出目录
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 本分区负责的探针
    pub fn probes_here(&self) -> &[LocatedProbe] {
        &self.probes
    }

    fn append(&self, file: &str, header: &str) -> PhysicsResult<BufWriter<File>> {
        let path = self.directory.join(file);
        let fresh = !path.exists();
        let mut w = BufWriter::new(OpenOptions::new().create(true).append(true).open(path)?);
        if fresh {
            writeln!(w, "{}", header)?;
        }
        Ok(w)
    }
}

fn create_diagnostics(directory: &Path) -> PhysicsResult<BufWriter<File>> {
    let mut w = BufWriter::new(File::create(directory.join("diagnostics.log"))?);
    writeln!(w, "{}", DIAGNOSTICS_HEADER)?;
    w.flush()?;
    Ok(w)
}

fn state_columns(s: &PrimitiveState) -> String {
    format!(
        "{:.9e}\t{:.9e}\t{:.9e}\t{:.9e}\t{:.9e}\t{:.9e}",
        s.p, s.v.x, s.v.y, s.v.z, s.t, s.rho
    )
}

impl OutputSink for FileOutputs {
    fn diagnostics(&mut self, report: &StepReport) -> PhysicsResult<()> {
        if let Some(w) = self.diagnostics.as_mut() {
            writeln!(
                w,
                "{}\t{:.9e}\t{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}\t{}\t{:.6e}",
                report.step,
                report.time,
                report.dt,
                report.cfl_max,
                report.residuals.p,
                report.residuals.v,
                report.residuals.t,
                report.linear.iterations,
                report.linear.residual_norm
            )?;
            w.flush()?;
        }
        Ok(())
    }

    fn restart(&mut self, snapshot: &RestartSnapshot, comm: &dyn Communicator) -> PhysicsResult<()> {
        // 轮流写出；出错也要走完所有屏障
        let mut result = Ok(());
        for r in 0..comm.size() {
            if r == self.rank {
                result = snapshot.save(&self.directory).map(|path| {
                    log::debug!("重启快照写入 {}", path.display());
                });
            }
            comm.barrier();
        }
        if comm.is_root() && result.is_ok() {
            log::info!("第 {} 步写出重启快照", snapshot.step);
        }
        result
    }

    fn fields(&mut self, step: usize, _time: f64, mesh: &Mesh, cells: &[PrimitiveState]) -> PhysicsResult<()> {
        let path = self.directory.join(format!("field_{}_{}.dat", step, self.rank));
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "{}", FIELD_HEADER)?;
        for c in 0..mesh.n_owned() {
            let x = mesh.cell(c).centroid;
            writeln!(w, "{}\t{:.9e}\t{:.9e}\t{:.9e}\t{}", c, x.x, x.y, x.z, state_columns(&cells[c]))?;
        }
        w.flush()?;
        Ok(())
    }

    fn probes(&mut self, step: usize, time: f64, cells: &[PrimitiveState]) -> PhysicsResult<()> {
        for probe in &self.probes {
            let mut w = self.append(&format!("probe_{}.dat", probe.name), PROBE_HEADER)?;
            writeln!(w, "{}\t{:.9e}\t{}", step, time, state_columns(&cells[probe.cell]))?;
            w.flush()?;
        }
        Ok(())
    }

    fn boundary_fluxes(&mut self, step: usize, time: f64, name: &str, flux: &[f64; N_FLUX]) -> PhysicsResult<()> {
        let mut w = self.append(&format!("flux_{}.dat", name), FLUX_HEADER)?;
        write!(w, "{}\t{:.9e}", step, time)?;
        for v in flux {
            write!(w, "\t{:.9e}", v)?;
        }
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BoxMeshParams;
    use crate::parallel::{LocalCluster, SerialComm};

    fn probe(name: &str, position: [f64; 3]) -> ProbeConfig {
        ProbeConfig { name: name.into(), position }
    }

    #[test]
    fn test_probe_owned_by_nearest_partition() {
        let parts = BoxMeshParams::line(4, 4.0).build_partitions(2).unwrap();
        let probes = vec![probe("left", [0.4, 0.0, 0.0]), probe("right", [3.9, 0.0, 0.0])];
        let located = LocalCluster::new(2).run(|comm| locate_probes(&parts[comm.rank()], &probes, &comm));
        assert_eq!(located[0].len(), 1);
        assert_eq!(located[0][0].name, "left");
        assert_eq!(located[1].len(), 1);
        assert_eq!(located[1][0].name, "right");
    }

    #[test]
    fn test_probe_tie_goes_to_lowest_rank() {
        let parts = BoxMeshParams::line(2, 2.0).build_partitions(2).unwrap();
        let probes = vec![probe("mid", [1.0, 0.0, 0.0])];
        let located = LocalCluster::new(2).run(|comm| locate_probes(&parts[comm.rank()], &probes, &comm));
        assert_eq!(located[0].len(), 1);
        assert!(located[1].is_empty());
    }

    #[test]
    fn test_probe_and_flux_files() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = BoxMeshParams::line(3, 3.0).build_partitions(1).unwrap().remove(0);
        let config = OutputConfig {
            directory: dir.path().join("out"),
            probes: vec![probe("p0", [2.6, 0.0, 0.0])],
            ..Default::default()
        };
        let mut outputs = FileOutputs::new(&config, &mesh, &SerialComm).unwrap();
        assert_eq!(outputs.probes_here()[0].cell, 2);

        let cells = vec![PrimitiveState { p: 5.0, ..Default::default() }; mesh.n_cells()];
        outputs.probes(1, 0.1, &cells).unwrap();
        outputs.probes(2, 0.2, &cells).unwrap();
        outputs.boundary_fluxes(2, 0.2, "outlet", &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        outputs.fields(2, 0.2, &mesh, &cells).unwrap();

        let series = std::fs::read_to_string(config.directory.join("probe_p0.dat")).unwrap();
        let lines: Vec<&str> = series.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], PROBE_HEADER);
        assert!(lines[2].starts_with("2\t"));

        let flux = std::fs::read_to_string(config.directory.join("flux_outlet.dat")).unwrap();
        assert_eq!(flux.lines().count(), 2);
        assert_eq!(flux.lines().nth(1).unwrap().split('\t').count(), 7);

        let field = std::fs::read_to_string(config.directory.join("field_2_0.dat")).unwrap();
        assert_eq!(field.lines().count(), 1 + mesh.n_owned());

        let diag = std::fs::read_to_string(config.directory.join("diagnostics.log")).unwrap();
        assert_eq!(diag.lines().next(), Some(DIAGNOSTICS_HEADER));
    }
}
