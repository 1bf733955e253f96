// apps/fv_cli/src/commands/run.rs

//! 运行模拟命令
//!
//! 每个分区一个线程。未链接外部线性求解器时使用零增量替身（试运行）。

use anyhow::{bail, Context, Result};
use clap::Args;
use fv_config::SolverConfig;
use fv_physics::mesh::read_partitions;
use fv_physics::{
    Communicator, FileOutputs, LocalCluster, Mesh, PhysicsError, PhysicsResult, RunSummary, SerialComm, Solver,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// 运行模拟参数
#[derive(Args)]
pub struct RunArgs {
    /// 输入基名（读取 <base>.json 与 <base>.mesh.json）
    pub base: PathBuf,

    /// 从该步的重启快照继续
    #[arg(short, long)]
    pub restart: Option<usize>,

    /// 期望的分区数（须与网格文件一致）
    #[arg(short, long)]
    pub partitions: Option<usize>,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== FreeVolume 模拟启动 ===");
    let start = Instant::now();

    let config_path = super::config_path(&args.base);
    let config = SolverConfig::from_file(&config_path)
        .with_context(|| format!("无法加载配置 {}", config_path.display()))?;
    let mesh_path = super::mesh_path(&args.base);
    let parts = read_partitions(&mesh_path)
        .with_context(|| format!("无法加载网格 {}", mesh_path.display()))?;

    if let Some(k) = args.partitions {
        if k != parts.len() {
            bail!("网格文件含 {} 个分区，与 --partitions {} 不符", parts.len(), k);
        }
    }
    info!("配置: {}", config_path.display());
    info!("网格: {} ({} 个分区)", mesh_path.display(), parts.len());
    warn!("未链接外部线性求解器，使用零增量试运行");

    let summary = if parts.len() == 1 {
        run_partition(&SerialComm, &config, parts[0].clone(), args.restart)?
    } else {
        let results = LocalCluster::new(parts.len())
            .run(|comm| run_partition(&comm, &config, parts[comm.rank()].clone(), args.restart));
        // 优先报告出错源头，其余分区只是随之中止
        let origin = results
            .iter()
            .position(|r| matches!(r, Err(e) if !matches!(e, PhysicsError::PeerFailed { .. })))
            .or_else(|| results.iter().position(Result::is_err));
        let mut results = results.into_iter();
        if let Some(rank) = origin {
            if let Some(Err(err)) = results.nth(rank) {
                return Err(err).with_context(|| format!("分区 {} 失败", rank));
            }
        }
        results.next().and_then(Result::ok).unwrap_or_default()
    };

    info!("=== 模拟完成 ===");
    info!("步数: {} (最后一步 {})", summary.steps, summary.final_step);
    info!("物理时间: {:.6e} s", summary.final_time);
    if let Some(last) = summary.last {
        info!(
            "最终残差: p={:.4e} v={:.4e} T={:.4e}",
            last.residuals.p, last.residuals.v, last.residuals.t
        );
    }
    info!("总耗时: {:.2?}", start.elapsed());
    Ok(())
}

fn run_partition(
    comm: &dyn Communicator,
    config: &SolverConfig,
    mesh: Mesh,
    restart: Option<usize>,
) -> PhysicsResult<RunSummary> {
    let outputs = FileOutputs::new(&config.output, &mesh, comm)?;
    let mut solver = Solver::new(config.clone(), mesh, comm)?.with_outputs(outputs);
    if let Some(step) = restart {
        solver = solver.resume_from(&config.output.directory, step)?;
    }
    let summary = solver.run()?;
    solver.finish();
    Ok(summary)
}
