// apps/fv_cli/src/commands/generate.rs

//! 网格生成命令
//!
//! 生成长方体结构化网格并按 x 方向切片分区，写出 `<base>.mesh.json`；
//! 若 `<base>.json` 不存在，同时写出默认配置。

use anyhow::{Context, Result};
use clap::Args;
use fv_config::SolverConfig;
use fv_physics::mesh::write_partitions;
use fv_physics::BoxMeshParams;
use std::path::PathBuf;
use tracing::info;

/// 网格生成参数
#[derive(Args)]
pub struct GenerateArgs {
    /// 输出基名
    pub base: PathBuf,

    /// 维度 (1, 2, 3)
    #[arg(short, long, default_value = "2")]
    pub dimension: usize,

    /// 各方向单元数
    #[arg(long, num_args = 1..=3, default_values_t = [16usize, 16, 1])]
    pub divisions: Vec<usize>,

    /// 各方向长度 [m]
    #[arg(long, num_args = 1..=3, default_values_t = [1.0f64, 1.0, 1.0])]
    pub extent: Vec<f64>,

    /// 分区数
    #[arg(short, long, default_value = "1")]
    pub partitions: usize,
}

fn pad<T: Copy>(values: &[T], fill: T) -> [T; 3] {
    let mut out = [fill; 3];
    for (o, v) in out.iter_mut().zip(values) {
        *o = *v;
    }
    out
}

/// 执行生成命令
pub fn execute(args: GenerateArgs) -> Result<()> {
    let box_mesh = BoxMeshParams {
        dimension: args.dimension,
        origin: [0.0; 3],
        extent: pad(&args.extent, 1.0),
        divisions: pad(&args.divisions, 1),
    };
    let parts = box_mesh.build_partitions(args.partitions).context("网格生成失败")?;

    let mesh_path = super::mesh_path(&args.base);
    write_partitions(&mesh_path, &parts)
        .with_context(|| format!("无法写出网格 {}", mesh_path.display()))?;
    let owned: usize = parts.iter().map(|m| m.n_owned()).sum();
    info!("写出 {} ({} 个分区, {} 个单元)", mesh_path.display(), parts.len(), owned);

    let config_path = super::config_path(&args.base);
    if !config_path.exists() {
        SolverConfig::default()
            .save_to_file(&config_path)
            .with_context(|| format!("无法写出配置 {}", config_path.display()))?;
        info!("写出默认配置 {}", config_path.display());
    }
    Ok(())
}
