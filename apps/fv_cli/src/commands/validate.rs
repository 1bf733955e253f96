// apps/fv_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 验证 `<base>.json` 与 `<base>.mesh.json`，不启动求解。

use anyhow::{bail, Result};
use clap::Args;
use fv_config::{SolverConfig, TimeStepType};
use fv_physics::mesh::read_partitions;
use fv_physics::BoundaryTag;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 输入基名
    pub base: PathBuf,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== FreeVolume 配置验证 ===");
    let mut result = ValidationResult::default();

    let config = validate_config(&super::config_path(&args.base), &mut result);
    validate_mesh(&super::mesh_path(&args.base), config.as_ref(), &mut result);

    for w in &result.warnings {
        println!("  ! {}", w);
    }
    for e in &result.errors {
        println!("  ✗ {}", e);
    }
    if !result.is_ok(args.strict) {
        error!("验证失败: {} 个错误, {} 个警告", result.errors.len(), result.warnings.len());
        bail!("验证失败");
    }
    println!("  ✓ 验证通过");
    Ok(())
}

fn validate_config(path: &Path, result: &mut ValidationResult) -> Option<SolverConfig> {
    println!("\n检查配置文件: {}", path.display());
    let config = match SolverConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            result.add_error(e.to_string());
            return None;
        }
    };

    let step = &config.time_marching.step;
    if matches!(step.step_type, TimeStepType::CflMax | TimeStepType::CflLocal) && step.cfl > 1.0 {
        result.add_warning(format!("CFL = {} 大于 1", step.cfl));
    }
    if config.time_marching.ramp.is_some() && step.step_type == TimeStepType::Adaptive {
        result.add_warning("ADAPTIVE 时间步忽略 ramp 配置");
    }
    if config.initial_conditions.is_empty() {
        result.add_warning("未配置初始条件区域");
    }
    println!("  ✓ 配置有效");
    Some(config)
}

fn validate_mesh(path: &Path, config: Option<&SolverConfig>, result: &mut ValidationResult) {
    println!("\n检查网格文件: {}", path.display());
    let parts = match read_partitions(path) {
        Ok(p) => p,
        Err(e) => {
            result.add_error(e.to_string());
            return;
        }
    };

    let owned: usize = parts.iter().map(|m| m.n_owned()).sum();
    println!("  分区: {}, 单元: {}, 维度: {}", parts.len(), owned, parts[0].dimension());
    if parts.iter().any(|m| m.dimension() != parts[0].dimension()) {
        result.add_error("各分区维度不一致");
    }

    if let Some(config) = config {
        let boundary_ids: BTreeSet<usize> = parts
            .iter()
            .flat_map(|m| m.faces().iter())
            .filter_map(|f| match f.tag {
                BoundaryTag::Boundary(id) => Some(id),
                BoundaryTag::Internal => None,
            })
            .collect();
        for report in &config.output.boundary_fluxes {
            if !boundary_ids.contains(&report.boundary) {
                result.add_warning(format!(
                    "边界通量 {} 引用的边界 {} 不存在",
                    report.name, report.boundary
                ));
            }
        }
    }
}
