// apps/fv_cli/src/commands/mod.rs

//! 子命令实现

pub mod generate;
pub mod run;
pub mod validate;

use std::path::{Path, PathBuf};

/// 配置文件路径 `<base>.json`
pub fn config_path(base: &Path) -> PathBuf {
    with_suffix(base, ".json")
}

/// 网格文件路径 `<base>.mesh.json`
pub fn mesh_path(base: &Path) -> PathBuf {
    with_suffix(base, ".mesh.json")
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
