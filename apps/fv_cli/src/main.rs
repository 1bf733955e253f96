// apps/fv_cli/src/main.rs

//! FreeVolume 命令行界面
//!
//! 以基名 `<base>` 约定输入文件：
//! - `<base>.json` - 求解器配置
//! - `<base>.mesh.json` - 分区网格（每个分区一个网格）

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// FreeVolume 分区有限体积求解器命令行工具
#[derive(Parser)]
#[command(name = "fv_cli")]
#[command(author = "FreeVolume Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FreeVolume partitioned finite-volume solver", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行模拟
    Run(commands::run::RunArgs),
    /// 验证配置与网格
    Validate(commands::validate::ValidateArgs),
    /// 生成长方体分区网格
    Generate(commands::generate::GenerateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志（同时接收 log 记录）
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("日志初始化失败: {}", e))?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Generate(args) => commands::generate::execute(args),
    }
}
