// crates/fv_config/src/solver_config.rs

//! SolverConfig - 求解器配置（全 f64）
//!
//! 按节组织的求解器配置，节名与配置文件中的键一一对应：
//!
//! | 节 | 内容 |
//! |----|------|
//! | `grid.interpolation` | 面插值方法、模板大小、偏斜容差 |
//! | `gradients` | 梯度限制器 |
//! | `time_marching` | 物理时间步类型、CFL/dt 边界、步数、爬升 |
//! | `pseudo_time` | 伪时间子迭代的步长类型、容差、子步上限 |
//! | `fluid_properties` | 状态方程参数 |
//! | `reference` | 残差归一化尺度 |
//! | `linear_solver` | 外部线性求解器参数 |
//! | `output` | 周期输出间隔、探针、边界通量 |
//! | `initial_conditions` | 初始条件区域 |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::methods::{EosKind, InterpolationMethod, LimiterChoice, TimeStepType};
use crate::tree::ConfigTree;

/// 求解器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 网格相关配置
    #[serde(default)]
    pub grid: GridConfig,

    /// 梯度配置
    #[serde(default)]
    pub gradients: GradientConfig,

    /// 物理时间推进
    #[serde(default)]
    pub time_marching: TimeMarchingConfig,

    /// 伪时间子迭代
    #[serde(default)]
    pub pseudo_time: PseudoTimeConfig,

    /// 流体物性
    #[serde(default)]
    pub fluid_properties: FluidConfig,

    /// 残差参考尺度
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// 线性求解器参数（传递给外部求解器）
    #[serde(default)]
    pub linear_solver: LinearSolverConfig,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,

    /// 初始条件区域（后面的区域覆盖前面的）
    #[serde(default)]
    pub initial_conditions: Vec<InitialRegionConfig>,
}

// ============================================================
// grid
// ============================================================

/// 网格配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridConfig {
    /// 面插值
    #[serde(default)]
    pub interpolation: InterpolationConfig,
}

/// 面插值配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// 插值方法
    #[serde(default)]
    pub method: InterpolationMethod,

    /// 最大模板大小，小于 1 表示按维度自动选择
    #[serde(default)]
    pub stencil_size: i64,

    /// 偏斜容差：方向与已张成子空间的正交分量占比不超过此值时视为冗余
    #[serde(default = "default_skewness_tolerance")]
    pub skewness_tolerance: f64,
}

fn default_skewness_tolerance() -> f64 { 0.1 }

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::default(),
            stencil_size: 0,
            skewness_tolerance: default_skewness_tolerance(),
        }
    }
}

// ============================================================
// gradients
// ============================================================

/// 梯度配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradientConfig {
    /// 限制器
    #[serde(default)]
    pub limiter: LimiterChoice,
}

// ============================================================
// time_marching / pseudo_time
// ============================================================

/// 时间步长参数（物理时间与伪时间共用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeStepConfig {
    /// 时间步类型
    #[serde(default)]
    pub step_type: TimeStepType,

    /// 固定步长 / 自适应初值 [s]
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// 目标 CFL 数
    #[serde(default = "default_cfl")]
    pub cfl: f64,

    /// 最小时间步 [s]
    #[serde(default = "default_dt_min")]
    pub dt_min: f64,

    /// 最大时间步 [s]
    #[serde(default = "default_dt_max")]
    pub dt_max: f64,

    /// 自适应松弛系数
    #[serde(default = "default_relax")]
    pub relax: f64,
}

fn default_dt() -> f64 { 1e-3 }
fn default_cfl() -> f64 { 1.0 }
fn default_dt_min() -> f64 { 1e-12 }
fn default_dt_max() -> f64 { 1e3 }
fn default_relax() -> f64 { 0.1 }

impl Default for TimeStepConfig {
    fn default() -> Self {
        Self {
            step_type: TimeStepType::default(),
            dt: default_dt(),
            cfl: default_cfl(),
            dt_min: default_dt_min(),
            dt_max: default_dt_max(),
            relax: default_relax(),
        }
    }
}

impl TimeStepConfig {
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        let key = |name: &str| format!("{}.{}", section, name);
        if !(self.dt > 0.0) {
            return Err(ConfigError::invalid(&key("dt"), self.dt, "时间步必须为正"));
        }
        if !(self.cfl > 0.0) {
            return Err(ConfigError::invalid(&key("cfl"), self.cfl, "CFL 必须为正"));
        }
        if !(self.dt_min > 0.0) {
            return Err(ConfigError::invalid(&key("dt_min"), self.dt_min, "dt_min 必须为正"));
        }
        if self.dt_min > self.dt_max {
            return Err(ConfigError::invalid(&key("dt_max"), self.dt_max, "dt_max 不能小于 dt_min"));
        }
        if !(self.relax > 0.0 && self.relax < 1.0) {
            return Err(ConfigError::invalid(&key("relax"), self.relax, "relax 必须在 (0, 1) 范围内"));
        }
        Ok(())
    }
}

/// 爬升配置：步长或 CFL 从 `initial` 按 `growth` 几何增长到目标值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampConfig {
    /// 初始值
    pub initial: f64,
    /// 每个外层步的增长因子
    #[serde(default = "default_ramp_growth")]
    pub growth: f64,
}

fn default_ramp_growth() -> f64 { 1.2 }

/// 物理时间推进配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeMarchingConfig {
    /// 外层步数
    #[serde(default = "default_number_of_steps")]
    pub number_of_steps: usize,

    /// 步长参数
    #[serde(flatten)]
    pub step: TimeStepConfig,

    /// 爬升（可选）
    #[serde(default)]
    pub ramp: Option<RampConfig>,
}

fn default_number_of_steps() -> usize { 100 }

impl Default for TimeMarchingConfig {
    fn default() -> Self {
        Self {
            number_of_steps: default_number_of_steps(),
            step: TimeStepConfig::default(),
            ramp: None,
        }
    }
}

/// 伪时间子迭代配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PseudoTimeConfig {
    /// 每个物理步的最大子步数
    #[serde(default = "default_pseudo_max_steps")]
    pub max_steps: usize,

    /// 相对首子步残差的收敛容差
    #[serde(default = "default_pseudo_tolerance")]
    pub tolerance: f64,

    /// 伪时间步长参数
    #[serde(flatten)]
    pub step: TimeStepConfig,
}

fn default_pseudo_max_steps() -> usize { 1 }
fn default_pseudo_tolerance() -> f64 { 1e-3 }

impl Default for PseudoTimeConfig {
    fn default() -> Self {
        Self {
            max_steps: default_pseudo_max_steps(),
            tolerance: default_pseudo_tolerance(),
            step: TimeStepConfig::default(),
        }
    }
}

// ============================================================
// fluid_properties / reference / linear_solver
// ============================================================

/// 流体物性配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidConfig {
    /// 状态方程
    #[serde(default)]
    pub eos: EosKind,

    /// 摩尔质量 [kg/kmol]
    #[serde(default = "default_molar_mass")]
    pub molar_mass: f64,

    /// 比热比
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// 参考压力偏移 [Pa]
    #[serde(default)]
    pub p_ref: f64,

    /// 参考温度偏移 [K]
    #[serde(default)]
    pub t_ref: f64,
}

fn default_molar_mass() -> f64 { 28.97 }
fn default_gamma() -> f64 { 1.4 }

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            eos: EosKind::default(),
            molar_mass: default_molar_mass(),
            gamma: default_gamma(),
            p_ref: 0.0,
            t_ref: 0.0,
        }
    }
}

/// 残差归一化参考尺度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// 压力残差尺度
    #[serde(default = "default_norm")]
    pub res_p_norm: f64,
    /// 速度残差尺度
    #[serde(default = "default_norm")]
    pub res_v_norm: f64,
    /// 温度残差尺度
    #[serde(default = "default_norm")]
    pub res_t_norm: f64,
}

fn default_norm() -> f64 { 1.0 }

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            res_p_norm: default_norm(),
            res_v_norm: default_norm(),
            res_t_norm: default_norm(),
        }
    }
}

/// 外部线性求解器参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSolverConfig {
    /// 相对容差
    #[serde(default = "default_rel_tolerance")]
    pub rel_tolerance: f64,
    /// 绝对容差
    #[serde(default = "default_abs_tolerance")]
    pub abs_tolerance: f64,
    /// 最大迭代次数
    #[serde(default = "default_linear_max_iterations")]
    pub max_iterations: usize,
}

fn default_rel_tolerance() -> f64 { 1e-6 }
fn default_abs_tolerance() -> f64 { 1e-12 }
fn default_linear_max_iterations() -> usize { 50 }

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            rel_tolerance: default_rel_tolerance(),
            abs_tolerance: default_abs_tolerance(),
            max_iterations: default_linear_max_iterations(),
        }
    }
}

// ============================================================
// output
// ============================================================

/// 输出配置。间隔为 0 表示关闭该输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// 重启快照间隔（步）
    #[serde(default)]
    pub restart_freq: usize,

    /// 场快照间隔（步）
    #[serde(default)]
    pub output_freq: usize,

    /// 探针输出间隔（步）
    #[serde(default)]
    pub probe_freq: usize,

    /// 边界通量积分间隔（步）
    #[serde(default)]
    pub integrate_boundary_freq: usize,

    /// 探针
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,

    /// 边界通量报告
    #[serde(default)]
    pub boundary_fluxes: Vec<BoundaryFluxConfig>,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            restart_freq: 0,
            output_freq: 0,
            probe_freq: 0,
            integrate_boundary_freq: 0,
            probes: Vec::new(),
            boundary_fluxes: Vec::new(),
        }
    }
}

/// 探针
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// 名称（决定输出文件名）
    pub name: String,
    /// 探针坐标
    pub position: [f64; 3],
}

/// 边界通量报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryFluxConfig {
    /// 名称（决定输出文件名）
    pub name: String,
    /// 边界编号
    pub boundary: usize,
}

// ============================================================
// initial_conditions
// ============================================================

/// 初始条件区域形状
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegionConfig {
    /// 整个计算域
    All,
    /// 由两个对角点给定的长方体
    Box {
        /// 角点 1
        corner_1: [f64; 3],
        /// 角点 2
        corner_2: [f64; 3],
    },
    /// 圆柱
    Cylinder {
        /// 中心
        center: [f64; 3],
        /// 半径
        radius: f64,
        /// 轴向
        axis: [f64; 3],
        /// 高度（关于中心对称）
        height: f64,
    },
    /// 球
    Sphere {
        /// 中心
        center: [f64; 3],
        /// 半径
        radius: f64,
    },
}

/// 初始条件区域
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialRegionConfig {
    /// 区域
    pub region: RegionConfig,
    /// 压力 [Pa]（相对 p_ref）
    pub pressure: f64,
    /// 速度 [m/s]
    #[serde(default)]
    pub velocity: [f64; 3],
    /// 温度 [K]（相对 t_ref）
    pub temperature: f64,
}

// ============================================================
// 加载与验证
// ============================================================

impl SolverConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let tree = ConfigTree::from_file(path)?;
        Self::from_tree(&tree)
    }

    /// 从配置树构建并验证
    pub fn from_tree(tree: &ConfigTree) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_json::from_value(tree.root().clone())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interp = &self.grid.interpolation;
        if !(0.0..1.0).contains(&interp.skewness_tolerance) {
            return Err(ConfigError::invalid(
                "grid.interpolation.skewness_tolerance",
                interp.skewness_tolerance,
                "偏斜容差必须在 [0, 1) 范围内",
            ));
        }

        if self.time_marching.number_of_steps == 0 {
            return Err(ConfigError::invalid(
                "time_marching.number_of_steps",
                0,
                "至少需要一个时间步",
            ));
        }
        self.time_marching.step.validate("time_marching")?;

        if let Some(ramp) = &self.time_marching.ramp {
            if !(ramp.initial > 0.0) {
                return Err(ConfigError::invalid(
                    "time_marching.ramp.initial",
                    ramp.initial,
                    "爬升初值必须为正",
                ));
            }
            if !(ramp.growth >= 1.0) {
                return Err(ConfigError::invalid(
                    "time_marching.ramp.growth",
                    ramp.growth,
                    "增长因子不能小于 1",
                ));
            }
        }

        if self.pseudo_time.max_steps == 0 {
            return Err(ConfigError::invalid(
                "pseudo_time.max_steps",
                0,
                "至少需要一个子步",
            ));
        }
        if !(self.pseudo_time.tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "pseudo_time.tolerance",
                self.pseudo_time.tolerance,
                "收敛容差必须为正",
            ));
        }
        self.pseudo_time.step.validate("pseudo_time")?;

        let fluid = &self.fluid_properties;
        if !(fluid.molar_mass > 0.0) {
            return Err(ConfigError::invalid(
                "fluid_properties.molar_mass",
                fluid.molar_mass,
                "摩尔质量必须为正",
            ));
        }
        if !(fluid.gamma > 1.0) {
            return Err(ConfigError::invalid(
                "fluid_properties.gamma",
                fluid.gamma,
                "比热比必须大于 1",
            ));
        }

        let refs = [
            ("reference.res_p_norm", self.reference.res_p_norm),
            ("reference.res_v_norm", self.reference.res_v_norm),
            ("reference.res_t_norm", self.reference.res_t_norm),
        ];
        for (key, value) in refs {
            if !(value > 0.0) {
                return Err(ConfigError::invalid(key, value, "参考尺度必须为正"));
            }
        }

        for (i, ic) in self.initial_conditions.iter().enumerate() {
            let radius = match ic.region {
                RegionConfig::Cylinder { radius, height, .. } => {
                    if !(height > 0.0) {
                        return Err(ConfigError::invalid(
                            &format!("initial_conditions[{}].region.height", i),
                            height,
                            "高度必须为正",
                        ));
                    }
                    Some(radius)
                }
                RegionConfig::Sphere { radius, .. } => Some(radius),
                _ => None,
            };
            if let Some(r) = radius {
                if !(r > 0.0) {
                    return Err(ConfigError::invalid(
                        &format!("initial_conditions[{}].region.radius", i),
                        r,
                        "半径必须为正",
                    ));
                }
            }
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
