// crates/fv_config/src/methods.rs

//! 方法选择枚举
//!
//! 插值方法、限制器、时间步类型与状态方程都是启动时一次性选定的封闭集合。
//! 每个枚举同时支持 serde（配置文件）与 `FromStr`（命令行/节查询）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 选项解析错误
#[derive(Debug, Clone)]
pub struct MethodParseError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl fmt::Display for MethodParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "无效的{}: '{}', 期望 {}", self.kind, self.value, self.expected)
    }
}

impl std::error::Error for MethodParseError {}

// ============================================================
// 面插值方法
// ============================================================

/// 面插值方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// 几何加权最小二乘拟合
    #[default]
    Wtli,
    /// 反距离加权
    Idw,
    /// 父/邻单元各取一半
    Simple,
}

impl InterpolationMethod {
    /// 方法名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wtli => "wtli",
            Self::Idw => "idw",
            Self::Simple => "simple",
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolationMethod {
    type Err = MethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wtli" => Ok(Self::Wtli),
            "idw" => Ok(Self::Idw),
            "simple" => Ok(Self::Simple),
            _ => Err(MethodParseError {
                kind: "插值方法",
                value: s.to_string(),
                expected: "'wtli' | 'idw' | 'simple'",
            }),
        }
    }
}

// ============================================================
// 梯度限制器
// ============================================================

/// 梯度限制器选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LimiterChoice {
    /// 不限制
    #[default]
    None,
    /// Minmod
    Minmod,
    /// 双 Minmod (MC)
    DoubleMinmod,
    /// 调和平均 (van Leer)
    Harmonic,
    /// Superbee
    Superbee,
}

impl LimiterChoice {
    /// 限制器名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minmod => "minmod",
            Self::DoubleMinmod => "doubleMinmod",
            Self::Harmonic => "harmonic",
            Self::Superbee => "superbee",
        }
    }
}

impl fmt::Display for LimiterChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LimiterChoice {
    type Err = MethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "minmod" => Ok(Self::Minmod),
            "doubleminmod" => Ok(Self::DoubleMinmod),
            "harmonic" => Ok(Self::Harmonic),
            "superbee" => Ok(Self::Superbee),
            _ => Err(MethodParseError {
                kind: "限制器",
                value: s.to_string(),
                expected: "'none' | 'minmod' | 'doubleMinmod' | 'harmonic' | 'superbee'",
            }),
        }
    }
}

// ============================================================
// 时间步类型
// ============================================================

/// 时间步长类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeStepType {
    /// 固定时间步
    #[default]
    Fixed,
    /// 全局 CFL（取最严格单元）
    CflMax,
    /// 局部 CFL（每单元独立）
    CflLocal,
    /// 按更新量自适应
    Adaptive,
}

impl TimeStepType {
    /// 类型名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::CflMax => "cfl_max",
            Self::CflLocal => "cfl_local",
            Self::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for TimeStepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimeStepType {
    type Err = MethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "cfl_max" | "cflmax" => Ok(Self::CflMax),
            "cfl_local" | "cfllocal" => Ok(Self::CflLocal),
            "adaptive" => Ok(Self::Adaptive),
            _ => Err(MethodParseError {
                kind: "时间步类型",
                value: s.to_string(),
                expected: "'fixed' | 'cfl_max' | 'cfl_local' | 'adaptive'",
            }),
        }
    }
}

// ============================================================
// 状态方程
// ============================================================

/// 状态方程类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EosKind {
    /// 理想气体
    #[default]
    IdealGas,
}

impl fmt::Display for EosKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdealGas => f.write_str("idealGas"),
        }
    }
}

impl FromStr for EosKind {
    type Err = MethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idealGas" | "ideal_gas" | "idealgas" => Ok(Self::IdealGas),
            _ => Err(MethodParseError {
                kind: "状态方程",
                value: s.to_string(),
                expected: "'idealGas'",
            }),
        }
    }
}
