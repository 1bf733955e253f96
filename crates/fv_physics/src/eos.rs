// crates/fv_physics/src/eos.rs

//! 状态方程
//!
//! 压力与温度均以相对参考值的形式存储，计算时加上 `p_ref` / `t_ref`：
//!
//! ```text
//! ρ = (p + p_ref) / (R (T + t_ref))
//! p = ρ R (T + t_ref) - p_ref
//! T = (p + p_ref) / (R ρ) - t_ref
//! a = sqrt(γ (p + p_ref) / ρ)
//! ```
//!
//! 气体常数 R 由通用气体常数除以摩尔质量，启动时计算一次。

use fv_config::{ConfigError, EosKind, FluidConfig};

/// 通用气体常数 [J/(kmol·K)]
pub const UNIV_GAS_CONST: f64 = 8314.472;

/// 状态方程接口
pub trait EquationOfState: std::fmt::Debug + Send + Sync {
    /// 密度 ρ(p, T)
    fn density(&self, p: f64, t: f64) -> f64;

    /// 压力 p(ρ, T)
    fn pressure(&self, rho: f64, t: f64) -> f64;

    /// 温度 T(p, ρ)
    fn temperature(&self, p: f64, rho: f64) -> f64;

    /// 声速 a(p, ρ)
    fn sound_speed(&self, p: f64, rho: f64) -> f64;

    /// 参考压力偏移
    fn p_ref(&self) -> f64;

    /// 参考温度偏移
    fn t_ref(&self) -> f64;

    /// 名称
    fn name(&self) -> &'static str;
}

/// 理想气体
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdealGas {
    gas_constant: f64,
    gamma: f64,
    p_ref: f64,
    t_ref: f64,
}

impl IdealGas {
    /// 由摩尔质量创建
    pub fn new(molar_mass: f64, gamma: f64) -> Result<Self, ConfigError> {
        if !(molar_mass > 0.0) {
            return Err(ConfigError::invalid(
                "fluid_properties.molar_mass",
                molar_mass,
                "摩尔质量必须为正",
            ));
        }
        Ok(Self {
            gas_constant: UNIV_GAS_CONST / molar_mass,
            gamma,
            p_ref: 0.0,
            t_ref: 0.0,
        })
    }

    /// 设置参考偏移
    pub fn with_reference(mut self, p_ref: f64, t_ref: f64) -> Self {
        self.p_ref = p_ref;
        self.t_ref = t_ref;
        self
    }

    /// 气体常数 R [J/(kg·K)]
    pub fn gas_constant(&self) -> f64 {
        self.gas_constant
    }

    /// 比热比
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl EquationOfState for IdealGas {
    #[inline]
    fn density(&self, p: f64, t: f64) -> f64 {
        (p + self.p_ref) / (self.gas_constant * (t + self.t_ref))
    }

    #[inline]
    fn pressure(&self, rho: f64, t: f64) -> f64 {
        rho * self.gas_constant * (t + self.t_ref) - self.p_ref
    }

    #[inline]
    fn temperature(&self, p: f64, rho: f64) -> f64 {
        (p + self.p_ref) / (self.gas_constant * rho) - self.t_ref
    }

    #[inline]
    fn sound_speed(&self, p: f64, rho: f64) -> f64 {
        (self.gamma * (p + self.p_ref) / rho).sqrt()
    }

    fn p_ref(&self) -> f64 {
        self.p_ref
    }

    fn t_ref(&self) -> f64 {
        self.t_ref
    }

    fn name(&self) -> &'static str {
        "idealGas"
    }
}

/// 根据配置创建状态方程
pub fn create_eos(config: &FluidConfig) -> Result<Box<dyn EquationOfState>, ConfigError> {
    match config.eos {
        EosKind::IdealGas => Ok(Box::new(
            IdealGas::new(config.molar_mass, config.gamma)?.with_reference(config.p_ref, config.t_ref),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn air() -> IdealGas {
        IdealGas::new(28.97, 1.4).unwrap().with_reference(101325.0, 273.15)
    }

    #[test]
    fn test_gas_constant() {
        let gas = IdealGas::new(28.97, 1.4).unwrap();
        assert!((gas.gas_constant() - 8314.472 / 28.97).abs() < 1e-12);
    }

    #[test]
    fn test_density_pressure_roundtrip() {
        let gas = air();
        for &(rho0, t0) in &[(1.2, 15.0), (0.01, -200.0), (50.0, 1500.0), (1.0, 0.0)] {
            let p = gas.pressure(rho0, t0);
            let rho = gas.density(p, t0);
            assert!((rho - rho0).abs() <= 1e-12 * rho0, "rho0={} rho={}", rho0, rho);
        }
    }

    #[test]
    fn test_temperature_inverse() {
        let gas = air();
        let p = 5000.0;
        let t = 20.0;
        let rho = gas.density(p, t);
        assert!((gas.temperature(p, rho) - t).abs() < 1e-9);
    }

    #[test]
    fn test_sound_speed_air() {
        let gas = IdealGas::new(28.97, 1.4).unwrap();
        let rho = gas.density(101325.0, 288.15);
        let a = gas.sound_speed(101325.0, rho);
        assert!((a - 340.3).abs() < 0.5, "a = {}", a);
    }

    #[test]
    fn test_non_positive_molar_mass() {
        assert!(IdealGas::new(0.0, 1.4).is_err());
        let cfg = FluidConfig { molar_mass: -1.0, ..Default::default() };
        assert!(create_eos(&cfg).is_err());
    }
}
