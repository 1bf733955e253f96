// crates/fv_physics/src/numerics/limiter/functions.rs

//! 标量限制函数
//!
//! 所有函数接收两个斜率/差分 (a, b)，当 a·b < 0（局部极值）时返回 0。
//!
//! ```text
//! minmod(a, b)       = 同号时取绝对值较小者
//! maxmod(a, b)       = 同号时取绝对值较大者
//! doubleMinmod(a, b) = sign(a+b) · min(2|a|, 2|b|, |(a+b)/2|)
//! harmonic(a, b)     = sign(a+b) · min(|(a+b)/2|, |2ab/(a+b)|)
//! superbee(a, b)     = minmod(maxmod(a, b), minmod(2a, 2b))
//! ```

/// harmonic 中 a+b 视为零的阈值
const HARMONIC_EPS: f64 = 1e-12;

/// 符号函数，sign(0) = 0
#[inline]
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Minmod：同号时取绝对值较小者
#[inline]
pub fn minmod(a: f64, b: f64) -> f64 {
    if a * b < 0.0 {
        0.0
    } else if a.abs() <= b.abs() {
        a
    } else {
        b
    }
}

/// Maxmod：同号时取绝对值较大者
#[inline]
pub fn maxmod(a: f64, b: f64) -> f64 {
    if a * b < 0.0 {
        0.0
    } else if a.abs() >= b.abs() {
        a
    } else {
        b
    }
}

/// 双 Minmod (MC)
#[inline]
pub fn double_minmod(a: f64, b: f64) -> f64 {
    if a * b < 0.0 {
        return 0.0;
    }
    let avg = 0.5 * (a + b);
    sign(a + b) * (2.0 * a.abs()).min(2.0 * b.abs()).min(avg.abs())
}

/// 调和平均 (van Leer)
#[inline]
pub fn harmonic(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum.abs() < HARMONIC_EPS {
        return 0.5 * sum;
    }
    if a * b < 0.0 {
        return 0.0;
    }
    sign(sum) * (0.5 * sum).abs().min((2.0 * a * b / sum).abs())
}

/// Superbee
#[inline]
pub fn superbee(a: f64, b: f64) -> f64 {
    minmod(maxmod(a, b), minmod(2.0 * a, 2.0 * b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [f64; 9] = [-3.5, -1.0, -1e-9, -0.0, 0.0, 1e-300, 0.25, 2.0, 7.0];

    #[test]
    fn test_opposite_signs_give_zero() {
        for &a in &SAMPLES {
            for &b in &SAMPLES {
                if a * b < 0.0 {
                    assert_eq!(minmod(a, b), 0.0);
                    assert_eq!(maxmod(a, b), 0.0);
                    assert_eq!(double_minmod(a, b), 0.0);
                    assert_eq!(superbee(a, b), 0.0);
                }
            }
        }
    }

    #[test]
    fn test_minmod_maxmod_magnitude_bounds() {
        for &a in &SAMPLES {
            for &b in &SAMPLES {
                if a * b < 0.0 {
                    continue;
                }
                let lo = a.abs().min(b.abs());
                let hi = a.abs().max(b.abs());
                let mn = minmod(a, b);
                let mx = maxmod(a, b);
                assert!(mn.abs() >= lo && mn.abs() <= hi);
                assert!(mx.abs() >= lo && mx.abs() <= hi);
                assert!(mn * (a + b) >= 0.0 && mx * (a + b) >= 0.0);
            }
        }
    }

    #[test]
    fn test_harmonic_cancelling_branch() {
        for &a in &[1.0, 1e-3, 42.0, -5.0] {
            assert!(harmonic(a, -a).abs() < 1e-15);
        }
        // 同号时等于 2ab/(a+b)
        assert!((harmonic(1.0, 3.0) - 1.5).abs() < 1e-15);
    }

    #[test]
    fn test_double_minmod_values() {
        assert!((double_minmod(1.0, 3.0) - 2.0).abs() < 1e-15);
        assert!((double_minmod(-1.0, -0.2) + 0.4).abs() < 1e-15);
    }

    #[test]
    fn test_superbee_values() {
        assert!((superbee(1.0, 3.0) - 2.0).abs() < 1e-15);
        assert!((superbee(1.0, 1.5) - 1.5).abs() < 1e-15);
    }

    #[test]
    fn test_small_inputs_stable() {
        for f in [minmod, maxmod, double_minmod, harmonic, superbee] {
            let v = f(1e-300, 2e-300);
            assert!(v.is_finite());
            assert!(f(0.0, 0.0) == 0.0);
        }
        assert_eq!(sign(0.0), 0.0);
    }
}
