//! Extended-precision scalar kit.
//!
//! Every downstream module exchanges values as `(log|value|, sign)` pairs
//! instead of raw linear floats, so that products of very large and very
//! small terms can be combined without overflow or underflow. This module
//! is the only place that touches `f64::exp`/`f64::ln` directly on
//! magnitudes close to the representable range.

use std::cmp::Ordering;
use std::f64::consts::PI;

/// Sign of a log-magnitude value: `-1`, `0` (the value is exactly zero,
/// magnitude is `-inf`), or `+1`.
pub type Sign = i8;

/// A value carried as `sign * exp(log_abs)`.
///
/// `log_abs == f64::NEG_INFINITY` together with `sign == 0` represents an
/// exact zero; this is the only representation of zero accepted by the
/// arithmetic below.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogValue {
    /// Natural logarithm of the absolute value.
    pub log_abs: f64,
    /// Sign of the value.
    pub sign: Sign,
}

impl LogValue {
    /// The exact zero value.
    pub const ZERO: Self = Self {
        log_abs: f64::NEG_INFINITY,
        sign: 0,
    };

    /// Builds a value from its natural log-magnitude and sign.
    #[must_use]
    pub const fn new(log_abs: f64, sign: Sign) -> Self {
        Self { log_abs, sign }
    }

    /// Builds a value from an ordinary `f64`.
    #[must_use]
    pub fn from_linear(x: f64) -> Self {
        if x == 0.0 {
            Self::ZERO
        } else {
            Self::new(x.abs().ln(), if x.is_sign_negative() { -1 } else { 1 })
        }
    }

    /// Converts back to an ordinary `f64`. May overflow/underflow to `inf`/`0`.
    #[must_use]
    pub fn to_linear(self) -> f64 {
        f64::from(self.sign) * self.log_abs.exp()
    }

    /// Negates the value.
    #[must_use]
    pub const fn neg(self) -> Self {
        Self::new(self.log_abs, -self.sign)
    }

    /// `self + other`, in log-magnitude/sign form.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        let (log_abs, sign) = log_add_signed(self.log_abs, self.sign, other.log_abs, other.sign);
        Self::new(log_abs, sign)
    }

    /// `self * other`, in log-magnitude/sign form.
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        if self.sign == 0 || other.sign == 0 {
            Self::ZERO
        } else {
            Self::new(self.log_abs + other.log_abs, self.sign * other.sign)
        }
    }
}

/// Computes `log|sa*exp(a) + sb*exp(b)|` and the sign of the sum.
///
/// Handles `a` or `b` equal to `-inf` (i.e. an operand that is exactly
/// zero). When the two magnitudes agree and the signs cancel, returns
/// `(-inf, 0)`.
#[must_use]
pub fn log_add_signed(a: f64, sa: Sign, b: f64, sb: Sign) -> (f64, Sign) {
    if a == f64::NEG_INFINITY {
        return (b, sb);
    }
    if b == f64::NEG_INFINITY {
        return (a, sa);
    }

    let (hi, hi_sign, lo, lo_sign) = if a > b { (a, sa, b, sb) } else { (b, sb, a, sa) };

    // lo <= hi, so ratio in [-1, 1]; magnitude = 1 + ratio is therefore never negative.
    let ratio = f64::from(hi_sign) * f64::from(lo_sign) * (lo - hi).exp();
    let magnitude = 1.0 + ratio;

    if magnitude == 0.0 {
        (f64::NEG_INFINITY, 0)
    } else {
        (hi + magnitude.ln(), hi_sign)
    }
}

/// Computes `log|sum_i signs[i]*exp(values[i])|` via max-shift log-sum-exp,
/// and the sign of the sum. `values` must be non-empty.
#[must_use]
pub fn log_sum_exp_signed(values: &[f64], signs: &[Sign]) -> (f64, Sign) {
    debug_assert_eq!(values.len(), signs.len());
    debug_assert!(!values.is_empty());

    let max = values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    if max == f64::NEG_INFINITY {
        return (f64::NEG_INFINITY, 0);
    }

    let sum: f64 = values
        .iter()
        .zip(signs)
        .map(|(&v, &s)| f64::from(s) * (v - max).exp())
        .sum();

    if sum == 0.0 {
        (f64::NEG_INFINITY, 0)
    } else {
        (max + sum.abs().ln(), sum.signum() as Sign)
    }
}

/// Unsigned variant of [`log_sum_exp_signed`]: all terms are assumed positive.
#[must_use]
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }

    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Lanczos approximation to `ln(Gamma(x))`, g=7, n=9, accurate to machine
/// precision for `x > 0`. No special-function crate exists anywhere in the
/// reference ecosystem this workspace draws from, so the log-gamma kernel
/// (and everything built on it below) is hand-rolled here.
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_93,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula.
        (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut a = COEFFS[0];
        let t = x + G + 0.5;
        for (i, c) in COEFFS.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
    }
}

/// `log(n!)`.
#[must_use]
pub fn log_factorial(n: i32) -> f64 {
    ln_gamma(f64::from(n) + 1.0)
}

/// `log(n!!)` (double factorial), for `n >= 0`.
#[must_use]
pub fn log_double_factorial(n: i32) -> f64 {
    debug_assert!(n >= 0);
    if n <= 1 {
        return 0.0;
    }
    if n % 2 == 0 {
        let k = f64::from(n / 2);
        k * 2f64.ln() + ln_gamma(k + 1.0)
    } else {
        let k = f64::from((n + 1) / 2);
        ln_gamma(2.0 * k + 1.0) - k * 2f64.ln() - ln_gamma(k + 1.0)
    }
}

/// `log(C(n,k))`.
#[must_use]
pub fn log_binomial(n: i32, k: i32) -> f64 {
    ln_gamma(f64::from(n) + 1.0) - ln_gamma(f64::from(k) + 1.0) - ln_gamma(f64::from(n - k) + 1.0)
}

/// `log(n)` for small positive integer `n`.
#[must_use]
pub fn log_i(n: i32) -> f64 {
    f64::from(n).ln()
}

/// Total order on magnitudes used when selecting the larger of two operands;
/// NaN is treated as smaller than everything (should not occur downstream).
#[must_use]
pub fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn log_add_signed_cancels_to_zero() {
        let (v, s) = log_add_signed(1.0, 1, 1.0, -1);
        assert_eq!(v, f64::NEG_INFINITY);
        assert_eq!(s, 0);
    }

    #[test]
    fn log_add_signed_matches_linear() {
        let (v, s) = log_add_signed(2.0_f64.ln(), 1, 3.0_f64.ln(), 1);
        assert!(approx_eq!(f64, f64::from(s) * v.exp(), 5.0, epsilon = 1e-12));
    }

    #[test]
    fn log_add_signed_handles_neg_infinity_operand() {
        let (v, s) = log_add_signed(f64::NEG_INFINITY, 0, 2.0, 1);
        assert_eq!(v, 2.0);
        assert_eq!(s, 1);
    }

    #[test]
    fn ln_gamma_matches_known_values() {
        // Gamma(5) = 24
        assert!(approx_eq!(f64, ln_gamma(5.0), 24f64.ln(), epsilon = 1e-12));
        // Gamma(0.5) = sqrt(pi)
        assert!(approx_eq!(
            f64,
            ln_gamma(0.5),
            PI.sqrt().ln(),
            epsilon = 1e-12
        ));
    }

    #[test]
    fn log_factorial_small() {
        assert!(approx_eq!(f64, log_factorial(5), 120f64.ln(), epsilon = 1e-10));
    }

    #[test]
    fn log_double_factorial_small() {
        // 5!! = 15
        assert!(approx_eq!(
            f64,
            log_double_factorial(5),
            15f64.ln(),
            epsilon = 1e-10
        ));
        // 6!! = 48
        assert!(approx_eq!(
            f64,
            log_double_factorial(6),
            48f64.ln(),
            epsilon = 1e-10
        ));
    }

    #[test]
    fn log_sum_exp_signed_matches_linear_sum() {
        let values = [0.0, 1.0, 2.0];
        let signs: [Sign; 3] = [1, -1, 1];
        let (v, s) = log_sum_exp_signed(&values, &signs);
        let expected = 1.0 - 1.0f64.exp() + 2.0f64.exp();
        assert!(approx_eq!(f64, f64::from(s) * v.exp(), expected, epsilon = 1e-10));
    }
}
