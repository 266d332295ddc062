//! Mie scattering coefficients `a_l`, `b_l` for the sphere, at a fixed
//! Matsubara frequency. Supports perfect reflectors (closed form via
//! `I_nu`/`K_nu`) and Drude/plasma media (four auxiliary Riccati-Bessel
//! products). Results are cached per Matsubara index `n`, across `l`.

use crate::bessel::ln_i_k;
use crate::error::Result;
use crate::scalar::{log_add_signed, ln_gamma, Sign};

/// One `(log|a_l|, sign_a, log|b_l|, sign_b)` entry.
#[derive(Clone, Copy, Debug)]
pub struct MieCoefficient {
    /// `log|a_l|`.
    pub ln_a: f64,
    /// Sign of `a_l`.
    pub sign_a: Sign,
    /// `log|b_l|`.
    pub ln_b: f64,
    /// Sign of `b_l`.
    pub sign_b: Sign,
}

/// Closed-form Mie coefficients at `n=0` (`chi=0`), used by the n=0 fast
/// path. `sign a_l = (-1)^l`, `sign b_l = (-1)^{l+1}`.
#[must_use]
pub fn mie_n0(l: i32) -> MieCoefficient {
    let sign_a: Sign = if l % 2 == 0 { 1 } else { -1 };
    let sign_b: Sign = -sign_a;
    let lf = f64::from(l);
    let ln_b = std::f64::consts::PI.ln() - ln_gamma(lf + 0.5) - ln_gamma(lf + 1.5);
    let ln_a = ln_b + (1.0 + 1.0 / lf).ln();
    MieCoefficient {
        ln_a,
        sign_a,
        ln_b,
        sign_b,
    }
}

/// Perfect-reflector Mie coefficients at Matsubara frequency `chi = n*T*R/(R+L)`.
fn mie_perfect(l: i32, chi: f64) -> Result<MieCoefficient> {
    let (ln_i_lm, ln_k_lm) = ln_i_k(l - 1, chi)?;
    let (ln_i_lp, ln_k_lp) = ln_i_k(l, chi)?;

    let sign_b: Sign = if (l + 1) % 2 == 0 { 1 } else { -1 };
    let ln_b = std::f64::consts::PI.ln() - std::f64::consts::LN_2 + ln_i_lp - ln_k_lp;

    let ln_frac = chi.ln() - f64::from(l).ln();

    let mut sign_a = sign_b;
    let frac_num = (ln_frac + ln_i_lm - ln_i_lp).exp();
    let nominator = if frac_num < 1.0 {
        (1.0 - frac_num).abs().ln()
    } else {
        if frac_num > 1.0 {
            sign_a *= -1;
        }
        (frac_num - 1.0).abs().ln()
    };
    let frac_den = (ln_frac + ln_k_lm - ln_k_lp).exp();
    let denominator = frac_den.ln_1p();

    let ln_a = ln_b + nominator - denominator;

    Ok(MieCoefficient {
        ln_a,
        sign_a,
        ln_b,
        sign_b,
    })
}

/// Drude/plasma Mie coefficients (reduces to [`mie_perfect`] when
/// `omegap` is infinite).
fn mie_drude(l: i32, n_mat: i32, t: f64, r_by_script_l: f64, omegap: f64, gamma: f64) -> Result<MieCoefficient> {
    if omegap.is_infinite() {
        let chi = f64::from(n_mat) * t * r_by_script_l;
        return mie_perfect(l, chi);
    }

    let xi = f64::from(n_mat) * t;
    let chi = xi * r_by_script_l;
    let ln_chi = xi.ln() + r_by_script_l.ln();

    let ln_n = (1.0 + omegap * omegap / (xi * (xi + gamma))).ln() / 2.0;
    let n_factor = ln_n.exp();

    let (ln_i_l, ln_k_l) = ln_i_k(l, chi)?;
    let (ln_i_lm, ln_k_lm) = ln_i_k(l - 1, chi)?;

    let (ln_i_l_nchi, _) = ln_i_k(l, n_factor * chi)?;
    let (ln_i_lm_nchi, _) = ln_i_k(l - 1, n_factor * chi)?;

    let (ln_sla, sign_sla) = log_add_signed(ln_i_l, 1, ln_chi + ln_i_lm, -1);
    let ln_sla = ln_i_l_nchi + ln_sla;

    let (ln_slb, sign_slb) = log_add_signed(ln_i_l_nchi, 1, ln_n + ln_chi + ln_i_lm_nchi, -1);
    let ln_slb = ln_i_l + ln_slb;

    let (ln_slc, sign_slc) = log_add_signed(ln_k_l, 1, ln_chi + ln_k_lm, 1);
    let ln_slc = ln_i_l_nchi + ln_slc;

    let (ln_sld, sign_sld) = log_add_signed(ln_i_l_nchi, 1, ln_n + ln_chi + ln_i_lm_nchi, -1);
    let ln_sld = ln_k_l + ln_sld;

    let (ln_a_num, sign_a_num) =
        log_add_signed(2.0 * ln_n + ln_sla, sign_sla, ln_slb, -sign_slb);
    let (ln_a_den, sign_a_den) =
        log_add_signed(2.0 * ln_n + ln_slc, sign_slc, ln_sld, -sign_sld);
    let (ln_b_num, sign_b_num) = log_add_signed(ln_sla, sign_sla, ln_slb, -sign_slb);
    let (ln_b_den, sign_b_den) = log_add_signed(ln_slc, sign_slc, ln_sld, -sign_sld);

    let ln_pi_2 = std::f64::consts::PI.ln() - std::f64::consts::LN_2;

    Ok(MieCoefficient {
        ln_a: ln_pi_2 + ln_a_num - ln_a_den,
        sign_a: sign_a_num * sign_a_den,
        ln_b: ln_pi_2 + ln_b_num - ln_b_den,
        sign_b: sign_b_num * sign_b_den,
    })
}

/// Parameters needed to compute a Mie coefficient, bundled so the cache
/// doesn't need to borrow the full parameters façade.
#[derive(Clone, Copy, Debug)]
pub struct MieContext {
    /// Temperature (scaled units).
    pub t: f64,
    /// `R/(R+L)`.
    pub r_by_script_l: f64,
    /// Sphere plasma frequency (`f64::INFINITY` for perfect reflector).
    pub omegap: f64,
    /// Sphere relaxation frequency.
    pub gamma: f64,
}

/// Per-Matsubara-index cache of Mie coefficients, lazily filled across `l`.
#[derive(Default)]
pub struct MieCache {
    entries: std::collections::HashMap<i32, Vec<MieCoefficient>>,
}

impl MieCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the Mie coefficient for Matsubara index `n` and order `l`,
    /// computing and caching the whole `l=1..=lmax` column on first touch.
    pub fn get(&mut self, n: i32, l: i32, lmax: i32, ctx: MieContext) -> Result<MieCoefficient> {
        if !self.entries.contains_key(&n) {
            let mut column = Vec::with_capacity(lmax as usize);
            for li in 1..=lmax {
                let coeff = if n == 0 {
                    mie_n0(li)
                } else {
                    mie_drude(li, n, ctx.t, ctx.r_by_script_l, ctx.omegap, ctx.gamma)?
                };
                column.push(coeff);
            }
            self.entries.insert(n, column);
        }
        Ok(self.entries[&n][(l - 1) as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn mie_b5_matches_reference_value() {
        let c = mie_perfect(5, 3.0).unwrap();
        assert!(approx_eq!(f64, c.ln_b, -3.206_110_089_012_862, epsilon = 1e-8));
        assert_eq!(c.sign_b, 1);
    }

    #[test]
    fn mie_b6_matches_reference_value() {
        let c = mie_perfect(6, 3.0).unwrap();
        assert!(approx_eq!(f64, c.ln_b, -6.093_433_624_873_396, epsilon = 1e-7));
        assert_eq!(c.sign_b, -1);
    }

    #[test]
    fn mie_a3_matches_reference_value() {
        let c = mie_perfect(3, 3.0).unwrap();
        assert!(approx_eq!(f64, c.ln_a, 1.692_450_306_201_961, epsilon = 1e-7));
        assert_eq!(c.sign_a, -1);
    }
}
