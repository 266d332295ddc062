//! Gaunt coefficients via the Xu four-term recurrence (Y.-L. Xu, J. Comp.
//! Appl. Math. 85, 53 (1997)), expressing a product of two associated
//! Legendre polynomials as a finite sum of single associated Legendres:
//!
//! `P_n^m(x) P_nu^m(x) = a_0 * sum_{q=0}^{qmax} a~_q P_{n+nu-2q}^{2m}(x)`

/// Largest `q` for which a Gaunt coefficient is defined.
#[must_use]
pub fn qmax(n: i32, nu: i32, m: i32) -> i32 {
    let xi = (n + nu - 2 * m) / 2;
    n.min(nu).min(xi)
}

/// `log a_0` (the Gaunt prefactor), using `lgamma`-based binomial-style
/// terms to avoid overflow for large `n`, `nu`.
#[must_use]
pub fn log_a0(n: i32, nu: i32, m: i32) -> f64 {
    use crate::scalar::log_factorial as lf;
    lf(2 * n) - lf(n) + lf(2 * nu) - lf(nu) + lf(n + nu) - lf(2 * (n + nu)) + lf(n + nu - 2 * m)
        - lf(n - m)
        - lf(nu - m)
}

fn alpha(p: f64, n: f64, nu: f64) -> f64 {
    ((p * p - (n + nu + 1.0).powi(2)) * (p * p - (n - nu).powi(2))) / (4.0 * p * p - 1.0)
}

/// Computes the normalized Gaunt coefficients `a~_q` for `q = 0..=qmax(n,nu,m)`.
///
/// `q=0,1,2` use closed forms (eqs. 20, 29, 35 of Xu 1997); `q >= 3` uses
/// the general four-term recurrence, with the `A_p = 0` degenerate branch
/// handled separately. Whenever a running coefficient's magnitude leaves
/// `[1e-100, 1e100]`, both the current and previous coefficient are
/// rescaled by the same factor and the factor is folded into a running
/// `log_scaling` accumulator carried alongside the coefficient array, since
/// the coefficients themselves are returned as plain `f64` but the caller
/// (the I-integral expansion) needs the scaling to reconstruct the true
/// magnitude.
#[must_use]
pub fn gaunt_coefficients(n: i32, nu: i32, m: i32) -> GauntCoefficients {
    let qm = qmax(n, nu, m);
    if qm < 0 {
        return GauntCoefficients {
            a: vec![],
            log_scaling: vec![],
        };
    }

    let mut a = vec![0.0_f64; (qm + 1) as usize];
    let mut log_scaling = vec![0.0_f64; (qm + 1) as usize];

    a[0] = 1.0;
    if qm == 0 {
        return GauntCoefficients { a, log_scaling };
    }

    let (nf, nuf, mf) = (f64::from(n), f64::from(nu), f64::from(m));
    let n4 = nf + nuf - 2.0 * mf;

    a[1] = (nf + nuf - 1.5)
        * (1.0
            - (2.0 * nf + 2.0 * nuf - 1.0) / (n4 * (n4 - 1.0))
                * ((mf - nf) * (mf - nf + 1.0) / (2.0 * nf - 1.0)
                    + (mf - nuf) * (mf - nuf + 1.0) / (2.0 * nuf - 1.0)));
    if qm == 1 {
        return GauntCoefficients { a, log_scaling };
    }

    a[2] = (2.0 * nf + 2.0 * nuf - 1.0) * (2.0 * nf + 2.0 * nuf - 7.0) / 4.0
        * ((2.0 * nf + 2.0 * nuf - 3.0) / (n4 * (n4 - 1.0))
            * ((2.0 * nf + 2.0 * nuf - 5.0) / (2.0 * (n4 - 2.0) * (n4 - 3.0))
                * ((mf - nf) * (mf - nf + 1.0) * (mf - nf + 2.0) * (mf - nf + 3.0)
                    / (2.0 * nf - 1.0)
                    / (2.0 * nf - 3.0)
                    + 2.0 * (mf - nf) * (mf - nf + 1.0) * (mf - nuf) * (mf - nuf + 1.0)
                        / ((2.0 * nf - 1.0) * (2.0 * nuf - 1.0))
                    + (mf - nuf) * (mf - nuf + 1.0) * (mf - nuf + 2.0) * (mf - nuf + 3.0)
                        / (2.0 * nuf - 1.0)
                        / (2.0 * nuf - 3.0))
                - (mf - nf) * (mf - nf + 1.0) / (2.0 * nf - 1.0)
                - (mf - nuf) * (mf - nuf + 1.0) / (2.0 * nuf - 1.0))
        + 0.5;
    if qm == 2 {
        return GauntCoefficients { a, log_scaling };
    }

    let ap = -2.0 * mf * (nf - nuf) * (nf + nuf + 1.0);
    let mut scaling = 0.0_f64;

    for q in 3..=qm {
        let qf = f64::from(q);
        let p = nf + nuf - 2.0 * qf;
        let p1 = p - 2.0 * mf;
        let p2 = p + 2.0 * mf;

        let mut aq = if ap != 0.0 {
            let c0 = (p + 2.0) * (p + 3.0) * (p1 + 1.0) * (p1 + 2.0) * ap * alpha(p + 1.0, nf, nuf);
            let c1 = ap * ap * ap
                + (p + 1.0) * (p + 3.0) * (p1 + 2.0) * (p2 + 2.0) * ap * alpha(p + 2.0, nf, nuf)
                + (p + 2.0) * (p + 4.0) * (p1 + 3.0) * (p2 + 3.0) * ap * alpha(p + 3.0, nf, nuf);
            let c2 = -(p + 2.0) * (p + 3.0) * (p2 + 3.0) * (p2 + 4.0) * ap * alpha(p + 4.0, nf, nuf);

            (c1 * a[(q - 1) as usize] + c2 * a[(q - 2) as usize]) / c0
        } else {
            (p + 1.0) * (p2 + 2.0) * alpha(p + 2.0, nf, nuf) * a[(q - 1) as usize]
                / ((p + 2.0) * (p1 + 1.0) * alpha(p + 1.0, nf, nuf))
        };

        if aq.abs() > 1e100 {
            scaling += aq.abs().ln();
            a[(q - 1) as usize] /= aq.abs();
            aq = aq.signum();
        } else if aq.abs() < 1e-100 && aq.abs() > 0.0 {
            scaling += aq.abs().ln();
            a[(q - 1) as usize] /= aq.abs();
            aq = aq.signum();
        }

        a[q as usize] = aq;
        log_scaling[q as usize] = scaling;
    }

    GauntCoefficients { a, log_scaling }
}

/// Result of [`gaunt_coefficients`]: the (possibly rescaled) coefficient
/// array, and the cumulative log-scaling factor applied at each index.
#[derive(Clone, Debug)]
pub struct GauntCoefficients {
    /// Rescaled coefficients `a~_q`. May have had `exp(log_scaling[q])`
    /// divided out to keep the recurrence in range.
    pub a: Vec<f64>,
    /// Cumulative `ln|scaling factor|` applied at index `q` and carried
    /// forward to later indices.
    pub log_scaling: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qmax_zero_seeds_a0() {
        let g = gaunt_coefficients(1, 1, 1);
        assert_eq!(g.a[0], 1.0);
    }
}
