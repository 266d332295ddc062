//! Fresnel-coefficient adapter: maps a reduced Matsubara frequency and
//! in-plane wavevector to `(r_TE, r_TM)` for the plate, given either a
//! perfect-reflector flag, a Drude/plasma dielectric function, or a
//! tabulated material (`§4.7`).

use crate::integration::FresnelProvider;
use crate::material::MaterialTable;

/// The plate's dielectric response, as selected at problem setup.
#[derive(Clone, Debug)]
pub enum DielectricModel {
    /// `r_TE = -1`, `r_TM = +1` for every frequency.
    PerfectReflector,
    /// Drude model, `epsilon = 1 + omegap^2 / (xi*(xi+gamma))`. `gamma = 0`
    /// reduces to the lossless plasma model.
    Drude {
        /// Plasma frequency (scaled units).
        omegap: f64,
        /// Relaxation frequency (scaled units).
        gamma: f64,
    },
    /// A tabulated `epsilon(xi)` with Drude low-/high-frequency tails.
    Table(MaterialTable),
}

impl DielectricModel {
    /// `true` for the perfect-reflector variant.
    #[must_use]
    pub const fn is_perfect_reflector(&self) -> bool {
        matches!(self, Self::PerfectReflector)
    }

    /// `epsilon(xi)`, the material's dielectric function at reduced
    /// frequency `xi`. Meaningless (and never called) for
    /// [`Self::PerfectReflector`].
    fn epsilon(&self, xi: f64) -> f64 {
        match self {
            Self::PerfectReflector => f64::INFINITY,
            Self::Drude { omegap, gamma } => 1.0 + omegap * omegap / (xi * (xi + gamma)),
            Self::Table(table) => table.epsilon(xi),
        }
    }
}

impl FresnelProvider for DielectricModel {
    /// `(r_TE, r_TM)` at reduced frequency `xi` and in-plane wavevector `k`.
    ///
    /// `beta = sqrt(1 + (epsilon-1)/(1+(k/xi)^2))`;
    /// `r_TE = (1-beta)/(1+beta)`, `r_TM = (epsilon-beta)/(epsilon+beta)`.
    fn rp(&self, xi: f64, k: f64) -> (f64, f64) {
        if self.is_perfect_reflector() {
            return (-1.0, 1.0);
        }

        let eps = self.epsilon(xi);
        let ratio = k / xi;
        let beta = (1.0 + (eps - 1.0) / (1.0 + ratio * ratio)).sqrt();

        let r_te = (1.0 - beta) / (1.0 + beta);
        let r_tm = (eps - beta) / (eps + beta);
        (r_te, r_tm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn perfect_reflector_is_frequency_independent() {
        let d = DielectricModel::PerfectReflector;
        assert_eq!(d.rp(1.0, 2.0), (-1.0, 1.0));
        assert_eq!(d.rp(100.0, 0.1), (-1.0, 1.0));
    }

    #[test]
    fn drude_reduces_to_perfect_reflector_at_infinite_omegap() {
        // epsilon -> infinity as omegap -> infinity: beta -> sqrt(1 +
        // infinity) = infinity, so r_TM -> 1, r_TE -> -1 in the limit.
        let d = DielectricModel::Drude {
            omegap: 1e8,
            gamma: 0.0,
        };
        let (r_te, r_tm) = d.rp(1.0, 1.0);
        assert!(approx_eq!(f64, r_te, -1.0, epsilon = 1e-4));
        assert!(approx_eq!(f64, r_tm, 1.0, epsilon = 1e-4));
    }

    #[test]
    fn drude_normal_incidence_matches_closed_form() {
        // At k=0, beta = sqrt(epsilon).
        let d = DielectricModel::Drude {
            omegap: 3.0,
            gamma: 0.5,
        };
        let xi = 2.0;
        let eps = 1.0 + 9.0 / (xi * (xi + 0.5));
        let beta = eps.sqrt();
        let (r_te, r_tm) = d.rp(xi, 0.0);
        assert!(approx_eq!(f64, r_te, (1.0 - beta) / (1.0 + beta), epsilon = 1e-12));
        assert!(approx_eq!(f64, r_tm, (eps - beta) / (eps + beta), epsilon = 1e-12));
    }
}
