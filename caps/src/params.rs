//! Collaborator façade (`§4.8`): the immutable parameters bundle for one
//! computation, plus a readable dump and a compile-info string.

use crate::error::{Error, Result};
use crate::fresnel::DielectricModel;

/// Default `lscale` (spec.md `§3`: `lmax` defaults to
/// `max(ceil(lscale / (L/R)), 20)`). `5.0` is chosen so that `lmax` tracks
/// the geometric mean curvature scale of the plane-sphere gap.
pub const DEFAULT_LSCALE: f64 = 5.0;

/// Floor below which `lmax` is never chosen, regardless of `lscale`.
pub const LMAX_FLOOR: i32 = 20;

/// The sphere's scattering model. Mie coefficients (`§4.4`) have a closed
/// form only for a perfect reflector or a Drude/plasma sphere, so this is
/// a strict subset of [`DielectricModel`] (which additionally allows a
/// tabulated material, meaningful only for the plane).
#[derive(Clone, Copy, Debug)]
pub enum SphereMaterial {
    /// `r_TE = -1`, `r_TM = +1`-equivalent Mie limit.
    PerfectReflector,
    /// Drude/plasma sphere (`gamma = 0` is the lossless plasma model).
    Drude {
        /// Plasma frequency (scaled units).
        omegap: f64,
        /// Relaxation frequency (scaled units).
        gamma: f64,
    },
}

impl SphereMaterial {
    /// `(omegap, gamma)`, with `omegap = infinity` for a perfect reflector
    /// (the convention the Mie module's closed form expects).
    #[must_use]
    pub const fn mie_params(self) -> (f64, f64) {
        match self {
            Self::PerfectReflector => (f64::INFINITY, 0.0),
            Self::Drude { omegap, gamma } => (omegap, gamma),
        }
    }
}

/// The immutable bundle of parameters for one free-energy computation
/// (spec.md `§3`, Parameters entity). Validated at construction; every
/// field is otherwise read-only for the lifetime of the computation.
#[derive(Clone, Debug)]
pub struct Parameters {
    l_by_r: f64,
    t: f64,
    lmax_override: Option<i32>,
    lscale: f64,
    precision: f64,
    cores: usize,
    sphere: SphereMaterial,
    plane: DielectricModel,
    i_cache_capacity: Option<usize>,
}

impl Parameters {
    /// Builds a new parameter bundle, defaulting to perfect reflectors on
    /// both surfaces, `lscale = `[`DEFAULT_LSCALE`], a single core, and no
    /// explicit `lmax` or I-cache capacity override.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `l_by_r <= 0`, `t <= 0`, or
    /// `precision <= 0`.
    pub fn new(l_by_r: f64, t: f64, precision: f64) -> Result<Self> {
        if !(l_by_r > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "L/R must be positive, got {l_by_r}"
            )));
        }
        if !(t > 0.0) {
            return Err(Error::InvalidArgument(format!("T must be positive, got {t}")));
        }
        if !(precision > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "precision must be positive, got {precision}"
            )));
        }
        Ok(Self {
            l_by_r,
            t,
            lmax_override: None,
            lscale: DEFAULT_LSCALE,
            precision,
            cores: 1,
            sphere: SphereMaterial::PerfectReflector,
            plane: DielectricModel::PerfectReflector,
            i_cache_capacity: None,
        })
    }

    /// `L/R`.
    #[must_use]
    pub const fn l_by_r(&self) -> f64 {
        self.l_by_r
    }

    /// `R/(R+L)`, the ratio most formulas in `§4` are phrased in terms of.
    #[must_use]
    pub fn r_by_script_l(&self) -> f64 {
        1.0 / (1.0 + self.l_by_r)
    }

    /// Temperature in natural (scaled) units.
    #[must_use]
    pub const fn t(&self) -> f64 {
        self.t
    }

    /// Relative precision used by both the inner (`m`) and outer (`n`)
    /// tail-termination criteria.
    #[must_use]
    pub const fn precision(&self) -> f64 {
        self.precision
    }

    /// Overrides the default `lmax` with an explicit value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `lmax < 1`.
    pub fn set_lmax(&mut self, lmax: i32) -> Result<()> {
        if lmax < 1 {
            return Err(Error::InvalidArgument(format!(
                "lmax must be >= 1, got {lmax}"
            )));
        }
        self.lmax_override = Some(lmax);
        Ok(())
    }

    /// Overrides the `lscale` used by the default `lmax` formula.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `lscale <= 0`.
    pub fn set_lscale(&mut self, lscale: f64) -> Result<()> {
        if !(lscale > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "lscale must be positive, got {lscale}"
            )));
        }
        self.lscale = lscale;
        Ok(())
    }

    /// The angular-momentum truncation order: the explicit override if
    /// one was set via [`Self::set_lmax`], otherwise
    /// `max(ceil(lscale / (L/R)), `[`LMAX_FLOOR`]`)`.
    #[must_use]
    pub fn lmax(&self) -> i32 {
        self.lmax_override.unwrap_or_else(|| {
            let derived = (self.lscale / self.l_by_r).ceil() as i32;
            derived.max(LMAX_FLOOR)
        })
    }

    /// Sets the number of worker threads used for the outer `n`-loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `cores < 1`.
    pub fn set_cores(&mut self, cores: usize) -> Result<()> {
        if cores < 1 {
            return Err(Error::InvalidArgument("cores must be >= 1".to_owned()));
        }
        self.cores = cores;
        Ok(())
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn cores(&self) -> usize {
        self.cores
    }

    /// Overrides the I-integral cache capacity (defaults to `10*lmax`).
    pub fn set_i_cache_capacity(&mut self, capacity: usize) {
        self.i_cache_capacity = Some(capacity);
    }

    /// Configured I-cache capacity override, if any.
    #[must_use]
    pub const fn i_cache_capacity(&self) -> Option<usize> {
        self.i_cache_capacity
    }

    /// Sets the sphere's scattering model.
    pub fn set_sphere(&mut self, sphere: SphereMaterial) {
        self.sphere = sphere;
    }

    /// The sphere's scattering model.
    #[must_use]
    pub const fn sphere(&self) -> SphereMaterial {
        self.sphere
    }

    /// Sets the plane's dielectric model.
    pub fn set_plane(&mut self, plane: DielectricModel) {
        self.plane = plane;
    }

    /// The plane's dielectric model.
    #[must_use]
    pub const fn plane(&self) -> &DielectricModel {
        &self.plane
    }

    /// `true` when both surfaces are perfect reflectors, enabling the
    /// TE/TM symmetry shortcuts used by the integration engine.
    #[must_use]
    pub const fn is_perfect_reflector(&self) -> bool {
        matches!(self.sphere, SphereMaterial::PerfectReflector)
            && self.plane.is_perfect_reflector()
    }

    /// A short build-identification string, analogous to the reference
    /// driver's `casimir_compile_info`: crate name, version, and the
    /// `f64`-based extended-precision kit in use.
    #[must_use]
    pub fn compile_info() -> String {
        format!(
            "caps {} (scalar kit: f64 log-magnitude+sign)",
            env!("CARGO_PKG_VERSION")
        )
    }
}

impl std::fmt::Display for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "L/R       = {}", self.l_by_r)?;
        writeln!(f, "R/(R+L)   = {}", self.r_by_script_l())?;
        writeln!(f, "T         = {}", self.t)?;
        writeln!(f, "lmax      = {}", self.lmax())?;
        writeln!(f, "precision = {}", self.precision)?;
        writeln!(f, "cores     = {}", self.cores)?;
        write!(
            f,
            "sphere    = {}",
            match self.sphere {
                SphereMaterial::PerfectReflector => "perfect reflector".to_owned(),
                SphereMaterial::Drude { omegap, gamma } =>
                    format!("Drude(omegap={omegap}, gamma={gamma})"),
            }
        )?;
        write!(
            f,
            "\nplane     = {}",
            match &self.plane {
                DielectricModel::PerfectReflector => "perfect reflector".to_owned(),
                DielectricModel::Drude { omegap, gamma } =>
                    format!("Drude(omegap={omegap}, gamma={gamma})"),
                DielectricModel::Table(_) => "tabulated material".to_owned(),
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_l_by_r() {
        assert!(Parameters::new(0.0, 1.0, 1e-10).is_err());
    }

    #[test]
    fn rejects_non_positive_precision() {
        assert!(Parameters::new(0.5, 1.0, 0.0).is_err());
    }

    #[test]
    fn lmax_respects_floor() {
        let params = Parameters::new(0.99, 1.0, 1e-10).unwrap();
        assert_eq!(params.lmax(), LMAX_FLOOR);
    }

    #[test]
    fn lmax_grows_as_l_by_r_shrinks() {
        let params = Parameters::new(0.01, 1.0, 1e-10).unwrap();
        assert!(params.lmax() > LMAX_FLOOR);
    }

    #[test]
    fn lmax_override_wins() {
        let mut params = Parameters::new(0.5, 1.0, 1e-10).unwrap();
        params.set_lmax(42).unwrap();
        assert_eq!(params.lmax(), 42);
    }

    #[test]
    fn rejects_zero_cores() {
        let mut params = Parameters::new(0.5, 1.0, 1e-10).unwrap();
        assert!(params.set_cores(0).is_err());
    }
}
