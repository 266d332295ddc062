//! Outer Matsubara-frequency (`n`) and magnetic-quantum-number (`m`)
//! summation that assembles the free energy from individual
//! `log det D(n, m)` terms, with per-n and global tail termination and a
//! rayon-based worker pool across `n` replacing a manual thread-pool.

use std::sync::mpsc;

use rayon::prelude::*;

use crate::error::Result;
use crate::fresnel::DielectricModel;
use crate::integration::IntegrationSession;
use crate::matrix::{logdet_d, logdet_d0, FactorizationAlgorithm};
use crate::mie::{MieCache, MieContext};

/// Inputs to the free-energy summation, independent of the CLI surface.
#[derive(Clone, Copy, Debug)]
pub struct SummationParams {
    /// `R/(R+L)`.
    pub r_by_script_l: f64,
    /// Temperature in natural units.
    pub t: f64,
    /// Maximum angular-momentum order.
    pub lmax: i32,
    /// Relative precision for both the inner (`m`) and outer (`n`) sums.
    pub precision: f64,
    /// Relative quadrature tolerance fed to the integration engine.
    pub eps_rel: f64,
    /// Number of worker threads (`1` runs the outer sum on the calling
    /// thread, skipping the rayon pool entirely).
    pub cores: usize,
    /// I-integral cache capacity override (`None` picks a default scaled
    /// to `lmax`).
    pub i_cache_capacity: Option<usize>,
    /// Sphere plasma frequency (`f64::INFINITY` for a perfectly
    /// reflecting sphere).
    pub sphere_omegap: f64,
    /// Sphere relaxation frequency.
    pub sphere_gamma: f64,
}

/// Sums `values[1..]` in increasing index first (smallest contributions
/// accumulated first to reduce cancellation), folding in `values[0]/2`
/// last (the `n=0` or `m=0` term carries half weight).
fn half_weighted_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    for v in values.iter().skip(1).rev() {
        sum += v;
    }
    sum + values[0] / 2.0
}

/// `log det D(xi=n*T, m)` for a single `(n, m)` pair, plus any quadrature
/// warnings raised while computing it.
fn logdet_nm(
    n: i32,
    m: i32,
    params: &SummationParams,
    dielectric: &DielectricModel,
    mie_cache: &mut MieCache,
) -> Result<(f64, Vec<String>)> {
    if n == 0 {
        if dielectric.is_perfect_reflector() {
            let (ee, mm) = logdet_d0(m, params.lmax, params.r_by_script_l);
            return Ok((ee + mm, Vec::new()));
        }
        let (ee, _) = logdet_d0(m, params.lmax, params.r_by_script_l);
        return Ok((ee, Vec::new()));
    }

    let alpha = 2.0 * f64::from(n) * params.t;
    let is_pr = dielectric.is_perfect_reflector();
    let mie_ctx = MieContext {
        t: params.t,
        r_by_script_l: params.r_by_script_l,
        omegap: params.sphere_omegap,
        gamma: params.sphere_gamma,
    };

    let mut session = IntegrationSession::new(
        alpha,
        m,
        params.eps_rel,
        is_pr,
        dielectric,
        params.i_cache_capacity,
        params.lmax,
    );

    let value = logdet_d(
        &mut session,
        mie_cache,
        mie_ctx,
        n,
        m,
        params.lmax,
        FactorizationAlgorithm::Lu,
    )?;
    Ok((value, session.warnings().to_vec()))
}

/// Free energy contribution of a single Matsubara term `n`: sums over
/// `m = 0..=lmax` with early termination once a term's relative
/// contribution to the running sum drops below `precision`.
fn free_energy_n(
    n: i32,
    params: &SummationParams,
    dielectric: &DielectricModel,
) -> Result<(f64, i32, Vec<String>)> {
    let mut mie_cache = MieCache::new();
    let mut values = vec![0.0; (params.lmax + 1) as usize];
    let mut warnings = Vec::new();
    let mut mmax = params.lmax;

    for m in 0..=params.lmax {
        let (value, m_warnings) = logdet_nm(n, m, params, dielectric, &mut mie_cache)?;
        values[m as usize] = value;
        warnings.extend(m_warnings);

        let sum_so_far = half_weighted_sum(&values[..=(m as usize)]);
        if values[0] != 0.0 && (values[m as usize] / sum_so_far).abs() < params.precision {
            mmax = m;
            break;
        }
    }

    Ok((
        half_weighted_sum(&values[..=(mmax as usize)]),
        mmax,
        warnings,
    ))
}

/// Computes the free energy `F` and returns `(F, nmax, warnings)`, where
/// `nmax` is the highest Matsubara index that contributed and `warnings`
/// collects every quadrature warning raised while computing it.
///
/// Matsubara terms are dispatched across a rayon thread pool sized to
/// `params.cores` when `cores > 1`; results are harvested through a
/// channel and written into a growable accumulator at their `n` index
/// (arrival order need not match dispatch order).
pub fn free_energy(
    params: &SummationParams,
    dielectric: &DielectricModel,
) -> Result<(f64, i32, Vec<String>)> {
    let chunk = 512.max(params.cores).max(1);
    let mut values: Vec<f64> = Vec::new();
    let mut warnings = Vec::new();
    let mut n: i32 = 0;

    if params.cores <= 1 {
        loop {
            if (n as usize) >= values.len() {
                values.resize(values.len() + chunk, 0.0);
            }
            let (value, _, n_warnings) = free_energy_n(n, params, dielectric)?;
            values[n as usize] = value;
            warnings.extend(n_warnings);

            if values[0] != 0.0 && (values[n as usize] / (2.0 * values[0])).abs() < params.precision
            {
                break;
            }
            n += 1;
        }
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.cores)
            .build()
            .map_err(|e| crate::error::Error::InvalidArgument(e.to_string()))?;

        loop {
            if (n as usize) >= values.len() {
                values.resize(values.len() + chunk, 0.0);
            }

            let batch: Vec<i32> = (n..n + chunk as i32).collect();
            let (tx, rx) = mpsc::channel();

            pool.install(|| {
                batch.par_iter().for_each_with(tx, |tx, &ni| {
                    let result = free_energy_n(ni, params, dielectric);
                    let _ = tx.send((ni, result));
                });
            });

            let mut done = false;
            for (ni, result) in rx {
                let (value, _, n_warnings) = result?;
                values[ni as usize] = value;
                warnings.extend(n_warnings);
                if values[0] != 0.0
                    && (values[ni as usize] / (2.0 * values[0])).abs() < params.precision
                {
                    done = true;
                }
            }

            if done {
                break;
            }
            n += chunk as i32;
        }
    }

    let nmax = values.iter().rposition(|&v| v != 0.0).unwrap_or(0) as i32;
    let sum_n = half_weighted_sum(&values[..=(nmax as usize)]);
    Ok((params.t / std::f64::consts::PI * sum_n, nmax, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_weighted_sum_halves_leading_term() {
        let values = [2.0, 1.0, 1.0];
        assert!((half_weighted_sum(&values) - 3.0).abs() < 1e-12);
    }
}
