#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! `caps` computes the Casimir free energy between a sphere and a plane
//! at finite temperature, in the scattering-matrix formulation: a double
//! sum over Matsubara frequencies and magnetic quantum numbers of
//! `log det(1 - M(xi, m))`, where `M` couples partial waves through Mie
//! scattering off the sphere, translation to the plane, and Fresnel
//! reflection off the plate.
//!
//! Module layout mirrors the physical pipeline, leaves first:
//! [`scalar`] (log-space arithmetic) and [`bessel`]/[`legendre`]/[`gaunt`]
//! (special functions) underpin [`quadrature`] and [`integration`] (the
//! radial-integration engine) and [`mie`] (sphere scattering
//! coefficients); [`fresnel`]/[`material`] supply the plate's response;
//! [`matrix`] assembles the round-trip operator and its log-determinant;
//! [`summation`] drives the outer `(n, m)` sums; [`params`] and
//! [`casimir`] are the public façade.

pub mod bessel;
pub mod casimir;
pub mod error;
pub mod fresnel;
pub mod gaunt;
pub mod integration;
pub mod legendre;
pub mod material;
pub mod matrix;
pub mod mie;
pub mod params;
pub mod quadrature;
pub mod scalar;
pub mod summation;
