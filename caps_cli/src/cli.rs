//! Command-line argument surface (spec.md `§6`).

use std::path::PathBuf;

use clap::Parser;
use git_version::git_version;

/// Computes the plane-sphere Casimir free energy at finite temperature.
#[derive(Parser, Debug)]
#[command(
    name = "caps",
    author,
    about,
    version = git_version!(args = ["--always", "--dirty", "--long", "--tags"], fallback = env!("CARGO_PKG_VERSION"))
)]
pub struct Opts {
    /// Aspect ratio `L/R`: a single value, or `start,stop,N[,log]` for a
    /// swept range.
    #[arg(long = "L/R", value_name = "SPEC")]
    pub l_by_r: String,

    /// Temperature `T` in scaled units: same syntax as `L/R`.
    #[arg(long = "T", value_name = "SPEC")]
    pub t: String,

    /// Sphere relaxation frequency `gamma` (Drude model). Requires
    /// `--omegap`; omitted entirely, the sphere is a perfect reflector.
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Sphere plasma frequency `omegap` (Drude/plasma model, scaled
    /// units). Omitted, the sphere is a perfect reflector.
    #[arg(long)]
    pub omegap: Option<f64>,

    /// Path to a plate material data file (spec.md `§6`). Omitted, the
    /// plate is a perfect reflector.
    #[arg(long, value_name = "FILE")]
    pub material: Option<PathBuf>,

    /// Length scale used by the default `lmax = max(ceil(lscale/(L/R)), 20)`
    /// formula. Ignored if `--lmax` is given.
    #[arg(long)]
    pub lscale: Option<f64>,

    /// Explicit truncation order for the angular-momentum sum. Overrides
    /// `--lscale`.
    #[arg(long)]
    pub lmax: Option<i32>,

    /// Number of worker threads used for the outer Matsubara-frequency
    /// sum.
    #[arg(long, default_value_t = 1)]
    pub cores: usize,

    /// Relative precision target for both the inner (`m`) and outer
    /// (`n`) tail-termination criteria.
    #[arg(long, default_value_t = 1e-10)]
    pub precision: f64,

    /// Buffer stdout instead of flushing after every point (throughput
    /// over latency for large sweeps).
    #[arg(long)]
    pub buffering: bool,

    /// Suppress progress output on stderr.
    #[arg(short, long)]
    pub quiet: bool,
}
