//! Error types shared across the crate.

/// Errors surfaced at the public API boundary.
///
/// Numeric warnings (non-fatal quadrature error flags, cache evictions) are
/// not represented here: they are accumulated on the owning session and
/// surfaced separately, since a caller that wants a best-effort result must
/// still get one back.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter was out of its valid range, or two parameters were
    /// mutually contradictory.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A special function (Bessel, Legendre) could not produce a
    /// representable result for the given arguments. This is fatal: it
    /// signals that the problem size (e.g. `lmax` vs. the Matsubara
    /// frequency) has exceeded what the arithmetic kit can resolve.
    #[error("{what} not representable for arguments {args}")]
    NotRepresentable {
        /// Name of the function that failed (e.g. `"bessel_lnInuKnu"`).
        what: &'static str,
        /// Human-readable rendering of the arguments that failed.
        args: String,
    },

    /// The material data file could not be parsed, or violated one of its
    /// structural invariants (non-monotonic ξ, missing header tails).
    #[error("material file error: {0}")]
    Material(String),

    /// Wraps an I/O failure (opening a material file, etc).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
