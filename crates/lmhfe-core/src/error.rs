//! Shared error taxonomy for the LMHFE engine.

use thiserror::Error;

/// Errors that can occur while building or running the diffusion engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A malformed problem or argument: size mismatches, zero/negative tau,
    /// nonpositive mesh dimensions, bad CLI input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant was violated (out-of-range access, duplicate
    /// CSR entry). Indicates a programming error rather than bad input.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// GMRES exhausted its iteration budget above tolerance.
    #[error("solver did not converge after {iterations} iterations (residual {residual:.3e})")]
    ConvergenceFailure {
        /// Iterations performed before giving up.
        iterations: usize,
        /// Final residual norm reached.
        residual: f64,
    },

    /// A mesh file was unreadable or malformed.
    #[error("I/O failure: {0}")]
    IoFailure(String),
}

/// Result type for fallible LMHFE operations.
pub type Result<T> = std::result::Result<T, Error>;
