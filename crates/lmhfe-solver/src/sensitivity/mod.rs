//! Sensitivity drivers: forward-mode tangent propagation ([`FwdDiff`]) and
//! finite-difference ([`FinDiff`]), both riding on top of [`crate::Lmhfe`].

pub mod fin_diff;
pub mod fwd_diff;

pub use fin_diff::FinDiff;
pub use fwd_diff::FwdDiff;
