//! Restarted GMRES over [`lmhfe_core::matrix::MatrixOperator`].
//!
//! # Module structure
//!
//! - [`real`] - the restarted GMRES(m) solver
//! - [`helpers`] - Givens rotation utility

pub mod helpers;
pub mod real;

pub use real::{GmresResult, solve_gmres};

/// GMRES solver configuration.
#[derive(Debug, Clone)]
pub struct GmresOptions {
    /// Maximum total inner iterations across all restart cycles.
    pub max_iters: usize,
    /// Krylov subspace dimension before restart.
    pub restart_m: usize,
    /// Absolute residual tolerance.
    pub tol_abs: f64,
    /// Relative residual tolerance (scaled by `‖b‖`).
    pub tol_rel: f64,
}

impl Default for GmresOptions {
    fn default() -> Self {
        Self {
            max_iters: 500,
            restart_m: 20,
            tol_abs: 1e-12,
            tol_rel: 1e-9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_the_external_contract() {
        let options = GmresOptions::default();
        assert_eq!(options.restart_m, 20);
        assert!((options.tol_abs - 1e-12).abs() < 1e-20);
        assert!((options.tol_rel - 1e-9).abs() < 1e-15);
    }
}
