//! Forward-mode tangent propagation, run in lock-step with the primal
//! LMHFE time-stepping against the same system matrix `M` (§4.5).

use lmhfe_core::matrix::dot;
use lmhfe_core::{Error, Problem, Result};

use crate::gmres::solve_gmres;
use crate::lmhfe::{reconstruct_dp, tangent_rhs};
use crate::Lmhfe;

/// ∂g/∂P given the current P, written into `out` (length `|cells|`).
pub type GWrtP = Box<dyn Fn(&[f64], &mut [f64])>;
/// ∂g/∂a, independent of state, written into `out` (length `|cells|`);
/// also reused as the tangent perturbation direction of `a` (§4.5, §9).
pub type GWrtA = Box<dyn Fn(&mut [f64])>;

/// Forward-mode sensitivity of a monitored scalar `g` to the scalar
/// parameter `s` of `a(s) = a₀ + s·g_wrt_a()`, propagated alongside an
/// [`Lmhfe`] primal solve.
pub struct FwdDiff {
    primal: Lmhfe,
    dp: Vec<f64>,
    dtp: Vec<f64>,
    g_wrt_p: GWrtP,
    g_wrt_a: GWrtA,
    sensitivity: f64,
}

impl FwdDiff {
    pub fn new(problem: Problem, tol_rel: f64, g_wrt_p: GWrtP, g_wrt_a: GWrtA) -> Result<Self> {
        let primal = Lmhfe::new(problem, tol_rel)?;
        let ncells = primal.p().len();
        let nedges = primal.tp().len();
        Ok(Self {
            primal,
            dp: vec![0.0; ncells],
            dtp: vec![0.0; nedges],
            g_wrt_p,
            g_wrt_a,
            sensitivity: 0.0,
        })
    }

    pub fn time(&self) -> f64 {
        self.primal.time()
    }

    pub fn p(&self) -> &[f64] {
        self.primal.p()
    }

    pub fn dp(&self) -> &[f64] {
        &self.dp
    }

    /// The accumulated sensitivity `ds` of the monitored functional to `s`.
    pub fn get_sensitivity(&self) -> f64 {
        self.sensitivity
    }

    /// Advance the primal and tangent states by one `τ`, accumulating the
    /// chain-rule contribution to `ds` (§4.5 steps 1-5).
    pub fn step(&mut self) -> Result<()> {
        let (p_prev, rhs) = self.primal.assemble_step();
        let ncells = p_prev.len();

        let mut da = vec![0.0; ncells];
        (self.g_wrt_a)(&mut da);

        let tangent_rhs_vec = tangent_rhs(self.primal.problem(), &da, &p_prev, &self.dp);
        let tangent_result = solve_gmres(
            self.primal.matrix(),
            &tangent_rhs_vec,
            Some(&self.dtp),
            self.primal.gmres_options(),
        );

        let primal_result = self.primal.solve_step(&rhs);
        self.primal.finish_step(&p_prev, &primal_result)?;

        if !tangent_result.converged {
            log::warn!(
                "tangent GMRES did not converge after {} iterations (residual {:.3e})",
                tangent_result.iterations,
                tangent_result.residual
            );
            self.dtp = tangent_result.x;
            return Err(Error::ConvergenceFailure {
                iterations: tangent_result.iterations,
                residual: tangent_result.residual,
            });
        }
        self.dtp = tangent_result.x;

        let new_dp = reconstruct_dp(self.primal.problem(), &self.dp, &da, &p_prev, &self.dtp);

        let mut g_wrt_p_buf = vec![0.0; ncells];
        (self.g_wrt_p)(self.primal.p(), &mut g_wrt_p_buf);
        self.sensitivity += dot(&g_wrt_p_buf, &new_dp) + da.iter().sum::<f64>();

        self.dp = new_dp;
        Ok(())
    }
}
