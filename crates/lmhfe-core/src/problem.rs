//! A [`Problem`] bundles a mesh with the per-cell/per-edge data the LMHFE
//! assembly needs: diffusion and capacity coefficients, boundary masks
//! and values, and the time step.

use crate::error::{Error, Result};
use crate::mesh::Mesh;

/// A diffusion problem: a mesh plus the coefficients and boundary data
/// LMHFE assembles against.
#[derive(Debug, Clone)]
pub struct Problem {
    mesh: Mesh,
    /// Per-cell diffusion coefficient `a`.
    pub a: Vec<f64>,
    /// Per-cell capacity coefficient `c`.
    pub c: Vec<f64>,
    /// Per-edge Dirichlet value.
    pub dirichlet: Vec<f64>,
    /// Per-edge Dirichlet mask (nonzero = active).
    pub dirichlet_mask: Vec<f64>,
    /// Per-edge Neumann value.
    pub neumann: Vec<f64>,
    /// Per-edge Neumann mask (nonzero = active).
    pub neumann_mask: Vec<f64>,
    /// Time step, must be strictly positive.
    pub tau: f64,
}

impl Problem {
    /// Build a problem, validating array lengths against the mesh and
    /// the strict positivity of `tau`. Does not require every boundary
    /// edge to carry a mask yet — use [`Problem::is_valid`] for that.
    pub fn new(
        mesh: Mesh,
        a: Vec<f64>,
        c: Vec<f64>,
        dirichlet: Vec<f64>,
        dirichlet_mask: Vec<f64>,
        neumann: Vec<f64>,
        neumann_mask: Vec<f64>,
        tau: f64,
    ) -> Result<Self> {
        let problem = Self {
            mesh,
            a,
            c,
            dirichlet,
            dirichlet_mask,
            neumann,
            neumann_mask,
            tau,
        };
        problem.check_sizes()?;
        if !(problem.tau > 0.0) {
            return Err(Error::InvalidArgument("tau must be strictly positive".into()));
        }
        Ok(problem)
    }

    fn check_sizes(&self) -> Result<()> {
        let ncells = self.mesh.ncells();
        let nedges = self.mesh.nedges();
        if self.a.len() != ncells || self.c.len() != ncells {
            return Err(Error::InvalidArgument(
                "a/c must be indexed by cell and match the mesh cell count".into(),
            ));
        }
        if self.dirichlet.len() != nedges
            || self.dirichlet_mask.len() != nedges
            || self.neumann.len() != nedges
            || self.neumann_mask.len() != nedges
        {
            return Err(Error::InvalidArgument(
                "boundary arrays must be indexed by edge and match the mesh edge count".into(),
            ));
        }
        Ok(())
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Every boundary edge must carry at least one nonzero mask.
    pub fn is_valid(&self) -> bool {
        if self.check_sizes().is_err() || !(self.tau > 0.0) {
            return false;
        }
        if !self.mesh.is_valid() {
            return false;
        }
        for (e, edge) in self.mesh.edges().iter().enumerate() {
            if edge.is_boundary() && self.dirichlet_mask[e] == 0.0 && self.neumann_mask[e] == 0.0 {
                return false;
            }
        }
        true
    }
}
