//! Per-step LMHFE assembly, GMRES solve, and cell-average reconstruction.
//!
//! Grounded on `MHFE::step`/`B_inv` in the original source (`MHFE.hpp`,
//! `MHFE_impl.hpp`): the lump scalar, the local inverse mass-matrix entry,
//! and the edge-loop assembly shape all mirror that file, generalized from
//! a single problem-wide `a`/`c` to the per-cell arrays `Problem` carries.

use lmhfe_core::matrix::CsrMatrix;
use lmhfe_core::mesh::{Mesh, NO_CELL};
use lmhfe_core::{Error, Problem, Result};

use crate::gmres::{GmresOptions, GmresResult, solve_gmres};

/// Per-cell time constants shared by the primal assembly, the primal
/// reconstruction, and both sensitivity drivers.
pub(crate) struct CellConstants {
    pub lambda: f64,
    pub l: f64,
    pub beta: f64,
}

/// The MHFE lump scalar `ℓ = (‖r₀‖² + ‖r₁‖² + ‖r₂‖²) / (48·area)`.
pub(crate) fn cell_lump(mesh: &Mesh, cell: usize) -> f64 {
    let area = mesh.cell_measure(cell);
    let sq_sum: f64 = mesh.cells()[cell]
        .edges
        .iter()
        .map(|&e| mesh.get_edge_dir(e).norm_squared())
        .sum();
    sq_sum / (48.0 * area)
}

pub(crate) fn cell_constants(problem: &Problem, cell: usize) -> CellConstants {
    let mesh = problem.mesh();
    let area = mesh.cell_measure(cell);
    let lambda = problem.c[cell] * area / problem.tau;
    let l = cell_lump(mesh, cell);
    let beta = lambda + problem.a[cell] * 3.0 / l;
    CellConstants { lambda, l, beta }
}

/// The local inverse mass-matrix entry `B⁻¹(e, g, cell) = (rₑ·r_g)/area + 1/(3ℓ)`.
fn b_inv(mesh: &Mesh, cell: usize, edge: usize, g: usize, l: f64) -> f64 {
    let area = mesh.cell_measure(cell);
    let r_e = mesh.get_edge_dir(edge);
    let r_g = mesh.get_edge_dir(g);
    r_e.dot(&r_g) / area + 1.0 / (3.0 * l)
}

fn accumulate_cell_contribution(
    problem: &Problem,
    matrix: &mut CsrMatrix,
    r: &mut [f64],
    p_prev: &[f64],
    edge: usize,
    cell: usize,
) {
    let mesh = problem.mesh();
    let consts = cell_constants(problem, cell);
    let a_cell = problem.a[cell];

    for &g in &mesh.cells()[cell].edges {
        let b = b_inv(mesh, cell, edge, g, consts.l);
        let delta = a_cell * (b - a_cell / (consts.l * consts.l * consts.beta));
        *matrix.get_mut(edge, g) += delta;
    }

    r[edge] += a_cell * consts.lambda * p_prev[cell] / (consts.l * consts.beta);
}

/// Per-row capacity: 1 for a Dirichlet edge, otherwise 1 plus `edges_per_cell - 1`
/// (= 2 for a triangle) for every adjacent cell.
fn row_capacities(problem: &Problem) -> Vec<usize> {
    let mesh = problem.mesh();
    (0..mesh.nedges())
        .map(|e| {
            if problem.dirichlet_mask[e] != 0.0 {
                1
            } else {
                let edge = &mesh.edges()[e];
                1 + edge.cells.iter().filter(|&&c| c != NO_CELL).count() * 2
            }
        })
        .collect()
}

/// Rebuild `matrix` and the right-hand side for one time step, given the
/// previous cell averages `p_prev`. Leaves `matrix` populated for the
/// caller to solve against.
fn assemble(problem: &Problem, matrix: &mut CsrMatrix, p_prev: &[f64]) -> Vec<f64> {
    let mesh = problem.mesh();
    matrix.reset();
    let mut r = vec![0.0; mesh.nedges()];

    for e in 0..mesh.nedges() {
        if problem.dirichlet_mask[e] != 0.0 {
            *matrix.get_mut(e, e) += 1.0;
            r[e] += problem.dirichlet[e];
            continue;
        }

        let edge = &mesh.edges()[e];
        if problem.neumann_mask[e] != 0.0 {
            let cell = edge
                .boundary_cell()
                .expect("a Neumann edge must be a boundary edge");
            accumulate_cell_contribution(problem, matrix, &mut r, p_prev, e, cell);
            r[e] += problem.neumann[e];
            continue;
        }

        for &c in &edge.cells {
            if c != NO_CELL {
                accumulate_cell_contribution(problem, matrix, &mut r, p_prev, e, c);
            }
        }
    }

    r
}

/// Differentiate the assembly's right-hand side with respect to the scalar
/// tangent parameter `s`, reusing the primal matrix `M` unchanged (§4.5:
/// "the system matrix for the tangent solve is the SAME M").
pub(crate) fn tangent_rhs(problem: &Problem, da: &[f64], p_prev: &[f64], dp_prev: &[f64]) -> Vec<f64> {
    let mesh = problem.mesh();
    let mut r = vec![0.0; mesh.nedges()];

    for e in 0..mesh.nedges() {
        if problem.dirichlet_mask[e] != 0.0 {
            // A Dirichlet value does not depend on s; the row is the
            // identity equation, so its tangent right-hand side is zero.
            continue;
        }

        let edge = &mesh.edges()[e];
        if problem.neumann_mask[e] != 0.0 {
            let cell = edge
                .boundary_cell()
                .expect("a Neumann edge must be a boundary edge");
            accumulate_tangent_contribution(problem, &mut r, da, p_prev, dp_prev, e, cell);
            continue;
        }

        for &c in &edge.cells {
            if c != NO_CELL {
                accumulate_tangent_contribution(problem, &mut r, da, p_prev, dp_prev, e, c);
            }
        }
    }

    r
}

fn accumulate_tangent_contribution(
    problem: &Problem,
    r: &mut [f64],
    da: &[f64],
    p_prev: &[f64],
    dp_prev: &[f64],
    edge: usize,
    cell: usize,
) {
    let consts = cell_constants(problem, cell);
    let a_cell = problem.a[cell];
    r[edge] += (da[cell] * p_prev[cell] + a_cell * dp_prev[cell]) * consts.lambda / (consts.l * consts.beta);
}

/// Reconstruct the tangent cell averages `dP` from the tangent edge
/// averages `dTP`, mirroring the primal reconstruction's dependence on `a`.
pub(crate) fn reconstruct_dp(problem: &Problem, dp_prev: &[f64], da: &[f64], p_prev: &[f64], dtp: &[f64]) -> Vec<f64> {
    let mesh = problem.mesh();
    let mut dp = vec![0.0; mesh.ncells()];

    for cell in 0..mesh.ncells() {
        let consts = cell_constants(problem, cell);
        let a_cell = problem.a[cell];

        let mut value = consts.lambda * dp_prev[cell] / consts.beta;
        value += da[cell] * p_prev[cell] / (consts.beta * consts.l);
        for &e in &mesh.cells()[cell].edges {
            value += a_cell * dtp[e] / (consts.beta * consts.l);
        }
        dp[cell] = value;
    }

    dp
}

/// The lumped mixed-hybrid finite-element solver: cell averages `P`, edge
/// averages `TP`, and the current time `t`, advanced one `τ` per [`Self::step`].
pub struct Lmhfe {
    problem: Problem,
    p: Vec<f64>,
    tp: Vec<f64>,
    t: f64,
    matrix: CsrMatrix,
    gmres_options: GmresOptions,
}

impl Lmhfe {
    /// Build a solver over `problem`, rejecting an invalid one (§3) up
    /// front. `tol_rel` is GMRES's relative tolerance per solve; the
    /// restart length defaults to 20 and the iteration budget to
    /// `edges * 10`, per §4.4 step 5.
    pub fn new(problem: Problem, tol_rel: f64) -> Result<Self> {
        if !problem.is_valid() {
            return Err(Error::InvalidArgument(
                "problem fails validity checks: see Problem::is_valid".into(),
            ));
        }

        let mesh = problem.mesh();
        let ncells = mesh.ncells();
        let nedges = mesh.nedges();
        let capacities = row_capacities(&problem);
        let matrix = CsrMatrix::with_row_capacities(nedges, nedges, &capacities);
        let gmres_options = GmresOptions {
            max_iters: (nedges * 10).max(1),
            restart_m: 20,
            tol_abs: 1e-12,
            tol_rel,
        };

        Ok(Self {
            problem,
            p: vec![0.0; ncells],
            tp: vec![0.0; nedges],
            t: 0.0,
            matrix,
            gmres_options,
        })
    }

    /// Advance the solver by one `τ`. On `Err(Error::ConvergenceFailure)`
    /// `P`/`TP` hold GMRES's best iterate but `t` was not advanced (§7).
    pub fn step(&mut self) -> Result<()> {
        let (p_prev, rhs) = self.assemble_step();
        let result = self.solve_step(&rhs);
        self.finish_step(&p_prev, &result)
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn p(&self) -> &[f64] {
        &self.p
    }

    pub fn tp(&self) -> &[f64] {
        &self.tp
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Rebuild `self.matrix` and the right-hand side for this step.
    /// Exposed crate-internally so [`crate::sensitivity::FwdDiff`] can
    /// solve its tangent system against the same `M`.
    pub(crate) fn assemble_step(&mut self) -> (Vec<f64>, Vec<f64>) {
        let p_prev = self.p.clone();
        let rhs = assemble(&self.problem, &mut self.matrix, &p_prev);
        (p_prev, rhs)
    }

    pub(crate) fn solve_step(&mut self, rhs: &[f64]) -> GmresResult {
        let result = solve_gmres(&self.matrix, rhs, Some(&self.tp), &self.gmres_options);
        self.tp = result.x.clone();
        result
    }

    pub(crate) fn finish_step(&mut self, p_prev: &[f64], result: &GmresResult) -> Result<()> {
        self.reconstruct_p(p_prev);
        if !result.converged {
            log::warn!(
                "GMRES did not converge after {} iterations (residual {:.3e})",
                result.iterations,
                result.residual
            );
            return Err(Error::ConvergenceFailure {
                iterations: result.iterations,
                residual: result.residual,
            });
        }
        self.t += self.problem.tau;
        Ok(())
    }

    pub(crate) fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    pub(crate) fn gmres_options(&self) -> &GmresOptions {
        &self.gmres_options
    }

    fn reconstruct_p(&mut self, p_prev: &[f64]) {
        let mesh = self.problem.mesh();
        for cell in 0..mesh.ncells() {
            let consts = cell_constants(&self.problem, cell);
            let a_cell = self.problem.a[cell];

            let mut value = consts.lambda * p_prev[cell] / consts.beta;
            for &e in &mesh.cells()[cell].edges {
                value += a_cell * self.tp[e] / (consts.beta * consts.l);
            }
            self.p[cell] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmhfe_core::mesh::Mesh;

    fn scenario_6_problem(nx: usize, ny: usize, x: f64, y: f64, tau: f64) -> Problem {
        let mesh = Mesh::gen_rect(nx, ny, x, y).unwrap().direct();
        let ncells = mesh.ncells();
        let nedges = mesh.nedges();

        let a = vec![1.0; ncells];
        let c = vec![1.0; ncells];
        let mut dirichlet = vec![0.0; nedges];
        let mut dirichlet_mask = vec![0.0; nedges];
        let mut neumann = vec![0.0; nedges];
        let mut neumann_mask = vec![0.0; nedges];

        for e in 0..nedges {
            if !mesh.edges()[e].is_boundary() {
                continue;
            }
            let p1 = mesh.points()[mesh.edges()[e].points[0]];
            let d = mesh.get_edge_dir(e);
            if d.x == 0.0 {
                let mid_y = p1.y + d.y / 2.0;
                let active = p1.x == 0.0 && mid_y > 1.0 && mid_y < 9.0;
                dirichlet_mask[e] = 1.0;
                dirichlet[e] = if active { 1.0 } else { 0.0 };
            } else if d.y == 0.0 {
                neumann_mask[e] = 1.0;
                neumann[e] = 0.0;
            }
        }

        Problem::new(mesh, a, c, dirichlet, dirichlet_mask, neumann, neumann_mask, tau).unwrap()
    }

    #[test]
    fn rejects_invalid_problem() {
        let mesh = Mesh::gen_rect(2, 2, 1.0, 1.0).unwrap().direct();
        let ncells = mesh.ncells();
        let nedges = mesh.nedges();
        let problem = Problem::new(
            mesh,
            vec![1.0; ncells],
            vec![1.0; ncells],
            vec![0.0; nedges],
            vec![0.0; nedges], // no boundary edge is masked: invalid
            vec![0.0; nedges],
            vec![0.0; nedges],
            0.1,
        )
        .unwrap();
        assert!(Lmhfe::new(problem, 1e-6).is_err());
    }

    #[test]
    fn dirichlet_row_is_exact_after_every_step() {
        let problem = scenario_6_problem(40, 20, 20.0, 10.0, 0.1);
        let mesh = problem.mesh().clone();
        let dirichlet = problem.dirichlet.clone();
        let dirichlet_mask = problem.dirichlet_mask.clone();
        let mut solver = Lmhfe::new(problem, 1e-6).unwrap();

        for _ in 0..10 {
            solver.step().unwrap();
        }

        for e in 0..mesh.nedges() {
            if dirichlet_mask[e] != 0.0 {
                assert!((solver.tp()[e] - dirichlet[e]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn scenario_6_is_bounded_finite_and_nondecreasing_near_dirichlet_segment() {
        let problem = scenario_6_problem(40, 20, 20.0, 10.0, 0.1);
        let mesh = problem.mesh().clone();

        // Cells whose cell_center sits near x = 0, 1 < y < 9: adjacent to
        // the active Dirichlet segment.
        let tracked: Vec<usize> = (0..mesh.ncells())
            .filter(|&c| {
                let center = mesh.cell_center(c);
                center.x < 1.0 && center.y > 1.0 && center.y < 9.0
            })
            .collect();

        let mut solver = Lmhfe::new(problem, 1e-6).unwrap();
        let mut previous: Vec<f64> = tracked.iter().map(|&c| solver.p()[c]).collect();

        for _ in 0..10 {
            solver.step().unwrap();
            for p in solver.p() {
                assert!(p.is_finite());
                assert!(*p >= 0.0 && *p <= 1.001);
            }
            for (i, &c) in tracked.iter().enumerate() {
                assert!(solver.p()[c] + 1e-9 >= previous[i]);
                previous[i] = solver.p()[c];
            }
        }
    }
}
