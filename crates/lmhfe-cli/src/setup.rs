//! Problem construction shared by the `run` and `export` subcommands.
//!
//! Reproduces the boundary condition scenario of the original `vis`
//! driver: a Dirichlet segment on the left edge between `y = 1` and
//! `y = 9`, zero Dirichlet elsewhere on the left and right edges, and
//! zero-flux Neumann on the top and bottom edges.

use anyhow::Context;
use lmhfe_core::{Mesh, Problem};

/// The four scalars the reference CLI reads from stdin: mesh resolution
/// `(nx, ny)` and physical extent `(x, y)`.
#[derive(Debug, Clone, Copy)]
pub struct MeshSpec {
    pub nx: usize,
    pub ny: usize,
    pub x: f64,
    pub y: f64,
}

impl MeshSpec {
    /// Parse four whitespace-separated scalars: `Nx Ny X Y`.
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let mut tokens = input.split_whitespace();
        let nx: usize = next_token(&mut tokens, "Nx")?;
        let ny: usize = next_token(&mut tokens, "Ny")?;
        let x: f64 = next_token(&mut tokens, "X")?;
        let y: f64 = next_token(&mut tokens, "Y")?;
        Ok(Self { nx, ny, x, y })
    }
}

fn next_token<T: std::str::FromStr>(
    tokens: &mut std::str::SplitWhitespace,
    name: &str,
) -> anyhow::Result<T> {
    tokens
        .next()
        .with_context(|| format!("missing {name} on stdin"))?
        .parse()
        .map_err(|_| anyhow::anyhow!("could not parse {name} as a number"))
}

/// Build the reference diffusion problem over a mesh sized by `spec`, with
/// unit diffusion/capacity coefficients and the boundary scenario above.
pub fn build_problem(spec: MeshSpec, tau: f64) -> anyhow::Result<Problem> {
    let mesh = Mesh::gen_rect(spec.nx, spec.ny, spec.x, spec.y)
        .context("failed to generate mesh")?
        .direct();

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

    Problem::new(mesh, a, c, dirichlet, dirichlet_mask, neumann, neumann_mask, tau)
        .context("problem construction rejected the generated mesh/boundary data")
}
