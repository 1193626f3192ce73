//! lmhfe-cli: reference driver for the LMHFE diffusion engine.
//!
//! Reads `Nx Ny X Y` from stdin, builds the left-edge-Dirichlet-segment
//! scenario of the original `vis` driver over a rectangular mesh of that
//! resolution and extent, then runs the requested subcommand.

mod export;
mod setup;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lmhfe_core::Layers;
use lmhfe_solver::{FinDiff, FwdDiff, Lmhfe};

use setup::{MeshSpec, build_problem};

#[derive(Parser)]
#[command(name = "lmhfe")]
#[command(about = "Reference driver for the LMHFE diffusion engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the vanilla LMHFE solver to t >= T and print per-step diagnostics.
    Run {
        /// Simulation end time.
        #[arg(long, default_value = "1.0")]
        t: f64,
        /// Time step.
        #[arg(long, default_value = "0.1")]
        tau: f64,
        /// GMRES relative tolerance.
        #[arg(long, default_value = "1e-6")]
        tol_rel: f64,
    },

    /// Run LMHFE to t >= T, collect the cell-average solution per step into
    /// a named layer, and write a PyVista-loadable Python script.
    Export {
        /// Output Python script path.
        #[arg(short, long)]
        output: PathBuf,
        /// Simulation end time.
        #[arg(long, default_value = "1.0")]
        t: f64,
        /// Time step.
        #[arg(long, default_value = "0.1")]
        tau: f64,
        /// GMRES relative tolerance.
        #[arg(long, default_value = "1e-6")]
        tol_rel: f64,
    },

    /// Run the forward-mode and finite-difference sensitivity drivers to
    /// t >= T and print the accumulated/finite-difference sensitivities.
    Sensitivity {
        /// Simulation end time.
        #[arg(long, default_value = "1.0")]
        t: f64,
        /// Time step.
        #[arg(long, default_value = "0.1")]
        tau: f64,
        /// GMRES relative tolerance.
        #[arg(long, default_value = "1e-6")]
        tol_rel: f64,
        /// Finite-difference step size.
        #[arg(long, default_value = "0.01")]
        h: f64,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let spec = match read_mesh_spec() {
        Ok(spec) => spec,
        Err(e) => {
            log::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run { t, tau, tol_rel } => cmd_run(spec, t, tau, tol_rel),
        Commands::Export {
            output,
            t,
            tau,
            tol_rel,
        } => cmd_export(spec, output, t, tau, tol_rel),
        Commands::Sensitivity { t, tau, tol_rel, h } => cmd_sensitivity(spec, t, tau, tol_rel, h),
    }
}

fn read_mesh_spec() -> anyhow::Result<MeshSpec> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| anyhow::anyhow!("failed to read stdin: {e}"))?;
    MeshSpec::parse(&input)
}

fn cmd_run(spec: MeshSpec, t: f64, tau: f64, tol_rel: f64) -> ExitCode {
    let problem = match build_problem(spec, tau) {
        Ok(problem) => problem,
        Err(e) => {
            log::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut solver = match Lmhfe::new(problem, tol_rel) {
        Ok(solver) => solver,
        Err(e) => {
            log::error!("invalid problem: {e}");
            return ExitCode::FAILURE;
        }
    };

    while solver.time() < t {
        if let Err(e) = solver.step() {
            log::error!("solver failed to converge: {e}");
            return ExitCode::FAILURE;
        }
        log::info!("t = {:.6}", solver.time());
    }

    ExitCode::SUCCESS
}

fn cmd_export(spec: MeshSpec, output: PathBuf, t: f64, tau: f64, tol_rel: f64) -> ExitCode {
    let problem = match build_problem(spec, tau) {
        Ok(problem) => problem,
        Err(e) => {
            log::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    let mesh = problem.mesh().clone();

    let mut solver = match Lmhfe::new(problem, tol_rel) {
        Ok(solver) => solver,
        Err(e) => {
            log::error!("invalid problem: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut layers = Layers::new();
    let mut step_idx = 0usize;
    while solver.time() < t {
        if let Err(e) = solver.step() {
            log::error!("solver failed to converge: {e}");
            return ExitCode::FAILURE;
        }
        log::info!("t = {:.6}", solver.time());
        layers.set_real(format!("step_{step_idx}"), solver.p().to_vec());
        step_idx += 1;
    }

    if let Err(e) = export::write_pyvista_script(&mesh, &layers, &output) {
        log::error!("{e:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn cmd_sensitivity(spec: MeshSpec, t: f64, tau: f64, tol_rel: f64, h: f64) -> ExitCode {
    let problem = match build_problem(spec, tau) {
        Ok(problem) => problem,
        Err(e) => {
            log::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let ncells = problem.mesh().ncells();
    let g_wrt_p: lmhfe_solver::sensitivity::fwd_diff::GWrtP = Box::new(move |_p, out| {
        let weight = 1.0 / ncells as f64;
        for v in out.iter_mut() {
            *v = weight;
        }
    });
    let g_wrt_a: lmhfe_solver::sensitivity::fwd_diff::GWrtA = Box::new(|out| {
        for v in out.iter_mut() {
            *v = 0.0;
        }
    });

    let mut fwd = match FwdDiff::new(problem.clone(), tol_rel, g_wrt_p, g_wrt_a) {
        Ok(solver) => solver,
        Err(e) => {
            log::error!("invalid problem: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut fin = match FinDiff::new(problem, tol_rel, h) {
        Ok(solver) => solver,
        Err(e) => {
            log::error!("invalid problem: {e}");
            return ExitCode::FAILURE;
        }
    };

    while fwd.time() < t {
        if let Err(e) = fwd.step() {
            log::error!("forward-mode solver failed to converge: {e}");
            return ExitCode::FAILURE;
        }
        log::info!("fwd_diff t = {:.6}, ds = {:.6e}", fwd.time(), fwd.get_sensitivity());
    }
    while fin.time() < t {
        if let Err(e) = fin.step() {
            log::error!("finite-difference solver failed to converge: {e}");
            return ExitCode::FAILURE;
        }
        log::info!("fin_diff t = {:.6}", fin.time());
    }

    let mean = |p: &[f64]| p.iter().sum::<f64>() / p.len() as f64;
    println!("fwd_diff sensitivity: {:.6e}", fwd.get_sensitivity());
    println!("fin_diff sensitivity: {:.6e}", fin.get_sensitivity(mean));

    ExitCode::SUCCESS
}
