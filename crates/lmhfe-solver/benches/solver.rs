//! Benchmarks for the GMRES solver and a full LMHFE time step.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lmhfe_core::matrix::DenseMatrix;
use lmhfe_core::Problem;
use lmhfe_core::mesh::Mesh;
use lmhfe_solver::{GmresOptions, Lmhfe, solve_gmres};

fn bench_gmres(c: &mut Criterion) {
    let mut group = c.benchmark_group("gmres");

    for size in [10, 50, 100, 300] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bencher, &size| {
            let data = (0..size * size)
                .map(|idx| {
                    let (i, j) = (idx / size, idx % size);
                    if i == j {
                        (size as f64) + 1.0
                    } else {
                        1.0 / ((i as f64 - j as f64).abs() + 1.0)
                    }
                })
                .collect();
            let a = DenseMatrix::from_row_major(size, size, data);
            let rhs: Vec<f64> = (0..size).map(|i| (i + 1) as f64).collect();
            let options = GmresOptions::default();

            bencher.iter(|| solve_gmres(black_box(&a), black_box(&rhs), None, black_box(&options)));
        });
    }

    group.finish();
}

fn bench_lmhfe_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("lmhfe_step");

    for &(nx, ny) in &[(10usize, 5usize), (20, 10), (40, 20)] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{nx}x{ny}")), &(nx, ny), |bencher, &(nx, ny)| {
            bencher.iter_batched(
                || build_problem(nx, ny),
                |problem| {
                    let mut solver = Lmhfe::new(problem, 1e-6).unwrap();
                    solver.step().unwrap();
                    black_box(solver.time());
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn build_problem(nx: usize, ny: usize) -> Problem {
    let mesh = Mesh::gen_rect(nx, ny, 20.0, 10.0).unwrap().direct();
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

    Problem::new(mesh, a, c, dirichlet, dirichlet_mask, neumann, neumann_mask, 0.1).unwrap()
}

criterion_group!(benches, bench_gmres, bench_lmhfe_step);
criterion_main!(benches);
