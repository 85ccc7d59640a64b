//! Benchmarks for the barotropic elliptic solves.
//!
//! Run with: `cargo bench --bench elliptic_bench`
//!
//! Covers the operator application, a full surface pressure solve and the
//! island-corrected streamfunction solve.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array2, Array3};
use sverdrup::boundary::Closed;
use sverdrup::solver::{barotropic_transport, pressure_forcing};
use sverdrup::{
    Grid, GridConfig, IslandConfig, ModelConfig, SolverConfig, StreamfunctionSolver,
    SurfacePressureSolver, Topography, surface_pressure_operator,
};

/// Closed basin with a square island in the middle.
fn setup_basin(n: usize) -> (Grid, Topography) {
    let grid = Grid::uniform(&GridConfig::new(n, n, 4), 1.0e4, 1.0e4, 100.0).unwrap();
    let kbot = Array2::from_shape_fn((n, n), |(i, j)| {
        let centre = n / 2;
        if i.abs_diff(centre) < n / 8 && j.abs_diff(centre) < n / 8 {
            0
        } else {
            1 + (i + j) % 2
        }
    });
    let topo = Topography::from_interior(&grid, &kbot).unwrap();
    (grid, topo)
}

fn bench_operator_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_apply");

    for n in [32, 64, 128] {
        let (grid, topo) = setup_basin(n);
        let op = surface_pressure_operator(&grid, &topo, None);
        let x = Array2::from_shape_fn(grid.shape_2d(), |(i, j)| ((i * 3 + j) % 7) as f64);

        group.bench_with_input(BenchmarkId::new("pressure", format!("{n}x{n}")), &n, |b, _| {
            b.iter(|| op.apply(black_box(&x)));
        });
    }

    group.finish();
}

fn bench_pressure_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("pressure_solve");
    group.sample_size(20);

    for n in [32, 64] {
        let (grid, topo) = setup_basin(n);
        let u = Array3::from_shape_fn(grid.shape_3d(), |(i, j, _)| {
            0.1 * (i as f64 * 0.2).sin() * (j as f64 * 0.1).cos()
        });
        let v = grid.zeros_3d();
        let (fpx, fpy) = barotropic_transport(&grid, &topo, &u, &v, 1800.0);
        let forcing = pressure_forcing(&grid, &topo, &fpx, &fpy, None);
        let config = SolverConfig::default()
            .with_tolerance(1e-8)
            .with_max_iterations(10_000);

        group.bench_with_input(BenchmarkId::new("rigid_lid", format!("{n}x{n}")), &n, |b, _| {
            b.iter(|| {
                let mut solver = SurfacePressureSolver::new(config, None).unwrap();
                let mut psi = grid.zeros_2d();
                solver
                    .solve(&grid, &topo, &Closed, black_box(&forcing), &mut psi)
                    .unwrap();
                psi
            });
        });
    }

    group.finish();
}

fn bench_streamfunction_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("streamfunction_solve");
    group.sample_size(20);

    for n in [32, 64] {
        let (grid, topo) = setup_basin(n);
        let solver_config = SolverConfig::default()
            .with_tolerance(1e-8)
            .with_max_iterations(10_000);
        let config = ModelConfig {
            islands: IslandConfig {
                unit_solver: solver_config,
                trace_walk: false,
            },
            ..ModelConfig::default().with_solver(solver_config)
        };
        let solver = StreamfunctionSolver::new(&grid, &topo, &config, &Closed).unwrap();
        let fpx = Array2::from_shape_fn(grid.shape_2d(), |(_, j)| 0.05 * (j as f64 * 0.3).sin());
        let fpy = grid.zeros_2d();

        group.bench_with_input(BenchmarkId::new("islands", format!("{n}x{n}")), &n, |b, _| {
            b.iter(|| {
                let mut psi = grid.zeros_2d();
                solver
                    .solve(&grid, &topo, &Closed, black_box(&fpx), &fpy, &mut psi)
                    .unwrap();
                psi
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_operator_apply,
    bench_pressure_solve,
    bench_streamfunction_solve
);
criterion_main!(benches);
