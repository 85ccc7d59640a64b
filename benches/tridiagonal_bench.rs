//! Benchmarks for the batched column solver and the mixing closures.
//!
//! Run with: `cargo bench --bench tridiagonal_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array2, Array3};
use sverdrup::{
    Grid, GridConfig, TkeClosure, TkeConfig, TkeForcing, Topography, TridiagonalSystem,
    solve_implicit,
};

/// Diffusion-like batch with every column starting at level `ks`.
fn setup_system(n: usize, nz: usize) -> (TridiagonalSystem, Array2<usize>) {
    let shape = (n, n, nz);
    let mut sys = TridiagonalSystem::zeros(shape);
    sys.a.fill(-0.4);
    sys.b.fill(1.8);
    sys.c.fill(-0.4);
    sys.d = Array3::from_shape_fn(shape, |(i, j, k)| ((i + 2 * j + 3 * k) % 11) as f64);
    let ks = Array2::from_shape_fn((n, n), |(i, j)| (i + j) % (nz / 2));
    (sys, ks)
}

fn bench_solve_implicit(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_implicit");

    for (n, nz) in [(32, 20), (64, 40), (128, 60)] {
        let (sys, ks) = setup_system(n, nz);
        group.bench_with_input(
            BenchmarkId::new("columns", format!("{n}x{n}x{nz}")),
            &n,
            |b, _| {
                b.iter(|| solve_implicit(black_box(ks.view()), black_box(&sys)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_tke_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("tke_step");

    for (n, nz) in [(32, 20), (64, 40)] {
        let grid = Grid::uniform(&GridConfig::new(n, n, nz), 2.0e4, 2.0e4, 25.0).unwrap();
        let topo = Topography::flat_bottom(&grid).unwrap();
        let closure = TkeClosure::new(TkeConfig::default().with_tke(true)).unwrap();

        let tke = grid.zeros_3d() + 1e-4;
        let nsqr = grid.zeros_3d() + 1e-5;
        let shear = grid.zeros_3d() + 1e-8;
        let source = grid.zeros_3d();
        let wind = grid.zeros_2d() + 1e-5;

        group.bench_with_input(BenchmarkId::new("closure", format!("{n}x{n}x{nz}")), &n, |b, _| {
            b.iter(|| {
                let diff = closure
                    .diffusivities(&grid, &topo, &tke, &nsqr, &shear, None)
                    .unwrap();
                closure
                    .integrate(
                        &grid,
                        &topo,
                        black_box(&tke),
                        TkeForcing {
                            interior: &source,
                            surface: &wind,
                        },
                        &diff,
                        600.0,
                    )
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solve_implicit, bench_tke_step);
criterion_main!(benches);
