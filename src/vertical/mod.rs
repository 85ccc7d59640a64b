//! Implicit vertical mixing on the W grid.
//!
//! Columns are integrated with the batched tridiagonal solver in
//! [`tridiagonal`]. The closures built on it are the turbulent kinetic energy
//! model ([`tke`]) and the internal-wave energy model ([`idemix`]).
//!
//! W-point quantities live at the top of each tracer box. The control volume
//! of level `k` is `dzw[k]`, except at the surface where only the lower half
//! box `0.5 * dzw[nz-1]` is in the water. With these weights the implicit
//! vertical diffusion conserves the column integral.

pub mod idemix;
pub mod tke;
pub mod tridiagonal;

pub use idemix::{IdemixForcing, IdemixParameters, IdemixStep, gofx2, hofx1};
pub use tke::{TkeClosure, TkeDiffusivities, TkeForcing, TkeStep, constant_diffusivities};
pub use tridiagonal::{
    ImplicitSolution, TridiagonalSystem, first_wet_levels, solve_implicit, thomas,
};

use ndarray::{Array3, Axis};

use crate::config::EastFluxEdge;
use crate::grid::{Field3D, Grid, HALO, Topography};

/// Thickness of the W control volume at level `k`.
#[inline]
pub fn w_box(grid: &Grid, k: usize) -> f64 {
    if k + 1 == grid.nz {
        0.5 * grid.dzw[k]
    } else {
        grid.dzw[k]
    }
}

/// Column integral `Σ w_box(k) x[i, j, k]` over wet W levels.
pub fn column_integral(grid: &Grid, topo: &Topography, x: &Field3D, i: usize, j: usize) -> f64 {
    (0..grid.nz)
        .filter(|&k| topo.mask_w[[i, j, k]])
        .map(|k| w_box(grid, k) * x[[i, j, k]])
        .sum()
}

/// Add `dt * div(F)` of a lateral flux to the interior of `target`.
///
/// `east(i, j, k)` is the flux difference across the face between columns
/// `i` and `i + 1`, `north(i, j, k)` across the face between rows `j` and
/// `j + 1`; both are divided by the face distance and masked here.
pub(crate) fn add_lateral_diffusion<E, N>(
    grid: &Grid,
    topo: &Topography,
    edge: EastFluxEdge,
    target: &mut Field3D,
    dt: f64,
    east: E,
    north: N,
) where
    E: Fn(usize, usize, usize) -> f64,
    N: Fn(usize, usize, usize) -> f64,
{
    let (nxt, nyt, nz) = grid.shape_3d();
    let mut flux_east = Array3::from_shape_fn((nxt, nyt, nz), |(i, j, k)| {
        if i + 1 < nxt && topo.mask_u[[i, j, k]] {
            east(i, j, k) / (grid.cost[j] * grid.dxu[i])
        } else {
            0.0
        }
    });
    if let Some(face) = edge.zeroed_face(nxt) {
        flux_east.index_axis_mut(Axis(0), face).fill(0.0);
    }
    let flux_north = Array3::from_shape_fn((nxt, nyt, nz), |(i, j, k)| {
        if j + 1 < nyt && topo.mask_v[[i, j, k]] {
            north(i, j, k) / grid.dyu[j] * grid.cosu[j]
        } else {
            0.0
        }
    });

    for i in grid.interior_x() {
        for j in grid.interior_y() {
            let cost = grid.cost[j];
            for k in 0..nz {
                if !topo.mask_w[[i, j, k]] {
                    continue;
                }
                target[[i, j, k]] += dt
                    * ((flux_east[[i, j, k]] - flux_east[[i - 1, j, k]]) / (cost * grid.dxt[i])
                        + (flux_north[[i, j, k]] - flux_north[[i, j - 1, k]])
                            / (cost * grid.dyt[j]));
            }
        }
    }
}

/// Interior `(nx, ny)` window of the first wet levels.
pub(crate) fn interior_first_wet_levels(grid: &Grid, topo: &Topography) -> ndarray::Array2<usize> {
    first_wet_levels(topo)
        .slice(ndarray::s![HALO..grid.nx + HALO, HALO..grid.ny + HALO])
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_surface_box_is_half() {
        let grid = Grid::uniform(&GridConfig::new(2, 2, 3), 1.0, 1.0, 10.0).unwrap();
        assert!((w_box(&grid, 0) - grid.dzw[0]).abs() < TOL);
        assert!((w_box(&grid, 2) - 0.5 * grid.dzw[2]).abs() < TOL);
    }

    #[test]
    fn test_uniform_field_has_no_lateral_tendency() {
        let grid = Grid::uniform(&GridConfig::new(6, 5, 2), 1.0e3, 1.0e3, 10.0).unwrap();
        let topo = Topography::flat_bottom(&grid).unwrap();
        let field = grid.zeros_3d() + 3.0;
        let mut target = field.clone();
        add_lateral_diffusion(
            &grid,
            &topo,
            EastFluxEdge::Outermost,
            &mut target,
            100.0,
            |i, j, k| field[[i + 1, j, k]] - field[[i, j, k]],
            |i, j, k| field[[i, j + 1, k]] - field[[i, j, k]],
        );
        assert!(target.iter().all(|&v| (v - 3.0).abs() < TOL));
    }

    #[test]
    fn test_outermost_edge_conserves_lateral_integral() {
        let grid = Grid::uniform(&GridConfig::new(6, 5, 1), 1.0e3, 1.0e3, 10.0).unwrap();
        let topo = Topography::flat_bottom(&grid).unwrap();
        let field = Array3::from_shape_fn(grid.shape_3d(), |(i, j, _)| (i * i + 2 * j) as f64);
        let mut target = field.clone();
        add_lateral_diffusion(
            &grid,
            &topo,
            EastFluxEdge::Outermost,
            &mut target,
            10.0,
            |i, j, k| field[[i + 1, j, k]] - field[[i, j, k]],
            |i, j, k| field[[i, j + 1, k]] - field[[i, j, k]],
        );
        let before: f64 = field.slice(ndarray::s![HALO..8, HALO..7, ..]).sum();
        let after: f64 = target.slice(ndarray::s![HALO..8, HALO..7, ..]).sum();
        assert!((before - after).abs() < 1e-9);
        assert!(target != field);
    }
}
