use ndarray::Array2;

use super::{EllipticOperator, StencilBuilder};
use crate::grid::{Field2D, Grid, Topography};

/// Streamfunction operator at Z points.
///
/// Row `(i, j)` is the circulation around Z cell `(i, j)` of the velocity
/// [`barotropic_velocity`] derives from ψ, so that
/// `op.apply(psi) == z_circulation(barotropic_velocity(psi))` on every
/// solvable point.
pub fn streamfunction_operator(grid: &Grid, topo: &Topography) -> EllipticOperator {
    let (nxt, nyt) = grid.shape_2d();
    let mut builder = StencilBuilder::new(grid);
    for i in 1..nxt - 1 {
        for j in 1..nyt - 1 {
            let east = topo.hvr[[i + 1, j]] * grid.dyu[j] / (grid.cosu[j] * grid.dxt[i + 1]);
            let west = topo.hvr[[i, j]] * grid.dyu[j] / (grid.cosu[j] * grid.dxt[i]);
            let north = topo.hur[[i, j + 1]] * grid.cost[j + 1] * grid.dxu[i] / grid.dyt[j + 1];
            let south = topo.hur[[i, j]] * grid.cost[j] * grid.dxu[i] / grid.dyt[j];
            for (di, dj, w) in [(1, 0, east), (-1, 0, west), (0, 1, north), (0, -1, south)] {
                if w != 0.0 {
                    builder.couple(i, j, di, dj, w);
                }
            }
        }
    }
    builder.build(grid)
}

/// Depth-averaged velocity of a streamfunction.
///
/// `u = -∂ψ/∂y / h` at U points and `v = ∂ψ/∂x / (h cos φ)` at V points.
/// Dry faces, where `hur`/`hvr` vanish, get zero velocity.
pub fn barotropic_velocity(grid: &Grid, topo: &Topography, psi: &Field2D) -> (Field2D, Field2D) {
    let (nxt, nyt) = grid.shape_2d();
    let u = Array2::from_shape_fn((nxt, nyt), |(i, j)| {
        if j == 0 {
            return 0.0;
        }
        -(psi[[i, j]] - psi[[i, j - 1]]) / grid.dyt[j] * topo.hur[[i, j]]
    });
    let v = Array2::from_shape_fn((nxt, nyt), |(i, j)| {
        if i == 0 {
            return 0.0;
        }
        (psi[[i, j]] - psi[[i - 1, j]]) / (grid.cosu[j] * grid.dxt[i]) * topo.hvr[[i, j]]
    });
    (u, v)
}

/// Counter-clockwise circulation of `(u, v)` around each Z cell.
///
/// The Z cell `(i, j)` has corners at the T points `(i, j)` to `(i+1, j+1)`;
/// the last row and column are left at zero.
pub fn z_circulation(grid: &Grid, u: &Field2D, v: &Field2D) -> Field2D {
    let (nxt, nyt) = grid.shape_2d();
    Array2::from_shape_fn((nxt, nyt), |(i, j)| {
        if i + 1 >= nxt || j + 1 >= nyt {
            return 0.0;
        }
        (v[[i + 1, j]] - v[[i, j]]) * grid.dyu[j]
            - (grid.cost[j + 1] * u[[i, j + 1]] - grid.cost[j] * u[[i, j]]) * grid.dxu[i]
    })
}
