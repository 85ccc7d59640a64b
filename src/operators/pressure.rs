use ndarray::Axis;

use super::{EllipticOperator, StencilBuilder};
use crate::config::PhysicsConfig;
use crate::grid::{Grid, Topography};

/// Implicit free-surface term of the pressure equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeSurface {
    pub gravity: f64,
    pub dt: f64,
}

impl FreeSurface {
    /// `Some` when the physics enables a free surface, using the momentum step.
    pub fn from_physics(physics: &PhysicsConfig) -> Option<Self> {
        physics.enable_free_surface.then_some(Self {
            gravity: physics.gravity,
            dt: physics.dt_mom,
        })
    }

    /// Weight `1 / (g dt^2)` of the surface elevation in the pressure equation.
    #[inline]
    pub fn weight(&self) -> f64 {
        1.0 / (self.gravity * self.dt * self.dt)
    }
}

/// Surface-pressure operator at T points, rows multiplied by `area_t`.
///
/// Face couplings are depth-weighted (`hu`, `hv`) and vanish unless both
/// neighbouring columns are wet at the surface. With a free surface the
/// diagonal additionally carries `-area_t / (g dt^2)` on wet columns, which
/// makes the operator definite. Without it the operator is singular with the
/// constant field in its null space.
pub fn surface_pressure_operator(
    grid: &Grid,
    topo: &Topography,
    free_surface: Option<FreeSurface>,
) -> EllipticOperator {
    let (nxt, nyt) = grid.shape_2d();
    let top = grid.nz - 1;
    let wet = topo.mask_t.index_axis(Axis(2), top);
    let both = |i0: usize, j0: usize, i1: usize, j1: usize| wet[[i0, j0]] && wet[[i1, j1]];

    let mut builder = StencilBuilder::new(grid);
    for i in 1..nxt - 1 {
        for j in 1..nyt - 1 {
            if !wet[[i, j]] {
                continue;
            }
            if both(i, j, i + 1, j) {
                let w = topo.hu[[i, j]] * grid.dyt[j] / (grid.dxu[i] * grid.cost[j]);
                builder.couple(i, j, 1, 0, w);
            }
            if both(i, j, i - 1, j) {
                let w = topo.hu[[i - 1, j]] * grid.dyt[j] / (grid.dxu[i - 1] * grid.cost[j]);
                builder.couple(i, j, -1, 0, w);
            }
            if both(i, j, i, j + 1) {
                let w = topo.hv[[i, j]] * grid.cosu[j] * grid.dxt[i] / grid.dyu[j];
                builder.couple(i, j, 0, 1, w);
            }
            if both(i, j, i, j - 1) {
                let w = topo.hv[[i, j - 1]] * grid.cosu[j - 1] * grid.dxt[i] / grid.dyu[j - 1];
                builder.couple(i, j, 0, -1, w);
            }
            if let Some(fs) = free_surface {
                builder.add_diagonal(i, j, -grid.area_t[[i, j]] * fs.weight());
            }
        }
    }
    builder.build(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::grid::HALO;
    use ndarray::Array2;

    const TOL: f64 = 1e-10;

    fn spherical_basin() -> (Grid, Topography) {
        let config = GridConfig::new(6, 5, 3)
            .with_coord_degree(true)
            .with_origin(0.0, 20.0);
        let dxt = vec![2.0; 6];
        let dyt = vec![1.5, 2.0, 2.5, 2.0, 1.0];
        let dzt = vec![50.0, 30.0, 20.0];
        let grid = Grid::new(&config, &dxt, &dyt, &dzt).unwrap();
        let mut kbot = Array2::from_elem((6, 5), 1);
        kbot[[2, 2]] = 0;
        kbot[[4, 1]] = 2;
        kbot[[0, 4]] = 3;
        let topo = Topography::from_interior(&grid, &kbot).unwrap();
        (grid, topo)
    }

    #[test]
    fn test_operator_is_symmetric() {
        let (grid, topo) = spherical_basin();
        let op = surface_pressure_operator(&grid, &topo, None);
        let (nxt, nyt) = grid.shape_2d();
        for i in 1..nxt - 1 {
            for j in 1..nyt - 1 {
                for (di, dj) in [(1isize, 0isize), (0, 1)] {
                    let ni = (i as isize + di) as usize;
                    let nj = (j as isize + dj) as usize;
                    let forward = op.coefficient(i, j, di, dj);
                    let backward = op.coefficient(ni, nj, -di, -dj);
                    assert!((forward - backward).abs() <= TOL * forward.abs().max(1.0));
                }
            }
        }
    }

    #[test]
    fn test_land_rows_are_not_solvable() {
        let (grid, topo) = spherical_basin();
        let op = surface_pressure_operator(&grid, &topo, None);
        assert!(!op.is_solvable(2 + HALO, 2 + HALO));
        assert_eq!(op.coefficient(1 + HALO, 2 + HALO, 1, 0), 0.0);
        assert!(op.is_solvable(1 + HALO, 2 + HALO));
    }

    #[test]
    fn test_free_surface_adds_to_diagonal() {
        let (grid, topo) = spherical_basin();
        let rigid = surface_pressure_operator(&grid, &topo, None);
        let fs = FreeSurface {
            gravity: 9.81,
            dt: 100.0,
        };
        let free = surface_pressure_operator(&grid, &topo, Some(fs));
        let (i, j) = (HALO + 1, HALO + 1);
        let expected = rigid.diagonal(i, j) - grid.area_t[[i, j]] * fs.weight();
        assert!((free.diagonal(i, j) - expected).abs() <= TOL * expected.abs());
    }

    #[test]
    fn test_from_physics() {
        let physics = PhysicsConfig::default().with_free_surface(false);
        assert!(FreeSurface::from_physics(&physics).is_none());
        let physics = physics.with_free_surface(true);
        let fs = FreeSurface::from_physics(&physics).unwrap();
        assert_eq!(fs.dt, physics.dt_mom);
    }
}
