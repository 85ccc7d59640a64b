//! Surface pressure: forcing, elliptic solve and velocity correction.
//!
//! The hydrostatic momentum step leaves a depth-integrated transport whose
//! divergence does not match the surface boundary condition. The surface
//! pressure `psi` removes that mismatch: with a rigid lid the corrected
//! transport is non-divergent, with a free surface its divergence balances
//! the change of surface elevation.

use log::debug;
use ndarray::{Axis, Zip};

use super::{ConjugateGradient, SolveReport, SolverError};
use crate::boundary::{BoundaryExchange, set_cyclic_x};
use crate::config::{ConfigError, ModelConfig, SolverConfig};
use crate::grid::{Field2D, Field3D, Grid, Mask3D, Topography};
use crate::operators::{EllipticOperator, FreeSurface, surface_pressure_operator};

/// Lazily built surface-pressure operator plus solver settings.
#[derive(Debug, Clone)]
pub struct SurfacePressureSolver {
    operator: Option<EllipticOperator>,
    config: SolverConfig,
    free_surface: Option<FreeSurface>,
}

impl SurfacePressureSolver {
    pub fn new(
        config: SolverConfig,
        free_surface: Option<FreeSurface>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            operator: None,
            config,
            free_surface,
        })
    }

    /// Solver settings and free-surface switch taken from a model configuration.
    pub fn from_model(config: &ModelConfig) -> Result<Self, ConfigError> {
        Self::new(config.solver, FreeSurface::from_physics(&config.physics))
    }

    /// Build the operator for `topo`, replacing any earlier one.
    pub fn initialize(&mut self, grid: &Grid, topo: &Topography) -> &EllipticOperator {
        debug!(
            "building surface pressure operator (free surface: {})",
            self.free_surface.is_some()
        );
        self.operator
            .insert(surface_pressure_operator(grid, topo, self.free_surface))
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.operator.is_some()
    }

    /// Drop the operator; the next solve rebuilds it.
    pub fn invalidate(&mut self) {
        self.operator = None;
    }

    pub fn operator(&self) -> Option<&EllipticOperator> {
        self.operator.as_ref()
    }

    #[inline]
    pub fn free_surface(&self) -> Option<FreeSurface> {
        self.free_surface
    }

    /// Solve for `psi` given the per-area `forcing` from [`pressure_forcing`].
    ///
    /// `psi` holds the first guess on entry. Its halo is synchronised on
    /// success.
    pub fn solve(
        &mut self,
        grid: &Grid,
        topo: &Topography,
        exchange: &dyn BoundaryExchange,
        forcing: &Field2D,
        psi: &mut Field2D,
    ) -> Result<SolveReport, SolverError> {
        let config = self.config;
        let free_surface = self.free_surface;
        let operator = &*self.operator.get_or_insert_with(|| {
            debug!("building surface pressure operator on first solve");
            surface_pressure_operator(grid, topo, free_surface)
        });

        let mut rhs = forcing * &grid.area_t;
        rhs *= &topo.surface_mask_t();

        exchange.synchronize(psi);
        let report = ConjugateGradient::new(operator, config, exchange).solve(&rhs, psi)?;
        exchange.synchronize(psi);
        Ok(report)
    }
}

/// Depth-integrated transport divided by `dt` at U and V points.
pub fn barotropic_transport(
    grid: &Grid,
    topo: &Topography,
    u: &Field3D,
    v: &Field3D,
    dt: f64,
) -> (Field2D, Field2D) {
    let integrate = |vel: &Field3D, mask: &Mask3D| {
        let mut out = grid.zeros_2d();
        for (k, &dz) in grid.dzt.iter().enumerate() {
            Zip::from(&mut out)
                .and(vel.index_axis(Axis(2), k))
                .and(mask.index_axis(Axis(2), k))
                .for_each(|o, &x, &wet| {
                    if wet {
                        *o += x * dz / dt;
                    }
                });
        }
        if grid.enable_cyclic_x {
            set_cyclic_x(&mut out, grid.nx);
        }
        out
    };
    (integrate(u, &topo.mask_u), integrate(v, &topo.mask_v))
}

/// Per-area right-hand side of the surface pressure equation.
///
/// The divergence of `(fpx, fpy)` on wet interior columns. With a free
/// surface, `psi_tau / (g dt^2)` is subtracted.
pub fn pressure_forcing(
    grid: &Grid,
    topo: &Topography,
    fpx: &Field2D,
    fpy: &Field2D,
    free_surface_psi: Option<(&Field2D, FreeSurface)>,
) -> Field2D {
    let top = grid.nz - 1;
    let mut forc = grid.zeros_2d();
    for i in grid.interior_x() {
        for j in grid.interior_y() {
            if !topo.mask_t[[i, j, top]] {
                continue;
            }
            let cost = grid.cost[j];
            let mut f = (fpx[[i, j]] - fpx[[i - 1, j]]) / (cost * grid.dxt[i])
                + (grid.cosu[j] * fpy[[i, j]] - grid.cosu[j - 1] * fpy[[i, j - 1]])
                    / (cost * grid.dyt[j]);
            if let Some((psi, fs)) = free_surface_psi {
                f -= psi[[i, j]] * fs.weight();
            }
            forc[[i, j]] = f;
        }
    }
    forc
}

/// Subtract `dt * grad(psi)` from the wet levels of `u` and `v`.
pub fn remove_pressure_gradient(
    grid: &Grid,
    topo: &Topography,
    psi: &Field2D,
    u: &mut Field3D,
    v: &mut Field3D,
    dt: f64,
) {
    let (nxt, nyt, nz) = grid.shape_3d();
    for i in 0..nxt - 1 {
        for j in 0..nyt {
            let dpdx = (psi[[i + 1, j]] - psi[[i, j]]) / (grid.dxu[i] * grid.cost[j]);
            for k in 0..nz {
                if topo.mask_u[[i, j, k]] {
                    u[[i, j, k]] -= dt * dpdx;
                }
            }
        }
    }
    for i in 0..nxt {
        for j in 0..nyt - 1 {
            let dpdy = (psi[[i, j + 1]] - psi[[i, j]]) / grid.dyu[j];
            for k in 0..nz {
                if topo.mask_v[[i, j, k]] {
                    v[[i, j, k]] -= dt * dpdy;
                }
            }
        }
    }
}

/// Linear extrapolation in time, `2 psi(tau) - psi(tau-1)`.
pub fn extrapolate_guess(psi_tau: &Field2D, psi_taum1: &Field2D) -> Field2D {
    psi_tau * 2.0 - psi_taum1
}
