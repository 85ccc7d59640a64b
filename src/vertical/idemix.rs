//! Internal-wave energy (IDEMIX).
//!
//! The wave field propagates vertically with group velocity `c0` and
//! horizontally with `v0`, and dissipates at rate `alpha_c * E`.

use std::f64::consts::{FRAC_2_PI, PI};

use log::trace;
use ndarray::{Array3, Zip, s};

use super::tridiagonal::{TridiagonalSystem, solve_implicit};
use super::{add_lateral_diffusion, interior_first_wet_levels, w_box};
use crate::boundary::exchange_for;
use crate::config::{ConfigError, IdemixConfig};
use crate::grid::{Field2D, Field3D, Grid, HALO, Topography};

/// Lower bound of `N / |f|` used by the group velocity shape functions.
const MIN_FREQUENCY_RATIO: f64 = 3.0;

/// Vertical group velocity shape function.
///
/// Arguments below 3 are raised to 3.
pub fn gofx2(x: f64) -> f64 {
    let x = x.max(MIN_FREQUENCY_RATIO);
    let c = 1.0 - FRAC_2_PI * (1.0 / x).asin();
    FRAC_2_PI / c * 0.9 * x.powf(-2.0 / 3.0) * (1.0 - (-x / 4.3).exp())
}

/// Horizontal group velocity shape function.
pub fn hofx1(x: f64) -> f64 {
    FRAC_2_PI / (1.0 - FRAC_2_PI * (1.0 / x).asin()) * (x - 1.0) / (x + 1.0)
}

/// Propagation and dissipation coefficients at W points.
#[derive(Debug, Clone)]
pub struct IdemixParameters {
    /// Vertical group velocity.
    pub c0: Field3D,
    /// Horizontal group velocity.
    pub v0: Field3D,
    /// Dissipation coefficient.
    pub alpha_c: Field3D,
}

/// Wave energy sources for one step.
#[derive(Debug, Clone, Copy)]
pub struct IdemixForcing<'a> {
    pub interior: &'a Field3D,
    /// Flux into the deepest wet box of each column.
    pub bottom: &'a Field2D,
    /// Flux into the surface box.
    pub surface: &'a Field2D,
}

#[derive(Debug, Clone)]
pub struct IdemixStep {
    pub energy: Field3D,
    pub dissipation: Field3D,
}

/// Group velocities and dissipation coefficient from stratification.
///
/// The frequency ratio `N / |f|` is raised to at least 3 before any of the
/// three coefficients is computed, so `v0` and `alpha_c` see the raised
/// value as well.
pub fn set_parameters(
    grid: &Grid,
    topo: &Topography,
    config: &IdemixConfig,
    nsqr: &Field3D,
    coriolis: &Field2D,
) -> Result<IdemixParameters, ConfigError> {
    let (nxt, nyt, nz) = grid.shape_3d();
    ConfigError::check_shape("nsqr", &[nxt, nyt, nz], nsqr.shape())?;
    ConfigError::check_shape("coriolis", &[nxt, nyt], coriolis.shape())?;
    let top = nz - 1;

    let mut bn0 = grid.zeros_2d();
    Zip::indexed(&mut bn0).for_each(|(i, j), b| {
        *b = (0..nz)
            .filter(|&k| topo.mask_w[[i, j, k]])
            .map(|k| nsqr[[i, j, k]].max(0.0).sqrt() * w_box(grid, k))
            .sum();
    });
    trace!(
        "IDEMIX column stratification max = {}",
        bn0.fold(0.0_f64, |m, &b| m.max(b))
    );

    let shape = (nxt, nyt, nz);
    let mut c0 = Array3::zeros(shape);
    let mut v0 = Array3::zeros(shape);
    let mut alpha_c = Array3::zeros(shape);
    for i in 0..nxt {
        for j in 0..nyt {
            let f = coriolis[[i, j]].abs();
            let cstar = (bn0[[i, j]] / (PI * config.jstar)).max(1e-2);
            for k in 0..=top {
                if !topo.mask_w[[i, j, k]] {
                    continue;
                }
                let fxa = (nsqr[[i, j, k]].max(0.0).sqrt() / (1e-22 + f)).max(MIN_FREQUENCY_RATIO);
                c0[[i, j, k]] = (config.gamma * cstar * gofx2(fxa)).max(0.0);
                v0[[i, j, k]] = (config.gamma * cstar * hofx1(fxa)).max(0.0);
                alpha_c[[i, j, k]] =
                    (config.mu0 * fxa.max(1.0).acosh() * f / (cstar * cstar)).max(1e-4);
            }
        }
    }

    Ok(IdemixParameters { c0, v0, alpha_c })
}

/// Advance the internal-wave energy `e_iw` by `dt`.
///
/// Halos of the new energy are refreshed for periodic grids.
pub fn integrate(
    grid: &Grid,
    topo: &Topography,
    config: &IdemixConfig,
    e_iw: &Field3D,
    params: &IdemixParameters,
    forcing: IdemixForcing<'_>,
    dt: f64,
) -> Result<IdemixStep, ConfigError> {
    let (nx, ny, nz) = (grid.nx, grid.ny, grid.nz);
    let (nxt, nyt, _) = grid.shape_3d();
    let shape = [nxt, nyt, nz];
    ConfigError::check_shape("e_iw", &shape, e_iw.shape())?;
    ConfigError::check_shape("c0", &shape, params.c0.shape())?;
    ConfigError::check_shape("alpha_c", &shape, params.alpha_c.shape())?;
    ConfigError::check_shape("iw forcing", &shape, forcing.interior.shape())?;
    ConfigError::check_shape("iw bottom forcing", &[nxt, nyt], forcing.bottom.shape())?;
    ConfigError::check_shape("iw surface forcing", &[nxt, nyt], forcing.surface.shape())?;

    let top = nz - 1;
    let c0 = &params.c0;
    let mut system = TridiagonalSystem::zeros((nx, ny, nz));
    let mut b_edge = Array3::zeros((nx, ny, nz));
    let mut d_edge = Array3::zeros((nx, ny, nz));
    for ii in 0..nx {
        for jj in 0..ny {
            let (i, j) = (ii + HALO, jj + HALO);
            let delta = |k: usize| {
                if k < top {
                    dt * config.tau_v / grid.dzt[k + 1] * 0.5 * (c0[[i, j, k]] + c0[[i, j, k + 1]])
                } else {
                    0.0
                }
            };
            for k in 0..nz {
                let w = w_box(grid, k);
                let here = delta(k);
                let below = if k > 0 { delta(k - 1) } else { 0.0 };
                let diss = dt * params.alpha_c[[i, j, k]] * e_iw[[i, j, k]].max(0.0);
                let c0_here = c0[[i, j, k]];

                system.a[[ii, jj, k]] = if k > 0 { -below * c0[[i, j, k - 1]] / w } else { 0.0 };
                system.b[[ii, jj, k]] = 1.0 + (here + below) * c0_here / w + diss;
                system.c[[ii, jj, k]] = if k < top { -here * c0[[i, j, k + 1]] / w } else { 0.0 };
                let d = e_iw[[i, j, k]] + dt * forcing.interior[[i, j, k]];
                system.d[[ii, jj, k]] = d;
                b_edge[[ii, jj, k]] = 1.0 + here * c0_here / w + diss;
                // Bottom flux spreads over the full box even at the surface
                d_edge[[ii, jj, k]] = d + dt * forcing.bottom[[i, j]] / grid.dzw[k];
            }
            system.d[[ii, jj, top]] += dt * forcing.surface[[i, j]] / w_box(grid, top);
        }
    }
    let system = system.with_b_edge(b_edge).with_d_edge(d_edge);

    let ks = interior_first_wet_levels(grid, topo);
    let solution = solve_implicit(ks.view(), &system)?;
    let mut energy = e_iw.clone();
    solution.write_into(energy.slice_mut(s![HALO..nx + HALO, HALO..ny + HALO, ..]));

    let dissipation = Zip::from(&params.alpha_c)
        .and(e_iw)
        .and(&energy)
        .map_collect(|&ac, &e_old, &e_new| ac * e_old.max(0.0) * e_new);

    if config.enable_hor_diffusion {
        ConfigError::check_shape("v0", &shape, params.v0.shape())?;
        let v0 = &params.v0;
        let tau_h = config.tau_h;
        add_lateral_diffusion(
            grid,
            topo,
            config.east_flux_edge,
            &mut energy,
            dt,
            |i, j, k| {
                let (va, vb) = (v0[[i, j, k]], v0[[i + 1, j, k]]);
                tau_h * 0.5 * (va + vb) * (vb * e_iw[[i + 1, j, k]] - va * e_iw[[i, j, k]])
            },
            |i, j, k| {
                let (va, vb) = (v0[[i, j, k]], v0[[i, j + 1, k]]);
                tau_h * 0.5 * (va + vb) * (vb * e_iw[[i, j + 1, k]] - va * e_iw[[i, j, k]])
            },
        );
    }

    exchange_for(grid).synchronize_3d(&mut energy);
    Ok(IdemixStep {
        energy,
        dissipation,
    })
}
