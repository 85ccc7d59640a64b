//! Turbulent kinetic energy closure.
//!
//! [`TkeClosure::diffusivities`] turns the current TKE, stratification and
//! shear production into a mixing length, viscosity `kappa_m`, diffusivity
//! `kappa_h` and Prandtl number. [`TkeClosure::integrate`] advances TKE one
//! step: implicit vertical diffusion with dissipation, a surface flux
//! correction that keeps the top level non-negative, and optional explicit
//! lateral diffusion.

use std::f64::consts::SQRT_2;

use log::{debug, trace};
use ndarray::{Array3, Axis, Zip, s};

use super::tridiagonal::{TridiagonalSystem, solve_implicit};
use super::{add_lateral_diffusion, interior_first_wet_levels, w_box};
use crate::boundary::{exchange_for, set_cyclic_x};
use crate::config::{ConfigError, MixingLength, TkeConfig};
use crate::grid::{Field2D, Field3D, Grid, HALO, Topography};

/// Floor for squared buoyancy frequency, viscosity and wave energy terms.
const EPS: f64 = 1e-12;

/// Mixing coefficients on the W grid.
#[derive(Debug, Clone)]
pub struct TkeDiffusivities {
    pub sqrttke: Field3D,
    pub mxl: Field3D,
    pub kappa_m: Field3D,
    pub kappa_h: Field3D,
    pub prandtl: Field3D,
}

/// Sources of TKE for one step.
#[derive(Debug, Clone, Copy)]
pub struct TkeForcing<'a> {
    /// Volume source at W points (m^2/s^3).
    pub interior: &'a Field3D,
    /// Surface flux into the top box (m^3/s^3).
    pub surface: &'a Field2D,
}

/// Result of [`TkeClosure::integrate`].
#[derive(Debug, Clone)]
pub struct TkeStep {
    pub tke: Field3D,
    pub dissipation: Field3D,
    /// Flux added at the surface to undo negative top-level TKE.
    pub surface_correction: Field2D,
}

/// Diffusivities used when TKE is switched off.
///
/// In a hydrostatic model `kappa_h` is set to 1 m^2/s wherever `N^2 < 0`
/// (convective adjustment).
pub fn constant_diffusivities(config: &TkeConfig, nsqr: &Field3D) -> TkeDiffusivities {
    let shape = nsqr.raw_dim();
    let convective = config.enable_hydrostatic;
    TkeDiffusivities {
        sqrttke: Array3::zeros(shape),
        mxl: Array3::zeros(shape),
        kappa_m: Array3::from_elem(shape, config.kappa_m_0),
        kappa_h: nsqr.mapv(|n2| {
            if convective && n2 < 0.0 {
                1.0
            } else {
                config.kappa_h_0
            }
        }),
        prandtl: Array3::ones(shape),
    }
}

/// TKE closure with validated settings.
#[derive(Debug, Clone)]
pub struct TkeClosure {
    config: TkeConfig,
    mixing_length: MixingLength,
}

impl TkeClosure {
    pub fn new(config: TkeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mixing_length = config.mixing_length()?;
        Ok(Self {
            config,
            mixing_length,
        })
    }

    #[inline]
    pub fn config(&self) -> &TkeConfig {
        &self.config
    }

    #[inline]
    pub fn mixing_length(&self) -> MixingLength {
        self.mixing_length
    }

    /// Viscosity and diffusivity from TKE.
    ///
    /// `k_diss_v` is the shear production used for the Richardson number.
    /// With `idemix = Some((alpha_c, e_iw))` the Richardson number is also
    /// bounded by the internal-wave dissipation.
    pub fn diffusivities(
        &self,
        grid: &Grid,
        topo: &Topography,
        tke: &Field3D,
        nsqr: &Field3D,
        k_diss_v: &Field3D,
        idemix: Option<(&Field3D, &Field3D)>,
    ) -> Result<TkeDiffusivities, ConfigError> {
        let shape = grid.shape_3d();
        let shape = [shape.0, shape.1, shape.2];
        ConfigError::check_shape("tke", &shape, tke.shape())?;
        ConfigError::check_shape("nsqr", &shape, nsqr.shape())?;
        ConfigError::check_shape("k_diss_v", &shape, k_diss_v.shape())?;

        let cfg = &self.config;
        if !cfg.enable_tke {
            return Ok(constant_diffusivities(cfg, nsqr));
        }

        let sqrttke = tke.mapv(|e| e.max(0.0).sqrt());
        let mut mxl = Zip::from(&sqrttke)
            .and(nsqr)
            .and(&topo.mask_w)
            .map_collect(|&s, &n2, &wet| {
                if wet {
                    SQRT_2 * s / n2.max(EPS).sqrt()
                } else {
                    0.0
                }
            });
        self.limit_mixing_length(grid, topo, &mut mxl);

        let mut k_diss = k_diss_v.clone();
        if grid.enable_cyclic_x {
            set_cyclic_x(&mut k_diss, grid.nx);
        }

        let mut kappa_m = Zip::from(&mxl)
            .and(&sqrttke)
            .map_collect(|&l, &s| cfg.kappa_m_max.min(cfg.c_k * l * s));

        let mut ri = Zip::from(nsqr)
            .and(&k_diss)
            .and(&kappa_m)
            .map_collect(|&n2, &kd, &km| n2 / (kd / km.max(EPS)).max(EPS));
        if let Some((alpha_c, e_iw)) = idemix {
            ConfigError::check_shape("alpha_c", &shape, alpha_c.shape())?;
            ConfigError::check_shape("e_iw", &shape, e_iw.shape())?;
            Zip::from(&mut ri)
                .and(&kappa_m)
                .and(nsqr)
                .and(alpha_c)
                .and(e_iw)
                .for_each(|r, &km, &n2, &ac, &e| {
                    *r = r.min(km * n2 / (ac * e * e).max(EPS));
                });
        }

        let prandtl = ri.mapv(|r| (6.6 * r).clamp(1.0, 10.0));
        let kappa_h = &kappa_m / &prandtl;
        kappa_m.mapv_inplace(|km| km.max(cfg.kappa_m_min));

        Ok(TkeDiffusivities {
            sqrttke,
            mxl,
            kappa_m,
            kappa_h,
            prandtl,
        })
    }

    fn limit_mixing_length(&self, grid: &Grid, topo: &Topography, mxl: &mut Field3D) {
        let nz = grid.nz;
        let mxl_min = self.config.mxl_min;
        match self.mixing_length {
            MixingLength::BoundaryDistance => {
                Zip::indexed(&mut *mxl).for_each(|(i, j, k), l| {
                    let to_surface = -grid.zw[k] + 0.5 * grid.dzw[k];
                    let to_bottom = topo.ht[[i, j]] + grid.zw[k];
                    *l = l.min(to_surface).min(to_bottom).max(mxl_min);
                });
            }
            MixingLength::Blanke => {
                let top = nz - 1;
                for mut col in mxl.lanes_mut(Axis(2)) {
                    for k in (0..top).rev() {
                        col[k] = col[k].min(col[k + 1] + grid.dzt[k + 1]);
                    }
                    col[top] = col[top].min(mxl_min + grid.dzt[top]);
                    for k in 1..nz {
                        col[k] = col[k].min(col[k - 1] + grid.dzt[k]);
                    }
                }
                mxl.mapv_inplace(|l| l.max(mxl_min));
            }
        }
    }

    /// Advance TKE by `dt`.
    ///
    /// Only wet levels change. Columns are solved from their first wet level
    /// to the surface; on periodic grids the halo then follows the interior.
    pub fn integrate(
        &self,
        grid: &Grid,
        topo: &Topography,
        tke: &Field3D,
        forcing: TkeForcing<'_>,
        diff: &TkeDiffusivities,
        dt: f64,
    ) -> Result<TkeStep, ConfigError> {
        let (nx, ny, nz) = (grid.nx, grid.ny, grid.nz);
        let (nxt, nyt, _) = grid.shape_3d();
        let shape = [nxt, nyt, nz];
        ConfigError::check_shape("tke", &shape, tke.shape())?;
        ConfigError::check_shape("tke forcing", &shape, forcing.interior.shape())?;
        ConfigError::check_shape("tke surface forcing", &[nxt, nyt], forcing.surface.shape())?;
        ConfigError::check_shape("kappa_m", &shape, diff.kappa_m.shape())?;

        let cfg = &self.config;
        let top = nz - 1;
        let dissipation_rate = |i: usize, j: usize, k: usize| {
            let l = diff.mxl[[i, j, k]];
            if l > 0.0 {
                cfg.c_eps * diff.sqrttke[[i, j, k]] / l
            } else {
                0.0
            }
        };

        let mut system = TridiagonalSystem::zeros((nx, ny, nz));
        let mut b_edge = Array3::zeros((nx, ny, nz));
        for ii in 0..nx {
            for jj in 0..ny {
                let (i, j) = (ii + HALO, jj + HALO);
                let delta = |k: usize| {
                    if k < top {
                        dt / grid.dzt[k + 1]
                            * cfg.alpha_tke
                            * 0.5
                            * (diff.kappa_m[[i, j, k]] + diff.kappa_m[[i, j, k + 1]])
                    } else {
                        0.0
                    }
                };
                for k in 0..nz {
                    let w = w_box(grid, k);
                    let here = delta(k);
                    let below = if k > 0 { delta(k - 1) } else { 0.0 };
                    let diss = dt * dissipation_rate(i, j, k);
                    system.a[[ii, jj, k]] = -below / w;
                    system.b[[ii, jj, k]] = 1.0 + (here + below) / w + diss;
                    system.c[[ii, jj, k]] = -here / w;
                    system.d[[ii, jj, k]] = tke[[i, j, k]] + dt * forcing.interior[[i, j, k]];
                    b_edge[[ii, jj, k]] = 1.0 + here / w + diss;
                }
                system.d[[ii, jj, top]] += dt * forcing.surface[[i, j]] / w_box(grid, top);
            }
        }
        let system = system.with_b_edge(b_edge);

        let ks = interior_first_wet_levels(grid, topo);
        let solution = solve_implicit(ks.view(), &system)?;
        let mut tke_new = tke.clone();
        solution.write_into(tke_new.slice_mut(s![HALO..nx + HALO, HALO..ny + HALO, ..]));

        let dissipation = Array3::from_shape_fn(tke_new.raw_dim(), |(i, j, k)| {
            dissipation_rate(i, j, k) * tke_new[[i, j, k]]
        });

        let mut surface_correction = grid.zeros_2d();
        for i in grid.interior_x() {
            for j in grid.interior_y() {
                let e = &mut tke_new[[i, j, top]];
                if *e < 0.0 {
                    surface_correction[[i, j]] = -*e * w_box(grid, top) / dt;
                    *e = 0.0;
                }
            }
        }
        let corrected = surface_correction.iter().filter(|&&c| c > 0.0).count();
        if corrected > 0 {
            debug!("TKE surface correction applied in {corrected} columns");
        }

        if cfg.enable_hor_diffusion {
            trace!("lateral TKE diffusion with K_h = {}", cfg.k_h_tke);
            let k_h = cfg.k_h_tke;
            add_lateral_diffusion(
                grid,
                topo,
                cfg.east_flux_edge,
                &mut tke_new,
                dt,
                |i, j, k| k_h * (tke[[i + 1, j, k]] - tke[[i, j, k]]),
                |i, j, k| k_h * (tke[[i, j + 1, k]] - tke[[i, j, k]]),
            );
        }

        exchange_for(grid).synchronize_3d(&mut tke_new);
        Ok(TkeStep {
            tke: tke_new,
            dissipation,
            surface_correction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EastFluxEdge, GridConfig};
    use crate::vertical::column_integral;
    use ndarray::Array2;

    const TOL: f64 = 1e-10;

    fn basin(nz: usize) -> (Grid, Topography) {
        let grid = Grid::uniform(&GridConfig::new(4, 3, nz), 1.0e4, 1.0e4, 10.0).unwrap();
        let mut kbot = Array2::from_elem((4, 3), 1);
        kbot[[1, 1]] = 3;
        kbot[[2, 2]] = 0;
        let topo = Topography::from_interior(&grid, &kbot).unwrap();
        (grid, topo)
    }

    fn enabled() -> TkeConfig {
        TkeConfig::default().with_tke(true)
    }

    #[test]
    fn test_unsupported_mixing_length() {
        let err = TkeClosure::new(enabled().with_mxl_choice(3)).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedMixingLength(3));
    }

    #[test]
    fn test_constant_diffusivities_with_convection() {
        let (grid, topo) = basin(4);
        let mut cfg = TkeConfig::default();
        cfg.kappa_m_0 = 1e-4;
        cfg.kappa_h_0 = 1e-5;
        let closure = TkeClosure::new(cfg.clone()).unwrap();
        let mut nsqr = grid.zeros_3d() + 1e-5;
        nsqr[[HALO, HALO, 1]] = -1e-6;
        let zeros = grid.zeros_3d();
        let diff = closure
            .diffusivities(&grid, &topo, &zeros, &nsqr, &zeros, None)
            .unwrap();
        assert!((diff.kappa_h[[HALO, HALO, 1]] - 1.0).abs() < TOL);
        assert!((diff.kappa_h[[HALO, HALO, 2]] - 1e-5).abs() < TOL);
        assert!(diff.kappa_m.iter().all(|&k| (k - 1e-4).abs() < TOL));

        let diff = constant_diffusivities(&cfg.with_hydrostatic(false), &nsqr);
        assert!(diff.kappa_h.iter().all(|&k| (k - 1e-5).abs() < TOL));
    }

    #[test]
    fn test_prandtl_number_is_clamped() {
        let (grid, topo) = basin(4);
        let closure = TkeClosure::new(enabled()).unwrap();
        let tke = grid.zeros_3d() + 1e-4;
        let zeros = grid.zeros_3d();

        // No shear production: Ri is huge, Pr saturates at 10
        let nsqr = grid.zeros_3d() + 1e-5;
        let diff = closure
            .diffusivities(&grid, &topo, &tke, &nsqr, &zeros, None)
            .unwrap();
        assert!(diff.prandtl.iter().all(|&p| (p - 10.0).abs() < TOL));

        // Neutral stratification: Ri = 0, Pr = 1
        let diff = closure
            .diffusivities(&grid, &topo, &tke, &zeros, &zeros, None)
            .unwrap();
        assert!(diff.prandtl.iter().all(|&p| (p - 1.0).abs() < TOL));
        let (i, j) = (HALO, HALO);
        assert!((diff.kappa_h[[i, j, 1]] - diff.kappa_m[[i, j, 1]]).abs() < TOL);
        assert!(diff.kappa_m[[i, j, 1]] > 0.0);
    }

    #[test]
    fn test_boundary_distance_limits_mixing_length() {
        let (grid, topo) = basin(3);
        let closure = TkeClosure::new(enabled()).unwrap();
        let tke = grid.zeros_3d() + 1.0;
        let nsqr = grid.zeros_3d() + 1e-8;
        let zeros = grid.zeros_3d();
        let diff = closure
            .diffusivities(&grid, &topo, &tke, &nsqr, &zeros, None)
            .unwrap();
        let (i, j) = (HALO, HALO);
        // Bottom W level is 10 m above the floor, surface level 5 m in the box
        assert!((diff.mxl[[i, j, 0]] - 10.0).abs() < TOL);
        assert!((diff.mxl[[i, j, 1]] - 15.0).abs() < TOL);
        assert!((diff.mxl[[i, j, 2]] - 5.0).abs() < TOL);
        // Land columns keep the minimum length
        let mxl_min = closure.config().mxl_min;
        assert!((diff.mxl[[0, 0, 1]] - mxl_min).abs() < TOL);
    }

    #[test]
    fn test_blanke_limits_vertical_gradient() {
        let (grid, topo) = basin(4);
        let closure = TkeClosure::new(enabled().with_mxl_choice(2)).unwrap();
        let tke = grid.zeros_3d() + 1.0;
        let nsqr = grid.zeros_3d() + 1e-8;
        let zeros = grid.zeros_3d();
        let diff = closure
            .diffusivities(&grid, &topo, &tke, &nsqr, &zeros, None)
            .unwrap();
        let col = diff.mxl.slice(s![HALO, HALO, ..]);
        for k in 1..4 {
            assert!(col[k] - col[k - 1] <= grid.dzt[k] + TOL);
        }
        assert!(col[3] <= closure.config().mxl_min + grid.dzt[3] + TOL);
    }

    #[test]
    fn test_idemix_bounds_richardson_number() {
        let (grid, topo) = basin(4);
        let closure = TkeClosure::new(enabled()).unwrap();
        let tke = grid.zeros_3d() + 1e-4;
        let nsqr = grid.zeros_3d() + 1e-5;
        let zeros = grid.zeros_3d();
        let alpha_c = grid.zeros_3d() + 1.0;
        let e_iw = grid.zeros_3d() + 1.0;
        let with = closure
            .diffusivities(&grid, &topo, &tke, &nsqr, &zeros, Some((&alpha_c, &e_iw)))
            .unwrap();
        let without = closure
            .diffusivities(&grid, &topo, &tke, &nsqr, &zeros, None)
            .unwrap();
        let (i, j) = (HALO + 1, HALO);
        assert!(with.prandtl[[i, j, 1]] < without.prandtl[[i, j, 1]]);
        assert!(with.prandtl[[i, j, 1]] >= 1.0);
    }

    fn mixing(grid: &Grid, kappa: f64) -> TkeDiffusivities {
        TkeDiffusivities {
            sqrttke: grid.zeros_3d(),
            mxl: grid.zeros_3d() + 1.0,
            kappa_m: Array3::from_shape_fn(grid.shape_3d(), |(i, _, k)| {
                kappa * (1.0 + 0.3 * k as f64 + 0.1 * i as f64)
            }),
            kappa_h: grid.zeros_3d(),
            prandtl: grid.zeros_3d() + 1.0,
        }
    }

    #[test]
    fn test_vertical_diffusion_conserves_column_energy() {
        let (grid, topo) = basin(5);
        let closure = TkeClosure::new(enabled().with_c_eps(0.0)).unwrap();
        let tke = Array3::from_shape_fn(grid.shape_3d(), |(i, j, k)| {
            if k % 2 == 0 { 1e-3 * (1 + i + j) as f64 } else { 1e-5 }
        });
        let zeros3 = grid.zeros_3d();
        let zeros2 = grid.zeros_2d();
        let forcing = TkeForcing {
            interior: &zeros3,
            surface: &zeros2,
        };
        let step = closure
            .integrate(&grid, &topo, &tke, forcing, &mixing(&grid, 1e-2), 3600.0)
            .unwrap();

        for i in grid.interior_x() {
            for j in grid.interior_y() {
                let before = column_integral(&grid, &topo, &tke, i, j);
                let after = column_integral(&grid, &topo, &step.tke, i, j);
                assert!((before - after).abs() < TOL, "column ({i}, {j})");
            }
        }
        // Mixing smooths the column
        let (i, j) = (HALO, HALO);
        assert!(step.tke[[i, j, 1]] > tke[[i, j, 1]]);
        // Dry levels are left alone
        assert_eq!(step.tke[[HALO + 1, HALO + 1, 0]], tke[[HALO + 1, HALO + 1, 0]]);
        assert!(step.surface_correction.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_surface_correction_keeps_top_non_negative() {
        let (grid, topo) = basin(3);
        let closure = TkeClosure::new(enabled()).unwrap();
        let tke = grid.zeros_3d() + 1e-6;
        let zeros3 = grid.zeros_3d();
        let surface = grid.zeros_2d() - 1.0;
        let forcing = TkeForcing {
            interior: &zeros3,
            surface: &surface,
        };
        let step = closure
            .integrate(&grid, &topo, &tke, forcing, &mixing(&grid, 1e-4), 100.0)
            .unwrap();
        let (i, j) = (HALO, HALO);
        assert_eq!(step.tke[[i, j, 2]], 0.0);
        assert!(step.surface_correction[[i, j]] > 0.0);
        // Land column untouched
        assert_eq!(step.surface_correction[[HALO + 2, HALO + 2]], 0.0);
    }

    #[test]
    fn test_lateral_diffusion_spreads_energy() {
        let (grid, topo) = basin(2);
        let cfg = enabled()
            .with_c_eps(0.0)
            .with_hor_diffusion(1000.0)
            .with_east_flux_edge(EastFluxEdge::Outermost);
        let closure = TkeClosure::new(cfg).unwrap();
        let mut tke = grid.zeros_3d();
        tke[[HALO, HALO, 1]] = 1.0;
        let zeros3 = grid.zeros_3d();
        let zeros2 = grid.zeros_2d();
        let forcing = TkeForcing {
            interior: &zeros3,
            surface: &zeros2,
        };
        let step = closure
            .integrate(&grid, &topo, &tke, forcing, &mixing(&grid, 0.0), 1000.0)
            .unwrap();
        assert!(step.tke[[HALO + 1, HALO, 1]] > 0.0);
        assert!(step.tke[[HALO, HALO + 1, 1]] > 0.0);
        assert!(step.tke[[HALO, HALO, 1]] < 1.0);
    }
}
