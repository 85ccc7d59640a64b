//! Land/sea masks and water-column depths derived from the bottom index.
//!
//! `kbot[i, j]` is 1-based: 0 marks land, otherwise `kbot - 1` is the deepest
//! wet level (level 0 is the bottom of the grid). A tracer cell is wet when
//! `kbot != 0 && kbot - 1 <= k`, so wetness is monotonic in depth.
//!
//! U, V, Z and W masks take the minimum over the relevant tracer cells. The
//! last index on each shifted axis keeps the tracer mask.

use ndarray::{Array2, Array3, Zip};

use super::{Field2D, Grid, HALO, Mask3D};
use crate::boundary::set_cyclic_x;
use crate::config::ConfigError;
use crate::types::LevelIndex;

/// Masks and depths of the model domain.
#[derive(Debug, Clone)]
pub struct Topography {
    /// Bottom index on the padded grid, with the closed-domain halo applied.
    pub kbot: Array2<usize>,
    pub mask_t: Mask3D,
    pub mask_u: Mask3D,
    pub mask_v: Mask3D,
    pub mask_z: Mask3D,
    pub mask_w: Mask3D,
    pub ht: Field2D,
    pub hu: Field2D,
    pub hv: Field2D,
    pub hur: Field2D,
    pub hvr: Field2D,
}

impl Topography {
    /// Build masks and depths from a padded bottom-index array.
    ///
    /// Halo rows are set to land. Halo columns are set to land too, unless
    /// the grid is cyclic, in which case they are relayed from the interior.
    pub fn new(grid: &Grid, kbot: &Array2<usize>) -> Result<Self, ConfigError> {
        let (nxt, nyt) = grid.shape_2d();
        ConfigError::check_shape("kbot", &[nxt, nyt], kbot.shape())?;
        if let Some(bad) = kbot.iter().find(|&&k| k > grid.nz) {
            return Err(ConfigError::InvalidTopography(format!(
                "kbot value {bad} exceeds nz = {}",
                grid.nz
            )));
        }

        let kbot = close_domain(grid, kbot.clone());
        let nz = grid.nz;

        let mask_t = Array3::from_shape_fn((nxt, nyt, nz), |(i, j, k)| {
            LevelIndex::from_kbot(kbot[[i, j]]).is_some_and(|level| level.get() <= k)
        });

        let mut mask_u = mask_t.clone();
        let mut mask_v = mask_t.clone();
        let mut mask_z = mask_t.clone();
        let mut mask_w = mask_t.clone();
        for i in 0..nxt - 1 {
            for j in 0..nyt {
                for k in 0..nz {
                    mask_u[[i, j, k]] = mask_t[[i, j, k]] && mask_t[[i + 1, j, k]];
                }
            }
        }
        for i in 0..nxt {
            for j in 0..nyt - 1 {
                for k in 0..nz {
                    mask_v[[i, j, k]] = mask_t[[i, j, k]] && mask_t[[i, j + 1, k]];
                }
            }
        }
        for i in 0..nxt - 1 {
            for j in 0..nyt - 1 {
                for k in 0..nz {
                    mask_z[[i, j, k]] = mask_t[[i, j, k]]
                        && mask_t[[i + 1, j, k]]
                        && mask_t[[i, j + 1, k]];
                }
            }
        }
        for i in 0..nxt {
            for j in 0..nyt {
                for k in 0..nz.saturating_sub(1) {
                    mask_w[[i, j, k]] = mask_t[[i, j, k]] && mask_t[[i, j, k + 1]];
                }
            }
        }

        let ht = column_depth(grid, &mask_t);
        let hu = column_depth(grid, &mask_u);
        let hv = column_depth(grid, &mask_v);
        let hur = reciprocal(&hu);
        let hvr = reciprocal(&hv);

        Ok(Self {
            kbot,
            mask_t,
            mask_u,
            mask_v,
            mask_z,
            mask_w,
            ht,
            hu,
            hv,
            hur,
            hvr,
        })
    }

    /// Build from an interior `(nx, ny)` bottom-index array.
    pub fn from_interior(grid: &Grid, kbot: &Array2<usize>) -> Result<Self, ConfigError> {
        ConfigError::check_shape("kbot", &[grid.nx, grid.ny], kbot.shape())?;
        let mut padded = Array2::zeros(grid.shape_2d());
        padded
            .slice_mut(ndarray::s![HALO..grid.nx + HALO, HALO..grid.ny + HALO])
            .assign(kbot);
        Self::new(grid, &padded)
    }

    /// Basin where every interior column is wet down to the bottom level.
    pub fn flat_bottom(grid: &Grid) -> Result<Self, ConfigError> {
        Self::from_interior(grid, &Array2::from_elem((grid.nx, grid.ny), 1))
    }

    /// Number of vertical levels.
    #[inline]
    pub fn nz(&self) -> usize {
        self.mask_t.shape()[2]
    }

    /// Whether the column at `(i, j)` is land.
    #[inline]
    pub fn is_land(&self, i: usize, j: usize) -> bool {
        self.kbot[[i, j]] == 0
    }

    /// Deepest wet level of the column, `nz` for land.
    #[inline]
    pub fn first_wet_level(&self, i: usize, j: usize) -> usize {
        LevelIndex::from_kbot(self.kbot[[i, j]]).map_or(self.nz(), LevelIndex::get)
    }

    /// Surface tracer mask as 0/1 reals.
    pub fn surface_mask_t(&self) -> Field2D {
        let top = self.nz() - 1;
        self.mask_t
            .index_axis(ndarray::Axis(2), top)
            .mapv(|wet| if wet { 1.0 } else { 0.0 })
    }
}

fn close_domain(grid: &Grid, mut kbot: Array2<usize>) -> Array2<usize> {
    let (nxt, nyt) = grid.shape_2d();
    for i in 0..nxt {
        for h in 0..HALO {
            kbot[[i, h]] = 0;
            kbot[[i, nyt - 1 - h]] = 0;
        }
    }
    if grid.enable_cyclic_x {
        set_cyclic_x(&mut kbot, grid.nx);
    } else {
        for j in 0..nyt {
            for h in 0..HALO {
                kbot[[h, j]] = 0;
                kbot[[nxt - 1 - h, j]] = 0;
            }
        }
    }
    kbot
}

fn column_depth(grid: &Grid, mask: &Mask3D) -> Field2D {
    let (nxt, nyt, _) = mask.dim();
    Array2::from_shape_fn((nxt, nyt), |(i, j)| {
        mask.slice(ndarray::s![i, j, ..])
            .iter()
            .zip(grid.dzt.iter())
            .filter(|(wet, _)| **wet)
            .map(|(_, dz)| dz)
            .sum()
    })
}

fn reciprocal(depth: &Field2D) -> Field2D {
    let mut inv = Array2::zeros(depth.raw_dim());
    Zip::from(&mut inv).and(depth).for_each(|r, &h| {
        if h != 0.0 {
            *r = 1.0 / h;
        }
    });
    inv
}
