//! Staggered model grid, masks and water-column depths.
//!
//! All horizontal fields are padded with [`HALO`] ghost cells on each side, so
//! a field has shape `(nx + 2*HALO, ny + 2*HALO)` and the owned interior is
//! `HALO..nx+HALO` by `HALO..ny+HALO`. Three-dimensional fields append the
//! vertical axis last, so each water column is contiguous in memory. Level 0
//! is the deepest level and `nz - 1` the surface.
//!
//! # Staggering
//!
//! ```text
//!   V(i,j) ---- Z(i,j)        T: tracer / pressure (cell centre)
//!     |           |           U: zonal velocity (east face)
//!   T(i,j) ---- U(i,j)        V: meridional velocity (north face)
//!                             Z: vorticity / streamfunction (NE corner)
//! ```
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use sverdrup::config::GridConfig;
//! use sverdrup::grid::{Grid, Topography, HALO};
//!
//! let config = GridConfig::new(3, 2, 4);
//! let grid = Grid::uniform(&config, 1.0e3, 1.0e3, 25.0).unwrap();
//! let kbot = array![[1, 1], [0, 3], [2, 1]];
//! let topo = Topography::from_interior(&grid, &kbot).unwrap();
//!
//! assert_eq!(topo.ht[[HALO, HALO]], 100.0);
//! assert_eq!(topo.ht[[HALO + 1, HALO]], 0.0);
//! ```

mod coordinates;
mod topography;

pub use coordinates::{AxisCoordinates, Grid, u_centered_grid};
pub use topography::Topography;

use ndarray::{Array2, Array3};

/// Ghost cells on each horizontal side of every field.
pub const HALO: usize = 2;

/// Padded horizontal field.
pub type Field2D = Array2<f64>;

/// Padded field with the vertical axis last.
pub type Field3D = Array3<f64>;

/// Padded horizontal mask.
pub type Mask2D = Array2<bool>;

/// Padded 3-D mask.
pub type Mask3D = Array3<bool>;
