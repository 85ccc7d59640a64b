//! Boundary exchange between owned cells and halo cells.
//!
//! The solvers never read halo values they have not asked to be refreshed:
//! they call [`BoundaryExchange::synchronize`] at fixed points (after every
//! conjugate-gradient direction update and after each finished solve). What
//! "refresh" means is up to the implementation: a periodic relay for a
//! zonally cyclic domain, nothing at all for a closed basin, or a halo
//! exchange with neighbouring partitions in a decomposed run.
//!
//! # Example
//!
//! ```
//! use sverdrup::boundary::{BoundaryExchange, CyclicX};
//! use sverdrup::grid::HALO;
//! use ndarray::Array2;
//!
//! let nx = 4;
//! let mut field = Array2::from_shape_fn((nx + 2 * HALO, 3), |(i, _)| i as f64);
//! CyclicX::new(nx).synchronize(&mut field);
//!
//! // East halo mirrors the first interior column
//! assert_eq!(field[[nx + HALO, 0]], HALO as f64);
//! ```

mod cyclic;

pub use cyclic::{CyclicX, set_cyclic_x};

use crate::grid::{Field2D, Field3D, Grid};

/// Makes halo values consistent with their owners.
pub trait BoundaryExchange: Send + Sync {
    /// Refresh the halo of a horizontal field.
    fn synchronize(&self, field: &mut Field2D);

    /// Refresh the halo of a 3-D field.
    fn synchronize_3d(&self, field: &mut Field3D);
}

/// Closed basin: halos are land and never need refreshing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Closed;

impl BoundaryExchange for Closed {
    #[inline]
    fn synchronize(&self, _field: &mut Field2D) {}

    #[inline]
    fn synchronize_3d(&self, _field: &mut Field3D) {}
}

/// The exchange implied by the grid's periodicity flag.
pub fn exchange_for(grid: &Grid) -> Box<dyn BoundaryExchange> {
    if grid.enable_cyclic_x {
        Box::new(CyclicX::new(grid.nx))
    } else {
        Box::new(Closed)
    }
}
