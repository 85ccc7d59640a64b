//! Periodic relay across the east/west seam.

use ndarray::{Array, Axis, RemoveAxis};

use super::BoundaryExchange;
use crate::grid::{Field2D, Field3D, HALO};

/// Copy the first and last `HALO` interior columns into the opposite halo.
///
/// Works on any array whose first axis is the padded x axis, including
/// integer and boolean maps.
pub fn set_cyclic_x<A, D>(field: &mut Array<A, D>, nx: usize)
where
    A: Clone,
    D: RemoveAxis,
{
    for h in 0..HALO {
        let east_src = field.index_axis(Axis(0), HALO + h).to_owned();
        field
            .index_axis_mut(Axis(0), nx + HALO + h)
            .assign(&east_src);

        let west_src = field.index_axis(Axis(0), nx + HALO - 1 - h).to_owned();
        field
            .index_axis_mut(Axis(0), HALO - 1 - h)
            .assign(&west_src);
    }
}

/// Zonally periodic domain of `nx` interior columns.
#[derive(Debug, Clone, Copy)]
pub struct CyclicX {
    nx: usize,
}

impl CyclicX {
    pub fn new(nx: usize) -> Self {
        Self { nx }
    }
}

impl BoundaryExchange for CyclicX {
    fn synchronize(&self, field: &mut Field2D) {
        set_cyclic_x(field, self.nx);
    }

    fn synchronize_3d(&self, field: &mut Field3D) {
        set_cyclic_x(field, self.nx);
    }
}
