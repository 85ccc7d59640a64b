//! Sparse elliptic operators on the horizontal grid.
//!
//! Both the surface-pressure equation (at T points) and the streamfunction
//! equation (at Z points) discretise `∇·(h⁻¹∇ψ)`-type operators with a
//! 5-point stencil stored in a fixed 3x3 layout per cell. The stencils are
//! kept in finite-volume form: every row is multiplied by the area of its
//! control volume. In that form the coupling between two neighbours is the
//! same number seen from either side, so the operator is exactly symmetric
//! under the plain dot product and the conjugate-gradient method applies.
//!
//! Points where the stencil has no diagonal (dry cells, land corners) and
//! points pinned to a boundary value are not solved for; [`EllipticOperator::apply`]
//! returns zero there.
//!
//! # Example
//!
//! ```
//! use sverdrup::config::GridConfig;
//! use sverdrup::grid::{Grid, Topography, HALO};
//! use sverdrup::operators::surface_pressure_operator;
//!
//! let grid = Grid::uniform(&GridConfig::new(6, 5, 3), 1.0e4, 1.0e4, 100.0).unwrap();
//! let topo = Topography::flat_bottom(&grid).unwrap();
//! let op = surface_pressure_operator(&grid, &topo, None);
//!
//! // A constant field is in the null space of the rigid-lid operator
//! let ones = grid.zeros_2d() + 1.0;
//! let a_ones = op.apply(&ones);
//! assert!(a_ones.iter().all(|v| v.abs() < 1e-9));
//! assert!(op.diagonal(HALO, HALO) < 0.0);
//! ```

mod pressure;
mod streamfunction;

pub use pressure::{FreeSurface, surface_pressure_operator};
pub use streamfunction::{barotropic_velocity, streamfunction_operator, z_circulation};

use ndarray::{Array2, Array4, Zip};

use crate::grid::{Field2D, Grid, Mask2D};

/// A 5-point operator stored as a 3x3 stencil per cell.
///
/// `stencil[[i, j, 1 + di, 1 + dj]]` multiplies `x[[i + di, j + dj]]` in row
/// `(i, j)`.
#[derive(Debug, Clone)]
pub struct EllipticOperator {
    stencil: Array4<f64>,
    solvable: Mask2D,
    /// Interior rows without a diagonal.
    empty: Mask2D,
}

impl EllipticOperator {
    /// Wrap a stencil; interior points with a nonzero diagonal are solvable.
    pub fn from_stencil(grid: &Grid, stencil: Array4<f64>) -> Self {
        let (nxt, nyt) = grid.shape_2d();
        let empty = Array2::from_shape_fn((nxt, nyt), |(i, j)| {
            grid.is_interior(i, j) && stencil[[i, j, 1, 1]] == 0.0
        });
        let solvable = Array2::from_shape_fn((nxt, nyt), |(i, j)| {
            grid.is_interior(i, j) && !empty[[i, j]]
        });
        Self {
            stencil,
            solvable,
            empty,
        }
    }

    /// Exclude `pinned` points from the solve; their values act as
    /// Dirichlet data for the neighbours.
    pub fn pin(&mut self, pinned: &Mask2D) {
        self.solvable.zip_mut_with(pinned, |s, &p| *s &= !p);
    }

    /// Builder form of [`EllipticOperator::pin`].
    pub fn with_pinned(mut self, pinned: &Mask2D) -> Self {
        self.pin(pinned);
        self
    }

    /// Padded horizontal shape.
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.solvable.dim()
    }

    /// Coefficient coupling row `(i, j)` to `(i + di, j + dj)`, `|di|, |dj| <= 1`.
    #[inline]
    pub fn coefficient(&self, i: usize, j: usize, di: isize, dj: isize) -> f64 {
        self.stencil[[i, j, (1 + di) as usize, (1 + dj) as usize]]
    }

    #[inline]
    pub fn diagonal(&self, i: usize, j: usize) -> f64 {
        self.stencil[[i, j, 1, 1]]
    }

    #[inline]
    pub fn is_solvable(&self, i: usize, j: usize) -> bool {
        self.solvable[[i, j]]
    }

    #[inline]
    pub fn solvable_mask(&self) -> &Mask2D {
        &self.solvable
    }

    /// Number of unknowns.
    pub fn unknowns(&self) -> usize {
        self.solvable.iter().filter(|&&s| s).count()
    }

    /// Largest `|rhs|` on interior rows the stencil does not cover; NaN propagates.
    ///
    /// Forcing there cannot be balanced by any solution.
    pub fn forcing_on_empty_rows(&self, rhs: &Field2D) -> f64 {
        let mut max = 0.0_f64;
        Zip::from(rhs).and(&self.empty).for_each(|&b, &e| {
            if e && (b.is_nan() || b.abs() > max) {
                max = if b.is_nan() { f64::NAN } else { b.abs() };
            }
        });
        max
    }

    /// `A·x` on solvable points, zero elsewhere.
    pub fn apply(&self, x: &Field2D) -> Field2D {
        let mut out = Array2::zeros(self.solvable.raw_dim());
        self.apply_into(x, &mut out);
        out
    }

    /// `A·x` written into `out`.
    ///
    /// Halo values of `x` must be current; periodic neighbours are read from
    /// the halo.
    pub fn apply_into(&self, x: &Field2D, out: &mut Field2D) {
        let kernel = |(i, j): (usize, usize), o: &mut f64, &solvable: &bool| {
            *o = if solvable { self.row(i, j, x) } else { 0.0 };
        };

        #[cfg(feature = "parallel")]
        Zip::indexed(out).and(&self.solvable).par_for_each(kernel);

        #[cfg(not(feature = "parallel"))]
        Zip::indexed(out).and(&self.solvable).for_each(kernel);
    }

    /// `rhs - A·x` on solvable points, zero elsewhere.
    pub fn residual(&self, rhs: &Field2D, x: &Field2D) -> Field2D {
        let mut res = self.apply(x);
        Zip::from(&mut res)
            .and(rhs)
            .and(&self.solvable)
            .for_each(|r, &b, &s| *r = if s { b - *r } else { 0.0 });
        res
    }

    #[inline]
    fn row(&self, i: usize, j: usize, x: &Field2D) -> f64 {
        let mut acc = 0.0;
        for di in 0..3 {
            for dj in 0..3 {
                let c = self.stencil[[i, j, di, dj]];
                if c != 0.0 {
                    acc += c * x[[i + di - 1, j + dj - 1]];
                }
            }
        }
        acc
    }
}

/// Accumulates a symmetric 5-point stencil one face at a time.
pub(crate) struct StencilBuilder {
    stencil: Array4<f64>,
}

impl StencilBuilder {
    pub(crate) fn new(grid: &Grid) -> Self {
        let (nxt, nyt) = grid.shape_2d();
        Self {
            stencil: Array4::zeros((nxt, nyt, 3, 3)),
        }
    }

    /// Couple row `(i, j)` to its neighbour at offset `(di, dj)` with weight `w`.
    #[inline]
    pub(crate) fn couple(&mut self, i: usize, j: usize, di: isize, dj: isize, w: f64) {
        self.stencil[[i, j, 1, 1]] -= w;
        self.stencil[[i, j, (1 + di) as usize, (1 + dj) as usize]] += w;
    }

    /// Add `value` to the diagonal of row `(i, j)`.
    #[inline]
    pub(crate) fn add_diagonal(&mut self, i: usize, j: usize, value: f64) {
        self.stencil[[i, j, 1, 1]] += value;
    }

    pub(crate) fn build(self, grid: &Grid) -> EllipticOperator {
        EllipticOperator::from_stencil(grid, self.stencil)
    }
}
