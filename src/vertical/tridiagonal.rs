//! Batched tridiagonal solves for implicit vertical mixing.
//!
//! Every water column `(i, j)` owns the levels `ks[i, j] .. nz`. On those
//! levels the system
//!
//! ```text
//! a[k] x[k-1] + b[k] x[k] + c[k] x[k+1] = d[k]
//! ```
//!
//! is solved with the Thomas algorithm (no pivoting, so the caller must
//! supply diagonally dominant rows). The bottom row `ks` drops its `a` term
//! and may replace `b` and `d` by edge values. Columns with `ks >= nz` are
//! dry and left untouched.

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut3, Axis, Zip, s};

use crate::config::ConfigError;
use crate::grid::{Field3D, Mask3D, Topography};
use crate::types::LevelIndex;

/// Solve one tridiagonal system in place.
///
/// `a[0]` and `c[n-1]` are ignored. `scratch` holds the modified upper
/// diagonal and must be as long as the system.
pub fn thomas(
    a: ArrayView1<f64>,
    b: ArrayView1<f64>,
    c: ArrayView1<f64>,
    d: ArrayView1<f64>,
    x: ArrayViewMut1<f64>,
    scratch: ArrayViewMut1<f64>,
) {
    let n = b.len();
    if n == 0 {
        return;
    }
    solve_column(0, a, b, c, d, b[0], d[0], x, scratch);
}

/// Thomas algorithm on levels `ks..n`, with `b0`/`d0` replacing the first row.
#[allow(clippy::too_many_arguments)]
#[inline]
fn solve_column(
    ks: usize,
    a: ArrayView1<f64>,
    b: ArrayView1<f64>,
    c: ArrayView1<f64>,
    d: ArrayView1<f64>,
    b0: f64,
    d0: f64,
    mut x: ArrayViewMut1<f64>,
    mut cp: ArrayViewMut1<f64>,
) {
    let n = b.len();
    cp[ks] = c[ks] / b0;
    x[ks] = d0 / b0;
    for k in ks + 1..n {
        let m = b[k] - a[k] * cp[k - 1];
        cp[k] = c[k] / m;
        x[k] = (d[k] - a[k] * x[k - 1]) / m;
    }
    for k in (ks..n - 1).rev() {
        let next = x[k + 1];
        x[k] -= cp[k] * next;
    }
}

/// Coefficients of a batch of column systems, shape `(nx, ny, nz)`.
#[derive(Debug, Clone)]
pub struct TridiagonalSystem {
    /// Sub-diagonal.
    pub a: Field3D,
    /// Diagonal.
    pub b: Field3D,
    /// Super-diagonal.
    pub c: Field3D,
    /// Right-hand side.
    pub d: Field3D,
    /// Diagonal of the bottom row, read at level `ks`.
    pub b_edge: Option<Field3D>,
    /// Right-hand side of the bottom row, read at level `ks`.
    pub d_edge: Option<Field3D>,
}

impl TridiagonalSystem {
    pub fn zeros(shape: (usize, usize, usize)) -> Self {
        Self {
            a: Array3::zeros(shape),
            b: Array3::zeros(shape),
            c: Array3::zeros(shape),
            d: Array3::zeros(shape),
            b_edge: None,
            d_edge: None,
        }
    }

    pub fn with_b_edge(mut self, b_edge: Field3D) -> Self {
        self.b_edge = Some(b_edge);
        self
    }

    pub fn with_d_edge(mut self, d_edge: Field3D) -> Self {
        self.d_edge = Some(d_edge);
        self
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize, usize) {
        self.b.dim()
    }

    fn check_shapes(&self) -> Result<(), ConfigError> {
        let expected = self.b.shape();
        ConfigError::check_shape("a", expected, self.a.shape())?;
        ConfigError::check_shape("c", expected, self.c.shape())?;
        ConfigError::check_shape("d", expected, self.d.shape())?;
        if let Some(e) = &self.b_edge {
            ConfigError::check_shape("b_edge", expected, e.shape())?;
        }
        if let Some(e) = &self.d_edge {
            ConfigError::check_shape("d_edge", expected, e.shape())?;
        }
        Ok(())
    }
}

/// Solution of a batched implicit solve.
#[derive(Debug, Clone)]
pub struct ImplicitSolution {
    /// Solved values; zero on dry levels.
    pub values: Field3D,
    /// Levels that belong to the solved part of their column.
    pub water: Mask3D,
}

impl ImplicitSolution {
    /// Whether column `(i, j)` was solved at all.
    pub fn column_has_water(&self, i: usize, j: usize) -> bool {
        self.water.slice(s![i, j, ..]).iter().any(|&w| w)
    }

    /// Overwrite the solved levels of `target`, leaving every other level as is.
    pub fn write_into(&self, mut target: ArrayViewMut3<f64>) {
        Zip::from(&mut target)
            .and(&self.values)
            .and(&self.water)
            .for_each(|t, &v, &w| {
                if w {
                    *t = v;
                }
            });
    }
}

/// Solve every column of `system` on the levels `ks[i, j]..nz`.
pub fn solve_implicit(
    ks: ArrayView2<usize>,
    system: &TridiagonalSystem,
) -> Result<ImplicitSolution, ConfigError> {
    system.check_shapes()?;
    let (nx, ny, nz) = system.dim();
    ConfigError::check_shape("ks", &[nx, ny], ks.shape())?;

    let mut values = Array3::<f64>::zeros((nx, ny, nz));
    let mut scratch = Array3::<f64>::zeros((nx, ny, nz));

    let kernel = |(i, j): (usize, usize), x: ArrayViewMut1<f64>, cp: ArrayViewMut1<f64>, &k0: &usize| {
        if k0 >= nz {
            return;
        }
        let b0 = system
            .b_edge
            .as_ref()
            .map_or(system.b[[i, j, k0]], |e| e[[i, j, k0]]);
        let d0 = system
            .d_edge
            .as_ref()
            .map_or(system.d[[i, j, k0]], |e| e[[i, j, k0]]);
        solve_column(
            k0,
            system.a.slice(s![i, j, ..]),
            system.b.slice(s![i, j, ..]),
            system.c.slice(s![i, j, ..]),
            system.d.slice(s![i, j, ..]),
            b0,
            d0,
            x,
            cp,
        );
    };

    #[cfg(feature = "parallel")]
    Zip::indexed(values.lanes_mut(Axis(2)))
        .and(scratch.lanes_mut(Axis(2)))
        .and(ks)
        .par_for_each(kernel);

    #[cfg(not(feature = "parallel"))]
    Zip::indexed(values.lanes_mut(Axis(2)))
        .and(scratch.lanes_mut(Axis(2)))
        .and(ks)
        .for_each(kernel);

    let water = Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| {
        let k0 = ks[[i, j]];
        k0 < nz && k >= k0
    });
    Ok(ImplicitSolution { values, water })
}

/// Deepest wet level of every padded column, `nz` on land.
pub fn first_wet_levels(topo: &Topography) -> Array2<usize> {
    let nz = topo.nz();
    topo.kbot
        .mapv(|kb| LevelIndex::from_kbot(kb).map_or(nz, LevelIndex::get))
}
