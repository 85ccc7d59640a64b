//! Staggered coordinates, spacings and metric factors.
//!
//! Cell centres (T points) and faces (U/V/W points) come from a single
//! "u-centred" construction: faces are the cumulative sum of the centre
//! spacings, and centres are reflected about the faces. Spacings passed in
//! cover the interior only; [`Grid::new`] extends them into the halo.

use ndarray::{Array1, Array2, Array3};
use std::ops::Range;

use super::{Field2D, Field3D, HALO};
use crate::config::{ConfigError, GridConfig};

/// Face and centre positions for one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisCoordinates {
    /// Cell centres.
    pub centres: Array1<f64>,
    /// Upper cell faces (`faces[i]` lies between centres `i` and `i + 1`).
    pub faces: Array1<f64>,
    /// Distance between neighbouring centres, stored at the face.
    pub face_spacing: Array1<f64>,
}

/// Build centres and faces from centre spacings `dyt`.
///
/// `faces[0] = 0`, `faces[i] = Σ dyt[1..=i]`, `centres[0] = -dyt[0] / 2` and
/// each following centre is the reflection of the previous one about the
/// face between them. The last face spacing is extrapolated.
pub fn u_centered_grid(dyt: &[f64]) -> AxisCoordinates {
    let n = dyt.len();
    let mut faces = Array1::<f64>::zeros(n);
    let mut centres = Array1::<f64>::zeros(n);
    let mut face_spacing = Array1::<f64>::zeros(n);
    if n == 0 {
        return AxisCoordinates {
            centres,
            faces,
            face_spacing,
        };
    }

    for i in 1..n {
        faces[i] = faces[i - 1] + dyt[i];
    }
    centres[0] = faces[0] - 0.5 * dyt[0];
    for i in 1..n {
        centres[i] = 2.0 * faces[i - 1] - centres[i - 1];
    }
    for i in 0..n - 1 {
        face_spacing[i] = centres[i + 1] - centres[i];
    }
    face_spacing[n - 1] = if n > 1 {
        2.0 * dyt[n - 1] - face_spacing[n - 2]
    } else {
        dyt[0]
    };

    AxisCoordinates {
        centres,
        faces,
        face_spacing,
    }
}

/// Horizontal and vertical grid geometry with halos.
///
/// Horizontal arrays have `n + 2 * HALO` entries; vertical arrays have `nz`
/// entries with level 0 at the bottom and `zw[nz - 1] = 0` at the surface.
/// Spacings are always in metres; coordinates keep the units of the
/// configuration (degrees when `coord_degree` is set).
#[derive(Debug, Clone)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub enable_cyclic_x: bool,
    pub coord_degree: bool,
    pub radius: f64,

    pub xt: Array1<f64>,
    pub xu: Array1<f64>,
    pub dxt: Array1<f64>,
    pub dxu: Array1<f64>,

    pub yt: Array1<f64>,
    pub yu: Array1<f64>,
    pub dyt: Array1<f64>,
    pub dyu: Array1<f64>,

    pub zt: Array1<f64>,
    pub zw: Array1<f64>,
    pub dzt: Array1<f64>,
    pub dzw: Array1<f64>,

    /// cos(latitude) at T rows.
    pub cost: Array1<f64>,
    /// cos(latitude) at U/V-face rows.
    pub cosu: Array1<f64>,
    /// tan(latitude) / radius at T rows.
    pub tantr: Array1<f64>,

    pub area_t: Field2D,
    pub area_u: Field2D,
    pub area_v: Field2D,
    pub area_z: Field2D,
}

impl Grid {
    /// Build a grid from interior spacings (`nx`, `ny` and `nz` entries).
    ///
    /// Horizontal spacings are in metres, or degrees when
    /// `config.coord_degree` is set.
    pub fn new(
        config: &GridConfig,
        dxt: &[f64],
        dyt: &[f64],
        dzt: &[f64],
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_spacing("dxt", dxt, config.nx)?;
        check_spacing("dyt", dyt, config.ny)?;
        check_spacing("dzt", dzt, config.nz)?;

        let dxt_full = extend_spacing(dxt, config.enable_cyclic_x);
        let dyt_full = extend_spacing(dyt, false);

        let mut x = shifted_axis(&dxt_full, config.x_origin);
        if config.enable_cyclic_x {
            for h in 0..HALO {
                x.face_spacing[config.nx + HALO + h] = x.face_spacing[HALO + h];
                x.face_spacing[HALO - 1 - h] = x.face_spacing[config.nx + HALO - 1 - h];
            }
        }
        let y = shifted_axis(&dyt_full, config.y_origin);

        let mut z = u_centered_grid(dzt);
        let surface = z.faces[config.nz - 1];
        z.centres -= surface;
        z.faces -= surface;

        check_axis("x", &x)?;
        check_axis("y", &y)?;
        // zw[nz - 1] = 0, so this also keeps every centre below the surface
        check_axis("z", &z)?;

        let scale = if config.coord_degree {
            config.degtom()
        } else {
            1.0
        };
        let dxt = Array1::from(dxt_full) * scale;
        let dxu = x.face_spacing * scale;
        let dyt = Array1::from(dyt_full) * scale;
        let dyu = y.face_spacing * scale;

        let (cost, cosu, tantr) = if config.coord_degree {
            let cost = y.centres.mapv(|lat| lat.to_radians().cos());
            let cosu = y.faces.mapv(|lat| lat.to_radians().cos());
            let tantr = y.centres.mapv(|lat| lat.to_radians().tan() / config.radius);
            if cost.iter().chain(cosu.iter()).any(|&c| !(c > 0.0)) {
                return Err(ConfigError::InvalidGrid(
                    "latitudes including halo must stay strictly between the poles".into(),
                ));
            }
            (cost, cosu, tantr)
        } else {
            let ny_padded = y.centres.len();
            (
                Array1::ones(ny_padded),
                Array1::ones(ny_padded),
                Array1::zeros(ny_padded),
            )
        };

        let shape = (dxt.len(), dyt.len());
        let area_t = Array2::from_shape_fn(shape, |(i, j)| dxt[i] * cost[j] * dyt[j]);
        let area_u = Array2::from_shape_fn(shape, |(i, j)| dxu[i] * cost[j] * dyt[j]);
        let area_v = Array2::from_shape_fn(shape, |(i, j)| dxt[i] * cosu[j] * dyu[j]);
        let area_z = Array2::from_shape_fn(shape, |(i, j)| dxu[i] * cosu[j] * dyu[j]);

        Ok(Self {
            nx: config.nx,
            ny: config.ny,
            nz: config.nz,
            enable_cyclic_x: config.enable_cyclic_x,
            coord_degree: config.coord_degree,
            radius: config.radius,
            xt: x.centres,
            xu: x.faces,
            dxt,
            dxu,
            yt: y.centres,
            yu: y.faces,
            dyt,
            dyu,
            zt: z.centres,
            zw: z.faces,
            dzt: Array1::from(dzt.to_vec()),
            dzw: z.face_spacing,
            cost,
            cosu,
            tantr,
            area_t,
            area_u,
            area_v,
            area_z,
        })
    }

    /// Grid with constant spacings.
    pub fn uniform(config: &GridConfig, dx: f64, dy: f64, dz: f64) -> Result<Self, ConfigError> {
        Self::new(
            config,
            &vec![dx; config.nx],
            &vec![dy; config.ny],
            &vec![dz; config.nz],
        )
    }

    /// Padded horizontal shape `(nx + 2*HALO, ny + 2*HALO)`.
    #[inline]
    pub fn shape_2d(&self) -> (usize, usize) {
        (self.nx + 2 * HALO, self.ny + 2 * HALO)
    }

    /// Padded 3-D shape with the vertical axis last.
    #[inline]
    pub fn shape_3d(&self) -> (usize, usize, usize) {
        (self.nx + 2 * HALO, self.ny + 2 * HALO, self.nz)
    }

    /// Owned x indices.
    #[inline]
    pub fn interior_x(&self) -> Range<usize> {
        HALO..self.nx + HALO
    }

    /// Owned y indices.
    #[inline]
    pub fn interior_y(&self) -> Range<usize> {
        HALO..self.ny + HALO
    }

    /// Whether `(i, j)` is an owned (non-halo) index.
    #[inline]
    pub fn is_interior(&self, i: usize, j: usize) -> bool {
        self.interior_x().contains(&i) && self.interior_y().contains(&j)
    }

    /// Zeroed padded 2-D field.
    pub fn zeros_2d(&self) -> Field2D {
        Array2::zeros(self.shape_2d())
    }

    /// Zeroed padded 3-D field.
    pub fn zeros_3d(&self) -> Field3D {
        Array3::zeros(self.shape_3d())
    }
}

fn check_spacing(name: &str, spacing: &[f64], expected: usize) -> Result<(), ConfigError> {
    if spacing.len() != expected {
        return Err(ConfigError::InvalidGrid(format!(
            "{name} has {} entries, expected {expected}",
            spacing.len()
        )));
    }
    if let Some(bad) = spacing.iter().find(|&&d| !(d.is_finite() && d > 0.0)) {
        return Err(ConfigError::InvalidGrid(format!(
            "{name} must be strictly positive, found {bad}"
        )));
    }
    Ok(())
}

/// Centres must interleave with the faces and every face spacing must be
/// positive. Strongly alternating spacings break the reflection construction.
fn check_axis(name: &str, axis: &AxisCoordinates) -> Result<(), ConfigError> {
    let n = axis.centres.len();
    for i in 0..n {
        let below = i == 0 || axis.faces[i - 1] < axis.centres[i];
        if !(below && axis.centres[i] < axis.faces[i]) {
            return Err(ConfigError::InvalidGrid(format!(
                "{name} centre {i} at {} is not between its faces",
                axis.centres[i]
            )));
        }
    }
    if let Some(bad) = axis.face_spacing.iter().find(|&&d| !(d.is_finite() && d > 0.0)) {
        return Err(ConfigError::InvalidGrid(format!(
            "{name} spacing between centres must be positive, found {bad}"
        )));
    }
    Ok(())
}

/// Pad interior spacings with `HALO` entries on each side.
///
/// Closed axes repeat the edge spacing; periodic axes wrap around, which keeps
/// the coordinates monotonic through the halo.
fn extend_spacing(interior: &[f64], cyclic: bool) -> Vec<f64> {
    let n = interior.len();
    let mut full = vec![0.0; n + 2 * HALO];
    full[HALO..n + HALO].copy_from_slice(interior);
    for h in 0..HALO {
        if cyclic {
            full[n + HALO + h] = interior[h % n];
            full[HALO - 1 - h] = interior[(n - 1 - h % n) % n];
        } else {
            full[n + HALO + h] = interior[n - 1];
            full[HALO - 1 - h] = interior[0];
        }
    }
    full
}

/// Centred axis shifted so the upper face of the first interior cell sits at `origin`.
fn shifted_axis(spacing: &[f64], origin: f64) -> AxisCoordinates {
    let mut axis = u_centered_grid(spacing);
    let offset = origin - axis.faces[HALO];
    axis.centres += offset;
    axis.faces += offset;
    axis
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    fn is_increasing(a: &Array1<f64>) -> bool {
        a.windows(2).into_iter().all(|w| w[1] > w[0])
    }

    #[test]
    fn test_u_centered_uniform_spacing() {
        let axis = u_centered_grid(&[1.0; 4]);
        assert!((axis.centres[0] + 0.5).abs() < TOL);
        assert!((axis.faces[3] - 3.0).abs() < TOL);
        for d in axis.face_spacing.iter() {
            assert!((d - 1.0).abs() < TOL);
        }
    }

    #[test]
    fn test_u_centered_faces_between_centres() {
        let dyt = [1.0, 2.0, 3.0, 1.5];
        let axis = u_centered_grid(&dyt);
        for i in 0..dyt.len() - 1 {
            assert!(axis.faces[i] > axis.centres[i]);
            assert!(axis.faces[i] < axis.centres[i + 1]);
        }
    }

    #[test]
    fn test_vertical_surface_at_zero() {
        let config = GridConfig::new(4, 4, 3);
        let grid = Grid::uniform(&config, 1.0, 1.0, 10.0).unwrap();
        assert!(grid.zw[2].abs() < TOL);
        assert!((grid.zw[0] + 20.0).abs() < TOL);
        assert!((grid.zt[0] + 25.0).abs() < TOL);
        assert!((grid.zt[2] + 5.0).abs() < TOL);
        assert!(grid.dzw.iter().all(|&d| (d - 10.0).abs() < TOL));
    }

    #[test]
    fn test_coordinates_monotonic_with_halo() {
        for cyclic in [false, true] {
            let config = GridConfig::new(5, 3, 2).with_cyclic_x(cyclic);
            let grid = Grid::new(
                &config,
                &[1.0, 1.2, 1.5, 1.3, 1.0],
                &[2.0, 2.2, 2.5],
                &[1.0, 1.0],
            )
            .unwrap();
            assert!(is_increasing(&grid.xt));
            assert!(is_increasing(&grid.xu));
            assert!(is_increasing(&grid.yt));
            assert!(is_increasing(&grid.yu));
            assert!(grid.dxt.iter().all(|&d| d > 0.0));
            assert!(grid.dxu.iter().all(|&d| d > 0.0));
        }
    }

    #[test]
    fn test_cyclic_halo_spacing_wraps() {
        let config = GridConfig::new(4, 2, 1).with_cyclic_x(true);
        let grid = Grid::new(&config, &[1.0, 1.2, 1.4, 1.2], &[1.0, 1.0], &[1.0]).unwrap();
        assert_eq!(grid.dxt[HALO + 4], 1.0);
        assert_eq!(grid.dxt[HALO + 5], 1.2);
        assert_eq!(grid.dxt[HALO - 1], 1.2);
        assert_eq!(grid.dxt[HALO - 2], 1.4);
    }

    #[test]
    fn test_origin_at_first_interior_face() {
        let config = GridConfig::new(3, 3, 1).with_origin(100.0, -50.0);
        let grid = Grid::uniform(&config, 10.0, 20.0, 1.0).unwrap();
        assert!((grid.xu[HALO] - 100.0).abs() < TOL);
        assert!((grid.yu[HALO] + 50.0).abs() < TOL);
        assert!((grid.xt[HALO] - 95.0).abs() < TOL);
    }

    #[test]
    fn test_spherical_metrics() {
        let config = GridConfig::new(4, 4, 1)
            .with_coord_degree(true)
            .with_origin(0.0, 30.0);
        let grid = Grid::uniform(&config, 1.0, 1.0, 1.0).unwrap();
        let degtom = config.degtom();
        assert!((grid.dxt[HALO] - degtom).abs() < 1e-6);
        for j in 0..grid.shape_2d().1 {
            assert!((grid.cost[j] - grid.yt[j].to_radians().cos()).abs() < TOL);
            assert!(grid.cost[j] < 1.0);
        }
        let (i, j) = (HALO, HALO);
        let expected = grid.dxt[i] * grid.cost[j] * grid.dyt[j];
        assert!((grid.area_t[[i, j]] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_polar_grid_rejected() {
        let config = GridConfig::new(2, 4, 1)
            .with_coord_degree(true)
            .with_origin(0.0, 85.0);
        let result = Grid::uniform(&config, 1.0, 2.0, 1.0);
        assert!(matches!(result, Err(ConfigError::InvalidGrid(_))));
    }

    #[test]
    fn test_bad_spacing_rejected() {
        let config = GridConfig::new(3, 2, 1);
        let result = Grid::new(&config, &[1.0, -1.0, 1.0], &[1.0, 1.0], &[1.0]);
        assert!(matches!(result, Err(ConfigError::InvalidGrid(_))));
        let result = Grid::new(&config, &[1.0, 1.0], &[1.0, 1.0], &[1.0]);
        assert!(matches!(result, Err(ConfigError::InvalidGrid(_))));
    }

    #[test]
    fn test_alternating_spacing_rejected() {
        let config = GridConfig::new(2, 2, 2);
        let result = Grid::new(&config, &[10.0, 1.0], &[1.0, 1.0], &[1.0, 1.0]);
        assert!(matches!(result, Err(ConfigError::InvalidGrid(_))));
        let result = Grid::new(&config, &[1.0, 1.0], &[10.0, 1.0], &[1.0, 1.0]);
        assert!(matches!(result, Err(ConfigError::InvalidGrid(_))));
        // Centre of the upper box would sit at the surface
        let result = Grid::new(&config, &[1.0, 1.0], &[1.0, 1.0], &[200.0, 100.0]);
        assert!(matches!(result, Err(ConfigError::InvalidGrid(_))));
    }

    #[test]
    fn test_derived_spacings_positive() {
        let config = GridConfig::new(5, 3, 4);
        let grid = Grid::new(
            &config,
            &[1.0, 1.2, 1.5, 1.3, 1.0],
            &[2.0, 2.2, 2.5],
            &[250.0, 200.0, 150.0, 100.0],
        )
        .unwrap();
        assert!(grid.dxu.iter().all(|&d| d > 0.0));
        assert!(grid.dyu.iter().all(|&d| d > 0.0));
        assert!(grid.dzw.iter().all(|&d| d > 0.0));
        assert!(is_increasing(&grid.zt));
        assert!(grid.zt[3] < 0.0);
    }
}
