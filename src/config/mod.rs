//! Model configuration grouped by subsystem.
//!
//! [`ModelConfig`] is a plain record passed by reference to each component.
//! Every group derives `Serialize`/`Deserialize` with `#[serde(default)]`, so a
//! configuration file only needs the values that differ from the defaults.
//!
//! # Example
//!
//! ```
//! use sverdrup::config::{GridConfig, ModelConfig, SolverConfig};
//!
//! let config = ModelConfig::default()
//!     .with_grid(GridConfig::new(32, 24, 10).with_cyclic_x(true))
//!     .with_solver(SolverConfig::default().with_tolerance(1e-10));
//!
//! config.validate().unwrap();
//! assert!(config.grid.enable_cyclic_x);
//! ```

mod closure;
mod error;

pub use closure::{EastFluxEdge, IdemixConfig, MixingLength, TkeConfig};
pub use error::ConfigError;

use closure::positive;
use serde::{Deserialize, Serialize};

/// Earth radius in metres.
pub const EARTH_RADIUS: f64 = 6370.0e3;

/// Gravitational acceleration in m/s^2.
pub const GRAVITY: f64 = 9.81;

/// Grid dimensions and geometry flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Position of the U face east of the first interior cell (m or degrees).
    pub x_origin: f64,
    /// Position of the V face north of the first interior cell (m or degrees).
    pub y_origin: f64,
    /// Spacings and origins are given in degrees on the sphere.
    pub coord_degree: bool,
    /// Periodic in the zonal direction.
    pub enable_cyclic_x: bool,
    pub radius: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nx: 1,
            ny: 1,
            nz: 1,
            x_origin: 0.0,
            y_origin: 0.0,
            coord_degree: false,
            enable_cyclic_x: false,
            radius: EARTH_RADIUS,
        }
    }
}

impl GridConfig {
    /// Cartesian, closed grid of the given interior size.
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            ..Self::default()
        }
    }

    /// Set periodicity in x.
    pub fn with_cyclic_x(mut self, cyclic: bool) -> Self {
        self.enable_cyclic_x = cyclic;
        self
    }

    /// Interpret spacings and origins in degrees.
    pub fn with_coord_degree(mut self, degrees: bool) -> Self {
        self.coord_degree = degrees;
        self
    }

    /// Set the coordinate origin.
    pub fn with_origin(mut self, x_origin: f64, y_origin: f64) -> Self {
        self.x_origin = x_origin;
        self.y_origin = y_origin;
        self
    }

    /// Conversion factor from degrees to metres.
    pub fn degtom(&self) -> f64 {
        self.radius / 180.0 * std::f64::consts::PI
    }

    /// Check dimensions and radius.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(ConfigError::InvalidGrid(format!(
                "dimensions must be nonzero, got {}x{}x{}",
                self.nx, self.ny, self.nz
            )));
        }
        if self.enable_cyclic_x && self.nx < crate::grid::HALO {
            return Err(ConfigError::InvalidGrid(format!(
                "cyclic domain needs nx >= {}, got {}",
                crate::grid::HALO,
                self.nx
            )));
        }
        positive("grid.radius", self.radius)
    }
}

/// Physical constants and time steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f64,
    /// Momentum time step (s).
    pub dt_mom: f64,
    /// Tracer time step (s).
    pub dt_tracer: f64,
    /// Add the implicit free-surface term to the pressure equation.
    pub enable_free_surface: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            dt_mom: 3600.0,
            dt_tracer: 3600.0,
            enable_free_surface: false,
        }
    }
}

impl PhysicsConfig {
    /// Set both time steps.
    pub fn with_time_steps(mut self, dt_mom: f64, dt_tracer: f64) -> Self {
        self.dt_mom = dt_mom;
        self.dt_tracer = dt_tracer;
        self
    }

    /// Enable the implicit free surface.
    pub fn with_free_surface(mut self, enable: bool) -> Self {
        self.enable_free_surface = enable;
        self
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("physics.gravity", self.gravity)?;
        positive("physics.dt_mom", self.dt_mom)?;
        positive("physics.dt_tracer", self.dt_tracer)
    }
}

/// Conjugate-gradient solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Target for the extrapolated error estimate.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Log convergence at info level.
    pub verbose: bool,
    /// Residual growth over the running minimum treated as divergence.
    pub divergence_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 1000,
            verbose: false,
            divergence_factor: 100.0,
        }
    }
}

impl SolverConfig {
    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Log convergence details.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the divergence threshold factor.
    pub fn with_divergence_factor(mut self, factor: f64) -> Self {
        self.divergence_factor = factor;
        self
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("solver.tolerance", self.tolerance)?;
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "solver.max_iterations",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if !(self.divergence_factor > 1.0) {
            return Err(ConfigError::InvalidParameter {
                name: "solver.divergence_factor",
                value: self.divergence_factor,
                reason: "must exceed 1",
            });
        }
        Ok(())
    }
}

/// Settings for the island analysis and the unit-solution solves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandConfig {
    pub unit_solver: SolverConfig,
    /// Log every perimeter-walk step at trace level.
    pub trace_walk: bool,
}

/// Full model configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub grid: GridConfig,
    pub physics: PhysicsConfig,
    pub solver: SolverConfig,
    pub islands: IslandConfig,
    pub tke: TkeConfig,
    pub idemix: IdemixConfig,
}

impl ModelConfig {
    /// Replace the grid group.
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// Replace the physics group.
    pub fn with_physics(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    /// Replace the pressure/streamfunction solver settings.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Replace the TKE group.
    pub fn with_tke(mut self, tke: TkeConfig) -> Self {
        self.tke = tke;
        self
    }

    /// Replace the IDEMIX group.
    pub fn with_idemix(mut self, idemix: IdemixConfig) -> Self {
        self.idemix = idemix;
        self
    }

    /// Validate every group. Call once before the time loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.physics.validate()?;
        self.solver.validate()?;
        self.islands.unit_solver.validate()?;
        self.tke.validate()?;
        self.idemix.validate()
    }
}
