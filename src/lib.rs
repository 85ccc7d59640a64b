//! # sverdrup
//!
//! Barotropic and vertical-mixing kernels of a finite-difference ocean
//! circulation model on an Arakawa C grid with halo cells.
//!
//! This crate provides:
//! - Grid geometry and land/sea masks (T, U, V, Z and W points)
//! - Island detection and coastline walks for multiply connected basins
//! - Finite-volume elliptic operators for surface pressure and streamfunction
//! - A preconditioner-free conjugate-gradient solver with divergence and NaN detection
//! - Island circulation correction for the streamfunction
//! - Batched implicit tridiagonal column solves
//! - TKE and IDEMIX vertical mixing closures
//! - Zonally periodic boundary exchange
//!
//! # Example
//!
//! ```
//! use sverdrup::{ModelConfig, GridConfig, Grid, Topography, StreamfunctionSolver};
//! use sverdrup::boundary::exchange_for;
//!
//! let config = ModelConfig::default().with_grid(GridConfig::new(8, 6, 2));
//! let grid = Grid::uniform(&config.grid, 1.0e4, 1.0e4, 100.0).unwrap();
//! let topo = Topography::flat_bottom(&grid).unwrap();
//! let exchange = exchange_for(&grid);
//!
//! let solver = StreamfunctionSolver::new(&grid, &topo, &config, exchange.as_ref()).unwrap();
//! assert_eq!(solver.registry().len(), 1);
//! ```

pub mod boundary;
pub mod config;
pub mod grid;
pub mod operators;
pub mod solver;
pub mod topology;
pub mod types;
pub mod vertical;

use thiserror::Error;

// Re-export main types for convenience
pub use boundary::{BoundaryExchange, Closed, CyclicX};
pub use config::{
    ConfigError, EastFluxEdge, GridConfig, IdemixConfig, IslandConfig, MixingLength, ModelConfig,
    PhysicsConfig, SolverConfig, TkeConfig,
};
pub use grid::{Field2D, Field3D, Grid, HALO, Mask2D, Mask3D, Topography};
pub use operators::{
    EllipticOperator, FreeSurface, barotropic_velocity, streamfunction_operator,
    surface_pressure_operator, z_circulation,
};
pub use solver::{
    ConjugateGradient, ConvergenceMonitor, IslandCorrector, SolveReport, SolverError,
    SolverStatus, StreamfunctionSolver, StreamfunctionStep, SurfacePressureSolver,
};
pub use topology::{Island, IslandRegistry, TopologyError};
pub use types::{Direction, IslandIndex, LevelIndex};
pub use vertical::{
    IdemixForcing, IdemixParameters, IdemixStep, ImplicitSolution, TkeClosure, TkeDiffusivities,
    TkeForcing, TkeStep, TridiagonalSystem, solve_implicit,
};

/// Any error raised by this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

pub type Result<T> = std::result::Result<T, Error>;
