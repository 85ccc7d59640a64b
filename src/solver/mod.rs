//! Elliptic solvers for the barotropic mode.
//!
//! - [`ConjugateGradient`]: the iterative kernel shared by every solve, with
//!   its [`ConvergenceMonitor`]
//! - [`SurfacePressureSolver`]: surface pressure at T points, plus the
//!   forcing and velocity correction around it
//! - [`StreamfunctionSolver`]: streamfunction at Z points with the
//!   [`IslandCorrector`] for multiply connected basins
//!
//! # Example
//!
//! ```
//! use sverdrup::boundary::Closed;
//! use sverdrup::config::{GridConfig, SolverConfig};
//! use sverdrup::grid::{Grid, Topography};
//! use sverdrup::solver::{SurfacePressureSolver, barotropic_transport, pressure_forcing,
//!     remove_pressure_gradient};
//!
//! let grid = Grid::uniform(&GridConfig::new(6, 6, 2), 1.0e4, 1.0e4, 50.0).unwrap();
//! let topo = Topography::flat_bottom(&grid).unwrap();
//! let mut u = grid.zeros_3d();
//! let mut v = grid.zeros_3d();
//! u[[4, 4, 1]] = 0.1;
//! let dt = 600.0;
//!
//! let (fpx, fpy) = barotropic_transport(&grid, &topo, &u, &v, dt);
//! let forcing = pressure_forcing(&grid, &topo, &fpx, &fpy, None);
//! let mut psi = grid.zeros_2d();
//! let mut solver =
//!     SurfacePressureSolver::new(SolverConfig::default().with_tolerance(1e-8), None).unwrap();
//! solver.solve(&grid, &topo, &Closed, &forcing, &mut psi).unwrap();
//! remove_pressure_gradient(&grid, &topo, &psi, &mut u, &mut v, dt);
//! ```

mod congrad;
mod error;
mod islands;
mod pressure;

pub use congrad::{
    ConjugateGradient, ConvergenceMonitor, SolveReport, SolverStatus, absmax_interior,
    dot_interior,
};
pub use error::SolverError;
pub use islands::{IslandCorrector, StreamfunctionSolver, StreamfunctionStep, forcing_circulation};
pub use pressure::{
    SurfacePressureSolver, barotropic_transport, extrapolate_guess, pressure_forcing,
    remove_pressure_gradient,
};
