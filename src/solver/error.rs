//! Error types for the elliptic solvers.

use thiserror::Error;

/// Failures of the conjugate-gradient iteration or the island system.
///
/// All of these are fatal for the current time step; the caller decides
/// whether to abort the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The residual grew beyond `factor` times its smallest value so far.
    #[error(
        "Conjugate gradient diverged at iteration {iteration}: \
         residual {residual:e} exceeds {factor} x minimum {min_residual:e}"
    )]
    Diverged {
        iteration: usize,
        residual: f64,
        min_residual: f64,
        factor: f64,
    },

    #[error(
        "Conjugate gradient did not converge in {iterations} iterations: \
         estimated error {estimated_error:e}, tolerance {tolerance:e}"
    )]
    MaxIterationsExceeded {
        iterations: usize,
        estimated_error: f64,
        tolerance: f64,
    },

    /// NaN or infinity appeared in the iteration.
    #[error(
        "Numerical breakdown at iteration {iteration}: \
         estimated error {estimated_error}, tolerance {tolerance:e}"
    )]
    NumericBreakdown {
        iteration: usize,
        estimated_error: f64,
        tolerance: f64,
    },

    /// The island circulation matrix could not be inverted.
    #[error("Island circulation system of size {islands} is singular")]
    SingularIslandSystem { islands: usize },
}
