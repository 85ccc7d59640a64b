//! Preconditioner-free conjugate gradients with an extrapolated error estimate.
//!
//! Convergence is judged on the size of the last update rather than the
//! residual. With `step_n = |alpha_n| max|p_n|` the geometric convergence rate
//! is estimated as `(step_n / step_1)^(1/(n-1))` and the remaining error of
//! the iterate as `step_n rate / (1 - rate)` (Aitken-style extrapolation of a
//! geometric series). The iteration stops once that estimate falls below the
//! tolerance.

use log::{info, warn};
use ndarray::{Array2, Zip};

use super::SolverError;
use crate::boundary::BoundaryExchange;
use crate::config::SolverConfig;
use crate::grid::Field2D;
use crate::operators::EllipticOperator;

/// Lifecycle of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverStatus {
    #[default]
    Init,
    Iterating,
    Converged,
    Diverged,
    MaxIterationsExceeded,
    NanDetected,
}

/// Outcome of a successful solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub iterations: usize,
    pub estimated_error: f64,
    pub status: SolverStatus,
}

/// Divergence and convergence bookkeeping of the CG iteration.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    tolerance: f64,
    divergence_factor: f64,
    rs_min: f64,
    step1: f64,
    estimate: f64,
    status: SolverStatus,
}

impl ConvergenceMonitor {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            divergence_factor: config.divergence_factor,
            rs_min: 0.0,
            step1: 0.0,
            estimate: f64::INFINITY,
            status: SolverStatus::Init,
        }
    }

    #[inline]
    pub fn status(&self) -> SolverStatus {
        self.status
    }

    /// Latest error estimate; infinite before the first iteration.
    #[inline]
    pub fn estimated_error(&self) -> f64 {
        self.estimate
    }

    /// Record iteration `n` (1-based).
    ///
    /// `rsnew` is the new squared residual norm, `alpha` the step length and
    /// `max_direction` the max norm of the new search direction. Returns the
    /// error estimate once converged, `None` to keep iterating.
    pub fn observe(
        &mut self,
        n: usize,
        rsnew: f64,
        alpha: f64,
        max_direction: f64,
    ) -> Result<Option<f64>, SolverError> {
        self.status = SolverStatus::Iterating;

        if n == 1 {
            self.rs_min = rsnew.abs();
        } else if n > 2 {
            self.rs_min = self.rs_min.min(rsnew.abs());
            if rsnew.abs() > self.divergence_factor * self.rs_min {
                self.status = SolverStatus::Diverged;
                return Err(SolverError::Diverged {
                    iteration: n,
                    residual: rsnew.abs(),
                    min_residual: self.rs_min,
                    factor: self.divergence_factor,
                });
            }
        }

        let step = alpha.abs() * max_direction;
        if !step.is_finite() || rsnew.is_nan() {
            return Err(self.breakdown(n, step));
        }

        if n == 1 {
            self.step1 = step;
            self.estimate = step;
        } else if step < self.tolerance {
            let rate = ((step / self.step1).ln() / (n - 1) as f64).exp();
            self.estimate = step * rate / (1.0 - rate);
            if self.estimate.is_nan() {
                return Err(self.breakdown(n, self.estimate));
            }
        } else {
            return Ok(None);
        }

        if self.estimate < self.tolerance {
            self.status = SolverStatus::Converged;
            Ok(Some(self.estimate))
        } else {
            Ok(None)
        }
    }

    fn breakdown(&mut self, n: usize, estimate: f64) -> SolverError {
        self.status = SolverStatus::NanDetected;
        SolverError::NumericBreakdown {
            iteration: n,
            estimated_error: estimate,
            tolerance: self.tolerance,
        }
    }
}

/// Conjugate-gradient solver for a symmetric [`EllipticOperator`].
///
/// # Arguments
/// * `operator` - Operator with its solvable mask; pinned points keep their values
/// * `config` - Tolerance, iteration cap and divergence factor
/// * `exchange` - Halo exchange applied to the search direction every iteration
pub struct ConjugateGradient<'a> {
    operator: &'a EllipticOperator,
    config: SolverConfig,
    exchange: &'a dyn BoundaryExchange,
}

impl<'a> ConjugateGradient<'a> {
    pub fn new(
        operator: &'a EllipticOperator,
        config: SolverConfig,
        exchange: &'a dyn BoundaryExchange,
    ) -> Self {
        Self {
            operator,
            config,
            exchange,
        }
    }

    /// Solve `A x = rhs` in place, starting from the current `x`.
    ///
    /// `x` must have current halo values. On error `x` holds the last
    /// iterate. An operator without unknowns facing nonzero forcing, or a
    /// search direction with zero curvature `p·Ap`, is a numeric breakdown.
    pub fn solve(&self, rhs: &Field2D, x: &mut Field2D) -> Result<SolveReport, SolverError> {
        let op = self.operator;
        let mut res = op.residual(rhs, x);
        let mut p = res.clone();
        self.exchange.synchronize(&mut p);
        let mut rsold = dot_interior(op, &res, &res);

        if rsold == 0.0 {
            let lost = op.forcing_on_empty_rows(rhs);
            if op.unknowns() == 0 && lost != 0.0 {
                let e = SolverError::NumericBreakdown {
                    iteration: 0,
                    estimated_error: lost,
                    tolerance: self.config.tolerance,
                };
                warn!("operator has no unknowns but nonzero forcing: {e}");
                return Err(e);
            }
            return Ok(self.finish(0, 0.0));
        }
        if rsold.is_nan() {
            warn!("NaN in the initial residual");
            return Err(SolverError::NumericBreakdown {
                iteration: 0,
                estimated_error: rsold,
                tolerance: self.config.tolerance,
            });
        }

        let mut ap = Array2::zeros(x.raw_dim());
        let mut monitor = ConvergenceMonitor::new(&self.config);

        for n in 1..=self.config.max_iterations {
            op.apply_into(&p, &mut ap);
            let pap = dot_interior(op, &p, &ap);
            if pap == 0.0 || !pap.is_finite() {
                let e = SolverError::NumericBreakdown {
                    iteration: n,
                    estimated_error: monitor.estimated_error(),
                    tolerance: self.config.tolerance,
                };
                warn!("search direction has curvature {pap:e}: {e}");
                return Err(e);
            }
            let alpha = rsold / pap;
            x.scaled_add(alpha, &p);
            res.scaled_add(-alpha, &ap);
            let rsnew = dot_interior(op, &res, &res);

            let beta = rsnew / rsold;
            Zip::from(&mut p).and(&res).for_each(|p, &r| *p = r + beta * *p);
            self.exchange.synchronize(&mut p);
            rsold = rsnew;

            let smax = absmax_interior(op, &p);
            match monitor.observe(n, rsnew, alpha, smax) {
                Ok(Some(estimate)) => return Ok(self.finish(n, estimate)),
                Ok(None) => {}
                Err(e) => {
                    warn!("{e}");
                    return Err(e);
                }
            }
        }

        let e = SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
            estimated_error: monitor.estimated_error(),
            tolerance: self.config.tolerance,
        };
        warn!("{e}");
        Err(e)
    }

    fn finish(&self, iterations: usize, estimated_error: f64) -> SolveReport {
        if self.config.verbose {
            info!(
                "conjugate gradient converged after {iterations} iterations, \
                 estimated error {estimated_error:e} < {:e}",
                self.config.tolerance
            );
        }
        SolveReport {
            iterations,
            estimated_error,
            status: SolverStatus::Converged,
        }
    }
}

/// Dot product over the solvable points of `op`.
pub fn dot_interior(op: &EllipticOperator, a: &Field2D, b: &Field2D) -> f64 {
    let mut sum = 0.0;
    Zip::from(a)
        .and(b)
        .and(op.solvable_mask())
        .for_each(|&x, &y, &s| {
            if s {
                sum += x * y;
            }
        });
    sum
}

/// Max norm over the solvable points of `op`; NaN propagates.
pub fn absmax_interior(op: &EllipticOperator, a: &Field2D) -> f64 {
    let mut max = 0.0_f64;
    Zip::from(a).and(op.solvable_mask()).for_each(|&x, &s| {
        if s {
            if x.is_nan() {
                max = f64::NAN;
            } else if x.abs() > max {
                max = x.abs();
            }
        }
    });
    max
}
