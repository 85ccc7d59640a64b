//! Streamfunction solve with island circulation correction.
//!
//! In a multiply connected basin the streamfunction is constant along each
//! coast, but the constants of all islands except the reference island are
//! unknown. The solve is split in two parts:
//!
//! 1. `psi0` solves the vorticity equation with every coast held at zero.
//! 2. For each free island `k` a unit solution `psi_k` (coast `k` at one, all
//!    other coasts at zero, no forcing) is precomputed. The final
//!    streamfunction is `psi0 + Σ c_k psi_k`, with the coefficients chosen so
//!    that the circulation around every free island matches the forcing.
//!
//! The circulation around an island is the sum of the Z-cell circulations
//! over its distinct boundary corners.

use faer::{Mat, linalg::solvers::Solve};
use log::{debug, info};
use ndarray::Axis;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{ConjugateGradient, SolveReport, SolverError};
use crate::boundary::BoundaryExchange;
use crate::config::{ModelConfig, SolverConfig};
use crate::grid::{Field2D, Grid, Topography};
use crate::operators::{EllipticOperator, barotropic_velocity, streamfunction_operator, z_circulation};
use crate::topology::IslandRegistry;
use crate::types::IslandIndex;

/// Unit solutions and circulation matrix of the free islands.
#[derive(Debug, Clone)]
pub struct IslandCorrector {
    corners: Vec<Vec<(usize, usize)>>,
    unit_solutions: Vec<Field2D>,
    matrix: Mat<f64>,
}

impl IslandCorrector {
    /// Solve for one unit streamfunction per non-reference island.
    ///
    /// The unit solves are independent and run on the rayon pool when the
    /// `parallel` feature is on.
    ///
    /// `operator` must have every island coast pinned.
    pub fn new(
        grid: &Grid,
        topo: &Topography,
        registry: &IslandRegistry,
        operator: &EllipticOperator,
        config: SolverConfig,
        exchange: &dyn BoundaryExchange,
    ) -> Result<Self, SolverError> {
        let corners: Vec<Vec<(usize, usize)>> = registry
            .iter()
            .map(|island| island.corners().collect())
            .collect();
        let n_free = corners.len().saturating_sub(1);
        let rhs = grid.zeros_2d();
        let cg = ConjugateGradient::new(operator, config, exchange);

        let unit_solve = |k: usize| -> Result<Field2D, SolverError> {
            let mut psi = grid.zeros_2d();
            for &c in &corners[k] {
                psi[c] = 1.0;
            }
            exchange.synchronize(&mut psi);
            let report = cg.solve(&rhs, &mut psi)?;
            debug!(
                "unit streamfunction of island {}: {} iterations",
                IslandIndex::new(k),
                report.iterations
            );
            Ok(psi)
        };

        #[cfg(feature = "parallel")]
        let unit_solutions = (1..corners.len())
            .into_par_iter()
            .map(unit_solve)
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(not(feature = "parallel"))]
        let unit_solutions = (1..corners.len())
            .map(unit_solve)
            .collect::<Result<Vec<_>, _>>()?;

        let mut corrector = Self {
            corners,
            unit_solutions,
            matrix: Mat::zeros(n_free, n_free),
        };
        for k in 0..n_free {
            let (u, v) = barotropic_velocity(grid, topo, &corrector.unit_solutions[k]);
            let circ = z_circulation(grid, &u, &v);
            for l in 0..n_free {
                let value = corrector.circulation(IslandIndex::new(l + 1), &circ);
                corrector.matrix[(l, k)] = value;
            }
        }
        debug!("island circulation matrix: {:?}", corrector.matrix);
        Ok(corrector)
    }

    /// Number of free (non-reference) islands.
    #[inline]
    pub fn len(&self) -> usize {
        self.unit_solutions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.unit_solutions.is_empty()
    }

    /// Unit streamfunction of a free island; `None` for the reference island.
    pub fn unit_solution(&self, island: IslandIndex) -> Option<&Field2D> {
        island.get().checked_sub(1).and_then(|k| self.unit_solutions.get(k))
    }

    /// `matrix[(l, k)]`: circulation around free island `l + 1` of unit solution `k + 1`.
    #[inline]
    pub fn matrix(&self) -> &Mat<f64> {
        &self.matrix
    }

    /// Sum of a Z-cell circulation field over the boundary corners of `island`.
    pub fn circulation(&self, island: IslandIndex, zcirc: &Field2D) -> f64 {
        self.corners
            .get(island.get())
            .map_or(0.0, |corners| corners.iter().map(|&c| zcirc[c]).sum())
    }

    /// Mean streamfunction on the coast of `island`.
    ///
    /// With the reference coast at zero this is the net transport between
    /// `island` and the reference island.
    pub fn island_transport(&self, island: IslandIndex, psi: &Field2D) -> f64 {
        match self.corners.get(island.get()) {
            Some(corners) if !corners.is_empty() => {
                corners.iter().map(|&c| psi[c]).sum::<f64>() / corners.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Add unit solutions to `psi` so each free island carries the forcing
    /// circulation, and return the coefficients.
    ///
    /// `forcing_circulation` is the Z-cell circulation of the forcing and
    /// `psi` the solution with every coast at zero.
    pub fn correct(
        &self,
        grid: &Grid,
        topo: &Topography,
        forcing_circulation: &Field2D,
        psi: &mut Field2D,
    ) -> Result<Vec<f64>, SolverError> {
        let n = self.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let (u, v) = barotropic_velocity(grid, topo, psi);
        let current = z_circulation(grid, &u, &v);
        let mut rhs = Mat::<f64>::zeros(n, 1);
        for l in 0..n {
            let island = IslandIndex::new(l + 1);
            rhs[(l, 0)] =
                self.circulation(island, forcing_circulation) - self.circulation(island, &current);
        }

        let lu = self.matrix.as_ref().full_piv_lu();
        let solution = lu.solve(&rhs);
        let coefficients: Vec<f64> = (0..n).map(|k| solution[(k, 0)]).collect();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SolverError::SingularIslandSystem { islands: n });
        }

        for (c, unit) in coefficients.iter().zip(&self.unit_solutions) {
            psi.scaled_add(*c, unit);
        }
        Ok(coefficients)
    }
}

/// Result of one streamfunction solve.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamfunctionStep {
    pub report: SolveReport,
    /// Island coefficients `c_k`, one per free island.
    pub coefficients: Vec<f64>,
}

/// Barotropic streamfunction solver for a fixed topography.
#[derive(Debug, Clone)]
pub struct StreamfunctionSolver {
    registry: IslandRegistry,
    operator: EllipticOperator,
    corrector: IslandCorrector,
    config: SolverConfig,
}

impl StreamfunctionSolver {
    /// Analyse the islands, build the pinned operator and the unit solutions.
    pub fn new(
        grid: &Grid,
        topo: &Topography,
        config: &ModelConfig,
        exchange: &dyn BoundaryExchange,
    ) -> crate::Result<Self> {
        config.solver.validate()?;
        config.islands.unit_solver.validate()?;
        let registry = IslandRegistry::analyze_with(grid, topo, config.islands.trace_walk)?;
        let operator = streamfunction_operator(grid, topo).with_pinned(&registry.ring_mask());
        debug!(
            "streamfunction operator: {} unknowns, {} islands",
            operator.unknowns(),
            registry.len()
        );
        let corrector = IslandCorrector::new(
            grid,
            topo,
            &registry,
            &operator,
            config.islands.unit_solver,
            exchange,
        )?;
        Ok(Self {
            registry,
            operator,
            corrector,
            config: config.solver,
        })
    }

    #[inline]
    pub fn registry(&self) -> &IslandRegistry {
        &self.registry
    }

    #[inline]
    pub fn operator(&self) -> &EllipticOperator {
        &self.operator
    }

    #[inline]
    pub fn corrector(&self) -> &IslandCorrector {
        &self.corrector
    }

    /// Solve for the streamfunction of the depth-averaged velocity `(fpx, fpy)`.
    ///
    /// `psi` holds the first guess on entry; its coast values are reset before
    /// the solve.
    pub fn solve(
        &self,
        grid: &Grid,
        topo: &Topography,
        exchange: &dyn BoundaryExchange,
        fpx: &Field2D,
        fpy: &Field2D,
        psi: &mut Field2D,
    ) -> Result<StreamfunctionStep, SolverError> {
        let forcing = forcing_circulation(grid, topo, fpx, fpy);

        let ring = self.registry.ring_mask();
        psi.zip_mut_with(&ring, |p, &on| {
            if on {
                *p = 0.0;
            }
        });
        exchange.synchronize(psi);

        let report =
            ConjugateGradient::new(&self.operator, self.config, exchange).solve(&forcing, psi)?;
        let coefficients = self.corrector.correct(grid, topo, &forcing, psi)?;
        exchange.synchronize(psi);

        if self.config.verbose && !coefficients.is_empty() {
            info!("island coefficients: {coefficients:?}");
        }
        Ok(StreamfunctionStep {
            report,
            coefficients,
        })
    }
}

/// Z-cell circulation of `(fpx, fpy)` restricted to wet surface faces.
pub fn forcing_circulation(grid: &Grid, topo: &Topography, fpx: &Field2D, fpy: &Field2D) -> Field2D {
    let top = grid.nz - 1;
    let mut u = fpx.clone();
    u.zip_mut_with(&topo.mask_u.index_axis(Axis(2), top), |x, &wet| {
        if !wet {
            *x = 0.0;
        }
    });
    let mut v = fpy.clone();
    v.zip_mut_with(&topo.mask_v.index_axis(Axis(2), top), |x, &wet| {
        if !wet {
            *x = 0.0;
        }
    });
    z_circulation(grid, &u, &v)
}
