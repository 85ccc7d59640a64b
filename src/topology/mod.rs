//! Land/island topology of a multiply connected ocean domain.
//!
//! Land columns (`kbot == 0`, including the closed halo) are grouped into
//! 8-connected islands. Each island gets a closed walk along the corners of
//! its coast, which later carries the unit-circulation boundary conditions of
//! the streamfunction solve.
//!
//! Island 0 is the reference island. In a closed basin it is the outer wall
//! (the halo corner is scanned first) and its streamfunction is held at zero.
//!
//! # Example
//!
//! ```
//! use ndarray::Array2;
//! use sverdrup::config::GridConfig;
//! use sverdrup::grid::{Grid, Topography};
//! use sverdrup::topology::IslandRegistry;
//!
//! let grid = Grid::uniform(&GridConfig::new(10, 10, 1), 1.0, 1.0, 1.0).unwrap();
//! let mut kbot = Array2::from_elem((10, 10), 1);
//! kbot[[4, 4]] = 0;
//! kbot[[5, 4]] = 0;
//! let topo = Topography::from_interior(&grid, &kbot).unwrap();
//!
//! let islands = IslandRegistry::analyze(&grid, &topo).unwrap();
//! assert_eq!(islands.len(), 2);
//! assert_eq!(islands.islands()[1].boundary().len(), 6);
//! ```

mod error;
mod labeling;
mod perimeter;

pub use error::TopologyError;
pub use labeling::{ISLAND, OTHER, PERIMETER};
pub use perimeter::{BoundaryLoop, LoopStep};

use log::{debug, error};
use ndarray::Array2;
use std::fmt;

use crate::grid::{Grid, Mask2D, Topography};
use crate::types::{Direction, IslandIndex};
use labeling::{Lattice, label_land, perimeter_map};
use perimeter::{WalkDomain, find_start, trace_boundary};

/// One connected land mass and its coastline walk.
#[derive(Debug, Clone)]
pub struct Island {
    index: IslandIndex,
    cell_count: usize,
    boundary: BoundaryLoop,
    boundary_mask: Mask2D,
}

impl Island {
    #[inline]
    pub fn index(&self) -> IslandIndex {
        self.index
    }

    /// Land cells in the island (periodic halo copies excluded).
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Closed walk along the coast, island on the right.
    #[inline]
    pub fn boundary(&self) -> &BoundaryLoop {
        &self.boundary
    }

    /// Corners visited by the walk.
    #[inline]
    pub fn boundary_mask(&self) -> &Mask2D {
        &self.boundary_mask
    }

    /// Corners whose outgoing edge points in `direction`.
    pub fn direction_mask(&self, direction: Direction) -> Mask2D {
        let mut mask = Array2::from_elem(self.boundary_mask.raw_dim(), false);
        for step in self.boundary.iter().filter(|s| s.direction == direction) {
            mask[step.corner] = true;
        }
        mask
    }

    /// Distinct boundary corners in row-major order.
    pub fn corners(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.boundary_mask
            .indexed_iter()
            .filter_map(|(ij, &on)| on.then_some(ij))
    }
}

/// All islands of a domain, in discovery order.
#[derive(Debug, Clone)]
pub struct IslandRegistry {
    labels: Array2<usize>,
    islands: Vec<Island>,
    cyclic: bool,
}

impl IslandRegistry {
    /// Label land and walk every island's coast.
    pub fn analyze(grid: &Grid, topo: &Topography) -> Result<Self, TopologyError> {
        Self::analyze_with(grid, topo, false)
    }

    /// As [`IslandRegistry::analyze`], logging each walk step at trace level
    /// when `trace_walk` is set.
    pub fn analyze_with(
        grid: &Grid,
        topo: &Topography,
        trace_walk: bool,
    ) -> Result<Self, TopologyError> {
        let (nxt, nyt) = grid.shape_2d();
        let lattice = Lattice {
            nxt,
            nyt,
            nx: grid.nx,
            cyclic: grid.enable_cyclic_x,
        };
        let domain = WalkDomain {
            nx: grid.nx,
            ny: grid.ny,
            cyclic: grid.enable_cyclic_x,
        };

        let land = topo.kbot.mapv(|kb| kb == 0);
        let (labels, count) = label_land(&land, lattice);
        debug!("found {count} islands");

        let mut islands = Vec::with_capacity(count);
        for label in 1..=count {
            let index = IslandIndex::new(label - 1);
            let map = perimeter_map(&labels, label, lattice);

            let Some(start) = find_start(&map, domain) else {
                error!("no starting point for the boundary walk of island {index}");
                return Err(TopologyError::NoStartingPoint { island: index });
            };
            debug!(
                "island {index}: walk starts at corner {:?} heading {}",
                start.corner, start.direction
            );

            let boundary = trace_boundary(&map, index, start, domain, trace_walk)
                .inspect_err(|e| error!("{e}"))?;
            debug!("island {index}: {} boundary points", boundary.len());

            let mut boundary_mask = Array2::from_elem((nxt, nyt), false);
            for step in &boundary {
                boundary_mask[step.corner] = true;
            }
            let columns = if grid.enable_cyclic_x {
                grid.interior_x()
            } else {
                0..nxt
            };
            let cell_count = columns
                .map(|i| labels.row(i).iter().filter(|&&l| l == label).count())
                .sum();

            islands.push(Island {
                index,
                cell_count,
                boundary,
                boundary_mask,
            });
        }

        let registry = Self {
            labels,
            islands,
            cyclic: grid.enable_cyclic_x,
        };
        debug!("island map:\n{registry}");
        Ok(registry)
    }

    /// Number of islands.
    #[inline]
    pub fn len(&self) -> usize {
        self.islands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    #[inline]
    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    pub fn get(&self, index: IslandIndex) -> Option<&Island> {
        self.islands.get(index.get())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Island> {
        self.islands.iter()
    }

    /// Label map: 0 for ocean, `IslandIndex::label()` on land.
    #[inline]
    pub fn labels(&self) -> &Array2<usize> {
        &self.labels
    }

    /// Island owning a land cell.
    pub fn island_at(&self, i: usize, j: usize) -> Option<IslandIndex> {
        IslandIndex::from_label(self.labels[[i, j]])
    }

    /// Union of all boundary corners.
    pub fn ring_mask(&self) -> Mask2D {
        let mut mask = Array2::from_elem(self.labels.raw_dim(), false);
        for island in &self.islands {
            mask.zip_mut_with(island.boundary_mask(), |m, &b| *m |= b);
        }
        mask
    }

    /// Whether the registry was built on a periodic domain.
    #[inline]
    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }
}

/// Label map with north at the top; `.` is ocean, land shows `label % 10`.
impl fmt::Display for IslandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nxt, nyt) = self.labels.dim();
        for j in (0..nyt).rev() {
            write!(f, "{j:4} ")?;
            for i in 0..nxt {
                match self.labels[[i, j]] {
                    0 => write!(f, ".")?,
                    l => write!(f, "{}", l % 10)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
