//! Boundary walk around one island on the corner lattice.
//!
//! Corners are Z points: corner `(i, j)` is the north-east corner of tracer
//! cell `(i, j)`. The walker keeps the island on its right, so outer walls
//! are walked counter-clockwise when seen from the ocean and interior islands
//! clockwise. At every corner it inspects the two cells ahead of it:
//!
//! | ahead | ahead right | action       |
//! |-------|-------------|--------------|
//! | -1    | 1           | go straight  |
//! | -1    | -1          | turn right   |
//! | 1     | 1 or -1     | turn left    |
//!
//! Anything else means the map is not a clean island/perimeter pair.

use log::trace;
use ndarray::Array2;

use super::TopologyError;
use super::labeling::{ISLAND, PERIMETER};
use crate::grid::HALO;
use crate::types::{Direction, IslandIndex};

/// One step of a boundary walk: leave `corner` heading `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopStep {
    pub corner: (usize, usize),
    pub direction: Direction,
}

/// Closed, ordered walk along an island boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    steps: Vec<LoopStep>,
}

impl BoundaryLoop {
    /// Number of edges in the loop.
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// First step; the walk ends where it began.
    #[inline]
    pub fn start(&self) -> Option<&LoopStep> {
        self.steps.first()
    }

    #[inline]
    pub fn steps(&self) -> &[LoopStep] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoopStep> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a BoundaryLoop {
    type Item = &'a LoopStep;
    type IntoIter = std::slice::Iter<'a, LoopStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Geometry the walker needs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WalkDomain {
    pub nx: usize,
    pub ny: usize,
    pub cyclic: bool,
}

/// Find the first island/perimeter edge, searching outward from mid-domain.
///
/// Columns `nx/2+1 ..= nx+1` are searched first, then `nx/2` down to 1, so a
/// walk on a periodic domain does not begin next to the seam.
pub(crate) fn find_start(map: &Array2<i8>, domain: WalkDomain) -> Option<LoopStep> {
    let mid = domain.nx / 2;
    let columns = (mid + 1..=domain.nx + 1).chain((1..=mid).rev());
    for i in columns {
        for j in 1..=domain.ny + 1 {
            let here = map[[i, j]];
            let above = map[[i, j + 1]];
            if here == ISLAND && above == PERIMETER {
                return Some(LoopStep {
                    corner: (i - 1, j),
                    direction: Direction::East,
                });
            }
            if here == PERIMETER && above == ISLAND {
                return Some(LoopStep {
                    corner: (i, j),
                    direction: Direction::West,
                });
            }
        }
    }
    None
}

/// Cells ahead and ahead-right of a corner for a heading.
#[inline]
fn lookahead(corner: (usize, usize), direction: Direction) -> ((usize, usize), (usize, usize)) {
    let (i, j) = corner;
    match direction {
        Direction::North => ((i, j + 1), (i + 1, j + 1)),
        Direction::West => ((i, j), (i, j + 1)),
        Direction::South => ((i + 1, j), (i, j)),
        Direction::East => ((i + 1, j + 1), (i + 1, j)),
    }
}

/// Walk around `island` from `start` until the start corner and heading recur.
pub(crate) fn trace_boundary(
    map: &Array2<i8>,
    island: IslandIndex,
    start: LoopStep,
    domain: WalkDomain,
    verbose: bool,
) -> Result<BoundaryLoop, TopologyError> {
    let (nxt, nyt) = map.dim();
    let max_steps = 4 * nxt * nyt;
    let mut steps = vec![start];
    let mut direction = start.direction;
    let mut corner = advance(start.corner, direction, domain, (nxt, nyt))
        .ok_or(TopologyError::OutOfBounds {
            island,
            corner: start.corner,
            direction,
        })?;

    loop {
        let (ahead, ahead_right) = lookahead(corner, direction);
        if ahead.0 >= nxt || ahead.1 >= nyt || ahead_right.0 >= nxt || ahead_right.1 >= nyt {
            return Err(TopologyError::OutOfBounds {
                island,
                corner,
                direction,
            });
        }
        let a = map[ahead];
        let r = map[ahead_right];
        direction = match (a, r) {
            (PERIMETER, ISLAND) => direction,
            (PERIMETER, PERIMETER) => direction.turn_right(),
            (ISLAND, ISLAND) | (ISLAND, PERIMETER) => direction.turn_left(),
            _ => {
                return Err(TopologyError::LostTrack {
                    island,
                    corner,
                    direction,
                    ahead: a,
                    ahead_right: r,
                });
            }
        };
        if verbose {
            trace!("island {island}: corner {corner:?}, map ahead {a} {r}, heading {direction}");
        }

        if corner == start.corner && direction == start.direction {
            break;
        }
        steps.push(LoopStep { corner, direction });
        if steps.len() > max_steps {
            return Err(TopologyError::WalkDidNotClose {
                island,
                steps: steps.len(),
            });
        }
        corner = advance(corner, direction, domain, (nxt, nyt)).ok_or(
            TopologyError::OutOfBounds {
                island,
                corner,
                direction,
            },
        )?;
    }

    Ok(BoundaryLoop { steps })
}

/// Move one corner, wrapping east/west across a periodic seam.
fn advance(
    corner: (usize, usize),
    direction: Direction,
    domain: WalkDomain,
    (nxt, nyt): (usize, usize),
) -> Option<(usize, usize)> {
    let (di, dj) = direction.offset();
    let mut i = corner.0.checked_add_signed(di)?;
    let j = corner.1.checked_add_signed(dj)?;
    if domain.cyclic {
        if direction == Direction::East && i > domain.nx + HALO - 1 {
            i -= domain.nx;
        } else if direction == Direction::West && i < HALO {
            i += domain.nx;
        }
    }
    (i < nxt && j < nyt).then_some((i, j))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::labeling::OTHER;

    const DOMAIN: WalkDomain = WalkDomain {
        nx: 10,
        ny: 10,
        cyclic: false,
    };

    /// Perimeter map of an `l` x `l` island with lower-left cell `(i0, j0)`.
    fn square_map(i0: usize, j0: usize, l: usize) -> Array2<i8> {
        Array2::from_shape_fn((14, 14), |(i, j)| {
            let inside = |a: usize, lo: usize| a >= lo && a < lo + l;
            let near = |a: usize, lo: usize| a + 1 >= lo && a < lo + l + 1;
            if inside(i, i0) && inside(j, j0) {
                ISLAND
            } else if near(i, i0) && near(j, j0) {
                PERIMETER
            } else {
                OTHER
            }
        })
    }

    #[test]
    fn test_single_cell_island() {
        let map = square_map(6, 6, 1);
        let start = find_start(&map, DOMAIN).unwrap();
        let walk = trace_boundary(&map, IslandIndex::new(1), start, DOMAIN, false).unwrap();
        assert_eq!(walk.len(), 4);
        let corners: Vec<_> = walk.iter().map(|s| s.corner).collect();
        for c in [(5, 5), (6, 5), (5, 6), (6, 6)] {
            assert!(corners.contains(&c));
        }
    }

    #[test]
    fn test_square_islands_have_4l_steps() {
        for l in 1..=4 {
            let map = square_map(4, 4, l);
            let start = find_start(&map, DOMAIN).unwrap();
            let walk = trace_boundary(&map, IslandIndex::new(1), start, DOMAIN, false).unwrap();
            assert_eq!(walk.len(), 4 * l);
        }
    }

    #[test]
    fn test_island_on_the_right() {
        let map = square_map(5, 5, 2);
        let start = find_start(&map, DOMAIN).unwrap();
        let walk = trace_boundary(&map, IslandIndex::new(1), start, DOMAIN, false).unwrap();
        for step in &walk {
            let (i, j) = step.corner;
            // Cell on the right of the edge leaving this corner
            let right = match step.direction {
                Direction::East => (i + 1, j),
                Direction::West => (i, j + 1),
                Direction::North => (i + 1, j + 1),
                Direction::South => (i, j),
            };
            assert_eq!(map[right], ISLAND, "step {step:?}");
        }
    }

    #[test]
    fn test_no_start_without_island() {
        let map = Array2::from_elem((14, 14), OTHER);
        assert!(find_start(&map, DOMAIN).is_none());
    }

    #[test]
    fn test_lost_track_reported() {
        let mut map = square_map(5, 5, 2);
        // Knock a hole in the perimeter ring
        map[[4, 6]] = OTHER;
        let start = find_start(&map, DOMAIN).unwrap();
        let result = trace_boundary(&map, IslandIndex::new(1), start, DOMAIN, false);
        assert!(matches!(
            result,
            Err(TopologyError::LostTrack { ahead: OTHER, .. })
        ));
    }
}
