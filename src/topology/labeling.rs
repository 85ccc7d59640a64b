//! Connected-component labelling of the land map.

use ndarray::Array2;
use std::collections::VecDeque;

use crate::boundary::set_cyclic_x;
use crate::grid::HALO;

/// Value of an island cell in a perimeter map.
pub const ISLAND: i8 = 1;
/// Value of a perimeter cell (not on the island, 8-adjacent to it).
pub const PERIMETER: i8 = -1;
/// Value of any other cell.
pub const OTHER: i8 = 0;

/// Index ranges and wrap rule shared by labelling and perimeter search.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lattice {
    pub nxt: usize,
    pub nyt: usize,
    pub nx: usize,
    pub cyclic: bool,
}

impl Lattice {
    /// x indices that are scanned; periodic halos are filled by relay instead.
    fn columns(&self) -> std::ops::Range<usize> {
        if self.cyclic {
            HALO..self.nx + HALO
        } else {
            0..self.nxt
        }
    }

    /// The up to eight neighbours of `(i, j)`, wrapped in x when cyclic.
    fn neighbours(&self, i: usize, j: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        const OFFSETS: [(isize, isize); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        OFFSETS.iter().filter_map(move |&(di, dj)| {
            let jn = j.checked_add_signed(dj).filter(|&jn| jn < self.nyt)?;
            let mut inb = i.checked_add_signed(di)?;
            if self.cyclic {
                if inb < HALO {
                    inb += self.nx;
                } else if inb >= self.nx + HALO {
                    inb -= self.nx;
                }
            } else if inb >= self.nxt {
                return None;
            }
            Some((inb, jn))
        })
    }
}

/// Label 8-connected land components.
///
/// Returns the label map (0 = ocean, `n` = n-th component in scan order, rows
/// south to north) and the number of components.
pub(crate) fn label_land(land: &Array2<bool>, lattice: Lattice) -> (Array2<usize>, usize) {
    let mut labels = Array2::<usize>::zeros(land.raw_dim());
    let mut count = 0;
    let mut queue = VecDeque::new();

    for j in 0..lattice.nyt {
        for i in lattice.columns() {
            if !land[[i, j]] || labels[[i, j]] != 0 {
                continue;
            }
            count += 1;
            labels[[i, j]] = count;
            queue.push_back((i, j));
            while let Some((ci, cj)) = queue.pop_front() {
                for (ni, nj) in lattice.neighbours(ci, cj) {
                    if land[[ni, nj]] && labels[[ni, nj]] == 0 {
                        labels[[ni, nj]] = count;
                        queue.push_back((ni, nj));
                    }
                }
            }
        }
    }

    if lattice.cyclic {
        set_cyclic_x(&mut labels, lattice.nx);
    }
    (labels, count)
}

/// Map of one island: [`ISLAND`] on its cells, [`PERIMETER`] on cells
/// 8-adjacent to it, [`OTHER`] elsewhere.
pub(crate) fn perimeter_map(labels: &Array2<usize>, label: usize, lattice: Lattice) -> Array2<i8> {
    let mut map = Array2::<i8>::from_elem(labels.raw_dim(), OTHER);
    for j in 0..lattice.nyt {
        for i in lattice.columns() {
            map[[i, j]] = if labels[[i, j]] == label {
                ISLAND
            } else if lattice
                .neighbours(i, j)
                .any(|(ni, nj)| labels[[ni, nj]] == label)
            {
                PERIMETER
            } else {
                OTHER
            };
        }
    }
    if lattice.cyclic {
        set_cyclic_x(&mut map, lattice.nx);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(nx: usize, ny: usize, cyclic: bool) -> Lattice {
        Lattice {
            nxt: nx + 2 * HALO,
            nyt: ny + 2 * HALO,
            nx,
            cyclic,
        }
    }

    /// Closed-basin land map: halo ring is land.
    fn basin(nx: usize, ny: usize) -> Array2<bool> {
        let (nxt, nyt) = (nx + 2 * HALO, ny + 2 * HALO);
        Array2::from_shape_fn((nxt, nyt), |(i, j)| {
            i < HALO || j < HALO || i >= nx + HALO || j >= ny + HALO
        })
    }

    #[test]
    fn test_outer_wall_is_first_label() {
        let mut land = basin(8, 8);
        land[[5, 5]] = true;
        land[[6, 6]] = true; // diagonal neighbour joins the same island
        let (labels, count) = label_land(&land, lattice(8, 8, false));
        assert_eq!(count, 2);
        assert_eq!(labels[[0, 0]], 1);
        assert_eq!(labels[[5, 5]], 2);
        assert_eq!(labels[[6, 6]], 2);
        assert_eq!(labels[[4, 4]], 0);
    }

    #[test]
    fn test_cyclic_channel_walls_are_separate() {
        let nx = 6;
        let ny = 4;
        let land = Array2::from_shape_fn((nx + 2 * HALO, ny + 2 * HALO), |(_, j)| {
            j < HALO || j >= ny + HALO
        });
        let (labels, count) = label_land(&land, lattice(nx, ny, true));
        assert_eq!(count, 2);
        assert_eq!(labels[[0, 0]], 1);
        assert_eq!(labels[[0, ny + HALO]], 2);
    }

    #[test]
    fn test_cyclic_island_across_seam_is_one_component() {
        let nx = 6;
        let ny = 4;
        let mut land = Array2::from_shape_fn((nx + 2 * HALO, ny + 2 * HALO), |(_, j)| {
            j < HALO || j >= ny + HALO
        });
        land[[HALO, 3]] = true;
        land[[nx + HALO - 1, 3]] = true;
        let (labels, count) = label_land(&land, lattice(nx, ny, true));
        assert_eq!(count, 3);
        assert_eq!(labels[[HALO, 3]], labels[[nx + HALO - 1, 3]]);
    }

    #[test]
    fn test_perimeter_map() {
        let mut land = basin(8, 8);
        land[[5, 5]] = true;
        let lat = lattice(8, 8, false);
        let (labels, _) = label_land(&land, lat);
        let map = perimeter_map(&labels, 2, lat);
        assert_eq!(map[[5, 5]], ISLAND);
        for (i, j) in [(4, 4), (5, 4), (6, 4), (4, 5), (6, 5), (4, 6), (5, 6), (6, 6)] {
            assert_eq!(map[[i, j]], PERIMETER);
        }
        assert_eq!(map[[7, 5]], OTHER);
        assert_eq!(map[[0, 0]], OTHER);
    }
}
