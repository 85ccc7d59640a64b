//! Error types for the island analysis.

use thiserror::Error;

use crate::types::{Direction, IslandIndex};

/// Fatal problems with the land/ocean map.
///
/// These indicate topography the perimeter walk cannot handle; the only fix
/// is to change the input `kbot`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// No edge between the island and its perimeter was found.
    #[error("Found no starting point for the boundary walk of island {island}")]
    NoStartingPoint { island: IslandIndex },

    /// The cells ahead match none of the recognised configurations.
    #[error(
        "Lost track around island {island} at corner {corner:?} heading {direction}: \
         map ahead is {ahead} {ahead_right}"
    )]
    LostTrack {
        island: IslandIndex,
        corner: (usize, usize),
        direction: Direction,
        ahead: i8,
        ahead_right: i8,
    },

    /// The walk tried to leave the padded grid.
    #[error("Boundary walk of island {island} left the grid at corner {corner:?} heading {direction}")]
    OutOfBounds {
        island: IslandIndex,
        corner: (usize, usize),
        direction: Direction,
    },

    /// The walk did not return to its start within the step cap.
    #[error("Boundary walk of island {island} did not close after {steps} steps")]
    WalkDidNotClose { island: IslandIndex, steps: usize },
}
