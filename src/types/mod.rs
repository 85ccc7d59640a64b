//! Strongly-typed domain types for safer APIs.
//!
//! Island numbers, vertical levels and walk directions get their own types so
//! they cannot be confused with raw `(i, j, k)` grid indices.
//!
//! # Example
//!
//! ```
//! use sverdrup::types::{Direction, IslandIndex, LevelIndex};
//!
//! let isle = IslandIndex::new(0);
//! assert!(isle.is_reference());
//!
//! let deepest = LevelIndex::from_kbot(3);
//! assert_eq!(deepest, Some(LevelIndex::new(2)));
//!
//! assert_eq!(Direction::East.turn_right(), Direction::South);
//! ```

mod direction;
mod indices;

pub use direction::Direction;
pub use indices::{IslandIndex, LevelIndex};
