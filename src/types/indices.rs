//! Strongly-typed index newtypes.
//!
//! These types keep island numbers and vertical levels from being mixed up
//! with raw grid indices.

use std::fmt;

/// Macro to generate index newtypes with common functionality.
macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident, $display_prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Create a new index.
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Get the raw index value.
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }

            /// First index (0).
            pub const ZERO: Self = Self(0);

            /// Create an iterator over [0, n) indices.
            pub fn iter(n: usize) -> impl ExactSizeIterator<Item = $name> {
                (0..n).map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(index: usize) -> Self {
                Self(index)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(idx: $name) -> usize {
                idx.0
            }
        }

        // Allow using as slice index
        impl<T> std::ops::Index<$name> for [T] {
            type Output = T;
            #[inline]
            fn index(&self, idx: $name) -> &T {
                &self[idx.0]
            }
        }

        impl<T> std::ops::Index<$name> for Vec<T> {
            type Output = T;
            #[inline]
            fn index(&self, idx: $name) -> &T {
                &self[idx.0]
            }
        }

        impl<T> std::ops::IndexMut<$name> for Vec<T> {
            #[inline]
            fn index_mut(&mut self, idx: $name) -> &mut T {
                &mut self[idx.0]
            }
        }
    };
}

define_index!(
    /// Island index in an [`IslandRegistry`](crate::topology::IslandRegistry).
    ///
    /// Zero-based. The land label map stores `index + 1` so that 0 can mean
    /// ocean; use [`IslandIndex::label`] for that value.
    ///
    /// # Example
    ///
    /// ```
    /// use sverdrup::types::IslandIndex;
    ///
    /// let isle = IslandIndex::new(2);
    /// assert_eq!(isle.get(), 2);
    /// assert_eq!(isle.label(), 3);
    /// ```
    IslandIndex,
    "I"
);

define_index!(
    /// Vertical level index, 0 at the deepest level.
    ///
    /// # Example
    ///
    /// ```
    /// use sverdrup::types::LevelIndex;
    ///
    /// let level = LevelIndex::new(5);
    /// assert_eq!(level.get(), 5);
    /// ```
    LevelIndex,
    "L"
);

impl IslandIndex {
    /// 1-based label used in the land label map.
    #[inline]
    pub const fn label(self) -> usize {
        self.0 + 1
    }

    /// Index for a 1-based label, `None` for the ocean label 0.
    #[inline]
    pub const fn from_label(label: usize) -> Option<Self> {
        if label == 0 { None } else { Some(Self(label - 1)) }
    }

    /// Whether this is the reference island whose streamfunction is held at zero.
    #[inline]
    pub const fn is_reference(self) -> bool {
        self.0 == 0
    }
}

impl LevelIndex {
    /// Level index for a 1-based bottom index `kbot`, `None` for land.
    #[inline]
    pub const fn from_kbot(kbot: usize) -> Option<Self> {
        if kbot == 0 { None } else { Some(Self(kbot - 1)) }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_island_index_labels() {
        let isle = IslandIndex::new(0);
        assert_eq!(isle.label(), 1);
        assert!(isle.is_reference());
        assert_eq!(IslandIndex::from_label(0), None);
        assert_eq!(IslandIndex::from_label(4), Some(IslandIndex::new(3)));
    }

    #[test]
    fn test_level_from_kbot() {
        assert_eq!(LevelIndex::from_kbot(0), None);
        assert_eq!(LevelIndex::from_kbot(1), Some(LevelIndex::ZERO));
        assert_eq!(LevelIndex::from_kbot(7).map(LevelIndex::get), Some(6));
    }

    #[test]
    fn test_vec_indexing() {
        let mut data = vec![10, 20, 30];
        let idx = IslandIndex::new(1);
        assert_eq!(data[idx], 20);
        data[idx] = 25;
        assert_eq!(data[1], 25);
    }

    #[test]
    fn test_iter() {
        let levels: Vec<_> = LevelIndex::iter(4).collect();
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[3].get(), 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", IslandIndex::new(3)), "I3");
        assert_eq!(format!("{}", LevelIndex::new(5)), "L5");
    }

    #[test]
    fn test_from_conversions() {
        let isle: IslandIndex = 7.into();
        let back: usize = isle.into();
        assert_eq!(back, 7);
    }
}
