//! Error types for configuration and setup.

use thiserror::Error;

/// Errors raised while validating configuration or building the grid.
///
/// All of these are fatal at setup time, before any time stepping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Grid spacings or dimensions are unusable.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Bottom-index array is out of range.
    #[error("Invalid topography: {0}")]
    InvalidTopography(String),

    /// Mixing-length choice other than 1 (boundary distance) or 2 (Blanke).
    #[error("Unsupported TKE mixing length choice {0} (expected 1 or 2)")]
    UnsupportedMixingLength(u8),

    /// A scalar parameter is outside its admissible range.
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// An input array does not have the expected shape.
    #[error("Shape mismatch for {field}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

impl ConfigError {
    /// Create a shape mismatch error from two shape slices.
    pub fn shape_mismatch(field: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            field,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Check that `actual` matches `expected`.
    pub fn check_shape(
        field: &'static str,
        expected: &[usize],
        actual: &[usize],
    ) -> Result<(), ConfigError> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::shape_mismatch(field, expected, actual))
        }
    }
}
