//! Error types for the transform algebra and resampling core.
//!
//! Errors split into two classes: configuration errors (bad arguments,
//! detected before any work happens) and numerical errors (detected during
//! execution, e.g. a singular matrix on one bad batch). Callers inside a
//! training loop can use [`CoreError::is_numerical`] to decide whether to
//! skip or retry instead of aborting.

use thiserror::Error;

/// Main error type for transform and resampling operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration supplied by the caller.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Spatial dimensionality mismatch between operands.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Shape mismatch between operands.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Too few correspondence points for a closed-form affine fit.
    #[error("Underdetermined fit: {points} correspondences given, {required} required")]
    UnderdeterminedFit { points: usize, required: usize },

    /// A matrix required to be invertible is singular or near-singular.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// No real principal matrix square root exists for the given transform.
    #[error("No real matrix square root: {0}")]
    NoRealSquareRoot(String),

    /// Numerical instability detected during execution.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

/// Result type for transform and resampling operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    /// Create a singular matrix error.
    pub fn singular_matrix(msg: impl Into<String>) -> Self {
        Self::SingularMatrix(msg.into())
    }

    /// Create a missing-real-square-root error.
    pub fn no_real_square_root(msg: impl Into<String>) -> Self {
        Self::NoRealSquareRoot(msg.into())
    }

    /// Create a numerical instability error.
    pub fn numerical_instability(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }

    /// Whether this error was detected during numerical execution rather
    /// than argument validation. Numerical errors on a single batch are
    /// typically skippable; configuration errors are caller bugs.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::SingularMatrix(_) | Self::NoRealSquareRoot(_) | Self::NumericalInstability(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::singular_matrix("determinant is 0");
        assert_eq!(err.to_string(), "Singular matrix: determinant is 0");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = CoreError::ShapeMismatch {
            expected: vec![4, 4],
            actual: vec![2, 2],
        };
        let msg = err.to_string();
        assert!(msg.contains("expected"));
        assert!(msg.contains("got"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::singular_matrix("x").is_numerical());
        assert!(CoreError::no_real_square_root("x").is_numerical());
        assert!(CoreError::numerical_instability("x").is_numerical());
        assert!(!CoreError::invalid_configuration("x").is_numerical());
        assert!(!CoreError::UnderdeterminedFit { points: 2, required: 4 }.is_numerical());
    }
}
