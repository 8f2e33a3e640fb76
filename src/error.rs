//! Error types for CISR encoding and SpMV.
//!
//! All errors are detected by validating shapes and lengths before any
//! matrix element is processed: an operation either succeeds completely or
//! returns an error with no partial output.

use thiserror::Error;

/// Errors that can occur while encoding a matrix or computing an SpMV.
#[derive(Debug, Error)]
pub enum CisrError {
    /// Matrix, vector, or lane-width dimensions are unusable
    /// (zero width, empty matrix, ragged rows, mismatched vector length).
    #[error("invalid dimensions: {reason}")]
    InvalidDimensions {
        /// Description of the dimension violation
        reason: String,
    },

    /// A bounded output buffer cannot hold the encoded matrix.
    ///
    /// This crate uses growable storage and never produces this variant;
    /// it exists so that producers with fixed-capacity buffers share the
    /// same taxonomy when exchanging triples.
    #[error("capacity exceeded: need {needed} slots but only {capacity} available")]
    CapacityExceeded {
        /// Number of slots the encoding requires
        needed: usize,
        /// Number of slots available
        capacity: usize,
    },

    /// A CISR triple does not describe a well-formed encoding
    /// (array length mismatch, row-length sum inconsistent with the lane
    /// schedule, out-of-range column or slot index).
    #[error("format inconsistency: {reason}")]
    FormatInconsistency {
        /// Description of the inconsistency
        reason: String,
    },
}

/// A specialized `Result` type for CISR operations.
pub type Result<T> = std::result::Result<T, CisrError>;

impl CisrError {
    /// Returns `true` if this is a dimension error.
    pub fn is_invalid_dimensions(&self) -> bool {
        matches!(self, CisrError::InvalidDimensions { .. })
    }

    /// Returns `true` if this is a capacity error.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, CisrError::CapacityExceeded { .. })
    }

    /// Returns `true` if this is a format error.
    pub fn is_format_inconsistency(&self) -> bool {
        matches!(self, CisrError::FormatInconsistency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = CisrError::InvalidDimensions {
            reason: "lane width must be at least 1".to_string(),
        };
        assert!(err.is_invalid_dimensions());
        assert!(!err.is_format_inconsistency());
        assert!(!err.is_capacity_exceeded());

        let err = CisrError::FormatInconsistency {
            reason: "values and column_indices differ in length".to_string(),
        };
        assert!(err.is_format_inconsistency());
    }

    #[test]
    fn test_error_display() {
        let err = CisrError::CapacityExceeded {
            needed: 20,
            capacity: 16,
        };
        assert_eq!(
            err.to_string(),
            "capacity exceeded: need 20 slots but only 16 available"
        );
    }
}
