//! Error types for printmatch.

use thiserror::Error;

/// Result alias for printmatch operations.
pub type PrintMatchResult<T> = std::result::Result<T, PrintMatchError>;

/// Errors that can occur when extracting, matching or ranking fingerprints.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PrintMatchError {
    /// Width or height is zero, or their product overflows.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is too short for the requested view.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// No image exists for the identifier under any supported extension.
    #[error("image `{id}` not found ({tried} paths tried)")]
    NotFound { id: String, tried: usize },
    /// A file exists for the identifier but could not be decoded.
    #[error("image `{id}` could not be decoded: {reason}")]
    Decode { id: String, reason: String },
    /// An image could not be written.
    #[error("image `{id}` could not be encoded: {reason}")]
    Encode { id: String, reason: String },
    /// Two descriptor sets with different vector lengths were compared.
    #[error("descriptor dimensionality mismatch: {left} vs {right}")]
    DescriptorMismatch { left: usize, right: usize },
    /// A configuration parameter is out of its valid range.
    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    /// Internal lookup outside a container.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
}

impl PrintMatchError {
    /// Returns true for errors that must abort a run (bad parameters or
    /// incompatible descriptor sets).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PrintMatchError::DescriptorMismatch { .. } | PrintMatchError::InvalidConfig { .. }
        )
    }

    /// Returns true for image loading failures (missing or undecodable).
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            PrintMatchError::NotFound { .. } | PrintMatchError::Decode { .. }
        )
    }
}
