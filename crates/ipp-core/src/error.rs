//! Error types for ipp-core operations.
//!
//! The [`Error`] enum covers failures while constructing or reshaping
//! [`ImageData`](crate::ImageData) values:
//! - sample buffers whose length does not match the declared shape
//! - channel extraction/merging with incompatible operands
//!
//! # Usage
//!
//! ```rust
//! use ipp_core::{Error, Result};
//!
//! fn check_channels(channels: u32) -> Result<()> {
//!     if channels != 3 {
//!         return Err(Error::channel_mismatch(3, channels));
//!     }
//!     Ok(())
//! }
//! assert!(check_channels(1).is_err());
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or reshaping image data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invalid image shape.
    ///
    /// Returned when width, height or channel count is zero, or when the
    /// sample buffer does not hold exactly `width * height * channels`
    /// elements.
    #[error("invalid dimensions: {width}x{height}x{channels} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Requested channel count
        channels: u32,
        /// Reason why the shape is invalid
        reason: String,
    },

    /// Channel count mismatch between an operand and what was expected.
    #[error("channel mismatch: expected {expected}, got {got}")]
    ChannelMismatch {
        /// Expected channel count
        expected: u32,
        /// Actual channel count
        got: u32,
    },

    /// Image dimensions don't match for the operation.
    #[error("dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// First image width
        a_width: u32,
        /// First image height
        a_height: u32,
        /// Second image width
        b_width: u32,
        /// Second image height
        b_height: u32,
    },

    /// Channel index past the last channel of the image.
    #[error("channel {channel} out of range for {channels}-channel image")]
    ChannelOutOfRange {
        /// Requested channel index
        channel: u32,
        /// Channels in the image
        channels: u32,
    },
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(
        width: u32,
        height: u32,
        channels: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            channels,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::ChannelMismatch`] error.
    #[inline]
    pub fn channel_mismatch(expected: u32, got: u32) -> Self {
        Self::ChannelMismatch { expected, got }
    }

    /// Creates an [`Error::DimensionMismatch`] error.
    #[inline]
    pub fn dimension_mismatch(a: (u32, u32), b: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            a_width: a.0,
            a_height: a.1,
            b_width: b.0,
            b_height: b.1,
        }
    }

    /// Returns `true` if this error is about image shape rather than channels.
    #[inline]
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDimensions { .. } | Self::DimensionMismatch { .. }
        )
    }
}
