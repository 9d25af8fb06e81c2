//! Error types for pixel operators.

use ipp_pipeline::PipelineError;
use thiserror::Error;

/// Error type for operator kernels.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Images have incompatible sizes.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// Invalid parameter value at run time (e.g. blend weights summing to 0).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Image construction failed.
    #[error(transparent)]
    Image(#[from] ipp_core::Error),
}

/// Result type for operator kernels.
pub type OpsResult<T> = Result<T, OpsError>;

impl From<OpsError> for PipelineError {
    fn from(err: OpsError) -> Self {
        PipelineError::kernel(err)
    }
}
