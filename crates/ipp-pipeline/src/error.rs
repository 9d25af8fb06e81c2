//! Error types for pipeline construction and execution.
//!
//! Errors fall in three categories:
//!
//! - **Build-time**: wiring, naming and parameter mistakes made by the caller
//!   ([`is_build_error`](PipelineError::is_build_error))
//! - **Data**: bus misuse during a run and kernels rejecting their inputs
//!   ([`is_data_error`](PipelineError::is_data_error))
//! - **Internal faults**: an operator broke its own contract
//!   ([`is_internal_fault`](PipelineError::is_internal_fault))
//!
//! Every error is fail-fast. After a failed run the graph keeps whatever was
//! written so far; call [`Pipeline::reset_all`](crate::Pipeline::reset_all)
//! before retrying.

use crate::param::ParamKind;
use ipp_core::FormatTag;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by buses, operators and the scheduler.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A bus or operator name is already taken in this pipeline.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// `"bus"` or `"operator"`.
        kind: &'static str,
        /// The conflicting name.
        name: String,
    },

    /// No operator with this name was inserted.
    #[error("unknown operator: {name}")]
    UnknownOperator {
        /// Requested operator name.
        name: String,
    },

    /// No bus with this name was created.
    #[error("unknown bus: {name}")]
    UnknownBus {
        /// Requested bus name.
        name: String,
    },

    /// A layer in the execution order was never populated.
    #[error("undefined layer: {layer}")]
    UnknownLayer {
        /// Layer identifier as displayed.
        layer: String,
    },

    /// The operator does not declare this parameter.
    #[error("{operator}: undefined param: {param}")]
    UnknownParam {
        /// Operator type name.
        operator: String,
        /// Parameter name.
        param: String,
    },

    /// The value's kind differs from the declared kind.
    #[error("{operator}: invalid argument type for {param}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Operator type name.
        operator: String,
        /// Parameter name.
        param: String,
        /// Declared kind.
        expected: ParamKind,
        /// Kind of the rejected value.
        got: ParamKind,
    },

    /// The parameter was declared but never set.
    #[error("{operator}: undefined argument for {param}")]
    UndefinedParam {
        /// Operator type name.
        operator: String,
        /// Parameter name.
        param: String,
    },

    /// The value has the right kind but is not usable (e.g. zero outputs).
    #[error("{operator}: invalid value for {param}: {reason}")]
    InvalidParam {
        /// Operator type name.
        operator: String,
        /// Parameter name.
        param: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// Bus bindings don't match the operator's current signature.
    #[error("operator {operator}: binding error: {reason}")]
    Binding {
        /// Operator instance name.
        operator: String,
        /// Which binding is wrong.
        reason: String,
    },

    /// A second write reached a bus before it was reset.
    #[error("bus {bus}: a bus cannot have more than one input")]
    BusOverflow {
        /// Bus name.
        bus: String,
    },

    /// The written image's channel count is not valid for the bus format.
    #[error("bus {bus}: {channels}-channel image not valid for {format}")]
    BusShape {
        /// Bus name.
        bus: String,
        /// Format of the bus.
        format: FormatTag,
        /// Channels in the rejected image.
        channels: u32,
    },

    /// A bus was read before anything was written to it.
    #[error("bus {bus}: empty bus")]
    EmptyBus {
        /// Bus name.
        bus: String,
    },

    /// An operator rejected its input data.
    #[error("operator kernel failed: {0}")]
    Kernel(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The transform returned the wrong number of outputs.
    #[error("operator {operator}: returned {got} outputs, signature declares {expected} (internal error)")]
    OutputArity {
        /// Operator instance name.
        operator: String,
        /// Declared output count.
        expected: usize,
        /// Returned output count.
        got: usize,
    },

    /// A returned image does not match its declared output format.
    #[error("operator {operator}: output {index} has {channels} channels, not valid for {format} (internal error)")]
    OutputShape {
        /// Operator instance name.
        operator: String,
        /// Output position.
        index: usize,
        /// Declared output format.
        format: FormatTag,
        /// Channels in the returned image.
        channels: u32,
    },

    /// The operator does not provide a transform.
    #[error("{operator}: run is not implemented")]
    NotImplemented {
        /// Operator type name.
        operator: String,
    },
}

impl PipelineError {
    /// Creates a [`PipelineError::DuplicateName`] error.
    #[inline]
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Creates a [`PipelineError::UnknownParam`] error.
    #[inline]
    pub fn unknown_param(operator: impl Into<String>, param: impl Into<String>) -> Self {
        Self::UnknownParam {
            operator: operator.into(),
            param: param.into(),
        }
    }

    /// Creates a [`PipelineError::UndefinedParam`] error.
    #[inline]
    pub fn undefined_param(operator: impl Into<String>, param: impl Into<String>) -> Self {
        Self::UndefinedParam {
            operator: operator.into(),
            param: param.into(),
        }
    }

    /// Creates a [`PipelineError::InvalidParam`] error.
    #[inline]
    pub fn invalid_param(
        operator: impl Into<String>,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParam {
            operator: operator.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`PipelineError::Binding`] error.
    #[inline]
    pub fn binding(operator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Binding {
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a kernel error into [`PipelineError::Kernel`].
    #[inline]
    pub fn kernel(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Kernel(Box::new(err))
    }

    /// Returns `true` for caller mistakes made while building the graph.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName { .. }
                | Self::UnknownOperator { .. }
                | Self::UnknownBus { .. }
                | Self::UnknownLayer { .. }
                | Self::UnknownParam { .. }
                | Self::TypeMismatch { .. }
                | Self::UndefinedParam { .. }
                | Self::InvalidParam { .. }
                | Self::Binding { .. }
        )
    }

    /// Returns `true` for errors caused by the data of a particular run.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::BusOverflow { .. }
                | Self::BusShape { .. }
                | Self::EmptyBus { .. }
                | Self::Kernel(_)
        )
    }

    /// Returns `true` when an operator implementation broke its contract.
    pub fn is_internal_fault(&self) -> bool {
        matches!(
            self,
            Self::OutputArity { .. } | Self::OutputShape { .. } | Self::NotImplemented { .. }
        )
    }
}

impl From<ipp_core::Error> for PipelineError {
    fn from(err: ipp_core::Error) -> Self {
        Self::kernel(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_disjoint() {
        let errors = [
            PipelineError::duplicate("bus", "in"),
            PipelineError::binding("blend", "expected 2 inputs, got 1"),
            PipelineError::EmptyBus { bus: "in".into() },
            PipelineError::kernel(ipp_core::Error::channel_mismatch(3, 1)),
            PipelineError::NotImplemented {
                operator: "Base".into(),
            },
        ];
        for err in &errors {
            let hits = [
                err.is_build_error(),
                err.is_data_error(),
                err.is_internal_fault(),
            ];
            assert_eq!(hits.iter().filter(|h| **h).count(), 1, "{err}");
        }
    }

    #[test]
    fn test_messages_name_the_culprit() {
        let err = PipelineError::BusOverflow { bus: "out".into() };
        assert!(err.to_string().contains("out"));

        let err = PipelineError::TypeMismatch {
            operator: "Product".into(),
            param: "value".into(),
            expected: ParamKind::Float,
            got: ParamKind::Int,
        };
        let msg = err.to_string();
        assert!(msg.contains("value"));
        assert!(msg.contains("float"));
        assert!(msg.contains("int"));
    }

    #[test]
    fn test_core_error_becomes_kernel() {
        let err: PipelineError = ipp_core::Error::channel_mismatch(1, 3).into();
        assert!(matches!(err, PipelineError::Kernel(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
