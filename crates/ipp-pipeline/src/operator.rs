//! The operator contract.
//!
//! An [`Operator`] is a typed unit of computation: it declares the formats of
//! its input and output ports in a [`Signature`], a fixed parameter schema,
//! and a deterministic [`run`](Operator::run) transform.
//!
//! # Parameters
//!
//! Concrete operators keep parameters in typed fields and expose typed
//! setters. The string-keyed [`set_param`](Operator::set_param) and
//! [`param`](Operator::param) are provided on top of three hooks:
//!
//! - [`param_specs`](Operator::param_specs) - the schema
//! - [`apply_param`](Operator::apply_param) - stores an already type-checked
//!   value and recomputes dependent state (e.g. resizes the signature)
//! - [`param_value`](Operator::param_value) - current value, `None` if unset
//!
//! # Implementing
//!
//! ```rust
//! use ipp_core::{FormatTag, ImageData};
//! use ipp_pipeline::{Operator, PipelineResult, Signature};
//!
//! struct Invert {
//!     signature: Signature,
//! }
//!
//! impl Operator for Invert {
//!     fn type_name(&self) -> &'static str {
//!         "Invert"
//!     }
//!
//!     fn signature(&self) -> &Signature {
//!         &self.signature
//!     }
//!
//!     fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
//!         Ok(inputs.iter().map(|img| img.map(|v| 255.0 - v)).collect())
//!     }
//! }
//!
//! let op = Invert {
//!     signature: Signature::new(vec![FormatTag::Universal], vec![FormatTag::Universal]),
//! };
//! let out = op.run(vec![ImageData::filled(1, 1, 1, 55).unwrap()]).unwrap();
//! assert_eq!(out[0].to_u8(), vec![200]);
//! ```

use crate::param::{find_spec, ParamSpec, ParamValue};
use crate::{PipelineError, PipelineResult};
use ipp_core::{FormatTag, ImageData};
use tracing::trace;

/// Ordered input and output port formats of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    inputs: Vec<FormatTag>,
    outputs: Vec<FormatTag>,
}

impl Signature {
    /// Creates a signature.
    pub fn new(inputs: Vec<FormatTag>, outputs: Vec<FormatTag>) -> Self {
        Self { inputs, outputs }
    }

    /// Input port formats.
    #[inline]
    pub fn inputs(&self) -> &[FormatTag] {
        &self.inputs
    }

    /// Output port formats.
    #[inline]
    pub fn outputs(&self) -> &[FormatTag] {
        &self.outputs
    }

    /// Replaces the input ports. Meant for operators adjusting themselves
    /// after a parameter change.
    pub fn set_inputs(&mut self, inputs: Vec<FormatTag>) {
        self.inputs = inputs;
    }

    /// Replaces the output ports. Meant for operators adjusting themselves
    /// after a parameter change.
    pub fn set_outputs(&mut self, outputs: Vec<FormatTag>) {
        self.outputs = outputs;
    }
}

/// A parameterized image transform with typed ports.
///
/// Operators are built standalone and moved into a
/// [`Pipeline`](crate::Pipeline) on insertion; the pipeline does all bus
/// access, so an operator never sees buses.
pub trait Operator: Send + Sync {
    /// Type name, e.g. `"ChannelFork"`. Used in error messages and registries.
    fn type_name(&self) -> &'static str;

    /// Current port formats.
    fn signature(&self) -> &Signature;

    /// Parameter schema. Fixed for the lifetime of the operator.
    fn param_specs(&self) -> &'static [ParamSpec] {
        &[]
    }

    /// Current value of `name`, or `None` if it was never set.
    fn param_value(&self, name: &str) -> Option<ParamValue> {
        let _ = name;
        None
    }

    /// Stores a value whose name and kind were already checked against
    /// [`param_specs`](Self::param_specs), and updates dependent state.
    ///
    /// Implementations may still reject the value with
    /// [`PipelineError::InvalidParam`]; the previous value must then be kept.
    fn apply_param(&mut self, name: &str, value: ParamValue) -> PipelineResult<()> {
        let _ = value;
        Err(PipelineError::unknown_param(self.type_name(), name))
    }

    /// The transform.
    ///
    /// Must return exactly one image per output port, each with a channel
    /// count admitted by that port's format. The default implementation fails
    /// with [`PipelineError::NotImplemented`].
    fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
        let _ = inputs;
        Err(PipelineError::NotImplemented {
            operator: self.type_name().to_string(),
        })
    }

    /// Input port formats.
    fn input_formats(&self) -> &[FormatTag] {
        self.signature().inputs()
    }

    /// Output port formats.
    fn output_formats(&self) -> &[FormatTag] {
        self.signature().outputs()
    }

    /// Sets a parameter by name.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnknownParam`] if `name` is not in the schema
    /// - [`PipelineError::TypeMismatch`] if the value has the wrong kind
    /// - [`PipelineError::InvalidParam`] if the operator rejects the value
    ///
    /// On error the previous value is unchanged.
    fn set_param(&mut self, name: &str, value: ParamValue) -> PipelineResult<()> {
        let spec = find_spec(self.param_specs(), name)
            .ok_or_else(|| PipelineError::unknown_param(self.type_name(), name))?;
        if value.kind() != spec.kind {
            return Err(PipelineError::TypeMismatch {
                operator: self.type_name().to_string(),
                param: name.to_string(),
                expected: spec.kind,
                got: value.kind(),
            });
        }
        trace!(operator = self.type_name(), param = name, ?value, "set_param");
        self.apply_param(name, value)
    }

    /// Reads a parameter by name.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnknownParam`] if `name` is not in the schema
    /// - [`PipelineError::UndefinedParam`] if it was never set
    fn param(&self, name: &str) -> PipelineResult<ParamValue> {
        if find_spec(self.param_specs(), name).is_none() {
            return Err(PipelineError::unknown_param(self.type_name(), name));
        }
        self.param_value(name)
            .ok_or_else(|| PipelineError::undefined_param(self.type_name(), name))
    }
}
