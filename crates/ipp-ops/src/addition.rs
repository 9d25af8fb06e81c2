//! Constant addition.
//!
//! `out = clip(in + value)`, where `clip` saturates to `[0, 255]` unless
//! clipping is disabled.

use crate::{check_inputs, clip};
use ipp_core::{FormatTag, ImageData};
use ipp_pipeline::{
    Operator, ParamKind, ParamSpec, ParamValue, PipelineError, PipelineResult, Signature,
};
use tracing::trace;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("value", ParamKind::Int),
    ParamSpec::new("clipping", ParamKind::Bool),
];

/// Adds an integer to every sample.
///
/// `[format] => <Addition> => [format]`
///
/// | param      | kind   | default |
/// |------------|--------|---------|
/// | `value`    | `int`  | `0`     |
/// | `clipping` | `bool` | `true`  |
#[derive(Debug, Clone)]
pub struct Addition {
    signature: Signature,
    value: i64,
    clipping: bool,
}

impl Addition {
    /// Creates an addition for buses of `format`.
    pub fn new(format: FormatTag) -> Self {
        Self {
            signature: Signature::new(vec![format], vec![format]),
            value: 0,
            clipping: true,
        }
    }

    /// Sets the added value.
    pub fn set_value(&mut self, value: i64) {
        self.value = value;
    }

    /// Enables or disables saturation to `[0, 255]`.
    pub fn set_clipping(&mut self, clipping: bool) {
        self.clipping = clipping;
    }

    /// Added value.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Whether results are saturated.
    pub fn clipping(&self) -> bool {
        self.clipping
    }
}

impl Default for Addition {
    fn default() -> Self {
        Self::new(FormatTag::Universal)
    }
}

impl Operator for Addition {
    fn type_name(&self) -> &'static str {
        match self.signature.inputs()[0] {
            FormatTag::Channel => "ChannelAddition",
            f if f.is_triple() => "TripleAddition",
            _ => "Addition",
        }
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn param_value(&self, name: &str) -> Option<ParamValue> {
        match name {
            "value" => Some(ParamValue::Int(self.value)),
            "clipping" => Some(ParamValue::Bool(self.clipping)),
            _ => None,
        }
    }

    fn apply_param(&mut self, name: &str, value: ParamValue) -> PipelineResult<()> {
        match (name, value) {
            ("value", ParamValue::Int(v)) => self.set_value(v),
            ("clipping", ParamValue::Bool(v)) => self.set_clipping(v),
            _ => return Err(PipelineError::unknown_param(self.type_name(), name)),
        }
        Ok(())
    }

    fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
        check_inputs(self.type_name(), &inputs, 1)?;
        let input = &inputs[0];
        trace!(
            width = input.width(),
            height = input.height(),
            value = self.value,
            clipping = self.clipping,
            "addition"
        );
        let add = self.value as f32;
        let out = if self.clipping {
            input.map(|v| clip(v + add))
        } else {
            input.map(|v| v + add)
        };
        Ok(vec![out])
    }
}
