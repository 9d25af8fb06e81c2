//! Scaling around an offset.
//!
//! `out = clip((in - offset) * value + offset)`. With the default offset of
//! 127 this is a contrast control: `value > 1` pushes samples away from mid
//! grey, `value < 1` pulls them towards it.

use crate::{check_inputs, clip};
use ipp_core::{FormatTag, ImageData};
use ipp_pipeline::{
    Operator, ParamKind, ParamSpec, ParamValue, PipelineError, PipelineResult, Signature,
};
use tracing::trace;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("value", ParamKind::Float),
    ParamSpec::new("offset", ParamKind::Float),
    ParamSpec::new("clipping", ParamKind::Bool),
];

/// Multiplies every sample's distance from `offset` by `value`.
///
/// `[format] => <Product> => [format]`
///
/// | param      | kind    | default |
/// |------------|---------|---------|
/// | `value`    | `float` | `0.0`   |
/// | `offset`   | `float` | `127.0` |
/// | `clipping` | `bool`  | `true`  |
#[derive(Debug, Clone)]
pub struct Product {
    signature: Signature,
    value: f64,
    offset: f64,
    clipping: bool,
}

impl Product {
    /// Creates a product for buses of `format`.
    pub fn new(format: FormatTag) -> Self {
        Self {
            signature: Signature::new(vec![format], vec![format]),
            value: 0.0,
            offset: 127.0,
            clipping: true,
        }
    }

    /// Sets the multiplier.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Sets the fixed point of the scaling.
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    /// Enables or disables saturation to `[0, 255]`.
    pub fn set_clipping(&mut self, clipping: bool) {
        self.clipping = clipping;
    }

    /// Multiplier.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Fixed point.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Whether results are saturated.
    pub fn clipping(&self) -> bool {
        self.clipping
    }
}

impl Default for Product {
    fn default() -> Self {
        Self::new(FormatTag::Universal)
    }
}

impl Operator for Product {
    fn type_name(&self) -> &'static str {
        match self.signature.inputs()[0] {
            FormatTag::Channel => "ChannelProduct",
            f if f.is_triple() => "TripleProduct",
            _ => "Product",
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
            "value" => Some(ParamValue::Float(self.value)),
            "offset" => Some(ParamValue::Float(self.offset)),
            "clipping" => Some(ParamValue::Bool(self.clipping)),
            _ => None,
        }
    }

    fn apply_param(&mut self, name: &str, value: ParamValue) -> PipelineResult<()> {
        match (name, value) {
            ("value", ParamValue::Float(v)) => self.set_value(v),
            ("offset", ParamValue::Float(v)) => self.set_offset(v),
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
            offset = self.offset,
            "product"
        );
        let (m, o) = (self.value as f32, self.offset as f32);
        let out = if self.clipping {
            input.map(|v| clip((v - o) * m + o))
        } else {
            input.map(|v| (v - o) * m + o)
        };
        Ok(vec![out])
    }
}
