//! Fan-out and weighted fan-in.
//!
//! A [`Fork`] copies its input to `number_of_outputs` buses; a [`Blend`]
//! computes the weighted sum of `number_of_inputs` buses with weights
//! normalized by their sum. Changing either count resizes the operator's
//! signature, so the bus bindings must be updated to match before the next
//! run.

use crate::{check_inputs, OpsError};
use ipp_core::{FormatTag, ImageData};
use ipp_pipeline::{
    Operator, ParamKind, ParamSpec, ParamValue, PipelineError, PipelineResult, Signature,
};
use tracing::trace;

const FORK_PARAMS: &[ParamSpec] = &[ParamSpec::new("number_of_outputs", ParamKind::Int)];

const BLEND_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("number_of_inputs", ParamKind::Int),
    ParamSpec::new("weights", ParamKind::List),
];

/// Checks a port count coming from an `Int` parameter.
fn port_count(operator: &str, param: &str, value: i64) -> PipelineResult<usize> {
    if value < 1 {
        return Err(PipelineError::invalid_param(
            operator,
            param,
            format!("must be at least 1, got {value}"),
        ));
    }
    usize::try_from(value)
        .map_err(|_| PipelineError::invalid_param(operator, param, "too large"))
}

/// Copies its input to every output.
///
/// `[format] => <Fork> => [format] * number_of_outputs`
#[derive(Debug, Clone)]
pub struct Fork {
    signature: Signature,
    format: FormatTag,
}

impl Fork {
    /// Creates a two-way fork for buses of `format`.
    pub fn new(format: FormatTag) -> Self {
        Self {
            signature: Signature::new(vec![format], vec![format; 2]),
            format,
        }
    }

    /// Single channel variant.
    pub fn channel() -> Self {
        Self::new(FormatTag::Channel)
    }

    /// Three channel variant.
    pub fn triple() -> Self {
        Self::new(FormatTag::Triple)
    }

    /// Number of outputs.
    pub fn outputs(&self) -> usize {
        self.signature.outputs().len()
    }

    /// Resizes the output list.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidParam`] if `n` is zero.
    pub fn set_outputs(&mut self, n: usize) -> PipelineResult<()> {
        if n == 0 {
            return Err(PipelineError::invalid_param(
                self.type_name(),
                "number_of_outputs",
                "must be at least 1, got 0",
            ));
        }
        self.signature.set_outputs(vec![self.format; n]);
        Ok(())
    }
}

impl Operator for Fork {
    fn type_name(&self) -> &'static str {
        match self.format {
            FormatTag::Channel => "ChannelFork",
            f if f.is_triple() => "TripleFork",
            _ => "Fork",
        }
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        FORK_PARAMS
    }

    fn param_value(&self, name: &str) -> Option<ParamValue> {
        (name == "number_of_outputs").then(|| ParamValue::from(self.outputs()))
    }

    fn apply_param(&mut self, name: &str, value: ParamValue) -> PipelineResult<()> {
        match (name, value) {
            ("number_of_outputs", ParamValue::Int(v)) => {
                let n = port_count(self.type_name(), name, v)?;
                self.set_outputs(n)
            }
            _ => Err(PipelineError::unknown_param(self.type_name(), name)),
        }
    }

    fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
        check_inputs(self.type_name(), &inputs, 1)?;
        let input = &inputs[0];
        trace!(
            width = input.width(),
            height = input.height(),
            outputs = self.outputs(),
            "fork"
        );
        Ok(vec![input.clone(); self.outputs()])
    }
}

/// Weighted sum of its inputs.
///
/// `[format] * number_of_inputs => <Blend> => [format]`
///
/// `weights` has no default: running before it is set fails with
/// [`PipelineError::UndefinedParam`].
#[derive(Debug, Clone)]
pub struct Blend {
    signature: Signature,
    format: FormatTag,
    weights: Option<Vec<f64>>,
}

impl Blend {
    /// Creates a two-input blend for buses of `format`.
    pub fn new(format: FormatTag) -> Self {
        Self {
            signature: Signature::new(vec![format; 2], vec![format]),
            format,
            weights: None,
        }
    }

    /// Single channel variant.
    pub fn channel() -> Self {
        Self::new(FormatTag::Channel)
    }

    /// Three channel variant.
    pub fn triple() -> Self {
        Self::new(FormatTag::Triple)
    }

    /// Number of inputs.
    pub fn inputs(&self) -> usize {
        self.signature.inputs().len()
    }

    /// Resizes the input list.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidParam`] if `n` is zero.
    pub fn set_inputs(&mut self, n: usize) -> PipelineResult<()> {
        if n == 0 {
            return Err(PipelineError::invalid_param(
                self.type_name(),
                "number_of_inputs",
                "must be at least 1, got 0",
            ));
        }
        self.signature.set_inputs(vec![self.format; n]);
        Ok(())
    }

    /// Sets the raw weights; they are normalized by their sum on every run.
    pub fn set_weights(&mut self, weights: Vec<f64>) {
        self.weights = Some(weights);
    }

    /// Raw weights, if set.
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }
}

impl Operator for Blend {
    fn type_name(&self) -> &'static str {
        match self.format {
            FormatTag::Channel => "ChannelBlend",
            f if f.is_triple() => "TripleBlend",
            _ => "Blend",
        }
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        BLEND_PARAMS
    }

    fn param_value(&self, name: &str) -> Option<ParamValue> {
        match name {
            "number_of_inputs" => Some(ParamValue::from(self.inputs())),
            "weights" => self.weights.clone().map(ParamValue::from),
            _ => None,
        }
    }

    fn apply_param(&mut self, name: &str, value: ParamValue) -> PipelineResult<()> {
        match (name, value) {
            ("number_of_inputs", ParamValue::Int(v)) => {
                let n = port_count(self.type_name(), name, v)?;
                self.set_inputs(n)
            }
            ("weights", ParamValue::List(items)) => {
                let weights = items
                    .iter()
                    .map(ParamValue::as_number)
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| {
                        PipelineError::invalid_param(
                            self.type_name(),
                            name,
                            "weights must be numbers",
                        )
                    })?;
                self.set_weights(weights);
                Ok(())
            }
            _ => Err(PipelineError::unknown_param(self.type_name(), name)),
        }
    }

    fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
        let weights = self
            .weights
            .as_deref()
            .ok_or_else(|| PipelineError::undefined_param(self.type_name(), "weights"))?;
        check_inputs(self.type_name(), &inputs, self.inputs())?;
        if weights.len() != inputs.len() {
            return Err(OpsError::InvalidParameter(format!(
                "{} weights for {} inputs",
                weights.len(),
                inputs.len()
            ))
            .into());
        }
        let total: f64 = weights.iter().sum();
        if total == 0.0 {
            return Err(OpsError::InvalidParameter("weights sum to zero".into()).into());
        }

        let first = &inputs[0];
        if let Some(odd) = inputs.iter().find(|img| img.shape() != first.shape()) {
            return Err(OpsError::SizeMismatch(format!(
                "blend inputs differ: {:?} vs {:?}",
                first.shape(),
                odd.shape()
            ))
            .into());
        }
        trace!(
            width = first.width(),
            height = first.height(),
            inputs = inputs.len(),
            "blend"
        );

        let mut acc = vec![0.0f32; first.sample_count()];
        for (img, &w) in inputs.iter().zip(weights) {
            let w = (w / total) as f32;
            for (a, v) in acc.iter_mut().zip(img.to_f32()) {
                *a += v * w;
            }
        }
        let (width, height) = first.dimensions();
        let out = ImageData::from_f32(width, height, first.channels(), acc)
            .map_err(OpsError::from)?;
        Ok(vec![out])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fork_resizes_outputs() {
        let mut fork = Fork::channel();
        assert_eq!(fork.param("number_of_outputs").unwrap(), ParamValue::Int(2));
        fork.set_param("number_of_outputs", ParamValue::Int(5)).unwrap();
        assert_eq!(fork.output_formats(), &[FormatTag::Channel; 5]);

        let img = ImageData::filled(2, 2, 1, 3).unwrap();
        let out = fork.run(vec![img.clone()]).unwrap();
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|o| *o == img));
    }

    #[test]
    fn test_fork_rejects_zero_outputs() {
        let mut fork = Fork::triple();
        fork.set_param("number_of_outputs", ParamValue::Int(3)).unwrap();
        for bad in [0, -2] {
            assert!(matches!(
                fork.set_param("number_of_outputs", ParamValue::Int(bad)),
                Err(PipelineError::InvalidParam { .. })
            ));
        }
        assert_eq!(fork.outputs(), 3);
    }

    #[test]
    fn test_blend_weights_undefined_until_set() {
        let blend = Blend::channel();
        assert!(matches!(
            blend.param("weights"),
            Err(PipelineError::UndefinedParam { .. })
        ));
        let img = ImageData::filled(1, 1, 1, 0).unwrap();
        assert!(matches!(
            blend.run(vec![img.clone(), img]),
            Err(PipelineError::UndefinedParam { .. })
        ));
    }

    #[test]
    fn test_blend_normalizes_weights() {
        let mut blend = Blend::channel();
        blend
            .set_param("weights", ParamValue::from(vec![1, 3]))
            .unwrap();
        assert_eq!(blend.weights(), Some(&[1.0, 3.0][..]));

        let a = ImageData::filled(2, 1, 1, 0).unwrap();
        let b = ImageData::filled(2, 1, 1, 200).unwrap();
        let out = blend.run(vec![a, b]).unwrap()[0].to_f32();
        for v in out {
            assert_relative_eq!(v, 150.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_blend_resizes_inputs() {
        let mut blend = Blend::triple();
        blend.set_param("number_of_inputs", ParamValue::Int(4)).unwrap();
        assert_eq!(blend.input_formats().len(), 4);
        assert_eq!(blend.type_name(), "TripleBlend");
        assert!(blend.set_param("number_of_inputs", ParamValue::Int(0)).is_err());
        assert_eq!(blend.inputs(), 4);
    }

    #[test]
    fn test_blend_bad_weights() {
        let mut blend = Blend::channel();
        let img = ImageData::filled(1, 1, 1, 10).unwrap();

        blend.set_weights(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            blend.run(vec![img.clone(), img.clone()]),
            Err(PipelineError::Kernel(_))
        ));

        blend.set_weights(vec![1.0, -1.0]);
        let err = blend.run(vec![img.clone(), img]).unwrap_err();
        assert!(err.to_string().contains("zero"));

        assert!(matches!(
            blend.set_param("weights", ParamValue::from(vec![true, false])),
            Err(PipelineError::InvalidParam { .. })
        ));
        assert_eq!(blend.weights(), Some(&[1.0, -1.0][..]));
    }

    #[test]
    fn test_blend_rejects_mismatched_inputs() {
        let mut blend = Blend::channel();
        blend.set_weights(vec![1.0, 1.0]);
        let a = ImageData::filled(2, 2, 1, 0).unwrap();
        let b = ImageData::filled(2, 3, 1, 0).unwrap();
        assert!(blend.run(vec![a, b]).is_err());
    }
}
