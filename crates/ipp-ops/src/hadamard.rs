//! Element-wise (Hadamard) product of an image and a mask.
//!
//! The mask is resampled to the image size with [`Filter::Bilinear`], then
//! optionally normalized so its maximum becomes 1, and multiplied sample by
//! sample into the image. For three channel formats the normalization is
//! either uniform (one maximum over all channels) or per channel.
//!
//! A mask, or mask channel, whose maximum is zero is left as is: the result
//! is a black image rather than a division by zero.

use crate::resize::{resize_image, Filter};
use crate::{check_inputs, clip, OpsError};
use ipp_core::{FormatTag, ImageData};
use ipp_pipeline::{
    Operator, ParamKind, ParamSpec, ParamValue, PipelineError, PipelineResult, Signature,
};
use tracing::trace;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("normalize_mask", ParamKind::Bool),
    ParamSpec::new("uniform_normalization", ParamKind::Bool),
    ParamSpec::new("clipping", ParamKind::Bool),
];

/// Multiplies an image by a mask.
///
/// `[format, format] => <Hadamard> => [format]` with inputs `[image, mask]`.
///
/// | param                   | kind   | default |
/// |-------------------------|--------|---------|
/// | `normalize_mask`        | `bool` | `true`  |
/// | `uniform_normalization` | `bool` | `true`  |
/// | `clipping`              | `bool` | `false` |
#[derive(Debug, Clone)]
pub struct Hadamard {
    signature: Signature,
    format: FormatTag,
    normalize_mask: bool,
    uniform_normalization: bool,
    clipping: bool,
}

impl Hadamard {
    /// Creates a Hadamard product for buses of `format`.
    pub fn new(format: FormatTag) -> Self {
        Self {
            signature: Signature::new(vec![format, format], vec![format]),
            format,
            normalize_mask: true,
            uniform_normalization: true,
            clipping: false,
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

    /// Scale the mask so its maximum is 1 before multiplying.
    pub fn set_normalize_mask(&mut self, enabled: bool) {
        self.normalize_mask = enabled;
    }

    /// One maximum for all channels (`true`) or one per channel (`false`).
    /// Only meaningful for three channel formats.
    pub fn set_uniform_normalization(&mut self, enabled: bool) {
        self.uniform_normalization = enabled;
    }

    /// Enables or disables saturation to `[0, 255]`.
    pub fn set_clipping(&mut self, enabled: bool) {
        self.clipping = enabled;
    }

    fn normalized(&self, mask: Vec<f32>, channels: usize) -> Vec<f32> {
        if !self.normalize_mask {
            return mask;
        }
        if self.format.is_triple() && !self.uniform_normalization {
            let mut maxima = vec![f32::MIN; channels];
            for px in mask.chunks_exact(channels) {
                for (m, &v) in maxima.iter_mut().zip(px) {
                    *m = m.max(v);
                }
            }
            let mut mask = mask;
            for px in mask.chunks_exact_mut(channels) {
                for (v, &m) in px.iter_mut().zip(&maxima) {
                    if m != 0.0 {
                        *v /= m;
                    }
                }
            }
            mask
        } else {
            let max = mask.iter().copied().fold(f32::MIN, f32::max);
            if max == 0.0 {
                return mask;
            }
            mask.into_iter().map(|v| v / max).collect()
        }
    }
}

impl Operator for Hadamard {
    fn type_name(&self) -> &'static str {
        match self.format {
            FormatTag::Channel => "ChannelHadamard",
            f if f.is_triple() => "TripleHadamard",
            _ => "Hadamard",
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
            "normalize_mask" => Some(ParamValue::Bool(self.normalize_mask)),
            "uniform_normalization" => Some(ParamValue::Bool(self.uniform_normalization)),
            "clipping" => Some(ParamValue::Bool(self.clipping)),
            _ => None,
        }
    }

    fn apply_param(&mut self, name: &str, value: ParamValue) -> PipelineResult<()> {
        match (name, value) {
            ("normalize_mask", ParamValue::Bool(v)) => self.set_normalize_mask(v),
            ("uniform_normalization", ParamValue::Bool(v)) => self.set_uniform_normalization(v),
            ("clipping", ParamValue::Bool(v)) => self.set_clipping(v),
            _ => return Err(PipelineError::unknown_param(self.type_name(), name)),
        }
        Ok(())
    }

    fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
        check_inputs(self.type_name(), &inputs, 2)?;
        let (image, mask) = (&inputs[0], &inputs[1]);
        if image.channels() != mask.channels() {
            return Err(OpsError::SizeMismatch(format!(
                "image has {} channels, mask has {}",
                image.channels(),
                mask.channels()
            ))
            .into());
        }
        trace!(
            width = image.width(),
            height = image.height(),
            mask_width = mask.width(),
            mask_height = mask.height(),
            "hadamard"
        );

        let mask = resize_image(mask, image.width(), image.height(), Filter::Bilinear)?;
        let mask = self.normalized(mask.to_f32(), image.channels() as usize);

        let data: Vec<f32> = image
            .to_f32()
            .into_iter()
            .zip(mask)
            .map(|(v, m)| if self.clipping { clip(v * m) } else { v * m })
            .collect();
        let (w, h) = image.dimensions();
        let out = ImageData::from_f32(w, h, image.channels(), data).map_err(OpsError::from)?;
        Ok(vec![out])
    }
}
