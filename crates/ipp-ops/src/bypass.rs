//! Pass-through operator.

use crate::check_inputs;
use ipp_core::{FormatTag, ImageData};
use ipp_pipeline::{Operator, PipelineResult, Signature};

/// Forwards its single input unchanged.
///
/// `[format] => <Bypass> => [format]`
#[derive(Debug, Clone)]
pub struct Bypass {
    signature: Signature,
}

impl Bypass {
    /// Creates a bypass for buses of `format`.
    pub fn new(format: FormatTag) -> Self {
        Self {
            signature: Signature::new(vec![format], vec![format]),
        }
    }
}

impl Default for Bypass {
    fn default() -> Self {
        Self::new(FormatTag::Universal)
    }
}

impl Operator for Bypass {
    fn type_name(&self) -> &'static str {
        match self.signature.inputs()[0] {
            FormatTag::Channel => "ChannelBypass",
            f if f.is_triple() => "TripleBypass",
            _ => "Bypass",
        }
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
        check_inputs(self.type_name(), &inputs, 1)?;
        Ok(inputs)
    }
}
