//! Conversion between three channel images and their single channel planes.

use crate::{check_inputs, OpsError};
use ipp_core::{FormatTag, ImageData};
use ipp_pipeline::{Operator, PipelineResult, Signature};
use tracing::trace;

/// Splits a three channel image into its planes.
///
/// `[Triple] => <Split> => [Channel, Channel, Channel]`
#[derive(Debug, Clone)]
pub struct Split {
    signature: Signature,
}

impl Split {
    /// Creates a splitter.
    pub fn new() -> Self {
        Self {
            signature: Signature::new(vec![FormatTag::Triple], vec![FormatTag::Channel; 3]),
        }
    }
}

impl Default for Split {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for Split {
    fn type_name(&self) -> &'static str {
        "Split"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
        check_inputs(self.type_name(), &inputs, 1)?;
        let input = &inputs[0];
        if input.channels() != 3 {
            let err = ipp_core::Error::channel_mismatch(3, input.channels());
            return Err(OpsError::from(err).into());
        }
        trace!(width = input.width(), height = input.height(), "split");
        Ok((0..3)
            .map(|c| input.channel(c))
            .collect::<Result<Vec<_>, _>>()
            .map_err(OpsError::from)?)
    }
}

/// Interleaves three planes into one image.
///
/// `[Channel, Channel, Channel] => <Merge> => [Triple]`
#[derive(Debug, Clone)]
pub struct Merge {
    signature: Signature,
}

impl Merge {
    /// Creates a merger.
    pub fn new() -> Self {
        Self {
            signature: Signature::new(vec![FormatTag::Channel; 3], vec![FormatTag::Triple]),
        }
    }
}

impl Default for Merge {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for Merge {
    fn type_name(&self) -> &'static str {
        "Merge"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
        check_inputs(self.type_name(), &inputs, 3)?;
        let planes: Vec<&ImageData> = inputs.iter().collect();
        if let Some(odd) = planes.iter().find(|p| !p.same_size(planes[0])) {
            return Err(OpsError::SizeMismatch(format!(
                "merge planes differ: {}x{} vs {}x{}",
                planes[0].width(),
                planes[0].height(),
                odd.width(),
                odd.height()
            ))
            .into());
        }
        trace!(width = planes[0].width(), height = planes[0].height(), "merge");
        let merged = ImageData::from_planes(&planes).map_err(OpsError::from)?;
        Ok(vec![merged])
    }
}
