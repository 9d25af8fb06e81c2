//! Single-assignment data channels between operators.
//!
//! A [`Bus`] holds at most one image per run. Writing twice without a
//! [`reset`](Bus::reset) is a [`BusOverflow`](PipelineError::BusOverflow);
//! reading before anything was written is an
//! [`EmptyBus`](PipelineError::EmptyBus).
//!
//! ```rust
//! use ipp_core::{FormatTag, ImageData};
//! use ipp_pipeline::Bus;
//!
//! let mut bus = Bus::new("input", FormatTag::Channel);
//! bus.write(ImageData::filled(4, 4, 1, 7).unwrap()).unwrap();
//! assert!(bus.write(ImageData::filled(4, 4, 1, 7).unwrap()).is_err());
//!
//! bus.reset();
//! assert!(bus.read().is_err());
//! ```

use crate::{PipelineError, PipelineResult};
use ipp_core::{FormatTag, ImageData};

/// Named, typed, single-slot channel.
#[derive(Debug, Clone)]
pub struct Bus {
    name: String,
    format: FormatTag,
    payload: Option<ImageData>,
}

impl Bus {
    /// Creates an empty bus.
    pub fn new(name: impl Into<String>, format: FormatTag) -> Self {
        Self {
            name: name.into(),
            format,
            payload: None,
        }
    }

    /// Bus name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format tag of the data this bus carries.
    #[inline]
    pub fn format(&self) -> FormatTag {
        self.format
    }

    /// Returns `true` if nothing was written since the last reset.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    /// Stores `value`, quantized to 8-bit samples.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::BusOverflow`] if the bus already holds a value
    /// - [`PipelineError::BusShape`] if the format does not admit the image's
    ///   channel count
    pub fn write(&mut self, value: ImageData) -> PipelineResult<()> {
        if self.payload.is_some() {
            return Err(PipelineError::BusOverflow {
                bus: self.name.clone(),
            });
        }
        if !self.format.admits_channels(value.channels()) {
            return Err(PipelineError::BusShape {
                bus: self.name.clone(),
                format: self.format,
                channels: value.channels(),
            });
        }
        self.payload = Some(value.into_quantized());
        Ok(())
    }

    /// Returns the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyBus`] if nothing was written.
    pub fn read(&self) -> PipelineResult<&ImageData> {
        self.payload.as_ref().ok_or_else(|| PipelineError::EmptyBus {
            bus: self.name.clone(),
        })
    }

    /// Removes and returns the stored value, leaving the bus empty.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyBus`] if nothing was written.
    pub fn take(&mut self) -> PipelineResult<ImageData> {
        self.payload.take().ok_or_else(|| PipelineError::EmptyBus {
            bus: self.name.clone(),
        })
    }

    /// Clears the payload. Calling it on an empty bus does nothing.
    #[inline]
    pub fn reset(&mut self) {
        self.payload = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(value: u8) -> ImageData {
        ImageData::filled(3, 2, 1, value).unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let mut bus = Bus::new("in", FormatTag::Channel);
        assert!(bus.is_empty());
        bus.write(image(9)).unwrap();
        assert!(!bus.is_empty());
        assert_eq!(bus.read().unwrap().to_u8(), vec![9; 6]);
        // Reads don't consume.
        assert!(bus.read().is_ok());
    }

    #[test]
    fn test_double_write_overflows() {
        let mut bus = Bus::new("in", FormatTag::Channel);
        bus.write(image(1)).unwrap();
        let err = bus.write(image(2)).unwrap_err();
        assert!(matches!(err, PipelineError::BusOverflow { ref bus } if bus == "in"));
        // First value survives.
        assert_eq!(bus.read().unwrap().to_u8(), vec![1; 6]);
    }

    #[test]
    fn test_empty_read_fails() {
        let bus = Bus::new("in", FormatTag::Triple);
        assert!(matches!(bus.read(), Err(PipelineError::EmptyBus { .. })));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut bus = Bus::new("in", FormatTag::Channel);
        bus.write(image(3)).unwrap();
        bus.reset();
        bus.reset();
        assert!(bus.is_empty());
        bus.write(image(4)).unwrap();
        assert_eq!(bus.read().unwrap().to_u8(), vec![4; 6]);
    }

    #[test]
    fn test_write_quantizes() {
        let mut bus = Bus::new("in", FormatTag::Channel);
        let value = ImageData::from_f32(3, 1, 1, vec![-5.0, 99.7, 512.0]).unwrap();
        bus.write(value).unwrap();
        let stored = bus.read().unwrap();
        assert!(stored.is_quantized());
        assert_eq!(stored.to_u8(), vec![0, 99, 255]);
    }

    #[test]
    fn test_write_checks_channels() {
        let mut bus = Bus::new("any", FormatTag::Universal);
        let rgba = ImageData::filled(2, 2, 4, 0).unwrap();
        assert!(matches!(
            bus.write(rgba),
            Err(PipelineError::BusShape { channels: 4, .. })
        ));
        assert!(bus.is_empty());

        let mut bus = Bus::new("planes", FormatTag::Channel);
        assert!(bus.write(ImageData::filled(2, 2, 3, 0).unwrap()).is_err());
        bus.write(image(1)).unwrap();
    }

    #[test]
    fn test_take_empties() {
        let mut bus = Bus::new("out", FormatTag::Channel);
        bus.write(image(5)).unwrap();
        assert_eq!(bus.take().unwrap().to_u8(), vec![5; 6]);
        assert!(bus.is_empty());
        assert!(bus.take().is_err());
    }
}
