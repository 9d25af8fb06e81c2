//! Image values carried by buses.
//!
//! [`ImageData`] is a rectangular `[height][width][channels]` sample array in
//! row-major, channel-interleaved order:
//!
//! ```text
//! Memory: [c0 c1 c2 c0 c1 c2 ...]  <- Row 0
//!         [c0 c1 c2 c0 c1 c2 ...]  <- Row 1
//! ```
//!
//! Samples live either as 8-bit values ([`PixelData::U8`]), which is what a
//! bus stores, or as `f32` values on the 0..255 scale ([`PixelData::F32`]),
//! which is what arithmetic operators produce before quantization. A single
//! channel image is the `[height][width]` case with `channels == 1`.
//!
//! # Usage
//!
//! ```rust
//! use ipp_core::ImageData;
//!
//! let img = ImageData::from_u8(2, 1, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
//! assert_eq!(img.shape(), (1, 2, 3));
//! assert_eq!(img.sample(0, 1, 2), 6.0);
//!
//! let green = img.channel(1).unwrap();
//! assert_eq!(green.to_u8(), vec![2, 5]);
//! ```

use crate::{Error, Result};

/// Raw sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    /// 8-bit unsigned samples.
    U8(Vec<u8>),
    /// Unquantized samples on the 0..255 scale, possibly out of range.
    F32(Vec<f32>),
}

impl PixelData {
    /// Number of samples stored.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::F32(v) => v.len(),
        }
    }

    /// Returns `true` if no samples are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Quantizes one sample the way a bus stores it: truncation toward zero,
/// saturating at 0 and 255 (NaN maps to 0).
#[inline]
pub fn quantize(v: f32) -> u8 {
    v as u8
}

/// Rectangular image with 1 or more interleaved channels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    width: u32,
    height: u32,
    channels: u32,
    data: PixelData,
}

impl ImageData {
    fn sample_len(width: u32, height: u32, channels: u32) -> Result<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(channels as usize))
            .ok_or_else(|| {
                Error::invalid_dimensions(width, height, channels, "image dimensions overflow")
            })
    }

    fn check_shape(width: u32, height: u32, channels: u32, len: usize) -> Result<()> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(Error::invalid_dimensions(
                width,
                height,
                channels,
                "width, height and channels must be > 0",
            ));
        }
        let expected = Self::sample_len(width, height, channels)?;
        if len != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                channels,
                format!("expected {expected} elements, got {len}"),
            ));
        }
        Ok(())
    }

    /// Creates an image from 8-bit samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if any dimension is zero or the
    /// data length doesn't match `width * height * channels`.
    pub fn from_u8(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Result<Self> {
        Self::check_shape(width, height, channels, data.len())?;
        Ok(Self {
            width,
            height,
            channels,
            data: PixelData::U8(data),
        })
    }

    /// Creates an image from unquantized `f32` samples (0..255 scale).
    ///
    /// # Errors
    ///
    /// Same conditions as [`from_u8`](Self::from_u8).
    pub fn from_f32(width: u32, height: u32, channels: u32, data: Vec<f32>) -> Result<Self> {
        Self::check_shape(width, height, channels, data.len())?;
        Ok(Self {
            width,
            height,
            channels,
            data: PixelData::F32(data),
        })
    }

    /// Creates an 8-bit image where every sample is `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if any dimension is zero or the
    /// sample count overflows `usize`.
    pub fn filled(width: u32, height: u32, channels: u32, value: u8) -> Result<Self> {
        let len = Self::sample_len(width, height, channels)?;
        Self::from_u8(width, height, channels, vec![value; len])
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channels per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns `(height, width, channels)`, the array shape.
    #[inline]
    pub fn shape(&self) -> (u32, u32, u32) {
        (self.height, self.width, self.channels)
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Total number of samples (pixels * channels).
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.pixel_count() * self.channels as usize
    }

    /// Raw sample storage.
    #[inline]
    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// Returns the 8-bit samples, or `None` if the image is unquantized.
    #[inline]
    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            PixelData::U8(v) => Some(v),
            PixelData::F32(_) => None,
        }
    }

    /// Returns `true` if samples are stored as 8-bit values.
    #[inline]
    pub fn is_quantized(&self) -> bool {
        matches!(self.data, PixelData::U8(_))
    }

    /// Sample at row `y`, column `x`, channel `c`, as `f32`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn sample(&self, y: u32, x: u32, c: u32) -> f32 {
        debug_assert!(y < self.height && x < self.width && c < self.channels);
        let idx = (y as usize * self.width as usize + x as usize) * self.channels as usize
            + c as usize;
        match &self.data {
            PixelData::U8(v) => v[idx] as f32,
            PixelData::F32(v) => v[idx],
        }
    }

    /// Samples converted to `f32` without rescaling (0..255 stays 0..255).
    pub fn to_f32(&self) -> Vec<f32> {
        match &self.data {
            PixelData::U8(v) => v.iter().map(|&s| s as f32).collect(),
            PixelData::F32(v) => v.clone(),
        }
    }

    /// Samples quantized to 8 bits with [`quantize`].
    pub fn to_u8(&self) -> Vec<u8> {
        match &self.data {
            PixelData::U8(v) => v.clone(),
            PixelData::F32(v) => v.iter().map(|&s| quantize(s)).collect(),
        }
    }

    /// Returns an 8-bit copy of this image.
    pub fn quantized(&self) -> ImageData {
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: PixelData::U8(self.to_u8()),
        }
    }

    /// Converts into an 8-bit image, reusing the buffer when already 8-bit.
    pub fn into_quantized(self) -> ImageData {
        match self.data {
            PixelData::U8(_) => self,
            PixelData::F32(v) => Self {
                width: self.width,
                height: self.height,
                channels: self.channels,
                data: PixelData::U8(v.into_iter().map(quantize).collect()),
            },
        }
    }

    /// Returns `true` if `other` has the same width and height.
    #[inline]
    pub fn same_size(&self, other: &ImageData) -> bool {
        self.dimensions() == other.dimensions()
    }

    /// Extracts channel `c` as a single channel image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelOutOfRange`] if `c >= channels`.
    pub fn channel(&self, c: u32) -> Result<ImageData> {
        if c >= self.channels {
            return Err(Error::ChannelOutOfRange {
                channel: c,
                channels: self.channels,
            });
        }
        let step = self.channels as usize;
        let offset = c as usize;
        let data = match &self.data {
            PixelData::U8(v) => {
                PixelData::U8(v.iter().skip(offset).step_by(step).copied().collect())
            }
            PixelData::F32(v) => {
                PixelData::F32(v.iter().skip(offset).step_by(step).copied().collect())
            }
        };
        Ok(Self {
            width: self.width,
            height: self.height,
            channels: 1,
            data,
        })
    }

    /// Interleaves single channel planes into one multi-channel image.
    ///
    /// The result is 8-bit when every plane is 8-bit, `f32` otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDimensions`] if `planes` is empty
    /// - [`Error::ChannelMismatch`] if a plane has more than one channel
    /// - [`Error::DimensionMismatch`] if plane sizes differ
    pub fn from_planes(planes: &[&ImageData]) -> Result<ImageData> {
        let Some(first) = planes.first() else {
            return Err(Error::invalid_dimensions(0, 0, 0, "no planes to merge"));
        };
        for plane in planes {
            if plane.channels != 1 {
                return Err(Error::channel_mismatch(1, plane.channels));
            }
            if !plane.same_size(first) {
                return Err(Error::dimension_mismatch(
                    first.dimensions(),
                    plane.dimensions(),
                ));
            }
        }

        let channels = planes.len() as u32;
        let pixels = first.pixel_count();
        if planes.iter().all(|p| p.is_quantized()) {
            let sources: Vec<&[u8]> = planes.iter().filter_map(|p| p.as_u8()).collect();
            let mut data = Vec::with_capacity(pixels * sources.len());
            for i in 0..pixels {
                data.extend(sources.iter().map(|s| s[i]));
            }
            Self::from_u8(first.width, first.height, channels, data)
        } else {
            let sources: Vec<Vec<f32>> = planes.iter().map(|p| p.to_f32()).collect();
            let mut data = Vec::with_capacity(pixels * sources.len());
            for i in 0..pixels {
                data.extend(sources.iter().map(|s| s[i]));
            }
            Self::from_f32(first.width, first.height, channels, data)
        }
    }

    /// Applies `f` to every sample, producing an unquantized image.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> ImageData {
        let data = match &self.data {
            PixelData::U8(v) => v.iter().map(|&s| f(s as f32)).collect(),
            PixelData::F32(v) => v.iter().map(|&s| f(s)).collect(),
        };
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: PixelData::F32(data),
        }
    }
}
