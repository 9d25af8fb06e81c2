//! Image resampling.
//!
//! Used by the Hadamard operator to bring a mask to the size of the image it
//! multiplies. Sample positions follow the pixel-center convention
//! (`src = (dst + 0.5) * scale - 0.5`), clamped at the borders.
//!
//! # Example
//!
//! ```rust
//! use ipp_ops::resize::{resize_f32, Filter};
//!
//! let src = vec![0.0f32, 255.0];
//! let dst = resize_f32(&src, 2, 1, 1, 4, 1, Filter::Bilinear).unwrap();
//! assert_eq!(dst, vec![0.0, 63.75, 191.25, 255.0]);
//! ```

use crate::{OpsError, OpsResult};
use ipp_core::ImageData;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Resampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Nearest-neighbor (no interpolation).
    Nearest,
    /// Bilinear interpolation between the 4 closest samples.
    #[default]
    Bilinear,
}

/// Source index and weight of the right/bottom neighbour for one
/// destination coordinate.
#[inline]
fn bilinear_tap(dst: usize, scale: f32, src_len: usize) -> (usize, f32) {
    let pos = (dst as f32 + 0.5) * scale - 0.5;
    let floor = pos.floor();
    if floor < 0.0 {
        (0, 0.0)
    } else if floor as usize >= src_len - 1 {
        (src_len - 1, 0.0)
    } else {
        (floor as usize, pos - floor)
    }
}

#[inline]
fn nearest_tap(dst: usize, scale: f32, src_len: usize) -> usize {
    ((dst as f32 * scale).floor() as usize).min(src_len - 1)
}

/// Resizes interleaved f32 samples.
///
/// # Errors
///
/// Returns [`OpsError::InvalidDimensions`] if a size is zero or `src` does not
/// hold `src_w * src_h * channels` samples.
pub fn resize_f32(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
    filter: Filter,
) -> OpsResult<Vec<f32>> {
    if src_w == 0 || src_h == 0 || channels == 0 {
        return Err(OpsError::InvalidDimensions(
            "source width, height and channels must be > 0".into(),
        ));
    }
    if dst_w == 0 || dst_h == 0 {
        return Err(OpsError::InvalidDimensions(
            "destination size must be > 0".into(),
        ));
    }
    let expected = src_w * src_h * channels;
    if src.len() != expected {
        return Err(OpsError::InvalidDimensions(format!(
            "expected {} samples, got {}",
            expected,
            src.len()
        )));
    }

    let scale_x = src_w as f32 / dst_w as f32;
    let scale_y = src_h as f32 / dst_h as f32;
    let row_len = dst_w * channels;
    let mut dst = vec![0.0f32; dst_h * row_len];

    let fill_row = |(y, row): (usize, &mut [f32])| match filter {
        Filter::Nearest => {
            let sy = nearest_tap(y, scale_y, src_h);
            for x in 0..dst_w {
                let sx = nearest_tap(x, scale_x, src_w);
                let s = (sy * src_w + sx) * channels;
                row[x * channels..(x + 1) * channels].copy_from_slice(&src[s..s + channels]);
            }
        }
        Filter::Bilinear => {
            let (y0, fy) = bilinear_tap(y, scale_y, src_h);
            let y1 = (y0 + 1).min(src_h - 1);
            for x in 0..dst_w {
                let (x0, fx) = bilinear_tap(x, scale_x, src_w);
                let x1 = (x0 + 1).min(src_w - 1);
                let at = |sy: usize, sx: usize, c: usize| src[(sy * src_w + sx) * channels + c];
                for c in 0..channels {
                    let top = at(y0, x0, c) * (1.0 - fx) + at(y0, x1, c) * fx;
                    let bottom = at(y1, x0, c) * (1.0 - fx) + at(y1, x1, c) * fx;
                    row[x * channels + c] = top * (1.0 - fy) + bottom * fy;
                }
            }
        }
    };

    #[cfg(feature = "parallel")]
    dst.par_chunks_mut(row_len).enumerate().for_each(fill_row);
    #[cfg(not(feature = "parallel"))]
    dst.chunks_mut(row_len).enumerate().for_each(fill_row);

    Ok(dst)
}

/// Resizes an image, keeping its channel count.
///
/// Returns an unquantized copy when the size already matches.
pub fn resize_image(
    image: &ImageData,
    width: u32,
    height: u32,
    filter: Filter,
) -> OpsResult<ImageData> {
    if image.dimensions() == (width, height) {
        return Ok(image.map(|v| v));
    }
    trace!(
        from_width = image.width(),
        from_height = image.height(),
        width,
        height,
        ?filter,
        "resize"
    );
    let data = resize_f32(
        &image.to_f32(),
        image.width() as usize,
        image.height() as usize,
        image.channels() as usize,
        width as usize,
        height as usize,
        filter,
    )?;
    Ok(ImageData::from_f32(width, height, image.channels(), data)?)
}
