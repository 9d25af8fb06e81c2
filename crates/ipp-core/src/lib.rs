//! # ipp-core
//!
//! Core types for layered image processing pipelines.
//!
//! This crate provides the foundational types shared by the rest of the
//! workspace:
//!
//! - [`FormatTag`] - Shape class of the data allowed on a bus, with the
//!   directed [`accepts`](FormatTag::accepts) compatibility relation
//! - [`ImageData`] - `[height][width]` or `[height][width][channels]` sample
//!   array, stored as 8-bit on buses and as `f32` while an operator computes
//! - [`Error`] - Image construction and shape errors
//!
//! ## Crate Structure
//!
//! ```text
//! ipp-core (this crate)
//!    ^
//!    |
//!    +-- ipp-pipeline (buses, operator contract, scheduler)
//!           ^
//!           |
//!           +-- ipp-ops (pixel operators, registry, manifest)
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - Serialize/deserialize [`FormatTag`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod image;

pub use error::{Error, Result};
pub use format::FormatTag;
pub use image::{ImageData, PixelData};

/// Prelude module for convenient imports.
///
/// ```
/// use ipp_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::format::FormatTag;
    pub use crate::image::{ImageData, PixelData};
}
