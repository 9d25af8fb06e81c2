//! # ipp-ops
//!
//! Pixel operators for [`ipp_pipeline`] graphs.
//!
//! # Modules
//!
//! - [`addition`] - Constant offset
//! - [`product`] - Scaling around a fixed point
//! - [`hadamard`] - Mask multiply
//! - [`split_merge`] - Three channel image to planes and back
//! - [`fork_blend`] - Fan-out and weighted fan-in
//! - [`bypass`] - Pass-through
//! - [`resize`] - Resampling used by the mask multiply
//! - [`registry`] - Static plug-in table keyed by operator type name
//! - [`manifest`] - YAML pipeline descriptions
//!
//! # Example
//!
//! ```rust
//! use ipp_core::{FormatTag, ImageData};
//! use ipp_ops::{Blend, Fork};
//! use ipp_pipeline::Pipeline;
//!
//! let mut p = Pipeline::new();
//! for bus in ["in", "a", "b", "out"] {
//!     p.create_bus(bus, FormatTag::Channel)?;
//! }
//! p.insert_operator("fork", Fork::channel(), ["in"], ["a", "b"])?;
//! let mut blend = Blend::channel();
//! blend.set_weights(vec![1.0, 1.0]);
//! p.insert_operator("blend", blend, ["a", "b"], ["out"])?;
//! p.assign_layer("fork", 0)?;
//! p.assign_layer("blend", 1)?;
//! p.set_execution_order([0, 1])?;
//!
//! p.write("in", ImageData::filled(4, 4, 1, 99)?)?;
//! p.run()?;
//! assert_eq!(p.read("out")?.to_u8(), vec![99; 16]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default) - Row-parallel resampling with rayon

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod addition;
pub mod bypass;
pub mod fork_blend;
pub mod hadamard;
pub mod manifest;
pub mod product;
pub mod registry;
pub mod resize;
pub mod split_merge;

pub use addition::Addition;
pub use bypass::Bypass;
pub use error::{OpsError, OpsResult};
pub use fork_blend::{Blend, Fork};
pub use hadamard::Hadamard;
pub use manifest::{Manifest, ManifestError, ManifestResult};
pub use product::Product;
pub use registry::{Plugin, PluginInfo, Registry, RegistryError};
pub use split_merge::{Merge, Split};

/// Fails unless exactly `expected` input images were passed to `run`.
pub(crate) fn check_inputs(
    operator: &str,
    inputs: &[ipp_core::ImageData],
    expected: usize,
) -> OpsResult<()> {
    if inputs.len() != expected {
        return Err(OpsError::InvalidDimensions(format!(
            "{operator} takes {expected} inputs, got {}",
            inputs.len()
        )));
    }
    Ok(())
}

/// Saturates a sample to the 8-bit range.
#[inline]
pub(crate) fn clip(v: f32) -> f32 {
    v.clamp(0.0, 255.0)
}
