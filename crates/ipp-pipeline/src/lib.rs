//! # ipp-pipeline
//!
//! Layered dataflow graphs of image operators.
//!
//! # Modules
//!
//! - [`bus`] - Single-assignment channels between operators
//! - [`operator`] - The operator contract and port signatures
//! - [`param`] - Parameter schema and dynamically typed values
//! - [`pipeline`] - Graph building and the layer scheduler
//!
//! # Example
//!
//! ```rust
//! use ipp_core::{FormatTag, ImageData};
//! use ipp_pipeline::{Operator, Pipeline, PipelineResult, Signature};
//!
//! struct Brighten(Signature);
//!
//! impl Operator for Brighten {
//!     fn type_name(&self) -> &'static str { "Brighten" }
//!     fn signature(&self) -> &Signature { &self.0 }
//!     fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
//!         Ok(vec![inputs[0].map(|v| (v + 10.0).min(255.0))])
//!     }
//! }
//!
//! let mut p = Pipeline::new();
//! p.create_bus("src", FormatTag::Channel)?;
//! p.create_bus("dst", FormatTag::Channel)?;
//! let op = Brighten(Signature::new(vec![FormatTag::Channel], vec![FormatTag::Channel]));
//! p.insert_operator("brighten", op, ["src"], ["dst"])?;
//! p.assign_layer("brighten", 0)?;
//! p.set_execution_order([0])?;
//!
//! p.write("src", ImageData::filled(2, 2, 1, 250)?)?;
//! p.run()?;
//! assert_eq!(p.read("dst")?.to_u8(), vec![255; 4]);
//! # Ok::<(), ipp_pipeline::PipelineError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default) - [`ExecutionMode::Parallel`] on the rayon pool
//! - `serde` - Serialize/deserialize [`ParamValue`], [`LayerId`] and
//!   [`FormatTag`](ipp_core::FormatTag)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod bus;
pub mod operator;
pub mod param;
pub mod pipeline;

pub use bus::Bus;
pub use error::{PipelineError, PipelineResult};
pub use operator::{Operator, Signature};
pub use param::{find_spec, ParamKind, ParamSpec, ParamValue};
pub use pipeline::{ExecutionMode, LayerId, Pipeline};
