//! YAML pipeline manifests.
//!
//! A manifest lists buses, operator instances with their type, layer,
//! bindings and parameters, and the layer execution order:
//!
//! ```yaml
//! buses:
//!   - { name: input, format: channel }
//!   - { name: output, format: channel }
//! operators:
//!   - name: scale
//!     type: Product
//!     layer: 0
//!     inputs: [input]
//!     outputs: [output]
//!     params: { value: 2.0, offset: 0 }
//! sequence: [0]
//! ```
//!
//! Parameters are applied in name order before the operator is inserted.
//! Integers are accepted where the schema declares a float.
//!
//! ```rust
//! use ipp_core::ImageData;
//! use ipp_ops::{Manifest, Registry};
//!
//! let yaml = "
//! buses:
//!   - { name: input, format: channel }
//!   - { name: output, format: channel }
//! operators:
//!   - name: scale
//!     type: Product
//!     layer: 0
//!     inputs: [input]
//!     outputs: [output]
//!     params: { value: 2, offset: 0 }
//! sequence: [0]
//! ";
//! let mut pipeline = Manifest::from_yaml_str(yaml)?.build(&Registry::builtin())?;
//! pipeline.write("input", ImageData::filled(2, 2, 1, 60)?)?;
//! pipeline.run()?;
//! assert_eq!(pipeline.read("output")?.to_u8(), vec![120; 4]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::registry::{Registry, RegistryError};
use ipp_core::FormatTag;
use ipp_pipeline::{find_spec, LayerId, ParamValue, Pipeline, PipelineError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or building a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// I/O error reading the manifest.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Manifest file not found.
    #[error("manifest not found: {path}")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Operator type not provided by the registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A parameter could not be applied to an operator instance.
    #[error("operator {operator}: {source}")]
    Param {
        /// Operator instance name.
        operator: String,
        /// Underlying error.
        #[source]
        source: PipelineError,
    },

    /// Graph construction failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// A bus declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusEntry {
    /// Bus name.
    pub name: String,
    /// Format tag, lowercase.
    pub format: FormatTag,
}

/// An operator instance declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorEntry {
    /// Instance name.
    pub name: String,
    /// Registered type name, e.g. `TripleFork`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Layer the instance belongs to; unassigned when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<LayerId>,
    /// Ordered input bus names.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Ordered output bus names.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Parameter values by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,
}

/// Declarative description of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Buses, in creation order.
    #[serde(default)]
    pub buses: Vec<BusEntry>,
    /// Operators, in insertion order.
    #[serde(default)]
    pub operators: Vec<OperatorEntry>,
    /// Layer execution order.
    #[serde(default)]
    pub sequence: Vec<LayerId>,
}

impl Manifest {
    /// Loads a manifest from a file.
    pub fn from_file(path: impl AsRef<Path>) -> ManifestResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading manifest");
        Self::from_yaml_str(&content)
    }

    /// Parses a manifest from YAML text.
    pub fn from_yaml_str(yaml: &str) -> ManifestResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serializes the manifest to YAML text.
    pub fn to_yaml_string(&self) -> ManifestResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Builds the described pipeline with operators from `registry`.
    ///
    /// Bindings are only checked when the pipeline runs.
    pub fn build(&self, registry: &Registry) -> ManifestResult<Pipeline> {
        let mut pipeline = Pipeline::new();
        for bus in &self.buses {
            pipeline.create_bus(&bus.name, bus.format)?;
        }

        for entry in &self.operators {
            let mut operator = registry.create(&entry.kind)?;
            for (param, value) in &entry.params {
                let value = match find_spec(operator.param_specs(), param) {
                    Some(spec) => value.clone().coerce(spec.kind),
                    None => value.clone(),
                };
                operator
                    .set_param(param, value)
                    .map_err(|source| ManifestError::Param {
                        operator: entry.name.clone(),
                        source,
                    })?;
            }
            pipeline.insert_boxed(
                &entry.name,
                operator,
                entry.inputs.clone(),
                entry.outputs.clone(),
            )?;
            if let Some(layer) = &entry.layer {
                pipeline.assign_layer(&entry.name, layer.clone())?;
            }
        }

        pipeline.set_execution_order(self.sequence.iter().cloned())?;
        debug!(
            buses = self.buses.len(),
            operators = self.operators.len(),
            layers = self.sequence.len(),
            "manifest built"
        );
        Ok(pipeline)
    }
}
