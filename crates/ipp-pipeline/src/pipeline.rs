//! The layered pipeline graph and its scheduler.
//!
//! # Architecture
//!
//! ```text
//!   source bus ──► [layer 0: op, op] ──► bus ──► [layer 1: op] ──► sink bus
//! ```
//!
//! A [`Pipeline`] owns named [`Bus`]es and named operators. Each operator is
//! bound to ordered input/output bus names, assigned to a layer, and layers run
//! in the explicit order given to
//! [`set_execution_order`](Pipeline::set_execution_order). Within a layer,
//! operators run in insertion order.
//!
//! # Run cycle
//!
//! 1. write the source buses
//! 2. [`run`](Pipeline::run)
//! 3. read the sink buses
//! 4. [`reset_all`](Pipeline::reset_all) before the next cycle
//!
//! # Example
//!
//! ```rust
//! use ipp_core::{FormatTag, ImageData};
//! use ipp_pipeline::{Operator, Pipeline, PipelineResult, Signature};
//!
//! struct Copy(Signature);
//!
//! impl Operator for Copy {
//!     fn type_name(&self) -> &'static str { "Copy" }
//!     fn signature(&self) -> &Signature { &self.0 }
//!     fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
//!         Ok(inputs)
//!     }
//! }
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.create_bus("in", FormatTag::Channel).unwrap();
//! pipeline.create_bus("out", FormatTag::Channel).unwrap();
//!
//! let op = Copy(Signature::new(vec![FormatTag::Channel], vec![FormatTag::Channel]));
//! pipeline.insert_operator("copy", op, ["in"], ["out"]).unwrap();
//! pipeline.assign_layer("copy", 0).unwrap();
//! pipeline.set_execution_order([0]).unwrap();
//!
//! pipeline.write("in", ImageData::filled(2, 2, 1, 42).unwrap()).unwrap();
//! pipeline.run().unwrap();
//! assert_eq!(pipeline.read("out").unwrap().to_u8(), vec![42; 4]);
//! pipeline.reset_all();
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::bus::Bus;
use crate::operator::Operator;
use crate::param::ParamValue;
use crate::{PipelineError, PipelineResult};
use ipp_core::{FormatTag, ImageData};
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Identifier of a layer: an index or a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum LayerId {
    /// Numbered layer.
    Index(i64),
    /// Named layer.
    Name(String),
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Index(i) => write!(f, "{i}"),
            LayerId::Name(n) => f.write_str(n),
        }
    }
}

impl From<i32> for LayerId {
    fn from(v: i32) -> Self {
        LayerId::Index(v as i64)
    }
}

impl From<i64> for LayerId {
    fn from(v: i64) -> Self {
        LayerId::Index(v)
    }
}

impl From<u32> for LayerId {
    fn from(v: u32) -> Self {
        LayerId::Index(v as i64)
    }
}

impl From<usize> for LayerId {
    fn from(v: usize) -> Self {
        LayerId::Index(v as i64)
    }
}

impl From<&str> for LayerId {
    fn from(v: &str) -> Self {
        LayerId::Name(v.to_string())
    }
}

impl From<String> for LayerId {
    fn from(v: String) -> Self {
        LayerId::Name(v)
    }
}

/// How operators inside one layer are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One operator after the other, in insertion order.
    #[default]
    Sequential,
    /// All inputs of the layer are read first, transforms run on the rayon
    /// pool, then outputs are written in insertion order. An operator cannot
    /// consume a bus produced inside its own layer in this mode.
    #[cfg(feature = "parallel")]
    Parallel,
}

/// An operator instance and its bus bindings.
struct Node {
    name: String,
    operator: Box<dyn Operator>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

/// Bus indices of a validated binding.
struct Binding {
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

/// Layered graph of operators connected by buses.
#[derive(Default)]
pub struct Pipeline {
    buses: Vec<Bus>,
    bus_index: HashMap<String, usize>,
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    layers: BTreeMap<LayerId, Vec<usize>>,
    sequence: Vec<LayerId>,
    mode: ExecutionMode,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("buses", &self.buses.iter().map(Bus::name).collect::<Vec<_>>())
            .field(
                "operators",
                &self.nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            )
            .field("sequence", &self.sequence)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects how operators inside a layer are executed.
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Selects how operators inside a layer are executed.
    pub fn set_execution_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
    }

    /// Current execution mode.
    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    /// Creates an empty bus.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateName`] if the name is taken.
    pub fn create_bus(&mut self, name: impl Into<String>, format: FormatTag) -> PipelineResult<()> {
        let name = name.into();
        if self.bus_index.contains_key(&name) {
            return Err(PipelineError::duplicate("bus", name));
        }
        debug!(bus = %name, %format, "create_bus");
        self.bus_index.insert(name.clone(), self.buses.len());
        self.buses.push(Bus::new(name, format));
        Ok(())
    }

    /// Inserts an operator with its ordered input and output bus names.
    ///
    /// Binding arity is not checked here: parameters set after insertion may
    /// still change the operator's signature. It is checked on every
    /// [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateName`] if the name is taken.
    pub fn insert_operator<I, O>(
        &mut self,
        name: impl Into<String>,
        operator: impl Operator + 'static,
        inputs: I,
        outputs: O,
    ) -> PipelineResult<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        self.insert_boxed(
            name,
            Box::new(operator),
            inputs.into_iter().map(Into::into).collect(),
            outputs.into_iter().map(Into::into).collect(),
        )
    }

    /// Inserts an already boxed operator, e.g. one built by a registry.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateName`] if the name is taken.
    pub fn insert_boxed(
        &mut self,
        name: impl Into<String>,
        operator: Box<dyn Operator>,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> PipelineResult<()> {
        let name = name.into();
        if self.node_index.contains_key(&name) {
            return Err(PipelineError::duplicate("operator", name));
        }
        debug!(
            operator = %name,
            kind = operator.type_name(),
            ?inputs,
            ?outputs,
            "insert_operator"
        );
        self.node_index.insert(name.clone(), self.nodes.len());
        self.nodes.push(Node {
            name,
            operator,
            inputs,
            outputs,
        });
        Ok(())
    }

    /// Appends an operator to a layer, creating the layer if new.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownOperator`] if no such operator exists.
    pub fn assign_layer(&mut self, operator: &str, layer: impl Into<LayerId>) -> PipelineResult<()> {
        let idx = self.node_idx(operator)?;
        let layer = layer.into();
        debug!(operator, %layer, "assign_layer");
        self.layers.entry(layer).or_default().push(idx);
        Ok(())
    }

    /// Fixes the order in which layers run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownLayer`] if a layer was never populated
    /// with [`assign_layer`](Self::assign_layer). The previous order is kept.
    pub fn set_execution_order<S>(&mut self, sequence: S) -> PipelineResult<()>
    where
        S: IntoIterator,
        S::Item: Into<LayerId>,
    {
        let sequence: Vec<LayerId> = sequence.into_iter().map(Into::into).collect();
        if let Some(missing) = sequence.iter().find(|l| !self.layers.contains_key(*l)) {
            return Err(PipelineError::UnknownLayer {
                layer: missing.to_string(),
            });
        }
        debug!(?sequence, "set_execution_order");
        self.sequence = sequence;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    fn bus_idx(&self, name: &str) -> PipelineResult<usize> {
        self.bus_index
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::UnknownBus {
                name: name.to_string(),
            })
    }

    fn node_idx(&self, name: &str) -> PipelineResult<usize> {
        self.node_index
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::UnknownOperator {
                name: name.to_string(),
            })
    }

    /// Returns a bus by name.
    pub fn bus(&self, name: &str) -> PipelineResult<&Bus> {
        Ok(&self.buses[self.bus_idx(name)?])
    }

    /// Returns a bus by name, mutably.
    pub fn bus_mut(&mut self, name: &str) -> PipelineResult<&mut Bus> {
        let idx = self.bus_idx(name)?;
        Ok(&mut self.buses[idx])
    }

    /// Iterates over all buses in creation order.
    pub fn buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.iter()
    }

    /// Writes a value into a bus, typically a source bus before a run.
    pub fn write(&mut self, bus: &str, value: ImageData) -> PipelineResult<()> {
        self.bus_mut(bus)?.write(value)
    }

    /// Reads a bus, typically a sink bus after a run.
    pub fn read(&self, bus: &str) -> PipelineResult<&ImageData> {
        self.bus(bus)?.read()
    }

    /// Removes a value from a bus.
    pub fn take(&mut self, bus: &str) -> PipelineResult<ImageData> {
        self.bus_mut(bus)?.take()
    }

    /// Returns an operator by name.
    pub fn operator(&self, name: &str) -> PipelineResult<&dyn Operator> {
        Ok(self.nodes[self.node_idx(name)?].operator.as_ref())
    }

    /// Returns an operator by name, mutably (e.g. to change parameters
    /// between runs).
    pub fn operator_mut(&mut self, name: &str) -> PipelineResult<&mut dyn Operator> {
        let idx = self.node_idx(name)?;
        Ok(self.nodes[idx].operator.as_mut())
    }

    /// Sets a parameter on a named operator.
    pub fn set_param(
        &mut self,
        operator: &str,
        param: &str,
        value: impl Into<ParamValue>,
    ) -> PipelineResult<()> {
        self.operator_mut(operator)?.set_param(param, value.into())
    }

    /// Operator names in insertion order.
    pub fn operator_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Input and output bus names bound to an operator.
    pub fn bindings(&self, operator: &str) -> PipelineResult<(&[String], &[String])> {
        let node = &self.nodes[self.node_idx(operator)?];
        Ok((&node.inputs, &node.outputs))
    }

    /// Operators assigned to a layer, in execution order.
    pub fn layer(&self, layer: &LayerId) -> Option<Vec<&str>> {
        self.layers
            .get(layer)
            .map(|members| members.iter().map(|&i| self.nodes[i].name.as_str()).collect())
    }

    /// The layer execution order.
    pub fn execution_order(&self) -> &[LayerId] {
        &self.sequence
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Empties every bus.
    pub fn reset_all(&mut self) {
        trace!(buses = self.buses.len(), "reset_all");
        for bus in &mut self.buses {
            bus.reset();
        }
    }

    /// Runs every layer of the execution order once.
    ///
    /// Source buses must be written beforehand. Buses are not reset
    /// afterwards; call [`reset_all`](Self::reset_all) before the next run.
    ///
    /// # Errors
    ///
    /// The first error aborts the run, leaving buses partially written:
    /// - [`PipelineError::Binding`] for arity, format or unknown-bus mistakes
    /// - [`PipelineError::EmptyBus`] if an input was not produced yet
    /// - [`PipelineError::BusOverflow`] if an output bus already holds data
    /// - [`PipelineError::OutputArity`] / [`PipelineError::OutputShape`] /
    ///   [`PipelineError::NotImplemented`] for faulty operators
    /// - whatever the operator's transform returns
    pub fn run(&mut self) -> PipelineResult<()> {
        let sequence = self.sequence.clone();
        for layer in &sequence {
            let members = self.layers.get(layer).cloned().unwrap_or_default();
            debug!(%layer, operators = members.len(), "running layer");
            match self.mode {
                ExecutionMode::Sequential => {
                    for idx in members {
                        self.run_node(idx)?;
                    }
                }
                #[cfg(feature = "parallel")]
                ExecutionMode::Parallel => self.run_layer_parallel(&members)?,
            }
        }
        Ok(())
    }

    fn run_node(&mut self, idx: usize) -> PipelineResult<()> {
        let binding = self.resolve(idx)?;
        let inputs = self.read_inputs(&binding)?;
        let node = &self.nodes[idx];
        trace!(operator = %node.name, kind = node.operator.type_name(), "run");
        let outputs = node.operator.run(inputs)?;
        self.write_outputs(idx, &binding, outputs)
    }

    #[cfg(feature = "parallel")]
    fn run_layer_parallel(&mut self, members: &[usize]) -> PipelineResult<()> {
        let mut jobs = Vec::with_capacity(members.len());
        for &idx in members {
            let binding = self.resolve(idx)?;
            let inputs = self.read_inputs(&binding)?;
            jobs.push((idx, binding, inputs));
        }

        let nodes = &self.nodes;
        let results: Vec<_> = jobs
            .into_par_iter()
            .map(|(idx, binding, inputs)| {
                trace!(operator = %nodes[idx].name, "run (parallel)");
                (idx, binding, nodes[idx].operator.run(inputs))
            })
            .collect();

        for (idx, binding, outputs) in results {
            self.write_outputs(idx, &binding, outputs?)?;
        }
        Ok(())
    }

    /// Checks the operator's bindings against its current signature.
    fn resolve(&self, idx: usize) -> PipelineResult<Binding> {
        let node = &self.nodes[idx];
        let sig = node.operator.signature();

        if node.inputs.len() != sig.inputs().len() {
            return Err(PipelineError::binding(
                &node.name,
                format!(
                    "{} input buses bound, operator expects {}",
                    node.inputs.len(),
                    sig.inputs().len()
                ),
            ));
        }
        if node.outputs.len() != sig.outputs().len() {
            return Err(PipelineError::binding(
                &node.name,
                format!(
                    "{} output buses bound, operator expects {}",
                    node.outputs.len(),
                    sig.outputs().len()
                ),
            ));
        }

        let lookup = |bus: &str| {
            self.bus_index.get(bus).copied().ok_or_else(|| {
                PipelineError::binding(&node.name, format!("unknown bus {bus}"))
            })
        };

        let mut inputs = Vec::with_capacity(node.inputs.len());
        for (bus, &required) in node.inputs.iter().zip(sig.inputs()) {
            let bidx = lookup(bus)?;
            let actual = self.buses[bidx].format();
            if !required.accepts(actual) {
                return Err(PipelineError::binding(
                    &node.name,
                    format!("input bus {bus} carries {actual}, operator requires {required}"),
                ));
            }
            inputs.push(bidx);
        }

        let mut outputs = Vec::with_capacity(node.outputs.len());
        for (bus, &declared) in node.outputs.iter().zip(sig.outputs()) {
            let bidx = lookup(bus)?;
            let carried = self.buses[bidx].format();
            if !carried.accepts(declared) {
                return Err(PipelineError::binding(
                    &node.name,
                    format!("output bus {bus} carries {carried}, operator produces {declared}"),
                ));
            }
            outputs.push(bidx);
        }

        Ok(Binding { inputs, outputs })
    }

    /// Copies the input values out of their buses.
    fn read_inputs(&self, binding: &Binding) -> PipelineResult<Vec<ImageData>> {
        binding
            .inputs
            .iter()
            .map(|&b| self.buses[b].read().cloned())
            .collect()
    }

    /// Validates the transform result, then writes it.
    fn write_outputs(
        &mut self,
        idx: usize,
        binding: &Binding,
        outputs: Vec<ImageData>,
    ) -> PipelineResult<()> {
        let node = &self.nodes[idx];
        let declared = node.operator.signature().outputs();
        if outputs.len() != declared.len() {
            return Err(PipelineError::OutputArity {
                operator: node.name.clone(),
                expected: declared.len(),
                got: outputs.len(),
            });
        }
        for (index, (image, &format)) in outputs.iter().zip(declared).enumerate() {
            if !format.admits_channels(image.channels()) {
                return Err(PipelineError::OutputShape {
                    operator: node.name.clone(),
                    index,
                    format,
                    channels: image.channels(),
                });
            }
        }

        for (image, &b) in outputs.into_iter().zip(&binding.outputs) {
            self.buses[b].write(image)?;
        }
        Ok(())
    }
}
