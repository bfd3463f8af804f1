//! Layered gate graph.

use crate::distance::{DistanceMode, WireStats};
use crate::error::{Error, Result};
use crate::gate::GateOp;
use serde::{Deserialize, Serialize};

/// One two-input gate: a function and two indices into its layer's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub op: GateOp,
    pub a: usize,
    pub b: usize,
}

impl Gate {
    pub fn new(op: GateOp, a: usize, b: usize) -> Self {
        Self { op, a, b }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub gates: Vec<Gate>,
}

impl Layer {
    pub fn new(gates: Vec<Gate>) -> Self {
        Self { gates }
    }

    pub fn width(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn distances(&self, inputs: usize, mode: DistanceMode) -> impl Iterator<Item = usize> + '_ {
        self.gates
            .iter()
            .map(move |gate| mode.distance(gate.a, gate.b, inputs))
    }

    pub fn wire_stats(&self, inputs: usize, mode: DistanceMode) -> WireStats {
        WireStats::from_distances(self.distances(inputs, mode))
    }
}

/// Ordered stack of layers fed by `input_width` global input wires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub input_width: usize,
    pub layers: Vec<Layer>,
    /// Layer 0 was wired to inputs `(0, 1)` because its connectivity was
    /// never trained. Rewiring passes leave it alone.
    #[serde(default)]
    pub fixed_input_layer: bool,
}

impl Network {
    /// Build a network, rejecting any gate whose sources fall outside its
    /// layer's input bus.
    pub fn new(input_width: usize, layers: Vec<Layer>) -> Result<Self> {
        let network = Self {
            input_width,
            layers,
            fixed_input_layer: false,
        };
        network.check_sources().map_err(Error::InvalidInput)?;
        Ok(network)
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Width of the final layer, or of the input when there are no layers.
    pub fn output_width(&self) -> usize {
        self.layers
            .last()
            .map(Layer::width)
            .unwrap_or(self.input_width)
    }

    /// Number of wires layer `index` can read from.
    pub fn layer_input_width(&self, index: usize) -> usize {
        match index {
            0 => self.input_width,
            i => self.layers.get(i - 1).map(Layer::width).unwrap_or(0),
        }
    }

    pub fn gate_count(&self) -> usize {
        self.layers.iter().map(Layer::width).sum()
    }

    pub fn widest_layer(&self) -> usize {
        self.layers.iter().map(Layer::width).max().unwrap_or(0)
    }

    /// Iterate `(layer index, input width, layer)`.
    pub fn iter_layers(&self) -> impl Iterator<Item = (usize, usize, &Layer)> + '_ {
        self.layers
            .iter()
            .enumerate()
            .map(move |(index, layer)| (index, self.layer_input_width(index), layer))
    }

    pub fn layer_wire_stats(&self, mode: DistanceMode) -> Vec<WireStats> {
        self.iter_layers()
            .map(|(_, inputs, layer)| layer.wire_stats(inputs, mode))
            .collect()
    }

    /// Post-transform check: every source in range and every distance within
    /// what `mode` can produce. Failures are defects, not bad input.
    pub fn validate(&self, mode: DistanceMode) -> Result<()> {
        self.check_sources().map_err(Error::InvariantViolation)?;
        for (index, inputs, layer) in self.iter_layers() {
            let limit = mode.max_distance(inputs);
            if let Some((gate_index, d)) = layer
                .distances(inputs, mode)
                .enumerate()
                .find(|(_, d)| *d > limit)
            {
                return Err(Error::InvariantViolation(format!(
                    "layer {index} gate {gate_index}: {} distance {d} exceeds {limit} for {inputs} inputs",
                    mode.as_str()
                )));
            }
        }
        Ok(())
    }

    fn check_sources(&self) -> std::result::Result<(), String> {
        for (index, inputs, layer) in self.iter_layers() {
            for (gate_index, gate) in layer.gates.iter().enumerate() {
                if gate.a >= inputs || gate.b >= inputs {
                    return Err(format!(
                        "layer {index} gate {gate_index}: sources ({}, {}) outside {inputs} inputs",
                        gate.a, gate.b
                    ));
                }
            }
        }
        Ok(())
    }

    /// Drop trailing layers so at most `max_layers` remain. Returns how many
    /// were removed.
    pub fn truncate(&mut self, max_layers: usize) -> usize {
        let removed = self.layers.len().saturating_sub(max_layers);
        self.layers.truncate(max_layers);
        removed
    }

    /// Reference evaluation of the network on one input vector.
    pub fn evaluate(&self, inputs: &[bool]) -> Result<Vec<bool>> {
        if inputs.len() != self.input_width {
            return Err(Error::InvalidInput(format!(
                "expected {} input bits, got {}",
                self.input_width,
                inputs.len()
            )));
        }
        let mut wires = inputs.to_vec();
        for (index, layer) in self.layers.iter().enumerate() {
            let mut next = Vec::with_capacity(layer.width());
            for gate in &layer.gates {
                let (a, b) = match (wires.get(gate.a), wires.get(gate.b)) {
                    (Some(a), Some(b)) => (*a, *b),
                    _ => {
                        return Err(Error::InvariantViolation(format!(
                            "layer {index}: source out of range while evaluating"
                        )))
                    }
                };
                next.push(gate.op.eval(a, b));
            }
            wires = next;
        }
        Ok(wires)
    }
}
