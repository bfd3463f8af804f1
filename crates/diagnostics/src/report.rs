//! Layer statistics table.

use crate::histogram::{compressed_histogram, glyph_graph, linear_histogram};
use gateforge_netlist::{DistanceMode, GateOp, Network, WireStats};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// Buckets of the fine-grained distance histogram.
pub const DISTANCE_BUCKETS: usize = 64;
/// Bins of the compressed distance histogram.
pub const COMPRESSED_BINS: usize = 8;

const DISTANCE_AXIS: &str = "0...4..........16..............32.... connection distance .....>64";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerReport {
    pub index: usize,
    pub inputs: usize,
    pub gates: usize,
    /// Gate count per opcode.
    pub opcodes: Vec<u64>,
    /// Gate count per distance, last bucket collects everything longer.
    pub distances: Vec<u64>,
    pub compressed_distances: Vec<u64>,
    pub wire: WireStats,
}

impl LayerReport {
    fn row(&self) -> String {
        format!(
            "{:3} {}     {} xx {}",
            self.index,
            glyph_graph(&self.opcodes).text,
            glyph_graph(&self.distances).text,
            glyph_graph(&self.compressed_distances).text
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkReport {
    pub distance: DistanceMode,
    pub input_width: usize,
    pub output_width: usize,
    pub layers: Vec<LayerReport>,
    pub total_wire: usize,
    /// Integer average wire length per gate.
    pub average_wire: usize,
    pub total_gates: usize,
}

impl NetworkReport {
    pub fn from_network(network: &Network, distance: DistanceMode) -> Self {
        let layers: Vec<LayerReport> = network
            .iter_layers()
            .map(|(index, inputs, layer)| {
                let opcodes =
                    linear_histogram(layer.gates.iter().map(|g| g.op.code() as usize), GateOp::COUNT);
                let lengths: Vec<usize> = layer.distances(inputs, distance).collect();
                LayerReport {
                    index,
                    inputs,
                    gates: layer.width(),
                    opcodes,
                    distances: linear_histogram(lengths.iter().copied(), DISTANCE_BUCKETS),
                    compressed_distances: compressed_histogram(&lengths, COMPRESSED_BINS),
                    wire: WireStats::from_distances(lengths),
                }
            })
            .collect();
        let total_wire = layers.iter().map(|layer| layer.wire.total).sum();
        let total_gates = network.gate_count();
        Self {
            distance,
            input_width: network.input_width,
            output_width: network.output_width(),
            layers,
            total_wire,
            average_wire: total_wire.checked_div(total_gates).unwrap_or(0),
            total_gates,
        }
    }

    /// The opcode legend: a negation bar row above one symbol per opcode.
    pub fn legend() -> (String, String) {
        let bars = GateOp::ALL
            .iter()
            .map(|op| if op.legend_negated() { '_' } else { ' ' })
            .collect();
        let symbols = GateOp::ALL.iter().map(|op| op.legend_symbol()).collect();
        (bars, symbols)
    }

    pub fn render(&self) -> String {
        let (bars, symbols) = Self::legend();
        let mut text = String::new();
        text.push_str("Layer statistics:\n");
        let _ = writeln!(text, "    {bars}");
        let _ = writeln!(text, "    {symbols}     {DISTANCE_AXIS}");
        for layer in &self.layers {
            let _ = writeln!(text, "{}", layer.row());
        }
        let _ = writeln!(text, "    {symbols}");
        let _ = writeln!(
            text,
            "Total wire: {}, avg: {}",
            self.total_wire, self.average_wire
        );
        let _ = writeln!(text, "Total gates: {}", self.total_gates);
        text
    }

    /// Save report to JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
