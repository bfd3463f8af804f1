//! Stack ragged layers into uniform padded arrays.

use crate::quantize::QuantizedLayers;
use gateforge_netlist::NetlistArchive;
use ndarray::Array2;

/// Right-pad every layer to the widest one with opcode 0 (constant false)
/// and source 0, recording the true widths alongside.
pub fn rectangularize(layers: &QuantizedLayers) -> NetlistArchive {
    let width = layers.opcodes.iter().map(Vec::len).max().unwrap_or(0);

    let mut gate_types = Array2::<i64>::zeros((layers.opcodes.len(), width));
    for (i, opcodes) in layers.opcodes.iter().enumerate() {
        for (j, op) in opcodes.iter().enumerate() {
            gate_types[[i, j]] = i64::from(*op);
        }
    }

    let mut conn_a = Array2::<i64>::zeros((layers.sources.len(), width));
    let mut conn_b = Array2::<i64>::zeros((layers.sources.len(), width));
    for (i, sources) in layers.sources.iter().enumerate() {
        for (j, (a, b)) in sources.iter().enumerate() {
            conn_a[[i, j]] = *a;
            conn_b[[i, j]] = *b;
        }
    }

    NetlistArchive {
        gate_types,
        conn_a,
        conn_b,
        widths: Some(layers.opcodes.iter().map(Vec::len).collect()),
        inputs: layers.inputs,
        test_vectors: None,
    }
}
