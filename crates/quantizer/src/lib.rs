//! Checkpoint quantization.
//!
//! A trained checkpoint holds, per layer, a soft weight for each of the 16
//! gate functions of every gate, plus either soft connection weights or hard
//! connection index pairs. Quantization keeps the strongest function and the
//! strongest pair of source wires for every gate, then stacks the ragged
//! layers into a rectangular [`NetlistArchive`](gateforge_netlist::NetlistArchive).

pub mod checkpoint;
pub mod quantize;
pub mod rectangularize;

pub use checkpoint::{Checkpoint, RawTensor};
pub use quantize::{argmax, quantize, Quantized, QuantizedLayers};
pub use rectangularize::rectangularize;
