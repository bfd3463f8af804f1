//! Discrete logic-gate network model shared by every gateforge stage.
//!
//! A [`Network`] is an ordered list of [`Layer`]s of two-input [`Gate`]s. Each
//! gate picks one of the sixteen Boolean functions in [`GateOp`] and reads two
//! wires of the previous layer (or of the global input for layer 0).

pub mod archive;
pub mod distance;
pub mod error;
pub mod gate;
pub mod network;

pub use archive::{NetlistArchive, TestVectors};
pub use distance::{DistanceMode, WireStats};
pub use error::{Error, Result};
pub use gate::GateOp;
pub use network::{Gate, Layer, Network};
