//! Human-readable statistics of a logic-gate network.
//!
//! Everything here is a pure function of its input: reports never touch the
//! network they describe and never influence emitted HDL.

pub mod histogram;
pub mod report;

pub use histogram::{compressed_histogram, glyph_graph, linear_histogram, Glyphs, GLYPHS};
pub use report::{LayerReport, NetworkReport};
