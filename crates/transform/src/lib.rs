//! Netlist transform engine.
//!
//! Passes run in a fixed order over a decoded [`Network`](gateforge_netlist::Network):
//! random gate override, power-law rewiring, long-connection clamping and
//! layer truncation. Each is optional. The two stochastic passes are
//! best-effort: a misconfiguration skips them and leaves the network as it
//! was, while an invariant violation from any pass aborts the run.

pub mod clamp;
pub mod config;
pub mod passes;
pub mod random;
pub mod truncate;

pub use clamp::ClampLongConnections;
pub use config::{GateOverride, PowerLaw, TransformConfig};
pub use passes::{Pass, PassContext, PassPipeline, WireReport};
pub use random::{PowerLawRewire, RandomGates};
pub use truncate::TruncateLayers;
