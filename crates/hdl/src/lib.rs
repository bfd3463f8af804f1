//! Verilog emission for discrete logic-gate networks.
//!
//! [`VerilogEmitter`] turns a [`Network`](gateforge_netlist::Network) into a
//! single synthesizable module. Output depends only on the network and the
//! [`EmitConfig`], so the same inputs always produce the same text.

pub mod config;
pub mod expr;
pub mod verilog;

pub use config::{CategoryLayout, EmitConfig, EmitStyle};
pub use expr::{gate_expression, logic_gate_module};
pub use verilog::VerilogEmitter;

#[cfg(test)]
mod sim;
