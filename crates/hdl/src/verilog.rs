//! Top-level Verilog module writer.

use crate::config::{CategoryLayout, EmitConfig, EmitStyle};
use crate::expr::{gate_expression, logic_gate_module};
use gateforge_netlist::{DistanceMode, Error, Network, Result};
use std::fmt::Write;
use tracing::{debug, info};

const BANNER_WIDTH: usize = 60;

pub struct VerilogEmitter {
    config: EmitConfig,
    distance: DistanceMode,
}

impl VerilogEmitter {
    /// `distance` decides how many relay stages a connection needs.
    pub fn new(config: EmitConfig, distance: DistanceMode) -> Self {
        Self { config, distance }
    }

    pub fn config(&self) -> &EmitConfig {
        &self.config
    }

    /// Render `network` as Verilog. Support modules (`relay_conn`,
    /// `logic_gate`) come first, the top module last.
    pub fn emit(&self, network: &Network) -> Result<String> {
        self.config.validate().map_err(Error::InvalidInput)?;
        self.check(network)?;

        let mut text = String::new();
        if self.config.relay.is_some() {
            text.push_str(&relay_module(&self.config.relay_cell));
            text.push('\n');
        }
        if self.config.style == EmitStyle::Expanded {
            text.push_str(&logic_gate_module());
            text.push('\n');
        }
        let relays = self.write_top(&mut text, network);

        info!(
            style = self.config.style.as_str(),
            layers = network.depth(),
            gates = network.gate_count(),
            relays,
            bytes = text.len(),
            "emitted verilog"
        );
        Ok(text)
    }

    /// Anything caught here slipped past the transform engine's validation.
    fn check(&self, network: &Network) -> Result<()> {
        if network.is_empty() {
            return Err(Error::Emission("network has no layers".into()));
        }
        if network.input_width == 0 {
            return Err(Error::Emission("network has no inputs".into()));
        }
        for (index, inputs, layer) in network.iter_layers() {
            if layer.is_empty() {
                return Err(Error::Emission(format!("layer {index} has no gates")));
            }
            for (gate_index, gate) in layer.gates.iter().enumerate() {
                if gate.a >= inputs || gate.b >= inputs {
                    return Err(Error::Emission(format!(
                        "layer {index} gate {gate_index}: source ({}, {}) out of range for {inputs} inputs",
                        gate.a, gate.b
                    )));
                }
            }
        }
        if let Some(layout) = &self.config.categories {
            if layout.strided && layout.stride(network.output_width()) == 0 {
                return Err(Error::Emission(format!(
                    "{} outputs cannot be strided over {} categories",
                    network.output_width(),
                    layout.count
                )));
            }
        }
        Ok(())
    }

    /// Returns the number of relay stages inserted.
    fn write_top(&self, text: &mut String, network: &Network) -> usize {
        let output_width = network.output_width();
        let _ = writeln!(text, "module {} (", self.config.module_name);
        let _ = writeln!(text, "    input  wire [{}:0] in,", network.input_width - 1);
        match &self.config.categories {
            Some(layout) => {
                let _ = writeln!(text, "    output wire [{}:0] out,", output_width - 1);
                let _ = writeln!(
                    text,
                    "    output wire [{}:0] categories",
                    layout.port_width() - 1
                );
            }
            None => {
                let _ = writeln!(text, "    output wire [{}:0] out", output_width - 1);
            }
        }
        text.push_str(");\n");

        let depth = network.depth();
        for (index, layer) in network.layers.iter().take(depth - 1).enumerate() {
            let _ = writeln!(text, "    wire [{}:0] layer_{index};", layer.width() - 1);
        }
        text.push('\n');

        let mut gate_index = 0;
        let mut relays = 0;
        for (index, inputs, layer) in network.iter_layers() {
            let source = match index {
                0 => "in".to_string(),
                i => format!("layer_{}", i - 1),
            };
            let target = if index + 1 == depth {
                "out".to_string()
            } else {
                format!("layer_{index}")
            };
            banner(text, &format!("Layer {index}"));

            for (out_index, gate) in layer.gates.iter().enumerate() {
                let a = format!("{source}[{}]", gate.a);
                let mut b = format!("{source}[{}]", gate.b);
                if let Some(granularity) = self.config.relay {
                    let stages = self.distance.distance(gate.a, gate.b, inputs) / granularity;
                    for n in 0..stages {
                        let relay = format!("far_{index}_{gate_index}_{n}");
                        let _ = writeln!(text, "    wire {relay};");
                        let _ = writeln!(text, "    relay_conn {relay}_b (.in({b}), .out({relay}));");
                        b = relay;
                    }
                    relays += stages;
                }
                let y = format!("{target}[{out_index}]");
                match self.config.style {
                    EmitStyle::Inline => {
                        let _ = writeln!(text, "    assign {y} = {};", gate_expression(gate.op, &a, &b));
                    }
                    EmitStyle::Expanded => {
                        let _ = writeln!(
                            text,
                            "    logic_gate gate_{index}_{gate_index} (.A({a}), .B({b}), .gate_type(4'd{}), .Y({y}));",
                            gate.op.code()
                        );
                    }
                }
                gate_index += 1;
            }
            debug!(layer = index, gates = layer.width(), "layer emitted");
        }

        if let Some(layout) = &self.config.categories {
            banner(text, "Arrange outputs in categories");
            write_categories(text, layout, output_width);
        }
        text.push_str("endmodule\n");
        relays
    }
}

fn banner(text: &mut String, title: &str) {
    let fill = BANNER_WIDTH.saturating_sub(title.len());
    let _ = writeln!(text, "    // {title} {}", "=".repeat(fill));
}

fn write_categories(text: &mut String, layout: &CategoryLayout, output_width: usize) {
    let bits = layout.bits_per_category;
    if layout.strided {
        let stride = layout.stride(output_width);
        let take = stride.min(bits);
        for category in 0..layout.count {
            let out_lo = category * stride;
            let cat_lo = category * bits;
            let _ = writeln!(
                text,
                "    assign categories[{}:{cat_lo}] = out[{}:{out_lo}];",
                cat_lo + take - 1,
                out_lo + take - 1
            );
            if bits > take {
                let _ = writeln!(
                    text,
                    "    assign categories[{}:{}] = 0;",
                    cat_lo + bits - 1,
                    cat_lo + take
                );
            }
        }
    } else {
        let total = layout.port_width();
        let take = total.min(output_width);
        let _ = writeln!(text, "    assign categories[{}:0] = out[{}:0];", take - 1, take - 1);
        if total > take {
            let _ = writeln!(text, "    assign categories[{}:{take}] = 0;", total - 1);
        }
    }
}

/// Relay stage: two kept inverters in series, so the net function is the
/// identity but synthesis cannot fold the wire away.
fn relay_module(cell: &str) -> String {
    let mut text = String::new();
    text.push_str("`ifdef SIM\n");
    let _ = writeln!(text, "module {cell} (");
    text.push_str("    input wire A,\n");
    text.push_str("    output wire Y\n");
    text.push_str(");\n");
    text.push_str("    assign Y = ~A;\n");
    text.push_str("endmodule\n");
    text.push_str("`endif\n\n");
    text.push_str("module relay_conn (\n");
    text.push_str("    input wire in,\n");
    text.push_str("    output wire out\n");
    text.push_str(");\n");
    text.push_str("    wire tmp;\n");
    text.push_str("    /* verilator lint_off PINMISSING */\n");
    let _ = writeln!(text, "    (* keep = \"true\" *) {cell} inv_a (.Y(tmp), .A(in));");
    let _ = writeln!(text, "    (* keep = \"true\" *) {cell} inv_b (.Y(out), .A(tmp));");
    text.push_str("    /* verilator lint_on PINMISSING */\n");
    text.push_str("endmodule\n");
    text
}
