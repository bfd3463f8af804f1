//! Long-connection clamping.

use crate::passes::{Pass, PassContext};
use gateforge_netlist::{DistanceMode, Error, Layer, Network, Result};
use std::cmp::Ordering;
use tracing::info;

/// Pull source B of every over-long connection to exactly `limit` wires
/// from source A, on the side B already sat on.
pub struct ClampLongConnections {
    limit: usize,
}

impl ClampLongConnections {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

/// Clamp one layer in place; returns the number of gates moved.
pub fn clamp_layer(
    layer: &mut Layer,
    inputs: usize,
    limit: usize,
    mode: DistanceMode,
) -> Result<usize> {
    let mut moved = 0;
    for (index, gate) in layer.gates.iter_mut().enumerate() {
        if mode.distance(gate.a, gate.b, inputs) <= limit {
            continue;
        }
        let a = gate.a as i64;
        let reach = limit as i64;
        let mut b = match gate.a.cmp(&gate.b) {
            Ordering::Less => a + reach,
            Ordering::Greater => a - reach,
            Ordering::Equal => {
                return Err(Error::InvariantViolation(format!(
                    "gate {index}: zero-length connection reported as over-long"
                )))
            }
        };
        if mode == DistanceMode::Circular {
            let n = inputs as i64;
            if b >= n {
                b -= n;
            } else if b < 0 {
                b += n;
            }
        }
        gate.b = usize::try_from(b)
            .ok()
            .filter(|b| *b < inputs)
            .ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "gate {index}: clamped source {b} outside {inputs} inputs"
                ))
            })?;
        moved += 1;
    }
    Ok(moved)
}

impl Pass for ClampLongConnections {
    fn name(&self) -> &str {
        "clamp-long-connections"
    }

    fn run(&self, network: &mut Network, ctx: &mut PassContext) -> Result<()> {
        info!(limit = self.limit, "clamping connection length");
        let input_widths: Vec<usize> = (0..network.depth())
            .map(|i| network.layer_input_width(i))
            .collect();
        for (index, layer) in network.layers.iter_mut().enumerate() {
            let inputs = input_widths[index];
            let before = layer.wire_stats(inputs, ctx.distance);
            let moved = clamp_layer(layer, inputs, self.limit, ctx.distance)?;
            let after = layer.wire_stats(inputs, ctx.distance);
            if after.longest > self.limit {
                return Err(Error::InvariantViolation(format!(
                    "layer {index}: longest wire {} still exceeds {}",
                    after.longest, self.limit
                )));
            }
            if moved > 0 {
                ctx.record(self.name(), index, before, after);
            }
        }
        Ok(())
    }
}
