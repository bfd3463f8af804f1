//! Stochastic ablation passes: random gate functions and power-law wiring.

use crate::config::{GateOverride, PowerLaw};
use crate::passes::{Pass, PassContext};
use gateforge_netlist::{Error, GateOp, Network, Result};
use tracing::info;

/// Offsets whose weight falls to this fraction of the heaviest one are
/// dropped from the power-law distribution.
const LONG_TAIL_CUTOFF: f64 = 0.03;

/// Replace every gate's function with a uniform draw from its layer's
/// candidate list.
pub struct RandomGates {
    config: GateOverride,
}

impl RandomGates {
    pub fn new(config: GateOverride) -> Self {
        Self { config }
    }
}

impl Pass for RandomGates {
    fn name(&self) -> &str {
        "random-gates"
    }

    fn best_effort(&self) -> bool {
        true
    }

    fn run(&self, network: &mut Network, ctx: &mut PassContext) -> Result<()> {
        self.config.validate().map_err(Error::InvalidInput)?;
        let mut rewritten = 0;
        for (index, layer) in network.layers.iter_mut().enumerate() {
            let candidates: Vec<GateOp> = self
                .config
                .for_layer(index)
                .unwrap_or_default()
                .iter()
                .filter_map(|code| GateOp::from_code(*code))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            for gate in &mut layer.gates {
                gate.op = candidates[ctx.rng.usize(..candidates.len())];
            }
            rewritten += 1;
        }
        info!(layers = rewritten, "overwrote gates with random functions");
        Ok(())
    }
}

/// Cumulative distribution over source-B offsets `0..inputs`, weight
/// `(offset + 1)^-alpha`, with the long tail cut off.
pub fn offset_distribution(inputs: usize, alpha: f64) -> Vec<f64> {
    let weights: Vec<f64> = (1..=inputs).map(|k| (k as f64).powf(-alpha)).collect();
    let heaviest = weights.iter().cloned().fold(0.0, f64::max);
    let cutoff = heaviest * LONG_TAIL_CUTOFF;
    let kept: Vec<f64> = weights
        .into_iter()
        .map(|w| if w <= cutoff { 0.0 } else { w })
        .collect();
    let total: f64 = kept.iter().sum();
    let last_kept = kept.iter().rposition(|w| *w > 0.0).unwrap_or(0);
    let mut acc = 0.0;
    kept.iter()
        .enumerate()
        .map(|(offset, w)| {
            acc += w / total;
            // Rounding must not leave room for a draw past the last kept offset.
            if offset >= last_kept {
                1.0
            } else {
                acc
            }
        })
        .collect()
}

/// Offset whose cumulative share first exceeds `u` in `[0, 1)`.
fn pick(cdf: &[f64], u: f64) -> usize {
    cdf.partition_point(|c| *c <= u).min(cdf.len() - 1)
}

fn sample(cdf: &[f64], rng: &mut fastrand::Rng) -> usize {
    pick(cdf, rng.f64())
}

/// Resample connections: source A uniformly, source B at a Zipf-distributed
/// offset from A, wrapped around the layer's inputs.
pub struct PowerLawRewire {
    config: PowerLaw,
}

impl PowerLawRewire {
    pub fn new(config: PowerLaw) -> Self {
        Self { config }
    }
}

impl Pass for PowerLawRewire {
    fn name(&self) -> &str {
        "power-law-rewire"
    }

    fn best_effort(&self) -> bool {
        true
    }

    fn run(&self, network: &mut Network, ctx: &mut PassContext) -> Result<()> {
        self.config.validate().map_err(Error::InvalidInput)?;
        let input_widths: Vec<usize> = (0..network.depth())
            .map(|i| network.layer_input_width(i))
            .collect();
        let skip = usize::from(network.fixed_input_layer);
        for (index, layer) in network.layers.iter_mut().enumerate().skip(skip) {
            let inputs = input_widths[index];
            if inputs < 2 {
                return Err(Error::InvalidInput(format!(
                    "layer {index} has {inputs} inputs; power-law rewiring needs at least 2"
                )));
            }
            let alpha = self.config.for_layer(index).unwrap_or_default();
            let cdf = offset_distribution(inputs, alpha);
            let before = layer.wire_stats(inputs, ctx.distance);
            for gate in &mut layer.gates {
                let a = ctx.rng.usize(..inputs - 1);
                let b = a + sample(&cdf, &mut ctx.rng);
                gate.a = a;
                gate.b = if b >= inputs { b - inputs } else { b };
            }
            let after = layer.wire_stats(inputs, ctx.distance);
            ctx.record(self.name(), index, before, after);
        }
        Ok(())
    }
}
