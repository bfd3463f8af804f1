//! Transform pass configuration.

use gateforge_netlist::GateOp;
use serde::{Deserialize, Serialize};

/// Candidate gate functions per layer for the random override. The last
/// entry applies to every deeper layer; an empty list leaves that layer
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOverride {
    pub candidates: Vec<Vec<u8>>,
}

impl GateOverride {
    /// The same candidates for every layer.
    pub fn uniform(candidates: impl IntoIterator<Item = u8>) -> Self {
        Self {
            candidates: vec![candidates.into_iter().collect()],
        }
    }

    pub fn for_layer(&self, layer: usize) -> Option<&[u8]> {
        let last = self.candidates.len().checked_sub(1)?;
        self.candidates.get(layer.min(last)).map(Vec::as_slice)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.candidates.is_empty() {
            return Err("random gate override needs at least one candidate list".into());
        }
        for list in &self.candidates {
            if let Some(code) = list.iter().find(|code| GateOp::from_code(**code).is_none()) {
                return Err(format!("random gate candidate {code} is not an opcode"));
            }
        }
        Ok(())
    }
}

/// Zipf exponent per layer for connection rewiring, last entry reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerLaw {
    pub exponents: Vec<f64>,
}

impl PowerLaw {
    pub fn uniform(exponent: f64) -> Self {
        Self {
            exponents: vec![exponent],
        }
    }

    pub fn for_layer(&self, layer: usize) -> Option<f64> {
        let last = self.exponents.len().checked_sub(1)?;
        self.exponents.get(layer.min(last)).copied()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.exponents.is_empty() {
            return Err("power-law rewiring needs at least one exponent".into());
        }
        if let Some(alpha) = self
            .exponents
            .iter()
            .find(|alpha| !alpha.is_finite() || **alpha < 0.0)
        {
            return Err(format!("power-law exponent {alpha} must be finite and >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Seed for the stochastic passes; unseeded runs vary.
    pub seed: Option<u64>,
    pub random_gates: Option<GateOverride>,
    pub power_law: Option<PowerLaw>,
    /// Longest connection distance allowed after clamping.
    pub clamp: Option<usize>,
    /// Keep at most this many layers; 0 means no limit.
    pub max_layers: Option<usize>,
}

impl TransformConfig {
    pub fn is_stochastic(&self) -> bool {
        self.random_gates.is_some() || self.power_law.is_some()
    }
}
