//! Connection distance under a linear or ring floorplan.

use serde::{Deserialize, Serialize};

/// How the gap between a gate's two source wires is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    /// `|a - b|`
    Linear,
    /// `min(|a - b|, n - |a - b|)`: wire 0 and wire n-1 sit next to each other.
    #[default]
    Circular,
}

impl DistanceMode {
    pub fn distance(self, a: usize, b: usize, inputs: usize) -> usize {
        let d = a.abs_diff(b);
        match self {
            DistanceMode::Linear => d,
            DistanceMode::Circular if d > inputs / 2 => inputs.saturating_sub(d),
            DistanceMode::Circular => d,
        }
    }

    /// Largest distance the mode can produce for `inputs` wires.
    pub fn max_distance(self, inputs: usize) -> usize {
        match self {
            DistanceMode::Linear => inputs.saturating_sub(1),
            DistanceMode::Circular => inputs / 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMode::Linear => "linear",
            DistanceMode::Circular => "circular",
        }
    }
}

/// Longest and average wire of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WireStats {
    pub longest: usize,
    pub mean: f64,
    pub total: usize,
}

impl WireStats {
    pub fn from_distances<I>(distances: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut longest = 0;
        let mut total = 0;
        let mut count = 0usize;
        for d in distances {
            longest = longest.max(d);
            total += d;
            count += 1;
        }
        let mean = if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        };
        Self {
            longest,
            mean,
            total,
        }
    }
}
