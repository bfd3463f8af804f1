//! Drop trailing layers beyond a configured depth.

use crate::passes::{Pass, PassContext};
use gateforge_netlist::{Network, Result};
use tracing::info;

pub struct TruncateLayers {
    max_layers: usize,
}

impl TruncateLayers {
    pub fn new(max_layers: usize) -> Self {
        Self { max_layers }
    }
}

impl Pass for TruncateLayers {
    fn name(&self) -> &str {
        "truncate-layers"
    }

    fn run(&self, network: &mut Network, _ctx: &mut PassContext) -> Result<()> {
        if self.max_layers == 0 {
            return Ok(());
        }
        let removed = network.truncate(self.max_layers);
        if removed > 0 {
            info!(
                max_layers = self.max_layers,
                removed,
                remaining = network.depth(),
                "cut trailing layers"
            );
        }
        Ok(())
    }
}
