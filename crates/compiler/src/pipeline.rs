//! Compiler pass pipeline assembly.

use anyhow::{Context, Result};
use gateforge_diagnostics::NetworkReport;
use gateforge_hdl::{EmitConfig, VerilogEmitter};
use gateforge_netlist::{DistanceMode, NetlistArchive, Network, TestVectors};
use gateforge_quantizer::{quantize, Checkpoint, Quantized};
use gateforge_transform::{PassContext, PassPipeline, TransformConfig, WireReport};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Everything one compilation needs to know, passed explicitly so runs with
/// different settings can share a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub distance: DistanceMode,
    pub transform: TransformConfig,
    pub emit: EmitConfig,
}

impl CompilerConfig {
    /// Load a JSON config; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Stochastic transform settings are checked by their passes, which skip
    /// themselves when misconfigured.
    pub fn validate(&self) -> Result<()> {
        self.emit
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid emit config")?;
        Ok(())
    }
}

/// Tag a library error with the pipeline stage it came from.
pub(crate) fn staged<T>(result: gateforge_netlist::Result<T>, action: &str) -> Result<T> {
    result.map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("{stage} stage failed while {action}"))
    })
}

#[derive(Debug)]
pub struct CompileArtifacts {
    pub network: Network,
    pub verilog: String,
    pub report: NetworkReport,
    pub wire_reports: Vec<WireReport>,
    pub test_vectors: Option<TestVectors>,
}

pub struct CompilerPipeline {
    config: CompilerConfig,
}

impl CompilerPipeline {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn quantize(&self, checkpoint: &Checkpoint) -> Result<Quantized> {
        staged(quantize(checkpoint), "quantizing checkpoint")
    }

    /// Run the configured passes in place; returns their wire reports.
    pub fn transform(&self, network: &mut Network) -> Result<Vec<WireReport>> {
        let transform = &self.config.transform;
        let pipeline = PassPipeline::from_config(transform);
        if transform.is_stochastic() {
            warn!(
                seed = ?transform.seed,
                "stochastic overrides enabled; output is an ablation artifact"
            );
        }
        info!(passes = ?pipeline.pass_names(), "running transform passes");

        let mut ctx = PassContext::new(self.config.distance, transform.seed);
        staged(pipeline.run(network, &mut ctx), "transforming network")?;
        Ok(ctx.reports)
    }

    pub fn emit(&self, network: &Network) -> Result<String> {
        let emitter = VerilogEmitter::new(self.config.emit.clone(), self.config.distance);
        staged(emitter.emit(network), "emitting verilog")
    }

    pub fn compile_network(
        &self,
        mut network: Network,
        test_vectors: Option<TestVectors>,
    ) -> Result<CompileArtifacts> {
        let wire_reports = self.transform(&mut network)?;
        let verilog = self.emit(&network)?;
        let report = NetworkReport::from_network(&network, self.config.distance);

        Ok(CompileArtifacts {
            network,
            verilog,
            report,
            wire_reports,
            test_vectors,
        })
    }

    pub fn compile_archive(&self, archive: &NetlistArchive) -> Result<CompileArtifacts> {
        let network = staged(archive.to_network(), "decoding netlist archive")?;
        self.compile_network(network, archive.test_vectors.clone())
    }

    pub fn compile_checkpoint(&self, checkpoint: &Checkpoint) -> Result<CompileArtifacts> {
        let quantized = self.quantize(checkpoint)?;
        self.compile_archive(&quantized.archive)
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }
}
