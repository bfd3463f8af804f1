//! Compiler session orchestration: file-level entry points over
//! [`CompilerPipeline`]. Outputs are written only once every stage has
//! succeeded.

use crate::eval::{verify_test_vectors, VerificationReport};
use crate::pipeline::{staged, CompileArtifacts, CompilerConfig, CompilerPipeline};
use anyhow::{bail, Context, Result};
use gateforge_diagnostics::NetworkReport;
use gateforge_netlist::{NetlistArchive, Network, TestVectors};
use gateforge_quantizer::{Checkpoint, Quantized};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `.safetensors` training checkpoint.
    Checkpoint,
    /// `.npz` netlist archive.
    Netlist,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("safetensors") => Ok(InputKind::Checkpoint),
            Some("npz") => Ok(InputKind::Netlist),
            _ => bail!(
                "input stage failed: cannot tell the format of {} (expected .safetensors or .npz)",
                path.display()
            ),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            InputKind::Checkpoint => "a .safetensors checkpoint",
            InputKind::Netlist => "a .npz netlist archive",
        }
    }

    /// Fail unless `path` holds this kind of input.
    pub fn require(self, path: &Path) -> Result<()> {
        let found = InputKind::from_path(path)?;
        if found != self {
            bail!(
                "input stage failed: expected {}, but {} is {}",
                self.describe(),
                path.display(),
                found.describe()
            );
        }
        Ok(())
    }
}

/// `input` with its extension replaced.
pub fn default_output(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(extension)
}

/// Final file contents: a provenance line, then the emitted modules.
pub fn verilog_file(source: &Path, verilog: &str) -> String {
    format!("// Generated from: {}\n{verilog}", source.display())
}

fn write_verilog(input: &Path, output: &Path, artifacts: CompileArtifacts) -> Result<CompileArtifacts> {
    fs::write(output, verilog_file(input, &artifacts.verilog))
        .with_context(|| format!("io stage failed while writing {}", output.display()))?;
    info!(
        input = %input.display(),
        output = %output.display(),
        gates = artifacts.network.gate_count(),
        "verilog written"
    );
    Ok(artifacts)
}

pub struct CompilerSession {
    pipeline: CompilerPipeline,
}

impl CompilerSession {
    pub fn new(config: CompilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pipeline: CompilerPipeline::new(config),
        })
    }

    pub fn load_checkpoint(&self, path: &Path) -> Result<Checkpoint> {
        InputKind::Checkpoint.require(path)?;
        staged(
            Checkpoint::load_safetensors(path),
            &format!("loading {}", path.display()),
        )
    }

    pub fn load_archive(&self, path: &Path) -> Result<NetlistArchive> {
        InputKind::Netlist.require(path)?;
        staged(
            NetlistArchive::read(path),
            &format!("loading {}", path.display()),
        )
    }

    /// Decode `input` into a network, quantizing checkpoints on the way.
    pub fn load_network(&self, input: &Path) -> Result<(Network, Option<TestVectors>)> {
        let archive = match InputKind::from_path(input)? {
            InputKind::Checkpoint => {
                let checkpoint = self.load_checkpoint(input)?;
                self.pipeline.quantize(&checkpoint)?.archive
            }
            InputKind::Netlist => self.load_archive(input)?,
        };
        let network = staged(archive.to_network(), "decoding netlist archive")?;
        Ok((network, archive.test_vectors))
    }

    /// Quantize, transform and emit a `.safetensors` checkpoint.
    pub fn compile_checkpoint(&self, input: &Path) -> Result<CompileArtifacts> {
        let checkpoint = self.load_checkpoint(input)?;
        self.pipeline.compile_checkpoint(&checkpoint)
    }

    /// Transform and emit a `.npz` netlist archive. No quantization.
    pub fn compile_netlist(&self, input: &Path) -> Result<CompileArtifacts> {
        let archive = self.load_archive(input)?;
        self.pipeline.compile_archive(&archive)
    }

    pub fn compile_checkpoint_to_file(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<CompileArtifacts> {
        let artifacts = self.compile_checkpoint(input)?;
        write_verilog(input, output, artifacts)
    }

    pub fn compile_netlist_to_file(&self, input: &Path, output: &Path) -> Result<CompileArtifacts> {
        let artifacts = self.compile_netlist(input)?;
        write_verilog(input, output, artifacts)
    }

    /// Checkpoint to netlist archive, no transforms applied.
    pub fn quantize_to_file(&self, input: &Path, output: &Path) -> Result<Quantized> {
        let checkpoint = self.load_checkpoint(input)?;
        let quantized = self.pipeline.quantize(&checkpoint)?;
        staged(
            quantized.archive.write(output),
            &format!("writing {}", output.display()),
        )?;
        info!(output = %output.display(), "netlist archive written");
        Ok(quantized)
    }

    /// Statistics of the network as it would be emitted.
    pub fn report(&self, input: &Path) -> Result<NetworkReport> {
        let (mut network, _) = self.load_network(input)?;
        self.pipeline.transform(&mut network)?;
        Ok(NetworkReport::from_network(
            &network,
            self.pipeline.config().distance,
        ))
    }

    pub fn verify(&self, input: &Path) -> Result<VerificationReport> {
        let (mut network, vectors) = self.load_network(input)?;
        let Some(vectors) = vectors else {
            bail!("input stage failed: {} carries no test vectors", input.display());
        };
        self.pipeline.transform(&mut network)?;
        verify_test_vectors(
            &network,
            &vectors,
            self.pipeline.config().emit.categories.as_ref(),
        )
    }

    pub fn config(&self) -> &CompilerConfig {
        self.pipeline.config()
    }
}
