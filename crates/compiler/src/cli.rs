//! CLI wiring for the gateforge compiler.

use crate::pipeline::{CompileArtifacts, CompilerConfig};
use crate::session::{default_output, CompilerSession};
use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use gateforge_hdl::{CategoryLayout, EmitStyle};
use gateforge_netlist::DistanceMode;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CATEGORIES: usize = 10;
pub const DEFAULT_BITS_PER_CATEGORY: usize = 800;

#[derive(Parser, Debug)]
#[command(
    name = "gateforge",
    about = "Compile trained logic-gate networks into synthesizable Verilog"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand that builds a network. They override the
/// matching fields of `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON compiler config.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Instantiate a `logic_gate` primitive per gate instead of inline assigns.
    #[arg(long, default_value_t = false)]
    pub expanded: bool,
    /// Insert a relay stage on B connections for every R wires of distance.
    #[arg(long, value_name = "R")]
    pub relay: Option<usize>,
    /// Clamp connection distance to at most D.
    #[arg(long, value_name = "D")]
    pub clamp: Option<usize>,
    /// Measure distance on a line instead of a ring.
    #[arg(long, default_value_t = false)]
    pub linear: bool,
    /// Seed for the random override passes.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Expose a categories port with C categories.
    #[arg(long, value_name = "C", num_args = 0..=1, default_missing_value = "10")]
    pub categories: Option<usize>,
    #[arg(long, value_name = "B")]
    pub bits_per_category: Option<usize>,
    /// Gather categories from evenly strided output slices.
    #[arg(long, default_value_t = false)]
    pub strided: bool,
    /// Write the layer statistics as JSON.
    #[arg(long)]
    pub report_json: Option<PathBuf>,
    /// Keep at most N layers.
    #[arg(long, value_name = "N")]
    pub max_layers: Option<usize>,
}

impl CommonArgs {
    pub fn to_config(&self) -> Result<CompilerConfig> {
        let mut config = match &self.config {
            Some(path) => CompilerConfig::load(path)?,
            None => CompilerConfig::default(),
        };
        if self.linear {
            config.distance = DistanceMode::Linear;
        }
        if self.expanded {
            config.emit.style = EmitStyle::Expanded;
        }
        if self.relay.is_some() {
            config.emit.relay = self.relay;
        }
        if self.clamp.is_some() {
            config.transform.clamp = self.clamp;
        }
        if self.seed.is_some() {
            config.transform.seed = self.seed;
        }
        if self.max_layers.is_some() {
            config.transform.max_layers = self.max_layers;
        }
        if self.categories.is_some() || self.bits_per_category.is_some() || self.strided {
            let mut layout = config.emit.categories.unwrap_or(CategoryLayout::new(
                DEFAULT_CATEGORIES,
                DEFAULT_BITS_PER_CATEGORY,
            ));
            if let Some(count) = self.categories {
                layout.count = count;
            }
            if let Some(bits) = self.bits_per_category {
                layout.bits_per_category = bits;
            }
            layout.strided |= self.strided;
            config.emit.categories = Some(layout);
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Quantize a .safetensors checkpoint and emit Verilog.
    CompileCheckpoint {
        input: PathBuf,
        output: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Transform a .npz netlist archive and emit Verilog.
    CompileNetlist {
        input: PathBuf,
        output: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Quantize a .safetensors checkpoint into a .npz netlist archive.
    Quantize {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Print layer statistics of a network.
    Report {
        input: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Run the test vectors carried by a network through the reference evaluator.
    Verify {
        input: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
    },
}

pub fn run_cli(cli: Cli) -> Result<()> {
    // A subscriber may already be installed when embedded or under test.
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();

    match cli.command {
        Command::CompileCheckpoint {
            input,
            output,
            common,
        } => {
            let session = CompilerSession::new(common.to_config()?)?;
            let output = output.unwrap_or_else(|| default_output(&input, "v"));
            let artifacts = session.compile_checkpoint_to_file(&input, &output)?;
            finish_compile(&common, &artifacts, &output)?;
        }
        Command::CompileNetlist {
            input,
            output,
            common,
        } => {
            let session = CompilerSession::new(common.to_config()?)?;
            let output = output.unwrap_or_else(|| default_output(&input, "v"));
            let artifacts = session.compile_netlist_to_file(&input, &output)?;
            finish_compile(&common, &artifacts, &output)?;
        }
        Command::Quantize { input, output } => {
            let session = CompilerSession::new(CompilerConfig::default())?;
            let output = output.unwrap_or_else(|| default_output(&input, "npz"));
            let quantized = session.quantize_to_file(&input, &output)?;
            if let Some(architecture) = &quantized.architecture {
                println!("Architecture: {architecture}");
            }
            println!(
                "Data has been converted and saved to '{}'.",
                output.display()
            );
        }
        Command::Report { input, common } => {
            let session = CompilerSession::new(common.to_config()?)?;
            let report = session.report(&input)?;
            print!("{}", report.render());
            write_report(&common, |path| report.save(path))?;
        }
        Command::Verify { input, common } => {
            let session = CompilerSession::new(common.to_config()?)?;
            let verification = session.verify(&input)?;
            println!(
                "samples={} exact_matches={}",
                verification.samples, verification.exact_matches
            );
            if let Some(matches) = verification.category_matches {
                println!("category_matches={matches}");
            }
            write_report(&common, |path| {
                std::fs::write(path, serde_json::to_string_pretty(&verification)?)?;
                Ok(())
            })?;
            if !verification.passed() {
                bail!(
                    "{} of {} samples disagree with their expected outputs",
                    verification.samples - verification.exact_matches,
                    verification.samples
                );
            }
        }
    }
    Ok(())
}

fn finish_compile(common: &CommonArgs, artifacts: &CompileArtifacts, output: &Path) -> Result<()> {
    print!("{}", artifacts.report.render());
    write_report(common, |path| artifacts.report.save(path))?;
    println!(
        "Verilog code has been generated and saved to '{}'.",
        output.display()
    );
    Ok(())
}

fn write_report<F>(common: &CommonArgs, save: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    if let Some(path) = &common.report_json {
        save(path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(args).unwrap().command
    }

    fn common(command: Command) -> CommonArgs {
        match command {
            Command::CompileCheckpoint { common, .. }
            | Command::CompileNetlist { common, .. }
            | Command::Report { common, .. }
            | Command::Verify { common, .. } => common,
            Command::Quantize { .. } => CommonArgs::default(),
        }
    }

    #[test]
    fn test_compile_netlist_flags() {
        let command = parse(&[
            "gateforge",
            "compile-netlist",
            "net.npz",
            "--max-layers",
            "3",
            "--clamp",
            "128",
            "--relay",
            "64",
            "--expanded",
            "--linear",
        ]);
        let Command::CompileNetlist { input, output, common } = command else {
            panic!("wrong subcommand");
        };
        assert_eq!(input, PathBuf::from("net.npz"));
        assert_eq!(output, None);

        let config = common.to_config().unwrap();
        assert_eq!(config.transform.max_layers, Some(3));
        assert_eq!(config.transform.clamp, Some(128));
        assert_eq!(config.emit.relay, Some(64));
        assert_eq!(config.emit.style, EmitStyle::Expanded);
        assert_eq!(config.distance, DistanceMode::Linear);
        assert_eq!(config.emit.categories, None);
    }

    #[test]
    fn test_category_defaults() {
        let config = common(parse(&[
            "gateforge",
            "compile-checkpoint",
            "m.safetensors",
            "out.v",
            "--categories",
        ]))
        .to_config()
        .unwrap();
        assert_eq!(config.emit.categories, Some(CategoryLayout::new(10, 800)));

        let config = common(parse(&[
            "gateforge",
            "compile-netlist",
            "net.npz",
            "--bits-per-category",
            "8",
            "--strided",
        ]))
        .to_config()
        .unwrap();
        assert_eq!(
            config.emit.categories,
            Some(CategoryLayout::new(10, 8).strided(true))
        );
    }

    #[test]
    fn test_compile_subcommands_reject_the_other_input_kind() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("model.safetensors");
        let archive = dir.path().join("net.npz");
        let output = dir.path().join("out.v");
        std::fs::write(&checkpoint, b"not read").unwrap();
        std::fs::write(&archive, b"not read").unwrap();

        for (subcommand, input) in [("compile-netlist", &checkpoint), ("compile-checkpoint", &archive)] {
            let cli = Cli::try_parse_from([
                "gateforge",
                subcommand,
                input.to_str().unwrap(),
                output.to_str().unwrap(),
            ])
            .unwrap();
            let err = run_cli(cli).unwrap_err();
            assert!(
                format!("{err:#}").contains("input stage failed"),
                "{subcommand}: {err:#}"
            );
            assert!(!output.exists());
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "transform": { "clamp": 16, "seed": 1 }, "emit": { "categories": { "count": 4, "bits_per_category": 2 } } }"#,
        )
        .unwrap();
        let config = common(parse(&[
            "gateforge",
            "report",
            "net.npz",
            "--config",
            path.to_str().unwrap(),
            "--clamp",
            "8",
            "--categories",
            "5",
        ]))
        .to_config()
        .unwrap();
        assert_eq!(config.transform.clamp, Some(8));
        assert_eq!(config.transform.seed, Some(1));
        assert_eq!(config.emit.categories, Some(CategoryLayout::new(5, 2)));
    }
}
