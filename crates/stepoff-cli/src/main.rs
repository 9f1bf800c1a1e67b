//! stepoff CLI - convert STEP B-rep files to OFF triangle meshes.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stepoff::{convert_file, ConvertOptions, LoopPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stepoff")]
#[command(about = "Convert a STEP (ISO 10303-21) B-rep file to an OFF triangle mesh", long_about = None)]
struct Cli {
    /// Input STEP file (.step or .stp)
    input: PathBuf,
    /// Output OFF file
    output: PathBuf,
    /// Decimal places used when merging coincident vertices
    #[arg(long, default_value_t = 6)]
    precision: usize,
    /// Skip faces whose edge loop is not closed
    #[arg(long)]
    strict_loops: bool,
    /// Write a JSON conversion report to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn options(&self) -> ConvertOptions {
        ConvertOptions {
            precision: self.precision,
            loop_policy: if self.strict_loops {
                LoopPolicy::RequireClosed
            } else {
                LoopPolicy::Lenient
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let report = convert_file(&cli.input, &cli.output, &cli.options())
        .with_context(|| format!("converting {}", cli.input.display()))?;

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    if !cli.quiet {
        println!(
            "Converted {} -> {} ({} vertices, {} triangles, {})",
            cli.input.display(),
            cli.output.display(),
            report.vertices,
            report.triangles,
            report.strategy
        );
    }

    Ok(())
}
