//! Assemble a GIF from an existing screenshot directory

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use streamprobe_common::HarnessConfig;
use streamprobe_e2e::{GifArtifact, GifAssembler};

use crate::output::{print_success, print_warning, OutputFormat};

#[derive(Args)]
pub struct GifArgs {
    /// Directory holding the screenshots
    pub dir: PathBuf,

    /// Name of the GIF (without extension)
    #[arg(short, long, default_value = "screenshots")]
    pub name: String,

    /// Output directory, defaults to the configured GIF path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Display time of each frame in milliseconds
    #[arg(long)]
    pub frame_ms: Option<u64>,
}

/// Assemble per `args`, `None` when the directory has no frames
pub fn assemble(args: &GifArgs, config: &HarnessConfig) -> Result<Option<GifArtifact>> {
    let output = args.output.clone().unwrap_or_else(|| config.gifs.path.clone());
    let frame_duration = args
        .frame_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| config.gifs.frame_duration());

    GifAssembler::new(output, frame_duration)
        .assemble_or_warn(&args.dir, &args.name)
        .with_context(|| format!("assembling GIF from {}", args.dir.display()))
}

pub fn execute(args: GifArgs, config: &HarnessConfig, format: OutputFormat) -> Result<()> {
    match assemble(&args, config)? {
        Some(gif) => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&gif)?),
            _ => print_success(&format!(
                "GIF with {} frames written to {}",
                gif.frame_count,
                gif.path.display()
            )),
        },
        None => print_warning(&format!("No screenshots found in {}", args.dir.display())),
    }
    Ok(())
}
