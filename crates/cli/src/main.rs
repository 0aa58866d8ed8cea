//! StreamProbe CLI - Main Entry Point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use streamprobe_common::{logging, HarnessConfig};
use streamprobe_cli::commands::{devices, gif, run};
use streamprobe_cli::output::{self, OutputFormat};

/// StreamProbe - mobile web search scenarios with visual artifacts
#[derive(Parser)]
#[command(name = "streamprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Harness configuration file
    #[arg(long, env = "STREAMPROBE_CONFIG", default_value = "config/config.yaml", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the device x browser x query matrix
    Run(run::RunArgs),

    /// Assemble a GIF from a screenshot directory
    Gif(gif::GifArgs),

    /// List device profiles
    Devices(devices::DevicesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<bool> {
    let mut config = HarnessConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if cli.verbose {
        config.logs.level = "debug".to_string();
    }
    // only scenario runs keep a log file
    let mut log_config = config.logs.clone();
    log_config.file &= matches!(cli.command, Commands::Run(_));
    logging::init(&log_config)?;

    match cli.command {
        Commands::Run(args) => run::execute(args, &config, cli.format),
        Commands::Gif(args) => gif::execute(args, &config, cli.format).map(|_| true),
        Commands::Devices(args) => devices::execute(args, cli.format).map(|_| true),
    }
}
