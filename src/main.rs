//! Console Capture CLI - replay console calls and print what was captured
//!
//! Commands:
//!   console-capture run <script>  - Replay a JSON call script and print the log
//!   console-capture members       - List the standard console members

use clap::{Parser, Subcommand};
use console_capture::console::CONSOLE_MEMBERS;
use console_capture::script::{parse_script, render, replay};
use console_capture::{CaptureConfig, TracingConsole};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "console-capture")]
#[command(about = "Record and sanitize calls made to a console", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a call script against a captured console and print the log
    Run {
        /// Path to the JSON call script
        script: PathBuf,

        /// Depth bound for opaque objects, overriding the config file
        #[arg(long, short = 'd')]
        depth: Option<u32>,

        /// Path to a JSON capture configuration
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output the tagged form instead of page JSON
        #[arg(long)]
        tagged: bool,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// List the standard console members
    Members,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            depth,
            config,
            tagged,
            pretty,
        } => run_command(&script, depth, config.as_deref(), tagged, pretty),
        Commands::Members => {
            for member in CONSOLE_MEMBERS {
                println!("{member}");
            }
            Ok(())
        }
    }
}

fn run_command(
    script: &Path,
    depth: Option<u32>,
    config: Option<&Path>,
    tagged: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => CaptureConfig::load(path)?,
        None => CaptureConfig::default(),
    };
    if let Some(depth) = depth {
        config.depth = depth;
    }

    let json = std::fs::read_to_string(script)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", script.display(), e))?;
    let calls = parse_script(&json)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", script.display(), e))?;

    let installation = replay(&config, Rc::new(TracingConsole), &calls)?;
    let output = render(&installation.records(), tagged)?;

    if pretty {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}
