use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sonify_core::pipeline::{COMPARE_PRESET, DASHBOARD_PRESET, TREND_PRESET, render_request_json};
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(name = "sonify", version, about = "Render time-series sonification clips to WAV")]
struct Cli {
    /// Log per-render details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Single-series trend clip (`trend_v1`)
    Trend {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Two phrases on a shared scale (`compare_v1`)
    Compare {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Stereo traffic / conversion dashboard
    Dashboard {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let (preset, input, out) = match cli.command {
        Commands::Trend { input, out } => (TREND_PRESET, input, out),
        Commands::Compare { input, out } => (COMPARE_PRESET, input, out),
        Commands::Dashboard { input, out } => (DASHBOARD_PRESET, input, out),
    };

    let request =
        fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
    let (wav, meta) = render_request_json(preset, &request)
        .with_context(|| format!("rendering {preset} from {}", input.display()))?;

    fs::write(&out, &wav).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), bytes = wav.len(), "wrote clip");
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}
