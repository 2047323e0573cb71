//! `rewardmap`: mark reward locations on an arena map, then run timed
//! reward-seeking trials against them.

mod commands;
mod surface;
mod telemetry;

use clap::{Parser, Subcommand};
use commands::{MarkArgs, RunArgs};
use tracing::Level;

#[derive(Parser)]
#[command(name = "rewardmap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reward location marking and trial runner", long_about = None)]
struct Cli {
    /// Enable debug logging (per-tick positions included)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Double-click reward sites on a map and save them
    Mark(MarkArgs),

    /// Run a session of reward-seeking trials
    Run(RunArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Mark(args) => commands::mark(args),
        Commands::Run(args) => commands::run(args),
    }
}
