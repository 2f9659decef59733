//! AreaWatch CLI - Command-line interface
//!
//! Runs the position tracker against a synthetic fleet and manages the
//! user configuration file.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "areawatch")]
#[command(version, about = "Live area-of-interest tracking for moving objects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a synthetic fleet sailing through a watched harbour
    Simulate {
        /// Number of vessels in the fleet
        #[arg(long, default_value = "20")]
        vessels: usize,

        /// Position reports per vessel
        #[arg(long, default_value = "40")]
        steps: u64,

        /// Milliseconds between reports and ticks (default: from config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Watch area radius in metres
        #[arg(long, default_value = "2000")]
        radius: f64,

        /// Exit slack in metres (default: from config)
        #[arg(long)]
        slack: Option<f64>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Simulate {
            vessels,
            steps,
            interval_ms,
            radius,
            slack,
            json,
        } => commands::simulate::run(SimulateArgs {
            vessels,
            steps,
            interval_ms,
            radius,
            slack,
            json,
        }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
