//! Configuration management CLI commands.
//!
//! Provides `config show`, `config path`, and `config init`.

use std::path::Path;

use clap::Subcommand;
use areawatch::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (file values or defaults)
    Show,

    /// Show the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Init { force } => run_init(&config_file_path(), force),
    }
}

fn run_show() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load_from(&path)?;

    println!("Configuration Settings");
    println!("======================");
    if path.exists() {
        println!("Source: {}", path.display());
    } else {
        println!("Source: defaults ({} not found)", path.display());
    }
    println!();
    print!("{}", describe(&config));

    Ok(())
}

/// Render the effective settings as `key = value` lines grouped by section.
fn describe(config: &ConfigFile) -> String {
    let worker_threads = match config.tracker.worker_threads {
        Some(threads) => threads.to_string(),
        None => "shared pool".to_string(),
    };

    let mut out = String::new();
    out.push_str("[tracker]\n");
    out.push_str(&format!(
        "  tick_interval_ms = {}\n",
        config.tracker.tick_interval.as_millis()
    ));
    out.push_str(&format!("  default_slack = {}\n", config.tracker.default_slack));
    out.push_str(&format!("  worker_threads = {}\n", worker_threads));
    out.push('\n');
    out.push_str("[logging]\n");
    out.push_str(&format!(
        "  directory = {}\n",
        config.logging.directory.display()
    ));
    out.push_str(&format!("  file = {}\n", config.logging.file));
    out
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
