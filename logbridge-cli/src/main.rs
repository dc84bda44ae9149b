//! Logbridge CLI - emit records through a configured logger.
//!
//! ```bash
//! logbridge --config logbridge.toml emit --level warn "disk almost full" used_pct=93
//! logbridge --file-path /tmp/app.log emit "written to a custom file"
//! logbridge check
//! ```
//!
//! See `logbridge --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use logbridge_core::config::LogSettings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logbridge", about = "Structured logging from the command line", version)]
struct Cli {
    /// Settings file; defaults apply when it does not exist
    #[arg(long, short, global = true, default_value = logbridge_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    overrides: commands::Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit one record to every configured output
    Emit {
        /// debug, info, warning or error
        #[arg(long, short, default_value = "info")]
        level: String,

        /// Message text
        message: String,

        /// Extra fields as key=value
        fields: Vec<String>,
    },
    /// Validate the settings and print what would be built
    Check,
}

fn main() {
    let cli = Cli::parse();

    let overrides = cli.overrides;
    let result = LogSettings::load_from(&cli.config).and_then(|mut settings| {
        overrides.apply(&mut settings);
        match cli.command {
            Commands::Emit { level, message, fields } => {
                commands::emit::run(&settings, &level, &message, &fields)
            }
            Commands::Check => commands::check::run(&settings),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
