//! Parley CLI: the main entry point.
//!
//! Commands:
//! - `chat`    Talk to the assistant, one line per utterance
//! - `ask`     Handle a single utterance and exit
//! - `skills`  List the skills and whether they are enabled
//! - `auto`    Watch auto-runnable skills refresh their output
//! - `init`    Write the default configuration

use clap::{Parser, Subcommand};
use parley_config::AppConfig;
use std::path::PathBuf;

mod commands;
mod devices;
mod runtime;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Parley: a skill-routing voice assistant core",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this configuration file instead of ~/.parley/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the assistant: every line you type is an utterance
    Chat,

    /// Handle a single utterance
    Ask {
        /// What to say
        #[arg(short, long)]
        message: String,
    },

    /// List all skills with their enabled state
    Skills,

    /// Print auto-runnable skill outputs as they refresh
    Auto {
        /// Stop after this many seconds
        #[arg(short, long, default_value_t = 60)]
        seconds: u64,
    },

    /// Write the default configuration if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run(cli.config).await?,
        Commands::Chat => commands::chat::run(load_config(cli.config)?).await?,
        Commands::Ask { message } => commands::ask::run(load_config(cli.config)?, message).await?,
        Commands::Skills => commands::skills::run(load_config(cli.config)?).await?,
        Commands::Auto { seconds } => {
            commands::auto::run(load_config(cli.config)?, seconds).await?
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig, String> {
    match path {
        Some(path) => AppConfig::load_from(&path),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))
}
