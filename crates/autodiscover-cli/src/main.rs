//! `autodiscover` - discover listening services from socket transitions

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "autodiscover")]
#[command(about = "Discover services from socket listen/unlisten transitions")]
#[command(version)]
struct Cli {
    /// Autodiscover configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a capture through the full pipeline and print config changes
    Discover {
        /// JSON-lines capture of socket transitions
        #[arg(short, long)]
        replay: PathBuf,

        /// Module catalog file
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Print the discovery events a capture produces
    Classify {
        /// JSON-lines capture of socket transitions
        #[arg(short, long)]
        replay: PathBuf,
    },

    /// Print every transition of a capture as a metric event
    Collect {
        /// JSON-lines capture of socket transitions
        #[arg(short, long)]
        replay: PathBuf,
    },

    /// List the modules of a catalog
    Modules {
        /// Module catalog file
        #[arg(long)]
        catalog: PathBuf,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    smol::block_on(async {
        let cli = Cli::parse();
        init_logging(&cli.log_level);

        match cli.command {
            Commands::Discover { replay, catalog } => {
                commands::discover::run(cli.config.as_deref(), &replay, &catalog).await
            }
            Commands::Classify { replay } => {
                commands::classify::run(cli.config.as_deref(), &replay).await
            }
            Commands::Collect { replay } => commands::collect::run(&replay).await,
            Commands::Modules { catalog } => commands::modules::run(&catalog).await,
        }
    })
}
