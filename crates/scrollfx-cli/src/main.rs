use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrollfx_core::CoordinatorConfig;

mod commands;

#[derive(Parser)]
#[command(name = "scrollfx")]
#[command(author, version, about = "Scroll-driven animation coordinator tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scene file against an in-memory page and print the result
    Replay {
        /// Scene file (TOML)
        scene: PathBuf,
        /// Coordinator config file (defaults to ~/.config/scrollfx/config.toml)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sample an easing curve
    Easing {
        /// Curve name (e.g. easeInOutCubic), or "list"
        name: String,
        /// Number of samples from 0 to 1
        #[arg(short = 'n', long, default_value_t = 11, value_parser = clap::value_parser!(u32).range(2..=1000))]
        samples: u32,
    },
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; RUST_LOG wins over the config file's level
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        CoordinatorConfig::load()
            .map(|config| config.general.log_level)
            .unwrap_or_else(|_| "info".into())
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { scene, config, json } => {
            commands::replay::run(&scene, config.as_deref(), json).await
        }
        Commands::Easing { name, samples } => commands::easing::run(&name, samples as usize),
        Commands::Config { init } => commands::config::run(init),
    }
}
