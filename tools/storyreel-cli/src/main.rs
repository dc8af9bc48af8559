//! StoryReel CLI — Command-line interface for rendering story videos.
//!
//! Usage:
//!   storyreel render <MANIFEST>   Render a script manifest to video
//!   storyreel probe <PATH>        Probe a media asset
//!   storyreel check               Check the rendering environment
//!   storyreel init                Write a default configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "storyreel",
    about = "Assemble narrated story videos from generated scenes",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "storyreel.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a script manifest to a finished video
    Render {
        /// Path to the script manifest JSON
        manifest: PathBuf,

        /// Override the active category
        #[arg(long)]
        category: Option<String>,

        /// Override the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Enable depth-parallax rendering for pan scenes
        #[arg(long)]
        parallax: bool,
    },

    /// Probe a media asset and print its properties
    Probe {
        /// Path to the media file
        path: PathBuf,
    },

    /// Check that the rendering environment is usable
    Check,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    storyreel_common::logging::init_logging(&storyreel_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
    });

    match cli.command {
        Commands::Render {
            manifest,
            category,
            output,
            parallax,
        } => commands::render::run(cli.config, manifest, category, output, parallax).await,
        Commands::Probe { path } => commands::probe::run(path),
        Commands::Check => commands::check::run(cli.config),
        Commands::Init { force } => commands::init::run(cli.config, force),
    }
}
