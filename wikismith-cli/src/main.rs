//! # wikismith CLI
//!
//! Command-line interface for the wikismith static wiki compiler.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wikismith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to wikismith.yml in the input directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the wiki once
    Build {
        /// Source directory
        input: PathBuf,

        /// Output directory (removed and recreated)
        output: PathBuf,

        /// Print the compile report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile, then recompile whenever the source directory changes
    Watch {
        /// Source directory
        input: PathBuf,

        /// Output directory (removed and recreated)
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build {
            input,
            output,
            json,
        } => {
            let site = commands::SitePaths::new(cli.config, input, output)?;
            commands::build_site(&site, json)
        }
        Commands::Watch { input, output } => {
            let site = commands::SitePaths::new(cli.config, input, output)?;
            commands::watch_site(site).await
        }
    }
}
