//! Sitekit CLI - static-site asset pipeline with a live-reload dev server.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use sitekit_assets::SiteConfig;

mod commands;

/// Port the dev server listens on unless told otherwise.
const DEFAULT_PORT: u16 = 3000;

#[derive(Parser)]
#[command(name = "sitekit")]
#[command(about = "Static-site asset pipeline with a live-reload dev server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to site.toml config file
    #[arg(short, long, default_value = "site.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dev workflow: watcher, transforms and dev server (default)
    Dev {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Build the distribution tree
    Build,

    /// Clear the image optimization cache
    Clearcache,

    /// Assemble the symbol-mode SVG sprite and its style fragment
    Spritesvg,

    /// Assemble the store-mode SVG sprite (deprecated; needs the
    /// svg4everybody polyfill enabled)
    Storesvg,
}

impl Cli {
    /// Resolve the command to run; no subcommand means the dev workflow with
    /// its own defaults.
    fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Dev {
            port: DEFAULT_PORT,
            no_open: false,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = SiteConfig::load(&cli.config)?;

    match cli.into_command() {
        Commands::Dev { port, no_open } => {
            commands::dev::run(config, port, !no_open).await?;
        }
        Commands::Build => {
            commands::build::run(&config)?;
        }
        Commands::Clearcache => {
            commands::clearcache::run(&config)?;
        }
        Commands::Spritesvg => {
            commands::sprite::run(&config, sitekit_assets::SpriteMode::Symbol)?;
        }
        Commands::Storesvg => {
            commands::sprite::run(&config, sitekit_assets::SpriteMode::Store)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_matches_explicit_dev() {
        let implicit = Cli::parse_from(["sitekit"]).into_command();
        assert!(matches!(
            implicit,
            Commands::Dev {
                port: DEFAULT_PORT,
                no_open: false
            }
        ));

        let explicit = Cli::parse_from(["sitekit", "dev"]).into_command();
        assert!(matches!(
            explicit,
            Commands::Dev {
                port: DEFAULT_PORT,
                no_open: false
            }
        ));
    }

    #[test]
    fn dev_flags_override_defaults() {
        let cmd = Cli::parse_from(["sitekit", "dev", "--port", "8080", "--no-open"]).into_command();
        assert!(matches!(
            cmd,
            Commands::Dev {
                port: 8080,
                no_open: true
            }
        ));
    }
}
