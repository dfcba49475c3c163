//! `vidpeek` CLI - Parse short-video links into JSON metadata

mod cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vidpeek::Config;

use cmd::detect::cmd_detect;
use cmd::parse::cmd_parse;
use cmd::platforms::cmd_platforms;

#[derive(Parser)]
#[command(name = "vidpeek")]
#[command(about = "Extract video metadata from Xiaohongshu, Douyin, Bilibili and Kuaishou links")]
#[command(version)]
struct Cli {
    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.config/vidpeek/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and parse one or more video URLs, printing JSON
    Parse {
        /// Video page or share-link URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Maximum parses in flight
        #[arg(short, long, default_value = "4")]
        parallel: usize,

        /// One JSON object per line instead of pretty output
        #[arg(long)]
        compact: bool,
    },

    /// Show which platform each URL belongs to (no network access)
    Detect {
        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// List supported platforms and their domains
    Platforms,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ok = match cli.command {
        Commands::Parse {
            urls,
            parallel,
            compact,
        } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_parse(&urls, &config, parallel, compact).await?
        }
        Commands::Detect { urls } => cmd_detect(&urls),
        Commands::Platforms => {
            cmd_platforms();
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Logs go to stderr so stdout stays valid JSON.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("VIDPEEK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "vidpeek=debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::load().context("failed to load default config"),
    }
}
