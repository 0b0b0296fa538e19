/* src/cli/core/src/main.rs */

mod serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pagewire", version, about = "Live mustache page server")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Serve the configured pages
  #[command(visible_alias = "run", alias = "server", alias = "start")]
  Serve(serve::ServeArgs),
  /// Load the configuration and compile every template, then exit
  Check {
    /// Path to the JSON or YAML configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  match cli.command {
    Command::Serve(args) => serve::run(&args).await,
    Command::Check { config } => serve::check(&config),
  }
}
