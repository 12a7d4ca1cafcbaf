//! script-inspector - offline tools for debugger source presentation
//!
//! Concatenates inline scripts, pretty-prints with position anchors, maps
//! locations through a formatted mapping, and re-anchors breakpoint lines
//! across edits.

use std::path::PathBuf;

use clap::Parser;
use inspector::common::config::Config;
use inspector::common::error::ErrorInfo;
use inspector::common::logging;
use inspector::{cli, commands::Commands, Result};

#[derive(Parser)]
#[command(name = "inspector", about = "Source presentation tools for script debuggers")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();
    let json = cli.command.json();

    if let Err(e) = run(cli).await {
        if json {
            let info = ErrorInfo::from(&e);
            match serde_json::to_string(&info) {
                Ok(body) => println!("{body}"),
                Err(_) => eprintln!("Error: {e}"),
            }
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(?config, "Configuration loaded");
    cli::dispatch(cli.command, &config).await
}
