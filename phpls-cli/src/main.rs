use std::{
    fs::OpenOptions,
    io,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phpls_lsp::{Config, config::LogConfig};

mod subcommands;

use subcommands::{complete, diagnostics, infer};

/// PHP language intelligence from the command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root holding the `tags` index, overriding the configuration
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the inferred type of the expression at a position
    Type(infer::Args),

    /// Print completion items for the expression ending at a position
    Complete(complete::Args),

    /// Turn PHPStan JSON output into diagnostics for a file
    Diagnostics(diagnostics::Args),
}

fn setup_logging(config: &LogConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if let Ok(filter) = EnvFilter::try_from_env("PHPLS_LOG") {
        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(io::IsTerminal::is_terminal(&io::stderr()))
            .with_filter(filter);
        tracing_subscriber::registry().with(layer).init();
        return Ok(());
    }
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::new(config.level.as_str());
    if let Some(path) = &config.path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("unable to open log file {}", path.display()))?;
        let layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(layer).init();
    } else {
        let layer = fmt::layer().with_writer(io::stderr).with_filter(filter);
        tracing_subscriber::registry().with(layer).init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("unable to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(root) = cli.project_root {
        config.project_root = Some(root);
    }
    setup_logging(&config.log)?;
    tracing::debug!(?config, "configuration loaded");

    match &cli.command {
        Commands::Type(args) => infer::run(args),
        Commands::Complete(args) => complete::run(args, &config),
        Commands::Diagnostics(args) => diagnostics::run(args, &config),
    }
}
