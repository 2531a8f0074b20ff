mod adapter;
mod app;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::IntakeConfig;

const DEFAULT_LOG_FILTER: &str = "info,ycloud_intake=debug,ycloud_backend=debug";

/// Select files and upload them to the ycloud backend.
#[derive(Debug, Parser)]
#[command(name = "ycloud-intake", version, about)]
struct Cli {
    /// Configuration file to use instead of the default location.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective configuration to its file and exit.
    #[arg(long)]
    write_config: bool,

    /// Files to upload, in selection order.
    #[arg(value_name = "FILE", required_unless_present = "write_config")]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => IntakeConfig::load_from(path)?,
        None => IntakeConfig::load().unwrap_or_default(),
    };

    if cli.write_config {
        cfg.save()?;
        println!("configuration written to {}", cfg.file_path().display());
        return Ok(ExitCode::SUCCESS);
    }

    let summary = app::run(&cfg, &cli.files).await?;
    println!(
        "{} uploaded, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
