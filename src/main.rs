// ABOUTME: Command-line entry point for batchpipe
// ABOUTME: Submits files, follows processing jobs and downloads their results

use anyhow::{Context, Result};
use batchpipe::controller::{Controller, SubmitOutcome};
use batchpipe::poller::PollOutcome;
use batchpipe::remote::ApiClient;
use batchpipe::view::TerminalView;
use batchpipe::{ApiConfig, Overrides};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "batchpipe")]
#[command(about = "Upload files for batch processing, follow progress and fetch the result", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the processing service
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Path to a TOML config file (defaults to ./batchpipe.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Delay between status polls, in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,
    /// Overwrite existing downloads without asking
    #[arg(short = 'y', long, global = true)]
    yes: bool,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DownloadArgs {
    /// Directory the processed file is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Do not download the result once processing completes
    #[arg(long)]
    no_download: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, follow its processing and download the result
    Process {
        /// File to upload
        file: Option<PathBuf>,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Follow an already submitted job
    Watch {
        job_id: String,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Print a job's current status as JSON
    Status { job_id: String },
    /// Download the result of a finished job
    Download {
        job_id: String,
        /// Directory the processed file is written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ApiConfig::load(
        cli.config.as_deref(),
        &Overrides {
            api_url: cli.api_url.clone(),
            poll_interval_ms: cli.poll_interval_ms,
        },
    )?;
    let assume_yes = cli.yes;

    match cli.command {
        Commands::Process { file, download } => {
            let view = Arc::new(TerminalView::new());
            let mut controller = Controller::new(&config, view.clone())?;

            match controller.submit(file.as_deref()).await {
                SubmitOutcome::NoFile => return Ok(ExitCode::from(2)),
                SubmitOutcome::Failed(_) => {
                    view.finish();
                    return Ok(ExitCode::FAILURE);
                }
                SubmitOutcome::Started(job_id) => {
                    tracing::info!(job_id = %job_id, "Processing started");
                }
            }

            finish_job(&mut controller, &view, &download, assume_yes).await
        }
        Commands::Watch { job_id, download } => {
            let view = Arc::new(TerminalView::new());
            let mut controller = Controller::new(&config, view.clone())?;
            controller.attach(job_id).await;
            finish_job(&mut controller, &view, &download, assume_yes).await
        }
        Commands::Status { job_id } => {
            let client = ApiClient::new(&config)?;
            let status = client.get_job_status(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Download { job_id, output_dir } => {
            let client = ApiClient::new(&config)?;
            match client
                .download_to(&job_id, &output_dir, |p| confirm_overwrite(p, assume_yes))
                .await?
            {
                Some(path) => println!("Saved {}", path.display()),
                None => println!("Download skipped"),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn finish_job(
    controller: &mut Controller,
    view: &TerminalView,
    download: &DownloadArgs,
    assume_yes: bool,
) -> Result<ExitCode> {
    let outcome = controller.wait().await?;
    view.finish();

    if !outcome.as_ref().is_some_and(PollOutcome::is_completed) {
        return Ok(ExitCode::FAILURE);
    }

    if download.no_download {
        if let Some(url) = controller.download_url() {
            println!("Result available at {}", url);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let saved = controller
        .download(&download.output_dir, |p| confirm_overwrite(p, assume_yes))
        .await
        .context("Processing finished but the result could not be downloaded")?;
    match saved {
        Some(path) => println!("Saved {}", path.display()),
        None => println!("Download skipped"),
    }
    Ok(ExitCode::SUCCESS)
}

fn confirm_overwrite(path: &Path, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    dialoguer::Confirm::new()
        .with_prompt(format!("{} already exists. Overwrite?", path.display()))
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Quiet by default: the progress bar and log lines share stderr.
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "batchpipe=warn",
        1 => "batchpipe=info",
        _ => "batchpipe=debug",
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_follows_verbosity() {
        assert_eq!(default_filter(0), "batchpipe=warn");
        assert_eq!(default_filter(1), "batchpipe=info");
        assert_eq!(default_filter(2), "batchpipe=debug");
        assert_eq!(default_filter(5), "batchpipe=debug");
    }

    #[test]
    fn test_cli_parses_watch_flags() {
        let cli = Cli::try_parse_from(["batchpipe", "-v", "watch", "abc", "--no-download"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Watch { job_id, download } => {
                assert_eq!(job_id, "abc");
                assert!(download.no_download);
            }
            _ => panic!("expected watch"),
        }
    }
}
