use std::{
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, load_settings_from, ClientSettings},
    load_resume_file, AnalyzeController, AtsApiClient, ControllerEvent, ResultsView, UiState,
};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "ats_cli", about = "Score a resume PDF against an ATS analyzer service")]
struct Args {
    /// Analyzer base url; overrides the config file and environment.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Settings file (defaults to ./ats_client.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a resume and show its ATS score and breakdown.
    Analyze {
        file: PathBuf,
        #[arg(long)]
        job_description: Option<String>,
        #[arg(long, conflicts_with = "job_description")]
        job_description_file: Option<PathBuf>,
        /// Download the generated report to this path.
        #[arg(long)]
        save_report: Option<PathBuf>,
        /// Print the analyzer response as JSON instead of the rendered view.
        #[arg(long)]
        json: bool,
    },
    /// Check that the analyzer is reachable.
    Health,
    /// Fetch a report by the url an analysis returned.
    DownloadReport {
        url: String,
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = resolve_settings(&args)?;
    let client = AtsApiClient::new(&settings)?;

    match args.command {
        Command::Analyze {
            file,
            job_description,
            job_description_file,
            save_report,
            json,
        } => {
            let job_description = match job_description_file {
                Some(path) => Some(tokio::fs::read_to_string(&path).await.with_context(|| {
                    format!("failed to read job description '{}'", path.display())
                })?),
                None => job_description,
            };
            analyze(&settings, client, file, job_description, save_report, json).await
        }
        Command::Health => {
            let health = client.health().await.context("analyzer health check failed")?;
            println!(
                "{}: {}",
                health.service.as_deref().unwrap_or(client.base_url()),
                health.status
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::DownloadReport { url, output } => {
            save_report_to(&client, &url, &output).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_settings(args: &Args) -> Result<ClientSettings> {
    let settings = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    let Some(base_url) = &args.base_url else {
        return Ok(settings);
    };

    let settings = settings.with_base_url(base_url.trim_end_matches('/'));
    settings.validate()?;
    Ok(settings)
}

async fn analyze(
    settings: &ClientSettings,
    client: AtsApiClient,
    file: PathBuf,
    job_description: Option<String>,
    save_report: Option<PathBuf>,
    json: bool,
) -> Result<ExitCode> {
    let client = Arc::new(client);
    let controller = AnalyzeController::new(client.clone(), settings.progress_settings());

    let resume = load_resume_file(&file).await?;
    if let Err(err) = controller.select_file(resume).await {
        eprintln!("{}", render::error(&err.to_string()));
        return Ok(ExitCode::FAILURE);
    }
    if let Some(text) = job_description {
        controller.set_job_description(text).await;
    }

    let printer = tokio::spawn(print_progress(controller.subscribe()));
    let state = controller.submit().await;
    let _ = printer.await;

    match state {
        UiState::ResultsShown(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render::results(&ResultsView::from_result(&result)));
            }

            if let Some(output) = save_report {
                match result.report_url() {
                    Some(url) => save_report_to(&client, &url, &output).await?,
                    None => eprintln!("No report was returned for this analysis."),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        UiState::Error(message) => {
            eprintln!("{}", render::error(&message));
            Ok(ExitCode::FAILURE)
        }
        other => {
            error!(state = ?other, "analysis ended in an unexpected state");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Redraws the progress bar until the submission settles.
async fn print_progress(mut events: Receiver<ControllerEvent>) {
    let mut stderr = std::io::stderr();
    loop {
        match events.recv().await {
            Ok(ControllerEvent::StateChanged(UiState::Uploading { progress })) => {
                let _ = write!(stderr, "\r{}", render::progress_line(progress));
                let _ = stderr.flush();
            }
            Ok(ControllerEvent::StateChanged(_)) | Err(RecvError::Closed) => break,
            Ok(ControllerEvent::Rejected(_)) | Err(RecvError::Lagged(_)) => continue,
        }
    }
    let _ = writeln!(stderr);
}

async fn save_report_to(client: &AtsApiClient, url: &str, output: &Path) -> Result<()> {
    let bytes = client.download_report(url).await.map_err(|err| {
        anyhow::anyhow!("failed to download report '{url}': {}", err.user_message())
    })?;
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("failed to write report to '{}'", output.display()))?;
    info!(path = %output.display(), size_bytes = bytes.len(), "report saved");
    Ok(())
}
