//! Storyreel CLI: run the story media pipeline against the configured store.
//!
//! Configuration comes from the environment (or a `.env` file). See `Config::from_env`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use storyreel_cli::{guess_mime_type, init_tracing, parse_category};
use storyreel_core::{Config, MediaCategory, UploadRequest};
use storyreel_processing::{MediaPipeline, ProcessRunner, ScratchSweeper, SweepReport};
use storyreel_storage::create_storage;

#[derive(Parser)]
#[command(name = "storyreel", about = "Story media ingestion and transcoding")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files. Several files are uploaded as one batch.
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Destination key prefix, e.g. story/image
        #[arg(long)]
        prefix: String,
        /// Expected category: image, video, audio, document
        #[arg(long, value_parser = parse_category)]
        category: Option<MediaCategory>,
        /// Object id to use instead of a generated one (single file only)
        #[arg(long)]
        name: Option<String>,
        /// Print every stored object (playlist and segments) instead of one URL
        #[arg(long)]
        detailed: bool,
    },
    /// Delete stored objects by URL
    Delete {
        /// URLs returned by an upload
        #[arg(required = true)]
        urls: Vec<String>,
        /// Report per-URL outcomes instead of failing on the first missing object
        #[arg(long)]
        batch: bool,
    },
    /// Show the key, file name and bucket of a stored object URL
    Info {
        url: String,
    },
    /// Remove stale files from the scratch directory
    Sweep {
        /// Keep sweeping every SCRATCH_SWEEP_INTERVAL_SECS until interrupted
        #[arg(long)]
        watch: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn upload_request(
    path: PathBuf,
    category: Option<MediaCategory>,
    name: Option<String>,
) -> anyhow::Result<UploadRequest> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Not a file path: {}", path.display()))?;
    let mime_type = guess_mime_type(&path);

    let mut request = UploadRequest::from_path(&path, file_name, mime_type)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    if let Some(category) = category {
        request = request.with_category(category);
    }
    if let Some(name) = name {
        request = request.with_custom_file_name(name);
    }
    Ok(request)
}

fn print_sweep(report: &SweepReport) -> anyhow::Result<()> {
    print_json(&serde_json::json!({
        "removed_files": report.removed_files,
        "removed_dirs": report.removed_dirs,
        "failures": report.failures,
    }))
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install signal handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to install Ctrl+C handler")?;
                tracing::info!("Received Ctrl+C signal");
            }
            _ = terminate.recv() => tracing::info!("Received terminate signal"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to install Ctrl+C handler")?;
        tracing::info!("Received Ctrl+C signal");
    }
    Ok(())
}

async fn sweep(config: &Config, watch: bool) -> anyhow::Result<()> {
    let sweeper = ScratchSweeper::from_config(config);
    if !watch {
        return print_sweep(&sweeper.sweep_once());
    }

    let root = sweeper.root().display().to_string();
    let Some(handle) = sweeper.start() else {
        anyhow::bail!("Scratch sweeping is disabled, set SCRATCH_SWEEP_INTERVAL_SECS above 0");
    };
    tracing::info!(root = %root, "Scratch sweeper running");

    let result = shutdown_signal().await;
    handle.abort();
    tracing::info!("Scratch sweeper stopped");
    result
}

async fn build_pipeline(config: &Config) -> anyhow::Result<MediaPipeline> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;
    Ok(MediaPipeline::from_config(config, storage, Arc::new(ProcessRunner)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Upload {
            files,
            prefix,
            category,
            name,
            detailed,
        } => {
            let pipeline = build_pipeline(&config).await?;
            if files.len() == 1 {
                let path = files.into_iter().next().context("No file given")?;
                let request = upload_request(path, category, name).await?;
                if detailed {
                    print_json(&pipeline.upload_single_detailed(request, &prefix).await?)?;
                } else {
                    print_json(&pipeline.upload_single(request, &prefix).await?)?;
                }
            } else {
                if name.is_some() {
                    anyhow::bail!("--name can only be used with a single file");
                }
                let mut requests = Vec::with_capacity(files.len());
                for path in files {
                    requests.push(upload_request(path, category, None).await?);
                }
                print_json(&pipeline.upload_multiple(requests, &prefix).await?)?;
            }
        }
        Commands::Delete { urls, batch } => {
            let pipeline = build_pipeline(&config).await?;
            if batch || urls.len() > 1 {
                let report = pipeline.delete_multiple(&urls).await;
                print_json(&report)?;
                if !report.is_complete_success() {
                    anyhow::bail!("{} of {} deletes failed", report.failed(), urls.len());
                }
            } else {
                for url in &urls {
                    pipeline.delete_single(url).await?;
                    tracing::info!(url = %url, "Deleted");
                }
            }
        }
        Commands::Info { url } => {
            let pipeline = build_pipeline(&config).await?;
            print_json(&pipeline.file_info(&url)?)?;
        }
        Commands::Sweep { watch } => sweep(&config, watch).await?,
    }

    Ok(())
}
