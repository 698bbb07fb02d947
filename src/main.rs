//! CLI entry point for the mediadock tool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mediadock_core::{
    FsStorage, LibraryError, LibraryManager, TransferEngine, TransferProgress, TransferSettings,
};
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_default_file_config()?;
    if let Some(path) = loaded.path.as_deref()
        && loaded.config.is_some()
    {
        debug!(path = %path.display(), "loaded config file");
    }
    let file_config = loaded.config.unwrap_or_default();

    let root = resolve_root(args.root.clone(), &file_config);
    let settings = resolve_transfer_settings(args.timeout, &file_config);
    debug!(root = %root.display(), ?settings, "resolved runtime settings");

    let engine =
        TransferEngine::try_with_settings(settings).context("Failed to build HTTP client")?;
    let manager = LibraryManager::new(Arc::new(FsStorage::new(root)), engine);

    match args.command {
        Command::Download { url } => run_download(&manager, &url, args.quiet).await,
        Command::List { json } => run_list(&manager, json).await,
        Command::Delete { name } => run_delete(&manager, &name).await,
        Command::Clear => run_clear(&manager).await,
    }
}

fn resolve_root(cli_root: Option<PathBuf>, file_config: &FileConfig) -> PathBuf {
    cli_root
        .or_else(|| file_config.library_root.clone())
        .unwrap_or_else(app_config::default_library_root)
}

fn resolve_transfer_settings(cli_timeout: Option<u64>, file_config: &FileConfig) -> TransferSettings {
    let defaults = TransferSettings::default();
    TransferSettings {
        connect_timeout: file_config
            .connect_timeout_secs
            .map_or(defaults.connect_timeout, Duration::from_secs),
        deadline: cli_timeout
            .or(file_config.transfer_timeout_secs)
            .map_or(defaults.deadline, Duration::from_secs),
    }
}

/// Prefixes the error with its kind so scripts can match on it.
fn report(error: LibraryError) -> anyhow::Error {
    anyhow!("[{}] {error}", error.kind())
}

async fn run_download(manager: &LibraryManager, url: &str, quiet: bool) -> Result<()> {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };
    bar.set_message(url.to_string());

    let bytes_style = ProgressStyle::with_template(
        "{bar:40.cyan/blue} {bytes}/{total_bytes} ({percent}%) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let on_progress = |progress: TransferProgress| {
        if bar.length() != Some(progress.bytes_total) {
            bar.set_style(bytes_style.clone());
            bar.set_length(progress.bytes_total);
        }
        bar.set_position(progress.bytes_transferred);
    };

    let download = manager.request_download(url, on_progress);
    tokio::pin!(download);

    let result = tokio::select! {
        result = &mut download => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling download");
            manager.cancel_download();
            download.await
        }
    };

    match result {
        Ok(entry) => {
            bar.finish_and_clear();
            info!(
                path = %entry.storage_path,
                bytes = entry.size_bytes,
                "Download complete"
            );
            println!("{}", entry.storage_path);
            Ok(())
        }
        Err(error) => {
            bar.abandon();
            Err(report(error))
        }
    }
}

async fn run_list(manager: &LibraryManager, json: bool) -> Result<()> {
    let entries = manager.list_library().await.map_err(report)?;
    if json {
        let rendered =
            serde_json::to_string_pretty(&entries).context("Failed to serialize library")?;
        println!("{rendered}");
        return Ok(());
    }

    if entries.is_empty() {
        info!("Library is empty");
        return Ok(());
    }
    for entry in &entries {
        println!("{}\t{}", entry.size_bytes, entry.storage_path);
    }
    let total_bytes: u64 = entries.iter().map(|e| e.size_bytes).sum();
    info!(entries = entries.len(), total_bytes, "Library listed");
    Ok(())
}

async fn run_delete(manager: &LibraryManager, name: &str) -> Result<()> {
    manager.delete_entry(name).await.map_err(report)?;
    info!(name, "Deleted");
    Ok(())
}

async fn run_clear(manager: &LibraryManager) -> Result<()> {
    let report_summary = manager.clear_all().await.map_err(report)?;
    for failure in &report_summary.failures {
        warn!(file = %failure.file_name, error = %failure.error, "Could not delete");
    }
    info!(
        removed = report_summary.removed,
        failed = report_summary.failures.len(),
        "Library cleared"
    );
    println!("removed {}", report_summary.removed);
    Ok(())
}
