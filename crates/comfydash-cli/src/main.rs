//! ComfyDash Scan - builds the model catalog for the dashboard.
//!
//! Runs a single scan of a ComfyUI installation through comfydash-core and
//! persists the catalog, optionally echoing it to stdout. Logs go to stderr
//! so stdout stays machine-readable.

mod progress;

use anyhow::{Context, Result};
use clap::Parser;
use comfydash_core::{CancellationToken, CatalogScanner, Category, ScanOutcome, ScanRequest};
use progress::CliReporter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "comfydash-scan")]
#[command(about = "Catalog ComfyUI checkpoints, LoRAs and embeddings")]
struct Args {
    /// ComfyUI root directory (a leading ~ is expanded)
    #[arg(short, long)]
    root: PathBuf,

    /// Catalog destination (defaults to <root>/catalog.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not write the catalog file
    #[arg(long)]
    no_write: bool,

    /// Print the catalog JSON to stdout
    #[arg(long)]
    stdout: bool,

    /// Files processed concurrently
    #[arg(short, long, default_value_t = comfydash_core::ScannerConfig::DEFAULT_MAX_WORKERS)]
    workers: usize,

    /// Hide per-category progress bars
    #[arg(long)]
    no_progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn to_request(&self) -> ScanRequest {
        let mut request = ScanRequest::new(&self.root)
            .persist(!self.no_write)
            .max_workers(self.workers);
        if let Some(output) = &self.output {
            request = request.with_output(output);
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut request = args.to_request();
    if !args.no_progress {
        request = request.with_progress(Arc::new(CliReporter::new()));
    }
    let cancel = CancellationToken::new();
    let scan = CatalogScanner::scan_async(request, cancel.clone());
    tokio::pin!(scan);

    let result = tokio::select! {
        result = &mut scan => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, cancelling scan");
            cancel.cancel();
            scan.await
        }
    };
    let outcome = result.with_context(|| format!("Scan of {} failed", args.root.display()))?;

    log_summary(&outcome);

    if args.stdout {
        // Intentional stdout: the catalog is the program's output
        println!("{}", serde_json::to_string_pretty(&outcome.catalog)?);
    }

    Ok(())
}

fn log_summary(outcome: &ScanOutcome) {
    for category in Category::ALL {
        info!("{:>11}: {}", category.to_string(), outcome.catalog.count(category));
    }
    for entry in &outcome.skipped {
        warn!("Skipped {}: {}", entry.path.display(), entry.reason);
    }
    match &outcome.written_to {
        Some(path) => info!("Catalog saved to {}", path.display()),
        None => info!("Catalog not written (--no-write)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_required() {
        assert!(Args::try_parse_from(["comfydash-scan"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["comfydash-scan", "--root", "/comfy"]).unwrap();
        let request = args.to_request();
        assert_eq!(request.root, PathBuf::from("/comfy"));
        assert!(request.persist);
        assert!(request.output.is_none());
        assert_eq!(
            request.max_workers,
            comfydash_core::ScannerConfig::DEFAULT_MAX_WORKERS
        );
        assert!(!args.stdout);
        assert!(!args.no_progress);
        assert!(request.progress.is_none());
    }

    #[test]
    fn test_flags_map_to_request() {
        let args = Args::try_parse_from([
            "comfydash-scan",
            "--root",
            "~/ComfyUI",
            "--output",
            "/tmp/catalog.json",
            "--no-write",
            "--stdout",
            "--workers",
            "8",
        ])
        .unwrap();
        let request = args.to_request();
        assert!(!request.persist);
        assert_eq!(request.output, Some(PathBuf::from("/tmp/catalog.json")));
        assert_eq!(request.max_workers, 8);
        assert!(args.stdout);
    }
}
