//! CLI entry point for the batchget download manager.

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use batchget_core::{
    DownloadManager, FilenameResolver, HttpClient, StartOptions, TransferKind, WorkItem,
    generate_numbered_urls, is_media_url,
};

mod cli;
mod report;

use cli::Args;
use report::StatusReporter;

/// Interval between status snapshots.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    // Collect URLs: template expansion, positional args, or stdin.
    // Template validation happens before anything is enqueued.
    let urls = if let Some(template) = &args.template {
        generate_numbered_urls(template, args.start, args.end, args.digits.map(usize::from))
            .context("invalid batch template parameters")?
    } else if !args.urls.is_empty() {
        args.urls.clone()
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        println!("No input provided. Pipe URLs via stdin or pass as arguments.");
        println!("Example: echo 'https://example.com/file.pdf' | batchget");
        return Ok(ExitCode::SUCCESS);
    };

    if urls.is_empty() {
        println!("No URLs found in input.");
        return Ok(ExitCode::SUCCESS);
    }

    info!(urls = urls.len(), output = %args.output.display(), "starting");

    // The caller owns path creation; do it before any name resolution.
    tokio::fs::create_dir_all(&args.output)
        .await
        .with_context(|| format!("could not create output directory {}", args.output.display()))?;

    // Pre-resolve every filename so workers never consult the resolver.
    let client = HttpClient::new();
    let mut resolver = FilenameResolver::new();
    resolver.set_batch_prefix(args.batch_prefix.clone());

    let mut items = Vec::with_capacity(urls.len());
    for url in &urls {
        let kind = if is_media_url(url) {
            TransferKind::Extractor
        } else {
            TransferKind::Http
        };
        let filename = resolver.resolve(url, kind, &client).await;
        debug!(%url, %filename, "resolved name");
        items.push(WorkItem::new(url.clone(), filename, &args.output, kind));
    }

    let manager = DownloadManager::with_client(usize::from(args.concurrency), client)?;
    manager.enqueue(items);

    // Ctrl-C requests a cooperative stop; workers unwind within one chunk.
    {
        let manager = manager.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping all transfers");
                manager.stop_all();
            }
        });
    }

    let handle = manager.start(StartOptions {
        quality: args.quality,
    });

    // Poll snapshots until the batch handle resolves, then drain once more
    // so late results are still reported exactly once.
    let mut reporter = StatusReporter::new();
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let snapshot = manager.snapshot();
        reporter.render(&snapshot, manager.is_paused());
        if handle.is_finished() {
            let last = manager.snapshot();
            reporter.render(&last, false);
            break;
        }
    }

    let totals = reporter.finish();
    let stopped = manager.is_stopped();
    if stopped {
        println!(
            "Stopped. {} completed, {} failed, {} already existed.",
            totals.completed, totals.failed, totals.existing
        );
    } else {
        println!(
            "Finished. {} completed, {} failed, {} already existed.",
            totals.completed, totals.failed, totals.existing
        );
    }

    if totals.failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
