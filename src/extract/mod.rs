//! External media-extraction tool integration.
//!
//! Media-site URLs (YouTube and friends) are not direct file links; they are
//! handed to an external extractor binary (`yt-dlp`) invoked as a
//! subprocess. The tool is opaque: we give it an output-path template and a
//! format selector, parse its stdout for progress and the final destination,
//! and treat a non-zero exit as a failure. Stop/pause are honored between
//! stdout lines (a stop kills the child).

pub mod progress;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::download::worker::register_active;
use crate::download::{ActiveRecord, ControlFlags, ResultRecord, TransferError, WorkItem};
use self::progress::{parse_destination_line, parse_progress_line};

/// Name of the external extractor binary, resolved via PATH.
pub const EXTRACTOR_BIN: &str = "yt-dlp";

/// Hosts routed to the extractor instead of the HTTP worker.
const MEDIA_HOSTS: &[&str] = &["youtube.com", "youtu.be", "m.youtube.com"];

/// Extensions scanned for when the tool does not report its destination.
const MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mkv", ".mp3", ".ogg", ".avi", ".m4a"];

/// Leftover suffixes the tool uses for in-progress files.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".temp", ".ytdl"];

/// Quality selector forwarded to the extractor as a format string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Best available video+audio.
    #[default]
    Best,
    /// Up to 1080p.
    High,
    /// Up to 720p.
    Medium,
    /// Up to 480p.
    Low,
    /// Audio only.
    Audio,
}

impl Quality {
    /// Returns the extractor format selector for this quality.
    #[must_use]
    pub fn format_selector(&self) -> &'static str {
        match self {
            Self::Best => "bestvideo+bestaudio/best",
            Self::High => {
                "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080]/best"
            }
            Self::Medium => {
                "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720]/best"
            }
            Self::Low => {
                "bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]/best[height<=480]/best"
            }
            Self::Audio => "bestaudio[ext=m4a]/bestaudio",
        }
    }

    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns true if the URL's host belongs to a known media site.
#[must_use]
pub fn is_media_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    MEDIA_HOSTS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

/// Outcome of a finished tool run, before filename recovery.
enum ToolOutcome {
    Finished { destination: Option<String> },
    Stopped,
}

/// Runs the extractor for one work item, returning its terminal record.
///
/// Mirrors the HTTP worker's contract: an `exists` short-circuit for the
/// assigned filename, cooperative stop/pause, partial cleanup on failure,
/// and exactly one terminal record.
#[instrument(level = "debug", skip(flags, active), fields(url = %item.url, filename = %item.filename))]
pub(crate) async fn run_extraction(
    item: &WorkItem,
    quality: Quality,
    flags: &ControlFlags,
    active: &DashMap<String, ActiveRecord>,
) -> ResultRecord {
    let assigned_target = item.dest_dir.join(&item.filename);
    if assigned_target.exists() {
        debug!(path = %assigned_target.display(), "target already exists, skipping extraction");
        let size = std::fs::metadata(&assigned_target)
            .map(|meta| meta.len())
            .unwrap_or(0);
        return ResultRecord::exists(&item.url, &item.filename, size);
    }

    if !register_active(active, &item.url, &item.filename) {
        warn!(url = %item.url, "duplicate dispatch for active URL");
        return ResultRecord::failed(
            &item.url,
            &item.filename,
            crate::download::worker::ALREADY_IN_FLIGHT,
            0.0,
        );
    }

    let started = Instant::now();
    let outcome = run_tool(item, quality, flags, active).await;

    // Fallback size when the tool exits cleanly but no file can be located.
    let reported_bytes = active
        .get(&item.url)
        .map(|record| record.downloaded_bytes)
        .unwrap_or(0);
    active.remove(&item.url);
    let elapsed = started.elapsed().as_secs_f64();

    match outcome {
        Ok(ToolOutcome::Finished { destination }) => {
            let (final_name, size) =
                locate_output(&item.dest_dir, &item.filename, destination.as_deref())
                    .await
                    .unwrap_or_else(|| (item.filename.clone(), reported_bytes));
            ResultRecord::completed(&item.url, final_name, size, elapsed)
        }
        Ok(ToolOutcome::Stopped) => ResultRecord::stopped(&item.url, &item.filename),
        Err(error) => {
            cleanup_partials(&item.dest_dir, &item.filename).await;
            ResultRecord::failed(&item.url, &item.filename, error.to_string(), elapsed)
        }
    }
}

/// Spawns the tool and pumps its stdout until exit, stop, or error.
async fn run_tool(
    item: &WorkItem,
    quality: Quality,
    flags: &ControlFlags,
    active: &DashMap<String, ActiveRecord>,
) -> Result<ToolOutcome, TransferError> {
    let stem = file_stem(&item.filename);
    let output_template = item.dest_dir.join(format!("{stem}.%(ext)s"));

    let mut child = Command::new(EXTRACTOR_BIN)
        .arg("-f")
        .arg(quality.format_selector())
        .arg("-o")
        .arg(&output_template)
        .arg("--no-playlist")
        .arg("--newline")
        .arg(&item.url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            TransferError::extractor(&item.url, format!("failed to spawn {EXTRACTOR_BIN}: {e}"))
        })?;

    let Some(stdout) = child.stdout.take() else {
        let _ = child.kill().await;
        return Err(TransferError::extractor(&item.url, "no stdout handle"));
    };

    // Drain stderr concurrently so a chatty tool cannot block on a full pipe.
    let stderr_task = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buffer = String::new();
            let _ = stderr.read_to_string(&mut buffer).await;
            buffer
        })
    });

    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                let _ = child.kill().await;
                return Err(TransferError::extractor(
                    &item.url,
                    format!("failed reading tool output: {error}"),
                ));
            }
        };

        if flags.is_stopped() {
            let _ = child.kill().await;
            return Ok(ToolOutcome::Stopped);
        }
        if flags.is_paused() {
            // The child keeps running; we just stop consuming its output,
            // which throttles it through pipe backpressure.
            flags.wait_while_paused().await;
            if flags.is_stopped() {
                let _ = child.kill().await;
                return Ok(ToolOutcome::Stopped);
            }
        }

        apply_line(&line, &item.url, active);
    }

    let status = child.wait().await.map_err(|e| {
        TransferError::extractor(&item.url, format!("failed waiting for tool: {e}"))
    })?;

    let destination = active
        .get(&item.url)
        .map(|record| record.filename.clone())
        .filter(|name| *name != item.filename);

    if status.success() {
        Ok(ToolOutcome::Finished { destination })
    } else {
        let stderr_output = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let detail = stderr_output.trim();
        let message = if detail.is_empty() {
            format!("{EXTRACTOR_BIN} exited with {status}")
        } else {
            format!("{EXTRACTOR_BIN} exited with {status}: {detail}")
        };
        Err(TransferError::extractor(&item.url, message))
    }
}

/// Feeds one stdout line into the active record. Unparseable lines are
/// silently ignored.
fn apply_line(line: &str, url: &str, active: &DashMap<String, ActiveRecord>) {
    if let Some(update) = parse_progress_line(line) {
        if let Some(mut record) = active.get_mut(url) {
            record.progress_percent = update.percent;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                record.total_bytes = update.total_bytes.max(0.0) as u64;
                record.downloaded_bytes =
                    (update.total_bytes * update.percent / 100.0).max(0.0) as u64;
            }
            record.speed_bps = update.speed_bps;
        }
    } else if let Some(path) = parse_destination_line(line) {
        let basename = Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        if let Some(basename) = basename {
            debug!(filename = %basename, "tool reported destination");
            if let Some(mut record) = active.get_mut(url) {
                record.filename = basename;
            }
        }
    }
}

/// Finds the file the tool actually produced and its size.
///
/// Prefers the destination the tool reported; otherwise scans the directory
/// for `<stem>.*` with a known media extension (the tool may merge into a
/// container different from the template's).
async fn locate_output(
    dest_dir: &Path,
    assigned_filename: &str,
    reported: Option<&str>,
) -> Option<(String, u64)> {
    if let Some(reported) = reported {
        let candidate = dest_dir.join(reported);
        if let Ok(meta) = tokio::fs::metadata(&candidate).await {
            return Some((reported.to_string(), meta.len()));
        }
    }

    let stem = file_stem(assigned_filename);
    let mut entries = tokio::fs::read_dir(dest_dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        let matches_stem = name.strip_prefix(&stem).is_some();
        let matches_ext = MEDIA_EXTENSIONS.iter().any(|ext| name.ends_with(ext));
        if matches_stem && matches_ext {
            let size = entry.metadata().await.map(|meta| meta.len()).unwrap_or(0);
            return Some((name, size));
        }
    }
    None
}

/// Best-effort removal of the tool's in-progress leftovers for a stem.
async fn cleanup_partials(dest_dir: &Path, assigned_filename: &str) {
    let stem = file_stem(assigned_filename);
    let Ok(mut entries) = tokio::fs::read_dir(dest_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_partial = PARTIAL_SUFFIXES.iter().any(|suffix| name.contains(suffix));
        if name.starts_with(&stem) && is_partial {
            if let Err(error) = tokio::fs::remove_file(entry.path()).await {
                warn!(file = %name, %error, "failed to remove partial file");
            } else {
                debug!(file = %name, "removed partial file");
            }
        }
    }
}

/// Returns the filename without its final extension.
fn file_stem(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem)
        .to_string()
}
