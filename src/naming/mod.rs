//! Filename and extension resolution for downloads.
//!
//! Resolution happens before enqueue, so every work item carries its final
//! filename. Three sources, in priority order:
//!
//! 1. An explicit per-URL override, used verbatim (an inferred extension is
//!    appended only when the override has none).
//! 2. Batch mode: `{prefix}_{NNN}{ext}` with a zero-padded counter kept
//!    *per extension* — mixing image and video URLs in one batch yields
//!    `P_001.jpg, P_001.mp4, P_002.jpg, ...`.
//! 3. The URL path basename, URL-decoded, with a timestamp fallback when
//!    the path is empty.
//!
//! Extension inference tries, in order: the path's own dotted suffix, a
//! keyword table matched against the lowercased URL, a short header-only
//! network probe, and finally `.bin`. Probe failures are swallowed.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::download::{HttpClient, TransferKind};

/// Longest dotted suffix (including the dot) accepted from a URL path.
const MAX_PATH_EXTENSION_LEN: usize = 5;

/// Zero-pad width for batch counters.
const BATCH_COUNTER_WIDTH: usize = 3;

/// Extension keywords probed against the lowercased URL (query stripped).
/// Order matters: earlier entries win.
const KEYWORD_EXTENSIONS: &[(&str, &str)] = &[
    (".mp4", ".mp4"),
    (".avi", ".avi"),
    (".mov", ".mov"),
    (".mkv", ".mkv"),
    (".webm", ".webm"),
    (".mp3", ".mp3"),
    (".srt", ".srt"),
    (".sub", ".sub"),
    (".vtt", ".vtt"),
    (".pdf", ".pdf"),
    (".zip", ".zip"),
    (".jpg", ".jpg"),
    (".jpeg", ".jpg"),
    (".png", ".png"),
    (".gif", ".gif"),
];

/// Errors from numbered batch URL generation.
///
/// Surfaced before any queue mutation: an invalid template never partially
/// enqueues anything.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// The template URL has no `#` placeholder to substitute.
    #[error("template URL must contain a '#' placeholder")]
    MissingPlaceholder,

    /// The numeric range is inverted.
    #[error("start number {start} cannot be greater than end number {end}")]
    InvalidRange {
        /// First number to substitute.
        start: u32,
        /// Last number to substitute.
        end: u32,
    },

    /// Zero padding width requested.
    #[error("padding width must be a positive integer")]
    InvalidPadding,
}

/// Derives destination filenames for URLs.
///
/// Holds the per-URL overrides, the optional batch prefix, and the
/// per-extension counters for one naming session. Counters persist across
/// calls, so one resolver instance names one batch.
#[derive(Debug, Default)]
pub struct FilenameResolver {
    overrides: HashMap<String, String>,
    batch_prefix: Option<String>,
    counters: HashMap<String, u32>,
}

impl FilenameResolver {
    /// Creates a resolver with no overrides and batch mode off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns an explicit filename for a URL.
    pub fn set_override(&mut self, url: impl Into<String>, filename: impl Into<String>) {
        self.overrides.insert(url.into(), filename.into());
    }

    /// Enables batch naming with the given prefix. Resets the counters;
    /// `None` turns batch mode off.
    pub fn set_batch_prefix(&mut self, prefix: Option<String>) {
        self.batch_prefix = prefix;
        self.counters.clear();
    }

    /// Resolves the destination filename for `url`.
    ///
    /// May issue one header-only network probe when the extension cannot be
    /// determined locally; extractor-bound URLs default to `.mp4` instead
    /// of probing (the tool picks its own container anyway).
    #[instrument(level = "debug", skip(self, client))]
    pub async fn resolve(&mut self, url: &str, kind: TransferKind, client: &HttpClient) -> String {
        if let Some(assigned) = self.overrides.get(url) {
            let assigned = assigned.clone();
            if has_extension(&assigned) {
                return assigned;
            }
            let ext = self.extension_for(url, kind, client).await;
            return format!("{}{ext}", assigned.trim_end_matches('.'));
        }

        if let Some(prefix) = self.batch_prefix.clone() {
            let ext = match extension_from_path(url) {
                Some(ext) => ext,
                None => self.extension_for(url, kind, client).await,
            };
            let counter = self.counters.entry(ext.clone()).or_insert(0);
            *counter += 1;
            let name = format!("{prefix}_{:0width$}{ext}", counter, width = BATCH_COUNTER_WIDTH);
            debug!(filename = %name, "batch name assigned");
            return name;
        }

        let name = filename_from_url(url);
        if kind == TransferKind::Http && !has_extension(&name) {
            let ext = infer_extension(url, client).await;
            return format!("{}{ext}", name.trim_end_matches('.'));
        }
        name
    }

    async fn extension_for(&self, url: &str, kind: TransferKind, client: &HttpClient) -> String {
        match kind {
            TransferKind::Extractor => ".mp4".to_string(),
            TransferKind::Http => infer_extension(url, client).await,
        }
    }
}

fn has_extension(name: &str) -> bool {
    name.contains('.') && !name.ends_with('.')
}

/// Derives a filename from the URL path basename, URL-decoded.
///
/// An empty path synthesizes `downloaded_file_<unixTimestamp>`.
#[must_use]
pub fn filename_from_url(url: &str) -> String {
    let basename = Url::parse(url).ok().and_then(|parsed| {
        let segment = parsed.path_segments()?.next_back()?.to_string();
        let decoded = urlencoding::decode(&segment)
            .map(|cow| cow.into_owned())
            .unwrap_or(segment);
        (!decoded.is_empty()).then_some(decoded)
    });

    basename.unwrap_or_else(|| {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("downloaded_file_{timestamp}")
    })
}

/// Infers a file extension for `url`.
///
/// Chain: path suffix → keyword table → network probe → `.bin`. Only the
/// probe touches the network, and its failures are swallowed.
pub async fn infer_extension(url: &str, client: &HttpClient) -> String {
    if let Some(ext) = extension_from_path(url) {
        return ext;
    }
    if let Some(ext) = extension_from_keyword(url) {
        return ext.to_string();
    }
    if let Some(content_type) = client.probe_content_type(url).await {
        if let Some(ext) = extension_from_content_type(&content_type) {
            debug!(%content_type, %ext, "extension from probe");
            return ext;
        }
    }
    ".bin".to_string()
}

/// Returns the URL path's own dotted suffix when it is short enough to be a
/// real extension (≤ 5 chars including the dot), lowercased.
pub(crate) fn extension_from_path(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index..];
    if ext.len() < 2 || ext.len() > MAX_PATH_EXTENSION_LEN {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Matches known extension keywords against the lowercased URL with the
/// query string stripped.
pub(crate) fn extension_from_keyword(url: &str) -> Option<&'static str> {
    let lowered = url.to_lowercase();
    let without_query = lowered.split('?').next().unwrap_or(&lowered);
    KEYWORD_EXTENSIONS
        .iter()
        .find(|(keyword, _)| without_query.contains(keyword))
        .map(|(_, ext)| *ext)
}

/// Maps a Content-Type header value to an extension.
///
/// Fixed table; unrecognized types return `None` and the caller falls back
/// to `.bin`.
pub(crate) fn extension_from_content_type(content_type: &str) -> Option<String> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    let ext = match mime.as_str() {
        "video/mp4" => ".mp4".to_string(),
        "video/webm" => ".webm".to_string(),
        "audio/mpeg" => ".mp3".to_string(),
        "text/vtt" => ".vtt".to_string(),
        "application/x-subrip" | "text/srt" => ".srt".to_string(),
        "image/jpeg" => ".jpg".to_string(),
        "image/png" => ".png".to_string(),
        "image/gif" => ".gif".to_string(),
        "application/pdf" => ".pdf".to_string(),
        "application/zip" | "application/x-zip-compressed" => ".zip".to_string(),
        "application/json" => ".json".to_string(),
        "text/html" => ".html".to_string(),
        "text/csv" => ".csv".to_string(),
        "application/octet-stream" => ".bin".to_string(),
        other => {
            // Generic video/* and audio/* reuse the subtype directly.
            let subtype = other
                .strip_prefix("video/")
                .or_else(|| other.strip_prefix("audio/"))?;
            if subtype.is_empty() {
                return None;
            }
            format!(".{subtype}")
        }
    };
    Some(ext)
}

/// Expands a numbered template URL into the inclusive `start..=end` list.
///
/// Every `#` in the template is replaced with the counter, zero-padded to
/// `pad_width` digits when given.
///
/// # Errors
///
/// Returns [`BatchError`] for a template without `#`, an inverted range, or
/// a zero pad width — always before any URL is produced.
pub fn generate_numbered_urls(
    template: &str,
    start: u32,
    end: u32,
    pad_width: Option<usize>,
) -> Result<Vec<String>, BatchError> {
    if !template.contains('#') {
        return Err(BatchError::MissingPlaceholder);
    }
    if start > end {
        return Err(BatchError::InvalidRange { start, end });
    }
    if pad_width == Some(0) {
        return Err(BatchError::InvalidPadding);
    }

    let urls = (start..=end)
        .map(|number| {
            let substituted = match pad_width {
                Some(width) => format!("{number:0width$}"),
                None => number.to_string(),
            };
            template.replace('#', &substituted)
        })
        .collect();
    Ok(urls)
}
