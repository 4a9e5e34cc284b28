//! Parser for the extraction tool's human-readable stdout.
//!
//! The tool prints lines like:
//!
//! ```text
//! [download]  45.3% of 12.34MiB at 1.23MiB/s ETA 00:05
//! [download] Destination: /downloads/My Talk.mp4
//! ```
//!
//! Any line that does not match is "no update" — never an error. All
//! parsing lives here so it can be unit-tested against literal captured
//! output lines.

use std::sync::LazyLock;

use regex::Regex;

/// Matches the leading percentage token, e.g. `45.3%`.
#[allow(clippy::expect_used)]
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("percent regex is valid"));

/// Matches the total size after `of`, e.g. `of 12.34MiB` or `of ~12.34MiB`.
#[allow(clippy::expect_used)]
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bof\s+~?(\d+(?:\.\d+)?)([KMGT]?i?B)").expect("size regex is valid")
});

/// Matches the transfer rate after `at`, e.g. `at 1.23MiB/s`.
#[allow(clippy::expect_used)]
static SPEED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bat\s+(\d+(?:\.\d+)?)([KMGT]?i?B)/s").expect("speed regex is valid")
});

/// One parsed progress update from a stdout line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Percent complete, 0–100.
    pub percent: f64,
    /// Declared total size in bytes; 0 when the line carried none.
    pub total_bytes: f64,
    /// Transfer rate in bytes per second; 0 when the line carried none.
    pub speed_bps: f64,
}

/// Parses a progress line, returning `None` for anything unrecognized.
///
/// A line qualifies only when it carries a percentage, a `[download]` or
/// `[info]` tag, and an `of`/`at` clause — the shape the tool uses for its
/// progress output.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    if !line.contains('%') {
        return None;
    }
    if !(line.contains("[download]") || line.contains("[info]")) {
        return None;
    }
    if !(line.contains(" of ") || line.contains(" at ")) {
        return None;
    }

    let percent = PERCENT_RE
        .captures(line)
        .and_then(|caps| caps.get(1)?.as_str().parse::<f64>().ok())?;

    let total_bytes = SIZE_RE
        .captures(line)
        .and_then(|caps| {
            let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
            Some(value * unit_multiplier(caps.get(2)?.as_str()))
        })
        .unwrap_or(0.0);

    let speed_bps = SPEED_RE
        .captures(line)
        .and_then(|caps| {
            let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
            Some(value * unit_multiplier(caps.get(2)?.as_str()))
        })
        .unwrap_or(0.0);

    Some(ProgressUpdate {
        percent,
        total_bytes,
        speed_bps,
    })
}

/// Extracts the output path from a `Destination:` line.
#[must_use]
pub fn parse_destination_line(line: &str) -> Option<String> {
    let (_, rest) = line.split_once("Destination:")?;
    let path = rest.trim();
    (!path.is_empty()).then(|| path.to_string())
}

/// Converts a size unit token (`KiB`, `MB`, `GiB`, ...) to its byte factor.
/// Unknown units fall back to 1 (plain bytes).
fn unit_multiplier(unit: &str) -> f64 {
    match unit.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('k') => 1024.0,
        Some('m') => 1024.0 * 1024.0,
        Some('g') => 1024.0 * 1024.0 * 1024.0,
        Some('t') => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_download_line() {
        let line = "[download]  45.3% of 12.34MiB at 1.23MiB/s ETA 00:05";
        let update = parse_progress_line(line).unwrap();
        assert!((update.percent - 45.3).abs() < 1e-9);
        assert!((update.total_bytes - 12.34 * 1024.0 * 1024.0).abs() < 1.0);
        assert!((update.speed_bps - 1.23 * 1024.0 * 1024.0).abs() < 1.0);
    }

    #[test]
    fn test_parse_estimated_size_line() {
        let line = "[download]   0.1% of ~230.50MiB at 512.00KiB/s ETA 07:40";
        let update = parse_progress_line(line).unwrap();
        assert!((update.percent - 0.1).abs() < 1e-9);
        assert!((update.total_bytes - 230.5 * 1024.0 * 1024.0).abs() < 1.0);
        assert!((update.speed_bps - 512.0 * 1024.0).abs() < 1.0);
    }

    #[test]
    fn test_parse_gigabyte_units() {
        let line = "[download] 100.0% of 1.20GiB at 3.00MiB/s ETA 00:00";
        let update = parse_progress_line(line).unwrap();
        assert!((update.total_bytes - 1.2 * 1024.0 * 1024.0 * 1024.0).abs() < 2.0);
    }

    #[test]
    fn test_parse_plain_units_without_i() {
        let line = "[download]  50.0% of 10.00MB at 2.00KB/s ETA 00:30";
        let update = parse_progress_line(line).unwrap();
        assert!((update.total_bytes - 10.0 * 1024.0 * 1024.0).abs() < 1.0);
        assert!((update.speed_bps - 2048.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_line_without_tag_is_no_update() {
        assert_eq!(parse_progress_line("45.3% of 12.34MiB at 1.23MiB/s"), None);
    }

    #[test]
    fn test_parse_line_without_percent_is_no_update() {
        assert_eq!(
            parse_progress_line("[download] Resuming download at byte 123456"),
            None
        );
    }

    #[test]
    fn test_parse_garbage_is_no_update() {
        assert_eq!(parse_progress_line(""), None);
        assert_eq!(parse_progress_line("WARNING: unable to extract title"), None);
        assert_eq!(
            parse_progress_line("[youtube] abc123: Downloading webpage"),
            None
        );
    }

    #[test]
    fn test_parse_percent_only_line_reports_zero_size_and_speed() {
        // Has the tag and an "at" clause but an unparseable size token.
        let line = "[download]  12.0% of N/A at Unknown speed";
        let update = parse_progress_line(line).unwrap();
        assert!((update.percent - 12.0).abs() < 1e-9);
        assert!(update.total_bytes.abs() < f64::EPSILON);
        assert!(update.speed_bps.abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_destination_line() {
        let line = "[download] Destination: /downloads/My Talk.mp4";
        assert_eq!(
            parse_destination_line(line),
            Some("/downloads/My Talk.mp4".to_string())
        );
    }

    #[test]
    fn test_parse_destination_line_windows_path() {
        let line = r"[download] Destination: C:\media\clip.webm";
        assert_eq!(
            parse_destination_line(line),
            Some(r"C:\media\clip.webm".to_string())
        );
    }

    #[test]
    fn test_parse_destination_missing_is_none() {
        assert_eq!(parse_destination_line("[download] 45% of 1MiB"), None);
        assert_eq!(parse_destination_line("Destination:"), None);
    }

    #[test]
    fn test_unit_multiplier_cases() {
        assert!((unit_multiplier("KiB") - 1024.0).abs() < f64::EPSILON);
        assert!((unit_multiplier("MB") - 1_048_576.0).abs() < f64::EPSILON);
        assert!((unit_multiplier("GiB") - 1_073_741_824.0).abs() < f64::EPSILON);
        assert!((unit_multiplier("B") - 1.0).abs() < f64::EPSILON);
    }
}
