//! Terminal status reporter: renders snapshots as progress bars.
//!
//! The reporter is a pure consumer of [`StatusSnapshot`]s: it owns no
//! manager state and issues no control commands. One indicatif bar exists
//! per active transfer; drained results are printed once and tallied for
//! the final summary.

use std::collections::{HashMap, HashSet};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use batchget_core::{StatusSnapshot, TransferStatus, format_size, format_speed};

/// Bar template for transfers with a known total size.
const BAR_TEMPLATE: &str = "{bar:28} {bytes}/{total_bytes} {msg}";

/// Spinner template for transfers with an unknown total size.
const SPINNER_TEMPLATE: &str = "{spinner} {bytes} {msg}";

/// Running tally of terminal outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Totals {
    /// Transfers downloaded to completion.
    pub completed: usize,
    /// Transfers that failed.
    pub failed: usize,
    /// Targets that already existed.
    pub existing: usize,
}

/// Renders manager snapshots to the terminal.
pub struct StatusReporter {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
    totals: Totals,
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter {
    /// Creates a reporter with no bars.
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
            totals: Totals::default(),
        }
    }

    /// Renders one snapshot: updates bars for active transfers, drops bars
    /// for finished ones, and prints drained results exactly once.
    pub fn render(&mut self, snapshot: &StatusSnapshot, paused: bool) {
        for record in &snapshot.active {
            let bar = self.bars.entry(record.url.clone()).or_insert_with(|| {
                let bar = if record.total_bytes > 0 {
                    let bar = ProgressBar::new(record.total_bytes);
                    bar.set_style(style(BAR_TEMPLATE));
                    bar
                } else {
                    let bar = ProgressBar::new_spinner();
                    bar.set_style(style(SPINNER_TEMPLATE));
                    bar
                };
                self.multi.add(bar)
            });

            if record.total_bytes > 0 {
                bar.set_length(record.total_bytes);
            }
            bar.set_position(record.downloaded_bytes);
            let state = if paused { "paused" } else { "downloading" };
            bar.set_message(format!(
                "{} [{state}] {:.1}% ({})",
                record.filename,
                record.progress_percent,
                format_speed(record.speed_bps)
            ));
        }

        let active_urls: HashSet<&str> = snapshot
            .active
            .iter()
            .map(|record| record.url.as_str())
            .collect();
        self.bars.retain(|url, bar| {
            let still_active = active_urls.contains(url.as_str());
            if !still_active {
                bar.finish_and_clear();
            }
            still_active
        });

        for record in &snapshot.completed {
            match record.status {
                TransferStatus::Exists => {
                    self.totals.existing += 1;
                    self.println(format!(
                        "exists: {} ({})",
                        record.filename,
                        format_size(record.size_bytes)
                    ));
                }
                _ => {
                    self.totals.completed += 1;
                    self.println(format!(
                        "done: {} ({}, {:.1}s)",
                        record.filename,
                        format_size(record.size_bytes),
                        record.elapsed_secs
                    ));
                }
            }
        }

        for record in &snapshot.failed {
            self.totals.failed += 1;
            let reason = record.error.as_deref().unwrap_or("unknown error");
            self.println(format!("failed: {} ({reason})", record.url));
        }
    }

    /// Clears remaining bars and returns the final tally.
    pub fn finish(self) -> Totals {
        for bar in self.bars.values() {
            bar.finish_and_clear();
        }
        self.totals
    }

    fn println(&self, line: String) {
        // Routing through MultiProgress keeps lines above the live bars.
        let _ = self.multi.println(line);
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}
