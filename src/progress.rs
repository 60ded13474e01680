//! Terminal progress display for mediasync
//!
//! Renders the executor's [`TransferProgress`] snapshots. The executor itself
//! knows nothing about bars; this is just one consumer of its stream.

use crate::sync::{Diff, RestorePlan};
use crate::types::{SyncStats, TransferProgress};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress tracker for backup and restore runs
pub struct ProgressTracker {
    /// Overall progress bar (bytes)
    overall: ProgressBar,
    /// Item counter line
    items: ProgressBar,
    /// Items in the current plan
    total_items: u64,
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new(enabled: bool) -> Self {
        let multi = MultiProgress::new();

        let overall = if enabled {
            let pb = multi.add(ProgressBar::new(0));
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        let items = if enabled {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        Self {
            overall,
            items,
            total_items: 0,
        }
    }

    /// Size the bars for a plan
    pub fn start(&mut self, total_items: u64, total_bytes: u64) {
        self.total_items = total_items;
        self.overall.set_length(total_bytes);
        self.overall.set_position(0);
        self.items.set_message(format!("0/{} items", total_items));
    }

    /// Apply a progress snapshot
    pub fn update(&self, progress: &TransferProgress) {
        self.overall.set_position(progress.bytes_transferred);
        self.items.set_message(format!(
            "{}/{} items ({:.0}%)",
            progress.items_transferred,
            self.total_items,
            progress.percentage * 100.0
        ));
    }

    /// Finish all progress bars
    pub fn finish(&self) {
        self.overall.finish();
        self.items.finish();
    }

    /// Leave the bars in place after a failed run
    pub fn abandon(&self) {
        self.overall.abandon();
        self.items.abandon();
    }
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}

/// Format a duration for display
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}

/// Format transfer rate for display
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", human_bytes::human_bytes(bytes_per_sec))
}

/// Print the upload plan
pub fn print_plan(diff: &Diff) {
    println!("\n=== Backup Plan ===");
    println!("Local items:     {}", diff.locals.len());
    println!("Remote objects:  {}", diff.remotes.len());
    println!("Up to date:      {}", diff.skipped());
    println!("To upload:       {}", diff.to_transfer.len());
    println!("Upload size:     {}", format_size(diff.total_bytes));
    for item in &diff.to_transfer {
        println!("  + {} ({})", item.name, format_size(item.size));
    }
}

/// Print the restore plan
pub fn print_restore_plan(plan: &RestorePlan) {
    println!("\n=== Restore Plan ===");
    println!("Remote objects:  {}", plan.remotes.len());
    println!("Already local:   {}", plan.skipped());
    println!("To download:     {}", plan.to_fetch.len());
    println!("Download size:   {}", format_size(plan.total_bytes));
}

/// Print a final summary after a run
pub fn print_summary(stats: &SyncStats) {
    println!("\n=== Sync Complete ===");
    println!("Duration:          {}", format_duration(stats.duration_secs));
    println!("Items transferred: {}", stats.items_transferred);
    println!("Items up to date:  {}", stats.items_skipped);
    println!("Bytes transferred: {}", format_size(stats.bytes_transferred));
    println!("Transfer rate:     {}", format_rate(stats.transfer_rate()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5.0), "5.0s");
        assert_eq!(format_duration(90.0), "1.5m");
        assert_eq!(format_duration(7200.0), "2.0h");
    }

    #[test]
    fn test_hidden_tracker_accepts_updates() {
        let mut tracker = ProgressTracker::new(false);
        tracker.start(2, 120);
        tracker.update(&TransferProgress {
            items_transferred: 1,
            bytes_transferred: 50,
            percentage: 50.0 / 120.0,
        });
        tracker.finish();
    }
}
