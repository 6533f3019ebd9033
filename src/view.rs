// ABOUTME: Display surface driven by the controller and the poll loop
// ABOUTME: Terminal implementation renders an indicatif progress bar plus a log

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::remote::models::format_count;
use crate::remote::FileLabel;

/// The user-facing pieces of a processing run: progress bar and labels, a
/// log, the trigger control (busy) and the download affordance.
///
/// Implementations are shared between the controller and the spawned poll
/// task, hence `Send + Sync` with `&self` methods.
pub trait ProgressView: Send + Sync {
    /// Blocking, user-visible prompt for input errors.
    fn alert(&self, message: &str);
    fn clear_log(&self);
    fn log(&self, line: &str);
    fn set_progress(&self, percent: f64);
    fn set_file_count(&self, current: &FileLabel, total: f64);
    /// `true` disables the trigger control while a submission or poll runs.
    fn set_busy(&self, busy: bool);
    fn set_download_visible(&self, visible: bool);
}

pub fn format_percentage(percent: f64) -> String {
    format!("{}%", percent.round() as i64)
}

pub fn format_file_count(current: &FileLabel, total: f64) -> String {
    format!("Processed: {} / {} files", current, format_count(total))
}

pub fn format_error(err: &anyhow::Error) -> String {
    format!("Error: {:#}", err)
}

pub struct TerminalView {
    bar: ProgressBar,
}

impl TerminalView {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {prefix:>4} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(format_percentage(0.0));
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.bar.abandon();
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressView for TerminalView {
    fn alert(&self, message: &str) {
        self.bar.suspend(|| eprintln!("{}", message));
    }

    fn clear_log(&self) {
        self.bar.set_message("");
    }

    fn log(&self, line: &str) {
        self.bar.println(line);
    }

    fn set_progress(&self, percent: f64) {
        self.bar.set_position(percent.clamp(0.0, 100.0) as u64);
        self.bar.set_prefix(format_percentage(percent));
    }

    fn set_file_count(&self, current: &FileLabel, total: f64) {
        self.bar.set_message(format_file_count(current, total));
    }

    fn set_busy(&self, busy: bool) {
        if busy {
            self.bar.enable_steady_tick(Duration::from_millis(120));
        } else {
            self.bar.disable_steady_tick();
        }
    }

    fn set_download_visible(&self, visible: bool) {
        if visible {
            self.bar.println("Processing complete, result ready for download");
        }
    }
}
