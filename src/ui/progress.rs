//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner:.cyan} {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars(TICK_CHARS),
            );
            spinner.set_message(message.to_string());
            spinner.enable_steady_tick(Duration::from_millis(120));
            self.spinner = Some(spinner);
        } else {
            // Plain output for CI
            println!("  {} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
            println!("  {} {}", style("✓").green(), message);
        } else {
            println!("  {} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with warning message
    pub fn stop_warn(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
            println!("  {} {}", style("!").yellow(), message);
        } else {
            println!("  {} {}", style("[WARN]").yellow(), message);
        }
    }
}

impl Drop for TaskSpinner {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Byte progress for archive downloads.
///
/// Shows an indicatif bar in interactive mode, nothing in CI.
pub struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    /// `total` is the content length, when the server sent one
    pub fn new(ctx: &UiContext, total: Option<u64>) -> Self {
        if !ctx.use_fancy_output() {
            return Self { bar: None };
        }

        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("  {spinner:.cyan} {bar:20.cyan/dim} {bytes}/{total_bytes} {bytes_per_sec:.dim}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .tick_chars(TICK_CHARS)
                        .progress_chars("━╸─"),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("  {spinner:.cyan} {bytes} {bytes_per_sec:.dim}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner())
                        .tick_chars(TICK_CHARS),
                );
                bar
            }
        };
        Self { bar: Some(bar) }
    }

    /// Wrap `reader` so bytes read through it advance the bar
    pub fn wrap<R: Read>(&self, reader: R) -> Box<dyn Read>
    where
        R: 'static,
    {
        match self.bar {
            Some(ref bar) => Box::new(bar.wrap_read(reader)),
            None => Box::new(reader),
        }
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
