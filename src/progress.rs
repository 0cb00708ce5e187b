//! Progress reporting for the rocksync CLI.
//!
//! Bridges the engine's [`Reporter`] events onto an indicatif progress
//! bar, one bar per logical run. Errors are printed immediately as
//! discrete notifications; the bar is cleared on finish and abandoned
//! on cancel so a failed run leaves its last message visible.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rockskit::{Progress, Reporter};

/// Reporter rendering a single run onto the console.
pub struct ConsoleReporter {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }

    fn bar(&mut self) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let style = ProgressStyle::with_template("  {bar:30.cyan/blue} {percent:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            let bar = ProgressBar::new(100);
            bar.set_style(style);
            bar
        })
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, progress: Progress<'_>) {
        if self.quiet {
            return;
        }
        let bar = self.bar();
        if let Some(title) = progress.title {
            bar.println(format!("  {}", title.bold()));
        }
        if let Some(percentage) = progress.percentage {
            bar.set_position(u64::from(percentage));
        }
        if let Some(message) = progress.message {
            bar.set_message(message.to_string());
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn cancel(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
    }

    fn error(&mut self, title: &str, message: &str) {
        eprintln!("{} {}: {}", "✗".red(), title.bold(), message);
    }
}
