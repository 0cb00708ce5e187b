//! Progress and error reporting.
//!
//! The sync engine writes human-readable progress events to an
//! abstract [`Reporter`] owned by the caller. One reporter handle
//! covers a logical run; discrete error notifications go through
//! [`Reporter::error`] in addition to the run-level outcome.

/// A single progress event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress<'a> {
    /// Title for the run or phase
    pub title: Option<&'a str>,
    /// Human-readable progress message
    pub message: Option<&'a str>,
    /// Completion percentage, 0..=100
    pub percentage: Option<u8>,
}

impl<'a> Progress<'a> {
    /// Event carrying only a message.
    pub fn message(message: &'a str) -> Self {
        Self {
            message: Some(message),
            ..Self::default()
        }
    }

    /// Event carrying a message and a completion percentage.
    pub fn percent(message: &'a str, percentage: u8) -> Self {
        Self {
            message: Some(message),
            percentage: Some(percentage),
            ..Self::default()
        }
    }

    /// Event opening a titled run.
    pub fn titled(title: &'a str, message: &'a str) -> Self {
        Self {
            title: Some(title),
            message: Some(message),
            percentage: Some(0),
        }
    }
}

/// Sink for progress and error events from a sync run.
pub trait Reporter {
    /// Report a progress event.
    fn report(&mut self, progress: Progress<'_>);

    /// Mark the run's progress indicator as complete.
    fn finish(&mut self);

    /// Cancel the run's progress indicator without marking it complete.
    fn cancel(&mut self);

    /// Surface a discrete, individually dismissible error notification.
    fn error(&mut self, title: &str, message: &str);
}

/// No-op reporter.
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _progress: Progress<'_>) {}
    fn finish(&mut self) {}
    fn cancel(&mut self) {}
    fn error(&mut self, _title: &str, _message: &str) {}
}
