//! # Progress and Log Reporting
//!
//! An ingestion run streams human-readable log lines and a 0-100 progress
//! value while it works. Decoding owns 0-30%, classification batches own the
//! rest.

use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Mutex,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
    Wait,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// An event streamed by `ChannelReporter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IngestEvent {
    Log(LogLine),
    Progress { percent: u8 },
}

/// Receives status updates from an ingestion run.
pub trait ProgressReporter: Send + Sync {
    fn log(&self, line: LogLine);

    fn progress(&self, percent: u8);

    fn info(&self, message: &str) {
        self.log(LogLine::new(LogLevel::Info, message));
    }

    fn success(&self, message: &str) {
        self.log(LogLine::new(LogLevel::Success, message));
    }

    fn error(&self, message: &str) {
        self.log(LogLine::new(LogLevel::Error, message));
    }

    fn wait(&self, message: &str) {
        self.log(LogLine::new(LogLevel::Wait, message));
    }
}

/// Progress after `processed` of `total` records have been classified.
pub fn batch_progress(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let share = (processed as f64 / total as f64 * 70.0).round();
    (30.0 + share).min(100.0) as u8
}

/// Progress after `page` of `pages` PDF pages have been extracted.
pub fn extraction_progress(page: usize, pages: usize) -> u8 {
    if pages == 0 {
        return 30;
    }
    ((page as f64 / pages as f64) * 30.0).round().min(30.0) as u8
}

/// Sends every line to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn log(&self, line: LogLine) {
        match line.level {
            LogLevel::Error => error!("{}", line.message),
            LogLevel::Wait => info!("... {}", line.message),
            LogLevel::Info | LogLevel::Success => info!("{}", line.message),
        }
    }

    fn progress(&self, percent: u8) {
        info!(percent, "Ingestion progress");
    }
}

/// Forwards events into an unbounded tokio channel.
///
/// A closed receiver is not an error: the run keeps going and the events are
/// dropped.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: UnboundedSender<IngestEvent>,
}

impl ChannelReporter {
    pub fn new(sender: UnboundedSender<IngestEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: IngestEvent) {
        if self.sender.send(event).is_err() {
            warn!("Ingestion event receiver is gone; dropping event.");
        }
    }
}

impl ProgressReporter for ChannelReporter {
    fn log(&self, line: LogLine) {
        self.send(IngestEvent::Log(line));
    }

    fn progress(&self, percent: u8) {
        self.send(IngestEvent::Progress { percent });
    }
}

/// Keeps everything in memory so it can be returned in one response.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    lines: Mutex<Vec<LogLine>>,
    progress: AtomicU8,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last_progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }
}

impl ProgressReporter for CollectingReporter {
    fn log(&self, line: LogLine) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }

    fn progress(&self, percent: u8) {
        self.progress.store(percent, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_progress_spans_thirty_to_hundred() {
        assert_eq!(batch_progress(0, 10), 30);
        assert_eq!(batch_progress(5, 10), 65);
        assert_eq!(batch_progress(10, 10), 100);
        // The final short batch may overshoot the record count.
        assert_eq!(batch_progress(15, 12), 100);
    }

    #[test]
    fn extraction_progress_caps_at_thirty() {
        assert_eq!(extraction_progress(1, 3), 10);
        assert_eq!(extraction_progress(3, 3), 30);
    }

    #[tokio::test]
    async fn channel_reporter_streams_in_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let reporter = ChannelReporter::new(tx);
        reporter.info("start");
        reporter.progress(42);
        drop(reporter);

        assert_eq!(
            rx.recv().await,
            Some(IngestEvent::Log(LogLine::new(LogLevel::Info, "start")))
        );
        assert_eq!(rx.recv().await, Some(IngestEvent::Progress { percent: 42 }));
        assert_eq!(rx.recv().await, None);
    }
}
