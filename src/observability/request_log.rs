//! Durable per-request log.
//!
//! One line per request:
//! `<timestamp> - User: <id or "Anonymous"> - Path: <path>`.
//! Sink failures are reported through tracing and metrics and never reach
//! the request.

use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::http::request::Principal;
use crate::observability::metrics;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Append-only destination for request log lines.
pub trait LogSink: Send + Sync + Debug {
    fn append(&self, line: &str) -> io::Result<()>;
}

/// File sink whose writes happen on a background task.
///
/// `append` only queues the line, so the request path never waits on disk.
#[derive(Debug, Clone)]
pub struct FileSink {
    tx: mpsc::UnboundedSender<String>,
}

impl FileSink {
    /// Open (or create) the file for appending and spawn the writer task.
    ///
    /// The task ends once every clone of the sink is dropped and the queue is
    /// drained. Must be called inside a tokio runtime.
    pub fn open(path: &Path) -> io::Result<(Self, JoinHandle<()>)> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut file = tokio::fs::File::from_std(file);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let path = path.to_path_buf();

        let handle = tokio::spawn(async move {
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                let written = async {
                    file.write_all(line.as_bytes()).await?;
                    file.flush().await
                }
                .await;
                if let Err(e) = written {
                    metrics::record_log_failure();
                    tracing::warn!(path = ?path, error = %e, "Failed to write request log line");
                }
            }
            tracing::debug!(path = ?path, "Request log writer stopped");
        });

        Ok((Self { tx }, handle))
    }
}

impl LogSink for FileSink {
    fn append(&self, line: &str) -> io::Result<()> {
        self.tx
            .send(line.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "request log writer stopped"))
    }
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("memory sink mutex poisoned").clone()
    }
}

impl LogSink for MemorySink {
    fn append(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| io::Error::other("memory sink mutex poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}

/// Formats and records one line per request.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    sink: Arc<dyn LogSink>,
}

impl RequestLogger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn format_line(now: NaiveDateTime, principal: Option<&Principal>, path: &str) -> String {
        let user = principal.map_or("Anonymous", |p| p.id.as_str());
        format!("{} - User: {} - Path: {}", now.format(TIMESTAMP_FORMAT), user, path)
    }

    pub fn log(&self, now: NaiveDateTime, principal: Option<&Principal>, path: &str) {
        let line = Self::format_line(now, principal, path);
        if let Err(e) = self.sink.append(&line) {
            metrics::record_log_failure();
            tracing::warn!(error = %e, path = %path, "Request log sink unavailable");
        }
    }
}
