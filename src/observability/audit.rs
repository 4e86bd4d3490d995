//! Append-only request audit log.
//!
//! Every request produces exactly one line before any gate runs. Sinks have a
//! no-throw contract: a failed write is counted and logged, never returned to
//! the caller, so the audit log can lose lines but can never fail a request.
//!
//! File sinks sit behind a `QueuedAuditSink`: the request path only does a
//! `try_send` into a bounded channel and a dedicated thread does the blocking
//! I/O. A full queue drops the line and counts it as a failed write.

use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::{AuditConfig, AuditFormat};
use crate::governance::{Identity, RequestContext};
use crate::observability::metrics;

/// Destination for audit lines.
pub trait AuditSink: Send + Sync + Debug {
    /// Append one line. Must not panic and has nothing to report.
    fn write_line(&self, line: &str);

    /// Number of lines that could not be written.
    fn failed_writes(&self) -> u64 {
        0
    }
}

/// Appends lines to a file, opening it lazily and reopening after a failure.
#[derive(Debug)]
pub struct FileAuditSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
    failures: AtomicU64,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
            failures: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_failure(&self, error: &std::io::Error) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_audit_failure();
        tracing::warn!(
            path = %self.path.display(),
            error = %error,
            failures,
            "Audit write failed; line dropped"
        );
    }
}

impl AuditSink for FileAuditSink {
    fn write_line(&self, line: &str) {
        let mut guard = self.lock();

        if guard.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(file) => *guard = Some(file),
                Err(e) => {
                    drop(guard);
                    self.record_failure(&e);
                    return;
                }
            }
        }

        let result = match guard.as_mut() {
            Some(file) => writeln!(file, "{}", line),
            None => return,
        };
        if let Err(e) = result {
            *guard = None;
            drop(guard);
            self.record_failure(&e);
        }
    }

    fn failed_writes(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Moves writes off the caller's thread.
///
/// Lines go through a bounded channel to an `audit-writer` thread that feeds
/// the inner sink. The thread exits once the sink is dropped and the queue
/// has drained.
#[derive(Debug)]
pub struct QueuedAuditSink {
    sender: mpsc::Sender<String>,
    inner: Arc<dyn AuditSink>,
    dropped: AtomicU64,
}

impl QueuedAuditSink {
    pub fn spawn(inner: Arc<dyn AuditSink>, capacity: usize) -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::channel::<String>(capacity.max(1));
        let writer = inner.clone();
        thread::Builder::new()
            .name("audit-writer".to_string())
            .spawn(move || {
                while let Some(line) = receiver.blocking_recv() {
                    writer.write_line(&line);
                }
            })?;

        Ok(Self {
            sender,
            inner,
            dropped: AtomicU64::new(0),
        })
    }

    /// Lines refused because the queue was full or the writer had stopped.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl AuditSink for QueuedAuditSink {
    fn write_line(&self, line: &str) {
        let reason = match self.sender.try_send(line.to_string()) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => "queue full",
            Err(TrySendError::Closed(_)) => "writer stopped",
        };
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_audit_failure();
        tracing::warn!(reason, dropped, "Audit line dropped");
    }

    fn failed_writes(&self) -> u64 {
        self.dropped() + self.inner.failed_writes()
    }
}

/// Emits lines as `tracing` events on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "audit", "{}", line);
    }
}

/// Keeps lines in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.to_string());
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    user: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequestAuditLogger {
    sink: Arc<dyn AuditSink>,
    format: AuditFormat,
}

impl RequestAuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>, format: AuditFormat) -> Self {
        Self { sink, format }
    }

    /// Build the logger a config describes. `"-"` routes lines to tracing;
    /// anything else is a file written from the background writer.
    pub fn from_config(config: &AuditConfig) -> Self {
        if config.sink_path == "-" {
            return Self::new(Arc::new(TracingAuditSink), config.format);
        }

        let file: Arc<dyn AuditSink> = Arc::new(FileAuditSink::new(&config.sink_path));
        let sink: Arc<dyn AuditSink> = match QueuedAuditSink::spawn(file.clone(), config.queue_capacity) {
            Ok(queued) => Arc::new(queued),
            Err(e) => {
                tracing::warn!(error = %e, "Audit writer thread unavailable; writing inline");
                file
            }
        };
        Self::new(sink, config.format)
    }

    pub fn sink(&self) -> &Arc<dyn AuditSink> {
        &self.sink
    }

    /// Record a request given only its time, principal and path.
    pub fn record(&self, timestamp: NaiveDateTime, identity: Option<&Identity>, path: &str) {
        let user = identity.map(Identity::display_name).unwrap_or("Anonymous");
        let line = match self.format {
            AuditFormat::Text => text_line(timestamp, user, path),
            AuditFormat::Json => json_line(JsonLine {
                timestamp: iso_timestamp(timestamp),
                user,
                path,
                method: None,
                client: None,
                request_id: None,
            }),
        };
        self.sink.write_line(&line);
    }

    /// Record a request with everything the context knows about it.
    pub fn record_request(&self, ctx: &RequestContext) {
        let line = match self.format {
            AuditFormat::Text => text_line(ctx.local_time, ctx.user_name(), &ctx.path),
            AuditFormat::Json => json_line(JsonLine {
                timestamp: iso_timestamp(ctx.local_time),
                user: ctx.user_name(),
                path: &ctx.path,
                method: Some(ctx.method.as_str()),
                client: Some(ctx.client.as_str()),
                request_id: Some(ctx.request_id.to_string()),
            }),
        };
        self.sink.write_line(&line);
    }
}

fn text_line(timestamp: NaiveDateTime, user: &str, path: &str) -> String {
    format!(
        "{} - User: {} - Path: {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
        user,
        path
    )
}

fn iso_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn json_line(line: JsonLine<'_>) -> String {
    // Serializing plain strings cannot fail.
    serde_json::to_string(&line).unwrap_or_default()
}
