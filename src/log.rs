//! Append-only run log.
//!
//! Every record is kept in memory for the caller, mirrored to `tracing`, and
//! handed to any attached [`LogSink`]. Sinks decide where lines end up; the
//! core only appends.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub tag: String,
    pub message: String,
}

impl LogRecord {
    /// `<timestamp> <tag> [<SEVERITY>]: <message>`
    pub fn line(&self) -> String {
        format!(
            "{} {} [{}]: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.tag,
            self.severity,
            self.message
        )
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}

/// Destination for log records.
pub trait LogSink {
    fn append(&mut self, record: &LogRecord) -> io::Result<()>;
}

/// Appends formatted lines to a file, creating parent directories.
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append(&mut self, record: &LogRecord) -> io::Result<()> {
        writeln!(self.file, "{}", record.line())
    }
}

/// Chronological, append-only sequence of [`LogRecord`]s.
#[derive(Default)]
pub struct RunLog {
    records: Vec<LogRecord>,
    sinks: Vec<Box<dyn LogSink>>,
    sink_failed: bool,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn append(&mut self, severity: Severity, tag: &str, message: impl Into<String>) {
        let message = message.into();

        // Wall-clock steps backwards must not reorder the log.
        let now = Utc::now();
        let timestamp = match self.records.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        match severity {
            Severity::Info => tracing::info!(tag, "{}", message),
            Severity::Warn => tracing::warn!(tag, "{}", message),
            Severity::Error => tracing::error!(tag, "{}", message),
        }

        let record = LogRecord {
            timestamp,
            severity,
            tag: tag.to_string(),
            message,
        };

        for sink in &mut self.sinks {
            if let Err(e) = sink.append(&record) {
                if !self.sink_failed {
                    tracing::warn!("log sink write failed, further sink errors suppressed: {}", e);
                    self.sink_failed = true;
                }
            }
        }

        self.records.push(record);
    }

    pub fn info(&mut self, tag: &str, message: impl Into<String>) {
        self.append(Severity::Info, tag, message);
    }

    pub fn warn(&mut self, tag: &str, message: impl Into<String>) {
        self.append(Severity::Warn, tag, message);
    }

    pub fn error(&mut self, tag: &str, message: impl Into<String>) {
        self.append(Severity::Error, tag, message);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records at exactly `severity`.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &LogRecord> {
        self.records.iter().filter(move |r| r.severity == severity)
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a LogRecord> {
        self.records.iter().filter(move |r| r.tag == tag)
    }

    pub fn last(&self) -> Option<&LogRecord> {
        self.records.last()
    }
}

impl fmt::Debug for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLog")
            .field("records", &self.records)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
