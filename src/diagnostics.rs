//! Build log sinks and buffered diagnostics
//!
//! Resolvers and compilers are chatty. Their output is collected in a
//! [`BufferedLog`] for the duration of a scope and only replayed in full when
//! the scope fails; on success just warnings and errors reach the real sink.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Severity of a build log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// One log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

/// Sink for build log records
pub trait BuildLog: Send + Sync {
    fn log(&self, record: LogRecord);

    fn debug(&self, message: &str) {
        self.log(LogRecord {
            level: LogLevel::Debug,
            message: message.to_string(),
        });
    }

    fn info(&self, message: &str) {
        self.log(LogRecord {
            level: LogLevel::Info,
            message: message.to_string(),
        });
    }

    fn warn(&self, message: &str) {
        self.log(LogRecord {
            level: LogLevel::Warn,
            message: message.to_string(),
        });
    }

    fn error(&self, message: &str) {
        self.log(LogRecord {
            level: LogLevel::Error,
            message: message.to_string(),
        });
    }
}

/// Forwards build log records to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl BuildLog for TracingLog {
    fn log(&self, record: LogRecord) {
        match record.level {
            LogLevel::Debug => tracing::debug!(target: "kiln::build", "{}", record.message),
            LogLevel::Info => tracing::info!(target: "kiln::build", "{}", record.message),
            LogLevel::Warn => tracing::warn!(target: "kiln::build", "{}", record.message),
            LogLevel::Error => tracing::error!(target: "kiln::build", "{}", record.message),
        }
    }
}

/// Lowest level replayed after a successful scope
const QUIET_SUCCESS_LEVEL: LogLevel = LogLevel::Warn;

/// Collects records in emission order until the scope completes
#[derive(Debug, Default)]
pub struct BufferedLog {
    records: Mutex<Vec<LogRecord>>,
}

impl BufferedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the buffer into `inner`.
    ///
    /// `failed = false` keeps only records at or above warn; `failed = true`
    /// replays everything. Order is preserved either way.
    pub fn flush(&self, inner: &dyn BuildLog, failed: bool) {
        let records = {
            let mut guard = self
                .records
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };

        for record in records {
            if failed || record.level >= QUIET_SUCCESS_LEVEL {
                inner.log(record);
            }
        }
    }

    fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl BuildLog for BufferedLog {
    fn log(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

/// Run `body` with a buffered log, replaying into `inner` when it finishes.
///
/// Records are flushed before an error is returned, so they always precede
/// whatever the caller does with the failure.
pub async fn buffered<T, E, F, Fut>(inner: &dyn BuildLog, body: F) -> Result<T, E>
where
    F: FnOnce(Arc<dyn BuildLog>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let buffer = Arc::new(BufferedLog::new());
    let scoped: Arc<dyn BuildLog> = buffer.clone();
    let result = body(scoped).await;
    tracing::trace!(
        records = buffer.len(),
        failed = result.is_err(),
        "flushing buffered diagnostics"
    );
    buffer.flush(inner, result.is_err());
    result
}

/// Log sink that records everything it receives, for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingLog {
    pub records: Mutex<Vec<LogRecord>>,
}

#[cfg(test)]
impl RecordingLog {
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }
}

#[cfg(test)]
impl BuildLog for RecordingLog {
    fn log(&self, record: LogRecord) {
        self.records.lock().unwrap().push(record);
    }
}
