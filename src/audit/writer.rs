//! Append-only, per-stream serialised log writer.
//!
//! Each file has its own async mutex. A line (terminator included) is written
//! with a single `write_all` and flushed before the lock is released, so two
//! writers on the same stream can never interleave partial lines. Files are
//! only ever opened in append mode.
//!
//! Failures never reach the caller: a write is retried once on a freshly
//! opened handle, and a second failure is reported as a `WARN` tracing event.
//! A flush that outlives its timeout is not retried, since the line is already
//! queued on the file.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::{AppEvent, LogEntry, Stream};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);
const RETRY_DELAY: Duration = Duration::from_millis(25);

/// Keep alphanumerics, `_` and `-` so a username is safe as a file name part.
#[must_use]
pub fn sanitize_username(username: &str) -> String {
    username
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[derive(Debug)]
enum WriteError {
    /// The write did not complete; the handle is dropped before a retry.
    Failed(io::Error),
    /// The line is queued but the flush did not finish in time.
    Unconfirmed,
}

#[derive(Debug)]
struct StreamWriter {
    path: PathBuf,
    file: Mutex<Option<File>>,
    flush_timeout: Duration,
    #[cfg(test)]
    attempts: AtomicUsize,
    #[cfg(test)]
    injected_failures: AtomicUsize,
}

impl StreamWriter {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
            flush_timeout: FLUSH_TIMEOUT,
            #[cfg(test)]
            attempts: AtomicUsize::new(0),
            #[cfg(test)]
            injected_failures: AtomicUsize::new(0),
        }
    }

    async fn open(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path).await
    }

    /// Create the file if missing so readers always find both streams.
    async fn touch(&self) -> io::Result<()> {
        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(Self::open(&self.path).await?);
        }
        Ok(())
    }

    #[cfg(test)]
    fn injected_failure(&self) -> Option<io::Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .ok()
            .map(|_| io::Error::other("injected write failure"))
    }

    async fn write_line(&self, line: &str) -> Result<(), WriteError> {
        let mut buffer = String::with_capacity(line.len() + 1);
        buffer.push_str(line);
        buffer.push('\n');

        let mut guard = self.file.lock().await;
        #[cfg(test)]
        if let Some(err) = self.injected_failure() {
            *guard = None;
            return Err(WriteError::Failed(err));
        }
        if guard.is_none() {
            *guard = Some(Self::open(&self.path).await.map_err(WriteError::Failed)?);
        }
        let Some(file) = guard.as_mut() else {
            return Err(WriteError::Failed(io::Error::new(
                io::ErrorKind::NotFound,
                "log file not open",
            )));
        };
        let result = match file.write_all(buffer.as_bytes()).await {
            Ok(()) => match timeout(self.flush_timeout, file.flush()).await {
                Ok(flushed) => flushed.map_err(WriteError::Failed),
                Err(_) => return Err(WriteError::Unconfirmed),
            },
            Err(err) => Err(WriteError::Failed(err)),
        };
        if result.is_err() {
            // Drop the handle so the retry reopens the file.
            *guard = None;
        }
        result
    }
}

#[derive(Debug)]
pub struct AuditLogger {
    dir: PathBuf,
    access: StreamWriter,
    app: StreamWriter,
    user_streams: Mutex<HashMap<String, Arc<StreamWriter>>>,
}

impl AuditLogger {
    /// Create the log directory and both stream files.
    ///
    /// # Errors
    /// Returns an error if the directory or either file cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        let logger = Self {
            access: StreamWriter::new(dir.join(Stream::Access.file_name())),
            app: StreamWriter::new(dir.join(Stream::App.file_name())),
            user_streams: Mutex::new(HashMap::new()),
            dir,
        };
        logger.access.touch().await?;
        logger.app.touch().await?;
        Ok(logger)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn stream_path(&self, stream: Stream) -> PathBuf {
        self.dir.join(stream.file_name())
    }

    /// Append one entry to its stream. Never fails from the caller's view.
    pub async fn write(&self, entry: impl Into<LogEntry>) {
        let entry = entry.into();
        let line = entry.to_line();
        match &entry {
            LogEntry::Access(_) => self.write_with_retry(&self.access, &line).await,
            LogEntry::App(event) => match self.user_stream(event).await {
                Some(writer) => self.write_with_retry(&writer, &line).await,
                None => self.write_with_retry(&self.app, &line).await,
            },
        };
    }

    async fn user_stream(&self, event: &AppEvent) -> Option<Arc<StreamWriter>> {
        let safe = sanitize_username(event.username.as_deref()?);
        if safe.is_empty() {
            return None;
        }
        let mut streams = self.user_streams.lock().await;
        let writer = streams
            .entry(safe)
            .or_insert_with_key(|name| {
                Arc::new(StreamWriter::new(self.dir.join(format!("app_{name}.log"))))
            })
            .clone();
        Some(writer)
    }

    /// Returns whether the line was handed to the file.
    async fn write_with_retry(&self, writer: &StreamWriter, line: &str) -> bool {
        for attempt in 1..=2u8 {
            match writer.write_line(line).await {
                Ok(()) => return true,
                Err(WriteError::Unconfirmed) => {
                    warn!(
                        path = %writer.path.display(),
                        "audit flush timed out, line left queued"
                    );
                    return true;
                }
                Err(WriteError::Failed(err)) => {
                    debug!("audit write attempt {attempt} failed: {err}");
                }
            }
            if attempt == 1 {
                sleep(RETRY_DELAY).await;
            }
        }
        warn!(
            path = %writer.path.display(),
            "dropping audit line after retry"
        );
        false
    }
}
