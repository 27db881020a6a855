//! Source files and the reader-to-pipeline hand-off
//!
//! Both readers are synchronous parsers. They run on a blocking thread and
//! hand parsed items to the async pipeline through a bounded channel, which
//! caps the number of records alive at any time.

use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{IngestError, Result};

const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Which of the two release files a message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Json,
    Text,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Json => f.write_str("JSON source"),
            SourceKind::Text => f.write_str("text source"),
        }
    }
}

/// Fail with `SourceNotFound` unless `path` exists.
pub fn ensure_exists(kind: SourceKind, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(IngestError::SourceNotFound {
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Open a source file, decompressing `.gz` files on the fly.
pub fn open_source(kind: SourceKind, path: &Path) -> Result<Box<dyn Read + Send>> {
    ensure_exists(kind, path)?;
    let file = File::open(path)?;

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let buffered = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        Ok(Box::new(GzDecoder::new(buffered)))
    } else {
        Ok(Box::new(file))
    }
}

/// Wrap a source in the read buffer used by both parsers.
pub(crate) fn buffered<R: Read>(reader: R) -> BufReader<R> {
    BufReader::with_capacity(READ_BUFFER_SIZE, reader)
}

/// Lazy, non-restartable sequence of items produced by a reader thread.
///
/// `S` is the summary the reader returns once it has finished (or stopped
/// because the consumer went away).
pub struct SourceStream<T, S> {
    items: mpsc::Receiver<T>,
    task: JoinHandle<Result<S>>,
}

impl<T, S> SourceStream<T, S> {
    /// Next item, or `None` once the reader is done.
    pub async fn next(&mut self) -> Option<T> {
        self.items.recv().await
    }

    /// Stop consuming and collect the reader's outcome.
    ///
    /// Items not yet received are discarded; a reader error surfaces here.
    pub async fn finish(self) -> Result<S> {
        drop(self.items);
        self.task.await?
    }
}

/// Run `produce` on a blocking thread, feeding a channel of `capacity` items.
pub(crate) fn spawn_producer<T, S, F>(capacity: usize, produce: F) -> SourceStream<T, S>
where
    T: Send + 'static,
    S: Send + 'static,
    F: FnOnce(mpsc::Sender<T>) -> Result<S> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = tokio::task::spawn_blocking(move || produce(tx));

    SourceStream { items: rx, task }
}
