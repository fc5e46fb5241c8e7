//! Audit log sink.
//!
//! One plain-text file per build, truncated when opened. Every record is a
//! `// <path>` header line followed by the injected text, written under a
//! lock in a single `write_all` so concurrent transforms never interleave.
//! Write failures are swallowed after one warning per build.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Result, UndoError};

pub const AUDIT_HEADER: &str =
    "/* eslint-disable eslint-comments/no-unlimited-disable */\n/* eslint-disable */\n\n";

pub struct AuditLog {
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    path: Option<PathBuf>,
    warned: AtomicBool,
    records: AtomicUsize,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("path", &self.path)
            .field("records", &self.records.load(Ordering::Relaxed))
            .finish()
    }
}

impl AuditLog {
    /// Truncates `path` and writes the header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(UndoError::SinkWrite)?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(AUDIT_HEADER.as_bytes())
            .map_err(UndoError::SinkWrite)?;
        Ok(Self::with_writer(Box::new(writer), Some(path.to_path_buf())))
    }

    /// A sink over any writer; used for in-memory logs.
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self::with_writer(writer, None)
    }

    /// A sink that accepts and drops every record.
    pub fn disabled() -> Self {
        Self {
            writer: Mutex::new(None),
            path: None,
            warned: AtomicBool::new(false),
            records: AtomicUsize::new(0),
        }
    }

    /// An in-memory sink and a handle to read back what it received.
    pub fn in_memory() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let mut writer = buffer.clone();
        // Writing to a Vec cannot fail.
        let _ = writer.write_all(AUDIT_HEADER.as_bytes());
        (Self::from_writer(Box::new(writer)), buffer)
    }

    fn with_writer(writer: Box<dyn Write + Send>, path: Option<PathBuf>) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            path,
            warned: AtomicBool::new(false),
            records: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of records accepted so far.
    pub fn len(&self) -> usize {
        self.records.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one record. Never fails; see `try_record` for the error.
    pub fn record(&self, file_path: &str, text: &str) {
        if let Err(err) = self.try_record(file_path, text) {
            self.warn_once(&err);
        }
    }

    pub fn try_record(&self, file_path: &str, text: &str) -> Result<()> {
        let entry = format!("// {}\n{}\n", file_path, text);
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };
        writer
            .write_all(entry.as_bytes())
            .map_err(UndoError::SinkWrite)?;
        self.records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn flush(&self) {
        let mut guard = self.writer.lock();
        if let Some(writer) = guard.as_mut() {
            if let Err(err) = writer.flush() {
                self.warn_once(&UndoError::SinkWrite(err));
            }
        }
    }

    /// Flushes and releases the writer; later records are dropped.
    pub fn close(&self) {
        self.flush();
        self.writer.lock().take();
    }

    fn warn_once(&self, err: &UndoError) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(code = err.code(), "audit log unwritable, records are being dropped: {}", err);
        }
    }

    #[cfg(test)]
    pub(crate) fn has_warned(&self) -> bool {
        self.warned.load(Ordering::Relaxed)
    }
}

/// Cloneable in-memory writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
