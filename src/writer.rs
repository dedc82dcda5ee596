//! Record serialization and output.
//!
//! Every record, header included, is a sequence of fields escaped with
//! [`escape_field`], joined with commas and terminated with the platform line
//! terminator. [`RecordWriter`] owns the output stream, buffers it, optionally
//! gzip-compresses it, and flushes after every line.
//!
//! # Example
//!
//! ```no_run
//! use topic_log::writer::{join_fields, RecordWriter};
//! use std::path::Path;
//!
//! let mut writer = RecordWriter::create(Path::new("run.csv"), true, 6)?;
//! writer.write_line(&join_fields(["time", "pose"]))?;
//! writer.write_line(&join_fields(["0.02", "1,2"]))?; // 0.02,"1,2"
//! writer.close()?;
//! # Ok::<(), std::io::Error>(())
//! ```

use crate::error::{LogError, LogResult};
use flate2::{write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Line terminator of the host platform.
#[cfg(windows)]
pub const LINE_TERMINATOR: &str = "\r\n";
/// Line terminator of the host platform.
#[cfg(not(windows))]
pub const LINE_TERMINATOR: &str = "\n";

/// Suffix appended to the destination path of compressed logs.
pub const GZIP_SUFFIX: &str = ".gz";

/// Wraps a field containing a comma in double quotes.
///
/// Quotes inside the field are left untouched, so a field holding both a comma
/// and a double quote does not survive a round trip through a CSV reader.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(',') {
        Cow::Owned(format!("\"{field}\""))
    } else {
        Cow::Borrowed(field)
    }
}

/// Escapes each field and joins them with commas.
pub fn join_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|field| escape_field(field.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Path actually opened for `path`, with [`GZIP_SUFFIX`] appended when compressed.
pub fn output_path(path: &Path, compressed: bool) -> PathBuf {
    if compressed {
        let mut name = OsString::from(path.as_os_str());
        name.push(GZIP_SUFFIX);
        PathBuf::from(name)
    } else {
        path.to_path_buf()
    }
}

/// What to do when the output stream cannot be opened or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoErrorPolicy {
    /// Log the failure and keep going; the affected line is lost.
    #[default]
    Report,
    /// Return the failure to the caller as `LogError::Io`.
    Fail,
}

impl IoErrorPolicy {
    /// Turns the result of a line write into the caller-visible outcome.
    pub fn handle(self, result: io::Result<()>) -> LogResult<LineOutcome> {
        match (result, self) {
            (Ok(()), _) => Ok(LineOutcome::Written),
            (Err(err), IoErrorPolicy::Report) => {
                tracing::error!(error = %err, "Failed to write record, line dropped");
                Ok(LineOutcome::Dropped { kind: err.kind() })
            }
            (Err(err), IoErrorPolicy::Fail) => Err(LogError::Io(err)),
        }
    }
}

/// Outcome of writing one line under `IoErrorPolicy::Report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// The line reached the output stream.
    Written,
    /// The line was lost.
    Dropped {
        /// Kind of the I/O error that lost it.
        kind: io::ErrorKind,
    },
}

impl LineOutcome {
    /// Whether the line reached the output stream.
    pub fn is_written(&self) -> bool {
        matches!(self, LineOutcome::Written)
    }
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
    Custom(BufWriter<Box<dyn Write + Send>>),
    Disconnected,
}

impl Sink {
    fn writer(&mut self) -> io::Result<&mut dyn Write> {
        match self {
            Sink::Plain(w) => Ok(w as &mut dyn Write),
            Sink::Gzip(w) => Ok(w as &mut dyn Write),
            Sink::Custom(w) => Ok(w as &mut dyn Write),
            Sink::Disconnected => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "output stream is not open",
            )),
        }
    }

    /// Drops bytes still held in the buffer without writing them.
    fn discard_pending(&mut self) {
        *self = match std::mem::replace(self, Sink::Disconnected) {
            Sink::Plain(w) => Sink::Plain(BufWriter::new(w.into_parts().0)),
            Sink::Gzip(w) => Sink::Gzip(BufWriter::new(w.into_parts().0)),
            Sink::Custom(w) => Sink::Custom(BufWriter::new(w.into_parts().0)),
            Sink::Disconnected => Sink::Disconnected,
        };
    }
}

/// Buffered, optionally gzip-compressed line writer.
pub struct RecordWriter {
    sink: Sink,
    path: Option<PathBuf>,
    lines_written: u64,
}

impl RecordWriter {
    /// Creates or truncates the destination file.
    ///
    /// With `compressed` set, [`GZIP_SUFFIX`] is appended to `path` and the file
    /// is wrapped in a gzip encoder at `compression_level` (0-9). Each
    /// [`write_line`](Self::write_line) ends with a sync flush, so the file
    /// decodes up to the last complete line even if it is never closed.
    pub fn create(path: &Path, compressed: bool, compression_level: u32) -> io::Result<Self> {
        let path = output_path(path, compressed);
        let file = File::create(&path)?;
        let sink = if compressed {
            let encoder = GzEncoder::new(file, Compression::new(compression_level.min(9)));
            Sink::Gzip(BufWriter::new(encoder))
        } else {
            Sink::Plain(BufWriter::new(file))
        };
        tracing::info!(path = %path.display(), compressed, "Record output opened");
        Ok(Self {
            sink,
            path: Some(path),
            lines_written: 0,
        })
    }

    /// Writes records to an arbitrary byte sink.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        let inner: Box<dyn Write + Send> = Box::new(writer);
        Self {
            sink: Sink::Custom(BufWriter::new(inner)),
            path: None,
            lines_written: 0,
        }
    }

    /// A writer whose output could not be opened; every write fails with
    /// `io::ErrorKind::NotConnected`.
    pub fn disconnected(path: Option<PathBuf>) -> Self {
        Self {
            sink: Sink::Disconnected,
            path,
            lines_written: 0,
        }
    }

    /// The file being written, if the writer is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// False for a writer created by [`disconnected`](Self::disconnected).
    pub fn is_connected(&self) -> bool {
        !matches!(self.sink, Sink::Disconnected)
    }

    /// Number of lines fully written and flushed.
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Appends `line` plus [`LINE_TERMINATOR`] and flushes through to the OS.
    ///
    /// A failed write is not retried. Whatever part of the line is still
    /// buffered is discarded, so a later line never carries its remainder.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        if let Err(err) = self.write_and_flush(line) {
            self.sink.discard_pending();
            return Err(err);
        }
        self.lines_written += 1;
        tracing::trace!(bytes = line.len(), "Record line flushed");
        Ok(())
    }

    fn write_and_flush(&mut self, line: &str) -> io::Result<()> {
        let out = self.sink.writer()?;
        out.write_all(line.as_bytes())?;
        out.write_all(LINE_TERMINATOR.as_bytes())?;
        out.flush()
    }

    /// Flushes and closes the stream, writing the gzip trailer if compressed.
    pub fn close(mut self) -> io::Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.sink, Sink::Disconnected) {
            Sink::Plain(mut w) => {
                w.flush()?;
                w.get_ref().sync_all()
            }
            Sink::Gzip(mut w) => {
                w.flush()?;
                let encoder = w.get_mut();
                encoder.try_finish()?;
                encoder.get_ref().sync_all()
            }
            Sink::Custom(mut w) => w.flush(),
            Sink::Disconnected => Ok(()),
        }
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(error = %err, "Failed to flush record output on drop");
        }
    }
}

impl std::fmt::Debug for RecordWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match self.sink {
            Sink::Plain(_) => "plain",
            Sink::Gzip(_) => "gzip",
            Sink::Custom(_) => "custom",
            Sink::Disconnected => "disconnected",
        };
        f.debug_struct("RecordWriter")
            .field("sink", &sink)
            .field("path", &self.path)
            .field("lines_written", &self.lines_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("42"), "42");
        assert_eq!(escape_field("1,2"), "\"1,2\"");
        assert_eq!(escape_field(""), "");
        // Quotes are not escaped.
        assert_eq!(escape_field("say \"hi\", bye"), "\"say \"hi\", bye\"");
        assert!(matches!(escape_field("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_join_fields() {
        assert_eq!(join_fields(["temp", "cmd", "id"]), "temp,cmd,id");
        assert_eq!(join_fields(["98.6", "1,2", "x"]), "98.6,\"1,2\",x");
        assert_eq!(join_fields(Vec::<String>::new()), "");
    }

    #[test]
    fn test_output_path() {
        let path = Path::new("/tmp/run.csv");
        assert_eq!(output_path(path, false), PathBuf::from("/tmp/run.csv"));
        assert_eq!(output_path(path, true), PathBuf::from("/tmp/run.csv.gz"));
    }

    #[test]
    fn test_plain_file_lines_are_flushed_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.csv");
        let mut writer = RecordWriter::create(&path, false, 6).unwrap();

        writer.write_line("a,b").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("a,b{LINE_TERMINATOR}"));

        writer.write_line("1,2").unwrap();
        assert_eq!(writer.lines_written(), 2);
        writer.close().unwrap();
    }

    #[test]
    fn test_create_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.csv");
        std::fs::write(&path, "stale contents\n").unwrap();

        let writer = RecordWriter::create(&path, false, 6).unwrap();
        writer.close().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_gzip_output_decodes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let mut writer = RecordWriter::create(&path, true, 6).unwrap();
        assert_eq!(writer.path(), Some(dir.path().join("run.csv.gz").as_path()));

        writer.write_line("x,y").unwrap();
        writer.write_line("1,2").unwrap();
        writer.close().unwrap();

        let mut decoded = String::new();
        GzDecoder::new(File::open(dir.path().join("run.csv.gz")).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, format!("x,y{LINE_TERMINATOR}1,2{LINE_TERMINATOR}"));
        assert!(!path.exists());
    }

    #[test]
    fn test_gzip_finished_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dropped.csv");
        {
            let mut writer = RecordWriter::create(&path, true, 1).unwrap();
            writer.write_line("only").unwrap();
        }

        let mut decoded = String::new();
        GzDecoder::new(File::open(dir.path().join("dropped.csv.gz")).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, format!("only{LINE_TERMINATOR}"));
    }

    #[test]
    fn test_gzip_decodes_before_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("live.csv");
        let mut writer = RecordWriter::create(&path, true, 6).unwrap();
        writer.write_line("x,y").unwrap();
        writer.write_line("1,2").unwrap();

        // No trailer yet: the stream decodes up to the last line, then ends early.
        let mut decoded = Vec::new();
        let result = GzDecoder::new(File::open(dir.path().join("live.csv.gz")).unwrap())
            .read_to_end(&mut decoded);
        assert!(result.is_err());
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            format!("x,y{LINE_TERMINATOR}1,2{LINE_TERMINATOR}")
        );

        writer.close().unwrap();
    }

    #[derive(Clone, Default)]
    struct FlakyWriter {
        failing: Arc<AtomicBool>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "bus reset"));
            }
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_line_is_not_replayed() {
        let sink = FlakyWriter::default();
        let mut writer = RecordWriter::from_writer(sink.clone());

        sink.failing.store(true, Ordering::SeqCst);
        assert!(writer.write_line("lost").is_err());
        assert_eq!(writer.lines_written(), 0);

        sink.failing.store(false, Ordering::SeqCst);
        writer.write_line("kept").unwrap();
        assert_eq!(writer.lines_written(), 1);

        let written = sink.written.lock().unwrap().clone();
        assert_eq!(String::from_utf8(written).unwrap(), format!("kept{LINE_TERMINATOR}"));
    }

    #[test]
    fn test_disconnected_writer_fails() {
        let mut writer = RecordWriter::disconnected(None);
        assert!(!writer.is_connected());
        let err = writer.write_line("lost").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert_eq!(writer.lines_written(), 0);
    }

    #[test]
    fn test_policy_report_and_fail() {
        let err = || -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"))
        };

        let outcome = IoErrorPolicy::Report.handle(err()).unwrap();
        assert_eq!(
            outcome,
            LineOutcome::Dropped {
                kind: io::ErrorKind::WriteZero
            }
        );
        assert!(matches!(
            IoErrorPolicy::Fail.handle(err()),
            Err(LogError::Io(_))
        ));
        assert!(IoErrorPolicy::Fail.handle(Ok(())).unwrap().is_written());
    }
}
