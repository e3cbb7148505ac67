use crate::config::{MAX_HEADER_BYTES, READ_BUFFER_SIZE};
use crate::models::Compression;
use anyhow::{Context, Result};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const VERSION_PREFIX: &[u8] = b"WARC/";

#[derive(Debug, Error)]
pub enum FrameError {
    /// The record is unusable but the stream around it is intact.
    #[error("malformed record at offset {offset}: {reason}")]
    Malformed { offset: u64, reason: &'static str },
    #[error("read failed at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },
}

impl FrameError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Malformed { .. })
    }

    pub fn offset(&self) -> u64 {
        match self {
            FrameError::Malformed { offset, .. } | FrameError::Io { offset, .. } => *offset,
        }
    }
}

#[derive(Debug)]
pub struct Frame {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// Splits a decompressed WARC stream into raw records.
///
/// Each frame holds the header block (version line through the empty line)
/// followed by exactly `Content-Length` bytes of block. The separator after
/// the block is consumed but not included. After a malformed record the
/// reader skips ahead to the next line starting with `WARC/`; the skip runs
/// at the start of the following call, so the malformed error is always
/// handed out before any read error hit while skipping.
pub struct WarcReader<R> {
    inner: R,
    offset: u64,
    /// Version line read ahead while resynchronising
    pending: Option<(u64, Vec<u8>)>,
    skip: Skip,
    done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Nothing,
    ToVersionLine,
    /// A line was cut at the header limit; drop its tail, then resync.
    RestOfLine,
}

pub type ContainerReader = WarcReader<Box<dyn BufRead + Send>>;

impl ContainerReader {
    /// Opens a container, picking the decompressor from the file extension.
    ///
    /// The first buffer is filled eagerly so a corrupt compression header is
    /// reported here rather than mid-run.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open WARC file: {}", path.display()))?;
        let compression = Compression::from_path(path);

        let mut reader: Box<dyn BufRead + Send> = match compression {
            Compression::Gzip => Box::new(BufReader::with_capacity(
                READ_BUFFER_SIZE,
                MultiGzDecoder::new(BufReader::new(file)),
            )),
            Compression::Bzip2 => Box::new(BufReader::with_capacity(
                READ_BUFFER_SIZE,
                MultiBzDecoder::new(BufReader::new(file)),
            )),
            Compression::None => Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)),
        };

        reader.fill_buf().with_context(|| {
            format!(
                "Failed to initialise {:?} container reader for: {}",
                compression,
                path.display()
            )
        })?;

        debug!(path = %path.display(), ?compression, "Opened WARC container");
        Ok(WarcReader::new(reader))
    }
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            pending: None,
            skip: Skip::Nothing,
            done: false,
        }
    }

    /// Reads one line of at most `limit` bytes. A longer line comes back cut,
    /// without its trailing newline.
    fn read_line(&mut self, limit: usize) -> Result<Option<Vec<u8>>, FrameError> {
        let offset = self.offset;
        let mut line = Vec::new();
        let n = (&mut self.inner)
            .take(limit as u64)
            .read_until(b'\n', &mut line)
            .map_err(|source| FrameError::Io { offset, source })?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;
        Ok(Some(line))
    }

    fn skip_rest_of_line(&mut self) -> Result<(), FrameError> {
        loop {
            let offset = self.offset;
            let buf = self
                .inner
                .fill_buf()
                .map_err(|source| FrameError::Io { offset, source })?;
            if buf.is_empty() {
                return Ok(());
            }
            let (used, found) = match memchr::memchr(b'\n', buf) {
                Some(i) => (i + 1, true),
                None => (buf.len(), false),
            };
            self.inner.consume(used);
            self.offset += used as u64;
            if found {
                return Ok(());
            }
        }
    }

    fn next_nonblank_line(&mut self) -> Result<Option<(u64, Vec<u8>)>, FrameError> {
        loop {
            let start = self.offset;
            match self.read_line(MAX_HEADER_BYTES + 1)? {
                Some(line) if is_blank(&line) => continue,
                Some(line) => return Ok(Some((start, line))),
                None => return Ok(None),
            }
        }
    }

    /// Skips to the next version line and parks it in `pending`.
    fn resync(&mut self) -> Result<(), FrameError> {
        loop {
            let start = self.offset;
            match self.read_line(MAX_HEADER_BYTES + 1)? {
                Some(line) if !line.ends_with(b"\n") => self.skip_rest_of_line()?,
                Some(line) if line.starts_with(VERSION_PREFIX) => {
                    self.pending = Some((start, line));
                    return Ok(());
                }
                Some(_) => continue,
                None => return Ok(()),
            }
        }
    }

    fn finish_skip(&mut self) -> Result<(), FrameError> {
        match std::mem::replace(&mut self.skip, Skip::Nothing) {
            Skip::Nothing => Ok(()),
            Skip::ToVersionLine => self.resync(),
            Skip::RestOfLine => {
                self.skip_rest_of_line()?;
                self.resync()
            }
        }
    }

    fn malformed(&mut self, offset: u64, reason: &'static str, skip: Skip) -> FrameError {
        self.skip = skip;
        FrameError::Malformed { offset, reason }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        self.finish_skip()?;

        let (start, first) = match self.pending.take() {
            Some(line) => line,
            None => match self.next_nonblank_line()? {
                Some(line) => line,
                None => return Ok(None),
            },
        };

        if first.len() > MAX_HEADER_BYTES {
            return Err(self.malformed(start, "header block too large", skip_after(&first)));
        }
        if !first.starts_with(VERSION_PREFIX) {
            return Err(self.malformed(start, "missing WARC version line", Skip::ToVersionLine));
        }

        let mut bytes = first;
        let mut content_length = None;
        loop {
            let line_start = self.offset;
            let budget = MAX_HEADER_BYTES - bytes.len();
            let Some(line) = self.read_line(budget + 1)? else {
                return Err(FrameError::Malformed {
                    offset: start,
                    reason: "header block truncated by end of input",
                });
            };
            if line.len() > budget {
                return Err(self.malformed(start, "header block too large", skip_after(&line)));
            }
            if is_blank(&line) {
                bytes.extend_from_slice(&line);
                break;
            }
            if line.starts_with(VERSION_PREFIX) {
                self.pending = Some((line_start, line));
                return Err(FrameError::Malformed {
                    offset: start,
                    reason: "header block not terminated",
                });
            }
            if content_length.is_none() {
                content_length = parse_content_length(&line);
            }
            bytes.extend_from_slice(&line);
        }

        let length = match content_length {
            Some(Some(length)) => length,
            Some(None) => {
                return Err(self.malformed(start, "invalid Content-Length", Skip::ToVersionLine))
            }
            None => {
                return Err(self.malformed(start, "missing Content-Length", Skip::ToVersionLine))
            }
        };

        let header_len = bytes.len();
        let offset = self.offset;
        if let Err(source) = (&mut self.inner).take(length).read_to_end(&mut bytes) {
            return Err(FrameError::Io { offset, source });
        }
        let read = (bytes.len() - header_len) as u64;
        self.offset += read;

        if read < length {
            return Err(FrameError::Io {
                offset: start,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("record block truncated: expected {length} bytes, got {read}"),
                ),
            });
        }

        Ok(Some(Frame {
            offset: start,
            bytes,
        }))
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = Result<Frame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                if !e.is_recoverable() {
                    self.done = true;
                }
                Some(Err(e))
            }
        }
    }
}

/// A line that was cut before its newline still has a tail in the stream.
fn skip_after(line: &[u8]) -> Skip {
    if line.ends_with(b"\n") {
        Skip::ToVersionLine
    } else {
        Skip::RestOfLine
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| matches!(b, b'\r' | b'\n'))
}

/// `None` if the line is some other header, `Some(None)` if the value is bad.
fn parse_content_length(line: &[u8]) -> Option<Option<u64>> {
    let colon = memchr::memchr(b':', line)?;
    let name = line[..colon].trim_ascii();
    if !name.eq_ignore_ascii_case(b"content-length") {
        return None;
    }
    let value = std::str::from_utf8(line[colon + 1..].trim_ascii())
        .ok()
        .and_then(|v| v.parse::<u64>().ok());
    Some(value)
}
