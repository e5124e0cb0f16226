use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;
use memchr::{memmem, memrchr};

use crate::error::ReadError;

/// Backward line extraction over some byte source.
///
/// Implementations scan from their current end position toward the start,
/// one line at a time. Results are concatenated most-recent-line-first,
/// each line keeping its terminating newline. Successive calls continue
/// backward from wherever the previous call stopped.
pub trait LineExtractor {
    /// Extracts the previous `n` lines. `n == 0` is an empty success;
    /// running out of data before `n` lines is [`ReadError::EndOfData`].
    fn last_n(&mut self, n: u64) -> Result<Bytes, ReadError>;

    /// Extracts every remaining line containing `needle`, scanning all the
    /// way to the start of the source.
    fn matching(&mut self, needle: &str) -> Result<Bytes, ReadError>;
}

/// Extractor over an immutable in-memory span.
///
/// Line boundaries are found with `memrchr` and whole lines are copied out
/// in one operation. Only safe because the span is a private copy that
/// cannot mutate under the scan; live file handles go through
/// [`SanitaryExtractor`] instead.
pub struct FastExtractor<'a> {
    span: &'a [u8],
    pos: usize,
}

impl<'a> FastExtractor<'a> {
    pub fn new(span: &'a [u8]) -> Self {
        Self {
            span,
            pos: span.len(),
        }
    }

    fn prev_line(&mut self) -> Result<&'a [u8], ReadError> {
        if self.pos == 0 {
            return Err(ReadError::EndOfData);
        }
        let start = match memrchr(b'\n', &self.span[..self.pos - 1]) {
            Some(at) => at + 1,
            None => 0,
        };
        let line = &self.span[start..self.pos];
        self.pos = start;
        Ok(line)
    }
}

impl LineExtractor for FastExtractor<'_> {
    fn last_n(&mut self, n: u64) -> Result<Bytes, ReadError> {
        if n == 0 {
            return Ok(Bytes::new());
        }
        let mut out = Vec::new();
        for _ in 0..n {
            out.extend_from_slice(self.prev_line()?);
        }
        Ok(out.into())
    }

    fn matching(&mut self, needle: &str) -> Result<Bytes, ReadError> {
        let finder = memmem::Finder::new(needle);
        let mut out = Vec::new();
        while self.pos > 0 {
            let line = self.prev_line()?;
            if finder.find(line).is_some() {
                out.extend_from_slice(line);
            }
        }
        Ok(out.into())
    }
}

/// Extractor over a live, possibly-mutating handle.
///
/// Moves one byte at a time, checking every seek and read result. A
/// zero-byte read mid-line means the source was truncated or replaced
/// under the scan; the call fails with [`ReadError::Truncation`] rather
/// than returning partial data.
pub struct SanitaryExtractor<R> {
    stream: R,
}

impl<R: Read + Seek> SanitaryExtractor<R> {
    pub fn new(stream: R) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    fn prev_line(&mut self) -> Result<Vec<u8>, ReadError> {
        let mut position = self.stream.stream_position()?;
        if position == 0 {
            return Err(ReadError::EndOfData);
        }

        let mut line = Vec::new();
        let mut newline_seen = false;
        loop {
            position = self.stream.seek(SeekFrom::Current(-1))?;

            let mut byte = [0u8; 1];
            if self.stream.read(&mut byte)? != 1 {
                return Err(ReadError::Truncation);
            }

            if byte[0] == b'\n' {
                if newline_seen {
                    // Cursor rests at the start of the line just read.
                    break;
                }
                newline_seen = true;
            }

            self.stream.seek(SeekFrom::Current(-1))?;
            line.push(byte[0]);

            if position == 0 {
                break;
            }
        }

        line.reverse();
        Ok(line)
    }
}

impl<R: Read + Seek> LineExtractor for SanitaryExtractor<R> {
    fn last_n(&mut self, n: u64) -> Result<Bytes, ReadError> {
        if n == 0 {
            return Ok(Bytes::new());
        }
        let mut out = Vec::new();
        for _ in 0..n {
            let line = self.prev_line()?;
            out.extend_from_slice(&line);
        }
        Ok(out.into())
    }

    fn matching(&mut self, needle: &str) -> Result<Bytes, ReadError> {
        let finder = memmem::Finder::new(needle);
        let mut out = Vec::new();
        loop {
            let line = self.prev_line()?;
            if finder.find(&line).is_some() {
                out.extend_from_slice(&line);
            }
            if self.stream.stream_position()? == 0 {
                break;
            }
        }
        Ok(out.into())
    }
}
