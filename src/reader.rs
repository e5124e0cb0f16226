use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::chunked;
use crate::error::ReadError;
use crate::extract::{LineExtractor, SanitaryExtractor};

/// Window size used by the chunked entry points. A tuning constant, not
/// part of the algorithm.
pub const WINDOW_SIZE: u64 = 64_000;

fn open_at_end(path: &Path) -> Result<File, ReadError> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(0))?;
    Ok(file)
}

/// Reads the last `n` lines of the file through the chunked engine, most
/// recent line first. Every call re-scans from the current end of file.
pub fn read_last_n_lines(path: impl AsRef<Path>, n: u64) -> Result<Bytes, ReadError> {
    let path = path.as_ref();
    debug!(path = %path.display(), n, "chunked tail read");
    let mut file = open_at_end(path)?;
    chunked::last_n_lines(&mut file, n, WINDOW_SIZE)
}

/// Reads every line of the file containing `needle`, most recent line
/// first. Scans the whole file; there is no early exit for filters.
pub fn read_lines_matching(path: impl AsRef<Path>, needle: &str) -> Result<Bytes, ReadError> {
    let path = path.as_ref();
    debug!(path = %path.display(), needle, "chunked filter read");
    let mut file = open_at_end(path)?;
    chunked::lines_matching(&mut file, needle, WINDOW_SIZE)
}

/// Unchunked equivalent of [`read_last_n_lines`]: the sanitary extractor
/// straight against the live handle. Ground truth for small files.
pub fn read_last_n_lines_unchunked(path: impl AsRef<Path>, n: u64) -> Result<Bytes, ReadError> {
    let file = open_at_end(path.as_ref())?;
    SanitaryExtractor::new(file).last_n(n)
}

/// Unchunked equivalent of [`read_lines_matching`].
pub fn read_lines_matching_unchunked(
    path: impl AsRef<Path>,
    needle: &str,
) -> Result<Bytes, ReadError> {
    let file = open_at_end(path.as_ref())?;
    SanitaryExtractor::new(file).matching(needle)
}
