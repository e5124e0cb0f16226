use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::ReadError;

/// Which way the window walk moves through the stream. Production tail
/// reads always walk [`Direction::Backward`]; forward walks exist for
/// ground-truth comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

/// Receiver for the raw windows produced by [`scan`].
///
/// `keep_going` is consulted before every read; `on_window` gets each raw
/// window together with its scan-order index (0 = nearest the starting
/// position) and may abort the walk by returning an error.
pub trait ScanSink {
    fn keep_going(&mut self) -> bool {
        true
    }

    fn on_window(&mut self, window: &[u8], index: u64) -> Result<(), ReadError>;
}

impl<F> ScanSink for F
where
    F: FnMut(&[u8], u64) -> Result<(), ReadError>,
{
    fn on_window(&mut self, window: &[u8], index: u64) -> Result<(), ReadError> {
        self(window, index)
    }
}

/// Walks `stream` from its current position in fixed-size windows, handing
/// each raw window to `sink`. Returns the number of windows delivered.
///
/// Backward steps read exactly `min(window_size, position)` bytes and then
/// restore the position to the start of the just-read window; reading fewer
/// bytes than that means the stream shrank or moved under the reader and
/// fails the walk with [`ReadError::Truncation`]. Forward steps treat a
/// short read as ordinary end-of-stream: the partial window is delivered
/// and the walk stops cleanly.
pub fn scan<R, S>(
    stream: &mut R,
    window_size: u64,
    direction: Direction,
    sink: &mut S,
) -> Result<u64, ReadError>
where
    R: Read + Seek,
    S: ScanSink + ?Sized,
{
    if window_size == 0 {
        return Err(ReadError::BadWindowSize);
    }

    let mut index = 0u64;
    while sink.keep_going() {
        let window = match direction {
            Direction::Backward => next_window_backward(stream, window_size)?,
            Direction::Forward => next_window_forward(stream, window_size)?,
        };
        let Some(window) = window else { break };

        sink.on_window(&window, index)?;
        index += 1;

        if direction == Direction::Forward && (window.len() as u64) < window_size {
            break;
        }
    }
    Ok(index)
}

fn next_window_backward<R: Read + Seek>(
    stream: &mut R,
    window_size: u64,
) -> Result<Option<Vec<u8>>, ReadError> {
    let position = stream
        .stream_position()
        .map_err(|_| ReadError::Truncation)?;
    let step = window_size.min(position);
    if step == 0 {
        return Ok(None);
    }

    stream
        .seek(SeekFrom::Current(-(step as i64)))
        .map_err(|_| ReadError::Truncation)?;

    let mut window = vec![0u8; step as usize];
    stream.read_exact(&mut window).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            ReadError::Truncation
        } else {
            ReadError::Io(err)
        }
    })?;

    stream
        .seek(SeekFrom::Current(-(step as i64)))
        .map_err(|_| ReadError::Truncation)?;

    Ok(Some(window))
}

fn next_window_forward<R: Read + Seek>(
    stream: &mut R,
    window_size: u64,
) -> Result<Option<Vec<u8>>, ReadError> {
    let mut window = vec![0u8; window_size as usize];
    let mut filled = 0usize;
    while filled < window.len() {
        match stream.read(&mut window[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    if filled == 0 {
        return Ok(None);
    }
    window.truncate(filled);
    Ok(Some(window))
}
