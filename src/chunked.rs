use std::io::{Read, Seek};
use std::mem;
use std::sync::Arc;

use bytes::Bytes;
use crossbeam_channel::Sender;
use tracing::debug;

use crate::block::{decompose, stitch, Block};
use crate::error::ReadError;
use crate::extract::{FastExtractor, LineExtractor};
use crate::reassembly::{Accumulator, WindowResult};
use crate::scan::{scan, Direction, ScanSink};

/// Reads the last `n` newline-terminated lines of `stream` (positioned at
/// its end) through the chunked engine, most recent line first.
pub fn last_n_lines<R: Read + Seek>(
    stream: &mut R,
    n: u64,
    window_size: u64,
) -> Result<Bytes, ReadError> {
    ChunkedScan::new(Mode::LastN { target: n }).run(stream, window_size)
}

/// Reads every newline-terminated line of `stream` containing `needle`,
/// most recent line first. Filtering has no early exit: the scan always
/// runs to the start of the stream.
pub fn lines_matching<R: Read + Seek>(
    stream: &mut R,
    needle: &str,
    window_size: u64,
) -> Result<Bytes, ReadError> {
    ChunkedScan::new(Mode::Matching {
        needle: Arc::from(needle),
    })
    .run(stream, window_size)
}

enum Mode {
    LastN { target: u64 },
    Matching { needle: Arc<str> },
}

/// What one dispatched worker extracts from its private span.
enum Job {
    LastN(u64),
    Matching(Arc<str>),
}

/// Drives the backward window walk: stitches line-aligned spans out of raw
/// windows, fans each span out to a worker, and reassembles the results in
/// dispatch order. All scan state lives here; workers only ever see their
/// own span and the shared results channel.
struct ChunkedScan {
    mode: Mode,
    previous: Block,
    tally: u64,
    dispatch_index: u64,
    results: Accumulator,
    tx: Sender<WindowResult>,
}

impl ScanSink for ChunkedScan {
    fn keep_going(&mut self) -> bool {
        match self.mode {
            Mode::LastN { target } => self.tally < target,
            Mode::Matching { .. } => true,
        }
    }

    fn on_window(&mut self, window: &[u8], _index: u64) -> Result<(), ReadError> {
        let block = stitch(decompose(window), &self.previous);
        self.retain_and_dispatch(block)
    }
}

impl ChunkedScan {
    fn new(mode: Mode) -> Self {
        let (tx, results) = Accumulator::channel();
        Self {
            mode,
            previous: Block::default(),
            tally: 0,
            dispatch_index: 0,
            results,
            tx,
        }
    }

    fn run<R: Read + Seek>(mut self, stream: &mut R, window_size: u64) -> Result<Bytes, ReadError> {
        let windows = scan(stream, window_size, Direction::Backward, &mut self)?;
        self.flush(windows)?;

        let expected = self.dispatch_index;
        debug!(windows, dispatched = expected, "scan loop done");
        self.results.finish(expected)
    }

    /// Retains the stitched block for the next boundary join and hands its
    /// completed lines, if any, to a worker.
    fn retain_and_dispatch(&mut self, mut block: Block) -> Result<(), ReadError> {
        let main = mem::take(&mut block.main);
        let count = block.main_count;
        self.previous = block;

        if main.is_empty() {
            return Ok(());
        }
        self.dispatch(main, count);
        self.results.drain_ready()
    }

    /// Forces out the open leading fragment held in the retained block by
    /// stitching one synthetic newline in front of the scanned region. The
    /// flushed fragment is the true first line of the stream and is
    /// dispatched and counted like any other window.
    fn flush(&mut self, windows: u64) -> Result<(), ReadError> {
        let mut block = stitch(decompose(b"\n"), &self.previous);
        let main = mem::take(&mut block.main);

        if main.is_empty() {
            if windows == 0 && self.pending() {
                return Err(ReadError::Inconsistent("no leading line pending at flush"));
            }
        } else {
            self.dispatch(main, block.main_count);
        }

        if let Mode::LastN { target } = self.mode {
            if self.tally < target {
                return Err(ReadError::EndOfData);
            }
        }
        Ok(())
    }

    fn pending(&self) -> bool {
        match self.mode {
            Mode::LastN { target } => target > 0,
            Mode::Matching { .. } => false,
        }
    }

    fn dispatch(&mut self, main: Vec<u8>, count: u64) {
        let job = match &self.mode {
            Mode::LastN { target } => {
                self.tally += count;
                // Clamp so the cumulative tally never overshoots the
                // request; the final window usually needs fewer lines
                // than it carries, and the flushed fragment may need none.
                let mut lines = count;
                if self.tally > *target {
                    lines = count.saturating_sub(self.tally - *target);
                }
                Job::LastN(lines)
            }
            Mode::Matching { needle } => Job::Matching(Arc::clone(needle)),
        };

        let index = self.dispatch_index;
        self.dispatch_index += 1;

        let tx = self.tx.clone();
        rayon::spawn(move || {
            let mut extractor = FastExtractor::new(&main);
            let extracted = match job {
                Job::LastN(n) => extractor.last_n(n),
                Job::Matching(needle) => extractor.matching(&needle),
            };
            // The scan loop may already have failed and dropped the
            // receiver; the result is abandoned, not the worker killed.
            let _ = tx.send((index, extracted));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Seek, SeekFrom};

    fn stream(input: &str) -> Cursor<Vec<u8>> {
        let mut cursor = Cursor::new(input.as_bytes().to_vec());
        cursor.seek(SeekFrom::End(0)).unwrap();
        cursor
    }

    #[test]
    fn last_lines_across_window_boundaries() {
        let mut input = stream("123\n456\n789\n");
        let out = last_n_lines(&mut input, 3, 4).unwrap();
        assert_eq!(out, Bytes::from_static(b"789\n456\n123\n"));
    }

    #[test]
    fn byte_sized_windows_reproduce_large_window_output() {
        let mut input = stream("abc\ndef\nghi\n");
        let out = last_n_lines(&mut input, 3, 1).unwrap();
        assert_eq!(out, Bytes::from_static(b"ghi\ndef\nabc\n"));
    }

    #[test]
    fn filter_spans_window_boundaries() {
        let mut input = stream("aob\ncde\nfog\n");
        let out = lines_matching(&mut input, "o", 2).unwrap();
        assert_eq!(out, Bytes::from_static(b"fog\naob\n"));
    }

    #[test]
    fn zero_lines_is_empty_success() {
        let mut input = stream("abc\ndef\n");
        assert_eq!(last_n_lines(&mut input, 0, 4).unwrap(), Bytes::new());
    }

    #[test]
    fn overrequest_fails_without_partial_output() {
        let mut input = stream("abc\ndef\n");
        let err = last_n_lines(&mut input, 5, 4).unwrap_err();
        assert!(matches!(err, ReadError::EndOfData));
    }

    #[test]
    fn empty_stream_with_pending_lines_is_inconsistent() {
        let mut input = stream("");
        let err = last_n_lines(&mut input, 2, 4).unwrap_err();
        assert!(matches!(err, ReadError::Inconsistent(_)));
    }

    #[test]
    fn empty_stream_filter_is_empty_success() {
        let mut input = stream("");
        assert_eq!(lines_matching(&mut input, "x", 4).unwrap(), Bytes::new());
    }

    #[test]
    fn unterminated_tail_is_not_a_line() {
        let mut input = stream("123\n456");
        let out = last_n_lines(&mut input, 1, 4).unwrap();
        assert_eq!(out, Bytes::from_static(b"123\n"));
    }

    #[test]
    fn early_exit_does_not_overshoot() {
        let mut input = stream("a\nb\nc\nd\ne\n");
        let out = last_n_lines(&mut input, 2, 4).unwrap();
        assert_eq!(out, Bytes::from_static(b"e\nd\n"));
    }

    #[test]
    fn filter_without_matches_is_empty() {
        let mut input = stream("abc\ndef\n");
        assert_eq!(lines_matching(&mut input, "zz", 3).unwrap(), Bytes::new());
    }
}
