use bytes::Bytes;
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::ReadError;

/// One window worker's output: the dispatch index it was keyed with and the
/// extracted span, or the failure that aborts the whole call.
pub type WindowResult = (u64, Result<Bytes, ReadError>);

/// Restores dispatch order across concurrently completed window results.
///
/// Workers complete in any order; the accumulator collects their
/// index-tagged spans and, once the total dispatch count is announced via
/// [`Accumulator::finish`], sorts by index and concatenates. The first
/// error received short-circuits everything: collected results are
/// abandoned and no partial output is ever produced.
pub struct Accumulator {
    rx: Receiver<WindowResult>,
    collected: Vec<(u64, Bytes)>,
}

impl Accumulator {
    pub fn channel() -> (Sender<WindowResult>, Accumulator) {
        let (tx, rx) = unbounded();
        (
            tx,
            Accumulator {
                rx,
                collected: Vec::new(),
            },
        )
    }

    /// Best-effort drain of already-completed results; never blocks.
    pub fn drain_ready(&mut self) -> Result<(), ReadError> {
        while let Ok((index, result)) = self.rx.try_recv() {
            self.collected.push((index, result?));
        }
        Ok(())
    }

    /// Blocks until exactly `expected` results have arrived, then merges
    /// them in dispatch order into one span.
    pub fn finish(mut self, expected: u64) -> Result<Bytes, ReadError> {
        while (self.collected.len() as u64) < expected {
            let (index, result) = self
                .rx
                .recv()
                .map_err(|_| ReadError::Inconsistent("worker lost before reporting"))?;
            self.collected.push((index, result?));
        }

        self.collected.sort_unstable_by_key(|&(index, _)| index);

        let total = self.collected.iter().map(|(_, span)| span.len()).sum();
        let mut merged = Vec::with_capacity(total);
        for (_, span) in &self.collected {
            merged.extend_from_slice(span);
        }
        Ok(merged.into())
    }
}
