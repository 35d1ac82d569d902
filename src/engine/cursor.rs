//! Position tracking over a dataset

use crate::reporter::StreamPosition;
use crate::source::{Dataset, Sample};

/// One sample to send, with where it sits in the dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorStep {
    pub value: Sample,
    pub position: StreamPosition,
    /// Last sample of its beat
    pub ends_beat: bool,
    /// Last sample of the whole dataset
    pub ends_dataset: bool,
}

/// Walks a dataset beat by beat, optionally wrapping at the end.
///
/// With wrapping on, the `k`-th step yields sample `k mod N` of the
/// flattened dataset.
#[derive(Debug, Clone, Default)]
pub struct StreamCursor {
    tick: u64,
    wrap: bool,
}

impl StreamCursor {
    pub fn new(wrap: bool) -> Self {
        Self { tick: 0, wrap }
    }

    /// Steps taken so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn next_step(&mut self, dataset: &Dataset) -> Option<CursorStep> {
        let total = dataset.sample_count() as u64;
        if total == 0 || (!self.wrap && self.tick >= total) {
            return None;
        }

        let (beat, sample) = dataset.position_at(self.tick);
        let flat = self.tick % total;
        let step = CursorStep {
            value: dataset.sample_at(self.tick),
            position: StreamPosition {
                tick: self.tick,
                beat,
                sample,
            },
            ends_beat: sample + 1 == dataset.beat_len(),
            ends_dataset: flat + 1 == total,
        };

        self.tick += 1;
        Some(step)
    }
}
