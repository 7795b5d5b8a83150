//! Per-pointer sample history.

use std::collections::VecDeque;
use std::time::Duration;

use super::PointerSample;

/// Default retention window, relative to the newest sample.
pub const HISTORY_LIMIT: Duration = Duration::from_millis(150);

/// Recent samples of one pointer, oldest first.
///
/// Timestamps never decrease: a sample older than the newest one is clamped to the newest
/// timestamp on push.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<PointerSample>,
    limit: Duration,
}

impl HistoryBuffer {
    pub fn new(limit: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            limit,
        }
    }

    pub fn push(&mut self, mut sample: PointerSample) {
        if let Some(last) = self.samples.back() {
            if sample.timestamp < last.timestamp {
                trace!(
                    "clamping pointer {} sample timestamp {:?} to last {:?}",
                    sample.pointer_id,
                    sample.timestamp,
                    last.timestamp
                );
                sample.timestamp = last.timestamp;
            }
        }

        self.samples.push_back(sample);
        self.trim_history();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn newest(&self) -> Option<&PointerSample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&PointerSample> {
        self.samples.front()
    }

    pub fn get(&self, idx: usize) -> Option<&PointerSample> {
        self.samples.get(idx)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PointerSample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Drops samples that can no longer take part in resampling for targets at or after
    /// `target`.
    ///
    /// The newest sample at or before `target` stays as the lower interpolation bound, along
    /// with the one before it for the velocity estimate.
    pub fn prune(&mut self, target: Duration) {
        let Some(lower) = self.samples.iter().rposition(|s| s.timestamp <= target) else {
            return;
        };

        let drop = lower.saturating_sub(1);
        self.samples.drain(..drop);
    }

    fn trim_history(&mut self) {
        let Some(&PointerSample { timestamp, .. }) = self.samples.back() else {
            return;
        };

        // Two samples are always kept for the velocity estimate.
        while self.samples.len() > 2 {
            let Some(first) = self.samples.front() else {
                break;
            };
            if timestamp <= first.timestamp + self.limit {
                break;
            }

            let _ = self.samples.pop_front();
        }
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}
