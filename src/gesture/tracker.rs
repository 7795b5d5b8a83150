use std::collections::VecDeque;
use std::time::Duration;

use glam::DVec2;

const HISTORY_LIMIT: Duration = Duration::from_millis(150);

/// Tracks a gesture offset over time to estimate its velocity.
#[derive(Debug, Default)]
pub struct VelocityTracker {
    history: VecDeque<Event>,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    pos: DVec2,
    timestamp: Duration,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
        }
    }

    /// Pushes a new reading into the tracker.
    pub fn push(&mut self, pos: DVec2, timestamp: Duration) {
        if let Some(last) = self.history.back() {
            if timestamp < last.timestamp {
                trace!(
                    "ignoring event with timestamp {timestamp:?} earlier than last {:?}",
                    last.timestamp
                );
                return;
            }
        }

        self.history.push_back(Event { pos, timestamp });
        self.trim_history();
    }

    /// Velocity in pixels per second over the retained history.
    pub fn velocity(&self) -> DVec2 {
        let (Some(first), Some(last)) = (self.history.front(), self.history.back()) else {
            return DVec2::ZERO;
        };

        let total_time = (last.timestamp - first.timestamp).as_secs_f64();
        if total_time == 0. {
            return DVec2::ZERO;
        }

        (last.pos - first.pos) / total_time
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn trim_history(&mut self) {
        let Some(&Event { timestamp, .. }) = self.history.back() else {
            return;
        };

        while let Some(first) = self.history.front() {
            if timestamp <= first.timestamp + HISTORY_LIMIT {
                break;
            }

            let _ = self.history.pop_front();
        }
    }
}
