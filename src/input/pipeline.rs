//! Buffered pointer delivery driven by vsync.

use std::collections::BTreeMap;
use std::time::Duration;

use touchflow_config::Config;

use super::{
    HistoryBuffer, PointerSample, ResampleOptions, ResampleStrategy, ResampledEvent, Resampler,
    TouchPhase,
};

/// More samples than this between two vsyncs usually means a stalled frame.
///
/// A 140 Hz touch panel with ten fingers at a 30 Hz refresh rate stays below it.
const TOO_MANY_SAMPLES_PER_VSYNC: usize = 40;

#[derive(Debug)]
struct PointerTrack {
    history: HistoryBuffer,
    /// Down sample not yet delivered.
    down: Option<PointerSample>,
    /// Newest Move ingested since the last delivery.
    pending_move: Option<PointerSample>,
    /// Up or Cancel sample that ends this pointer.
    end: Option<PointerSample>,
    last_delivered: Option<ResampledEvent>,
    /// Contact that reused this pointer id before our end was delivered.
    successor: Option<Box<PointerTrack>>,
}

impl PointerTrack {
    fn new(down: PointerSample, history_limit: Duration) -> Self {
        let mut history = HistoryBuffer::new(history_limit);
        history.push(down);
        Self {
            history,
            down: Some(down),
            pending_move: None,
            end: None,
            last_delivered: None,
            successor: None,
        }
    }

    fn ingest(&mut self, sample: PointerSample, history_limit: Duration) {
        let id = sample.pointer_id;

        if self.end.is_some() {
            if let Some(successor) = self.successor.as_deref_mut() {
                successor.ingest(sample, history_limit);
            } else if sample.phase == TouchPhase::Down {
                debug!("pointer {id} went down again before its end was delivered");
                self.successor = Some(Box::new(Self::new(sample, history_limit)));
            } else {
                trace!("ignoring {:?} for pointer {id} after it ended", sample.phase);
            }
            return;
        }

        match sample.phase {
            TouchPhase::Down => {
                debug!("pointer {id} went down again, restarting its history");
                *self = Self::new(sample, history_limit);
            }
            TouchPhase::Move => {
                self.history.push(sample);
                self.pending_move = self.history.newest().copied();
            }
            TouchPhase::Up => {
                self.history.push(sample);
                self.end = self.history.newest().copied();
            }
            TouchPhase::Cancel => {
                let mut sample = sample;
                if let Some(newest) = self.history.newest() {
                    sample.timestamp = sample.timestamp.max(newest.timestamp);
                }
                self.end = Some(sample);
            }
        }
    }

    /// Pass-through of `sample` that doesn't go back in time.
    fn pass_through(&self, sample: &PointerSample) -> ResampledEvent {
        let min_timestamp = self.last_delivered.map_or(Duration::ZERO, |e| e.timestamp);

        let mut event = ResampledEvent::pass_through(sample);
        event.timestamp = event.timestamp.max(min_timestamp);
        event
    }

    /// Produces this tick's event. The second value is whether the pointer stays alive.
    fn flush(
        &mut self,
        resampler: &Resampler,
        target: Duration,
        accelerate: bool,
    ) -> (Option<ResampledEvent>, bool) {
        if let Some(down) = self.down.take() {
            let event = ResampledEvent::pass_through(&down);
            self.last_delivered = Some(event);
            return (Some(event), true);
        }

        if let Some(end) = self.end {
            if end.phase == TouchPhase::Up {
                // Motion that arrived together with the Up goes out on its own tick first.
                if let Some(last_move) = self.pending_move.take() {
                    let event = self.pass_through(&last_move);
                    self.last_delivered = Some(event);
                    return (Some(event), true);
                }
            }

            let mut event = self.pass_through(&end);
            if end.phase == TouchPhase::Cancel {
                // Motion leading up to a cancel isn't trusted: repeat what was last delivered.
                if let Some(last) = &self.last_delivered {
                    event.pos = last.pos;
                }
            }

            return (Some(event), false);
        }

        let Some(newest) = self.history.newest().copied() else {
            return (None, true);
        };
        let Some(point) = resampler.resample(&self.history, target, accelerate) else {
            return (None, true);
        };
        self.history.prune(target);
        self.pending_move = None;

        let event = ResampledEvent {
            pointer_id: newest.pointer_id,
            tool: newest.tool,
            pos: point.pos,
            timestamp: point.timestamp,
            phase: TouchPhase::Move,
            pressure: newest.pressure,
            tilt: newest.tilt,
            strategy: point.strategy,
        };
        self.last_delivered = Some(event);
        (Some(event), true)
    }
}

/// Buffers raw samples per pointer and delivers one event per pointer on each vsync.
#[derive(Debug)]
pub struct DispatchPipeline {
    resampler: Resampler,
    /// Keyed by pointer id, which is also the emission order.
    pointers: BTreeMap<i32, PointerTrack>,
    /// Samples ingested since the last vsync.
    pending_samples: usize,
}

impl DispatchPipeline {
    pub fn new(options: ResampleOptions) -> Self {
        Self {
            resampler: Resampler::new(options),
            pointers: BTreeMap::new(),
            pending_samples: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ResampleOptions::from_config(config))
    }

    pub fn options(&self) -> &ResampleOptions {
        self.resampler.options()
    }

    /// Whether `pointer_id` is being tracked.
    pub fn contains(&self, pointer_id: i32) -> bool {
        self.pointers.contains_key(&pointer_id)
    }

    pub fn active_pointers(&self) -> impl Iterator<Item = i32> + '_ {
        self.pointers.keys().copied()
    }

    pub fn history(&self, pointer_id: i32) -> Option<&HistoryBuffer> {
        self.pointers.get(&pointer_id).map(|track| &track.history)
    }

    /// Buffers a raw sample. Nothing is delivered until the next vsync.
    ///
    /// A Down for a pointer whose Up or Cancel is still undelivered starts a new contact
    /// once that end has gone out.
    pub fn ingest(&mut self, sample: PointerSample) {
        self.pending_samples += 1;

        let id = sample.pointer_id;
        let history_limit = self.options().history_limit;

        if let Some(track) = self.pointers.get_mut(&id) {
            track.ingest(sample, history_limit);
        } else if sample.phase == TouchPhase::Down {
            self.pointers.insert(id, PointerTrack::new(sample, history_limit));
        } else {
            trace!("ignoring {:?} for unknown pointer {id}", sample.phase);
        }
    }

    /// Delivers one event for every tracked pointer.
    ///
    /// Pointers whose Up or Cancel has been delivered are forgotten.
    pub fn on_vsync(&mut self, vsync: Duration, accelerate: bool) -> Vec<ResampledEvent> {
        let _span = tracy_client::span!("DispatchPipeline::on_vsync");

        if self.pending_samples >= TOO_MANY_SAMPLES_PER_VSYNC {
            warn!(
                "{} pointer samples arrived within one vsync period",
                self.pending_samples
            );
        }
        self.pending_samples = 0;

        let target = self.resampler.options().target(vsync);
        let resampler = &self.resampler;

        let mut events = Vec::with_capacity(self.pointers.len());
        self.pointers.retain(|id, track| {
            let (event, alive) = track.flush(resampler, target, accelerate);
            if let Some(event) = event {
                if event.strategy != ResampleStrategy::PassThrough {
                    trace!("pointer {id}: {:?} at {:?}", event.strategy, event.pos);
                }
                events.push(event);
            }

            if alive {
                return true;
            }
            match track.successor.take() {
                Some(successor) => {
                    *track = *successor;
                    true
                }
                None => false,
            }
        });

        events
    }

    /// Forgets every pointer without delivering anything.
    pub fn clear(&mut self) {
        self.pointers.clear();
        self.pending_samples = 0;
    }
}

impl Default for DispatchPipeline {
    fn default() -> Self {
        Self::new(ResampleOptions::default())
    }
}
