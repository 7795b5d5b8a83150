//! Pan gesture recognizer.
//!
//! A pan waits for its required number of fingers, then averages their displacement from
//! where each went down. Once the average travels far enough in an allowed direction the
//! pan is accepted; movement along an axis it doesn't allow rejects it.

use std::time::Duration;

use glam::DVec2;

use super::listeners::{ListenerId, Listeners};
use super::tracker::VelocityTracker;
use super::{DistanceMap, GestureDisposal, PanDirection, Recognizer, RefereeState};
use crate::input::{AxisEvent, AxisPhase, ResampledEvent, SourceTool, TouchPhase};

pub const MAX_FINGERS: i32 = 10;
const DEFAULT_FINGERS: i32 = 1;

/// Virtual pixels of travel per degree of mouse wheel rotation: 40 per 15° notch.
const MOUSE_WHEEL_VP_PER_DEGREE: f64 = 40. / 15.;

/// Outcome of checking the averaged displacement against the direction and distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptResult {
    Accept,
    Detecting,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanEventKind {
    Start,
    Update,
    End,
    Cancel,
}

/// Payload of pan listener callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanGestureEvent {
    /// Averaged displacement since the fingers went down.
    pub offset: DVec2,
    /// Change of `offset` since the previous event.
    pub delta: DVec2,
    /// Velocity of `offset` in pixels per second.
    pub velocity: DVec2,
    pub finger_count: usize,
    pub tool: SourceTool,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, Copy)]
struct TouchPoint {
    id: i32,
    start: DVec2,
    current: DVec2,
}

#[derive(Debug)]
pub struct PanRecognizer {
    fingers: usize,
    direction: PanDirection,
    distances: DistanceMap,
    state: RefereeState,
    /// Fingers counted toward the pan, in the order they went down.
    touches: Vec<TouchPoint>,
    /// Fingers down beyond the required count.
    passengers: Vec<i32>,
    /// An axis gesture is in progress.
    axis_active: bool,
    tool: SourceTool,
    offset: DVec2,
    /// Offset at the last listener event.
    reported_offset: DVec2,
    timestamp: Duration,
    tracker: VelocityTracker,
    /// Start went out to listeners.
    started: bool,
    listeners: Listeners<PanEventKind, PanGestureEvent>,
}

impl PanRecognizer {
    /// Creates a pan recognizer.
    ///
    /// `fingers` outside of `1..=10` becomes 1.
    pub fn new(fingers: i32, direction: PanDirection, distances: DistanceMap) -> Self {
        let fingers = if (1..=MAX_FINGERS).contains(&fingers) {
            fingers
        } else {
            debug!("invalid pan finger count {fingers}, using {DEFAULT_FINGERS}");
            DEFAULT_FINGERS
        };

        Self {
            fingers: fingers as usize,
            direction,
            distances,
            state: RefereeState::Ready,
            touches: Vec::new(),
            passengers: Vec::new(),
            axis_active: false,
            tool: SourceTool::Unknown,
            offset: DVec2::ZERO,
            reported_offset: DVec2::ZERO,
            timestamp: Duration::ZERO,
            tracker: VelocityTracker::new(),
            started: false,
            listeners: Listeners::new(),
        }
    }

    /// Creates a pan recognizer with one distance for every tool.
    pub fn with_distance(fingers: i32, direction: PanDirection, distance: f64) -> Self {
        Self::new(fingers, direction, DistanceMap::uniform(distance, 1.))
    }

    pub fn fingers(&self) -> usize {
        self.fingers
    }

    pub fn direction(&self) -> PanDirection {
        self.direction
    }

    pub fn distances(&self) -> &DistanceMap {
        &self.distances
    }

    /// Averaged displacement of the required fingers.
    pub fn offset(&self) -> DVec2 {
        self.offset
    }

    pub fn listen(
        &mut self,
        kind: PanEventKind,
        callback: impl FnMut(&PanGestureEvent) + 'static,
    ) -> ListenerId {
        self.listeners.add(kind, callback)
    }

    pub fn unlisten(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Checks the averaged displacement against the direction and the distance for the
    /// current tool.
    pub fn is_pan_gesture_accept(&self) -> AcceptResult {
        let distance = self.distances.get(self.tool);
        let offset = self.offset;

        if self.direction == PanDirection::ALL {
            return self.judge(offset.length(), distance);
        }

        if offset.x.abs() > offset.y.abs() {
            if !self.direction.allows_horizontal() {
                return self.off_axis(offset.x.abs(), distance);
            }

            let result = self.judge(offset.x.abs(), distance);
            if result == AcceptResult::Accept
                && ((offset.x < 0. && !self.direction.contains(PanDirection::LEFT))
                    || (offset.x > 0. && !self.direction.contains(PanDirection::RIGHT)))
            {
                return AcceptResult::Reject;
            }
            result
        } else {
            if !self.direction.allows_vertical() {
                return self.off_axis(offset.y.abs(), distance);
            }

            let result = self.judge(offset.y.abs(), distance);
            if result == AcceptResult::Accept
                && ((offset.y < 0. && !self.direction.contains(PanDirection::UP))
                    || (offset.y > 0. && !self.direction.contains(PanDirection::DOWN)))
            {
                return AcceptResult::Reject;
            }
            result
        }
    }

    fn judge(&self, magnitude: f64, distance: f64) -> AcceptResult {
        if magnitude < distance || magnitude == 0. {
            AcceptResult::Detecting
        } else {
            AcceptResult::Accept
        }
    }

    /// Movement along an axis the pan doesn't allow. Tolerated up to the pan distance.
    fn off_axis(&self, magnitude: f64, distance: f64) -> AcceptResult {
        if distance > 0. && magnitude > distance {
            AcceptResult::Reject
        } else {
            AcceptResult::Detecting
        }
    }

    fn update_offset(&mut self) {
        if self.axis_active {
            return;
        }

        let sum: DVec2 = self.touches.iter().map(|t| t.current - t.start).sum();
        self.offset = sum / self.fingers as f64;
    }

    /// Evaluates after a displacement change, or reports progress once accepted.
    fn after_motion(&mut self) -> Option<GestureDisposal> {
        self.tracker.push(self.offset, self.timestamp);

        match self.state {
            RefereeState::Detecting => match self.is_pan_gesture_accept() {
                AcceptResult::Accept => {
                    trace!("pan accepted at offset {:?}", self.offset);
                    self.state = RefereeState::Succeed;
                    Some(GestureDisposal::Accept)
                }
                AcceptResult::Reject => {
                    trace!("pan rejected at offset {:?}", self.offset);
                    self.state = RefereeState::Fail;
                    Some(GestureDisposal::Reject)
                }
                AcceptResult::Detecting => None,
            },
            RefereeState::Succeed if self.started => {
                self.emit(PanEventKind::Update);
                None
            }
            _ => None,
        }
    }

    fn emit(&mut self, kind: PanEventKind) {
        let event = PanGestureEvent {
            offset: self.offset,
            delta: self.offset - self.reported_offset,
            velocity: self.tracker.velocity(),
            finger_count: if self.axis_active { 1 } else { self.touches.len() },
            tool: self.tool,
            timestamp: self.timestamp,
        };
        self.reported_offset = self.offset;
        self.listeners.emit(kind, &event);
    }

    fn is_tracking(&self) -> bool {
        self.axis_active || !self.touches.is_empty() || !self.passengers.is_empty()
    }

    fn on_down(&mut self, event: &ResampledEvent) -> Option<GestureDisposal> {
        if !self.is_tracking() && self.state != RefereeState::Ready {
            self.reset();
        }

        if self.axis_active
            || self.state != RefereeState::Ready
            || self.touches.len() >= self.fingers
        {
            self.passengers.push(event.pointer_id);
            return None;
        }

        self.tool = event.tool;
        self.touches.push(TouchPoint {
            id: event.pointer_id,
            start: event.pos,
            current: event.pos,
        });

        if self.touches.len() == self.fingers {
            trace!("pan has all {} fingers down, detecting", self.fingers);
            self.state = RefereeState::Detecting;
            self.update_offset();
            self.reported_offset = self.offset;
            self.tracker.clear();
            self.tracker.push(self.offset, self.timestamp);
        }

        None
    }

    fn on_move(&mut self, event: &ResampledEvent) -> Option<GestureDisposal> {
        let touch = self.touches.iter_mut().find(|t| t.id == event.pointer_id)?;
        touch.current = event.pos;

        self.tool = event.tool;
        self.update_offset();
        self.after_motion()
    }

    fn on_up(&mut self, event: &ResampledEvent) -> Option<GestureDisposal> {
        let id = event.pointer_id;
        if let Some(idx) = self.passengers.iter().position(|&p| p == id) {
            self.passengers.remove(idx);
            self.end_session_if_idle();
            return None;
        }

        let idx = self.touches.iter().position(|t| t.id == id)?;
        self.touches[idx].current = event.pos;
        self.update_offset();

        let was_full = self.touches.len() == self.fingers;
        self.touches.remove(idx);

        let disposal = match self.state {
            RefereeState::Ready | RefereeState::Detecting => {
                trace!("pan lost finger {id} before deciding");
                self.state = RefereeState::Fail;
                Some(GestureDisposal::Reject)
            }
            RefereeState::Succeed if self.started && was_full => {
                self.emit(PanEventKind::End);
                self.started = false;
                None
            }
            _ => None,
        };

        self.end_session_if_idle();
        disposal
    }

    fn on_cancel(&mut self) -> Option<GestureDisposal> {
        let disposal = match self.state {
            RefereeState::Ready | RefereeState::Detecting if self.is_tracking() => {
                Some(GestureDisposal::Reject)
            }
            RefereeState::Succeed => {
                if self.started {
                    self.emit(PanEventKind::Cancel);
                }
                None
            }
            _ => None,
        };

        self.reset();
        disposal
    }

    fn end_session_if_idle(&mut self) {
        if !self.is_tracking() {
            trace!("pan session over");
            self.reset();
        }
    }

    fn axis_delta(&self, event: &AxisEvent) -> DVec2 {
        let density = self.distances.density();
        let delta = match event.tool {
            SourceTool::Mouse => {
                let mut degrees = event.delta;
                if event.shift && degrees.x == 0. {
                    degrees = DVec2::new(degrees.y, 0.);
                }
                degrees * MOUSE_WHEEL_VP_PER_DEGREE * density
            }
            _ => event.delta * density,
        };

        // Scrolling down moves content up.
        -delta
    }

    fn on_axis_begin(&mut self, event: &AxisEvent) -> Option<GestureDisposal> {
        if self.fingers != 1 {
            trace!("axis pan can't satisfy a {}-finger recognizer", self.fingers);
            return Some(GestureDisposal::Reject);
        }
        if !self.touches.is_empty() || !self.passengers.is_empty() {
            return None;
        }

        self.reset();
        self.axis_active = true;
        self.tool = event.tool;
        self.state = RefereeState::Detecting;
        self.tracker.push(DVec2::ZERO, event.timestamp);
        None
    }

    fn on_axis_update(&mut self, event: &AxisEvent) -> Option<GestureDisposal> {
        if !self.axis_active {
            return None;
        }

        self.offset += self.axis_delta(event);
        self.after_motion()
    }

    fn on_axis_end(&mut self) -> Option<GestureDisposal> {
        if !self.axis_active {
            return None;
        }

        let disposal = match self.state {
            RefereeState::Detecting => {
                self.state = RefereeState::Fail;
                Some(GestureDisposal::Reject)
            }
            RefereeState::Succeed if self.started => {
                self.emit(PanEventKind::End);
                None
            }
            _ => None,
        };

        self.reset();
        disposal
    }
}

impl Recognizer for PanRecognizer {
    fn handle_event(&mut self, event: &ResampledEvent) -> Option<GestureDisposal> {
        self.timestamp = event.timestamp;

        match event.phase {
            TouchPhase::Down => self.on_down(event),
            TouchPhase::Move => self.on_move(event),
            TouchPhase::Up => self.on_up(event),
            TouchPhase::Cancel => self.on_cancel(),
        }
    }

    fn handle_axis(&mut self, event: &AxisEvent) -> Option<GestureDisposal> {
        self.timestamp = event.timestamp;

        match event.phase {
            AxisPhase::Begin => self.on_axis_begin(event),
            AxisPhase::Update => self.on_axis_update(event),
            AxisPhase::End => self.on_axis_end(),
        }
    }

    fn on_accepted(&mut self) {
        if self.state != RefereeState::Succeed || self.started {
            return;
        }

        self.started = true;
        self.emit(PanEventKind::Start);
    }

    fn on_rejected(&mut self) {
        if !self.is_tracking() {
            return;
        }

        if self.started {
            self.emit(PanEventKind::Cancel);
            self.started = false;
        }
        self.state = RefereeState::Fail;
    }

    fn state(&self) -> RefereeState {
        self.state
    }

    fn reset(&mut self) {
        self.state = RefereeState::Ready;
        self.touches.clear();
        self.passengers.clear();
        self.axis_active = false;
        self.offset = DVec2::ZERO;
        self.reported_offset = DVec2::ZERO;
        self.tracker.clear();
        self.started = false;
    }
}
