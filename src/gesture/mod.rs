//! Gesture recognition on top of delivered pointer events.

use serde::Serialize;

use crate::input::{AxisEvent, ResampledEvent};

pub mod direction;
pub mod distance_map;
pub mod listeners;
pub mod pan;
pub mod referee;
pub mod tracker;


pub use self::direction::PanDirection;
pub use self::distance_map::DistanceMap;
pub use self::pan::PanRecognizer;
pub use self::referee::{GestureReferee, RecognizerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefereeState {
    #[default]
    Ready,
    Detecting,
    Succeed,
    Fail,
}

/// What a recognizer reports to the referee about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureDisposal {
    Accept,
    Reject,
}

/// A gesture recognizer that competes with others over the same touches.
pub trait Recognizer {
    /// Feeds a delivered pointer event, returning a disposal when the recognizer decides.
    fn handle_event(&mut self, event: &ResampledEvent) -> Option<GestureDisposal>;

    /// Feeds an axis event.
    fn handle_axis(&mut self, event: &AxisEvent) -> Option<GestureDisposal> {
        let _ = event;
        None
    }

    /// The referee picked this recognizer.
    fn on_accepted(&mut self);

    /// The referee ruled this recognizer out.
    fn on_rejected(&mut self);

    fn state(&self) -> RefereeState;

    /// Drops all per-session state, returning to [`RefereeState::Ready`].
    fn reset(&mut self);
}
