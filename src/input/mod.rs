//! Raw pointer input and its vsync-aligned delivery.

use std::str::FromStr;
use std::time::Duration;

use anyhow::bail;
use glam::DVec2;
use serde::Serialize;

pub mod history;
pub mod pipeline;
pub mod resample;


pub use self::history::HistoryBuffer;
pub use self::pipeline::DispatchPipeline;
pub use self::resample::{ResampleOptions, Resampler};

/// Device class that produced a pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTool {
    Finger,
    Pen,
    Mouse,
    Touchpad,
    Unknown,
}

impl SourceTool {
    pub const COUNT: usize = 5;

    pub const ALL: [SourceTool; Self::COUNT] = [
        SourceTool::Finger,
        SourceTool::Pen,
        SourceTool::Mouse,
        SourceTool::Touchpad,
        SourceTool::Unknown,
    ];

    /// Dense index for tool-keyed tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for SourceTool {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finger" => Ok(Self::Finger),
            "pen" => Ok(Self::Pen),
            "mouse" => Ok(Self::Mouse),
            "touchpad" => Ok(Self::Touchpad),
            "unknown" => Ok(Self::Unknown),
            _ => bail!("invalid source tool: {s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TouchPhase {
    Down,
    Move,
    Up,
    Cancel,
}

impl TouchPhase {
    /// Whether this phase ends the pointer's lifetime.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }
}

impl FromStr for TouchPhase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "down" => Ok(Self::Down),
            "move" => Ok(Self::Move),
            "up" => Ok(Self::Up),
            "cancel" => Ok(Self::Cancel),
            _ => bail!("invalid touch phase: {s}"),
        }
    }
}

/// One raw pointer reading as it arrives from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub pointer_id: i32,
    pub tool: SourceTool,
    /// Position in device pixels.
    pub pos: DVec2,
    /// Monotonic timestamp.
    pub timestamp: Duration,
    pub phase: TouchPhase,
    pub pressure: Option<f64>,
    pub tilt: Option<DVec2>,
}

impl PointerSample {
    pub fn new(
        pointer_id: i32,
        tool: SourceTool,
        phase: TouchPhase,
        pos: DVec2,
        timestamp: Duration,
    ) -> Self {
        Self {
            pointer_id,
            tool,
            pos,
            timestamp,
            phase,
            pressure: None,
            tilt: None,
        }
    }
}

/// How a delivered position was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleStrategy {
    /// Between two samples bracketing the target time.
    Interpolated,
    /// Past the newest sample, from the velocity of the last two.
    Extrapolated,
    /// A raw sample delivered as is.
    PassThrough,
}

/// The single event delivered for a pointer on a vsync tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampledEvent {
    pub pointer_id: i32,
    pub tool: SourceTool,
    pub pos: DVec2,
    pub timestamp: Duration,
    pub phase: TouchPhase,
    pub pressure: Option<f64>,
    pub tilt: Option<DVec2>,
    pub strategy: ResampleStrategy,
}

impl ResampledEvent {
    /// Delivers `sample` unchanged.
    pub fn pass_through(sample: &PointerSample) -> Self {
        Self {
            pointer_id: sample.pointer_id,
            tool: sample.tool,
            pos: sample.pos,
            timestamp: sample.timestamp,
            phase: sample.phase,
            pressure: sample.pressure,
            tilt: sample.tilt,
            strategy: ResampleStrategy::PassThrough,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxisPhase {
    Begin,
    Update,
    End,
}

/// A scroll-like axis event from a mouse wheel or touchpad.
///
/// Mouse wheel deltas are in degrees of wheel rotation, touchpad deltas are in virtual
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEvent {
    pub tool: SourceTool,
    pub phase: AxisPhase,
    pub delta: DVec2,
    pub timestamp: Duration,
    /// Shift held; turns a vertical wheel into a horizontal one.
    pub shift: bool,
}
