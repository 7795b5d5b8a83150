//! Replaying recorded pointer traces.
//!
//! A trace is line based. Blank lines and `#` comments are skipped.
//!
//! ```text
//! sample <t_ns> <pointer_id> <tool> <phase> <x> <y> [pressure]
//! vsync <t_ns> [accelerate]
//! ```

use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, ensure, Context};
use glam::DVec2;
use serde::Serialize;

use crate::gesture::{
    DistanceMap, GestureReferee, PanDirection, PanRecognizer, RecognizerId, RefereeState,
};
use crate::input::{
    DispatchPipeline, PointerSample, ResampleStrategy, ResampledEvent, SourceTool, TouchPhase,
};
use crate::utils::duration_to_nanos;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceRecord {
    Sample(PointerSample),
    Vsync { timestamp: Duration, accelerate: bool },
}

pub fn parse_trace(text: &str) -> anyhow::Result<Vec<TraceRecord>> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let record = parse_line(line).with_context(|| format!("error parsing line {}", idx + 1))?;
        records.extend(record);
    }
    Ok(records)
}

pub fn parse_line(line: &str) -> anyhow::Result<Option<TraceRecord>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let mut next = |name: &str| {
        fields
            .next()
            .with_context(|| format!("missing {name}"))
    };

    let kind = next("record kind")?;
    let record = match kind {
        "sample" => {
            let timestamp = parse_nanos(next("timestamp")?)?;
            let pointer_id = next("pointer id")?
                .parse::<i32>()
                .context("invalid pointer id")?;
            let tool = next("tool")?.parse::<SourceTool>()?;
            let phase = next("phase")?.parse::<TouchPhase>()?;
            let x = next("x")?.parse::<f64>().context("invalid x")?;
            let y = next("y")?.parse::<f64>().context("invalid y")?;

            let mut sample =
                PointerSample::new(pointer_id, tool, phase, DVec2::new(x, y), timestamp);
            if let Some(pressure) = fields.next() {
                sample.pressure = Some(pressure.parse::<f64>().context("invalid pressure")?);
            }
            TraceRecord::Sample(sample)
        }
        "vsync" => {
            let timestamp = parse_nanos(next("timestamp")?)?;
            let accelerate = match fields.next() {
                None => false,
                Some("accelerate") => true,
                Some(other) => bail!("unexpected vsync flag: {other}"),
            };
            TraceRecord::Vsync {
                timestamp,
                accelerate,
            }
        }
        other => bail!("unknown record kind: {other}"),
    };

    if let Some(extra) = fields.next() {
        bail!("unexpected trailing field: {extra}");
    }

    Ok(Some(record))
}

fn parse_nanos(s: &str) -> anyhow::Result<Duration> {
    let nanos = s.parse::<u64>().context("invalid timestamp")?;
    Ok(Duration::from_nanos(nanos))
}

/// Pan recognizer settings given as `FINGERS:DIRECTION:DISTANCE`, e.g. `2:vertical:10`.
///
/// A negative distance uses the per-tool defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanSpec {
    pub fingers: i32,
    pub direction: PanDirection,
    pub distance: f64,
}

impl FromStr for PanSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.split(':').collect();
        ensure!(
            parts.len() == 3,
            "expected FINGERS:DIRECTION:DISTANCE, got {s}"
        );

        Ok(Self {
            fingers: parts[0].parse().context("invalid finger count")?,
            direction: parts[1].parse()?,
            distance: parts[2].parse().context("invalid distance")?,
        })
    }
}

/// One line of replay output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Output {
    Event {
        pointer_id: i32,
        tool: SourceTool,
        phase: TouchPhase,
        x: f64,
        y: f64,
        timestamp_ns: u64,
        strategy: ResampleStrategy,
    },
    Pan {
        state: RefereeState,
        timestamp_ns: u64,
    },
}

impl From<&ResampledEvent> for Output {
    fn from(event: &ResampledEvent) -> Self {
        Output::Event {
            pointer_id: event.pointer_id,
            tool: event.tool,
            phase: event.phase,
            x: event.pos.x,
            y: event.pos.y,
            timestamp_ns: duration_to_nanos(event.timestamp),
            strategy: event.strategy,
        }
    }
}

/// Drives a pipeline, and optionally a pan recognizer, from trace records.
#[derive(Debug)]
pub struct Replay {
    pipeline: DispatchPipeline,
    accelerate: bool,
    referee: GestureReferee,
    pan: Option<RecognizerId>,
    pan_state: RefereeState,
}

impl Replay {
    pub fn new(pipeline: DispatchPipeline, accelerate: bool) -> Self {
        Self {
            pipeline,
            accelerate,
            referee: GestureReferee::new(),
            pan: None,
            pan_state: RefereeState::Ready,
        }
    }

    /// Also feeds delivered events to a pan recognizer and reports its state changes.
    pub fn with_pan(mut self, spec: PanSpec, density: f64) -> Self {
        let distances = if spec.distance >= 0. {
            DistanceMap::uniform(spec.distance, density)
        } else {
            DistanceMap::with_density(density)
        };
        let pan = PanRecognizer::new(spec.fingers, spec.direction, distances);
        self.pan = Some(self.referee.add(pan));
        self
    }

    pub fn step(&mut self, record: &TraceRecord) -> Vec<Output> {
        let (timestamp, accelerate) = match *record {
            TraceRecord::Sample(sample) => {
                self.pipeline.ingest(sample);
                return Vec::new();
            }
            TraceRecord::Vsync {
                timestamp,
                accelerate,
            } => (timestamp, accelerate),
        };

        let events = self
            .pipeline
            .on_vsync(timestamp, self.accelerate || accelerate);

        let mut output = Vec::with_capacity(events.len());
        for event in &events {
            output.push(Output::from(event));
            output.extend(self.feed_pan(event));
        }
        output
    }

    pub fn run(&mut self, records: &[TraceRecord], out: &mut impl Write) -> anyhow::Result<()> {
        for record in records {
            for output in self.step(record) {
                serde_json::to_writer(&mut *out, &output).context("error serializing output")?;
                writeln!(out).context("error writing output")?;
            }
        }
        Ok(())
    }

    fn feed_pan(&mut self, event: &ResampledEvent) -> Option<Output> {
        let pan = self.pan?;

        if event.phase == TouchPhase::Down {
            self.referee.add_member(event.pointer_id, pan);
        }
        self.referee.dispatch(event);

        let state = self.referee.state(pan)?;
        if state == self.pan_state {
            return None;
        }

        self.pan_state = state;
        Some(Output::Pan {
            state,
            timestamp_ns: duration_to_nanos(event.timestamp),
        })
    }
}
