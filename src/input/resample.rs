//! Vsync resampling of pointer histories.
//!
//! Devices report at their own rate, usually out of phase with the display. For every frame
//! we deliver one position per pointer at a target time a little behind vsync: interpolated
//! when samples exist on both sides of the target, extrapolated from the last two samples
//! otherwise.

use std::time::Duration;

use glam::DVec2;
use touchflow_config::Config;

use super::{HistoryBuffer, PointerSample, ResampleStrategy};
use crate::utils::ms_to_duration;

/// Upper bound for the accelerate mode extrapolation scale.
const MAX_ACCELERATE_SCALE: f64 = 2.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleOptions {
    /// Deliver the newest raw sample instead of resampling.
    pub off: bool,
    /// Distance of the resample target behind vsync.
    pub compensation: Duration,
    /// Longest extrapolation in normal mode.
    pub max_horizon: Duration,
    /// Longest extrapolation in accelerate mode.
    pub accelerate_max_horizon: Duration,
    /// Scale applied to extrapolated deltas in accelerate mode.
    pub accelerate_scale: f64,
    /// Longest extrapolated jump in normal mode, in pixels.
    pub max_extrapolation: f64,
    /// Retention window of pointer histories.
    pub history_limit: Duration,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ResampleOptions {
    pub fn from_config(config: &Config) -> Self {
        let resample = &config.resample;
        Self {
            off: resample.off,
            compensation: ms_to_duration(resample.compensation_ms.0),
            max_horizon: ms_to_duration(resample.max_horizon_ms.0),
            accelerate_max_horizon: ms_to_duration(resample.accelerate_max_horizon_ms.0),
            accelerate_scale: resample.accelerate_scale.0.clamp(1., MAX_ACCELERATE_SCALE),
            max_extrapolation: resample.max_extrapolation_px.0,
            history_limit: ms_to_duration(resample.history_limit_ms.0),
        }
    }

    /// Resample target for a vsync at `vsync`.
    pub fn target(&self, vsync: Duration) -> Duration {
        vsync.saturating_sub(self.compensation)
    }
}

/// Position produced for one pointer on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampledPoint {
    pub pos: DVec2,
    pub timestamp: Duration,
    pub strategy: ResampleStrategy,
}

impl ResampledPoint {
    fn pass_through(sample: &PointerSample) -> Self {
        Self {
            pos: sample.pos,
            timestamp: sample.timestamp,
            strategy: ResampleStrategy::PassThrough,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resampler {
    options: ResampleOptions,
}

impl Resampler {
    pub fn new(mut options: ResampleOptions) -> Self {
        options.accelerate_scale = options.accelerate_scale.clamp(1., MAX_ACCELERATE_SCALE);
        Self { options }
    }

    pub fn options(&self) -> &ResampleOptions {
        &self.options
    }

    /// Computes the position of the pointer at `target`.
    ///
    /// Returns `None` for an empty history. The result depends only on the history contents,
    /// `target` and `accelerate`.
    pub fn resample(
        &self,
        history: &HistoryBuffer,
        target: Duration,
        accelerate: bool,
    ) -> Option<ResampledPoint> {
        let newest = history.newest()?;

        if self.options.off || history.len() == 1 {
            return Some(ResampledPoint::pass_through(newest));
        }

        match history.iter().position(|s| s.timestamp >= target) {
            Some(idx) => {
                let upper = history.get(idx)?;
                if upper.timestamp == target {
                    return Some(ResampledPoint {
                        pos: upper.pos,
                        timestamp: target,
                        strategy: ResampleStrategy::Interpolated,
                    });
                }

                // The target lies before everything we have.
                let Some(lower) = idx.checked_sub(1).and_then(|idx| history.get(idx)) else {
                    return Some(ResampledPoint::pass_through(upper));
                };

                Some(ResampledPoint {
                    pos: interpolate(lower, upper, target),
                    timestamp: target,
                    strategy: ResampleStrategy::Interpolated,
                })
            }
            None => {
                let prev = history.get(history.len() - 2)?;
                Some(self.extrapolate(prev, newest, target, accelerate))
            }
        }
    }

    fn extrapolate(
        &self,
        prev: &PointerSample,
        last: &PointerSample,
        target: Duration,
        accelerate: bool,
    ) -> ResampledPoint {
        let dt = (last.timestamp - prev.timestamp).as_secs_f64();
        if dt == 0. {
            return ResampledPoint::pass_through(last);
        }

        let velocity = (last.pos - prev.pos) / dt;

        let max_horizon = if accelerate {
            self.options.accelerate_max_horizon
        } else {
            self.options.max_horizon
        };
        let horizon = (target - last.timestamp).min(max_horizon);

        let mut delta = velocity * horizon.as_secs_f64();
        if accelerate {
            delta *= self.options.accelerate_scale;
        } else if delta.length() > self.options.max_extrapolation {
            // Usually jitter between two samples very close in time. Hold the last position.
            return ResampledPoint {
                pos: last.pos,
                timestamp: target,
                strategy: ResampleStrategy::PassThrough,
            };
        }

        ResampledPoint {
            pos: last.pos + delta,
            timestamp: target,
            strategy: ResampleStrategy::Extrapolated,
        }
    }
}

/// Linear interpolation between `lower` and `upper` by time fraction, clamped to the segment.
fn interpolate(lower: &PointerSample, upper: &PointerSample, target: Duration) -> DVec2 {
    let span = upper.timestamp.saturating_sub(lower.timestamp).as_secs_f64();
    if span == 0. {
        return upper.pos;
    }

    let elapsed = target.saturating_sub(lower.timestamp).as_secs_f64();
    let f = (elapsed / span).clamp(0., 1.);
    lower.pos + (upper.pos - lower.pos) * f
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::input::{SourceTool, TouchPhase};

    fn sample(x: f64, y: f64, us: u64) -> PointerSample {
        PointerSample::new(
            0,
            SourceTool::Finger,
            TouchPhase::Move,
            DVec2::new(x, y),
            Duration::from_micros(us),
        )
    }

    fn history(samples: &[PointerSample]) -> HistoryBuffer {
        let mut history = HistoryBuffer::default();
        for s in samples {
            history.push(*s);
        }
        history
    }

    fn us(us: u64) -> Duration {
        Duration::from_micros(us)
    }

    #[test]
    fn interpolates_between_bracketing_samples() {
        let history = history(&[
            sample(100., 200., 1000),
            sample(150., 250., 2000),
            sample(200., 300., 3000),
            sample(250., 350., 4000),
        ]);
        let resampler = Resampler::new(ResampleOptions::default());

        let point = resampler.resample(&history, us(2500), false).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::Interpolated);
        assert_eq!(point.timestamp, us(2500));
        assert_abs_diff_eq!(point.pos.x, 175., epsilon = 1e-9);
        assert_abs_diff_eq!(point.pos.y, 275., epsilon = 1e-9);
    }

    #[test]
    fn uneven_spacing_uses_time_fraction() {
        let history = history(&[sample(1., 1., 1000), sample(2., 2., 3000)]);
        let resampler = Resampler::new(ResampleOptions::default());

        let point = resampler.resample(&history, us(2500), false).unwrap();
        assert_abs_diff_eq!(point.pos.x, 1.75, epsilon = 1e-9);
        assert_abs_diff_eq!(point.pos.y, 1.75, epsilon = 1e-9);
    }

    #[test]
    fn target_on_sample_is_exact() {
        let history = history(&[
            sample(0.1, 0.7, 1000),
            sample(0.3, 1.9, 2000),
            sample(1.7, 2.3, 3000),
        ]);
        let resampler = Resampler::new(ResampleOptions::default());

        for s in history.iter() {
            let point = resampler.resample(&history, s.timestamp, false).unwrap();
            assert_eq!(point.pos, s.pos);
            assert_eq!(point.strategy, ResampleStrategy::Interpolated);
        }
    }

    #[test]
    fn extrapolates_past_newest_sample() {
        let history = history(&[sample(0., 0., 0), sample(10., 20., 4000)]);
        let resampler = Resampler::new(ResampleOptions::default());

        // 2.5 px/ms horizontally, 5 px/ms vertically, 2 ms ahead.
        let point = resampler.resample(&history, us(6000), false).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::Extrapolated);
        assert_abs_diff_eq!(point.pos.x, 15., epsilon = 1e-9);
        assert_abs_diff_eq!(point.pos.y, 30., epsilon = 1e-9);
    }

    #[test]
    fn normal_mode_caps_horizon() {
        let history = history(&[sample(0., 0., 0), sample(10., 0., 10_000)]);
        let resampler = Resampler::new(ResampleOptions::default());

        // 1 px/ms, target 50 ms past the newest sample, capped at 8 ms.
        let point = resampler.resample(&history, us(60_000), false).unwrap();
        assert_abs_diff_eq!(point.pos.x, 18., epsilon = 1e-9);
    }

    #[test]
    fn normal_mode_holds_position_on_large_jumps() {
        // 3 px within 0.1 ms is 30 px/ms, which would put the pointer 147 px ahead.
        let history = history(&[
            sample(0., 0., 0),
            sample(100., 0., 10_000),
            sample(103., 0., 10_100),
        ]);
        let resampler = Resampler::new(ResampleOptions::default());

        let point = resampler.resample(&history, us(15_000), false).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::PassThrough);
        assert_eq!(point.pos, DVec2::new(103., 0.));
        assert_eq!(point.timestamp, us(15_000));

        // Accelerate mode trusts the velocity.
        let point = resampler.resample(&history, us(15_000), true).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::Extrapolated);
        assert_abs_diff_eq!(point.pos.x, 103. + 147. * 1.2, epsilon = 1e-6);
    }

    #[test]
    fn extrapolation_limit_is_configurable() {
        let options = ResampleOptions {
            max_extrapolation: 5.,
            ..ResampleOptions::default()
        };
        let history = history(&[sample(0., 0., 0), sample(10., 0., 10_000)]);

        // 1 px/ms for 4 ms stays within 5 px, 1 px/ms for 6 ms doesn't.
        let resampler = Resampler::new(options);
        let point = resampler.resample(&history, us(14_000), false).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::Extrapolated);
        assert_abs_diff_eq!(point.pos.x, 14., epsilon = 1e-9);

        let point = resampler.resample(&history, us(16_000), false).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::PassThrough);
        assert_eq!(point.pos, DVec2::new(10., 0.));
    }

    #[test]
    fn accelerate_mode_widens_and_scales() {
        let history = history(&[sample(0., 0., 0), sample(10., 0., 10_000)]);
        let resampler = Resampler::new(ResampleOptions::default());

        // 12 ms ahead: within the 16 ms accelerate horizon, scaled by 1.2.
        let point = resampler.resample(&history, us(22_000), true).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::Extrapolated);
        assert_abs_diff_eq!(point.pos.x, 10. + 12. * 1.2, epsilon = 1e-9);

        let normal = resampler.resample(&history, us(22_000), false).unwrap();
        assert!(point.pos.x > normal.pos.x);
    }

    #[test]
    fn equal_timestamps_pass_through() {
        let history = history(&[sample(0., 0., 1000), sample(5., 5., 1000)]);
        let resampler = Resampler::new(ResampleOptions::default());

        let point = resampler.resample(&history, us(3000), false).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::PassThrough);
        assert_eq!(point.pos, DVec2::new(5., 5.));
    }

    #[test]
    fn single_sample_and_empty_history() {
        let resampler = Resampler::new(ResampleOptions::default());
        assert_eq!(
            resampler.resample(&HistoryBuffer::default(), us(1000), false),
            None
        );

        let history = history(&[sample(3., 4., 1000)]);
        let point = resampler.resample(&history, us(5000), true).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::PassThrough);
        assert_eq!(point.pos, DVec2::new(3., 4.));
        assert_eq!(point.timestamp, us(1000));
    }

    #[test]
    fn target_before_history_passes_oldest() {
        let history = history(&[sample(1., 2., 1000), sample(2., 2., 2000)]);
        let resampler = Resampler::new(ResampleOptions::default());

        let point = resampler.resample(&history, us(500), false).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::PassThrough);
        assert_eq!(point.pos, DVec2::new(1., 2.));
    }

    #[test]
    fn off_delivers_newest() {
        let options = ResampleOptions {
            off: true,
            ..ResampleOptions::default()
        };
        let history = history(&[sample(0., 0., 0), sample(10., 0., 10_000)]);
        let resampler = Resampler::new(options);

        let point = resampler.resample(&history, us(5000), false).unwrap();
        assert_eq!(point.strategy, ResampleStrategy::PassThrough);
        assert_eq!(point.pos, DVec2::new(10., 0.));
    }

    #[test]
    fn options_from_config() {
        let options = ResampleOptions::default();
        assert_eq!(options.compensation, Duration::from_millis(5));
        assert_eq!(options.max_horizon, Duration::from_millis(8));
        assert_eq!(options.accelerate_max_horizon, Duration::from_millis(16));
        assert_eq!(options.history_limit, Duration::from_millis(150));
        assert_abs_diff_eq!(options.accelerate_scale, 1.2);
        assert_abs_diff_eq!(options.max_extrapolation, 100.);

        assert_eq!(options.target(Duration::from_millis(16)), Duration::from_millis(11));
        assert_eq!(options.target(Duration::from_millis(2)), Duration::ZERO);
    }
}
