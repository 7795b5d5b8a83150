use crate::FloatOrInt;

/// Tuning for the vsync resampler. All durations are in milliseconds.
#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Resample {
    /// Deliver the newest raw sample on every tick instead of resampling.
    #[knuffel(child)]
    pub off: bool,
    /// How far behind vsync the resample target sits.
    #[knuffel(child, unwrap(argument), default = FloatOrInt(5.))]
    pub compensation_ms: FloatOrInt<0, 100>,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(8.))]
    pub max_horizon_ms: FloatOrInt<0, 100>,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(16.))]
    pub accelerate_max_horizon_ms: FloatOrInt<0, 100>,
    #[knuffel(child, unwrap(argument), default = FloatOrInt(1.2))]
    pub accelerate_scale: FloatOrInt<1, 2>,
    /// Longest extrapolated jump in pixels outside of accelerate mode.
    #[knuffel(child, unwrap(argument), default = FloatOrInt(100.))]
    pub max_extrapolation_px: FloatOrInt<0, 10000>,
    /// Samples older than this relative to the newest one are dropped.
    #[knuffel(child, unwrap(argument), default = FloatOrInt(150.))]
    pub history_limit_ms: FloatOrInt<10, 1000>,
}

impl Default for Resample {
    fn default() -> Self {
        Self {
            off: false,
            compensation_ms: FloatOrInt(5.),
            max_horizon_ms: FloatOrInt(8.),
            accelerate_max_horizon_ms: FloatOrInt(16.),
            accelerate_scale: FloatOrInt(1.2),
            max_extrapolation_px: FloatOrInt(100.),
            history_limit_ms: FloatOrInt(150.),
        }
    }
}
