use std::time::Duration;

/// Converts a millisecond count from the config into a `Duration`, clamping negatives to zero.
pub fn ms_to_duration(ms: f64) -> Duration {
    Duration::from_nanos((ms.max(0.) * 1_000_000.).round() as u64)
}

/// Nanoseconds in `t`, saturated to `u64`.
pub fn duration_to_nanos(t: Duration) -> u64 {
    u64::try_from(t.as_nanos()).unwrap_or(u64::MAX)
}
