use std::time::Duration;

/// Interval between consecutive samples at `rate_hz`.
///
/// Non-positive or non-finite rates yield `Duration::ZERO`; configuration
/// validation rejects them before they reach the engine.
pub fn sample_period(rate_hz: f64) -> Duration {
    if rate_hz.is_finite() && rate_hz > 0.0 {
        Duration::from_secs_f64(1.0 / rate_hz)
    } else {
        Duration::ZERO
    }
}
