//! Cancellable pacing delays

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;

/// Outcome of a pacing delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Continue,
    Cancelled,
}

/// Sleep for `duration` unless `cancel` fires first
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> Pace {
    if duration.is_zero() {
        return if cancel.is_cancelled() { Pace::Cancelled } else { Pace::Continue };
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Pace::Cancelled,
        _ = tokio::time::sleep(duration) => Pace::Continue,
    }
}

/// Per-sample and per-beat delays derived from the stream settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    sample_interval: Duration,
    beat_pause: Duration,
}

impl Pacer {
    pub fn new(sample_interval: Duration, beat_pause: Duration) -> Self {
        Self {
            sample_interval,
            beat_pause,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.sample_interval(), config.beat_pause())
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    pub fn beat_pause(&self) -> Duration {
        self.beat_pause
    }

    pub async fn after_sample(&self, cancel: &CancellationToken) -> Pace {
        pause(self.sample_interval, cancel).await
    }

    pub async fn after_beat(&self, cancel: &CancellationToken) -> Pace {
        pause(self.beat_pause, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_pause_waits_full_duration() {
        let cancel = CancellationToken::new();
        let start = Instant::now();

        assert_eq!(pause(Duration::from_millis(200), &cancel).await, Pace::Continue);
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        assert_eq!(pause(Duration::from_secs(60), &cancel).await, Pace::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_duration_observes_cancellation() {
        let cancel = CancellationToken::new();
        assert_eq!(pause(Duration::ZERO, &cancel).await, Pace::Continue);
        cancel.cancel();
        assert_eq!(pause(Duration::ZERO, &cancel).await, Pace::Cancelled);
    }
}
