//! Streaming engine
//!
//! Replays a [`Dataset`] to the device channel in real time. Each sample is
//! written as one record, then any buffered device output is drained and
//! reported without waiting, then the engine sleeps for the sample interval.
//! In beat playback an extra pause follows every beat but the last; in
//! continuous playback the flattened dataset repeats until cancelled or the
//! sample limit is reached. Without a device the run is display-only: each
//! record is shown on the reporter's console instead of being sent, with
//! the same pacing.
//!
//! ```text
//! Idle ──run──▶ Streaming ──cancel──▶ Stopping ──▶ Idle
//!                   │
//!                   └──end of data / limit──▶ Finished ──▶ Idle
//! ```

pub mod cursor;
pub mod pacing;

pub use cursor::{CursorStep, StreamCursor};
pub use pacing::{pause, Pace, Pacer};

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::constants::wire::CONTINUOUS_STATUS;
use crate::config::{PlaybackMode, StreamConfig};
use crate::error::{ErrorContext, ReplayError, ReplayResult};
use crate::error_context;
use crate::hal::{ChannelState, ChannelStats, DeviceChannel, WireEncoder};
use crate::reporter::{DiagnosisReporter, StreamPosition};
use crate::source::Dataset;

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Idle,
    Streaming,
    Stopping,
    Finished,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::Streaming => "streaming",
            EngineState::Stopping => "stopping",
            EngineState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// All data sent, or the sample limit reached
    Finished,
    /// Stopped by the cancellation token
    Cancelled,
}

/// Totals for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub beats_completed: u64,
    /// Samples written to the device
    pub samples_sent: u64,
    /// Samples shown on the console because no device was connected
    pub samples_displayed: u64,
    pub diagnoses: u64,
    pub elapsed: Duration,
    /// Traffic counters, `None` when no device was connected
    #[serde(skip)]
    pub channel: Option<ChannelStats>,
}

impl RunSummary {
    /// Summary for a run that ended before its first sample
    pub fn not_started(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            beats_completed: 0,
            samples_sent: 0,
            samples_displayed: 0,
            diagnoses: 0,
            elapsed: Duration::ZERO,
            channel: None,
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    beats_completed: u64,
    samples_sent: u64,
    samples_displayed: u64,
    diagnoses: u64,
}

impl Progress {
    fn samples_handled(&self) -> u64 {
        self.samples_sent + self.samples_displayed
    }
}

pub struct StreamingEngine {
    config: StreamConfig,
    pacer: Pacer,
    reporter: DiagnosisReporter,
    encoder: WireEncoder,
    state: EngineState,
}

impl StreamingEngine {
    pub fn new(config: StreamConfig, reporter: DiagnosisReporter) -> Self {
        Self {
            pacer: Pacer::from_config(&config),
            config,
            reporter,
            encoder: WireEncoder::new(),
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn reporter(&self) -> &DiagnosisReporter {
        &self.reporter
    }

    /// Replay `dataset` until it is exhausted, the sample limit is hit, or
    /// `cancel` fires. The channel is closed before returning.
    pub async fn run(
        &mut self,
        dataset: &Dataset,
        channel: &mut ChannelState,
        cancel: &CancellationToken,
    ) -> ReplayResult<RunSummary> {
        if self.state != EngineState::Idle {
            return Err(ReplayError::InvalidState {
                expected: EngineState::Idle.to_string(),
                actual: self.state.to_string(),
                context: error_context!("engine", "run"),
            });
        }

        if let ChannelState::Disconnected { reason } = channel {
            warn!("No device connected ({}); samples will be displayed only", reason);
        }

        info!(
            beats = dataset.beat_count(),
            samples = dataset.sample_count(),
            rate_hz = self.config.sample_rate_hz,
            playback = ?self.config.playback,
            "Streaming started"
        );

        self.state = EngineState::Streaming;
        let started = Instant::now();
        let mut progress = Progress::default();

        let result = self.stream(dataset, channel, cancel, &mut progress).await;

        self.state = match result {
            Ok(RunOutcome::Cancelled) => EngineState::Stopping,
            _ => EngineState::Finished,
        };

        let stats = match channel.as_channel_mut() {
            Some(device) => {
                if let Err(e) = device.close().await {
                    warn!("Closing {} failed: {}", device.name(), e);
                }
                Some(device.stats())
            }
            None => None,
        };

        self.state = EngineState::Idle;
        let outcome = result?;

        let summary = RunSummary {
            outcome,
            beats_completed: progress.beats_completed,
            samples_sent: progress.samples_sent,
            samples_displayed: progress.samples_displayed,
            diagnoses: progress.diagnoses,
            elapsed: started.elapsed(),
            channel: stats,
        };

        info!(
            outcome = ?summary.outcome,
            beats = summary.beats_completed,
            samples = summary.samples_sent,
            displayed = summary.samples_displayed,
            diagnoses = summary.diagnoses,
            "Streaming stopped"
        );

        Ok(summary)
    }

    async fn stream(
        &mut self,
        dataset: &Dataset,
        channel: &mut ChannelState,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> ReplayResult<RunOutcome> {
        let continuous = self.config.playback == PlaybackMode::Continuous;
        let mut cursor = StreamCursor::new(continuous);

        while let Some(step) = cursor.next_step(dataset) {
            if step.position.sample == 0 && !continuous {
                info!("Sending heartbeat #{}", step.position.beat + 1);
            }

            self.send_sample(&step, channel, progress).await?;

            if step.ends_beat {
                progress.beats_completed += 1;
            }

            if self.limit_reached(progress.samples_handled()) {
                debug!("Sample limit of {} reached", progress.samples_handled());
                return Ok(RunOutcome::Finished);
            }

            if self.pacer.after_sample(cancel).await == Pace::Cancelled {
                return Ok(RunOutcome::Cancelled);
            }

            let between_beats = step.ends_beat && !step.ends_dataset && !continuous;
            if between_beats && self.pacer.after_beat(cancel).await == Pace::Cancelled {
                return Ok(RunOutcome::Cancelled);
            }
        }

        Ok(RunOutcome::Finished)
    }

    async fn send_sample(
        &mut self,
        step: &CursorStep,
        channel: &mut ChannelState,
        progress: &mut Progress,
    ) -> ReplayResult<()> {
        let Some(device) = channel.as_channel_mut() else {
            trace!(tick = step.position.tick, value = step.value, "No device, sample displayed");
            let record = self
                .encoder
                .encode(step.value, None)
                .map_err(|e| ReplayError::channel(e, sample_context("display_sample", step)))?;
            self.reporter.display(record, step.position);
            progress.samples_displayed += 1;
            return Ok(());
        };

        let status = (self.config.playback == PlaybackMode::Continuous && device.annotate_records())
            .then_some(CONTINUOUS_STATUS);

        let write = match self.encoder.encode(step.value, status) {
            Ok(record) => device.write(record).await,
            Err(e) => Err(e),
        };

        if let Err(e) = write {
            warn!("Write to {} failed at sample {}: {}", device.name(), step.position.tick, e);
            if let Err(close_err) = device.close().await {
                debug!("Close after write failure: {}", close_err);
            }
            return Err(ReplayError::channel(e, sample_context("write_sample", step)));
        }

        progress.samples_sent += 1;
        progress.diagnoses += self.drain_inbound(device, step.position).await as u64;
        Ok(())
    }

    /// Report whatever the device has already sent; never waits
    async fn drain_inbound(&mut self, device: &mut (dyn DeviceChannel + 'static), position: StreamPosition) -> usize {
        if !device.poll_readable() {
            return 0;
        }

        match device.read_available().await {
            Ok(bytes) if bytes.is_empty() => 0,
            Ok(bytes) => self.reporter.report(&bytes, position),
            Err(e) => {
                warn!("Read from {} failed: {}", device.name(), e);
                0
            }
        }
    }

    fn limit_reached(&self, samples_handled: u64) -> bool {
        self.config.max_samples.is_some_and(|limit| samples_handled >= limit)
    }
}

fn sample_context(operation: &str, step: &CursorStep) -> ErrorContext {
    error_context!("engine", operation)
        .add_info("tick", step.position.tick.to_string())
        .add_info("beat", step.position.beat.to_string())
}

impl fmt::Debug for StreamingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::SimulatedDevice;
    use crate::reporter::RecordingSink;
    use crate::source::Beat;

    fn stream_config(playback: PlaybackMode, max_samples: Option<u64>) -> StreamConfig {
        StreamConfig {
            sample_rate_hz: 100.0,
            beat_pause_ms: 200,
            playback,
            max_samples,
        }
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + Duration::from_millis(1),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn two_beats() -> Dataset {
        Dataset::new(vec![Beat::new(vec![0.1, 0.9]), Beat::new(vec![0.2, 0.8])]).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_beat_pause_between_beats_only() {
        let device = SimulatedDevice::new();
        let handle = device.handle();
        let mut channel = ChannelState::connected(device);
        let mut engine = StreamingEngine::new(
            stream_config(PlaybackMode::Beats, None),
            DiagnosisReporter::new(RecordingSink::new()),
        );

        let summary = engine
            .run(&two_beats(), &mut channel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Finished);
        assert_eq!(summary.beats_completed, 2);
        assert_eq!(summary.samples_sent, 4);

        let times = handle.write_times();
        let gaps: Vec<_> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps.len(), 3);
        assert_near(gaps[0], Duration::from_millis(10));
        assert_near(gaps[1], Duration::from_millis(210));
        assert_near(gaps[2], Duration::from_millis(10));
        // Last sample interval, no trailing beat pause
        assert!(summary.elapsed >= Duration::from_millis(240));
        assert!(summary.elapsed < Duration::from_millis(440));
        assert!(handle.is_closed());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_wraps_until_limit() {
        let device = SimulatedDevice::new();
        let handle = device.handle();
        let mut channel = ChannelState::connected(device);
        let mut engine = StreamingEngine::new(
            stream_config(PlaybackMode::Continuous, Some(7)),
            DiagnosisReporter::new(RecordingSink::new()),
        );

        let summary = engine
            .run(&two_beats(), &mut channel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Finished);
        assert_eq!(summary.samples_sent, 7);
        assert_eq!(summary.beats_completed, 3);
        assert_eq!(
            handle.write_lines(),
            vec![
                "{\"val\": 0.1}",
                "{\"val\": 0.9}",
                "{\"val\": 0.2}",
                "{\"val\": 0.8}",
                "{\"val\": 0.1}",
                "{\"val\": 0.9}",
                "{\"val\": 0.2}",
            ]
        );

        // No beat pause in continuous playback
        let times = handle.write_times();
        for w in times.windows(2) {
            assert_near(w[1] - w[0], Duration::from_millis(10));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_run_displays_every_record() {
        let mut channel = ChannelState::disconnected("no such port");
        let sink = RecordingSink::new();
        let mut engine = StreamingEngine::new(
            stream_config(PlaybackMode::Beats, None),
            DiagnosisReporter::new(sink.clone()),
        );

        let summary = engine
            .run(&two_beats(), &mut channel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Finished);
        assert_eq!(summary.samples_sent, 0);
        assert_eq!(summary.samples_displayed, 4);
        assert_eq!(summary.beats_completed, 2);
        assert_eq!(summary.channel, None);
        assert!(sink.is_empty());

        let shown: Vec<(u64, usize, String)> = sink
            .displayed()
            .into_iter()
            .map(|d| (d.position.tick, d.position.beat, d.record))
            .collect();
        assert_eq!(
            shown,
            vec![
                (0, 0, "{\"val\": 0.1}".to_string()),
                (1, 0, "{\"val\": 0.9}".to_string()),
                (2, 1, "{\"val\": 0.2}".to_string()),
                (3, 1, "{\"val\": 0.8}".to_string()),
            ]
        );
        // Pacing still applies without a device
        assert!(summary.elapsed >= Duration::from_millis(240));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_closes_and_errors() {
        let device = SimulatedDevice::new();
        let handle = device.handle();
        handle.fail_writes_after(2);
        let mut channel = ChannelState::connected(device);
        let mut engine = StreamingEngine::new(
            stream_config(PlaybackMode::Beats, None),
            DiagnosisReporter::new(RecordingSink::new()),
        );

        let err = engine
            .run(&two_beats(), &mut channel, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ReplayError::Channel { .. }));
        assert_eq!(err.context().additional_info.get("tick").map(String::as_str), Some("2"));
        assert!(handle.is_closed());
        assert_eq!(handle.write_count(), 2);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_limit_counts_displayed_records() {
        let mut channel = ChannelState::disconnected("no such port");
        let sink = RecordingSink::new();
        let mut engine = StreamingEngine::new(
            stream_config(PlaybackMode::Continuous, Some(5)),
            DiagnosisReporter::new(sink.clone()),
        );

        let summary = engine
            .run(&two_beats(), &mut channel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.samples_displayed, 5);
        assert_eq!(sink.displayed().len(), 5);
        assert_eq!(sink.displayed()[4].record, "{\"val\": 0.1}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_is_reusable_after_run() {
        let mut engine = StreamingEngine::new(
            stream_config(PlaybackMode::Beats, Some(1)),
            DiagnosisReporter::new(RecordingSink::new()),
        );
        let dataset = two_beats();

        for _ in 0..2 {
            let mut channel = ChannelState::connected(SimulatedDevice::new());
            let summary = engine.run(&dataset, &mut channel, &CancellationToken::new()).await.unwrap();
            assert_eq!(summary.samples_sent, 1);
        }
    }
}
