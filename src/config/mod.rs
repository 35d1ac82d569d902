// src/config/mod.rs
//! Replay configuration
//!
//! One [`ReplayConfig`] value is built at startup (defaults, TOML files,
//! environment, CLI flags) and handed to each component. Nothing reads
//! configuration from global state after that point.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::source::LabelFilter;
use crate::utils::time::sample_period;
use crate::utils::validation::{
    validate_http_url, validate_not_empty, validate_range, ValidationError, ValidationReport,
};

/// Complete replay configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ReplayConfig {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
}

/// Link to the diagnostic device
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Serial device path, `sim` for the in-memory device or `stdout`
    #[serde(default = "defaults::target")]
    pub target: String,

    #[serde(default = "defaults::baud_rate")]
    pub baud_rate: u32,

    /// Timeout applied when opening the port
    #[serde(default = "defaults::open_timeout_ms")]
    pub open_timeout_ms: u64,
}

/// How samples are iterated
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Each beat once, in order, with an inter-beat pause
    #[default]
    Beats,
    /// All samples flattened and looped forever with no inter-beat pause
    Continuous,
}

/// Streaming cadence
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StreamConfig {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: f64,

    #[serde(default = "defaults::beat_pause_ms")]
    pub beat_pause_ms: u64,

    #[serde(default)]
    pub playback: PlaybackMode,

    /// Stop after this many samples; unlimited when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_samples: Option<u64>,
}

/// Where samples come from and which beats are kept
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DatasetConfig {
    #[serde(default = "defaults::cache_path")]
    pub cache_path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    #[serde(default = "defaults::download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "defaults::samples_per_beat")]
    pub samples_per_beat: usize,

    #[serde(default = "defaults::labels")]
    pub labels: LabelFilter,

    /// Beats before this index (after label filtering) are skipped
    #[serde(default)]
    pub slice_start: usize,

    #[serde(default = "defaults::synthetic_fallback")]
    pub synthetic_fallback: bool,

    #[serde(default = "defaults::synthetic_seed")]
    pub synthetic_seed: u64,

    #[serde(default = "defaults::synthetic_beats")]
    pub synthetic_beats: usize,
}

/// Default value providers using constants
mod defaults {
    use std::path::PathBuf;

    use crate::config::constants::*;
    use crate::source::LabelFilter;

    pub fn target() -> String { channel::DEFAULT_TARGET.to_string() }
    pub fn baud_rate() -> u32 { channel::DEFAULT_BAUD_RATE }
    pub fn open_timeout_ms() -> u64 { channel::DEFAULT_OPEN_TIMEOUT_MS }

    pub fn sample_rate_hz() -> f64 { stream::DEFAULT_SAMPLE_RATE_HZ }
    pub fn beat_pause_ms() -> u64 { stream::DEFAULT_BEAT_PAUSE_MS }

    pub fn cache_path() -> PathBuf { PathBuf::from(dataset::DEFAULT_CACHE_FILE) }
    pub fn download_timeout_secs() -> u64 { dataset::DEFAULT_DOWNLOAD_TIMEOUT_SECS }
    pub fn samples_per_beat() -> usize { dataset::DEFAULT_SAMPLES_PER_BEAT }
    pub fn labels() -> LabelFilter { LabelFilter::classes(dataset::DEFAULT_LABEL_CLASSES) }
    pub fn synthetic_fallback() -> bool { true }
    pub fn synthetic_seed() -> u64 { dataset::DEFAULT_SYNTHETIC_SEED }
    pub fn synthetic_beats() -> usize { dataset::DEFAULT_SYNTHETIC_BEATS }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            target: defaults::target(),
            baud_rate: defaults::baud_rate(),
            open_timeout_ms: defaults::open_timeout_ms(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            beat_pause_ms: defaults::beat_pause_ms(),
            playback: PlaybackMode::default(),
            max_samples: None,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            cache_path: defaults::cache_path(),
            remote_url: None,
            download_timeout_secs: defaults::download_timeout_secs(),
            samples_per_beat: defaults::samples_per_beat(),
            labels: defaults::labels(),
            slice_start: 0,
            synthetic_fallback: defaults::synthetic_fallback(),
            synthetic_seed: defaults::synthetic_seed(),
            synthetic_beats: defaults::synthetic_beats(),
        }
    }
}

impl ChannelConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}

impl StreamConfig {
    /// Pause after each sample, the inverse of the sample rate
    pub fn sample_interval(&self) -> Duration {
        sample_period(self.sample_rate_hz)
    }

    /// Additional pause after each complete beat
    pub fn beat_pause(&self) -> Duration {
        Duration::from_millis(self.beat_pause_ms)
    }
}

impl DatasetConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl ReplayConfig {
    /// Validate every field and cross-field constraint, reporting all failures
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut report = ValidationReport::new();

        report
            .check(validate_not_empty("channel.target", &self.channel.target))
            .check(validate_range("channel.baud_rate", self.channel.baud_rate, 1, channel::MAX_BAUD_RATE))
            .check(validate_range(
                "channel.open_timeout_ms",
                self.channel.open_timeout_ms,
                1,
                channel::MAX_OPEN_TIMEOUT_MS,
            ));

        report
            .check(validate_range(
                "stream.sample_rate_hz",
                self.stream.sample_rate_hz,
                stream::MIN_SAMPLE_RATE_HZ,
                stream::MAX_SAMPLE_RATE_HZ,
            ))
            .check(validate_range("stream.beat_pause_ms", self.stream.beat_pause_ms, 0, stream::MAX_BEAT_PAUSE_MS));

        if self.stream.playback == PlaybackMode::Beats
            && self.stream.beat_pause() <= self.stream.sample_interval()
        {
            report.push(ValidationError::ConstraintViolation {
                fields: vec!["stream.beat_pause_ms".to_string(), "stream.sample_rate_hz".to_string()],
                message: format!(
                    "inter-beat pause ({} ms) must be longer than the sample interval ({:?})",
                    self.stream.beat_pause_ms,
                    self.stream.sample_interval()
                ),
            });
        }

        if self.stream.max_samples == Some(0) {
            report.push(ValidationError::OutOfRange {
                field: "stream.max_samples".to_string(),
                value: "0".to_string(),
                min: "1".to_string(),
                max: u64::MAX.to_string(),
            });
        }

        report
            .check(validate_not_empty(
                "dataset.cache_path",
                &self.dataset.cache_path.to_string_lossy(),
            ))
            .check(validate_range(
                "dataset.samples_per_beat",
                self.dataset.samples_per_beat,
                1,
                dataset::MAX_SAMPLES_PER_BEAT,
            ))
            .check(validate_range("dataset.synthetic_beats", self.dataset.synthetic_beats, 1, usize::MAX))
            .check(validate_range("dataset.download_timeout_secs", self.dataset.download_timeout_secs, 1, 3600));

        if let Some(url) = &self.dataset.remote_url {
            report.check(validate_http_url("dataset.remote_url", url));
        }

        if self.dataset.labels.is_empty() {
            report.push(ValidationError::ConstraintViolation {
                fields: vec!["dataset.labels".to_string()],
                message: "label allow-set must name at least one class or be \"all\"".to_string(),
            });
        }

        report.into_result()
    }

    /// Serialize as pretty TOML for `check` output and config export
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
