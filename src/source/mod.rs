//! Sample sources
//!
//! A [`SampleSource`] turns an [`AcquireRequest`] into a [`Dataset`] or a
//! well-defined [`AcquisitionError`]. Three strategies exist: the local
//! cache file, a remote origin fetched into that cache, and a deterministic
//! synthetic generator. [`DatasetResolver`] tries them in that order.

pub mod dataset;
pub mod csv_format;
pub mod cache;
pub mod remote;
pub mod synthetic;
pub mod resolver;

pub use cache::CacheSource;
pub use dataset::{Beat, Dataset, LabelFilter, Sample};
pub use remote::RemoteSource;
pub use resolver::{Acquired, DatasetResolver};
pub use synthetic::SyntheticSource;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DatasetConfig;

/// Acquisition failures
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// No strategy could produce a dataset
    #[error("No data available: {0}")]
    NoData(String),

    #[error("Cache file not found: {}", .0.display())]
    CacheMissing(PathBuf),

    #[error("Cache file is empty: {}", .0.display())]
    CacheEmpty(PathBuf),

    #[error("Cache file failed integrity check: {0}")]
    CacheCorrupt(String),

    #[error("Malformed dataset at row {row}: {reason}")]
    Parse { row: usize, reason: String },

    #[error("Remote origin refused access (403): {0}")]
    RemoteForbidden(String),

    #[error("Remote object not found (404): {0}")]
    RemoteNotFound(String),

    #[error("Remote origin returned status {status}: {url}")]
    RemoteStatus { url: String, status: u16 },

    #[error("Remote transfer failed: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl AcquisitionError {
    /// True for the terminal "nothing obtainable" outcome
    pub fn is_no_data(&self) -> bool {
        matches!(self, AcquisitionError::NoData(_))
    }
}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        AcquisitionError::Io(err.to_string())
    }
}

/// Which strategy produced a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Cache,
    Remote,
    Synthetic,
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOrigin::Cache => write!(f, "cache"),
            DataOrigin::Remote => write!(f, "remote"),
            DataOrigin::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// What the caller wants from a recorded dataset
#[derive(Debug, Clone, PartialEq)]
pub struct AcquireRequest {
    pub samples_per_beat: usize,
    pub labels: LabelFilter,
    pub slice_start: usize,
}

impl AcquireRequest {
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            samples_per_beat: config.samples_per_beat,
            labels: config.labels.clone(),
            slice_start: config.slice_start,
        }
    }
}

/// One dataset acquisition strategy
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Strategy identity, for logging and reports
    fn origin(&self) -> DataOrigin;

    /// Produce a dataset or a failure; never partially succeeds
    async fn acquire(&self, request: &AcquireRequest) -> Result<Dataset, AcquisitionError>;
}
