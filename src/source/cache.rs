//! Local cache strategy

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::csv_format::parse_beats_file;
use super::{AcquireRequest, AcquisitionError, DataOrigin, Dataset, SampleSource};
use crate::utils::integrity::{verify_cache_file, CacheIntegrity};

/// Reads beats from a file already on disk
#[derive(Debug, Clone)]
pub struct CacheSource {
    path: PathBuf,
}

impl CacheSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists, is non-empty and passes its checksum
    pub fn check(&self) -> Result<CacheIntegrity, AcquisitionError> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AcquisitionError::CacheMissing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() || metadata.len() == 0 {
            return Err(AcquisitionError::CacheEmpty(self.path.clone()));
        }

        verify_cache_file(&self.path).map_err(|e| AcquisitionError::CacheCorrupt(e.to_string()))
    }
}

#[async_trait]
impl SampleSource for CacheSource {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Cache
    }

    async fn acquire(&self, request: &AcquireRequest) -> Result<Dataset, AcquisitionError> {
        let integrity = self.check()?;
        debug!("Cache {} integrity: {:?}", self.path.display(), integrity);

        info!("Loading heartbeats from {}", self.path.display());
        let path = self.path.clone();
        let samples_per_beat = request.samples_per_beat;
        let dataset = tokio::task::spawn_blocking(move || parse_beats_file(&path, samples_per_beat))
            .await
            .map_err(|e| AcquisitionError::Io(format!("cache parse task failed: {}", e)))??;

        let dataset = dataset.filtered(&request.labels, request.slice_start)?;
        info!(
            "Cache yielded {} beats of {} samples (labels {}, from offset {})",
            dataset.beat_count(),
            dataset.beat_len(),
            request.labels,
            request.slice_start
        );
        Ok(dataset)
    }
}
