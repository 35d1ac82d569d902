//! Cache → remote → synthetic resolution

use tracing::{info, warn};

use super::{
    AcquireRequest, AcquisitionError, CacheSource, DataOrigin, Dataset, RemoteSource, SampleSource,
    SyntheticSource,
};
use crate::config::DatasetConfig;

/// A dataset together with the strategy that produced it
#[derive(Debug, Clone)]
pub struct Acquired {
    pub dataset: Dataset,
    pub origin: DataOrigin,
}

/// Tries each configured strategy in order until one yields data
pub struct DatasetResolver {
    sources: Vec<Box<dyn SampleSource>>,
    fallback: Option<SyntheticSource>,
}

impl DatasetResolver {
    /// Build the strategy chain described by the dataset configuration
    pub fn from_config(config: &DatasetConfig) -> Self {
        let mut sources: Vec<Box<dyn SampleSource>> = vec![Box::new(CacheSource::new(&config.cache_path))];

        if let Some(url) = &config.remote_url {
            sources.push(Box::new(RemoteSource::new(
                url.clone(),
                &config.cache_path,
                config.download_timeout(),
            )));
        }

        let fallback = config
            .synthetic_fallback
            .then(|| SyntheticSource::new(config.synthetic_seed, config.synthetic_beats));

        Self { sources, fallback }
    }

    /// Build a chain from explicit strategies
    pub fn new(sources: Vec<Box<dyn SampleSource>>, fallback: Option<SyntheticSource>) -> Self {
        Self { sources, fallback }
    }

    /// Resolve a dataset, degrading to synthetic data when enabled
    pub async fn acquire(&self, request: &AcquireRequest) -> Result<Acquired, AcquisitionError> {
        let mut failures = Vec::new();

        for source in &self.sources {
            match source.acquire(request).await {
                Ok(dataset) => {
                    info!("Dataset acquired from {}", source.origin());
                    return Ok(Acquired { dataset, origin: source.origin() });
                }
                Err(e) => {
                    warn!("{} source unavailable: {}", source.origin(), e);
                    failures.push(format!("{}: {}", source.origin(), e));
                }
            }
        }

        if let Some(synthetic) = &self.fallback {
            warn!("Falling back to synthetic heartbeats");
            let dataset = synthetic.acquire(request).await?;
            return Ok(Acquired { dataset, origin: DataOrigin::Synthetic });
        }

        Err(AcquisitionError::NoData(failures.join("; ")))
    }
}
