//! Remote origin strategy
//!
//! Fetches the beat table over HTTP into the cache location, then parses it
//! from there. The body is streamed into a temporary file in the cache
//! directory and only renamed over the cache path once complete, so an
//! interrupted transfer never looks like a valid cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::cache::CacheSource;
use super::{AcquireRequest, AcquisitionError, DataOrigin, Dataset, SampleSource};
use crate::utils::integrity::{sidecar_path, write_sidecar};

/// Downloads the dataset from an HTTP object address
#[derive(Debug, Clone)]
pub struct RemoteSource {
    url: String,
    cache_path: PathBuf,
    timeout: Duration,
}

impl RemoteSource {
    pub fn new<P: Into<PathBuf>>(url: impl Into<String>, cache_path: P, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            cache_path: cache_path.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download into the cache path, returning the number of bytes written
    pub async fn fetch(&self) -> Result<u64, AcquisitionError> {
        info!("Fetching dataset from {}", self.url);

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AcquisitionError::Transport(e.to_string()))?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AcquisitionError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::FORBIDDEN => return Err(AcquisitionError::RemoteForbidden(self.url.clone())),
            StatusCode::NOT_FOUND => return Err(AcquisitionError::RemoteNotFound(self.url.clone())),
            status => {
                return Err(AcquisitionError::RemoteStatus {
                    url: self.url.clone(),
                    status: status.as_u16(),
                })
            }
        }

        let dir = cache_dir(&self.cache_path);
        tokio::fs::create_dir_all(&dir).await?;

        let temp = tempfile::Builder::new()
            .prefix(".ecg-replay-download-")
            .tempfile_in(&dir)?;
        let mut file = tokio::fs::File::from_std(temp.reopen()?);

        let mut stream = response.bytes_stream();
        let mut hasher = crc32fast::Hasher::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AcquisitionError::Transport(e.to_string()))?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if downloaded == 0 {
            return Err(AcquisitionError::Transport(format!("{} returned an empty body", self.url)));
        }

        // Sidecar first: if the rename below fails, a stale cache no longer matches it
        write_sidecar(&self.cache_path, hasher.finalize())
            .map_err(|e| AcquisitionError::Io(e.to_string()))?;
        temp.persist(&self.cache_path)
            .map_err(|e| AcquisitionError::Io(e.error.to_string()))?;

        info!("Downloaded {} bytes to {}", downloaded, self.cache_path.display());
        Ok(downloaded)
    }
}

fn cache_dir(cache_path: &Path) -> PathBuf {
    match cache_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[async_trait]
impl SampleSource for RemoteSource {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Remote
    }

    async fn acquire(&self, request: &AcquireRequest) -> Result<Dataset, AcquisitionError> {
        if let Err(e) = self.fetch().await {
            warn!("Remote fetch failed: {}", e);
            return Err(e);
        }

        CacheSource::new(&self.cache_path).acquire(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LabelFilter;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BODY: &str = "0.1,0.9,0.1,0.0\n0.2,0.8,0.2,2.0\n";

    fn request() -> AcquireRequest {
        AcquireRequest {
            samples_per_beat: 3,
            labels: LabelFilter::All,
            slice_start: 0,
        }
    }

    #[test]
    fn test_cache_dir_of_bare_filename() {
        assert_eq!(cache_dir(Path::new("mitbih_test.csv")), PathBuf::from("."));
        assert_eq!(cache_dir(Path::new("/data/x.csv")), PathBuf::from("/data"));
    }

    #[tokio::test]
    async fn test_fetch_persists_cache_and_sidecar() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ecg/mitbih_test.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let cache_path = dir.path().join("nested").join("mitbih_test.csv");
        let source = RemoteSource::new(
            format!("{}/ecg/mitbih_test.csv", server.uri()),
            &cache_path,
            Duration::from_secs(5),
        );

        let dataset = source.acquire(&request()).await.unwrap();
        assert_eq!(dataset.beat_count(), 2);
        assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), BODY);
        assert!(sidecar_path(&cache_path).exists());

        // Only the cache and its sidecar remain in the directory
        let entries = std::fs::read_dir(cache_path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[tokio::test]
    async fn test_status_categories() {
        let server = MockServer::start().await;
        Mock::given(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let cache_path = dir.path().join("beats.csv");
        let source = |p: &str| RemoteSource::new(format!("{}{}", server.uri(), p), &cache_path, Duration::from_secs(5));

        assert!(matches!(
            source("/forbidden").fetch().await,
            Err(AcquisitionError::RemoteForbidden(_))
        ));
        assert!(matches!(
            source("/missing").fetch().await,
            Err(AcquisitionError::RemoteNotFound(_))
        ));
        assert!(matches!(
            source("/broken").fetch().await,
            Err(AcquisitionError::RemoteStatus { status: 503, .. })
        ));
        assert!(!cache_path.exists());
    }

    #[tokio::test]
    async fn test_unreachable_origin_is_transport_error() {
        let dir = tempdir().unwrap();
        let source = RemoteSource::new(
            "http://127.0.0.1:1/beats.csv",
            dir.path().join("beats.csv"),
            Duration::from_secs(2),
        );

        assert!(matches!(source.fetch().await, Err(AcquisitionError::Transport(_))));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let cache_path = dir.path().join("beats.csv");
        std::fs::write(&cache_path, BODY).unwrap();

        let source = RemoteSource::new(format!("{}/x.csv", server.uri()), &cache_path, Duration::from_secs(5));
        assert!(source.fetch().await.is_err());
        assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), BODY);
    }
}
