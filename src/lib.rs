//! ECG-Replay: real-time heartbeat replay to an embedded diagnostic device
//!
//! Loads a table of fixed-length heartbeat recordings and streams them, one
//! sample at a time and paced in real time, over a serial link to a device
//! that performs on-board diagnosis. Messages the device sends back are
//! picked up between samples without ever blocking the stream.
//!
//! - Dataset resolution: local cache, then HTTP download, then synthetic beats
//! - Device channels: serial port, in-memory simulator, console
//! - Line-delimited JSON wire format the device firmware can parse
//! - Cancellable streaming engine with beat and continuous playback
//! - Layered TOML/environment configuration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ecg_replay::config::ReplayConfig;
//! use ecg_replay::engine::StreamingEngine;
//! use ecg_replay::hal::ChannelFactory;
//! use ecg_replay::reporter::DiagnosisReporter;
//! use ecg_replay::source::{AcquireRequest, DatasetResolver};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReplayConfig::default();
//!
//!     let acquired = DatasetResolver::from_config(&config.dataset)
//!         .acquire(&AcquireRequest::from_config(&config.dataset))
//!         .await?;
//!
//!     let mut channel = ChannelFactory::open_for_playback(&config.channel, config.stream.playback);
//!     let mut engine = StreamingEngine::new(config.stream.clone(), DiagnosisReporter::console());
//!
//!     let summary = engine
//!         .run(&acquired.dataset, &mut channel, &CancellationToken::new())
//!         .await?;
//!     println!("Sent {} samples", summary.samples_sent);
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod hal;
pub mod reporter;
pub mod source;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, PlaybackMode, ReplayConfig};
pub use engine::{EngineState, RunOutcome, RunSummary, StreamingEngine};
pub use error::{ReplayError, ReplayResult};
pub use hal::{ChannelFactory, ChannelState, DeviceChannel};
pub use reporter::{Diagnosis, DiagnosisReporter, DisplayedRecord};
pub use source::{DataOrigin, Dataset, DatasetResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Real-time ECG heartbeat replay to embedded diagnostic devices".to_string(),
        features: vec![
            "Cache, remote and synthetic dataset sources".to_string(),
            "Serial, simulated and console device channels".to_string(),
            "Cancellable real-time streaming engine".to_string(),
            "Layered configuration management".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(!info.features.is_empty());
    }
}
