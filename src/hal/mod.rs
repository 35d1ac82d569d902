// src/hal/mod.rs
//! Device channel layer: serial, simulated and console targets

pub mod console;
pub mod serial_driver;
pub mod simulator;
pub mod traits;
pub mod types;
pub mod wire;

pub use console::ConsoleChannel;
pub use serial_driver::SerialChannel;
pub use simulator::{SimulatedDevice, SimulatedDeviceHandle, SimulatorBehavior};
pub use traits::*;
pub use types::*;
pub use wire::{decode_inbound, encode_sample, DiagnosisPayload, WireEncoder};

use tracing::{info, warn};

use crate::config::constants::channel::{SIMULATED_TARGET, STDOUT_TARGET};
use crate::config::{ChannelConfig, PlaybackMode};

/// Resolves a configured target into a [`ChannelState`].
///
/// Must be called from within a tokio runtime.
pub struct ChannelFactory;

impl ChannelFactory {
    /// Open the target once; failure yields `Disconnected` instead of an error
    pub fn open(config: &ChannelConfig) -> ChannelState {
        match config.target.as_str() {
            SIMULATED_TARGET => {
                info!("Using simulated device");
                ChannelState::connected(Self::simulated_device())
            }
            STDOUT_TARGET => ChannelState::connected(ConsoleChannel::stdout()),
            _ => match SerialChannel::open(config) {
                Ok(channel) => ChannelState::connected(channel),
                Err(e) => {
                    warn!("Device unavailable, continuing without it: {}", e);
                    ChannelState::disconnected(e.to_string())
                }
            },
        }
    }

    /// Peak-detecting simulator for `sim` runs; counts writes but keeps none
    pub fn simulated_device() -> SimulatedDevice {
        SimulatedDevice::with_peak_detector().without_recording()
    }

    /// Like [`ChannelFactory::open`], but continuous playback prints to the
    /// console when no device could be opened
    pub fn open_for_playback(config: &ChannelConfig, playback: PlaybackMode) -> ChannelState {
        match (Self::open(config), playback) {
            (ChannelState::Disconnected { reason }, PlaybackMode::Continuous) => {
                info!("Streaming to console ({})", reason);
                ChannelState::connected(ConsoleChannel::stdout())
            }
            (state, _) => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(target: &str) -> ChannelConfig {
        ChannelConfig {
            target: target.to_string(),
            ..ChannelConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_port_is_disconnected() {
        let state = ChannelFactory::open(&config("/dev/ecg-replay-missing"));
        match state {
            ChannelState::Disconnected { reason } => assert!(reason.contains("ecg-replay-missing")),
            other => panic!("expected disconnected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_named_targets() {
        let mut sim = ChannelFactory::open(&config("sim"));
        assert!(sim.is_connected());
        assert_eq!(sim.as_channel_mut().map(|c| c.name().to_string()), Some("sim".to_string()));

        let console = ChannelFactory::open(&config("stdout"));
        assert!(console.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sim_target_does_not_retain_records() {
        let mut device = ChannelFactory::simulated_device();
        let handle = device.handle();

        for value in [0.1, 0.9, 0.1, 0.95] {
            device.write(&encode_sample(value).unwrap()).await.unwrap();
        }

        assert_eq!(handle.write_count(), 4);
        assert!(handle.writes().is_empty());
        assert!(handle.write_times().is_empty());
        assert!(device.poll_readable());
        let replies = String::from_utf8(device.read_available().await.unwrap()).unwrap();
        assert_eq!(replies.matches("PEAK").count(), 2);
    }

    #[tokio::test]
    async fn test_continuous_degrades_to_console() {
        let missing = config("/dev/ecg-replay-missing");

        let beats = ChannelFactory::open_for_playback(&missing, PlaybackMode::Beats);
        assert!(!beats.is_connected());

        let mut continuous = ChannelFactory::open_for_playback(&missing, PlaybackMode::Continuous);
        let channel = continuous.as_channel_mut().expect("console channel");
        assert_eq!(channel.name(), "stdout");
        assert!(channel.annotate_records());
    }
}
