// src/hal/types.rs
//! Core types for device channel abstraction

use std::fmt;

use thiserror::Error;

use super::traits::DeviceChannel;

/// Channel errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("Failed to open {target}: {reason}")]
    Open { target: String, reason: String },

    #[error("Write error: {0}")]
    Write(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Channel is closed")]
    Closed,
}

/// Traffic counters kept by every channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub records_written: u64,
    pub bytes_written: u64,
    pub polls: u64,
    pub reads: u64,
    pub bytes_read: u64,
}

/// Result of opening the configured target, decided once at startup
pub enum ChannelState {
    /// An open duplex byte stream
    Connected(Box<dyn DeviceChannel>),
    /// No device; writes and reads are skipped entirely
    Disconnected { reason: String },
}

impl ChannelState {
    pub fn connected<C: DeviceChannel + 'static>(channel: C) -> Self {
        ChannelState::Connected(Box::new(channel))
    }

    pub fn disconnected(reason: impl Into<String>) -> Self {
        ChannelState::Disconnected { reason: reason.into() }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ChannelState::Connected(_))
    }

    pub fn as_channel_mut(&mut self) -> Option<&mut (dyn DeviceChannel + 'static)> {
        match self {
            ChannelState::Connected(channel) => Some(channel.as_mut()),
            ChannelState::Disconnected { .. } => None,
        }
    }
}

impl fmt::Debug for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Connected(channel) => f.debug_tuple("Connected").field(&channel.name()).finish(),
            ChannelState::Disconnected { reason } => {
                f.debug_struct("Disconnected").field("reason", reason).finish()
            }
        }
    }
}
