// src/hal/traits.rs
//! Device channel trait

use async_trait::async_trait;

use crate::hal::types::{ChannelError, ChannelStats};

/// Ordered full-duplex byte stream to the diagnostic device.
///
/// `poll_readable` and `read_available` never wait: they report what is
/// already buffered and return immediately.
#[async_trait]
pub trait DeviceChannel: Send {
    /// Human-readable target name
    fn name(&self) -> &str;

    /// Write one complete record
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError>;

    /// Whether inbound bytes are buffered right now
    fn poll_readable(&mut self) -> bool;

    /// Drain whatever inbound bytes are buffered, possibly none
    async fn read_available(&mut self) -> Result<Vec<u8>, ChannelError>;

    /// Release the link; further writes fail with [`ChannelError::Closed`]
    async fn close(&mut self) -> Result<(), ChannelError>;

    fn is_open(&self) -> bool;

    fn stats(&self) -> ChannelStats;

    /// Whether outbound records carry the stream `status` field
    fn annotate_records(&self) -> bool {
        false
    }
}
