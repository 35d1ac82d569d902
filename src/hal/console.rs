//! Console channel
//!
//! Prints outbound records instead of sending them to a device. Used for the
//! `stdout` target and as the sink for continuous streaming when no device
//! could be opened. Nothing is ever readable.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::constants::channel::STDOUT_TARGET;
use crate::hal::traits::DeviceChannel;
use crate::hal::types::{ChannelError, ChannelStats};

pub struct ConsoleChannel {
    name: String,
    out: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    stats: ChannelStats,
}

impl ConsoleChannel {
    pub fn stdout() -> Self {
        Self::with_writer(STDOUT_TARGET, tokio::io::stdout())
    }

    pub fn with_writer<W>(name: impl Into<String>, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            name: name.into(),
            out: Some(Box::new(writer)),
            stats: ChannelStats::default(),
        }
    }
}

impl std::fmt::Debug for ConsoleChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleChannel")
            .field("name", &self.name)
            .field("stats", &self.stats)
            .finish()
    }
}

#[async_trait]
impl DeviceChannel for ConsoleChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        let out = self.out.as_mut().ok_or(ChannelError::Closed)?;
        out.write_all(bytes).await.map_err(|e| ChannelError::Write(e.to_string()))?;
        out.flush().await.map_err(|e| ChannelError::Write(e.to_string()))?;

        self.stats.records_written += 1;
        self.stats.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn poll_readable(&mut self) -> bool {
        self.stats.polls += 1;
        false
    }

    async fn read_available(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.stats.reads += 1;
        Ok(Vec::new())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if let Some(mut out) = self.out.take() {
            out.flush().await.map_err(|e| ChannelError::Write(e.to_string()))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.out.is_some()
    }

    fn stats(&self) -> ChannelStats {
        self.stats
    }

    fn annotate_records(&self) -> bool {
        true
    }
}
