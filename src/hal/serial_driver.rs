// src/hal/serial_driver.rs
//! Serial device channel backed by tokio-serial

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::config::constants::channel::{MAX_BAUD_RATE, MAX_READ_CHUNK_BYTES};
use crate::config::ChannelConfig;
use crate::hal::traits::DeviceChannel;
use crate::hal::types::{ChannelError, ChannelStats};

/// Duplex link to a device on a serial port
pub struct SerialChannel {
    port_name: String,
    port: Option<SerialStream>,
    stats: ChannelStats,
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("port_name", &self.port_name)
            .field("open", &self.port.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl SerialChannel {
    /// Open the configured port; fails fast if it does not exist or is busy
    pub fn open(config: &ChannelConfig) -> Result<Self, ChannelError> {
        Self::validate_config(config)?;

        let mut port = tokio_serial::new(&config.target, config.baud_rate)
            .timeout(config.open_timeout())
            .open_native_async()
            .map_err(|e| ChannelError::Open {
                target: config.target.clone(),
                reason: e.to_string(),
            })?;

        // USB CDC devices only emit once the host asserts DTR
        if let Err(e) = port.write_data_terminal_ready(true) {
            debug!("Could not assert DTR on {}: {}", config.target, e);
        }

        info!("Opened {} at {} baud", config.target, config.baud_rate);

        Ok(Self {
            port_name: config.target.clone(),
            port: Some(port),
            stats: ChannelStats::default(),
        })
    }

    fn validate_config(config: &ChannelConfig) -> Result<(), ChannelError> {
        let fail = |reason: String| ChannelError::Open {
            target: config.target.clone(),
            reason,
        };

        if config.target.trim().is_empty() {
            return Err(fail("port name cannot be empty".to_string()));
        }

        if config.baud_rate == 0 || config.baud_rate > MAX_BAUD_RATE {
            return Err(fail(format!("invalid baud rate: {}", config.baud_rate)));
        }

        Ok(())
    }

    fn port_mut(&mut self) -> Result<&mut SerialStream, ChannelError> {
        self.port.as_mut().ok_or(ChannelError::Closed)
    }
}

#[async_trait]
impl DeviceChannel for SerialChannel {
    fn name(&self) -> &str {
        &self.port_name
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        let port = self.port_mut()?;
        port.write_all(bytes)
            .await
            .map_err(|e| ChannelError::Write(e.to_string()))?;
        port.flush().await.map_err(|e| ChannelError::Write(e.to_string()))?;

        self.stats.records_written += 1;
        self.stats.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn poll_readable(&mut self) -> bool {
        self.stats.polls += 1;
        let Some(port) = self.port.as_ref() else {
            return false;
        };

        match port.bytes_to_read() {
            Ok(pending) => pending > 0,
            Err(e) => {
                warn!("Could not query {} input buffer: {}", self.port_name, e);
                false
            }
        }
    }

    async fn read_available(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.stats.reads += 1;
        let port = self.port_mut()?;
        let mut buf = vec![0u8; MAX_READ_CHUNK_BYTES];

        // Zero timeout: take what is buffered, never wait for more
        let read = match tokio::time::timeout(Duration::ZERO, port.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(ChannelError::Read(e.to_string())),
            Err(_) => 0,
        };

        buf.truncate(read);
        self.stats.bytes_read += read as u64;
        Ok(buf)
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                warn!("Flush on close failed for {}: {}", self.port_name, e);
            }
            info!("Closed {}", self.port_name);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn stats(&self) -> ChannelStats {
        self.stats
    }
}
