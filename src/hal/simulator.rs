//! In-memory device simulator
//!
//! Stands in for the diagnostic device in tests and in `sim` target runs.
//! A recording device keeps every record written along with the (tokio)
//! instant it arrived; the factory's `sim` target only counts them. Inbound
//! replies can be scripted against the write count or produced
//! by a small peak detector mirroring the reference firmware.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::constants::simulator::{PEAK_REARM_THRESHOLD, PEAK_RISE_THRESHOLD, PEAK_STATUS};
use crate::config::constants::channel::SIMULATED_TARGET;
use crate::hal::traits::DeviceChannel;
use crate::hal::types::{ChannelError, ChannelStats};
use crate::hal::wire::firmware_value;

/// How the simulated device reacts to incoming records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatorBehavior {
    /// Only scripted replies
    #[default]
    Silent,
    /// Report `PEAK` each time a sample rises through the peak threshold
    PeakDetector,
}

#[derive(Debug)]
struct DeviceState {
    recording: bool,
    write_total: usize,
    writes: Vec<Vec<u8>>,
    write_times: Vec<Instant>,
    inbound: VecDeque<u8>,
    scripted: BTreeMap<usize, Vec<u8>>,
    fail_writes_after: Option<usize>,
    polls: u64,
    reads: u64,
    closed: bool,
    peak_armed: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            recording: true,
            write_total: 0,
            writes: Vec::new(),
            write_times: Vec::new(),
            inbound: VecDeque::new(),
            scripted: BTreeMap::new(),
            fail_writes_after: None,
            polls: 0,
            reads: 0,
            closed: false,
            peak_armed: true,
        }
    }
}

impl DeviceState {
    fn detect_peaks(&mut self, record: &[u8]) {
        let text = String::from_utf8_lossy(record);
        for line in text.lines() {
            let Some(value) = firmware_value(line) else {
                continue;
            };

            if self.peak_armed && value > PEAK_RISE_THRESHOLD {
                self.peak_armed = false;
                let reply = serde_json::json!({ "status": PEAK_STATUS, "prob": value });
                self.inbound.extend(reply.to_string().into_bytes());
                self.inbound.push_back(b'\n');
            } else if value < PEAK_REARM_THRESHOLD {
                self.peak_armed = true;
            }
        }
    }
}

/// Simulated device channel
#[derive(Debug)]
pub struct SimulatedDevice {
    name: String,
    behavior: SimulatorBehavior,
    state: Arc<Mutex<DeviceState>>,
    stats: ChannelStats,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::with_behavior(SimulatorBehavior::Silent)
    }

    pub fn with_peak_detector() -> Self {
        Self::with_behavior(SimulatorBehavior::PeakDetector)
    }

    pub fn with_behavior(behavior: SimulatorBehavior) -> Self {
        Self {
            name: SIMULATED_TARGET.to_string(),
            behavior,
            state: Arc::new(Mutex::new(DeviceState::default())),
            stats: ChannelStats::default(),
        }
    }

    /// Count writes without keeping the records or their timestamps
    pub fn without_recording(self) -> Self {
        {
            let mut state = self.state.lock();
            state.recording = false;
            state.writes = Vec::new();
            state.write_times = Vec::new();
        }
        self
    }

    /// Observer/controller sharing this device's state
    pub fn handle(&self) -> SimulatedDeviceHandle {
        SimulatedDeviceHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceChannel for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(ChannelError::Closed);
            }
            if let Some(limit) = state.fail_writes_after {
                if state.write_total >= limit {
                    return Err(ChannelError::Write("simulated link failure".to_string()));
                }
            }

            state.write_total += 1;
            if state.recording {
                state.writes.push(bytes.to_vec());
                state.write_times.push(Instant::now());
            }

            let count = state.write_total;
            if let Some(reply) = state.scripted.remove(&count) {
                debug!("Simulator replying after write #{}", count);
                state.inbound.extend(reply);
            }

            if self.behavior == SimulatorBehavior::PeakDetector {
                state.detect_peaks(bytes);
            }
        }

        self.stats.records_written += 1;
        self.stats.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn poll_readable(&mut self) -> bool {
        self.stats.polls += 1;
        let mut state = self.state.lock();
        state.polls += 1;
        !state.closed && !state.inbound.is_empty()
    }

    async fn read_available(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.stats.reads += 1;
        let bytes: Vec<u8> = {
            let mut state = self.state.lock();
            state.reads += 1;
            if state.closed {
                return Err(ChannelError::Closed);
            }
            state.inbound.drain(..).collect()
        };

        self.stats.bytes_read += bytes.len() as u64;
        Ok(bytes)
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.state.lock().closed = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.state.lock().closed
    }

    fn stats(&self) -> ChannelStats {
        self.stats
    }
}

/// Shared view onto a [`SimulatedDevice`]
#[derive(Debug, Clone)]
pub struct SimulatedDeviceHandle {
    state: Arc<Mutex<DeviceState>>,
}

impl SimulatedDeviceHandle {
    /// Make `bytes` readable right after the `write_count`-th write (1-based)
    pub fn respond_after(&self, write_count: usize, bytes: impl AsRef<[u8]>) {
        self.state
            .lock()
            .scripted
            .entry(write_count)
            .or_default()
            .extend_from_slice(bytes.as_ref());
    }

    /// Make `bytes` readable immediately
    pub fn push_inbound(&self, bytes: impl AsRef<[u8]>) {
        self.state.lock().inbound.extend(bytes.as_ref().iter().copied());
    }

    /// Fail every write once `count` writes have succeeded
    pub fn fail_writes_after(&self, count: usize) {
        self.state.lock().fail_writes_after = Some(count);
    }

    /// Recorded records; empty for a device built `without_recording`
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// Written records as text, terminator stripped
    pub fn write_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).trim_end_matches('\n').to_string())
            .collect()
    }

    pub fn write_times(&self) -> Vec<Instant> {
        self.state.lock().write_times.clone()
    }

    /// Successful writes, recorded or not
    pub fn write_count(&self) -> usize {
        self.state.lock().write_total
    }

    pub fn polls(&self) -> u64 {
        self.state.lock().polls
    }

    pub fn reads(&self) -> u64 {
        self.state.lock().reads
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
