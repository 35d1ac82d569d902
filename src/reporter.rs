//! Diagnosis reporting
//!
//! Turns raw inbound chunks into [`Diagnosis`] records, one per non-empty
//! line, and hands them to a [`DiagnosisSink`]. Reporting never fails:
//! unparseable text is still reported verbatim.
//!
//! Without a device the same sink shows the records that would have been
//! sent, so a display-only run is visible to the operator.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::hal::wire::{decode_inbound, DiagnosisPayload};

/// Where in the stream a diagnosis was observed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamPosition {
    /// Run-wide index of the sample sent just before the message arrived
    pub tick: u64,
    pub beat: usize,
    pub sample: usize,
}

/// One device message, attributed to the sample that preceded it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub position: StreamPosition,
    pub message: String,
    pub payload: Option<DiagnosisPayload>,
}

impl Diagnosis {
    pub fn new(message: impl Into<String>, position: StreamPosition) -> Self {
        let message = message.into();
        let payload = DiagnosisPayload::parse(&message);
        Self {
            position,
            message,
            payload,
        }
    }

    /// Parsed device status, if the message carried one
    pub fn status(&self) -> Option<&str> {
        self.payload.as_ref().map(|p| p.status.as_str())
    }
}

/// Destination for reported diagnoses
pub trait DiagnosisSink: Send {
    fn emit(&mut self, diagnosis: &Diagnosis);

    /// A record shown instead of sent because no device is connected
    fn display(&mut self, _record: &DisplayedRecord) {}
}

/// Outbound record shown on the operator console in display-only runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayedRecord {
    pub position: StreamPosition,
    /// Wire record without its line terminator
    pub record: String,
}

/// Prints `DEVICE DIAGNOSIS: <message>` to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl DiagnosisSink for ConsoleSink {
    fn emit(&mut self, diagnosis: &Diagnosis) {
        println!("DEVICE DIAGNOSIS: {}", diagnosis.message);
    }

    fn display(&mut self, shown: &DisplayedRecord) {
        if shown.position.sample == 0 {
            println!("NO DEVICE: heartbeat #{}", shown.position.beat + 1);
        }
        println!("{}", shown.record);
    }
}

/// Collects diagnoses and displayed records in memory; clones share the
/// same logs
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<Diagnosis>>>,
    shown: Arc<Mutex<Vec<DisplayedRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnoses(&self) -> Vec<Diagnosis> {
        self.log.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    pub fn displayed(&self) -> Vec<DisplayedRecord> {
        self.shown.lock().clone()
    }
}

impl DiagnosisSink for RecordingSink {
    fn emit(&mut self, diagnosis: &Diagnosis) {
        self.log.lock().push(diagnosis.clone());
    }

    fn display(&mut self, record: &DisplayedRecord) {
        self.shown.lock().push(record.clone());
    }
}

pub struct DiagnosisReporter {
    sink: Box<dyn DiagnosisSink>,
    reported: u64,
    displayed: u64,
}

impl DiagnosisReporter {
    pub fn new<S: DiagnosisSink + 'static>(sink: S) -> Self {
        Self {
            sink: Box::new(sink),
            reported: 0,
            displayed: 0,
        }
    }

    pub fn console() -> Self {
        Self::new(ConsoleSink)
    }

    /// Report every line in `raw`; returns how many diagnoses were emitted
    pub fn report(&mut self, raw: &[u8], position: StreamPosition) -> usize {
        let lines = decode_inbound(raw);
        for line in &lines {
            let diagnosis = Diagnosis::new(line.as_str(), position);
            debug!(
                tick = position.tick,
                beat = position.beat,
                status = diagnosis.status().unwrap_or("-"),
                "Device diagnosis"
            );
            self.sink.emit(&diagnosis);
        }

        self.reported += lines.len() as u64;
        lines.len()
    }

    /// Show an encoded record that could not be sent
    pub fn display(&mut self, record: &[u8], position: StreamPosition) {
        let record = String::from_utf8_lossy(record).trim_end().to_string();
        self.sink.display(&DisplayedRecord { position, record });
        self.displayed += 1;
    }

    pub fn reported(&self) -> u64 {
        self.reported
    }

    pub fn displayed(&self) -> u64 {
        self.displayed
    }
}

impl std::fmt::Debug for DiagnosisReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisReporter")
            .field("reported", &self.reported)
            .field("displayed", &self.displayed)
            .finish()
    }
}
