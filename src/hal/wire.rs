// src/hal/wire.rs
//! Line-oriented JSON wire format
//!
//! Outbound records are `{"val": <number>}` followed by `\n`. The device
//! firmware locates the `"val":` token and reads the number starting seven
//! bytes after it, so the space after the colon is part of the format and
//! compact JSON would be misread. Inbound traffic is free-form text lines; a
//! line that happens to be a JSON object with a `status` (or `pico_status`)
//! field is additionally parsed into a [`DiagnosisPayload`].

use std::io;

use serde::{Deserialize, Serialize};

use crate::config::constants::wire::RECORD_TERMINATOR;
use crate::hal::types::ChannelError;

#[derive(Serialize)]
struct OutboundRecord<'a> {
    val: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
}

/// JSON formatter emitting `": "` and `", "` separators
#[derive(Debug, Clone, Copy, Default)]
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Reusable encoder for outbound sample records
#[derive(Debug, Default)]
pub struct WireEncoder {
    buf: Vec<u8>,
}

impl WireEncoder {
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(64) }
    }

    /// Encode one sample, optionally tagged with a stream status.
    ///
    /// The returned slice borrows the encoder's buffer and is valid until
    /// the next call.
    pub fn encode(&mut self, value: f64, status: Option<&str>) -> Result<&[u8], ChannelError> {
        if !value.is_finite() {
            return Err(ChannelError::Encode(format!("non-finite sample {}", value)));
        }

        self.buf.clear();
        let record = OutboundRecord { val: value, status };
        let mut serializer = serde_json::Serializer::with_formatter(&mut self.buf, SpacedFormatter);
        record
            .serialize(&mut serializer)
            .map_err(|e| ChannelError::Encode(e.to_string()))?;
        self.buf.push(RECORD_TERMINATOR);

        Ok(&self.buf)
    }
}

/// Encode a single sample record into a fresh buffer
pub fn encode_sample(value: f64) -> Result<Vec<u8>, ChannelError> {
    WireEncoder::new().encode(value, None).map(<[u8]>::to_vec)
}

/// Split an inbound chunk into trimmed, non-empty text lines.
///
/// Bytes that are not valid UTF-8 are dropped rather than failing the read.
pub fn decode_inbound(bytes: &[u8]) -> Vec<String> {
    let text: String = String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect();

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Structured form of a device diagnosis line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisPayload {
    #[serde(alias = "pico_status")]
    pub status: String,
    #[serde(default)]
    pub prob: Option<f64>,
}

impl DiagnosisPayload {
    /// Best-effort parse; anything that is not a diagnosis object yields `None`
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }
}

/// Read the sample value the way the device firmware does: find the
/// `"val":` token and parse the number that starts seven bytes after it.
pub fn firmware_value(line: &str) -> Option<f64> {
    const TOKEN: &str = "\"val\":";
    let start = line.find(TOKEN)? + TOKEN.len() + 1;
    let rest = line.get(start..)?;
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}
