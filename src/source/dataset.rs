//! Beats, datasets and the label allow-set
//!
//! A [`Dataset`] is an ordered, non-empty list of equal-length [`Beat`]s.
//! It is immutable once built; the streaming engine only reads it, either
//! beat by beat or as one flattened sequence indexed modulo its length.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::AcquisitionError;

/// One scalar measurement at one time step
pub type Sample = f64;

/// One physiological cycle: a fixed-length ordered run of samples
#[derive(Debug, Clone, PartialEq)]
pub struct Beat {
    samples: Vec<Sample>,
    label: Option<u8>,
}

impl Beat {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples, label: None }
    }

    pub fn with_label(samples: Vec<Sample>, label: u8) -> Self {
        Self { samples, label: Some(label) }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Class label from the source row, if the origin had one
    pub fn label(&self) -> Option<u8> {
        self.label
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Ordered sequence of equal-length beats
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    beats: Vec<Beat>,
    beat_len: usize,
}

impl Dataset {
    /// Build a dataset, rejecting empty input, ragged beats and non-finite samples
    pub fn new(beats: Vec<Beat>) -> Result<Self, AcquisitionError> {
        let beat_len = match beats.first() {
            Some(first) => first.len(),
            None => return Err(AcquisitionError::NoData("dataset has no beats".to_string())),
        };

        if beat_len == 0 {
            return Err(AcquisitionError::NoData("beats have no samples".to_string()));
        }

        for (index, beat) in beats.iter().enumerate() {
            if beat.len() != beat_len {
                return Err(AcquisitionError::Parse {
                    row: index + 1,
                    reason: format!("beat has {} samples, expected {}", beat.len(), beat_len),
                });
            }
            if let Some(pos) = beat.samples().iter().position(|s| !s.is_finite()) {
                return Err(AcquisitionError::Parse {
                    row: index + 1,
                    reason: format!("sample {} is not a finite number", pos),
                });
            }
        }

        Ok(Self { beats, beat_len })
    }

    /// Dataset holding a single beat
    pub fn single(samples: Vec<Sample>) -> Result<Self, AcquisitionError> {
        Self::new(vec![Beat::new(samples)])
    }

    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    pub fn beat_count(&self) -> usize {
        self.beats.len()
    }

    /// Samples in every beat
    pub fn beat_len(&self) -> usize {
        self.beat_len
    }

    /// Total samples when flattened
    pub fn sample_count(&self) -> usize {
        self.beats.len() * self.beat_len
    }

    /// Sample at a global tick of the flattened, endlessly repeated sequence
    pub fn sample_at(&self, tick: u64) -> Sample {
        let (beat, offset) = self.position_at(tick);
        self.beats[beat].samples[offset]
    }

    /// Beat index and offset within that beat for a global tick
    pub fn position_at(&self, tick: u64) -> (usize, usize) {
        let flat = (tick % self.sample_count() as u64) as usize;
        (flat / self.beat_len, flat % self.beat_len)
    }

    /// Keep beats whose label passes `filter`, then drop the first `slice_start`
    pub fn filtered(self, filter: &LabelFilter, slice_start: usize) -> Result<Self, AcquisitionError> {
        let total = self.beats.len();
        let kept: Vec<Beat> = self
            .beats
            .into_iter()
            .filter(|beat| beat.label.map_or(true, |label| filter.allows(label)))
            .skip(slice_start)
            .collect();

        if kept.is_empty() {
            return Err(AcquisitionError::NoData(format!(
                "no beats left after filtering {} rows by {} from offset {}",
                total, filter, slice_start
            )));
        }

        Self::new(kept)
    }
}

/// Which beat classes are retained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LabelRepr", into = "LabelRepr")]
pub enum LabelFilter {
    All,
    Classes(BTreeSet<u8>),
}

impl LabelFilter {
    pub fn classes<I: IntoIterator<Item = u8>>(classes: I) -> Self {
        LabelFilter::Classes(classes.into_iter().collect())
    }

    pub fn allows(&self, label: u8) -> bool {
        match self {
            LabelFilter::All => true,
            LabelFilter::Classes(set) => set.contains(&label),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LabelFilter::Classes(set) if set.is_empty())
    }
}

impl Default for LabelFilter {
    fn default() -> Self {
        LabelFilter::All
    }
}

impl fmt::Display for LabelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelFilter::All => write!(f, "all"),
            LabelFilter::Classes(set) => {
                let list: Vec<String> = set.iter().map(u8::to_string).collect();
                write!(f, "{{{}}}", list.join(","))
            }
        }
    }
}

impl std::str::FromStr for LabelFilter {
    type Err = String;

    /// Parse `all` or a comma-separated class list such as `0,2`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(LabelFilter::All);
        }

        trimmed
            .trim_start_matches('{')
            .trim_end_matches('}')
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u8>()
                    .map_err(|_| format!("invalid label class '{}'", part))
            })
            .collect::<Result<BTreeSet<u8>, String>>()
            .map(LabelFilter::Classes)
    }
}

/// Serialized forms: `"all"`, `"0,2"`, `[0, 2]` or a single class `1`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Word(String),
    List(Vec<u8>),
    One(u8),
}

impl TryFrom<LabelRepr> for LabelFilter {
    type Error = String;

    fn try_from(repr: LabelRepr) -> Result<Self, Self::Error> {
        match repr {
            LabelRepr::Word(word) => word.parse(),
            LabelRepr::List(list) => Ok(LabelFilter::classes(list)),
            LabelRepr::One(class) => Ok(LabelFilter::classes([class])),
        }
    }
}

impl From<LabelFilter> for LabelRepr {
    fn from(filter: LabelFilter) -> Self {
        match filter {
            LabelFilter::All => LabelRepr::Word("all".to_string()),
            LabelFilter::Classes(set) => LabelRepr::List(set.into_iter().collect()),
        }
    }
}
