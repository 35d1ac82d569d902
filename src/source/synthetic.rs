//! Synthetic heartbeat generator
//!
//! Used when neither the cache nor the remote origin yields data. Each beat
//! is a sum of Gaussian bumps shaped like a P wave, QRS complex and T wave on
//! a 0..1 scale, with small seeded per-beat jitter and sample noise, so the
//! output is identical for identical settings.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::{AcquireRequest, AcquisitionError, Beat, DataOrigin, Dataset, SampleSource};
use crate::config::constants::dataset::SYNTHETIC_NOISE_AMPLITUDE;

const BASELINE: f64 = 0.25;

/// (centre as a fraction of the beat, amplitude, width)
const WAVES: [(f64, f64, f64); 5] = [
    (0.20, 0.10, 0.025),  // P
    (0.36, -0.08, 0.010), // Q
    (0.40, 0.75, 0.012),  // R
    (0.44, -0.18, 0.012), // S
    (0.65, 0.22, 0.050),  // T
];

/// Deterministic placeholder dataset
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    beats: usize,
}

impl SyntheticSource {
    pub fn new(seed: u64, beats: usize) -> Self {
        Self { seed, beats }
    }

    /// Generate `beats` beats of `samples_per_beat` samples
    pub fn generate(&self, samples_per_beat: usize) -> Result<Dataset, AcquisitionError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut beats = Vec::with_capacity(self.beats);

        for _ in 0..self.beats {
            let amplitude_scale = 1.0 + rng.gen_range(-0.05..=0.05);
            let shift = rng.gen_range(-0.01..=0.01);

            let samples = (0..samples_per_beat)
                .map(|i| {
                    let t = i as f64 / samples_per_beat as f64;
                    let wave: f64 = WAVES
                        .iter()
                        .map(|&(centre, amplitude, width)| {
                            let d = (t - centre - shift) / width;
                            amplitude * amplitude_scale * (-0.5 * d * d).exp()
                        })
                        .sum();
                    let noise = rng.gen_range(-SYNTHETIC_NOISE_AMPLITUDE..=SYNTHETIC_NOISE_AMPLITUDE);
                    (BASELINE + wave + noise).clamp(0.0, 1.0)
                })
                .collect();

            beats.push(Beat::new(samples));
        }

        Dataset::new(beats)
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Synthetic
    }

    async fn acquire(&self, request: &AcquireRequest) -> Result<Dataset, AcquisitionError> {
        info!(
            "Generating {} synthetic beats (seed {})",
            self.beats, self.seed
        );
        self.generate(request.samples_per_beat)
    }
}
