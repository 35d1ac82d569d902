// src/config/constants.rs
//! System-wide configuration constants

/// Streaming cadence constants
pub mod stream {
    /// 10 ms between samples
    pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 100.0;
    pub const MIN_SAMPLE_RATE_HZ: f64 = 0.1;
    pub const MAX_SAMPLE_RATE_HZ: f64 = 10_000.0;

    /// Gap between heartbeats, longer than one sample interval
    pub const DEFAULT_BEAT_PAUSE_MS: u64 = 200;
    pub const MAX_BEAT_PAUSE_MS: u64 = 60_000;
}

/// Device channel constants
pub mod channel {
    pub const DEFAULT_TARGET: &str = "/dev/ttyACM0";
    pub const SIMULATED_TARGET: &str = "sim";
    pub const STDOUT_TARGET: &str = "stdout";

    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
    pub const MAX_BAUD_RATE: u32 = 4_000_000;

    pub const DEFAULT_OPEN_TIMEOUT_MS: u64 = 100;
    pub const MAX_OPEN_TIMEOUT_MS: u64 = 10_000;

    /// Upper bound on a single non-blocking drain
    pub const MAX_READ_CHUNK_BYTES: usize = 4096;
}

/// Wire format constants
pub mod wire {
    pub const CONTINUOUS_STATUS: &str = "streaming";
    pub const RECORD_TERMINATOR: u8 = b'\n';
}

/// Simulated device thresholds, mirroring the reference firmware
pub mod simulator {
    pub const PEAK_RISE_THRESHOLD: f64 = 0.8;
    pub const PEAK_REARM_THRESHOLD: f64 = 0.6;
    pub const PEAK_STATUS: &str = "PEAK";
}

/// Dataset acquisition constants
pub mod dataset {
    pub const DEFAULT_CACHE_FILE: &str = "mitbih_test.csv";
    pub const CHECKSUM_SIDECAR_EXTENSION: &str = "crc32";

    /// MIT-BIH heartbeat rows: 187 samples followed by one label column
    pub const DEFAULT_SAMPLES_PER_BEAT: usize = 187;
    pub const MAX_SAMPLES_PER_BEAT: usize = 100_000;

    /// Normal (0) and premature ventricular contraction (2)
    pub const DEFAULT_LABEL_CLASSES: [u8; 2] = [0, 2];

    pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

    pub const DEFAULT_SYNTHETIC_SEED: u64 = 42;
    pub const DEFAULT_SYNTHETIC_BEATS: usize = 8;
    pub const SYNTHETIC_NOISE_AMPLITUDE: f64 = 0.01;
}

/// File system paths
pub mod paths {
    pub const USER_CONFIG_DIR: &str = ".config/ecg-replay";
    pub const USER_CONFIG_FILE: &str = "config.toml";
    pub const LOCAL_CONFIG_FILE: &str = "ecg-replay.toml";
}

/// Environment override prefix, e.g. `ECG_REPLAY_STREAM__SAMPLE_RATE_HZ=250`
pub mod env {
    pub const PREFIX: &str = "ECG_REPLAY_";
    pub const SECTION_SEPARATOR: &str = "__";
}
