//! Common utility functions for ECG Replay
//!
//! - Sample-period arithmetic
//! - Field validation helpers used by configuration
//! - Cache file integrity checking

pub mod time;
pub mod validation;
pub mod integrity;

pub use time::sample_period;

pub use validation::{
    validate_http_url,
    validate_not_empty,
    validate_range,
    ValidationError,
    ValidationReport,
    ValidationResult,
};

pub use integrity::{
    crc32_file,
    sidecar_path,
    verify_cache_file,
    write_sidecar,
    CacheIntegrity,
    IntegrityError,
};
