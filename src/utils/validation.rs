//! Validation utilities for ECG Replay
//!
//! Field-level checks used by configuration validation. Every check returns a
//! [`ValidationError`] naming the offending field so that callers can collect
//! all violations before reporting.

use std::fmt;

/// Validation result type
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value out of valid range
    OutOfRange {
        field: String,
        value: String,
        min: String,
        max: String,
    },
    /// Required field missing or empty
    RequiredFieldMissing(String),
    /// Invalid field format
    InvalidFormat {
        field: String,
        value: String,
        expected: String,
    },
    /// Cross-field validation failure
    ConstraintViolation {
        fields: Vec<String>,
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange { field, value, min, max } => {
                write!(f, "Field '{}' value '{}' is out of range [{}, {}]", field, value, min, max)
            }
            ValidationError::RequiredFieldMissing(field) => {
                write!(f, "Required field '{}' is missing", field)
            }
            ValidationError::InvalidFormat { field, value, expected } => {
                write!(f, "Field '{}' has invalid format '{}', expected {}", field, value, expected)
            }
            ValidationError::ConstraintViolation { fields, message } => {
                write!(f, "Constraint violation on [{}]: {}", fields.join(", "), message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check that `value` lies in the inclusive range `[min, max]`
pub fn validate_range<T>(field: &str, value: T, min: T, max: T) -> ValidationResult<()>
where
    T: PartialOrd + fmt::Display,
{
    // NaN fails both comparisons, so test for containment rather than exclusion
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        })
    }
}

/// Check that a string field is non-empty after trimming
pub fn validate_not_empty(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError::RequiredFieldMissing(field.to_string()))
    } else {
        Ok(())
    }
}

/// Check that a URL uses a scheme the remote fetcher understands
pub fn validate_http_url(field: &str, value: &str) -> ValidationResult<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            value: value.to_string(),
            expected: "an http:// or https:// URL".to_string(),
        })
    }
}

/// Accumulates validation failures across many checks
#[derive(Debug, Default)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one check
    pub fn check(&mut self, result: ValidationResult<()>) -> &mut Self {
        if let Err(e) = result {
            self.errors.push(e);
        }
        self
    }

    pub fn push(&mut self, error: ValidationError) -> &mut Self {
        self.errors.push(error);
        self
    }

    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        assert!(validate_range("rate", 100.0, 0.1, 10_000.0).is_ok());
        assert!(validate_range("rate", 0.1, 0.1, 10_000.0).is_ok());
        assert!(validate_range("rate", 0.0, 0.1, 10_000.0).is_err());
        assert!(validate_range("rate", f64::NAN, 0.1, 10_000.0).is_err());
        assert!(validate_range("baud", 0u32, 1, 4_000_000).is_err());
    }

    #[test]
    fn test_out_of_range_display() {
        let err = validate_range("stream.sample_rate_hz", 0.0, 0.1, 10.0).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("stream.sample_rate_hz"));
        assert!(display.contains("[0.1, 10]"));
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("channel.target", "/dev/ttyACM0").is_ok());
        assert_eq!(
            validate_not_empty("channel.target", "   "),
            Err(ValidationError::RequiredFieldMissing("channel.target".to_string()))
        );
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("dataset.remote_url", "https://bucket.example/ecg.csv").is_ok());
        assert!(validate_http_url("dataset.remote_url", "s3://bucket/ecg.csv").is_err());
    }

    #[test]
    fn test_report_collects_all_errors() {
        let mut report = ValidationReport::new();
        report
            .check(validate_range("a", 5, 0, 10))
            .check(validate_range("b", 50, 0, 10))
            .check(validate_not_empty("c", ""));

        let errors = report.into_result().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
