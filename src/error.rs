// src/error.rs
//! Unified error handling for ECG Replay
//!
//! Leaf components report their own error enums (`AcquisitionError`,
//! `ChannelError`, `ConfigError`). They are folded into [`ReplayError`] at
//! crate boundaries so the binary can render one message and pick one exit
//! code, while the wrapped error stays reachable through `source()`.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::ConfigError;
use crate::hal::ChannelError;
use crate::source::AcquisitionError;

/// Unified error type for the replay system
#[derive(Debug, Clone)]
pub enum ReplayError {
    /// Dataset could not be produced by any enabled strategy
    Acquisition {
        error: Arc<AcquisitionError>,
        context: ErrorContext,
    },

    /// Device channel failed after it was opened
    Channel {
        error: Arc<ChannelError>,
        context: ErrorContext,
    },

    /// Configuration could not be loaded or failed validation
    Configuration {
        error: Arc<ConfigError>,
        context: ErrorContext,
    },

    /// Engine was asked to do something its current state forbids
    InvalidState {
        expected: String,
        actual: String,
        context: ErrorContext,
    },

    /// Operating system level failure outside any component
    System {
        subsystem: String,
        reason: String,
        context: ErrorContext,
    },
}

/// Error context for debugging and analysis
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub additional_info: HashMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
            additional_info: HashMap::new(),
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }

    /// Add additional information to the context
    pub fn add_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl ReplayError {
    /// Wrap an acquisition failure with caller context
    pub fn acquisition(error: AcquisitionError, context: ErrorContext) -> Self {
        ReplayError::Acquisition { error: Arc::new(error), context }
    }

    /// Wrap a channel failure with caller context
    pub fn channel(error: ChannelError, context: ErrorContext) -> Self {
        ReplayError::Channel { error: Arc::new(error), context }
    }

    /// Wrap a configuration failure with caller context
    pub fn configuration(error: ConfigError, context: ErrorContext) -> Self {
        ReplayError::Configuration { error: Arc::new(error), context }
    }

    /// Context attached when the error was raised
    pub fn context(&self) -> &ErrorContext {
        match self {
            ReplayError::Acquisition { context, .. }
            | ReplayError::Channel { context, .. }
            | ReplayError::Configuration { context, .. }
            | ReplayError::InvalidState { context, .. }
            | ReplayError::System { context, .. } => context,
        }
    }

    /// True when the run failed only because no dataset could be found
    pub fn is_no_data(&self) -> bool {
        matches!(self, ReplayError::Acquisition { error, .. } if error.is_no_data())
    }
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Acquisition { error, context } => {
                write!(f, "[DATASET] {} ({})", error, context.operation)
            }
            ReplayError::Channel { error, context } => {
                write!(f, "[CHANNEL] {} ({}, at {}:{})",
                       error, context.operation,
                       context.file.unwrap_or("unknown"), context.line.unwrap_or(0))
            }
            ReplayError::Configuration { error, context } => {
                write!(f, "[CONFIG] {} ({})", error, context.operation)
            }
            ReplayError::InvalidState { expected, actual, context } => {
                write!(f, "[ENGINE] Invalid state in {}: expected {}, was {}",
                       context.operation, expected, actual)
            }
            ReplayError::System { subsystem, reason, context } => {
                write!(f, "[SYSTEM] {} error: {} ({})", subsystem, reason, context.operation)
            }
        }
    }
}

impl Error for ReplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReplayError::Acquisition { error, .. } => Some(error.as_ref()),
            ReplayError::Channel { error, .. } => Some(error.as_ref()),
            ReplayError::Configuration { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<AcquisitionError> for ReplayError {
    fn from(err: AcquisitionError) -> Self {
        ReplayError::acquisition(err, error_context!("source", "acquire"))
    }
}

impl From<ChannelError> for ReplayError {
    fn from(err: ChannelError) -> Self {
        ReplayError::channel(err, error_context!("hal", "channel_operation"))
    }
}

impl From<ConfigError> for ReplayError {
    fn from(err: ConfigError) -> Self {
        ReplayError::configuration(err, error_context!("config", "load"))
    }
}

/// Result type alias for replay operations
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Convenience trait for folding foreign errors into [`ReplayError::System`]
pub trait IntoReplayError<T> {
    fn replay_err(self, component: &str, operation: &str) -> ReplayResult<T>;
}

impl<T, E> IntoReplayError<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn replay_err(self, component: &str, operation: &str) -> ReplayResult<T> {
        self.map_err(|err| ReplayError::System {
            subsystem: component.to_string(),
            reason: err.to_string(),
            context: ErrorContext::new(component, operation),
        })
    }
}
